//! Attachment download.
//!
//! Mailgun stores attachments of forwarded messages and only posts their
//! descriptors; each body has to be fetched with the account API key.

use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tempfile::{Builder, NamedTempFile};
use tracing::{error, info, warn};
use url::Url;

use super::error::NormalizeError;
use super::payload::is_present;
use super::record::Attachment;
use crate::Config;

/// Parameter holding the JSON-encoded attachment descriptors.
pub const ATTACHMENTS_PARAM: &str = "attachments";

/// Basic-auth username Mailgun expects alongside the API key.
pub const API_USERNAME: &str = "api";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Attachment metadata as posted by Mailgun.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "content-type")]
    pub content_type: String,
    pub url: String,
}

/// Parse the `attachments` parameter. Missing, blank and `null` all mean
/// no attachments.
pub fn parse_descriptors(raw: Option<&str>) -> Result<Vec<AttachmentDescriptor>, NormalizeError> {
    let raw = match raw {
        Some(raw) if is_present(raw) => raw,
        _ => return Ok(Vec::new()),
    };

    let descriptors: Option<Vec<AttachmentDescriptor>> =
        serde_json::from_str(raw).map_err(|e| {
            warn!(error = %e, "attachments_parse_failed");
            NormalizeError::MalformedAttachments(e)
        })?;

    Ok(descriptors.unwrap_or_default())
}

/// Downloads attachment bodies into temporary files.
#[derive(Debug, Clone)]
pub struct AttachmentFetcher {
    client: Client,
    api_key: String,
    timeout: Duration,
    temp_dir: Option<PathBuf>,
    allow_http: bool,
}

impl AttachmentFetcher {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            temp_dir: None,
            allow_http: false,
        }
    }

    /// Build a fetcher using the key, timeout, temp directory and URL
    /// policy from `config`.
    pub fn from_config(client: Client, config: &Config) -> Self {
        let mut fetcher = Self::new(client, config.mailgun_api_key.clone().unwrap_or_default())
            .with_timeout(Duration::from_millis(config.request_timeout_ms))
            .allow_http(config.allow_insecure_attachment_urls);
        fetcher.temp_dir = config.attachment_dir.clone();
        fetcher
    }

    /// Accept plain `http` attachment URLs. Off by default, since the API
    /// key travels in the Basic auth header.
    pub fn allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Fetch every descriptor in order, one at a time.
    ///
    /// The first failure aborts the whole batch; attachments fetched so far
    /// are dropped along with their files.
    pub async fn materialize_all(
        &self,
        descriptors: &[AttachmentDescriptor],
    ) -> Result<Vec<Attachment>, NormalizeError> {
        let mut attachments = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            attachments.push(self.materialize(descriptor).await?);
        }
        Ok(attachments)
    }

    /// Fetch one attachment body and buffer it in a temporary file.
    pub async fn materialize(
        &self,
        descriptor: &AttachmentDescriptor,
    ) -> Result<Attachment, NormalizeError> {
        let url = self.check_url(&descriptor.url)?;

        info!(
            url = %url,
            name = %descriptor.name,
            content_type = %descriptor.content_type,
            timeout_seconds = self.timeout.as_secs_f64(),
            "attachment_fetch_starting"
        );

        let response = self
            .client
            .get(url)
            .basic_auth(API_USERNAME, Some(&self.api_key))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.request_error(descriptor, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                url = %descriptor.url,
                status_code = status.as_u16(),
                "attachment_fetch_rejected"
            );
            return Err(NormalizeError::AttachmentStatus {
                url: descriptor.url.clone(),
                status,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error(descriptor, e))?;

        let size = body.len() as u64;
        let temp_dir = self.temp_dir.clone();
        let name = descriptor.name.clone();
        let file = tokio::task::spawn_blocking(move || {
            write_temp_file(temp_dir.as_deref(), &name, &body)
        })
        .await
        .map_err(io::Error::other)??;

        info!(
            url = %descriptor.url,
            name = %descriptor.name,
            size = size,
            "attachment_fetch_complete"
        );

        Ok(Attachment::new(
            descriptor.name.clone(),
            descriptor.content_type.clone(),
            size,
            file,
        ))
    }

    /// Parse `raw` and require `https` (or `http` when allowed).
    fn check_url(&self, raw: &str) -> Result<Url, NormalizeError> {
        let url = Url::parse(raw).map_err(|source| {
            warn!(url = %raw, error = %source, "attachment_url_invalid");
            NormalizeError::InvalidAttachmentUrl {
                url: raw.to_string(),
                source,
            }
        })?;

        let allowed = match url.scheme() {
            "https" => true,
            "http" => self.allow_http,
            _ => false,
        };
        if allowed {
            return Ok(url);
        }

        warn!(url = %raw, scheme = url.scheme(), "attachment_url_scheme_rejected");
        Err(NormalizeError::UnsupportedAttachmentScheme {
            url: raw.to_string(),
            scheme: url.scheme().to_string(),
        })
    }

    fn request_error(&self, descriptor: &AttachmentDescriptor, e: reqwest::Error) -> NormalizeError {
        if e.is_timeout() {
            error!(
                url = %descriptor.url,
                timeout_seconds = self.timeout.as_secs_f64(),
                error = %e,
                "attachment_fetch_timeout"
            );
        } else {
            error!(url = %descriptor.url, error = %e, "attachment_fetch_error");
        }

        NormalizeError::AttachmentRequest {
            url: descriptor.url.clone(),
            source: e,
        }
    }

}

/// Write `body` into a new temp file and rewind it. Blocking.
fn write_temp_file(dir: Option<&Path>, name: &str, body: &[u8]) -> io::Result<NamedTempFile> {
    let prefix = temp_prefix(name);
    let mut builder = Builder::new();
    builder.prefix(&prefix);

    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(body)?;
    file.flush()?;
    file.rewind()?;
    Ok(file)
}

/// File-name-safe prefix for an attachment's temp file.
fn temp_prefix(name: &str) -> String {
    let prefix: String = name
        .chars()
        .take(64)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if prefix.is_empty() {
        "attachment".to_string()
    } else {
        prefix
    }
}
