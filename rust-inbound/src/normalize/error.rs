//! Normalization errors.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that abort the normalization of a webhook payload.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed message-headers JSON: {0}")]
    MalformedHeaders(#[source] serde_json::Error),
    #[error("malformed attachments JSON: {0}")]
    MalformedAttachments(#[source] serde_json::Error),
    #[error("missing required field: To or recipient")]
    MissingRecipient,
    #[error("invalid attachment url {url}: {source}")]
    InvalidAttachmentUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported attachment url scheme {scheme} in {url}")]
    UnsupportedAttachmentScheme { url: String, scheme: String },
    #[error("attachment request to {url} failed: {source}")]
    AttachmentRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("attachment request to {url} returned {status}")]
    AttachmentStatus { url: String, status: StatusCode },
    #[error("failed to buffer attachment: {0}")]
    AttachmentIo(#[from] std::io::Error),
}

impl NormalizeError {
    /// Whether the payload itself is at fault, as opposed to the attachment
    /// source or local storage.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedHeaders(_)
                | Self::MalformedAttachments(_)
                | Self::MissingRecipient
                | Self::InvalidAttachmentUrl { .. }
                | Self::UnsupportedAttachmentScheme { .. }
        )
    }
}
