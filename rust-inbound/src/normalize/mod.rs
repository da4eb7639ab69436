//! Mailgun webhook normalization.
//!
//! Turns the form parameters Mailgun posts for an inbound message into a
//! [`NormalizedRecord`].
//!
//! ## Processing Flow
//!
//! ```text
//! InboundPayload → resolve fields (params, then message-headers) ┐
//!                → parse attachment descriptors → fetch each ─────┴→ NormalizedRecord
//! ```

pub mod attachments;
pub mod error;
pub mod headers;
pub mod payload;
pub mod recipients;
pub mod record;

#[cfg(test)]
pub(crate) mod test_support;

use std::cell::OnceCell;

use tracing::info;

pub use attachments::{parse_descriptors, AttachmentDescriptor, AttachmentFetcher, ATTACHMENTS_PARAM};
pub use error::NormalizeError;
pub use headers::HeaderSet;
pub use payload::InboundPayload;
pub use recipients::split_addresses;
pub use record::{Attachment, NormalizedRecord};

/// Normalize one webhook payload.
///
/// Attachments are downloaded sequentially; any failure discards the whole
/// record.
pub async fn normalize(
    payload: &InboundPayload,
    fetcher: &AttachmentFetcher,
) -> Result<NormalizedRecord, NormalizeError> {
    info!(
        param_count = payload.len(),
        has_message_headers = payload.get(headers::MESSAGE_HEADERS_PARAM).is_some(),
        has_attachments = payload.get(ATTACHMENTS_PARAM).is_some(),
        "normalize_start"
    );

    let fields = FieldResolver::new(payload).resolve()?;
    let descriptors = parse_descriptors(payload.get(ATTACHMENTS_PARAM))?;
    let attachments = fetcher.materialize_all(&descriptors).await?;

    let record = NormalizedRecord {
        attachments,
        ..fields
    };

    info!(
        to_count = record.to.len(),
        cc_count = record.cc.len(),
        has_from = record.from.is_some(),
        has_text = record.text.is_some(),
        has_html = record.html.is_some(),
        attachment_count = record.attachments.len(),
        "normalize_complete"
    );

    Ok(record)
}

/// Resolves the scalar fields of one payload.
///
/// The header set is parsed the first time a field needs it and reused
/// for the rest of the call.
struct FieldResolver<'a> {
    payload: &'a InboundPayload,
    headers: OnceCell<HeaderSet>,
}

impl<'a> FieldResolver<'a> {
    fn new(payload: &'a InboundPayload) -> Self {
        Self {
            payload,
            headers: OnceCell::new(),
        }
    }

    /// Everything except attachments.
    fn resolve(self) -> Result<NormalizedRecord, NormalizeError> {
        Ok(NormalizedRecord {
            to: self.to()?,
            cc: self.cc()?,
            bcc: self.bcc()?,
            from: self.sender()?,
            subject: self.param("subject"),
            text: self.param("body-plain"),
            html: self.param("body-html"),
            attachments: Vec::new(),
            headers: self.headers()?.to_string(),
        })
    }

    fn headers(&self) -> Result<&HeaderSet, NormalizeError> {
        if let Some(headers) = self.headers.get() {
            return Ok(headers);
        }
        let headers = HeaderSet::from_payload(self.payload)?;
        Ok(self.headers.get_or_init(|| headers))
    }

    fn param(&self, key: &str) -> Option<String> {
        self.payload.get(key).map(str::to_string)
    }

    fn param_or_header(&self, key: &str) -> Result<Option<&str>, NormalizeError> {
        match self.payload.present(key) {
            Some(value) => Ok(Some(value)),
            None => Ok(self.headers()?.present(key)),
        }
    }

    fn sender(&self) -> Result<Option<String>, NormalizeError> {
        let sender = match self.headers()?.present("Reply-To") {
            Some(reply_to) => Some(reply_to),
            None => match self.param_or_header("Reply-To")? {
                Some(reply_to) => Some(reply_to),
                None => match self.param_or_header("From")? {
                    Some(from) => Some(from),
                    None => self.payload.present("sender"),
                },
            },
        };
        Ok(sender.map(str::to_string))
    }

    fn to(&self) -> Result<Vec<String>, NormalizeError> {
        let to = match self.param_or_header("To")? {
            Some(to) => to,
            None => self
                .payload
                .get("recipient")
                .ok_or(NormalizeError::MissingRecipient)?,
        };
        Ok(split_addresses(to))
    }

    fn cc(&self) -> Result<Vec<String>, NormalizeError> {
        Ok(split_addresses(self.param_or_header("Cc")?.unwrap_or_default()))
    }

    /// Bcc is passed through as a single entry, not split.
    fn bcc(&self) -> Result<Vec<String>, NormalizeError> {
        Ok(self
            .param_or_header("Bcc")?
            .map(|bcc| vec![bcc.to_string()])
            .unwrap_or_default())
    }
}
