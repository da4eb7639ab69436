//! Header set reconstructed from Mailgun's `message-headers` JSON.
//!
//! Mailgun already parses the MIME headers and posts them as a JSON array of
//! `[name, value]` pairs, e.g.:
//! `[["Message-Id", "<abc123@example.com>"], ["Subject", "Hello"], ...]`
//!
//! Downstream consumers expect an unparsed header block, so the set can be
//! rendered back into `Name: value` lines with [`std::fmt::Display`].

use std::fmt;

use tracing::{debug, warn};

use super::error::NormalizeError;
use super::payload::{is_present, InboundPayload};

/// Parameter holding the JSON-encoded header pairs.
pub const MESSAGE_HEADERS_PARAM: &str = "message-headers";

/// Parameter (and injected header) pointing at the stored message.
pub const MESSAGE_URL: &str = "message-url";

/// Ordered header set with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, Option<String>)>,
}

impl HeaderSet {
    /// Build the header set for one payload: the parsed `message-headers`
    /// followed by a `message-url` entry.
    pub fn from_payload(payload: &InboundPayload) -> Result<Self, NormalizeError> {
        let mut headers = match payload.get(MESSAGE_HEADERS_PARAM) {
            Some(raw) => Self::parse(raw)?,
            None => Self::default(),
        };

        headers.insert(MESSAGE_URL, payload.get(MESSAGE_URL).map(str::to_string));

        debug!(header_count = headers.len(), "headers_extracted");

        Ok(headers)
    }

    /// Parse a `message-headers` JSON array of `[name, value]` pairs.
    pub fn parse(raw: &str) -> Result<Self, NormalizeError> {
        let pairs: Vec<Vec<String>> = serde_json::from_str(raw).map_err(|e| {
            warn!(
                error = %e,
                headers_preview = %preview(raw),
                "message_headers_parse_failed"
            );
            NormalizeError::MalformedHeaders(e)
        })?;

        let mut headers = Self::default();
        for pair in pairs {
            let mut pair = pair.into_iter();
            if let Some(name) = pair.next() {
                headers.insert(name, pair.next());
            }
        }

        Ok(headers)
    }

    /// Insert a header. A name that already exists verbatim keeps its
    /// position and takes the new value.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Value for `name`, preferring an exact match over a case-insensitive one.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .or_else(|| self.entries.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)))
            .and_then(|(_, v)| v.as_deref())
    }

    /// Like [`HeaderSet::get`], but blank values count as missing.
    pub fn present(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| is_present(v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}: {}", name, value.unwrap_or_default())?;
        }
        Ok(())
    }
}

fn preview(raw: &str) -> &str {
    match raw.char_indices().nth(200) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(pairs: &[(&str, &str)]) -> InboundPayload {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_parse_preserves_order() {
        let headers =
            HeaderSet::parse(r#"[["Received", "by mx"], ["From", "a@example.com"], ["Subject", "Hi"]]"#)
                .unwrap();

        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Received", "From", "Subject"]);
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let headers = HeaderSet::parse(r#"[["reply-to", "r@example.com"]]"#).unwrap();

        assert_eq!(headers.get("Reply-To"), Some("r@example.com"));
        assert_eq!(headers.get("REPLY-TO"), Some("r@example.com"));
        assert!(headers.get("From").is_none());
    }

    #[test]
    fn test_get_prefers_exact_match() {
        let headers = HeaderSet::parse(r#"[["to", "lower@example.com"], ["To", "exact@example.com"]]"#)
            .unwrap();

        assert_eq!(headers.get("To"), Some("exact@example.com"));
        assert_eq!(headers.get("tO"), Some("lower@example.com"));
    }

    #[test]
    fn test_repeated_header_keeps_position_and_last_value() {
        let headers =
            HeaderSet::parse(r#"[["Received", "first"], ["X-Test", "v1"], ["Received", "second"]]"#)
                .unwrap();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.to_string(), "Received: second\nX-Test: v1");
    }

    #[test]
    fn test_short_pairs() {
        let headers = HeaderSet::parse(r#"[[], ["X-Empty"], ["X-Full", "yes"]]"#).unwrap();

        assert_eq!(headers.len(), 2);
        assert!(headers.get("X-Empty").is_none());
        assert_eq!(headers.to_string(), "X-Empty: \nX-Full: yes");
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = HeaderSet::parse("not valid json");

        assert!(matches!(result, Err(NormalizeError::MalformedHeaders(_))));
    }

    #[test]
    fn test_from_payload_injects_message_url() {
        let headers = HeaderSet::from_payload(&payload(&[
            (MESSAGE_HEADERS_PARAM, r#"[["X-Test", "v1"]]"#),
            (MESSAGE_URL, "http://m"),
        ]))
        .unwrap();

        assert_eq!(headers.to_string(), "X-Test: v1\nmessage-url: http://m");
        assert_eq!(headers.get("Message-Url"), Some("http://m"));
    }

    #[test]
    fn test_from_payload_without_message_url() {
        let headers = HeaderSet::from_payload(&payload(&[])).unwrap();

        assert_eq!(headers.len(), 1);
        assert!(headers.get(MESSAGE_URL).is_none());
        assert_eq!(headers.to_string(), "message-url: ");
    }

    #[test]
    fn test_present_skips_blank_values() {
        let headers = HeaderSet::parse(r#"[["Cc", "  "], ["Bcc", "b@example.com"]]"#).unwrap();

        assert!(headers.present("Cc").is_none());
        assert_eq!(headers.present("bcc"), Some("b@example.com"));
    }
}
