//! Raw Mailgun webhook parameters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Form parameters exactly as Mailgun posted them.
///
/// Mailgun mixes plain fields (`recipient`, `subject`, `body-plain`) with
/// JSON-encoded ones (`message-headers`, `attachments`), so everything is
/// kept as strings and decoded on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InboundPayload {
    params: HashMap<String, String>,
}

impl InboundPayload {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Raw value for `key`, even if it is blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Value for `key` only when it carries something other than whitespace.
    pub fn present(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| is_present(v))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for InboundPayload
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Blank strings (empty or whitespace only) count as missing.
pub(crate) fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}
