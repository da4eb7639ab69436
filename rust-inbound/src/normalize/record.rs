//! Normalized output types.

use std::fs;
use std::io;
use std::path::Path;

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use tempfile::NamedTempFile;

/// Canonical email record handed to the mail-processing layer.
#[derive(Debug, Serialize)]
pub struct NormalizedRecord {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub attachments: Vec<Attachment>,
    /// Raw `Name: value` header block, one header per line.
    pub headers: String,
}

/// An attachment downloaded into a temporary file.
///
/// The file is removed when the attachment is dropped, unless it was taken
/// over with [`Attachment::into_temp_file`].
#[derive(Debug)]
pub struct Attachment {
    filename: String,
    content_type: String,
    size: u64,
    file: NamedTempFile,
}

impl Attachment {
    pub(crate) fn new(filename: String, content_type: String, size: u64, file: NamedTempFile) -> Self {
        Self {
            filename,
            content_type,
            size,
            file,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Size of the fetched body in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the full attachment body.
    pub fn content(&self) -> io::Result<Vec<u8>> {
        fs::read(self.file.path())
    }

    pub fn into_temp_file(self) -> NamedTempFile {
        self.file
    }
}

impl Serialize for Attachment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Attachment", 3)?;
        state.serialize_field("filename", &self.filename)?;
        state.serialize_field("content_type", &self.content_type)?;
        state.serialize_field("size", &self.size)?;
        state.end()
    }
}
