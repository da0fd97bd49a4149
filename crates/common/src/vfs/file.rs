use chrono::{DateTime, Utc};

use super::error::FsError;
use super::name::is_legal_name;

/// A leaf of the tree: an immutable serial plus mutable content.
///
/// The serial is the file's identity on the content store; it never
///  changes once the file exists. Copies get a new serial and their own
///  content buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    serial: String,
    content: Vec<u8>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl File {
    pub fn new(serial: impl Into<String>, content: Vec<u8>) -> Result<Self, FsError> {
        let now = Utc::now();
        Self::with_timestamps(serial, content, now, now)
    }

    /// Rebuild a file whose timestamps are already known, e.g. from the
    ///  content store during recovery.
    pub fn with_timestamps(
        serial: impl Into<String>,
        content: Vec<u8>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, FsError> {
        let serial = serial.into();
        if !is_legal_name(&serial) {
            return Err(FsError::InvalidArgument(format!(
                "serial is not a legal name: {:?}",
                serial
            )));
        }
        Ok(Self {
            serial,
            content,
            created_at,
            updated_at,
        })
    }

    /// Same bytes under a new identity, with fresh timestamps.
    pub fn duplicate(&self, new_serial: impl Into<String>) -> Result<Self, FsError> {
        Self::new(new_serial, self.content.clone())
    }

    pub fn set_content(&mut self, content: Vec<u8>) {
        self.content = content;
        self.updated_at = Utc::now();
    }

    /// Bump `updated_at` without changing content.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
