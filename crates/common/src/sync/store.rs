use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Shortest and longest legal user key, in characters.
pub const MIN_USER_KEY_LEN: usize = 6;
pub const MAX_USER_KEY_LEN: usize = 1_048_577;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentStoreError {
    #[error("invalid user key")]
    InvalidUserKey,
    #[error("invalid serial: {0}")]
    InvalidSerial(String),
    #[error("blob not found: {0}")]
    NotFound(String),
    /// The request never produced a usable response
    #[error("transport error: {0}")]
    Transport(String),
    /// The store answered, but with an error
    #[error("store rejected request: {0}")]
    Rejected(String),
    /// The store answered with something we could not decode
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Key that scopes every blob to one user on the content store.
///
/// Matches `[A-Za-z_][A-Za-z0-9_]{5,1048576}`. The key is a credential, so
///  it is never printed in full.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct UserKey(String);

impl UserKey {
    pub fn parse(raw: &str) -> Result<Self, ContentStoreError> {
        let bytes = raw.as_bytes();
        if bytes.len() < MIN_USER_KEY_LEN || bytes.len() > MAX_USER_KEY_LEN {
            return Err(ContentStoreError::InvalidUserKey);
        }
        let head_ok = bytes[0].is_ascii_alphabetic() || bytes[0] == b'_';
        let tail_ok = bytes[1..]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'_');
        if !(head_ok && tail_ok) {
            return Err(ContentStoreError::InvalidUserKey);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for UserKey {
    type Err = ContentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserKey({}...)", &self.0[..3])
    }
}

/// One stored object: raw content plus the timestamps of the file it
///  belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content: Bytes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blob {
    pub fn new(content: impl Into<Bytes>) -> Self {
        let now = Utc::now();
        Self {
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Remote key-value store the tree is pushed to and recovered from.
///
/// Blobs are keyed by `(user_key, serial)`. The serial `ROOT` is reserved
///  for the manifest.
#[async_trait]
pub trait ContentStore: Send + Sync + fmt::Debug {
    async fn write_blob(
        &self,
        user_key: &UserKey,
        serial: &str,
        blob: Blob,
    ) -> Result<(), ContentStoreError>;

    async fn read_blob(&self, user_key: &UserKey, serial: &str) -> Result<Blob, ContentStoreError>;
}
