use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::store::{Blob, ContentStore, ContentStoreError, UserKey};
use crate::vfs::is_valid_serial;

/// In-memory content store.
///
/// Mirrors the remote contract closely enough to test against: serials are
///  checked against the store grammar and blobs are scoped by user key.
///  Individual serials can be made to fail on read or write.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    inner: Arc<RwLock<MemoryContentStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryContentStoreInner {
    /// (user key, serial) -> blob
    blobs: HashMap<(String, String), Blob>,
    failing_reads: HashSet<String>,
    failing_writes: HashSet<String>,
}

fn lock_error<E: std::fmt::Display>(e: E) -> ContentStoreError {
    ContentStoreError::Transport(format!("failed to acquire lock: {}", e))
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read of `serial` fail.
    pub fn fail_reads_for(&self, serial: impl Into<String>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.failing_reads.insert(serial.into());
        }
    }

    /// Make every write of `serial` fail.
    pub fn fail_writes_for(&self, serial: impl Into<String>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.failing_writes.insert(serial.into());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.failing_reads.clear();
            inner.failing_writes.clear();
        }
    }

    /// Store a blob without any checks, e.g. to plant a corrupt manifest.
    pub fn insert_raw(&self, user_key: &UserKey, serial: impl Into<String>, blob: Blob) {
        if let Ok(mut inner) = self.inner.write() {
            inner
                .blobs
                .insert((user_key.as_str().to_string(), serial.into()), blob);
        }
    }

    pub fn get(&self, user_key: &UserKey, serial: &str) -> Option<Blob> {
        let inner = self.inner.read().ok()?;
        inner
            .blobs
            .get(&(user_key.as_str().to_string(), serial.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn write_blob(
        &self,
        user_key: &UserKey,
        serial: &str,
        blob: Blob,
    ) -> Result<(), ContentStoreError> {
        if !is_valid_serial(serial) {
            return Err(ContentStoreError::InvalidSerial(serial.to_string()));
        }
        let mut inner = self.inner.write().map_err(lock_error)?;
        if inner.failing_writes.contains(serial) {
            return Err(ContentStoreError::Rejected(format!(
                "write of {} refused",
                serial
            )));
        }
        inner
            .blobs
            .insert((user_key.as_str().to_string(), serial.to_string()), blob);
        Ok(())
    }

    async fn read_blob(&self, user_key: &UserKey, serial: &str) -> Result<Blob, ContentStoreError> {
        if !is_valid_serial(serial) {
            return Err(ContentStoreError::InvalidSerial(serial.to_string()));
        }
        let inner = self.inner.read().map_err(lock_error)?;
        if inner.failing_reads.contains(serial) {
            return Err(ContentStoreError::Rejected(format!(
                "read of {} refused",
                serial
            )));
        }
        inner
            .blobs
            .get(&(user_key.as_str().to_string(), serial.to_string()))
            .cloned()
            .ok_or_else(|| ContentStoreError::NotFound(serial.to_string()))
    }
}
