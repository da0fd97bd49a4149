//! Shared test utilities for the file store integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use common::sync::{MemoryContentStore, UserKey};
use common::vfs::{Cursor, Fs, SerialSource};

static NEXT_SERIAL: AtomicUsize = AtomicUsize::new(0);

/// Deterministic serials that still satisfy the content store grammar.
pub fn counting_serials() -> SerialSource {
    SerialSource::with_generator(|| {
        let n = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed);
        format!("s{:0>140}", n)
    })
}

/// Route tracing output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Set up a fresh store and a cursor at its root
pub fn setup_fs() -> (Fs, Cursor) {
    init_tracing();
    let fs = Fs::with_serial_source(counting_serials());
    let cursor = fs.cursor();
    (fs, cursor)
}

/// Set up a fresh store plus an empty content store and a user key
pub fn setup_sync_env() -> (Fs, Cursor, MemoryContentStore, UserKey) {
    let (fs, cursor) = setup_fs();
    let store = MemoryContentStore::new();
    let key = UserKey::parse("test_user_key").unwrap();
    (fs, cursor, store, key)
}

/// Write a file, creating its parent folders first
pub fn put(cursor: &Cursor, path: &str, content: &[u8]) {
    let (dir, _) = common::vfs::split_path(path);
    cursor.duplicate().create_path(dir, false).unwrap();
    cursor.write_file(path, content.to_vec()).unwrap();
}

/// Names in a folder, files and folders together, in listing order
pub fn names(cursor: &Cursor, path: &str) -> Vec<String> {
    let listing = cursor.list(path).unwrap();
    listing
        .subfolders
        .into_iter()
        .chain(listing.files)
        .collect()
}
