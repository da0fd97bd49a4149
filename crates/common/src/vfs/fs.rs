use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::cursor::Cursor;
use super::error::FsError;
use super::manifest::Manifest;
use super::serial::SerialSource;
use super::tree::Tree;

/// The tree together with the serial source that names its files.
#[derive(Debug, Default)]
pub struct FsInner {
    pub(crate) tree: Tree,
    pub(crate) serials: SerialSource,
}

impl FsInner {
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn serials(&self) -> &SerialSource {
        &self.serials
    }

    pub fn serials_mut(&mut self) -> &mut SerialSource {
        &mut self.serials
    }

    /// Split borrow for operations that need both at once.
    pub fn parts_mut(&mut self) -> (&mut Tree, &mut SerialSource) {
        (&mut self.tree, &mut self.serials)
    }
}

/// Shared handle to one virtual file store.
///
/// Cloning is cheap and every clone (and every [`Cursor`] made from one)
///  sees the same tree. All tree operations are synchronous, so the lock
///  is only ever held for the duration of a single operation.
#[derive(Clone, Default)]
pub struct Fs(Arc<Mutex<FsInner>>);

impl fmt::Debug for Fs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.lock();
        f.debug_struct("Fs")
            .field("folders", &inner.tree.len())
            .field("epoch", &inner.tree.epoch())
            .field("serials", &inner.serials.len())
            .finish()
    }
}

impl Fs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_serial_source(serials: SerialSource) -> Self {
        Self(Arc::new(Mutex::new(FsInner {
            tree: Tree::new(),
            serials,
        })))
    }

    pub fn lock(&self) -> MutexGuard<'_, FsInner> {
        self.0.lock()
    }

    /// A cursor positioned at the root.
    pub fn cursor(&self) -> Cursor {
        Cursor::at_root(self.clone())
    }

    pub fn manifest(&self) -> Result<Manifest, FsError> {
        let inner = self.lock();
        inner.tree.serialize_manifest(inner.tree.root())
    }

    /// Do two handles share the same store?
    pub fn same_store(&self, other: &Fs) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
