//! Virtual file store
//!
//! An in-memory tree of folders and files addressed by slash-separated
//!  paths:
//!
//! - **[`File`]**: a leaf with a fixed serial and mutable content
//! - **[`Folder`]**: a node holding files, subfolders and two link tables
//! - **[`Tree`]**: the arena that owns every folder of one store
//! - **[`Cursor`]**: a navigator over a tree that resolves paths and
//!   performs create/move/copy/delete
//! - **[`Manifest`]**: the portable, serial-only description of a tree
//! - **[`SerialSource`]**: hands out serials that are never reused
//!
//! # Layout
//!
//! ```text
//!            Fs (shared handle)
//!             |
//!      +------+-------+
//!      |              |
//!    Tree        SerialSource
//!      |
//!  [Folder; n]  <-- Cursor (FolderId + name stack)
//!      |
//!   File, File, ...
//! ```
//!
//! Folders refer to each other through [`FolderId`] handles into the
//!  arena. A folder's parent is just another handle, so there is no
//!  ownership cycle. Link tables store plain path strings that are only
//!  resolved when a caller asks for it, so they can point anywhere,
//!  including nowhere, without affecting the tree.

mod archive;
mod cursor;
mod error;
mod file;
mod folder;
mod fs;
mod manifest;
mod name;
mod serial;
mod tree;

pub use cursor::{split_path, Cursor, EntryKind, FileInfo};
pub use error::FsError;
pub use file::File;
pub use folder::{Folder, FolderId, Listing, EMPTY_LISTING};
pub use fs::{Fs, FsInner};
pub use manifest::Manifest;
pub use name::{is_legal_name, validate_name, NameTable, MAX_NAME_LEN};
pub use serial::{
    is_valid_serial, random_serial, SerialSource, MAX_SERIAL_LEN, MIN_SERIAL_LEN, ROOT_SERIAL,
};
pub use tree::Tree;
