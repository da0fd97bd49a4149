/**
 * In-memory virtual file store.
 *  - Folder tree held in an arena, addressed by
 *    slash-separated paths through a cursor
 *  - Serials identifying every file's content
 *  - Portable manifest and zip export
 */
pub mod vfs;
/**
 * Persisting a tree to a remote content store
 *  and recovering it again, over an abstract
 *  blob store keyed by serial.
 */
pub mod sync;

pub mod prelude {
    pub use crate::sync::{
        push, recover, Blob, ContentStore, ContentStoreError, MemoryContentStore, SyncSummary,
        UserKey,
    };
    pub use crate::vfs::{Cursor, EntryKind, FileInfo, Fs, FsError, Listing, Manifest};
}
