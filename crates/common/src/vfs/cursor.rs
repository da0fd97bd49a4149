//! Path resolution and structural mutations over a shared tree.
//!
//! Paths are `/`-separated. A leading `/` starts at the root, empty
//!  segments are dropped, `.` stays put and `..` moves to the parent (a
//!  no-op at the root). Every other segment must be a legal name and is
//!  looked up as a direct subfolder. Folder links are only followed by the
//!  `*_following_links` variants.
//!
//! Mutations resolve and check both endpoints before touching the tree,
//!  so a failed operation leaves it exactly as it was.

use chrono::{DateTime, Utc};

use super::error::FsError;
use super::folder::{check_link_target, FolderId, Listing};
use super::fs::{Fs, FsInner};
use super::name::validate_name;
use super::tree::Tree;

/// Which table an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// Metadata about a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub serial: String,
    pub size: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Split a path into its directory and leaf at the last `/`.
///
/// No slash means the directory is `.`; a slash at position 0 means the
///  root. Trailing slashes are ignored.
pub fn split_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        return ("/", "");
    }
    match trimmed.rfind('/') {
        None => (".", trimmed),
        Some(0) => ("/", &trimmed[1..]),
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
    }
}

#[derive(Debug, Clone)]
struct Position {
    current: FolderId,
    stack: Vec<String>,
}

fn walk(tree: &Tree, from: Position, path: &str, follow_links: bool) -> Result<Position, FsError> {
    let mut pos = if path.starts_with('/') {
        Position {
            current: tree.root(),
            stack: Vec::new(),
        }
    } else {
        from
    };
    // the current folder must still exist even for an empty walk
    tree.folder(pos.current)?;

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        match segment {
            "." => {}
            ".." => {
                pos.current = tree.parent(pos.current)?;
                pos.stack.pop();
            }
            name => {
                validate_name(name)?;
                let folder = tree.folder(pos.current)?;
                match folder.subfolder(name) {
                    Ok(id) => {
                        pos.current = id;
                        pos.stack.push(name.to_string());
                    }
                    Err(FsError::NotFound(_)) if follow_links && folder.has_folder_link(name) => {
                        let target = folder.folder_link(name).unwrap_or_default().to_string();
                        tracing::trace!("following folder link {} -> {}", name, target);
                        pos = walk(tree, pos, &target, false)?;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }
    Ok(pos)
}

/// Resolve the directory part of `path` and validate its leaf name.
fn resolve_parent(
    tree: &Tree,
    from: Position,
    path: &str,
) -> Result<(Position, String), FsError> {
    let (dir, leaf) = split_path(path);
    validate_name(leaf)?;
    let pos = walk(tree, from, dir, false)?;
    Ok((pos, leaf.to_string()))
}

/// A navigable position in a shared tree.
///
/// Cloning a cursor yields an independent cursor over the same tree, which
///  is how speculative resolution is done without moving the caller.
#[derive(Debug, Clone)]
pub struct Cursor {
    fs: Fs,
    epoch: u64,
    current: FolderId,
    stack: Vec<String>,
}

impl Cursor {
    pub(crate) fn at_root(fs: Fs) -> Self {
        let (epoch, root) = {
            let inner = fs.lock();
            (inner.tree.epoch(), inner.tree.root())
        };
        Self {
            fs,
            epoch,
            current: root,
            stack: Vec::new(),
        }
    }

    pub fn fs(&self) -> &Fs {
        &self.fs
    }

    pub fn current(&self) -> FolderId {
        self.current
    }

    /// Folder names from the root down to the cursor. Read from the tree,
    ///  so moving an ancestor is reflected; falls back to the names the
    ///  cursor last walked once its folder is gone.
    pub fn path_stack(&self) -> Vec<String> {
        let inner = self.fs.lock();
        let tree = inner.tree();
        if tree.epoch() == self.epoch {
            if let Ok(names) = tree.path_of(self.current) {
                return names;
            }
        }
        self.stack.clone()
    }

    pub fn full_path(&self) -> String {
        format!("/{}", self.path_stack().join("/"))
    }

    /// Independent cursor at the same position.
    pub fn duplicate(&self) -> Cursor {
        self.clone()
    }

    /// Has the tree this cursor was made for been replaced?
    pub fn is_stale(&self) -> bool {
        self.fs.lock().tree.epoch() != self.epoch
    }

    /// Move back to the root of whatever tree the store now holds.
    pub fn reset(&mut self) {
        *self = Cursor::at_root(self.fs.clone());
    }

    fn position(&self) -> Position {
        Position {
            current: self.current,
            stack: self.stack.clone(),
        }
    }

    pub(crate) fn check_epoch(&self, tree: &Tree) -> Result<(), FsError> {
        if tree.epoch() != self.epoch {
            return Err(FsError::NotFound(
                "cursor refers to a tree that has been replaced".to_string(),
            ));
        }
        Ok(())
    }

    fn commit(&mut self, pos: Position) {
        self.current = pos.current;
        self.stack = pos.stack;
    }

    /// Resolve `path` and move there. On failure the cursor stays put.
    pub fn goto_path(&mut self, path: &str) -> Result<FolderId, FsError> {
        self.goto(path, false)
    }

    /// Like [`Cursor::goto_path`], but a segment naming a folder link is
    ///  resolved through the link's stored path.
    pub fn goto_path_following_links(&mut self, path: &str) -> Result<FolderId, FsError> {
        self.goto(path, true)
    }

    fn goto(&mut self, path: &str, follow_links: bool) -> Result<FolderId, FsError> {
        let pos = {
            let inner = self.fs.lock();
            self.check_epoch(&inner.tree)?;
            walk(&inner.tree, self.position(), path, follow_links)?
        };
        let id = pos.current;
        self.commit(pos);
        Ok(id)
    }

    /// `mkdir -p`: create every missing folder along `path`.
    ///
    /// All segments are checked before anything is created. The cursor only
    ///  moves to the final folder when `goto_new_folder` is set.
    pub fn create_path(&mut self, path: &str, goto_new_folder: bool) -> Result<&mut Self, FsError> {
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment != "." && segment != ".." {
                validate_name(segment)?;
            }
        }

        let pos = {
            let mut inner = self.fs.lock();
            self.check_epoch(&inner.tree)?;
            let tree = &mut inner.tree;
            let mut pos = if path.starts_with('/') {
                Position {
                    current: tree.root(),
                    stack: Vec::new(),
                }
            } else {
                self.position()
            };
            tree.folder(pos.current)?;

            for segment in path.split('/').filter(|s| !s.is_empty()) {
                match segment {
                    "." => {}
                    ".." => {
                        pos.current = tree.parent(pos.current)?;
                        pos.stack.pop();
                    }
                    name => {
                        let next = match tree.subfolder(pos.current, name) {
                            Ok(id) => id,
                            Err(FsError::NotFound(_)) => {
                                tree.create_subfolder(pos.current, false, name)?.0
                            }
                            Err(err) => return Err(err),
                        };
                        pos.current = next;
                        pos.stack.push(name.to_string());
                    }
                }
            }
            pos
        };

        if goto_new_folder {
            self.commit(pos);
        }
        Ok(self)
    }

    fn with_inner<T>(
        &self,
        op: impl FnOnce(&mut FsInner, Position) -> Result<T, FsError>,
    ) -> Result<T, FsError> {
        let mut inner = self.fs.lock();
        self.check_epoch(&inner.tree)?;
        op(&mut inner, self.position())
    }

    pub fn list(&self, path: &str) -> Result<Listing, FsError> {
        self.with_inner(|inner, pos| {
            let pos = walk(&inner.tree, pos, path, false)?;
            Ok(inner.tree.folder(pos.current)?.list_contents())
        })
    }

    /// Create a single folder; its parent must already exist.
    pub fn make_folder(&self, path: &str, fix_duplicate: bool) -> Result<String, FsError> {
        self.with_inner(|inner, pos| {
            let (dir, leaf) = resolve_parent(&inner.tree, pos, path)?;
            let (_, name) = inner
                .tree
                .create_subfolder(dir.current, fix_duplicate, &leaf)?;
            Ok(name)
        })
    }

    /// Create an empty file with a fresh serial. Returns the name used.
    pub fn create_file(&self, path: &str, fix_duplicate: bool) -> Result<String, FsError> {
        self.with_inner(|inner, pos| {
            let (dir, leaf) = resolve_parent(&inner.tree, pos, path)?;
            let (tree, serials) = inner.parts_mut();
            let folder = tree.folder_mut(dir.current)?;
            let (_, name) = folder.create_file(fix_duplicate, &leaf, serials.next_serial())?;
            tracing::debug!("created file {}", name);
            Ok(name)
        })
    }

    /// Create the file if missing, otherwise bump its `updated_at`.
    pub fn touch(&self, path: &str) -> Result<(), FsError> {
        self.with_inner(|inner, pos| {
            let (dir, leaf) = resolve_parent(&inner.tree, pos, path)?;
            let (tree, serials) = inner.parts_mut();
            let folder = tree.folder_mut(dir.current)?;
            if folder.has_file(&leaf) {
                folder.get_file_mut(&leaf)?.touch();
            } else {
                folder.create_file(false, &leaf, serials.next_serial())?;
            }
            Ok(())
        })
    }

    pub fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        self.with_inner(|inner, pos| {
            let (dir, leaf) = resolve_parent(&inner.tree, pos, path)?;
            Ok(inner
                .tree
                .folder(dir.current)?
                .get_file(&leaf)?
                .content()
                .to_vec())
        })
    }

    /// Read a file, resolving the leaf through a file link when no file of
    ///  that name exists. Link targets are resolved from the folder holding
    ///  the link, and are not followed any further.
    pub fn read_file_following_links(&self, path: &str) -> Result<Vec<u8>, FsError> {
        self.with_inner(|inner, pos| {
            let (dir, leaf) = resolve_parent(&inner.tree, pos, path)?;
            let folder = inner.tree.folder(dir.current)?;
            if folder.has_file(&leaf) {
                return Ok(folder.get_file(&leaf)?.content().to_vec());
            }
            let target = folder
                .file_link(&leaf)
                .ok_or_else(|| FsError::NotFound(format!("file {}", leaf)))?
                .to_string();
            let (target_dir, target_leaf) = resolve_parent(&inner.tree, dir, &target)?;
            Ok(inner
                .tree
                .folder(target_dir.current)?
                .get_file(&target_leaf)?
                .content()
                .to_vec())
        })
    }

    /// Replace a file's content, creating the file first if needed.
    pub fn write_file(&self, path: &str, content: Vec<u8>) -> Result<(), FsError> {
        self.with_inner(|inner, pos| {
            let (dir, leaf) = resolve_parent(&inner.tree, pos, path)?;
            let (tree, serials) = inner.parts_mut();
            let folder = tree.folder_mut(dir.current)?;
            if folder.has_file(&leaf) {
                folder.get_file_mut(&leaf)?.set_content(content);
            } else {
                let (file, _) = folder.create_file(false, &leaf, serials.next_serial())?;
                file.set_content(content);
            }
            Ok(())
        })
    }

    pub fn file_info(&self, path: &str) -> Result<FileInfo, FsError> {
        self.with_inner(|inner, pos| {
            let (dir, leaf) = resolve_parent(&inner.tree, pos, path)?;
            let file = inner.tree.folder(dir.current)?.get_file(&leaf)?;
            Ok(FileInfo {
                name: leaf,
                serial: file.serial().to_string(),
                size: file.size(),
                created_at: file.created_at(),
                updated_at: file.updated_at(),
            })
        })
    }

    /// Record a link named by the leaf of `path` pointing at `target`.
    ///  The target is stored as given and not checked for existence.
    pub fn link(
        &self,
        kind: EntryKind,
        target: &str,
        path: &str,
        fix_duplicate: bool,
    ) -> Result<String, FsError> {
        check_link_target(target)?;
        self.with_inner(|inner, pos| {
            let (dir, leaf) = resolve_parent(&inner.tree, pos, path)?;
            let folder = inner.tree.folder_mut(dir.current)?;
            match kind {
                EntryKind::File => folder.create_file_link(fix_duplicate, &leaf, target),
                EntryKind::Folder => folder.create_folder_link(fix_duplicate, &leaf, target),
            }
        })
    }

    pub fn unlink(&self, kind: EntryKind, path: &str) -> Result<(), FsError> {
        self.with_inner(|inner, pos| {
            let (dir, leaf) = resolve_parent(&inner.tree, pos, path)?;
            let folder = inner.tree.folder_mut(dir.current)?;
            match kind {
                EntryKind::File => folder.delete_file_link(&leaf)?,
                EntryKind::Folder => folder.delete_folder_link(&leaf)?,
            };
            Ok(())
        })
    }

    /// Move a file or folder.
    ///
    /// Files fail with `AlreadyExists` when the destination name is taken.
    ///  A folder moved onto an existing folder of the same name is merged
    ///  into it; otherwise it is reattached under the new name.
    pub fn move_entry(&self, kind: EntryKind, from: &str, to: &str) -> Result<(), FsError> {
        self.with_inner(|inner, pos| {
            let tree = &mut inner.tree;
            let (src, src_name) = resolve_parent(tree, pos.clone(), from)?;
            let (dst, dst_name) = resolve_parent(tree, pos, to)?;

            match kind {
                EntryKind::File => {
                    tree.folder(src.current)?.get_file(&src_name)?;
                    if tree.folder(dst.current)?.has_file(&dst_name) {
                        return Err(FsError::AlreadyExists(to.to_string()));
                    }
                    if src.current == dst.current {
                        tree.folder_mut(src.current)?
                            .rename_file(&src_name, &dst_name)?;
                    } else {
                        let file = tree.folder_mut(src.current)?.delete_file(&src_name)?;
                        tree.folder_mut(dst.current)?.insert_file(&dst_name, file)?;
                    }
                }
                EntryKind::Folder => {
                    let moved = tree.subfolder(src.current, &src_name)?;
                    if tree.is_ancestor(moved, dst.current)? {
                        return Err(FsError::InvalidArgument(format!(
                            "cannot move {} into itself",
                            from
                        )));
                    }
                    let existing = tree.folder(dst.current)?.subfolders.get(&dst_name).copied();
                    match existing {
                        Some(existing) if existing == moved => {
                            return Err(FsError::InvalidArgument(format!(
                                "cannot move {} onto itself",
                                from
                            )));
                        }
                        Some(existing) => {
                            tree.check_merge(existing, moved)?;
                            tree.detach_subfolder(src.current, &src_name)?;
                            tree.merge_from(existing, moved)?;
                        }
                        None => {
                            tree.detach_subfolder(src.current, &src_name)?;
                            tree.attach_subfolder(dst.current, &dst_name, moved)?;
                        }
                    }
                }
            }
            tracing::debug!("moved {:?} {} -> {}", kind, from, to);
            Ok(())
        })
    }

    /// Copy a file or folder. Every copied file gets a new serial and its
    ///  own content. Copying a folder onto an existing folder of the same
    ///  name merges the copy into it.
    pub fn copy_entry(&self, kind: EntryKind, from: &str, to: &str) -> Result<(), FsError> {
        self.with_inner(|inner, pos| {
            let (tree, serials) = inner.parts_mut();
            let (src, src_name) = resolve_parent(tree, pos.clone(), from)?;
            let (dst, dst_name) = resolve_parent(tree, pos, to)?;

            match kind {
                EntryKind::File => {
                    let file = tree.folder(src.current)?.get_file(&src_name)?;
                    if tree.folder(dst.current)?.has_file(&dst_name) {
                        return Err(FsError::AlreadyExists(to.to_string()));
                    }
                    let copy = file.duplicate(serials.next_serial())?;
                    tree.folder_mut(dst.current)?.insert_file(&dst_name, copy)?;
                }
                EntryKind::Folder => {
                    let source = tree.subfolder(src.current, &src_name)?;
                    let existing = tree.folder(dst.current)?.subfolders.get(&dst_name).copied();
                    match existing {
                        Some(existing) => {
                            tree.check_merge(existing, source)?;
                            let scratch = tree.deep_copy(source, existing, serials)?;
                            tree.merge_from(existing, scratch)?;
                        }
                        None => {
                            let copy = tree.deep_copy(source, dst.current, serials)?;
                            tree.attach_subfolder(dst.current, &dst_name, copy)?;
                        }
                    }
                }
            }
            tracing::debug!("copied {:?} {} -> {}", kind, from, to);
            Ok(())
        })
    }

    /// Remove a file or folder. A removed folder's contents go with it.
    pub fn delete_entry(&self, kind: EntryKind, path: &str) -> Result<(), FsError> {
        self.with_inner(|inner, pos| {
            let (dir, leaf) = resolve_parent(&inner.tree, pos, path)?;
            match kind {
                EntryKind::File => {
                    inner.tree.folder_mut(dir.current)?.delete_file(&leaf)?;
                }
                EntryKind::Folder => inner.tree.delete_subfolder(dir.current, &leaf)?,
            }
            tracing::debug!("deleted {:?} {}", kind, path);
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("file"), (".", "file"));
        assert_eq!(split_path("/file"), ("/", "file"));
        assert_eq!(split_path("a/b/c"), ("a/b", "c"));
        assert_eq!(split_path("/a/b/"), ("/a", "b"));
        assert_eq!(split_path("../x"), ("..", "x"));
        assert_eq!(split_path("/"), ("/", ""));
    }

    #[test]
    fn test_goto_and_full_path() {
        let fs = Fs::new();
        let mut cursor = fs.cursor();
        cursor.create_path("/a/b", true).unwrap();
        assert_eq!(cursor.full_path(), "/a/b");

        cursor.goto_path("..").unwrap();
        assert_eq!(cursor.full_path(), "/a");
        cursor.goto_path("../../..").unwrap();
        assert_eq!(cursor.full_path(), "/");
        cursor.goto_path("a/./b").unwrap();
        assert_eq!(cursor.path_stack(), ["a", "b"]);
    }

    #[test]
    fn test_failed_goto_leaves_cursor() {
        let fs = Fs::new();
        let mut cursor = fs.cursor();
        cursor.create_path("a/b", true).unwrap();
        let before = cursor.current();

        assert!(matches!(cursor.goto_path("/a/missing"), Err(FsError::NotFound(_))));
        assert!(matches!(cursor.goto_path("/a/bad\0"), Err(FsError::InvalidName(_))));
        assert_eq!(cursor.current(), before);
        assert_eq!(cursor.full_path(), "/a/b");
    }

    #[test]
    fn test_create_path_validates_first() {
        let fs = Fs::new();
        let mut cursor = fs.cursor();
        let result = cursor.create_path("a/b/bad\rname", true).map(|_| ());
        assert!(matches!(result, Err(FsError::InvalidName(_))));
        assert!(cursor.list("/").unwrap().is_empty());
    }

    #[test]
    fn test_create_path_without_goto() {
        let fs = Fs::new();
        let mut cursor = fs.cursor();
        cursor.create_path("x/y", false).unwrap();
        assert_eq!(cursor.full_path(), "/");
        assert_eq!(cursor.list("x").unwrap().subfolders, vec!["y"]);
    }

    #[test]
    fn test_duplicate_is_independent() {
        let fs = Fs::new();
        let mut cursor = fs.cursor();
        cursor.create_path("a", true).unwrap();
        let mut other = cursor.duplicate();
        other.goto_path("/").unwrap();
        assert_eq!(cursor.full_path(), "/a");
        assert_eq!(other.full_path(), "/");

        other.create_file("/a/shared", false).unwrap();
        assert!(cursor.read_file("shared").is_ok());
    }

    #[test]
    fn test_folder_links_only_followed_on_request() {
        let fs = Fs::new();
        let mut cursor = fs.cursor();
        cursor.create_path("/deep/target", false).unwrap();
        cursor
            .link(EntryKind::Folder, "/deep/target", "/shortcut", false)
            .unwrap();

        assert!(matches!(
            cursor.goto_path("/shortcut"),
            Err(FsError::NotFound(_))
        ));
        cursor.goto_path_following_links("/shortcut").unwrap();
        assert_eq!(cursor.full_path(), "/deep/target");
    }

    #[test]
    fn test_file_links_only_followed_on_request() {
        let fs = Fs::new();
        let cursor = fs.cursor();
        cursor.write_file("/data.txt", b"payload".to_vec()).unwrap();
        cursor
            .link(EntryKind::File, "/data.txt", "/alias", false)
            .unwrap();

        assert!(matches!(cursor.read_file("/alias"), Err(FsError::NotFound(_))));
        assert_eq!(
            cursor.read_file_following_links("/alias").unwrap(),
            b"payload"
        );

        cursor
            .link(EntryKind::File, "/nowhere", "/dangling", false)
            .unwrap();
        assert!(matches!(
            cursor.read_file_following_links("/dangling"),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_touch_and_write() {
        let fs = Fs::new();
        let cursor = fs.cursor();
        cursor.touch("t").unwrap();
        let info = cursor.file_info("t").unwrap();
        assert_eq!(info.size, 0);
        cursor.touch("t").unwrap();
        assert_eq!(cursor.file_info("t").unwrap().serial, info.serial);

        cursor.write_file("t", b"abc".to_vec()).unwrap();
        assert_eq!(cursor.read_file("t").unwrap(), b"abc");
        assert_eq!(cursor.file_info("t").unwrap().serial, info.serial);
    }

    #[test]
    fn test_stale_cursor_after_tree_replacement() {
        let fs = Fs::new();
        let mut cursor = fs.cursor();
        fs.lock().tree = Tree::new();
        assert!(cursor.is_stale());
        assert!(matches!(cursor.list("."), Err(FsError::NotFound(_))));
        cursor.reset();
        assert!(!cursor.is_stale());
        assert!(cursor.list(".").is_ok());
    }
}
