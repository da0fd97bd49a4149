use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use super::error::FsError;
use super::file::File;
use super::folder::{Folder, FolderId};
use super::manifest::{format_timestamp, parse_timestamp, Manifest};
use super::name::{validate_name, NameTable};
use super::serial::SerialSource;

static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// Arena holding every folder of one tree.
///
/// The root is its own parent, so walking `..` from the root stays put.
///  Removing a subfolder frees its whole subtree; handles are never
///  reused, so a stale [`FolderId`] resolves to `NotFound` instead of an
///  unrelated folder. Each tree carries an epoch that changes whenever the
///  tree is replaced wholesale.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<Folder>>,
    root: FolderId,
    epoch: u64,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        let root = FolderId(0);
        Self {
            nodes: vec![Some(Folder::new(root))],
            root,
            epoch: NEXT_EPOCH.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn root(&self) -> FolderId {
        self.root
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn folder(&self, id: FolderId) -> Result<&Folder, FsError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| FsError::NotFound(format!("folder {} no longer exists", id)))
    }

    pub fn folder_mut(&mut self, id: FolderId) -> Result<&mut Folder, FsError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| FsError::NotFound(format!("folder {} no longer exists", id)))
    }

    pub fn parent(&self, id: FolderId) -> Result<FolderId, FsError> {
        Ok(self.folder(id)?.parent)
    }

    /// Number of live folders.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.folder(self.root).map(Folder::is_empty).unwrap_or(true)
    }

    fn alloc(&mut self, folder: Folder) -> FolderId {
        self.nodes.push(Some(folder));
        FolderId(self.nodes.len() - 1)
    }

    fn free_subtree(&mut self, id: FolderId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(folder) = self.nodes.get_mut(next.0).and_then(Option::take) {
                stack.extend(folder.subfolders.iter().map(|(_, child)| *child));
            }
        }
    }

    /// Is `ancestor` equal to `id` or on its parent chain?
    pub fn is_ancestor(&self, ancestor: FolderId, id: FolderId) -> Result<bool, FsError> {
        let mut current = id;
        loop {
            if current == ancestor {
                return Ok(true);
            }
            let parent = self.parent(current)?;
            if parent == current {
                return Ok(false);
            }
            current = parent;
        }
    }

    /// Direct subfolder lookup; link tables are not consulted.
    /// Names from the root down to `id`. Empty for the root itself.
    pub fn path_of(&self, id: FolderId) -> Result<Vec<String>, FsError> {
        let mut names = Vec::new();
        let mut current = id;
        while current != self.root {
            let parent = self.parent(current)?;
            let name = self
                .folder(parent)?
                .subfolders
                .iter()
                .find(|(_, child)| **child == current)
                .map(|(name, _)| name.to_string())
                .ok_or_else(|| FsError::NotFound(format!("folder {} is detached", current)))?;
            names.push(name);
            current = parent;
        }
        names.reverse();
        Ok(names)
    }

    pub fn subfolder(&self, parent: FolderId, name: &str) -> Result<FolderId, FsError> {
        self.folder(parent)?.subfolder(name)
    }

    pub fn create_subfolder(
        &mut self,
        parent: FolderId,
        fix_duplicate: bool,
        name: &str,
    ) -> Result<(FolderId, String), FsError> {
        let name = self
            .folder(parent)?
            .subfolders
            .resolve_new_name(fix_duplicate, name)?;
        let id = self.alloc(Folder::new(parent));
        self.folder_mut(parent)?.subfolders.insert(name.clone(), id)?;
        tracing::debug!("created folder {} as {}", name, id);
        Ok((id, name))
    }

    /// Remove a subfolder and free everything below it.
    pub fn delete_subfolder(&mut self, parent: FolderId, name: &str) -> Result<(), FsError> {
        validate_name(name)?;
        let id = self
            .folder_mut(parent)?
            .subfolders
            .remove(name)
            .ok_or_else(|| FsError::NotFound(format!("folder {}", name)))?;
        self.free_subtree(id);
        tracing::debug!("deleted folder {} ({})", name, id);
        Ok(())
    }

    /// Unlink a subfolder from its parent without freeing it.
    pub(crate) fn detach_subfolder(
        &mut self,
        parent: FolderId,
        name: &str,
    ) -> Result<FolderId, FsError> {
        validate_name(name)?;
        self.folder_mut(parent)?
            .subfolders
            .remove(name)
            .ok_or_else(|| FsError::NotFound(format!("folder {}", name)))
    }

    /// Link a detached folder under `parent` and point it back at `parent`.
    pub(crate) fn attach_subfolder(
        &mut self,
        parent: FolderId,
        name: &str,
        child: FolderId,
    ) -> Result<(), FsError> {
        self.folder_mut(parent)?
            .subfolders
            .insert(name.to_string(), child)?;
        self.folder_mut(child)?.parent = parent;
        Ok(())
    }

    /// Rebuild the subtree at `id` as a detached node whose parent is
    ///  `new_parent`. Every file gets a fresh serial and its own content
    ///  buffer; link tables are copied verbatim.
    pub fn deep_copy(
        &mut self,
        id: FolderId,
        new_parent: FolderId,
        serials: &mut SerialSource,
    ) -> Result<FolderId, FsError> {
        self.folder(id)?;
        let copy_root = self.alloc(Folder::new(new_parent));
        // copies hang off a detached root, so the walk never reaches them
        let mut pending = vec![(id, copy_root)];
        while let Some((source_id, copy_id)) = pending.pop() {
            let source = self.folder(source_id)?.clone();
            let mut copy = Folder::new(self.folder(copy_id)?.parent);
            for (name, file) in source.files.iter() {
                copy.files
                    .insert(name.to_string(), file.duplicate(serials.next_serial())?)?;
            }
            copy.folder_links = source.folder_links;
            copy.file_links = source.file_links;
            for (name, child) in source.subfolders.iter() {
                let child_copy = self.alloc(Folder::new(copy_id));
                copy.subfolders.insert(name.to_string(), child_copy)?;
                pending.push((*child, child_copy));
            }
            *self.folder_mut(copy_id)? = copy;
        }
        Ok(copy_root)
    }

    /// Check that folding `other` into `into` would succeed, without
    ///  touching either side. Every suffixed name is resolved in the same
    ///  order [`Tree::merge_from`] resolves it.
    pub fn check_merge(&self, into: FolderId, other: FolderId) -> Result<(), FsError> {
        let mut pending = vec![(into, other)];
        while let Some((into, other)) = pending.pop() {
            let target = self.folder(into)?;
            let source = self.folder(other)?;
            plan_unique(&target.files, &source.files)?;
            plan_unique(&target.file_links, &source.file_links)?;
            plan_unique(&target.folder_links, &source.folder_links)?;
            for (name, child) in source.subfolders.iter() {
                match target.subfolders.get(name) {
                    Some(existing) => pending.push((*existing, *child)),
                    None => validate_name(name)?,
                }
            }
        }
        Ok(())
    }

    /// Fold `other` into `into`, consuming `other`.
    ///
    /// Files and links land under their own names, suffixed on collision.
    ///  Subfolders that exist on both sides are merged recursively; the rest
    ///  are handed over and reparented. `other` is freed afterwards. Fails
    ///  with both sides untouched if any name cannot be placed.
    pub fn merge_from(&mut self, into: FolderId, other: FolderId) -> Result<(), FsError> {
        if into == other {
            return Err(FsError::InvalidArgument(
                "cannot merge a folder into itself".to_string(),
            ));
        }
        self.check_merge(into, other)?;

        let mut pending = vec![(into, other)];
        while let Some((into, other)) = pending.pop() {
            let mut source = self
                .nodes
                .get_mut(other.0)
                .and_then(Option::take)
                .ok_or_else(|| FsError::NotFound(format!("folder {} no longer exists", other)))?;
            let target = self.folder_mut(into)?;
            for (name, file) in source.files.drain() {
                target.files.insert_unique(&name, file)?;
            }
            for (name, link) in source.file_links.drain() {
                target.file_links.insert_unique(&name, link)?;
            }
            for (name, link) in source.folder_links.drain() {
                target.folder_links.insert_unique(&name, link)?;
            }
            for (name, child) in source.subfolders.drain() {
                let existing = self.folder(into)?.subfolders.get(&name).copied();
                match existing {
                    Some(existing) => pending.push((existing, child)),
                    None => self.attach_subfolder(into, &name, child)?,
                }
            }
        }
        Ok(())
    }

    pub fn serialize_manifest(&self, id: FolderId) -> Result<Manifest, FsError> {
        let folder = self.folder(id)?;
        let mut subfolders = Vec::with_capacity(folder.subfolders.len());
        for (name, child) in folder.subfolders.iter() {
            subfolders.push((name.to_string(), self.serialize_manifest(*child)?));
        }
        Ok(Manifest {
            subfolders,
            files: folder
                .files
                .iter()
                .map(|(name, file)| (name.to_string(), file.serial().to_string()))
                .collect(),
            created_at: Some(format_timestamp(folder.created_at)),
            folder_links: folder
                .folder_links
                .iter()
                .map(|(n, t)| (n.to_string(), t.clone()))
                .collect(),
            file_links: folder
                .file_links
                .iter()
                .map(|(n, t)| (n.to_string(), t.clone()))
                .collect(),
        })
    }

    /// Build a new tree from a validated manifest. `file_for` turns each
    ///  referenced serial into the file entity to place at that name.
    pub fn from_manifest<F>(manifest: &Manifest, mut file_for: F) -> Result<Self, FsError>
    where
        F: FnMut(&str) -> Result<File, FsError>,
    {
        let mut tree = Tree::new();
        let root = tree.root;
        tree.fill_from_manifest(root, manifest, &mut file_for)?;
        Ok(tree)
    }

    fn fill_from_manifest<F>(
        &mut self,
        id: FolderId,
        manifest: &Manifest,
        file_for: &mut F,
    ) -> Result<(), FsError>
    where
        F: FnMut(&str) -> Result<File, FsError>,
    {
        // pre-order, so `file_for` sees serials in manifest order
        let mut pending = vec![(id, manifest)];
        while let Some((id, manifest)) = pending.pop() {
            let created_at = match manifest.created_at.as_deref() {
                Some(raw) => parse_timestamp(raw)?,
                None => Utc::now(),
            };
            {
                let folder = self.folder_mut(id)?;
                folder.created_at = created_at;
                for (name, target) in &manifest.folder_links {
                    folder.folder_links.insert(name.clone(), target.clone())?;
                }
                for (name, target) in &manifest.file_links {
                    folder.file_links.insert(name.clone(), target.clone())?;
                }
            }
            for (name, serial) in &manifest.files {
                let file = file_for(serial)?;
                self.folder_mut(id)?.files.insert(name.clone(), file)?;
            }
            let mut children = Vec::with_capacity(manifest.subfolders.len());
            for (name, sub) in &manifest.subfolders {
                let child = self.alloc(Folder::new(id));
                self.folder_mut(id)?.subfolders.insert(name.clone(), child)?;
                children.push((child, sub));
            }
            pending.extend(children.into_iter().rev());
        }
        Ok(())
    }

    /// Every file reachable from `id`, with its path relative to `id`.
    pub fn walk_files(&self, id: FolderId) -> Result<Vec<(String, &File)>, FsError> {
        let mut out = Vec::new();
        self.walk_files_into(id, "", &mut out)?;
        Ok(out)
    }

    fn walk_files_into<'a>(
        &'a self,
        id: FolderId,
        prefix: &str,
        out: &mut Vec<(String, &'a File)>,
    ) -> Result<(), FsError> {
        let folder = self.folder(id)?;
        for (name, file) in folder.files.iter() {
            out.push((format!("{}{}", prefix, name), file));
        }
        for (name, child) in folder.subfolders.iter() {
            self.walk_files_into(*child, &format!("{}{}/", prefix, name), out)?;
        }
        Ok(())
    }

    /// Every folder strictly below `id`, as relative paths, parents first.
    pub fn walk_folders(&self, id: FolderId) -> Result<Vec<String>, FsError> {
        let mut out = Vec::new();
        let mut stack = vec![(id, String::new())];
        while let Some((next, prefix)) = stack.pop() {
            let folder = self.folder(next)?;
            let mut children: Vec<(FolderId, String)> = folder
                .subfolders
                .iter()
                .map(|(name, child)| (*child, format!("{}{}/", prefix, name)))
                .collect();
            for (_, path) in &children {
                out.push(path.clone());
            }
            children.reverse();
            stack.extend(children);
        }
        Ok(out)
    }

    /// Serials of every reachable file.
    pub fn serials(&self) -> Result<HashSet<String>, FsError> {
        Ok(self
            .walk_files(self.root)?
            .into_iter()
            .map(|(_, file)| file.serial().to_string())
            .collect())
    }
}

/// Resolve every incoming name against a scratch copy of `target`'s names.
fn plan_unique<T, U>(target: &NameTable<T>, incoming: &NameTable<U>) -> Result<(), FsError> {
    let mut planned = NameTable::new();
    for name in target.names() {
        planned.insert(name.to_string(), ())?;
    }
    for name in incoming.names() {
        planned.insert_unique(name, ())?;
    }
    Ok(())
}
