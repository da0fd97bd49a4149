use std::fmt;

use chrono::{DateTime, Utc};

use super::error::FsError;
use super::file::File;
use super::name::{is_legal_name, validate_name, NameTable};

/// Handle to a folder inside a [`Tree`](super::Tree) arena.
///
/// Handles are plain indices: holding one implies no ownership, which is
///  what lets a folder point back at its parent without a reference cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId(pub(crate) usize);

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One node of the tree.
///
/// Files are owned inline. Subfolders are arena handles whose nodes are
///  owned by the tree. The two link tables map names to path strings that
///  are only interpreted when a caller asks to follow links.
#[derive(Debug, Clone)]
pub struct Folder {
    pub(crate) parent: FolderId,
    pub(crate) subfolders: NameTable<FolderId>,
    pub(crate) files: NameTable<File>,
    pub(crate) folder_links: NameTable<String>,
    pub(crate) file_links: NameTable<String>,
    pub(crate) created_at: DateTime<Utc>,
}

impl Folder {
    pub(crate) fn new(parent: FolderId) -> Self {
        Self::with_created_at(parent, Utc::now())
    }

    pub(crate) fn with_created_at(parent: FolderId, created_at: DateTime<Utc>) -> Self {
        Self {
            parent,
            subfolders: NameTable::new(),
            files: NameTable::new(),
            folder_links: NameTable::new(),
            file_links: NameTable::new(),
            created_at,
        }
    }

    pub fn parent(&self) -> FolderId {
        self.parent
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn has_file(&self, name: &str) -> bool {
        is_legal_name(name) && self.files.contains(name)
    }

    pub fn has_subfolder(&self, name: &str) -> bool {
        is_legal_name(name) && self.subfolders.contains(name)
    }

    pub fn has_file_link(&self, name: &str) -> bool {
        is_legal_name(name) && self.file_links.contains(name)
    }

    pub fn has_folder_link(&self, name: &str) -> bool {
        is_legal_name(name) && self.folder_links.contains(name)
    }

    pub fn get_file(&self, name: &str) -> Result<&File, FsError> {
        validate_name(name)?;
        self.files
            .get(name)
            .ok_or_else(|| FsError::NotFound(format!("file {}", name)))
    }

    pub fn get_file_mut(&mut self, name: &str) -> Result<&mut File, FsError> {
        validate_name(name)?;
        self.files
            .get_mut(name)
            .ok_or_else(|| FsError::NotFound(format!("file {}", name)))
    }

    /// Direct subfolder lookup; never follows links.
    pub fn subfolder(&self, name: &str) -> Result<FolderId, FsError> {
        validate_name(name)?;
        self.subfolders
            .get(name)
            .copied()
            .ok_or_else(|| FsError::NotFound(format!("folder {}", name)))
    }

    pub fn folder_link(&self, name: &str) -> Option<&str> {
        self.folder_links.get(name).map(String::as_str)
    }

    pub fn file_link(&self, name: &str) -> Option<&str> {
        self.file_links.get(name).map(String::as_str)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &File)> {
        self.files.iter()
    }

    pub fn subfolders(&self) -> impl Iterator<Item = (&str, FolderId)> {
        self.subfolders.iter().map(|(name, id)| (name, *id))
    }

    pub fn folder_links(&self) -> impl Iterator<Item = (&str, &str)> {
        self.folder_links.iter().map(|(n, t)| (n, t.as_str()))
    }

    pub fn file_links(&self) -> impl Iterator<Item = (&str, &str)> {
        self.file_links.iter().map(|(n, t)| (n, t.as_str()))
    }

    /// Create an empty file under `name` with the given serial.
    ///
    /// A taken name is an error unless `fix_duplicate` is set, in which
    ///  case a numeric suffix is appended. Returns the name used.
    pub fn create_file(
        &mut self,
        fix_duplicate: bool,
        name: &str,
        serial: String,
    ) -> Result<(&mut File, String), FsError> {
        let name = self.files.resolve_new_name(fix_duplicate, name)?;
        let file = File::new(serial, Vec::new())?;
        self.files.insert(name.clone(), file)?;
        let file = self
            .files
            .get_mut(&name)
            .ok_or_else(|| FsError::NotFound(name.clone()))?;
        Ok((file, name))
    }

    /// Attach an existing file entity under `name`. Taken names fail.
    pub fn insert_file(&mut self, name: &str, file: File) -> Result<(), FsError> {
        self.files.insert(name.to_string(), file)
    }

    pub fn rename_file(&mut self, old_name: &str, new_name: &str) -> Result<(), FsError> {
        validate_name(old_name)?;
        self.files.rename(old_name, new_name)
    }

    pub fn delete_file(&mut self, name: &str) -> Result<File, FsError> {
        validate_name(name)?;
        self.files
            .remove(name)
            .ok_or_else(|| FsError::NotFound(format!("file {}", name)))
    }

    pub fn create_file_link(
        &mut self,
        fix_duplicate: bool,
        name: &str,
        target: &str,
    ) -> Result<String, FsError> {
        check_link_target(target)?;
        let name = self.file_links.resolve_new_name(fix_duplicate, name)?;
        self.file_links.insert(name.clone(), target.to_string())?;
        Ok(name)
    }

    pub fn create_folder_link(
        &mut self,
        fix_duplicate: bool,
        name: &str,
        target: &str,
    ) -> Result<String, FsError> {
        check_link_target(target)?;
        let name = self.folder_links.resolve_new_name(fix_duplicate, name)?;
        self.folder_links.insert(name.clone(), target.to_string())?;
        Ok(name)
    }

    pub fn delete_file_link(&mut self, name: &str) -> Result<String, FsError> {
        validate_name(name)?;
        self.file_links
            .remove(name)
            .ok_or_else(|| FsError::NotFound(format!("file link {}", name)))
    }

    pub fn delete_folder_link(&mut self, name: &str) -> Result<String, FsError> {
        validate_name(name)?;
        self.folder_links
            .remove(name)
            .ok_or_else(|| FsError::NotFound(format!("folder link {}", name)))
    }

    pub fn list_contents(&self) -> Listing {
        Listing {
            subfolders: self.subfolders.names().map(String::from).collect(),
            files: self.files.names().map(String::from).collect(),
            folder_links: self
                .folder_links
                .iter()
                .map(|(n, t)| (n.to_string(), t.clone()))
                .collect(),
            file_links: self
                .file_links
                .iter()
                .map(|(n, t)| (n.to_string(), t.clone()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subfolders.is_empty()
            && self.files.is_empty()
            && self.folder_links.is_empty()
            && self.file_links.is_empty()
    }
}

pub(crate) fn check_link_target(target: &str) -> Result<(), FsError> {
    if target.is_empty() {
        return Err(FsError::InvalidArgument("link target is empty".to_string()));
    }
    Ok(())
}

/// Sentinel printed for a folder with nothing in it.
pub const EMPTY_LISTING: &str = "nothing here";

/// Contents of one folder, grouped by table, each in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub subfolders: Vec<String>,
    pub files: Vec<String>,
    pub folder_links: Vec<(String, String)>,
    pub file_links: Vec<(String, String)>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.subfolders.is_empty()
            && self.files.is_empty()
            && self.folder_links.is_empty()
            && self.file_links.is_empty()
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{}", EMPTY_LISTING);
        }
        let mut groups: Vec<String> = Vec::new();
        if !self.subfolders.is_empty() {
            let lines: Vec<String> = self.subfolders.iter().map(|n| format!("  {}/", n)).collect();
            groups.push(format!("folders:\n{}", lines.join("\n")));
        }
        if !self.files.is_empty() {
            let lines: Vec<String> = self.files.iter().map(|n| format!("  {}", n)).collect();
            groups.push(format!("files:\n{}", lines.join("\n")));
        }
        if !self.folder_links.is_empty() {
            let lines: Vec<String> = self
                .folder_links
                .iter()
                .map(|(n, t)| format!("  {} -> {}", n, t))
                .collect();
            groups.push(format!("folder links:\n{}", lines.join("\n")));
        }
        if !self.file_links.is_empty() {
            let lines: Vec<String> = self
                .file_links
                .iter()
                .map(|(n, t)| format!("  {} -> {}", n, t))
                .collect();
            groups.push(format!("file links:\n{}", lines.join("\n")));
        }
        write!(f, "{}", groups.join("\n"))
    }
}
