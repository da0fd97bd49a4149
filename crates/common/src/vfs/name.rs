//! Legal names and the ordered name tables every folder keeps.
//!
//! A legal name is 1..=1024 characters, contains no `/`, NUL, backspace
//!  or carriage return, and is neither `.` nor `..`.

use super::error::FsError;

/// Longest legal name, in characters.
pub const MAX_NAME_LEN: usize = 1024;

const FORBIDDEN_CHARS: [char; 4] = ['/', '\0', '\u{8}', '\r'];

pub fn is_legal_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    if name.chars().count() > MAX_NAME_LEN {
        return false;
    }
    !name.chars().any(|c| FORBIDDEN_CHARS.contains(&c))
}

pub fn validate_name(name: &str) -> Result<(), FsError> {
    if is_legal_name(name) {
        Ok(())
    } else {
        Err(FsError::InvalidName(name.escape_debug().to_string()))
    }
}

/// Name -> value table that remembers insertion order.
///
/// Folders hold four of these (subfolders, files, folder-links,
///  file-links). Listing and manifest serialization walk them in the
///  order entries were added.
#[derive(Debug, Clone, PartialEq)]
pub struct NameTable<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for NameTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> NameTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Insert under `name`, validating it first. Fails if the name is taken.
    pub fn insert(&mut self, name: String, value: T) -> Result<(), FsError> {
        validate_name(&name)?;
        if self.contains(&name) {
            return Err(FsError::AlreadyExists(name));
        }
        self.entries.push((name, value));
        Ok(())
    }

    /// Insert under `name`, or under the first free `name N` (N = 2, 3, ...)
    ///  when `name` is taken. Returns the name actually used.
    pub fn insert_unique(&mut self, name: &str, value: T) -> Result<String, FsError> {
        let name = self.unique_name(name)?;
        self.entries.push((name.clone(), value));
        Ok(name)
    }

    /// First free name derived from `base` by the numeric-suffix rule.
    pub fn unique_name(&self, base: &str) -> Result<String, FsError> {
        validate_name(base)?;
        if !self.contains(base) {
            return Ok(base.to_string());
        }
        let mut n: usize = 2;
        loop {
            let candidate = format!("{} {}", base, n);
            if !self.contains(&candidate) {
                validate_name(&candidate)?;
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Resolve `name` for a new entry under the collision policy: with
    ///  `fix_duplicate` a taken name is suffixed, otherwise it is an error.
    pub fn resolve_new_name(&self, fix_duplicate: bool, name: &str) -> Result<String, FsError> {
        validate_name(name)?;
        if fix_duplicate {
            self.unique_name(name)
        } else if self.contains(name) {
            Err(FsError::AlreadyExists(name.to_string()))
        } else {
            Ok(name.to_string())
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<T> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    /// Rename an entry in place, keeping its position in the table.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), FsError> {
        validate_name(new)?;
        let idx = self
            .position(old)
            .ok_or_else(|| FsError::NotFound(old.to_string()))?;
        if self.contains(new) {
            return Err(FsError::AlreadyExists(new.to_string()));
        }
        self.entries[idx].0 = new.to_string();
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (String, T)> + '_ {
        self.entries.drain(..)
    }
}
