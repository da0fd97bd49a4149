//! # Manifest
//!
//! Portable description of a folder tree. Files are represented only by
//!  their serial, so a manifest is a pointer structure over the content
//!  store:
//!
//! ```text
//! {
//!   "subfolders":  { "<name>": <manifest>, ... },
//!   "files":       { "<name>": "<serial>", ... },
//!   "created_at":  "2024-01-01T00:00:00.000Z",
//!   "folderLinks": { "<name>": "<path>", ... },
//!   "fileLinks":   { "<name>": "<path>", ... }
//! }
//! ```
//!
//! Every key may be missing; missing tables are read as empty. Table
//!  order is preserved in both directions so listings survive a round
//!  trip through the content store.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Map};

use super::error::FsError;
use super::name::is_legal_name;
use super::serial::{is_valid_serial, ROOT_SERIAL};

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde_as(as = "Map<_, _>")]
    #[serde(default)]
    pub subfolders: Vec<(String, Manifest)>,
    #[serde_as(as = "Map<_, _>")]
    #[serde(default)]
    pub files: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde_as(as = "Map<_, _>")]
    #[serde(default, rename = "folderLinks")]
    pub folder_links: Vec<(String, String)>,
    #[serde_as(as = "Map<_, _>")]
    #[serde(default, rename = "fileLinks")]
    pub file_links: Vec<(String, String)>,
}

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, FsError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| FsError::ValidationFailure(format!("bad timestamp {:?}: {}", raw, e)))
}

impl Manifest {
    /// Parse a manifest of any depth. Nesting follows folder depth, so
    ///  serde_json's recursion limit is lifted and the stack grows on demand.
    pub fn from_json(bytes: &[u8]) -> Result<Self, FsError> {
        let invalid = |e: serde_json::Error| {
            FsError::ValidationFailure(format!("manifest is not valid: {}", e))
        };
        let mut de = serde_json::Deserializer::from_slice(bytes);
        de.disable_recursion_limit();
        let manifest =
            Manifest::deserialize(serde_stacker::Deserializer::new(&mut de)).map_err(invalid)?;
        de.end().map_err(invalid)?;
        Ok(manifest)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, FsError> {
        serde_json::to_vec(self)
            .map_err(|e| FsError::InvalidArgument(format!("manifest encode failed: {}", e)))
    }

    /// Parsed `created_at`, if present.
    pub fn created_at(&self) -> Result<Option<DateTime<Utc>>, FsError> {
        self.created_at.as_deref().map(parse_timestamp).transpose()
    }

    /// Check the whole manifest against the recovery grammar and return
    ///  every file serial it references, in traversal order.
    ///
    /// Rejects illegal or repeated names, serials outside the store's
    ///  grammar (the reserved `ROOT` included), empty link targets and
    ///  malformed timestamps.
    pub fn validate(&self) -> Result<Vec<String>, FsError> {
        let mut serials = Vec::new();
        self.validate_into("/", &mut serials)?;
        Ok(serials)
    }

    fn validate_into(&self, path: &str, serials: &mut Vec<String>) -> Result<(), FsError> {
        self.created_at()?;

        check_names(path, "folder", self.subfolders.iter().map(|(n, _)| n))?;
        check_names(path, "file", self.files.iter().map(|(n, _)| n))?;
        check_names(path, "folder link", self.folder_links.iter().map(|(n, _)| n))?;
        check_names(path, "file link", self.file_links.iter().map(|(n, _)| n))?;

        for (name, serial) in &self.files {
            if serial == ROOT_SERIAL || !is_valid_serial(serial) {
                return Err(FsError::ValidationFailure(format!(
                    "file {}{} has an invalid serial",
                    path, name
                )));
            }
            serials.push(serial.clone());
        }

        for (name, target) in self.folder_links.iter().chain(self.file_links.iter()) {
            if target.is_empty() {
                return Err(FsError::ValidationFailure(format!(
                    "link {}{} has an empty target",
                    path, name
                )));
            }
        }

        for (name, sub) in &self.subfolders {
            sub.validate_into(&format!("{}{}/", path, name), serials)?;
        }
        Ok(())
    }
}

fn check_names<'a>(
    path: &str,
    kind: &str,
    names: impl Iterator<Item = &'a String>,
) -> Result<(), FsError> {
    let mut seen = HashSet::new();
    for name in names {
        if !is_legal_name(name) {
            return Err(FsError::ValidationFailure(format!(
                "illegal {} name {:?} in {}",
                kind, name, path
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(FsError::ValidationFailure(format!(
                "duplicate {} name {:?} in {}",
                kind, name, path
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn serial(c: char) -> String {
        std::iter::repeat(c).take(130).collect()
    }

    #[test]
    fn test_missing_keys_read_as_empty() {
        let manifest = Manifest::from_json(b"{}").unwrap();
        assert_eq!(manifest, Manifest::default());
        assert_eq!(manifest.validate().unwrap(), Vec::<String>::new());

        let manifest = Manifest::from_json(br#"{"subfolders": {"a": {}}}"#).unwrap();
        assert_eq!(manifest.subfolders.len(), 1);
        assert!(manifest.subfolders[0].1.files.is_empty());
    }

    #[test]
    fn test_from_json_accepts_deep_nesting() {
        let depth = 1000;
        let json = format!(
            "{}{{}}{}",
            r#"{"subfolders":{"d":"#.repeat(depth),
            "}}".repeat(depth)
        );
        let mut manifest = &Manifest::from_json(json.as_bytes()).unwrap();
        let mut levels = 0;
        while let Some((name, sub)) = manifest.subfolders.first() {
            assert_eq!(name, "d");
            manifest = sub;
            levels += 1;
        }
        assert_eq!(levels, depth);

        assert!(Manifest::from_json(b"{} trailing").is_err());
    }

    #[test]
    fn test_order_is_preserved() {
        let json = format!(
            r#"{{"files": {{"z": "{}", "a": "{}"}}, "fileLinks": {{"l": "/z"}}}}"#,
            serial('z'),
            serial('a')
        );
        let manifest = Manifest::from_json(json.as_bytes()).unwrap();
        let names: Vec<&str> = manifest.files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["z", "a"]);

        let encoded = String::from_utf8(manifest.to_json().unwrap()).unwrap();
        assert!(encoded.find("\"z\"").unwrap() < encoded.find("\"a\"").unwrap());
        assert!(encoded.contains("\"fileLinks\""));
        assert!(encoded.contains("\"folderLinks\""));
    }

    #[test]
    fn test_validate_collects_serials() {
        let mut child = Manifest::default();
        child.files.push(("inner".into(), serial('b')));
        let mut root = Manifest::default();
        root.files.push(("outer".into(), serial('a')));
        root.subfolders.push(("sub".into(), child));

        assert_eq!(root.validate().unwrap(), vec![serial('a'), serial('b')]);
    }

    #[test]
    fn test_validate_rejections() {
        let mut bad_name = Manifest::default();
        bad_name.files.push(("a/b".into(), serial('a')));
        assert!(matches!(
            bad_name.validate(),
            Err(FsError::ValidationFailure(_))
        ));

        let mut short_serial = Manifest::default();
        short_serial.files.push(("a".into(), "abc".into()));
        assert!(matches!(
            short_serial.validate(),
            Err(FsError::ValidationFailure(_))
        ));

        let mut root_serial = Manifest::default();
        root_serial.files.push(("a".into(), ROOT_SERIAL.into()));
        assert!(matches!(
            root_serial.validate(),
            Err(FsError::ValidationFailure(_))
        ));

        let mut empty_link = Manifest::default();
        empty_link.folder_links.push(("l".into(), String::new()));
        assert!(matches!(
            empty_link.validate(),
            Err(FsError::ValidationFailure(_))
        ));

        let mut nested = Manifest::default();
        let mut child = Manifest::default();
        child.subfolders.push(("..".into(), Manifest::default()));
        nested.subfolders.push(("ok".into(), child));
        assert!(matches!(
            nested.validate(),
            Err(FsError::ValidationFailure(_))
        ));

        let bad_time = Manifest {
            created_at: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(matches!(
            bad_time.validate(),
            Err(FsError::ValidationFailure(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let json = format!(
            r#"{{"files": {{"a": "{}", "a": "{}"}}}}"#,
            serial('x'),
            serial('y')
        );
        let manifest = Manifest::from_json(json.as_bytes()).unwrap();
        assert!(matches!(
            manifest.validate(),
            Err(FsError::ValidationFailure(_))
        ));
    }

    #[test]
    fn test_non_json_is_validation_failure() {
        assert!(matches!(
            Manifest::from_json(b"not json"),
            Err(FsError::ValidationFailure(_))
        ));
    }
}
