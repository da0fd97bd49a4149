//! Pushing a tree to a content store and recovering it again.
//!
//! A push writes one blob per file, keyed by the file's serial, plus the
//!  tree's [`Manifest`] under the reserved `ROOT` serial. All writes go out
//!  as one concurrent batch. Failures are collected and reported together;
//!  writes that did succeed are left in place.
//!
//! A recovery reads `ROOT`, validates the manifest, fetches every file it
//!  references concurrently and only then swaps the new tree in. Any
//!  failure before that point leaves the live tree alone.

mod memory;
mod store;

pub use memory::MemoryContentStore;
pub use store::{
    Blob, ContentStore, ContentStoreError, UserKey, MAX_USER_KEY_LEN, MIN_USER_KEY_LEN,
};

use std::collections::{HashMap, HashSet};

use futures::future::join_all;

use crate::vfs::{File, Fs, FsError, Manifest, Tree, ROOT_SERIAL};

/// Counts reported back after a successful push or recovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub files: usize,
    pub bytes: usize,
}

/// Serials are long; keep errors and logs readable.
fn short_serial(serial: &str) -> String {
    if serial.len() <= 16 {
        serial.to_string()
    } else {
        format!("{}...", &serial[..16])
    }
}

fn aggregate(action: &str, failures: Vec<(String, String)>) -> FsError {
    let details: Vec<String> = failures
        .iter()
        .map(|(serial, err)| format!("{} ({})", short_serial(serial), err))
        .collect();
    FsError::RemoteFailure(format!(
        "{} failed for {} blob(s): {}",
        action,
        failures.len(),
        details.join(", ")
    ))
}

/// Upload every reachable file and the manifest.
pub async fn push(
    fs: &Fs,
    store: &dyn ContentStore,
    user_key: &UserKey,
) -> Result<SyncSummary, FsError> {
    let (manifest, root_created_at, blobs) = {
        let inner = fs.lock();
        let tree = inner.tree();
        let root = tree.root();
        let blobs: Vec<(String, Blob)> = tree
            .walk_files(root)?
            .into_iter()
            .map(|(_, file)| {
                (
                    file.serial().to_string(),
                    Blob {
                        content: file.content().to_vec().into(),
                        created_at: file.created_at(),
                        updated_at: file.updated_at(),
                    },
                )
            })
            .collect();
        (
            tree.serialize_manifest(root)?,
            tree.folder(root)?.created_at(),
            blobs,
        )
    };

    let summary = SyncSummary {
        files: blobs.len(),
        bytes: blobs.iter().map(|(_, blob)| blob.content.len()).sum(),
    };
    let mut root_blob = Blob::new(manifest.to_json()?);
    root_blob.created_at = root_created_at;

    let mut batch = blobs;
    batch.push((ROOT_SERIAL.to_string(), root_blob));
    tracing::info!("pushing {} blobs ({} bytes of file content)", batch.len(), summary.bytes);

    let results = join_all(batch.into_iter().map(|(serial, blob)| async move {
        let result = store.write_blob(user_key, &serial, blob).await;
        (serial, result)
    }))
    .await;

    let failures: Vec<(String, String)> = results
        .into_iter()
        .filter_map(|(serial, result)| match result {
            Ok(()) => {
                tracing::debug!("wrote blob {}", short_serial(&serial));
                None
            }
            Err(e) => {
                tracing::warn!("failed to write blob {}: {}", short_serial(&serial), e);
                Some((serial, e.to_string()))
            }
        })
        .collect();

    if !failures.is_empty() {
        return Err(aggregate("push", failures));
    }
    tracing::info!("push complete");
    Ok(summary)
}

/// Replace the live tree with the one stored under `user_key`.
///
/// Serials found in the recovered tree are registered with the serial
///  source so they are never issued again. A serial that appears more than
///  once in the manifest keeps it for its first file; later files get fresh
///  serials so every file still has its own identity.
pub async fn recover(
    fs: &Fs,
    store: &dyn ContentStore,
    user_key: &UserKey,
) -> Result<SyncSummary, FsError> {
    tracing::info!("recovering tree");
    let root = store
        .read_blob(user_key, ROOT_SERIAL)
        .await
        .map_err(|e| FsError::RemoteFailure(format!("failed to read manifest: {}", e)))?;
    let manifest = Manifest::from_json(&root.content)?;
    let referenced = manifest.validate()?;

    let unique: Vec<String> = {
        let mut seen = HashSet::new();
        referenced
            .iter()
            .filter(|serial| seen.insert(serial.as_str()))
            .cloned()
            .collect()
    };

    let results = join_all(unique.into_iter().map(|serial| async move {
        let result = store.read_blob(user_key, &serial).await;
        (serial, result)
    }))
    .await;

    let mut blobs = HashMap::new();
    let mut failures = Vec::new();
    for (serial, result) in results {
        match result {
            Ok(blob) if blob.created_at <= blob.updated_at => {
                tracing::debug!("read blob {}", short_serial(&serial));
                blobs.insert(serial, blob);
            }
            Ok(_) => {
                tracing::warn!("blob {} has inconsistent timestamps", short_serial(&serial));
                failures.push((serial, "updated before it was created".to_string()));
            }
            Err(e) => {
                tracing::warn!("failed to read blob {}: {}", short_serial(&serial), e);
                failures.push((serial, e.to_string()));
            }
        }
    }
    if !failures.is_empty() {
        return Err(aggregate("recovery", failures));
    }

    let mut inner = fs.lock();
    let mut reissued = Vec::new();
    let mut summary = SyncSummary::default();
    let built = {
        let serials = inner.serials_mut();
        let mut placed = HashSet::new();
        Tree::from_manifest(&manifest, |serial| {
            let blob = blobs
                .get(serial)
                .ok_or_else(|| FsError::NotFound(format!("blob {}", short_serial(serial))))?;
            let serial = if placed.insert(serial.to_string()) {
                serial.to_string()
            } else {
                let fresh =
                    serials.next_serial_avoiding(|candidate| blobs.contains_key(candidate));
                reissued.push(fresh.clone());
                fresh
            };
            summary.files += 1;
            summary.bytes += blob.content.len();
            File::with_timestamps(serial, blob.content.to_vec(), blob.created_at, blob.updated_at)
        })
        .and_then(|tree| tree.serials().map(|known| (tree, known)))
    };

    let (tree, known) = match built {
        Ok(built) => built,
        Err(err) => {
            // nothing was swapped in, so hand back what was drawn
            for serial in &reissued {
                inner.serials_mut().release(serial);
            }
            return Err(err);
        }
    };
    *inner.tree_mut() = tree;
    inner.serials_mut().recover(known);
    tracing::info!("recovered {} files ({} bytes)", summary.files, summary.bytes);
    Ok(summary)
}
