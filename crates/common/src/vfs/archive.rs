use std::io::{Cursor as IoCursor, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::cursor::Cursor;
use super::error::FsError;

/// Everything needed to build the archive, captured under the lock so the
///  compression work can run without holding it.
struct Snapshot {
    folders: Vec<String>,
    files: Vec<(String, Vec<u8>)>,
}

fn write_archive(snapshot: Snapshot) -> Result<Vec<u8>, FsError> {
    let mut zip = ZipWriter::new(IoCursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for folder in &snapshot.folders {
        zip.add_directory(folder.as_str(), options)?;
    }
    for (path, content) in &snapshot.files {
        zip.start_file(path.as_str(), options)?;
        zip.write_all(content)?;
    }
    let buffer = zip.finish()?;
    Ok(buffer.into_inner())
}

impl Cursor {
    /// Zip up the subtree under the current folder.
    ///
    /// Files land at their path relative to the current folder. Every
    ///  folder gets its own directory entry, so empty folders survive.
    pub async fn zip_archive(&self) -> Result<Vec<u8>, FsError> {
        let snapshot = {
            let inner = self.fs().lock();
            self.check_epoch(inner.tree())?;
            let tree = inner.tree();
            Snapshot {
                folders: tree.walk_folders(self.current())?,
                files: tree
                    .walk_files(self.current())?
                    .into_iter()
                    .map(|(path, file)| (path, file.content().to_vec()))
                    .collect(),
            }
        };
        tracing::debug!(
            "archiving {} folders and {} files under {}",
            snapshot.folders.len(),
            snapshot.files.len(),
            self.full_path()
        );

        tokio::task::spawn_blocking(move || write_archive(snapshot))
            .await
            .map_err(|e| FsError::Archive(format!("archive task failed: {}", e)))?
    }
}
