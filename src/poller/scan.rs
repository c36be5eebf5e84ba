//! Folder listing

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::handlers::FileItem;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to create folder {dir}: {source}")]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list folder {dir}: {source}")]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Snapshot the regular files directly inside `folder`, sorted by name
///
/// The folder is created if absent. Symlinks are followed; directories,
/// special files and entries that disappear while listing are skipped.
pub async fn scan_folder(folder: &Path) -> Result<Vec<FileItem>, ScanError> {
    tokio::fs::create_dir_all(folder)
        .await
        .map_err(|source| ScanError::CreateDir {
            dir: folder.to_path_buf(),
            source,
        })?;

    let read_err = |source: std::io::Error| ScanError::ReadDir {
        dir: folder.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(folder).await.map_err(read_err)?;
    let mut items = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let path = entry.path();
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if !metadata.is_file() {
            debug!(path = %path.display(), "Skipping non-regular entry");
            continue;
        }

        items.push(FileItem::with_metadata(
            path,
            metadata.len(),
            metadata.modified().ok(),
        ));
    }

    items.sort_by(|a, b| a.raw_name.cmp(&b.raw_name));
    Ok(items)
}
