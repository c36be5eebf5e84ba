//! Moves processed files into the `done` tree

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::handlers::FileItem;

/// Name of the done-tree directory under the root
pub const DONE_DIR: &str = "done";

#[derive(Debug, Error)]
pub enum RelocateError {
    #[error("{path} has no parent folder name")]
    MissingParent { path: PathBuf },

    #[error("cannot move {from} to {to}: source and target are on different filesystems")]
    CrossDevice { from: PathBuf, to: PathBuf },

    #[error("failed to create {dir}: {source}")]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Derives done paths under a root and performs the move
#[derive(Debug, Clone)]
pub struct Relocator {
    root: PathBuf,
}

impl Relocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn done_root(&self) -> PathBuf {
        self.root.join(DONE_DIR)
    }

    /// `<root>/done/<parent folder name>`, using the name bytes as on disk
    pub fn done_dir(&self, file: &FileItem) -> Result<PathBuf, RelocateError> {
        if file.raw_folder.is_empty() || file.raw_name.is_empty() {
            return Err(RelocateError::MissingParent {
                path: file.path.clone(),
            });
        }
        Ok(self.done_root().join(&file.raw_folder))
    }

    /// `<root>/done/<parent folder name>/<file name>`
    pub fn done_path(&self, file: &FileItem) -> Result<PathBuf, RelocateError> {
        Ok(self.done_dir(file)?.join(&file.raw_name))
    }

    /// Move `file` to its done path with a single rename
    ///
    /// Missing directories are created first. Cross-filesystem moves are not
    /// attempted by copying.
    pub async fn relocate(&self, file: &FileItem) -> Result<PathBuf, RelocateError> {
        let dir = self.done_dir(file)?;
        let target = dir.join(&file.raw_name);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| RelocateError::CreateDir {
                dir: dir.clone(),
                source,
            })?;

        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            warn!(target = %target.display(), "Overwriting existing file in done tree");
        }

        tokio::fs::rename(&file.path, &target)
            .await
            .map_err(|source| {
                if source.kind() == io::ErrorKind::CrossesDevices {
                    RelocateError::CrossDevice {
                        from: file.path.clone(),
                        to: target.clone(),
                    }
                } else {
                    RelocateError::Move {
                        from: file.path.clone(),
                        to: target.clone(),
                        source,
                    }
                }
            })?;

        info!(from = %file.path.display(), to = %target.display(), "Moved to done");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    async fn setup_test_file(root: &Path, folder: &str, name: &str) -> FileItem {
        let dir = root.join(folder);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, b"dummy content").unwrap();
        FileItem::from_path(path).await.unwrap()
    }

    #[test]
    fn test_done_path_uses_immediate_parent() {
        let relocator = Relocator::new("/srv/scans");
        let item = FileItem::with_metadata(
            PathBuf::from("/elsewhere/deep/to_paperless/invoice.pdf"),
            0,
            None,
        );
        assert_eq!(
            relocator.done_path(&item).unwrap(),
            PathBuf::from("/srv/scans/done/to_paperless/invoice.pdf")
        );
    }

    #[test]
    fn test_done_path_without_parent() {
        let relocator = Relocator::new("/srv/scans");
        let item = FileItem::with_metadata(PathBuf::from("invoice.pdf"), 0, None);
        assert!(matches!(
            relocator.done_path(&item),
            Err(RelocateError::MissingParent { .. })
        ));
    }

    #[tokio::test]
    async fn test_relocate_creates_target_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let item = setup_test_file(root, "to_paperless", "test.pdf").await;
        let relocator = Relocator::new(root);

        let target = relocator.relocate(&item).await.unwrap();

        assert_eq!(target, root.join("done/to_paperless/test.pdf"));
        assert!(target.exists());
        assert!(!item.path.exists());
        assert_eq!(std::fs::read(&target).unwrap(), b"dummy content");
    }

    #[tokio::test]
    async fn test_relocate_second_file_into_existing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let relocator = Relocator::new(root);

        let first = setup_test_file(root, "to_paperless", "a.pdf").await;
        let second = setup_test_file(root, "to_paperless", "b.pdf").await;

        relocator.relocate(&first).await.unwrap();
        relocator.relocate(&second).await.unwrap();

        assert!(root.join("done/to_paperless/a.pdf").exists());
        assert!(root.join("done/to_paperless/b.pdf").exists());
    }

    #[tokio::test]
    async fn test_relocate_overwrites_existing_target() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let relocator = Relocator::new(root);

        std::fs::create_dir_all(root.join("done/to_paperless")).unwrap();
        std::fs::write(root.join("done/to_paperless/test.pdf"), b"old").unwrap();

        let item = setup_test_file(root, "to_paperless", "test.pdf").await;
        relocator.relocate(&item).await.unwrap();

        assert_eq!(
            std::fs::read(root.join("done/to_paperless/test.pdf")).unwrap(),
            b"dummy content"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_relocate_keeps_non_utf8_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let dir = root.join("to_paperless");
        std::fs::create_dir_all(&dir).unwrap();
        let raw = OsStr::from_bytes(b"scan\xff.pdf");
        std::fs::write(dir.join(raw), b"dummy content").unwrap();
        let item = FileItem::from_path(dir.join(raw)).await.unwrap();

        let target = Relocator::new(root).relocate(&item).await.unwrap();

        assert_eq!(target, root.join("done/to_paperless").join(raw));
        assert_eq!(target.file_name().unwrap().as_bytes(), b"scan\xff.pdf");
        assert!(target.exists());
        assert!(!root.join("done/to_paperless/scan\u{FFFD}.pdf").exists());
    }

    #[tokio::test]
    async fn test_relocate_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let item = setup_test_file(root, "to_paperless", "test.pdf").await;
        std::fs::remove_file(&item.path).unwrap();

        let result = Relocator::new(root).relocate(&item).await;
        assert!(matches!(result, Err(RelocateError::Move { .. })));
    }
}
