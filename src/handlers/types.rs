use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A regular file found in a watched folder during a scan
///
/// Rebuilt on every scan, never cached across cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    pub path: PathBuf,
    /// Display form of the file name, used as message subject and remote filename
    pub name: String,
    /// Display form of the immediate parent folder name
    pub folder: String,
    /// File name exactly as on disk
    pub raw_name: OsString,
    /// Parent folder name exactly as on disk, used for the done-tree subpath
    pub raw_folder: OsString,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl FileItem {
    /// Build an item for an existing path, reading size and mtime from disk
    pub async fn from_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        Ok(Self::with_metadata(path, metadata.len(), metadata.modified().ok()))
    }

    pub fn with_metadata(path: PathBuf, size: u64, modified: Option<SystemTime>) -> Self {
        let raw_name = path.file_name().map(OsStr::to_os_string).unwrap_or_default();
        let raw_folder = path
            .parent()
            .and_then(Path::file_name)
            .map(OsStr::to_os_string)
            .unwrap_or_default();
        Self {
            name: raw_name.to_string_lossy().into_owned(),
            folder: raw_folder.to_string_lossy().into_owned(),
            path,
            raw_name,
            raw_folder,
            size,
            modified,
        }
    }

    /// Read the whole file for delivery
    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_names_from_path() {
        let item = FileItem::with_metadata(
            PathBuf::from("/srv/scans/to_paperless/invoice.pdf"),
            12,
            None,
        );
        assert_eq!(item.name, "invoice.pdf");
        assert_eq!(item.folder, "to_paperless");
        assert_eq!(item.raw_name, OsString::from("invoice.pdf"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_kept_raw() {
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new("/srv/scans/to_paperless").join(OsStr::from_bytes(b"scan\xff.pdf"));
        let item = FileItem::with_metadata(path, 0, None);

        assert_eq!(item.raw_name.as_bytes(), b"scan\xff.pdf");
        assert_eq!(item.name, "scan\u{FFFD}.pdf");
    }

    #[tokio::test]
    async fn test_from_path_reads_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("to_both");
        std::fs::create_dir(&folder).unwrap();
        let path = folder.join("bill.pdf");
        std::fs::write(&path, b"dummy content").unwrap();

        let item = FileItem::from_path(&path).await.unwrap();
        assert_eq!(item.size, 13);
        assert!(item.modified.is_some());
        assert_eq!(item.folder, "to_both");
        assert_eq!(item.read().await.unwrap(), b"dummy content");
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileItem::from_path(temp_dir.path().join("gone.pdf")).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
