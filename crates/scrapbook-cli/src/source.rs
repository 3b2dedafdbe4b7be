//! Images read from disk.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use scrapbook_core::{RawImage, ReadError};

/// An image file on disk. Its type is sniffed from the contents.
#[derive(Debug, Clone)]
pub struct FileImage {
    path: PathBuf,
    name: Option<String>,
}

impl FileImage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RawImage for FileImage {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn declared_mime(&self) -> Option<&str> {
        None
    }

    async fn read(&self) -> Result<Bytes, ReadError> {
        tokio::fs::read(&self.path)
            .await
            .map(Bytes::from)
            .map_err(|e| ReadError(format!("{}: {e}", self.path.display())))
    }
}
