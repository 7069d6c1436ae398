//! File storage collaborator
//!
//! The pipeline only needs a byte stream per file reference; where the bytes
//! live (local disk, object storage) stays behind this seam.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::error::ConfigurationError;

/// Opens uploaded files by opaque reference.
pub trait FileStore: Send + Sync {
    /// An unreadable file is a configuration error: it fires before any job
    /// is created.
    fn open_stream(&self, file_ref: &str) -> Result<Box<dyn Read + Send>, ConfigurationError>;
}

/// Filesystem-backed store; `file_ref` is a path, optionally under a root.
pub struct LocalFileStore {
    root: Option<PathBuf>,
}

impl LocalFileStore {
    /// Resolve references relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Treat references as absolute or cwd-relative paths.
    pub fn passthrough() -> Self {
        Self { root: None }
    }
}

impl FileStore for LocalFileStore {
    fn open_stream(&self, file_ref: &str) -> Result<Box<dyn Read + Send>, ConfigurationError> {
        let path = match &self.root {
            Some(root) => root.join(file_ref),
            None => PathBuf::from(file_ref),
        };
        let file = File::open(&path)
            .map_err(|e| ConfigurationError::UnreadableFile(format!("{}: {}", path.display(), e)))?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_local_store_opens_file_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscribers.csv");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"Email\na@b.cz\n")
            .unwrap();

        let store = LocalFileStore::new(dir.path());
        let mut stream = store.open_stream("subscribers.csv").unwrap();
        let mut content = String::new();
        stream.read_to_string(&mut content).unwrap();
        assert!(content.starts_with("Email"));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let store = LocalFileStore::passthrough();
        let result = store.open_stream("/nonexistent/import.csv");
        assert!(matches!(result, Err(ConfigurationError::UnreadableFile(_))));
    }
}
