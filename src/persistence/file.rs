//! File-backed substrate: one file per key inside a directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::PersistenceAdapter;
use crate::error::{CacheError, Result};

const FILE_EXTENSION: &str = "bin";

// == File Adapter ==
/// Stores each key as `k<hex(key)>.bin` under `base_dir`.
///
/// The quota covers the payload bytes of every key file in the directory.
/// Writes go through a temporary file and a rename so a failed write never
/// leaves a truncated payload behind. The directory is created on first
/// write, so construction cannot fail.
#[derive(Debug, Clone)]
pub struct FileAdapter {
    base_dir: PathBuf,
    quota_bytes: usize,
}

impl FileAdapter {
    // == Constructor ==
    pub fn new(base_dir: impl Into<PathBuf>, quota_bytes: usize) -> Self {
        Self {
            base_dir: base_dir.into(),
            quota_bytes,
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("k{}.{}", hex::encode(key.as_bytes()), FILE_EXTENSION))
    }

    /// Key files currently in the directory. A missing directory has none.
    fn key_files(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(FILE_EXTENSION)
            {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn usage_excluding(&self, skip: &Path) -> Result<usize> {
        let mut used = 0usize;
        for path in self.key_files()? {
            if path != skip {
                used += fs::metadata(&path)?.len() as usize;
            }
        }
        Ok(used)
    }
}

impl PersistenceAdapter for FileAdapter {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        let used = self.usage_excluding(&path)?;
        if used + bytes.len() > self.quota_bytes {
            debug!(
                dir = %self.base_dir.display(),
                requested = bytes.len(),
                used,
                quota = self.quota_bytes,
                "Write refused"
            );
            return Err(CacheError::QuotaExceeded {
                requested: bytes.len(),
                available: self.quota_bytes.saturating_sub(used),
            });
        }

        fs::create_dir_all(&self.base_dir)?;
        let tmp = path.with_extension("tmp");
        if let Err(e) = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, &path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn erase(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn erase_all(&self) -> Result<()> {
        for path in self.key_files()? {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
