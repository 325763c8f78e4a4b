//! File-backed store with advisory locking.
//!
//! All tables live in one JSON snapshot. A sidecar `.lock` file serializes
//! access across threads and processes: readers take a shared lock, writers
//! hold an exclusive lock across the whole load-modify-save so that
//! get-or-create cannot race.

use super::{TableBackend, Tables};
use crate::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// JSON snapshot store at a fixed path
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn open_lock(&self) -> Result<File> {
        self.ensure_parent_dir()?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        Ok(file)
    }

    /// Load tables; a missing file is an empty store
    fn load(&self) -> Result<Tables> {
        if !self.path.exists() {
            tracing::debug!("No store file at {:?}, starting empty", self.path);
            return Ok(Tables::default());
        }

        let mut contents = String::new();
        std::io::BufReader::new(File::open(&self.path)?).read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(Tables::default());
        }

        let tables = serde_json::from_str::<Tables>(&contents).map_err(|e| {
            tracing::warn!("Failed to parse store file {:?}: {}", self.path, e);
            Error::Json(e)
        })?;
        Ok(tables)
    }

    /// Atomically replace the snapshot:
    /// 1. Write to a temp file in the same directory
    /// 2. Sync to disk
    /// 3. Rename over the original
    fn save(&self, tables: &Tables) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
        })?;
        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(tables)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl TableBackend for FileStore {
    fn read<R>(&self, view: impl FnOnce(&Tables) -> Result<R>) -> Result<R> {
        let lock = self.open_lock()?;
        lock.lock_shared()?;

        let result = self.load().and_then(|tables| view(&tables));

        lock.unlock()?;
        result
    }

    fn write<R>(&self, apply: impl FnOnce(&mut Tables) -> Result<R>) -> Result<R> {
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;

        let result = self.load().and_then(|mut tables| {
            let value = apply(&mut tables)?;
            self.save(&tables)?;
            Ok(value)
        });

        lock.unlock()?;
        if result.is_ok() {
            tracing::debug!("Saved store to {:?}", self.path);
        }
        result
    }
}
