//! In-memory store for tests and embedding.

use super::{TableBackend, Tables};
use crate::{Error, Result};
use std::sync::Mutex;

/// Mutex-guarded tables living only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing set of tables
    pub fn with_tables(tables: Tables) -> Self {
        MemoryStore {
            tables: Mutex::new(tables),
        }
    }

    /// Copy of the current tables, soft-deleted rows included
    pub fn snapshot(&self) -> Result<Tables> {
        self.read(|tables| Ok(tables.clone()))
    }
}

fn poisoned() -> Error {
    Error::Other("memory store lock poisoned".into())
}

impl TableBackend for MemoryStore {
    fn read<R>(&self, view: impl FnOnce(&Tables) -> Result<R>) -> Result<R> {
        let tables = self.tables.lock().map_err(|_| poisoned())?;
        view(&tables)
    }

    fn write<R>(&self, apply: impl FnOnce(&mut Tables) -> Result<R>) -> Result<R> {
        let mut tables = self.tables.lock().map_err(|_| poisoned())?;
        let mut draft = tables.clone();
        let result = apply(&mut draft)?;
        *tables = draft;
        Ok(result)
    }
}
