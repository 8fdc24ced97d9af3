//! # Non-volatile memory storage
//!
//! A [`RamStore`] maps a memory's identity string to its full contents as an
//! integer array. [`JsonRamDump`] keeps every entry in one JSON object on
//! disk; [`MemoryRamStore`] keeps them in process.

use crate::error::{Result, SimError};
use log::debug;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DUMP_PATH: &str = "/simulation-metadata/ram_dump.json";

pub trait RamStore: fmt::Debug {
    /// Stored contents for `name`, or `None` if nothing was stored yet.
    fn fetch(&self, name: &str) -> Result<Option<Vec<i64>>>;

    /// Replaces the stored contents for `name`.
    fn store(&self, name: &str, data: &[i64]) -> Result<()>;
}

/// File-backed store: one JSON object of `name -> [int, ...]`. A missing
/// file reads as empty and is created on the first store.
#[derive(Debug, Clone)]
pub struct JsonRamDump {
    path: PathBuf,
}

impl JsonRamDump {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonRamDump { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, Vec<i64>>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            SimError::Persistence(format!(
                "failed to parse RAM dump '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl Default for JsonRamDump {
    fn default() -> Self {
        JsonRamDump::new(DEFAULT_DUMP_PATH)
    }
}

impl RamStore for JsonRamDump {
    fn fetch(&self, name: &str) -> Result<Option<Vec<i64>>> {
        let mut dump = self.load()?;
        Ok(dump.remove(name))
    }

    fn store(&self, name: &str, data: &[i64]) -> Result<()> {
        let mut dump = self.load()?;
        dump.insert(name.to_string(), data.to_vec());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string(&dump)?)?;
        debug!(
            "stored {} words for '{}' in {}",
            data.len(),
            name,
            self.path.display()
        );
        Ok(())
    }
}

/// In-process store, handy for tests and for sharing contents between
/// memories of one run.
#[derive(Debug, Default)]
pub struct MemoryRamStore {
    entries: RefCell<HashMap<String, Vec<i64>>>,
}

impl MemoryRamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl RamStore for MemoryRamStore {
    fn fetch(&self, name: &str) -> Result<Option<Vec<i64>>> {
        Ok(self.entries.borrow().get(name).cloned())
    }

    fn store(&self, name: &str, data: &[i64]) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }
}
