//! Durable named-slot storage.
//!
//! The engine persists everything through the `StorageBackend` trait: one
//! string payload per named slot. `FileBackend` keeps each slot in its own
//! JSON file under a data directory; `MemoryBackend` backs tests and
//! throwaway hosts.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;

/// A key-value slot store. Readers must fail soft: a missing slot is `None`,
/// and callers treat undecodable payloads as absence.
pub trait StorageBackend: Send + Sync {
    fn get(&self, slot: &str) -> Option<String>;
    fn set(&self, slot: &str, value: &str) -> std::io::Result<()>;
    fn remove(&self, slot: &str) -> std::io::Result<()>;
}

/// One JSON file per slot under `dir`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn default_data_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Lattice Labs")
                .join("Scriptum")
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::env::var_os("XDG_DATA_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| {
                    std::env::var_os("HOME")
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from("/tmp"))
                        .join(".local")
                        .join("share")
                })
                .join("scriptum")
        }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{slot}.json"))
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, slot: &str) -> Option<String> {
        fs::read_to_string(self.slot_path(slot)).ok()
    }

    fn set(&self, slot: &str, value: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.slot_path(slot), value)
    }

    fn remove(&self, slot: &str) -> std::io::Result<()> {
        match fs::remove_file(self.slot_path(slot)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-memory slots.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, slot: &str) -> Option<String> {
        self.slots.lock().get(slot).cloned()
    }

    fn set(&self, slot: &str, value: &str) -> std::io::Result<()> {
        self.slots.lock().insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> std::io::Result<()> {
        self.slots.lock().remove(slot);
        Ok(())
    }
}
