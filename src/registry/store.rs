//! Durable Name Set Storage
//!
//! Abstraction over the single durable record holding the allocated
//! name set. The record is loaded once at startup and rewritten
//! wholesale on every mutation.

use crate::error::Result;
use parking_lot::RwLock;
use std::fs;
use std::path::PathBuf;

// =============================================================================
// Store Trait
// =============================================================================

/// Durable storage for the allocated name set
pub trait NameStore: Send + Sync {
    /// Load the complete name set; an absent record loads as empty
    fn load(&self) -> Result<Vec<String>>;

    /// Rewrite the complete name set
    fn save(&self, names: &[String]) -> Result<()>;
}

// =============================================================================
// JSON File Store
// =============================================================================

/// File-backed store: one JSON array of names
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl NameStore for JsonFileStore {
    fn load(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        let names: Vec<String> = serde_json::from_str(&contents)?;
        Ok(names)
    }

    fn save(&self, names: &[String]) -> Result<()> {
        let contents = serde_json::to_string(names)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// In-memory store for tests, with a failure toggle to exercise the
/// persistence-failure path
pub struct MemoryStore {
    names: RwLock<Vec<String>>,
    available: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            names: RwLock::new(Vec::new()),
            available: RwLock::new(true),
        }
    }

    /// Set availability (for testing)
    pub fn set_available(&self, available: bool) {
        *self.available.write() = available;
    }

    /// Snapshot of what has been persisted so far
    pub fn persisted(&self) -> Vec<String> {
        self.names.read().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NameStore for MemoryStore {
    fn load(&self) -> Result<Vec<String>> {
        if !*self.available.read() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "store unavailable",
            )
            .into());
        }
        Ok(self.names.read().clone())
    }

    fn save(&self, names: &[String]) -> Result<()> {
        if !*self.available.read() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "store unavailable",
            )
            .into());
        }
        *self.names.write() = names.to_vec();
        Ok(())
    }
}
