//! Key-value storage seam.
//!
//! The identity store never talks to a concrete storage engine. Hosts supply
//! anything implementing [KeyValueStore]: reads are synchronous (served from
//! the engine's cache), writes are asynchronous and may fail.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single stored value. Keys decide which variant they hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl StoredValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<String> for StoredValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for StoredValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for StoredValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for StoredValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

/// Store trait: the four operations the identity store relies on.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Never suspends.
    fn get(&self, key: &str) -> Option<StoredValue>;

    /// Read a value, falling back to `default` when the key is unset.
    fn get_or(&self, key: &str, default: StoredValue) -> StoredValue {
        self.get(key).unwrap_or(default)
    }

    /// Persist a value under `key`.
    async fn put(&self, key: &str, value: StoredValue) -> crate::Result<()>;

    /// Delete `key`. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> crate::Result<()>;
}

/// Alias for a shared store (common usage).
pub type Storage = Arc<dyn KeyValueStore>;
