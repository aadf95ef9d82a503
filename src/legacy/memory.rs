use super::engine::{
    DatabaseHandle, OpenRequest, OpenRequestSender, VersionedDatabase, FIRST_SCHEMA_VERSION,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// How the memory engine answers the next open requests.
#[derive(Clone, Debug, Default)]
pub enum OpenBehavior {
    /// Attach to the existing database, or create it at version 1.
    #[default]
    Normal,
    /// Fail every open with this message.
    Fail(String),
    /// Never answer until [MemoryDatabaseEngine::release_stalled] is called.
    Stall,
}

#[derive(Default)]
struct State {
    databases: HashMap<String, u64>,
    behavior: OpenBehavior,
    stalled: Vec<(String, OpenRequestSender)>,
    closes: usize,
    deletes: usize,
}

/// In-memory versioned database engine (for testing; not persistent).
///
/// Mirrors browser semantics: opening a missing database creates it at
/// [FIRST_SCHEMA_VERSION] and fires `UpgradeNeeded` before `Success`.
#[derive(Clone, Default)]
pub struct MemoryDatabaseEngine {
    state: Arc<Mutex<State>>,
}

impl MemoryDatabaseEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that already holds `name` at `version`.
    pub fn with_database(name: &str, version: u64) -> Self {
        let engine = Self::new();
        engine.lock().databases.insert(name.to_string(), version);
        engine
    }

    pub fn set_behavior(&self, behavior: OpenBehavior) {
        self.lock().behavior = behavior;
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().databases.contains_key(name)
    }

    pub fn version(&self, name: &str) -> Option<u64> {
        self.lock().databases.get(name).copied()
    }

    /// Handles closed so far.
    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    /// Delete calls received so far.
    pub fn delete_count(&self) -> usize {
        self.lock().deletes
    }

    /// Answer every stalled open as [OpenBehavior::Normal] would. Returns how
    /// many requests were still listening.
    pub fn release_stalled(&self) -> usize {
        let stalled = std::mem::take(&mut self.lock().stalled);
        stalled
            .into_iter()
            .filter(|(name, tx)| self.complete(name, tx))
            .count()
    }

    fn complete(&self, name: &str, tx: &OpenRequestSender) -> bool {
        let version = {
            let mut state = self.lock();
            match state.databases.get(name) {
                Some(version) => *version,
                None => {
                    state
                        .databases
                        .insert(name.to_string(), FIRST_SCHEMA_VERSION);
                    tx.upgrade_needed(0, FIRST_SCHEMA_VERSION);
                    FIRST_SCHEMA_VERSION
                }
            }
        };
        tx.succeed(Box::new(MemoryHandle {
            version,
            state: Arc::clone(&self.state),
        }))
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VersionedDatabase for MemoryDatabaseEngine {
    fn open(&self, name: &str) -> OpenRequest {
        let (tx, request) = OpenRequest::channel();
        let behavior = self.lock().behavior.clone();
        match behavior {
            OpenBehavior::Normal => {
                self.complete(name, &tx);
            }
            OpenBehavior::Fail(message) => {
                tx.fail(anyhow::anyhow!(message));
            }
            OpenBehavior::Stall => self.lock().stalled.push((name.to_string(), tx)),
        }
        request
    }

    fn delete_database(&self, name: &str) {
        let mut state = self.lock();
        state.databases.remove(name);
        state.deletes += 1;
    }
}

struct MemoryHandle {
    version: u64,
    state: Arc<Mutex<State>>,
}

impl DatabaseHandle for MemoryHandle {
    fn version(&self) -> u64 {
        self.version
    }

    fn close(self: Box<Self>) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closes += 1;
    }
}
