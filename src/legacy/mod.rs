//! Legacy database probe.
//!
//! Earlier releases kept their data in a versioned local database. Startup
//! asks [LegacyStoreProbe::exists] whether that database is still around.
//! Opening without a version either attaches to the existing database or
//! creates it at version 1; the probe tells the two apart by the upgrade event
//! and deletes what it just created, so checking never leaves a stub behind.
//!
//! Three sources race to settle a probe: the open succeeding, the open
//! failing, and a timer. The first one wins. On timeout the probe answers
//! `false` so an unresponsive engine never blocks startup.

mod config;
mod engine;
mod memory;

pub use config::{ProbeConfig, DEFAULT_PROBE_TIMEOUT, LEGACY_DATABASE_NAME};
pub use engine::{
    DatabaseHandle, OpenEvent, OpenRequest, OpenRequestSender, VersionedDatabase,
    FIRST_SCHEMA_VERSION,
};
pub use memory::{MemoryDatabaseEngine, OpenBehavior};

use crate::error::ProbeError;
use std::sync::Arc;

/// Checks for, and removes, the database left by earlier releases.
pub struct LegacyStoreProbe {
    engine: Arc<dyn VersionedDatabase>,
    config: ProbeConfig,
}

impl LegacyStoreProbe {
    /// Probe with the default database name and timeout.
    pub fn new(engine: Arc<dyn VersionedDatabase>) -> Self {
        Self::with_config(engine, ProbeConfig::default())
    }

    pub fn with_config(engine: Arc<dyn VersionedDatabase>, config: ProbeConfig) -> Self {
        Self { engine, config }
    }

    pub fn database_name(&self) -> &str {
        &self.config.database_name
    }

    /// Whether an earlier release already created the database.
    ///
    /// Fails only when the engine reports an open error. Resolves `false` if
    /// the engine does not answer within the configured timeout. A success or
    /// error arriving after that no longer changes the answer, but a late
    /// first-version upgrade still deletes the database this open created.
    pub async fn exists(&self) -> crate::Result<bool> {
        tracing::info!(
            database = %self.config.database_name,
            "legacy probe: checking for existing database"
        );
        let mut request = self.engine.open(&self.config.database_name);

        let outcome = tokio::time::timeout(self.config.timeout, self.drive(&mut request)).await;
        match outcome {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    database = %self.config.database_name,
                    timeout = ?self.config.timeout,
                    "legacy probe: timed out waiting for the database engine"
                );
                tokio::spawn(drain_late_events(
                    Arc::clone(&self.engine),
                    self.config.database_name.clone(),
                    request,
                ));
                Ok(false)
            }
        }
    }

    /// Delete the legacy database. Failures are not reported.
    pub fn remove(&self) {
        tracing::info!(
            database = %self.config.database_name,
            "legacy probe: deleting legacy database"
        );
        self.engine.delete_database(&self.config.database_name);
    }

    async fn drive(&self, request: &mut OpenRequest) -> crate::Result<bool> {
        let mut existed = true;
        while let Some(event) = request.next_event().await {
            match event {
                OpenEvent::UpgradeNeeded {
                    old_version,
                    new_version,
                } => {
                    tracing::debug!(old_version, new_version, "legacy probe: upgrade needed");
                    if new_version == FIRST_SCHEMA_VERSION {
                        existed = false;
                        self.engine.delete_database(&self.config.database_name);
                    }
                }
                OpenEvent::Success(handle) => {
                    handle.close();
                    return Ok(existed);
                }
                OpenEvent::Error(e) => return Err(ProbeError::Open(e).into()),
            }
        }
        // Host dropped the request without settling it; leave it to the timer.
        std::future::pending().await
    }
}

/// Finish an open the probe stopped waiting for: undo a late creation and
/// release a late handle. Ends on the first terminal event.
async fn drain_late_events(
    engine: Arc<dyn VersionedDatabase>,
    database_name: String,
    mut request: OpenRequest,
) {
    while let Some(event) = request.next_event().await {
        match event {
            OpenEvent::UpgradeNeeded { new_version, .. } => {
                if new_version == FIRST_SCHEMA_VERSION {
                    tracing::info!(
                        database = %database_name,
                        "legacy probe: deleting database created after timeout"
                    );
                    engine.delete_database(&database_name);
                }
            }
            OpenEvent::Success(handle) => {
                handle.close();
                return;
            }
            OpenEvent::Error(e) => {
                tracing::debug!(error = %e, "legacy probe: open failed after timeout");
                return;
            }
        }
    }
}
