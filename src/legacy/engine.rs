//! Host versioned-database engine abstraction.
//!
//! Implement [VersionedDatabase] over the platform's local database (a browser
//! style versioned store, or anything with the same open/upgrade/delete
//! lifecycle). An open call returns immediately with an [OpenRequest]; the host
//! reports progress by pushing [OpenEvent]s through the paired
//! [OpenRequestSender], from any thread or task.

use tokio::sync::mpsc;

/// Version a database is created at on first open.
pub const FIRST_SCHEMA_VERSION: u64 = 1;

/// An open connection handle. Closing releases the host's lock on the database.
pub trait DatabaseHandle: Send {
    fn version(&self) -> u64;

    fn close(self: Box<Self>);
}

/// Progress of an open request, in the order the host fires them.
pub enum OpenEvent {
    /// The database is being created or upgraded from `old_version` to `new_version`.
    UpgradeNeeded { old_version: u64, new_version: u64 },

    /// The open completed.
    Success(Box<dyn DatabaseHandle>),

    /// The open failed. The host's error is passed through unchanged.
    Error(anyhow::Error),
}

impl std::fmt::Debug for OpenEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpgradeNeeded {
                old_version,
                new_version,
            } => f
                .debug_struct("UpgradeNeeded")
                .field("old_version", old_version)
                .field("new_version", new_version)
                .finish(),
            Self::Success(handle) => f
                .debug_tuple("Success")
                .field(&handle.version())
                .finish(),
            Self::Error(e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}

/// Receiving side of an in-flight open, consumed by the caller of `open`.
pub struct OpenRequest {
    events: mpsc::UnboundedReceiver<OpenEvent>,
}

impl OpenRequest {
    /// Create a request and the sender the host uses to complete it.
    pub fn channel() -> (OpenRequestSender, OpenRequest) {
        let (tx, rx) = mpsc::unbounded_channel();
        (OpenRequestSender { tx }, OpenRequest { events: rx })
    }

    /// Next event, or `None` once the host dropped its sender.
    pub async fn next_event(&mut self) -> Option<OpenEvent> {
        self.events.recv().await
    }
}

/// Host side of an open request.
///
/// Every method returns whether the event reached a live request. Events sent
/// after the request was dropped are discarded; a discarded success closes
/// its handle so the database is not left locked.
#[derive(Clone)]
pub struct OpenRequestSender {
    tx: mpsc::UnboundedSender<OpenEvent>,
}

impl OpenRequestSender {
    pub fn upgrade_needed(&self, old_version: u64, new_version: u64) -> bool {
        self.tx
            .send(OpenEvent::UpgradeNeeded {
                old_version,
                new_version,
            })
            .is_ok()
    }

    pub fn succeed(&self, handle: Box<dyn DatabaseHandle>) -> bool {
        match self.tx.send(OpenEvent::Success(handle)) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                if let OpenEvent::Success(handle) = event {
                    handle.close();
                }
                false
            }
        }
    }

    pub fn fail(&self, error: anyhow::Error) -> bool {
        self.tx.send(OpenEvent::Error(error)).is_ok()
    }

    /// True once the request side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Host-provided versioned local database engine.
pub trait VersionedDatabase: Send + Sync {
    /// Open `name` without an explicit version: attach to the current version,
    /// or create it at [FIRST_SCHEMA_VERSION] (firing an upgrade first).
    fn open(&self, name: &str) -> OpenRequest;

    /// Fire-and-forget deletion. Deleting a missing database is a no-op.
    fn delete_database(&self, name: &str);
}
