use thiserror::Error;

/// Library result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the identity store and the legacy database probe.
#[derive(Error, Debug)]
pub enum Error {
    #[error("legacy probe: {0}")]
    Probe(#[from] ProbeError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Legacy database probe errors.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The host engine rejected the open request. The host's error is kept as-is.
    #[error("open failed: {0}")]
    Open(#[source] anyhow::Error),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("write to {key} failed: {reason}")]
    Write { key: String, reason: String },

    #[error("remove of {key} failed: {reason}")]
    Remove { key: String, reason: String },
}

impl StoreError {
    /// Key the failed operation targeted.
    pub fn key(&self) -> &str {
        match self {
            Self::Write { key, .. } | Self::Remove { key, .. } => key,
        }
    }
}
