//! # messenger-storage
//!
//! Local persistence pieces of a messaging client's storage layer.
//!
//! ## Features
//!
//! - [IdentityStore]: typed access to the persisted login identity (number,
//!   identifier, device id, device name, password) over any key-value engine
//! - Credential change notification for observers of the identity
//! - [LegacyStoreProbe]: detects a database left by earlier releases, without
//!   creating one as a side effect, and deletes it on request
//! - In-memory [MemoryStore] and [MemoryDatabaseEngine] for tests and hosts
//!   without persistence
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use messenger_storage::{IdentityStore, LegacyStoreProbe, MemoryDatabaseEngine, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let probe = LegacyStoreProbe::new(Arc::new(MemoryDatabaseEngine::new()));
//!     if probe.exists().await? {
//!         probe.remove();
//!     }
//!     let identity = IdentityStore::new(Arc::new(MemoryStore::new()));
//!     println!("{:?}", identity.get_web_service_credentials());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod identity;
pub mod legacy;
pub mod store;
pub mod types;

pub use error::{Error, ProbeError, Result, StoreError};
pub use events::CredentialListeners;
pub use identity::{generate_password, IdentityStore, SetCredentials, WebServiceCredentials};
pub use legacy::{LegacyStoreProbe, MemoryDatabaseEngine, ProbeConfig, VersionedDatabase};
pub use store::{KeyValueStore, MemoryStore, Storage, StoredValue};
pub use types::{DeviceAddress, DeviceId};
