//! Locally persisted login identity.
//!
//! [IdentityStore] is a typed view over a [KeyValueStore](crate::store::KeyValueStore).
//! The identity is kept as discrete entries, not one record:
//!
//! - `number_id`: `<number>.<device_id>`
//! - `uuid_id`: `<identifier>.<device_id>` (may be stored in mixed case)
//! - `device_name`, `deviceNameEncrypted`, `password`
//!
//! Multi-key writes are issued concurrently and awaited together. There is no
//! cross-key transaction: if one write fails the call fails, and the writes
//! that already landed stay persisted.

mod credentials;

pub use credentials::{generate_password, SetCredentials, WebServiceCredentials};

use crate::events::CredentialListeners;
use crate::store::{Storage, StoredValue};
use crate::types::{decode, encode, DeviceAddress, DeviceId};
use futures::future::join_all;
use std::future::Future;
use uuid::Uuid;

/// Storage keys owned by the identity store.
pub mod keys {
    pub const NUMBER_ID: &str = "number_id";
    pub const UUID_ID: &str = "uuid_id";
    pub const DEVICE_NAME: &str = "device_name";
    pub const DEVICE_NAME_ENCRYPTED: &str = "deviceNameEncrypted";
    pub const PASSWORD: &str = "password";
    /// Legacy entry; only ever removed.
    pub const SIGNALING_KEY: &str = "signaling_key";
}

/// Typed accessor for the local credential record.
pub struct IdentityStore {
    storage: Storage,
    listeners: CredentialListeners,
}

impl IdentityStore {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            listeners: CredentialListeners::new(),
        }
    }

    /// Register a listener fired after every successful credential write.
    pub async fn on_credentials_change<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.subscribe(f).await;
    }

    /// Store the identifier bound to `device_id`, then notify listeners.
    pub async fn set_identifier_and_device_id(
        &self,
        identifier: &str,
        device_id: DeviceId,
    ) -> crate::Result<()> {
        let address = DeviceAddress::new(identifier, device_id);
        self.storage
            .put(keys::UUID_ID, address.to_string().into())
            .await?;

        tracing::info!("identity: identifier and device id changed");
        self.listeners.notify().await;
        Ok(())
    }

    /// Phone-number part of `number_id`.
    pub fn get_number(&self) -> Option<String> {
        let number_id = self.get_text(keys::NUMBER_ID)?;
        Some(decode(&number_id).0.to_string())
    }

    /// Identifier part of `uuid_id`, lower-cased.
    pub fn get_identifier(&self) -> Option<String> {
        let uuid_id = self.get_text(keys::UUID_ID)?.to_lowercase();
        Some(decode(&uuid_id).0.to_string())
    }

    /// The stored identifier parsed as a UUID. `None` when unset or malformed.
    pub fn get_uuid(&self) -> Option<Uuid> {
        self.get_identifier()?.parse().ok()
    }

    /// Device id from `uuid_id`, falling back to `number_id`.
    pub fn get_device_id(&self) -> Option<DeviceId> {
        let raw = self
            .device_id_from(keys::UUID_ID)
            .or_else(|| self.device_id_from(keys::NUMBER_ID))?;
        match raw.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(device_id = %raw, "identity: stored device id is not an integer");
                None
            }
        }
    }

    pub fn get_device_name(&self) -> Option<String> {
        self.get_text(keys::DEVICE_NAME)
    }

    /// Marks the persisted device name as ciphertext. Does not touch the name.
    pub async fn set_device_name_encrypted(&self) -> crate::Result<()> {
        self.storage
            .put(keys::DEVICE_NAME_ENCRYPTED, true.into())
            .await
    }

    pub fn get_device_name_encrypted(&self) -> Option<bool> {
        self.storage.get(keys::DEVICE_NAME_ENCRYPTED)?.as_bool()
    }

    pub async fn remove_signaling_key(&self) -> crate::Result<()> {
        self.storage.remove(keys::SIGNALING_KEY).await
    }

    /// Write the full credential set concurrently, then notify listeners.
    ///
    /// Fails with the first failing write; no rollback of the others.
    pub async fn set_credentials(&self, credentials: SetCredentials) -> crate::Result<()> {
        let SetCredentials {
            identifier,
            number,
            device_id,
            device_name,
            password,
        } = credentials;

        let mut writes = Vec::with_capacity(4);
        writes.push(
            self.storage
                .put(keys::NUMBER_ID, encode(&number, device_id).into()),
        );
        match identifier {
            Some(identifier) => writes.push(
                self.storage
                    .put(keys::UUID_ID, encode(&identifier, device_id).into()),
            ),
            // An identifier left over from an earlier set must not outlive it.
            None => writes.push(self.storage.remove(keys::UUID_ID)),
        }
        writes.push(self.storage.put(keys::PASSWORD, password.into()));
        if let Some(name) = device_name.filter(|n| !n.is_empty()) {
            writes.push(self.storage.put(keys::DEVICE_NAME, name.into()));
        }
        settle(writes).await?;

        tracing::info!(device_id, "identity: credentials changed");
        self.listeners.notify().await;
        Ok(())
    }

    /// Delete the credential set concurrently. Listeners are not notified.
    pub async fn remove_credentials(&self) -> crate::Result<()> {
        let removals: Vec<_> = [
            keys::NUMBER_ID,
            keys::UUID_ID,
            keys::PASSWORD,
            keys::DEVICE_NAME,
        ]
        .into_iter()
        .map(|key| self.storage.remove(key))
        .collect();
        settle(removals).await?;

        tracing::info!("identity: credentials removed");
        Ok(())
    }

    /// Credentials for the remote service. Empty strings when nothing is stored.
    pub fn get_web_service_credentials(&self) -> WebServiceCredentials {
        let username = self
            .get_text(keys::UUID_ID)
            .filter(|s| !s.is_empty())
            .or_else(|| self.get_text(keys::NUMBER_ID).filter(|s| !s.is_empty()))
            .unwrap_or_default();
        let password = self
            .storage
            .get_or(keys::PASSWORD, StoredValue::from(""))
            .as_str()
            .unwrap_or_default()
            .to_string();
        WebServiceCredentials { username, password }
    }

    fn get_text(&self, key: &str) -> Option<String> {
        self.storage.get(key)?.as_str().map(str::to_string)
    }

    fn device_id_from(&self, key: &str) -> Option<String> {
        let combined = self.get_text(key)?;
        decode(&combined)
            .1
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }
}

/// Drive every write to completion, then report the first failure (issue order).
async fn settle<F>(writes: Vec<F>) -> crate::Result<()>
where
    F: Future<Output = crate::Result<()>>,
{
    join_all(writes).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;
    use tokio::time::timeout;

    /// Memory store whose writes to one key always fail.
    struct FailingStore {
        inner: MemoryStore,
        failing_key: &'static str,
    }

    #[async_trait]
    impl KeyValueStore for FailingStore {
        fn get(&self, key: &str) -> Option<StoredValue> {
            self.inner.get(key)
        }

        async fn put(&self, key: &str, value: StoredValue) -> crate::Result<()> {
            if key == self.failing_key {
                return Err(StoreError::Write {
                    key: key.to_string(),
                    reason: "disk full".into(),
                }
                .into());
            }
            self.inner.put(key, value).await
        }

        async fn remove(&self, key: &str) -> crate::Result<()> {
            if key == self.failing_key {
                return Err(StoreError::Remove {
                    key: key.to_string(),
                    reason: "disk full".into(),
                }
                .into());
            }
            self.inner.remove(key).await
        }
    }

    /// Memory store whose writes wait until `barrier` has gathered every writer.
    struct BarrierStore {
        inner: MemoryStore,
        barrier: Barrier,
    }

    #[async_trait]
    impl KeyValueStore for BarrierStore {
        fn get(&self, key: &str) -> Option<StoredValue> {
            self.inner.get(key)
        }

        async fn put(&self, key: &str, value: StoredValue) -> crate::Result<()> {
            self.barrier.wait().await;
            self.inner.put(key, value).await
        }

        async fn remove(&self, key: &str) -> crate::Result<()> {
            self.barrier.wait().await;
            self.inner.remove(key).await
        }
    }

    fn credentials() -> SetCredentials {
        SetCredentials {
            identifier: Some("u".into()),
            number: "n".into(),
            device_id: 3,
            device_name: None,
            password: "p".into(),
        }
    }

    async fn counting(identity: &IdentityStore) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        identity
            .on_credentials_change(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        count
    }

    #[tokio::test]
    async fn set_credentials_then_web_service_credentials() {
        let identity = IdentityStore::new(Arc::new(MemoryStore::new()));
        identity.set_credentials(credentials()).await.unwrap();

        let creds = identity.get_web_service_credentials();
        assert_eq!(creds.username, "u.3");
        assert_eq!(creds.password, "p");
        assert_eq!(identity.get_number().as_deref(), Some("n"));
        assert_eq!(identity.get_identifier().as_deref(), Some("u"));
        assert_eq!(identity.get_device_id(), Some(3));
    }

    #[tokio::test]
    async fn set_credentials_notifies_after_write() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityStore::new(store.clone());
        let seen = Arc::new(std::sync::Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let reader = store.clone();
        identity
            .on_credentials_change(move || {
                *seen_clone.lock().unwrap() = reader.get(keys::PASSWORD);
            })
            .await;

        identity.set_credentials(credentials()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(StoredValue::from("p")));
    }

    #[tokio::test]
    async fn set_credentials_writes_device_name_only_when_given() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityStore::new(store.clone());
        identity.set_credentials(credentials()).await.unwrap();
        assert!(identity.get_device_name().is_none());

        let mut with_name = credentials();
        with_name.device_name = Some("Work laptop".into());
        identity.set_credentials(with_name).await.unwrap();
        assert_eq!(identity.get_device_name().as_deref(), Some("Work laptop"));
    }

    #[tokio::test]
    async fn set_credentials_without_identifier_leaves_no_uuid_entry() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityStore::new(store.clone());
        let mut creds = credentials();
        creds.identifier = None;
        identity.set_credentials(creds).await.unwrap();

        assert!(store.get(keys::UUID_ID).is_none());
        assert!(identity.get_identifier().is_none());
        assert_eq!(identity.get_device_id(), Some(3));
        assert_eq!(identity.get_web_service_credentials().username, "n.3");
    }

    #[tokio::test]
    async fn set_credentials_without_identifier_replaces_earlier_identity() {
        let identity = IdentityStore::new(Arc::new(MemoryStore::new()));
        identity.set_credentials(credentials()).await.unwrap();

        identity
            .set_credentials(SetCredentials {
                identifier: None,
                number: "m".into(),
                device_id: 5,
                device_name: None,
                password: "q".into(),
            })
            .await
            .unwrap();

        assert!(identity.get_identifier().is_none());
        assert_eq!(identity.get_device_id(), Some(5));
        let creds = identity.get_web_service_credentials();
        assert_eq!(creds.username, "m.5");
        assert_eq!(creds.password, "q");
    }

    #[tokio::test]
    async fn credential_writes_are_issued_concurrently() {
        let store = Arc::new(BarrierStore {
            inner: MemoryStore::new(),
            barrier: Barrier::new(4),
        });
        let identity = IdentityStore::new(store.clone());
        let mut creds = credentials();
        creds.device_name = Some("phone".into());

        // Each write parks until all four have started; sequential writes would hang.
        timeout(Duration::from_secs(5), identity.set_credentials(creds))
            .await
            .expect("writes were not issued together")
            .unwrap();
        assert_eq!(store.inner.len(), 4);

        timeout(Duration::from_secs(5), identity.remove_credentials())
            .await
            .expect("removals were not issued together")
            .unwrap();
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn remove_credentials_clears_identity_without_notifying() {
        let identity = IdentityStore::new(Arc::new(MemoryStore::new()));
        let count = counting(&identity).await;
        let mut creds = credentials();
        creds.device_name = Some("phone".into());
        identity.set_credentials(creds).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        identity.remove_credentials().await.unwrap();
        assert!(identity.get_number().is_none());
        assert!(identity.get_identifier().is_none());
        assert!(identity.get_device_id().is_none());
        assert!(identity.get_device_name().is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let creds = identity.get_web_service_credentials();
        assert!(creds.is_empty());
    }

    #[tokio::test]
    async fn remove_credentials_on_empty_store_succeeds() {
        let identity = IdentityStore::new(Arc::new(MemoryStore::new()));
        tokio_test::assert_ok!(identity.remove_credentials().await);
    }

    #[tokio::test]
    async fn set_credentials_partial_failure_keeps_successful_writes() {
        let store = Arc::new(FailingStore {
            inner: MemoryStore::new(),
            failing_key: keys::UUID_ID,
        });
        let identity = IdentityStore::new(store.clone());
        let count = counting(&identity).await;

        let res = identity.set_credentials(credentials()).await;
        let err = tokio_test::assert_err!(res);
        match err {
            crate::Error::Store(e) => assert_eq!(e.key(), keys::UUID_ID),
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(store.get(keys::NUMBER_ID), Some(StoredValue::from("n.3")));
        assert_eq!(store.get(keys::PASSWORD), Some(StoredValue::from("p")));
        assert!(store.get(keys::UUID_ID).is_none());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remove_credentials_partial_failure_surfaces_error() {
        let store = Arc::new(FailingStore {
            inner: MemoryStore::new(),
            failing_key: keys::PASSWORD,
        });
        store.inner.put(keys::NUMBER_ID, "n.1".into()).await.unwrap();
        store.inner.put(keys::PASSWORD, "p".into()).await.unwrap();
        let identity = IdentityStore::new(store.clone());

        assert!(identity.remove_credentials().await.is_err());
        assert!(store.get(keys::NUMBER_ID).is_none());
        assert_eq!(store.get(keys::PASSWORD), Some(StoredValue::from("p")));
    }

    #[tokio::test]
    async fn set_identifier_and_device_id_notifies() {
        let identity = IdentityStore::new(Arc::new(MemoryStore::new()));
        let count = counting(&identity).await;
        identity
            .set_identifier_and_device_id("abc", 7)
            .await
            .unwrap();
        assert_eq!(identity.get_identifier().as_deref(), Some("abc"));
        assert_eq!(identity.get_device_id(), Some(7));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn set_identifier_failure_does_not_notify() {
        let store = Arc::new(FailingStore {
            inner: MemoryStore::new(),
            failing_key: keys::UUID_ID,
        });
        let identity = IdentityStore::new(store);
        let count = counting(&identity).await;
        assert!(identity.set_identifier_and_device_id("abc", 1).await.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn identifier_is_case_insensitive() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityStore::new(store.clone());
        store.put(keys::UUID_ID, "ABC.1".into()).await.unwrap();
        let upper = identity.get_identifier();
        store.put(keys::UUID_ID, "abc.1".into()).await.unwrap();
        let lower = identity.get_identifier();
        assert_eq!(upper, lower);
        assert_eq!(upper.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn device_id_prefers_identifier_entry() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityStore::new(store.clone());
        store.put(keys::NUMBER_ID, "+1555.2".into()).await.unwrap();
        assert_eq!(identity.get_device_id(), Some(2));
        store.put(keys::UUID_ID, "abc.5".into()).await.unwrap();
        assert_eq!(identity.get_device_id(), Some(5));
    }

    #[tokio::test]
    async fn device_id_falls_back_when_identifier_has_no_suffix() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityStore::new(store.clone());
        store.put(keys::UUID_ID, "abc".into()).await.unwrap();
        store.put(keys::NUMBER_ID, "+1555.4".into()).await.unwrap();
        assert_eq!(identity.get_device_id(), Some(4));
    }

    #[tokio::test]
    async fn device_id_unparseable_is_none() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityStore::new(store.clone());
        store.put(keys::UUID_ID, "abc.x".into()).await.unwrap();
        assert_eq!(identity.get_device_id(), None);
    }

    #[tokio::test]
    async fn get_uuid_parses_stored_identifier() {
        let identity = IdentityStore::new(Arc::new(MemoryStore::new()));
        let uuid = Uuid::new_v4();
        identity
            .set_identifier_and_device_id(&uuid.to_string().to_uppercase(), 1)
            .await
            .unwrap();
        assert_eq!(identity.get_uuid(), Some(uuid));

        identity
            .set_identifier_and_device_id("not-a-uuid", 1)
            .await
            .unwrap();
        assert_eq!(identity.get_uuid(), None);
    }

    #[tokio::test]
    async fn device_name_encrypted_flag() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityStore::new(store.clone());
        store.put(keys::DEVICE_NAME, "phone".into()).await.unwrap();
        assert_eq!(identity.get_device_name_encrypted(), None);

        identity.set_device_name_encrypted().await.unwrap();
        assert_eq!(identity.get_device_name_encrypted(), Some(true));
        assert_eq!(identity.get_device_name().as_deref(), Some("phone"));
    }

    #[tokio::test]
    async fn remove_signaling_key_deletes_legacy_entry() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityStore::new(store.clone());
        store.put(keys::SIGNALING_KEY, "legacy".into()).await.unwrap();
        identity.remove_signaling_key().await.unwrap();
        assert!(store.get(keys::SIGNALING_KEY).is_none());
        tokio_test::assert_ok!(identity.remove_signaling_key().await);
    }

    #[test]
    fn web_service_credentials_on_empty_store() {
        let identity = IdentityStore::new(Arc::new(MemoryStore::new()));
        let creds = identity.get_web_service_credentials();
        assert_eq!(creds.username, "");
        assert_eq!(creds.password, "");
    }

    #[tokio::test]
    async fn web_service_credentials_prefer_raw_identifier_entry() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityStore::new(store.clone());
        store.put(keys::NUMBER_ID, "+1555.2".into()).await.unwrap();
        assert_eq!(identity.get_web_service_credentials().username, "+1555.2");
        store.put(keys::UUID_ID, "ABC.2".into()).await.unwrap();
        assert_eq!(identity.get_web_service_credentials().username, "ABC.2");
    }
}
