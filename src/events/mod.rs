//! Credential change notification.
//!
//! One signal, no payload: "the stored credentials changed". Listeners run in
//! subscription order on the task that completed the write.

use tokio::sync::RwLock;

/// Type alias for listeners so the field stays readable and is Send + Sync.
type Listener = Box<dyn Fn() + Send + Sync>;

/// Ordered list of zero-argument credential change listeners.
#[derive(Default)]
pub struct CredentialListeners {
    listeners: RwLock<Vec<Listener>>,
}

impl CredentialListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It is called after every credential change.
    pub async fn subscribe<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.write().await.push(Box::new(f));
    }

    pub async fn len(&self) -> usize {
        self.listeners.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Call every listener once, in the order they subscribed.
    pub async fn notify(&self) {
        let listeners = self.listeners.read().await;
        for f in listeners.iter() {
            f();
        }
    }
}
