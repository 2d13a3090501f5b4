//! Settings store with change notification, built on a `watch` channel.

use std::sync::Arc;
use tokio::sync::watch;

/// Shared settings value that can be replaced at runtime.
///
/// Clones share the same value. Every [`ConfigWatcher`] is woken when the
/// value is replaced.
pub struct ConfigStore<T> {
    tx: Arc<watch::Sender<T>>,
}

/// Follows the value of a [`ConfigStore`].
pub struct ConfigWatcher<T> {
    rx: watch::Receiver<T>,
}

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the value and wake all watchers.
    pub fn update(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn subscribe(&self) -> ConfigWatcher<T> {
        ConfigWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone> ConfigStore<T> {
    pub fn current(&self) -> T {
        self.tx.borrow().clone()
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone> ConfigWatcher<T> {
    /// Wait for the next replacement.
    ///
    /// Fails once every [`ConfigStore`] handle has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }

    /// The latest value, marking it as seen.
    pub fn current(&mut self) -> T {
        self.rx.borrow_and_update().clone()
    }
}
