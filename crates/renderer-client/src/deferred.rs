//! Broadcast-once completion handles.
//!
//! A [`Deferred`] is resolved at most once. Any number of [`Waiter`]s can be
//! taken from it, before or after resolution, and all of them observe the
//! same value.

use tokio::sync::watch;

/// The [`Deferred`] was dropped without ever being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deferred value dropped before it was resolved")]
pub struct Abandoned;

/// A value that becomes available exactly once.
#[derive(Debug)]
pub struct Deferred<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> Deferred<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Resolve with `value`. Returns false (and drops `value`) if already
    /// resolved.
    pub fn resolve(&self, value: T) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            true
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// The resolved value, if any.
    pub fn get(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    pub fn waiter(&self) -> Waiter<T> {
        Waiter {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle that completes when its [`Deferred`] is resolved.
#[derive(Debug, Clone)]
pub struct Waiter<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> Waiter<T> {
    pub async fn wait(mut self) -> Result<T, Abandoned> {
        let value = self
            .rx
            .wait_for(|slot| slot.is_some())
            .await
            .map_err(|_| Abandoned)?;
        (*value).clone().ok_or(Abandoned)
    }
}
