//! Keyed mutual exclusion for the miss path.
//!
//! One async mutex per active key, created lazily and dropped once nobody
//! holds or awaits it. Different keys never contend. Release is the RAII
//! drop of [`KeyGuard`], so the lock cannot leak on early returns or errors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-key lock table. In-memory only: it holds no entries across process
/// restarts and knows nothing about other processes.
#[derive(Default)]
pub struct KeyLock {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, suspending until it is free. Holders of
    /// other keys are unaffected.
    pub async fn acquire(&self, key: &str) -> KeyGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap();
            Arc::clone(slots.entry(key.to_string()).or_default())
        };
        let guard = slot.clone().lock_owned().await;
        KeyGuard {
            owner: self,
            key: key.to_string(),
            slot,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}

/// Held lock for one key. Dropping it releases the key and retires the slot
/// if no other task is waiting on it.
pub struct KeyGuard<'a> {
    owner: &'a KeyLock,
    key: String,
    slot: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self.owner.slots.lock().unwrap();
        // Three handles when uncontended: the map entry, `self.slot`, and
        // the one inside the owned guard. Any waiter adds a fourth.
        if Arc::strong_count(&self.slot) == 3 {
            slots.remove(&self.key);
        }
        // Release under the table lock, so a racing acquire either waits on
        // this slot or creates a fresh one, never both.
        self.guard.take();
    }
}
