//! Per-key mutual exclusion.
//!
//! One async mutex per key, created on first use and reclaimed when the last
//! holder or waiter for that key goes away. Different keys never contend.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Slot>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free and hold it until the guard drops.
    ///
    /// Dropping the returned future while it waits releases the slot the
    /// same way dropping the guard does.
    pub async fn lock(&self, key: K) -> KeyedLockGuard<'_, K> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(key.clone()).or_default().clone()
        };
        let slot = SlotRef {
            owner: self,
            key,
            slot,
        };

        let guard = slot.slot.clone().lock_owned().await;

        KeyedLockGuard { _guard: guard, _slot: slot }
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// One holder's or waiter's reference to a key's slot.
#[derive(Debug)]
struct SlotRef<'a, K>
where
    K: Clone + Eq + Hash,
{
    owner: &'a KeyedLocks<K>,
    key: K,
    slot: Slot,
}

impl<K> Drop for SlotRef<'_, K>
where
    K: Clone + Eq + Hash,
{
    fn drop(&mut self) {
        let mut slots = self
            .owner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Remaining refs: the map entry and `self.slot`. Anything above that is
        // another holder or waiter, so the entry must stay. New refs are only
        // taken under the map lock held here.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
    }
}

/// Exclusive hold on one key.
///
/// Fields drop in order: the mutex is released before the slot is checked
/// for reclamation.
#[derive(Debug)]
pub struct KeyedLockGuard<'a, K>
where
    K: Clone + Eq + Hash,
{
    _guard: OwnedMutexGuard<()>,
    _slot: SlotRef<'a, K>,
}
