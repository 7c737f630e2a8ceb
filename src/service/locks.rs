use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

/// A table of mutexes, one per key.
///
/// Holding the slot of a key serializes every read-modify-write performed on
/// that key. Callers that take several slots must take them in a fixed order
/// (user before loan) to stay deadlock-free.
///
/// # Examples
///
/// ```
/// use billing_engine::service::locks::KeyedLocks;
/// use std::sync::PoisonError;
///
/// let locks: KeyedLocks<u64> = KeyedLocks::new();
/// let slot = locks.slot(&7);
/// let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
/// assert_eq!(locks.len(), 1);
/// ```
#[derive(Debug)]
pub struct KeyedLocks<K> {
    table: Mutex<SlotTable<K>>,
}

#[derive(Debug)]
struct SlotTable<K> {
    slots: HashMap<K, Arc<Mutex<()>>>,
    prune_at: usize,
}

/// Table size at which idle slots are first swept.
const MIN_PRUNE_AT: usize = 64;

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            table: Mutex::new(SlotTable {
                slots: HashMap::new(),
                prune_at: MIN_PRUNE_AT,
            }),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `key`, created on first use.
    ///
    /// Once the table grows past its high-water mark, slots nobody holds are
    /// dropped. Slots are only cloned under the table lock, so a strong count
    /// of one means no caller has it.
    pub fn slot(&self, key: &K) -> Arc<Mutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table.slots.len() >= table.prune_at {
            table.slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            table.prune_at = (table.slots.len() * 2).max(MIN_PRUNE_AT);
        }
        Arc::clone(table.slots.entry(key.clone()).or_default())
    }

    /// Number of slots currently in the table.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
