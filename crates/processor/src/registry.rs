//! Lazily populated per-consumer resource map.
//!
//! Readers load an immutable snapshot and never block. Writers serialize on
//! an insert lock, re-check, and publish a new snapshot containing the added
//! entry. Published entries are never replaced, so an `Arc` handed out for a
//! consumer stays the consumer's resource until [`ConsumerRegistry::drain`].

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use vpp_common::types::ConsumerId;

type Snapshot<T> = HashMap<ConsumerId, Arc<T>>;

pub struct ConsumerRegistry<T> {
    entries: ArcSwap<Snapshot<T>>,
    insert_lock: Mutex<()>,
}

impl<T> ConsumerRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(HashMap::new()),
            insert_lock: Mutex::new(()),
        }
    }

    /// Lock-free lookup.
    pub fn get(&self, consumer: &str) -> Option<Arc<T>> {
        self.entries.load().get(consumer).cloned()
    }

    /// Return the entry for `consumer`, creating it with `create` on first use.
    ///
    /// `create` runs at most once per consumer, under the insert lock. If it
    /// fails nothing is published and the next call tries again.
    pub fn get_or_create<E, F>(&self, consumer: &str, create: F) -> Result<Arc<T>, E>
    where
        F: FnOnce(&ConsumerId) -> Result<T, E>,
    {
        if let Some(existing) = self.get(consumer) {
            return Ok(existing);
        }

        let _guard = self.insert_lock.lock();
        let current = self.entries.load_full();
        if let Some(existing) = current.get(consumer) {
            return Ok(Arc::clone(existing));
        }

        let id = ConsumerId::new(consumer);
        let entry = Arc::new(create(&id)?);
        let mut next: Snapshot<T> = (*current).clone();
        next.insert(id, Arc::clone(&entry));
        self.entries.store(Arc::new(next));
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    /// Remove every entry, returned sorted by consumer id.
    pub fn drain(&self) -> Vec<(ConsumerId, Arc<T>)> {
        let _guard = self.insert_lock.lock();
        let taken = self.entries.swap(Arc::new(HashMap::new()));
        let mut entries: Vec<_> = taken
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(entry)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl<T> Default for ConsumerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ConsumerRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerRegistry")
            .field("len", &self.len())
            .finish()
    }
}
