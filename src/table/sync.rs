use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    error::Error,
    table::{Insert, KBucket},
    traits::Contact,
};

/// A cloneable, thread-safe handle to a [`KBucket`].
///
/// The whole trie sits behind one table-wide reader/writer lock: read-only calls take
/// a shared lock, mutating calls an exclusive one, so the trie shape is never
/// observed mid-split. The lock is deliberately coarse; per-node locking would need
/// hand-over-hand acquisition during descent for no benefit at k-bucket scale.
///
/// Enumerating methods return materialised snapshots taken under the read lock, never
/// live views, and no method holds a lock once it returns. In particular a
/// [`PingEvent`](crate::PingEvent) is handed back after the write lock is released,
/// so its consumer is free to run network liveness checks and call straight back into
/// [`remove`](Self::remove)/[`add`](Self::add) without deadlocking.
#[derive(Debug, Default, Clone)]
pub struct SyncKBucket<C> {
    table: Arc<RwLock<KBucket<C>>>,
}

impl<C> SyncKBucket<C> {
    /// Creates a new shared table; see [`KBucket::new`].
    pub fn new(local_id: impl Into<Vec<u8>>, capacity: usize) -> Self {
        Self {
            table: Arc::new(RwLock::new(KBucket::new(local_id, capacity))),
        }
    }

    /// Sets the number of stale candidates offered per eviction event.
    pub fn with_nodes_to_ping(self, nodes_to_ping: usize) -> Self {
        self.table.write().nodes_to_ping = nodes_to_ping;
        self
    }

    /// Returns the table's local identifier.
    pub fn local_id(&self) -> Vec<u8> {
        self.table.read().local_id().to_vec()
    }

    /// Returns the maximum number of contacts per bucket.
    pub fn capacity(&self) -> usize {
        self.table.read().capacity()
    }

    /// Returns the total number of contacts across all buckets.
    pub fn count(&self) -> usize {
        self.table.read().count()
    }

    /// Returns `true` if no contacts are stored.
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    /// Removes every contact and resets the trie to a single empty bucket.
    pub fn clear(&self) {
        self.table.write().clear()
    }
}

impl<C: Contact> SyncKBucket<C> {
    /// Adds or refreshes a contact; see [`KBucket::add`].
    pub fn add(&self, contact: C) -> Result<Insert<C>, Error>
    where
        C: Clone,
    {
        self.table.write().add(contact)
    }

    /// Removes the contact with the given identifier, returning `true` if it was
    /// stored.
    pub fn remove(&self, id: &[u8]) -> bool {
        self.table.write().remove(id)
    }

    /// Returns `true` if a contact with the given identifier is stored.
    pub fn contains(&self, id: &[u8]) -> bool {
        self.table.read().contains(id)
    }

    /// Returns a copy of the contact with the given identifier, if stored.
    pub fn get(&self, id: &[u8]) -> Option<C>
    where
        C: Clone,
    {
        self.table.read().get(id).cloned()
    }

    /// Returns a snapshot of every stored contact, in trie order.
    pub fn contacts(&self) -> Vec<C>
    where
        C: Clone,
    {
        self.table.read().contacts().into_iter().cloned().collect()
    }

    /// Returns a snapshot of all stored contacts ordered by XOR distance to
    /// `target`, nearest first; see [`KBucket::closest`].
    pub fn closest(&self, target: &[u8]) -> Vec<C>
    where
        C: Clone,
    {
        self.table.read().closest(target).into_iter().cloned().collect()
    }
}
