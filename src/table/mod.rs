//! Core routing table implementation.

use std::iter;

use rand::{thread_rng, Rng};
use tracing::debug;

use crate::{
    distance::distance,
    error::Error,
    traits::Contact,
    tree::{branch_for, Branch, Node},
};

mod sync;

pub use sync::SyncKBucket;

/// The default maximum number of contacts per bucket (the "k" of Kademlia).
const K: usize = 20;

/// The default number of stale candidates offered per eviction event.
const NODES_TO_PING: usize = 3;

/// The width of a generated local identifier, in bytes.
const DEFAULT_ID_BYTES: usize = 20;

/// The outcome of an [`add`](KBucket::add).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insert<C> {
    /// The contact was appended to its bucket.
    Added,
    /// A contact with the same identifier was already stored; its bucket position
    /// was refreshed to most-recently-seen (the tail).
    Refreshed,
    /// The responsible bucket is full and frozen. The contact was *not* stored; the
    /// caller should resolve the returned [`PingEvent`] and may then retry.
    Pending(PingEvent<C>),
}

/// A request to liveness-check the oldest contacts of a full, frozen bucket.
///
/// Returned by value from [`KBucket::add`] rather than delivered through a callback,
/// so no table lock is held while the caller performs network pings. If any of the
/// `candidates` fails its check, [`remove`](KBucket::remove) it and re-`add` the
/// rejected `contact`; if all candidates respond, the new contact is simply dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingEvent<C> {
    /// The new contact that could not be inserted.
    pub contact: C,
    /// The oldest contacts of the full bucket, oldest first.
    pub candidates: Vec<C>,
}

/// A Kademlia k-bucket routing table.
///
/// Contacts are stored in the leaves of a binary trie indexed by identifier
/// bit-prefix. Each leaf holds at most `capacity` contacts; a full leaf on the local
/// identifier's side of the trie splits in two, while a full leaf on the far side is
/// frozen and negotiates evictions through [`PingEvent`]s instead.
///
/// This type is single-owner and does no locking; wrap it in [`SyncKBucket`] to share
/// it between threads.
#[derive(Debug, Clone)]
pub struct KBucket<C> {
    root: Node<C>,
    // Used only to decide which side of a split stays splittable.
    local_id: Vec<u8>,
    capacity: usize,
    nodes_to_ping: usize,
}

impl<C> Default for KBucket<C> {
    fn default() -> Self {
        let mut bytes = [0u8; DEFAULT_ID_BYTES];
        thread_rng().fill(&mut bytes[..]);

        Self {
            root: Node::leaf(),
            local_id: bytes.to_vec(),
            capacity: K,
            nodes_to_ping: NODES_TO_PING,
        }
    }
}

impl<C> KBucket<C> {
    /// Creates a new table.
    ///
    /// `local_id` is the table owner's own identifier; it only determines which side
    /// of each split remains splittable and is never stored as a contact.
    pub fn new(local_id: impl Into<Vec<u8>>, capacity: usize) -> Self {
        Self {
            root: Node::leaf(),
            local_id: local_id.into(),
            capacity,
            nodes_to_ping: NODES_TO_PING,
        }
    }

    /// Sets the number of stale candidates offered per [`PingEvent`].
    pub fn with_nodes_to_ping(mut self, nodes_to_ping: usize) -> Self {
        self.nodes_to_ping = nodes_to_ping;
        self
    }

    /// Returns this table's local identifier.
    pub fn local_id(&self) -> &[u8] {
        &self.local_id
    }

    /// Returns the maximum number of contacts per bucket.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the total number of contacts across all buckets.
    pub fn count(&self) -> usize {
        self.root.deep_count()
    }

    /// Returns `true` if no contacts are stored.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Removes every contact and resets the trie to a single empty bucket.
    pub fn clear(&mut self) {
        self.root = Node::leaf();
    }
}

impl<C: Contact> KBucket<C> {
    /// Adds a contact, or refreshes it if its identifier is already stored.
    ///
    /// The duplicate policy is most-recently-seen: a re-added contact moves to the
    /// tail of its bucket, taking it out of the eviction-candidate window at the
    /// head. If the responsible bucket is full and splittable it is split and the
    /// insertion retried; if it is full and frozen, the contact is handed back in an
    /// [`Insert::Pending`] for the caller to negotiate an eviction.
    ///
    /// Contacts with an empty identifier are rejected with [`Error::EmptyId`].
    pub fn add(&mut self, contact: C) -> Result<Insert<C>, Error>
    where
        C: Clone,
    {
        if contact.id().is_empty() {
            return Err(Error::EmptyId);
        }

        Self::add_to(
            &mut self.root,
            contact,
            0,
            &self.local_id,
            self.capacity,
            self.nodes_to_ping,
        )
    }

    fn add_to(
        node: &mut Node<C>,
        contact: C,
        bit_index: usize,
        local_id: &[u8],
        capacity: usize,
        nodes_to_ping: usize,
    ) -> Result<Insert<C>, Error>
    where
        C: Clone,
    {
        match node {
            Node::Inner { left, right } => {
                let child = match branch_for(contact.id(), bit_index) {
                    Branch::Left => left,
                    Branch::Right => right,
                };

                return Self::add_to(
                    child,
                    contact,
                    bit_index + 1,
                    local_id,
                    capacity,
                    nodes_to_ping,
                );
            }
            Node::Leaf {
                contacts,
                dont_split,
            } => {
                if let Some(i) = contacts.iter().position(|c| c.id() == contact.id()) {
                    contacts.remove(i);
                    contacts.push(contact);

                    return Ok(Insert::Refreshed);
                }

                if contacts.len() < capacity {
                    contacts.push(contact);

                    return Ok(Insert::Added);
                }

                if *dont_split {
                    // Hand the decision to the caller: the oldest contacts are the
                    // ones to liveness-check, and nothing is evicted until one of
                    // them is confirmed dead.
                    let candidates: Vec<C> =
                        contacts.iter().take(nodes_to_ping).cloned().collect();

                    debug!(
                        depth = bit_index,
                        candidates = candidates.len(),
                        "bucket full and frozen, deferring to eviction check"
                    );

                    return Ok(Insert::Pending(PingEvent {
                        contact,
                        candidates,
                    }));
                }

                // Splitting past the bit-length of the ids involved would recurse
                // forever; distinct ids that agree on every representable bit can't
                // be separated by the trie.
                let max_bits = contacts
                    .iter()
                    .map(|c| c.id().len())
                    .chain(iter::once(contact.id().len()))
                    .max()
                    .unwrap_or(0)
                    * 8;
                if bit_index >= max_bits {
                    return Err(Error::MaxDepth);
                }
            }
        }

        // The leaf is full but splittable: split it at this depth and retry, which
        // descends one level further into the new fork.
        node.split(local_id, bit_index);
        Self::add_to(node, contact, bit_index, local_id, capacity, nodes_to_ping)
    }

    /// Removes the contact with the given identifier, returning `true` if it was
    /// stored. The relative order of the remaining contacts is preserved, and the
    /// trie shape is untouched; splits are never undone.
    pub fn remove(&mut self, id: &[u8]) -> bool {
        let mut node = &mut self.root;
        let mut bit_index = 0;

        loop {
            match node {
                Node::Inner { left, right } => {
                    node = match branch_for(id, bit_index) {
                        Branch::Left => left,
                        Branch::Right => right,
                    };
                    bit_index += 1;
                }
                Node::Leaf { contacts, .. } => {
                    return match contacts.iter().position(|c| c.id() == id) {
                        Some(i) => {
                            contacts.remove(i);
                            true
                        }
                        None => false,
                    };
                }
            }
        }
    }

    /// Returns `true` if a contact with the given identifier is stored.
    pub fn contains(&self, id: &[u8]) -> bool {
        self.get(id).is_some()
    }

    /// Returns the contact with the given identifier, if stored.
    pub fn get(&self, id: &[u8]) -> Option<&C> {
        self.bucket_of(id).iter().find(|c| c.id() == id)
    }

    /// Returns every stored contact, leftmost bucket first and oldest first within
    /// each bucket.
    pub fn contacts(&self) -> Vec<&C> {
        let mut all = Vec::with_capacity(self.count());
        self.root.collect(&mut all);

        all
    }

    /// Returns all stored contacts ordered by XOR distance to `target`, nearest
    /// first.
    ///
    /// The sort is stable: contacts at equal distance (possible only between
    /// identifiers of different lengths) keep their enumeration order. K-bucket
    /// tables are bounded by `capacity × O(id bit-length)` contacts, so the full
    /// scan-and-sort is cheap at the intended scale; callers wanting the usual "k
    /// closest" simply truncate the result.
    pub fn closest(&self, target: &[u8]) -> Vec<&C> {
        let mut contacts = self.contacts();
        contacts.sort_by_cached_key(|c| distance(c.id(), target));

        contacts
    }

    // Descends to the bucket responsible for `id`.
    fn bucket_of(&self, id: &[u8]) -> &[C] {
        let mut node = &self.root;
        let mut bit_index = 0;

        loop {
            match node {
                Node::Inner { left, right } => {
                    node = match branch_for(id, bit_index) {
                        Branch::Left => left,
                        Branch::Right => right,
                    };
                    bit_index += 1;
                }
                Node::Leaf { contacts, .. } => return contacts,
            }
        }
    }
}
