//! A Kademlia k-bucket routing table for storing contact (peer node) information.
//!
//! Contacts are kept in a binary trie of capacity-bounded buckets, organised by the
//! bit-prefix of their identifier. Buckets on the local identifier's side of the trie
//! split as they fill, keeping nearby peers fine-grained; buckets on the far side are
//! frozen at their current granularity once established, bounding the size of the
//! table. Closeness is the XOR metric over identifier bytes.
//!
//! The table performs no network I/O. When a contact can't be inserted because its
//! bucket is full and frozen, [`KBucket::add`] hands back a [`PingEvent`] listing the
//! oldest contacts in that bucket; the caller is expected to liveness-check them and
//! call [`KBucket::remove`] for any that fail before retrying the insertion. Nothing
//! is evicted on suspicion alone.
//!
//! [`KBucket`] is the plain single-owner table; [`SyncKBucket`] wraps it in a
//! table-wide reader/writer lock for use from multiple threads.

pub mod distance;
mod error;
mod table;
mod traits;
mod tree;

pub use crate::{
    distance::{distance, Distance},
    error::Error,
    table::{Insert, KBucket, PingEvent, SyncKBucket},
    traits::Contact,
};
