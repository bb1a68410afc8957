/// A peer/node in the distributed system.
///
/// The table treats contacts as opaque apart from their identifier; callers can store
/// arbitrarily rich peer types (addresses, keys, latency metadata) as long as they
/// expose the identifier bytes. Identifiers may be of any non-zero length and don't
/// need to share a common width, though in practice they are usually the fixed-width
/// output of a hash.
pub trait Contact {
    /// Unique identifier of the contact, typically a hash of a unique attribute.
    ///
    /// Must not be empty, and must not change while the contact is stored in a table.
    fn id(&self) -> &[u8];
}

/// Bare identifiers can be stored directly, which is convenient when no per-peer
/// metadata is needed.
impl Contact for Vec<u8> {
    fn id(&self) -> &[u8] {
        self
    }
}
