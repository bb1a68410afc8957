use thiserror::Error;

/// Errors returned by table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The contact's identifier is empty. Identifiers must carry at least one byte;
    /// supplying an empty one is a usage error, and the table is left unchanged.
    #[error("contact identifier must not be empty")]
    EmptyId,

    /// Trie descent ran past the bit-length of the identifiers involved.
    ///
    /// Distinct identifiers of equal length always diverge within their bit-length,
    /// so this can only be hit by identifiers of different lengths that agree on
    /// every bit of the shorter one. The bound keeps descent terminating instead of
    /// splitting forever.
    #[error("routing trie depth exceeded the identifier bit-length")]
    MaxDepth,
}
