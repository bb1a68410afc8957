//! The XOR closeness metric over contact identifiers.

use std::cmp::Ordering;

/// The XOR distance between two identifiers.
///
/// Conceptually this is the big-endian integer obtained by XORing the two identifiers
/// byte by byte. It is kept as a byte vector rather than a fixed-width integer so the
/// ordering holds for identifiers of any length (a 20-byte hash id already overflows a
/// `u64`). Comparisons ignore leading zero bytes, i.e. they compare numeric magnitude.
#[derive(Debug, Clone)]
pub struct Distance(Vec<u8>);

/// Computes the XOR distance between two identifiers.
///
/// If the identifiers differ in length, each position missing from the shorter one is
/// treated as a maximal mismatch (`0xFF`) rather than ignored, so ids of different
/// widths never alias.
pub fn distance(a: &[u8], b: &[u8]) -> Distance {
    let len = a.len().max(b.len());
    let mut bytes = Vec::with_capacity(len);

    for i in 0..len {
        match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) => bytes.push(x ^ y),
            _ => bytes.push(0xff),
        }
    }

    Distance(bytes)
}

impl Distance {
    /// Returns `true` if the distance is zero, i.e. the identifiers were equal.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&byte| byte == 0)
    }

    /// The raw big-endian XOR bytes, leading zeros included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    // The numerically significant suffix.
    fn magnitude(&self) -> &[u8] {
        let start = self.0.iter().position(|&byte| byte != 0).unwrap_or(self.0.len());
        &self.0[start..]
    }
}

impl From<u128> for Distance {
    /// Convenience for writing small distances as literals.
    fn from(raw: u128) -> Self {
        Distance(raw.to_be_bytes().to_vec())
    }
}

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.magnitude() == other.magnitude()
    }
}

impl Eq for Distance {}

impl Ord for Distance {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = self.magnitude();
        let b = other.magnitude();

        // With leading zeros stripped, a longer byte string is a larger number; equal
        // lengths compare lexicographically, which is big-endian numeric order.
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
