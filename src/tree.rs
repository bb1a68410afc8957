//! The binary trie backing the routing table.

use std::mem;

use tracing::debug;

use crate::traits::Contact;

/// The branch an identifier selects at one trie depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Branch {
    Left,
    Right,
}

/// Returns the branch `id` belongs to at `bit_index`.
///
/// Bit 0 is the most significant bit of byte 0 and numbering is MSB-first within each
/// byte. Identifiers shorter than the bit position being tested route left; that is a
/// policy choice for mixing identifier widths in one table, not a requirement of the
/// metric.
pub(crate) fn branch_for(id: &[u8], bit_index: usize) -> Branch {
    let byte_index = bit_index / 8;
    let bit_in_byte = bit_index % 8;

    match id.get(byte_index) {
        Some(byte) if byte & (1 << (7 - bit_in_byte)) != 0 => Branch::Right,
        _ => Branch::Left,
    }
}

/// A node in the trie: either a bucket of contacts or an interior fork.
///
/// A leaf with `dont_split` set is frozen: it sits on the far side of the local
/// identifier and keeps its current granularity even when full.
#[derive(Debug, Clone)]
pub(crate) enum Node<C> {
    Leaf {
        // Insertion order is preserved; the oldest contacts sit at the head and are
        // the first eviction candidates offered when the leaf is full and frozen.
        contacts: Vec<C>,
        dont_split: bool,
    },
    Inner {
        left: Box<Node<C>>,
        right: Box<Node<C>>,
    },
}

impl<C> Node<C> {
    /// A fresh, splittable, empty leaf.
    pub(crate) fn leaf() -> Self {
        Node::Leaf {
            contacts: Vec::new(),
            dont_split: false,
        }
    }

    /// Total number of contacts stored beneath this node.
    pub(crate) fn deep_count(&self) -> usize {
        match self {
            Node::Leaf { contacts, .. } => contacts.len(),
            Node::Inner { left, right } => left.deep_count() + right.deep_count(),
        }
    }

    /// Appends every contact beneath this node to `out`, leftmost leaf first and in
    /// insertion order within each leaf.
    pub(crate) fn collect<'a>(&'a self, out: &mut Vec<&'a C>) {
        match self {
            Node::Leaf { contacts, .. } => out.extend(contacts.iter()),
            Node::Inner { left, right } => {
                left.collect(out);
                right.collect(out);
            }
        }
    }
}

impl<C: Contact> Node<C> {
    /// Converts this leaf into an interior fork at trie depth `bit_index`.
    ///
    /// The leaf's contacts are redistributed into two new leaves by their bit at
    /// `bit_index`; the new leaf on the side `local_id` does not select is frozen.
    /// Must only be called on a leaf that isn't frozen.
    pub(crate) fn split(&mut self, local_id: &[u8], bit_index: usize) {
        let contacts = match self {
            Node::Leaf {
                contacts,
                dont_split,
            } => {
                debug_assert!(!*dont_split);
                mem::take(contacts)
            }
            Node::Inner { .. } => {
                debug_assert!(false, "split called on an interior node");
                return;
            }
        };

        debug!(depth = bit_index, contacts = contacts.len(), "splitting bucket");

        let mut left = Vec::new();
        let mut right = Vec::new();
        for contact in contacts {
            match branch_for(contact.id(), bit_index) {
                Branch::Left => left.push(contact),
                Branch::Right => right.push(contact),
            }
        }

        let near = branch_for(local_id, bit_index);

        *self = Node::Inner {
            left: Box::new(Node::Leaf {
                contacts: left,
                dont_split: near == Branch::Right,
            }),
            right: Box::new(Node::Leaf {
                contacts: right,
                dont_split: near == Branch::Left,
            }),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_determination() {
        assert_eq!(branch_for(&[0x00], 0), Branch::Left);
        assert_eq!(branch_for(&[0x40], 0), Branch::Left);
        assert_eq!(branch_for(&[0x40], 1), Branch::Right);
        assert_eq!(branch_for(&[0x40], 2), Branch::Left);
        assert_eq!(branch_for(&[0x41], 7), Branch::Right);
        assert_eq!(branch_for(&[0x41, 0x00], 7), Branch::Right);
        assert_eq!(branch_for(&[0x00, 0x41, 0x00], 15), Branch::Right);
    }

    #[test]
    fn short_ids_route_left() {
        // Bit 9 is past the end of a one-byte id.
        assert_eq!(branch_for(&[0x40], 9), Branch::Left);
        assert_eq!(branch_for(&[0xff], 8), Branch::Left);
        assert_eq!(branch_for(&[], 0), Branch::Left);
    }

    #[test]
    fn split_redistributes_and_freezes_far_leaf() {
        let mut node: Node<Vec<u8>> = Node::Leaf {
            contacts: vec![vec![0x00], vec![0x80], vec![0x7f], vec![0xc1]],
            dont_split: false,
        };

        // Local id starts with a zero bit, so the right child is the far one.
        node.split(&[0x00], 0);

        match node {
            Node::Inner { left, right } => match (*left, *right) {
                (
                    Node::Leaf {
                        contacts: l,
                        dont_split: l_frozen,
                    },
                    Node::Leaf {
                        contacts: r,
                        dont_split: r_frozen,
                    },
                ) => {
                    assert_eq!(l, vec![vec![0x00], vec![0x7f]]);
                    assert_eq!(r, vec![vec![0x80], vec![0xc1]]);
                    assert!(!l_frozen);
                    assert!(r_frozen);
                }
                _ => panic!("split children should be leaves"),
            },
            Node::Leaf { .. } => panic!("split should produce an interior node"),
        }
    }

    #[test]
    fn deep_count_and_collect() {
        let mut node: Node<Vec<u8>> = Node::leaf();
        assert_eq!(node.deep_count(), 0);

        node = Node::Leaf {
            contacts: vec![vec![0x01], vec![0x81], vec![0x02]],
            dont_split: false,
        };
        node.split(&[0x00], 0);

        assert_eq!(node.deep_count(), 3);

        let mut all = Vec::new();
        node.collect(&mut all);
        // Leftmost leaf first, insertion order within the leaf.
        assert_eq!(all, vec![&vec![0x01], &vec![0x02], &vec![0x81]]);
    }
}
