//! Entity references into the node arena.

use cranelift_entity::entity_impl;

/// Reference to a node in a [`Tree`](crate::Tree).
///
/// Identity equality of nodes is equality of their `NodeRef`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u32);
entity_impl!(NodeRef, "node");
