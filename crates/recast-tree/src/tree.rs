//! Tree: arena storage for program nodes.
//!
//! All nodes live in a `PrimaryMap` owned by `Tree` and refer to their
//! children by [`NodeRef`]. Nodes are never edited in place once they are
//! part of a finalized program: a rewrite produces new nodes and replaces
//! the pointer that held the old one.
//!
//! Nothing is ever freed, so superseded nodes accumulate across rewrites.
//! [`Tree::compact`] copies the live tree into a fresh arena.

use cranelift_entity::PrimaryMap;

use crate::kind::{ItemShape, Kind};
use crate::node::{Elements, Item, NodeData, Payload};
use crate::refs::NodeRef;
use crate::symbol::Symbol;

/// Arena of program nodes.
#[derive(Default)]
pub struct Tree {
    nodes: PrimaryMap<NodeRef, NodeData>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node.
    ///
    /// # Panics
    ///
    /// Panics if the node is abstract or its items or payload do not follow
    /// the schema of its kind. A node that cannot be itemised correctly is
    /// an invariant violation, not a recoverable error.
    pub fn create(&mut self, data: NodeData) -> NodeRef {
        check_schema(&data);
        self.nodes.push(data)
    }

    /// Number of nodes ever allocated, reachable or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, node: NodeRef) -> &NodeData {
        &self.nodes[node]
    }

    pub fn kind(&self, node: NodeRef) -> Kind {
        self.nodes[node].kind
    }

    pub fn payload(&self, node: NodeRef) -> Payload {
        self.nodes[node].payload
    }

    /// Name of an identifier node.
    pub fn name(&self, node: NodeRef) -> Option<Symbol> {
        match self.nodes[node].payload {
            Payload::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_identifier(&self, node: NodeRef) -> bool {
        self.kind(node).is_a(Kind::Identifier)
    }

    /// The node's itemisation, in declared field order.
    pub fn items(&self, node: NodeRef) -> &[Item] {
        &self.nodes[node].items
    }

    /// Item addressed by schema name.
    pub fn item(&self, node: NodeRef, name: &str) -> &Item {
        let index = self.item_index(node, name);
        &self.nodes[node].items[index]
    }

    /// Child held by a single item.
    pub fn child(&self, node: NodeRef, name: &str) -> Option<NodeRef> {
        match self.item(node, name) {
            Item::Single(child) => *child,
            other => panic!(
                "item `{name}` of {} is a {:?}, not a single child",
                self.kind(node),
                other.shape()
            ),
        }
    }

    /// Elements of any item; a single item yields zero or one element.
    pub fn elements(&self, node: NodeRef, name: &str) -> &[NodeRef] {
        self.item(node, name).elements()
    }

    /// Replace the pointer held by a single item.
    pub fn set_child(&mut self, node: NodeRef, name: &str, child: NodeRef) {
        let index = self.item_index(node, name);
        match &mut self.nodes[node].items[index] {
            Item::Single(slot) => *slot = Some(child),
            other => panic!("item `{name}` is a {:?}, not a single child", other.shape()),
        }
    }

    /// Mutable view of a container item.
    pub fn container_mut(&mut self, node: NodeRef, name: &str) -> ContainerMut<'_> {
        let index = self.item_index(node, name);
        match &mut self.nodes[node].items[index] {
            Item::Sequence(elements) => ContainerMut {
                shape: ItemShape::Sequence,
                elements,
            },
            Item::Collection(elements) => ContainerMut {
                shape: ItemShape::Collection,
                elements,
            },
            Item::Single(_) => panic!("item `{name}` is a single child, not a container"),
        }
    }

    /// All children in declared field order.
    pub fn children(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.nodes[node]
            .items
            .iter()
            .flat_map(|item| item.elements().iter().copied())
    }

    fn item_index(&self, node: NodeRef, name: &str) -> usize {
        let kind = self.kind(node);
        kind.item_index(name)
            .unwrap_or_else(|| panic!("{kind} has no item named `{name}`"))
    }
}

/// Mutable access to a sequence or collection.
///
/// For collections, positions are storage order and carry no meaning.
pub struct ContainerMut<'a> {
    shape: ItemShape,
    elements: &'a mut Elements,
}

impl ContainerMut<'_> {
    pub fn shape(&self) -> ItemShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.elements.iter().copied()
    }

    pub fn push(&mut self, node: NodeRef) {
        self.elements.push(node);
    }

    pub fn insert(&mut self, index: usize, node: NodeRef) {
        self.elements.insert(index, node);
    }

    /// Remove the first element identical to `node`.
    pub fn erase(&mut self, node: NodeRef) -> bool {
        match self.elements.iter().position(|&e| e == node) {
            Some(index) => {
                self.elements.remove(index);
                true
            }
            None => false,
        }
    }

    /// Overwrite the element at `index`, returning the old one.
    pub fn overwrite(&mut self, index: usize, node: NodeRef) -> NodeRef {
        std::mem::replace(&mut self.elements[index], node)
    }
}

fn check_schema(data: &NodeData) {
    let kind = data.kind;
    assert!(
        !kind.is_abstract(),
        "invariant violation: abstract kind {kind} cannot be instantiated"
    );
    assert_eq!(
        data.payload.shape(),
        kind.payload_shape(),
        "invariant violation: {kind} carries the wrong payload {:?}",
        data.payload
    );
    let schema = kind.schema();
    assert_eq!(
        data.items.len(),
        schema.len(),
        "invariant violation: {kind} exposes {} items, schema declares {}",
        data.items.len(),
        schema.len()
    );
    for (item, spec) in data.items.iter().zip(schema) {
        assert_eq!(
            item.shape(),
            spec.shape,
            "invariant violation: item `{}` of {kind} has the wrong shape",
            spec.name
        );
    }
}
