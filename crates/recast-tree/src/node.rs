//! Node payloads and the generic itemisation of children.

use smallvec::SmallVec;

use crate::kind::{ItemShape, Kind, PayloadShape};
use crate::refs::NodeRef;
use crate::symbol::Symbol;

/// Operator carried by a `Binary` node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Less,
    Equal,
    And,
    Or,
}

impl BinaryOp {
    pub fn token(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Less => "<",
            BinaryOp::Equal => "==",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Non-child data of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Payload {
    #[default]
    None,
    Name(Symbol),
    Integer(i64),
    Operator(BinaryOp),
}

impl Payload {
    pub fn shape(&self) -> PayloadShape {
        match self {
            Payload::None => PayloadShape::None,
            Payload::Name(_) => PayloadShape::Name,
            Payload::Integer(_) => PayloadShape::Integer,
            Payload::Operator(_) => PayloadShape::Operator,
        }
    }
}

/// Elements of a container item.
pub type Elements = SmallVec<[NodeRef; 4]>;

/// One entry of a node's itemisation.
///
/// A `Single(None)` is an unset child. It may exist while a tree is being
/// assembled but never in a finalized program tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    Single(Option<NodeRef>),
    Sequence(Elements),
    Collection(Elements),
}

impl Item {
    /// Empty item of the given shape.
    pub fn empty(shape: ItemShape) -> Self {
        match shape {
            ItemShape::Single => Item::Single(None),
            ItemShape::Sequence => Item::Sequence(SmallVec::new()),
            ItemShape::Collection => Item::Collection(SmallVec::new()),
        }
    }

    pub fn shape(&self) -> ItemShape {
        match self {
            Item::Single(_) => ItemShape::Single,
            Item::Sequence(_) => ItemShape::Sequence,
            Item::Collection(_) => ItemShape::Collection,
        }
    }

    /// Children of this item in order; a single child is a one-element slice.
    pub fn elements(&self) -> &[NodeRef] {
        match self {
            Item::Single(child) => child.as_slice(),
            Item::Sequence(elems) | Item::Collection(elems) => elems,
        }
    }
}

/// Data for a single node in the arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeData {
    pub kind: Kind,
    pub payload: Payload,
    pub items: SmallVec<[Item; 4]>,
}

/// Builder for [`NodeData`], addressing items by their schema name.
///
/// Items that are not set stay empty: a single item stays unset, a
/// container stays empty.
pub struct NodeDataBuilder {
    kind: Kind,
    payload: Payload,
    items: SmallVec<[Item; 4]>,
}

impl NodeDataBuilder {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            payload: Payload::None,
            items: kind
                .schema()
                .iter()
                .map(|spec| Item::empty(spec.shape))
                .collect(),
        }
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn child(mut self, name: &str, child: NodeRef) -> Self {
        let index = self.index(name, ItemShape::Single);
        self.items[index] = Item::Single(Some(child));
        self
    }

    pub fn sequence(mut self, name: &str, elems: impl IntoIterator<Item = NodeRef>) -> Self {
        let index = self.index(name, ItemShape::Sequence);
        self.items[index] = Item::Sequence(elems.into_iter().collect());
        self
    }

    pub fn collection(mut self, name: &str, elems: impl IntoIterator<Item = NodeRef>) -> Self {
        let index = self.index(name, ItemShape::Collection);
        self.items[index] = Item::Collection(elems.into_iter().collect());
        self
    }

    pub fn build(self) -> NodeData {
        NodeData {
            kind: self.kind,
            payload: self.payload,
            items: self.items,
        }
    }

    fn index(&self, name: &str, shape: ItemShape) -> usize {
        let index = self
            .kind
            .item_index(name)
            .unwrap_or_else(|| panic!("{} has no item named `{name}`", self.kind));
        assert_eq!(
            self.kind.schema()[index].shape,
            shape,
            "item `{name}` of {} has a different shape",
            self.kind
        );
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_follow_schema() {
        let data = NodeDataBuilder::new(Kind::Compound).build();
        assert_eq!(data.items.len(), 2);
        assert_eq!(data.items[0].shape(), ItemShape::Collection);
        assert_eq!(data.items[1].shape(), ItemShape::Sequence);
        assert!(data.items.iter().all(|item| item.elements().is_empty()));
    }

    #[test]
    #[should_panic(expected = "has no item named `nope`")]
    fn builder_rejects_unknown_item() {
        let _ = NodeDataBuilder::new(Kind::If).child("nope", NodeRef::from_u32(0));
    }
}
