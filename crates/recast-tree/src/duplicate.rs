//! Deep duplication with an optional terminus.

use smallvec::SmallVec;

use crate::node::{Item, NodeData};
use crate::refs::NodeRef;
use crate::tree::Tree;

/// Where to stop duplicating and what to put there instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Terminus {
    /// Node in the source tree that is not duplicated.
    pub at: NodeRef,
    /// Node placed where `at` was.
    pub replacement: NodeRef,
}

impl Tree {
    /// Duplicate everything under `source`.
    ///
    /// Identifiers are shared, never copied, so uses keep pointing at their
    /// declaration. When a terminus is given, reaching `terminus.at` splices
    /// in `terminus.replacement` instead of recursing.
    ///
    /// # Panics
    ///
    /// Panics if a duplicated node has an unset child.
    pub fn duplicate_subtree(&mut self, source: NodeRef, terminus: Option<Terminus>) -> NodeRef {
        if let Some(t) = terminus
            && t.at == source
        {
            return t.replacement;
        }
        if self.is_identifier(source) {
            return source;
        }

        let NodeData {
            kind,
            payload,
            items,
        } = self.node(source).clone();
        let schema = kind.schema();
        let mut new_items = SmallVec::new();
        for (index, item) in items.into_iter().enumerate() {
            new_items.push(match item {
                Item::Single(Some(child)) => {
                    Item::Single(Some(self.duplicate_subtree(child, terminus)))
                }
                Item::Single(None) => panic!(
                    "invariant violation: duplicating {kind} {source} with unset item `{}`",
                    schema[index].name
                ),
                Item::Sequence(elems) => Item::Sequence(
                    elems
                        .into_iter()
                        .map(|e| self.duplicate_subtree(e, terminus))
                        .collect(),
                ),
                Item::Collection(elems) => Item::Collection(
                    elems
                        .into_iter()
                        .map(|e| self.duplicate_subtree(e, terminus))
                        .collect(),
                ),
            });
        }
        self.create(NodeData {
            kind,
            payload,
            items: new_items,
        })
    }
}
