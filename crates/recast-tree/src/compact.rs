//! Copying the live part of an arena into a fresh one.

use std::collections::HashMap;

use crate::node::{Item, NodeData};
use crate::refs::NodeRef;
use crate::tree::Tree;

impl Tree {
    /// A new arena holding only what is reachable from `root`, and the
    /// root's ref in it.
    ///
    /// Rewrites never free nodes: every splice leaves the superseded region
    /// behind, so a long run grows the arena with dead copies. Compacting
    /// drops them. Shared identifiers stay shared. Every `NodeRef` into the
    /// old arena is meaningless for the new one.
    pub fn compact(&self, root: NodeRef) -> (Tree, NodeRef) {
        let mut out = Tree::new();
        let mut moved = HashMap::new();
        let root = self.copy_live(root, &mut out, &mut moved);
        tracing::debug!("compacted {} nodes down to {}", self.len(), out.len());
        (out, root)
    }

    fn copy_live(
        &self,
        node: NodeRef,
        out: &mut Tree,
        moved: &mut HashMap<NodeRef, NodeRef>,
    ) -> NodeRef {
        if let Some(&new) = moved.get(&node) {
            return new;
        }
        let NodeData {
            kind,
            payload,
            items,
        } = self.node(node);
        let items = items
            .iter()
            .map(|item| match item {
                Item::Single(child) => Item::Single(child.map(|c| self.copy_live(c, out, moved))),
                Item::Sequence(elems) => Item::Sequence(
                    elems.iter().map(|&e| self.copy_live(e, out, moved)).collect(),
                ),
                Item::Collection(elems) => Item::Collection(
                    elems.iter().map(|&e| self.copy_live(e, out, moved)).collect(),
                ),
            })
            .collect();
        let new = out.create(NodeData {
            kind: *kind,
            payload: *payload,
            items,
        });
        moved.insert(node, new);
        new
    }
}
