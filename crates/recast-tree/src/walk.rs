//! Generic traversal in document order.
//!
//! A walk visits a node, then each item in declared field order, then each
//! element of the item in container order. Identifiers are visited wherever
//! they are referenced, so a shared identifier is visited more than once.

use std::ops::ControlFlow;

use crate::refs::NodeRef;
use crate::tree::Tree;

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into the children.
    Advance,
    /// Skip the children of the current node.
    Skip,
}

/// Walk a node and its descendants.
pub fn walk<B>(
    tree: &Tree,
    node: NodeRef,
    f: &mut dyn FnMut(NodeRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(node) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    for child in tree.children(node) {
        walk(tree, child, f)?;
    }
    ControlFlow::Continue(())
}

/// `node` followed by all of its descendants, in document order.
pub fn descendants(tree: &Tree, node: NodeRef) -> Vec<NodeRef> {
    let mut out = Vec::new();
    let _ = walk::<()>(tree, node, &mut |n| {
        out.push(n);
        ControlFlow::Continue(WalkAction::Advance)
    });
    out
}

/// Find the first node, in document order, satisfying `pred`.
pub fn find(tree: &Tree, node: NodeRef, mut pred: impl FnMut(NodeRef) -> bool) -> Option<NodeRef> {
    match walk(tree, node, &mut |n| {
        if pred(n) {
            ControlFlow::Break(n)
        } else {
            ControlFlow::Continue(WalkAction::Advance)
        }
    }) {
        ControlFlow::Break(n) => Some(n),
        ControlFlow::Continue(()) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Kind;

    #[test]
    fn document_order_follows_field_order() {
        let mut tree = Tree::new();
        let x = tree.instance_identifier("x");
        let y = tree.instance_identifier("y");
        let body = tree.compound([], [y]);
        let else_body = tree.nop();
        let stmt = tree.if_stmt(x, body, else_body);

        assert_eq!(descendants(&tree, stmt), vec![stmt, x, body, y, else_body]);
    }

    #[test]
    fn skip_prunes_children() {
        let mut tree = Tree::new();
        let y = tree.instance_identifier("y");
        let inner = tree.compound([], [y]);
        let outer = tree.compound([], [inner]);

        let mut seen = Vec::new();
        let _ = walk::<()>(&tree, outer, &mut |n| {
            seen.push(n);
            if n == inner {
                ControlFlow::Continue(WalkAction::Skip)
            } else {
                ControlFlow::Continue(WalkAction::Advance)
            }
        });
        assert_eq!(seen, vec![outer, inner]);
    }

    #[test]
    fn find_stops_at_first_match() {
        let mut tree = Tree::new();
        let a = tree.nop();
        let b = tree.nop();
        let block = tree.compound([], [a, b]);
        assert_eq!(find(&tree, block, |n| tree.kind(n) == Kind::Nop), Some(a));
        assert_eq!(find(&tree, block, |n| tree.kind(n) == Kind::Goto), None);
    }
}
