//! Structural equivalence of subtrees.

use crate::node::Item;
use crate::refs::NodeRef;
use crate::tree::Tree;

/// Whether two subtrees are equivalent.
///
/// Identifiers compare by identity: two distinct declarations named `x` are
/// different. Everything else compares by kind, payload and children, with
/// collections compared as multisets.
pub fn simple_compare(tree: &Tree, a: NodeRef, b: NodeRef) -> bool {
    if a == b {
        return true;
    }
    if tree.is_identifier(a) || tree.is_identifier(b) {
        return false;
    }
    let (da, db) = (tree.node(a), tree.node(b));
    if da.kind != db.kind || da.payload != db.payload {
        return false;
    }
    da.items
        .iter()
        .zip(&db.items)
        .all(|(ia, ib)| compare_items(tree, ia, ib))
}

fn compare_items(tree: &Tree, a: &Item, b: &Item) -> bool {
    match (a, b) {
        (Item::Single(Some(x)), Item::Single(Some(y))) => simple_compare(tree, *x, *y),
        (Item::Single(None), Item::Single(None)) => true,
        (Item::Sequence(xs), Item::Sequence(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| simple_compare(tree, *x, *y))
        }
        (Item::Collection(xs), Item::Collection(ys)) => {
            if xs.len() != ys.len() {
                return false;
            }
            // Equivalence is transitive, so taking the first unused partner
            // never rules out a complete pairing.
            let mut used = vec![false; ys.len()];
            xs.iter().all(|x| {
                match ys
                    .iter()
                    .enumerate()
                    .position(|(i, y)| !used[i] && simple_compare(tree, *x, *y))
                {
                    Some(i) => {
                        used[i] = true;
                        true
                    }
                    None => false,
                }
            })
        }
        _ => false,
    }
}
