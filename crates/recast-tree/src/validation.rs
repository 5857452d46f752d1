//! Invariant checks for finalized program trees.
//!
//! A finalized tree is what a renderer may rely on:
//!
//! 1. Every non-identifier node is referenced from exactly one place.
//! 2. Every identifier is declared exactly once and used any number of times.
//! 3. No single item is unset, and every child is-a the item's declared kind.

use std::collections::{HashMap, HashSet};
use std::fmt;

use derive_more::Display;

use crate::kind::Kind;
use crate::node::Item;
use crate::refs::NodeRef;
use crate::tree::Tree;

/// One broken invariant.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum TreeError {
    #[display("{kind} {node} has unset item `{item}`")]
    UnsetChild {
        node: NodeRef,
        kind: Kind,
        item: &'static str,
    },

    #[display("{kind} {node} is referenced {references} times")]
    SharedNode {
        node: NodeRef,
        kind: Kind,
        references: usize,
    },

    #[display("identifier `{name}` ({node}) is used but never declared")]
    UndeclaredIdentifier { node: NodeRef, name: String },

    #[display("identifier `{name}` ({node}) is declared {count} times")]
    MultiplyDeclared {
        node: NodeRef,
        name: String,
        count: usize,
    },

    #[display("item `{item}` of {parent} {node} holds {found}, expected {expected}")]
    ChildKindMismatch {
        node: NodeRef,
        parent: Kind,
        item: &'static str,
        expected: Kind,
        found: Kind,
    },
}

/// All errors found under one root.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<TreeError>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "validation passed");
        }
        writeln!(f, "{} tree error(s) found:", self.errors.len())?;
        for err in &self.errors {
            writeln!(f, "  - {err}")?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct Census {
    /// References to non-identifier nodes, root excluded.
    references: HashMap<NodeRef, usize>,
    declarations: HashMap<NodeRef, usize>,
    used: HashSet<NodeRef>,
    /// First-seen order, for deterministic reporting.
    order: Vec<NodeRef>,
}

/// Check the finalized-tree invariants of everything under `root`.
pub fn validate(tree: &Tree, root: NodeRef) -> ValidationResult {
    let mut errors = Vec::new();
    let mut census = Census::default();
    let mut visited = HashSet::new();
    census.order.push(root);
    visit(tree, root, &mut census, &mut visited, &mut errors);

    for &node in &census.order {
        if tree.is_identifier(node) {
            let name = tree.name(node).map(|n| n.to_string()).unwrap_or_default();
            match census.declarations.get(&node).copied().unwrap_or(0) {
                0 => errors.push(TreeError::UndeclaredIdentifier { node, name }),
                1 => {}
                count => errors.push(TreeError::MultiplyDeclared { node, name, count }),
            }
        } else if let Some(&references) = census.references.get(&node)
            && references > 1
        {
            errors.push(TreeError::SharedNode {
                node,
                kind: tree.kind(node),
                references,
            });
        }
    }

    ValidationResult { errors }
}

fn visit(
    tree: &Tree,
    node: NodeRef,
    census: &mut Census,
    visited: &mut HashSet<NodeRef>,
    errors: &mut Vec<TreeError>,
) {
    if !visited.insert(node) {
        return;
    }
    let kind = tree.kind(node);
    for (spec, item) in kind.schema().iter().zip(tree.items(node)) {
        if let Item::Single(None) = item {
            errors.push(TreeError::UnsetChild {
                node,
                kind,
                item: spec.name,
            });
            continue;
        }
        for &child in item.elements() {
            let found = tree.kind(child);
            if !found.is_a(spec.kind) {
                errors.push(TreeError::ChildKindMismatch {
                    node,
                    parent: kind,
                    item: spec.name,
                    expected: spec.kind,
                    found,
                });
            }
            let seen = if tree.is_identifier(child) {
                let seen = census.used.contains(&child) || census.declarations.contains_key(&child);
                if spec.declares {
                    *census.declarations.entry(child).or_default() += 1;
                } else {
                    census.used.insert(child);
                }
                seen
            } else {
                let count = census.references.entry(child).or_default();
                *count += 1;
                *count > 1
            };
            if !seen {
                census.order.push(child);
            }
            visit(tree, child, census, visited, errors);
        }
    }
}
