//! Bindings from pattern nodes to subject values.

use std::collections::HashMap;

use recast_tree::{Elements, NodeRef};

use crate::coupling::{Couplings, GroupId};
use crate::errors::{MatchResult, Mismatch};
use crate::pattern::PatRef;

/// What a pattern node matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Binding {
    Node(NodeRef),
    /// The elements taken by a Star, in container order.
    Sequence(Elements),
    /// The root a Stuff was matched at and the terminus it located.
    Terminus { root: NodeRef, terminus: NodeRef },
}

impl Binding {
    /// The node this binding stands for, if it is a single position.
    pub fn node(&self) -> Option<NodeRef> {
        match self {
            Binding::Node(node) => Some(*node),
            Binding::Terminus { root, .. } => Some(*root),
            Binding::Sequence(_) => None,
        }
    }

    /// Agreement used by couplings: the same subject nodes, by identity.
    pub fn agrees_with(&self, other: &Binding) -> bool {
        match (self, other) {
            (Binding::Sequence(a), Binding::Sequence(b)) => a == b,
            (Binding::Terminus { .. }, Binding::Terminus { .. }) => self == other,
            (Binding::Sequence(_), _) | (_, Binding::Sequence(_)) => false,
            _ => self.node() == other.node(),
        }
    }
}

/// Bindings of one search attempt, plus the value fixed for each coupling
/// group so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    by_pattern: HashMap<PatRef, Binding>,
    keys: Vec<Option<Binding>>,
}

impl Bindings {
    pub fn new(couplings: &Couplings) -> Self {
        Bindings {
            by_pattern: HashMap::new(),
            keys: vec![None; couplings.len()],
        }
    }

    /// Start a slave search: everything the master bound stays visible, and
    /// a slave group with a master-bound member starts out keyed to it.
    pub fn seeded(master: &Bindings, couplings: &Couplings) -> Self {
        let keys = couplings
            .groups()
            .map(|(_, members)| {
                members
                    .iter()
                    .find_map(|m| master.by_pattern.get(m).cloned())
            })
            .collect();
        Bindings {
            by_pattern: master.by_pattern.clone(),
            keys,
        }
    }

    pub fn get(&self, pat: PatRef) -> Option<&Binding> {
        self.by_pattern.get(&pat)
    }

    /// The single node bound to `pat`.
    pub fn node(&self, pat: PatRef) -> Option<NodeRef> {
        self.get(pat).and_then(Binding::node)
    }

    pub fn key(&self, group: GroupId) -> Option<&Binding> {
        self.keys.get(group).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.by_pattern.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pattern.is_empty()
    }

    /// Record `value` for `pat`.
    ///
    /// A pattern bound twice in one attempt is implicitly coupled with
    /// itself; every group `pat` belongs to must agree as well.
    pub fn bind(&mut self, couplings: &Couplings, pat: PatRef, value: Binding) -> MatchResult {
        if let Some(existing) = self.by_pattern.get(&pat)
            && !existing.agrees_with(&value)
        {
            return Err(Mismatch);
        }
        for &group in couplings.groups_of(pat) {
            match &self.keys[group] {
                Some(key) if !key.agrees_with(&value) => {
                    tracing::trace!("coupling group {group} rejects {pat} = {value:?}");
                    return Err(Mismatch);
                }
                Some(_) => {}
                None => self.keys[group] = Some(value.clone()),
            }
        }
        self.by_pattern.entry(pat).or_insert(value);
        Ok(())
    }
}
