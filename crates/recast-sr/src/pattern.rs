//! Pattern vocabulary.
//!
//! Patterns live in their own arena, [`Patterns`], separate from the program
//! tree, and are built once per step. A pattern node carries a grammar kind
//! like any program node, so it can stand in any item whose declared kind it
//! is compatible with, and it also carries a match directive.
//!
//! Grammar patterns mirror program nodes: an unset item is a wildcard, an
//! abstract kind matches any subject that is-a that kind. The special nodes
//! are:
//!
//! - `Star<T>`: zero or more consecutive container elements, each a `T`.
//! - `Stuff<T>`: a terminus at any depth, optionally pruned by a recurse
//!   restriction.
//! - `MatchAll`, `MatchAny`, `NotMatch`: logic at one position.
//! - `Overlay`: search through one pattern, build another in its place.
//! - `Identity`: exactly one known subject node.
//! - `BuildIdentifier`: a fresh identifier, replace side only.
//! - `Slave`: a nested search and replace hosted at this position.

use cranelift_entity::{PrimaryMap, entity_impl};
use recast_tree::{ItemShape, Kind, KindRelation, NodeRef, Payload};
use smallvec::SmallVec;

use crate::engine::Rule;
use crate::slave::SlaveSpec;

/// Reference to a node in a [`Patterns`] arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatRef(u32);
entity_impl!(PatRef, "pat");

pub type PatRefs = SmallVec<[PatRef; 4]>;

/// Pattern for one item of a grammar pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternItem {
    /// Unset: matches whatever the subject holds.
    Any,
    Single(PatRef),
    Sequence(PatRefs),
    Collection(PatRefs),
}

/// A pattern node: a kind plus a match directive.
#[derive(Debug)]
pub enum PatternNode {
    Grammar {
        kind: Kind,
        payload: Option<Payload>,
        items: SmallVec<[PatternItem; 4]>,
    },
    Star {
        kind: Kind,
        restriction: Option<PatRef>,
    },
    Stuff {
        kind: Kind,
        terminus: Option<PatRef>,
        recurse_restriction: Option<PatRef>,
    },
    MatchAll {
        kind: Kind,
        patterns: PatRefs,
    },
    MatchAny {
        kind: Kind,
        patterns: PatRefs,
    },
    NotMatch {
        kind: Kind,
        pattern: PatRef,
    },
    Overlay {
        kind: Kind,
        through: PatRef,
        overlay: PatRef,
    },
    Identity {
        kind: Kind,
        node: NodeRef,
    },
    BuildIdentifier {
        kind: Kind,
        template: String,
        sources: PatRefs,
    },
    Slave(Box<SlaveSpec>),
}

impl PatternNode {
    pub fn kind(&self) -> Kind {
        match self {
            PatternNode::Grammar { kind, .. }
            | PatternNode::Star { kind, .. }
            | PatternNode::Stuff { kind, .. }
            | PatternNode::MatchAll { kind, .. }
            | PatternNode::MatchAny { kind, .. }
            | PatternNode::NotMatch { kind, .. }
            | PatternNode::Overlay { kind, .. }
            | PatternNode::Identity { kind, .. }
            | PatternNode::BuildIdentifier { kind, .. } => *kind,
            PatternNode::Slave(spec) => spec.kind,
        }
    }

    pub fn is_star(&self) -> bool {
        matches!(self, PatternNode::Star { .. })
    }

    pub fn is_builder(&self) -> bool {
        matches!(self, PatternNode::BuildIdentifier { .. })
    }

    /// Sub-patterns reachable from this node, in field order.
    ///
    /// A slave contributes only its `through` pattern: its own search and
    /// replace patterns belong to the slave.
    pub fn links(&self) -> PatRefs {
        let mut out = PatRefs::new();
        match self {
            PatternNode::Grammar { items, .. } => {
                for item in items {
                    match item {
                        PatternItem::Any => {}
                        PatternItem::Single(p) => out.push(*p),
                        PatternItem::Sequence(ps) | PatternItem::Collection(ps) => {
                            out.extend(ps.iter().copied())
                        }
                    }
                }
            }
            PatternNode::Star { restriction, .. } => out.extend(*restriction),
            PatternNode::Stuff {
                terminus,
                recurse_restriction,
                ..
            } => {
                out.extend(*terminus);
                out.extend(*recurse_restriction);
            }
            PatternNode::MatchAll { patterns, .. } | PatternNode::MatchAny { patterns, .. } => {
                out.extend(patterns.iter().copied())
            }
            PatternNode::NotMatch { pattern, .. } => out.push(*pattern),
            PatternNode::Overlay {
                through, overlay, ..
            } => {
                out.push(*through);
                out.push(*overlay);
            }
            PatternNode::Identity { .. } => {}
            PatternNode::BuildIdentifier { sources, .. } => out.extend(sources.iter().copied()),
            PatternNode::Slave(spec) => out.push(spec.through),
        }
        out
    }
}

/// Arena of pattern nodes for one step.
#[derive(Debug, Default)]
pub struct Patterns {
    nodes: PrimaryMap<PatRef, PatternNode>,
}

impl Patterns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pat: PatRef) -> &PatternNode {
        &self.nodes[pat]
    }

    pub fn kind(&self, pat: PatRef) -> Kind {
        self.nodes[pat].kind()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, node: PatternNode) -> PatRef {
        self.nodes.push(node)
    }

    /// The slave hosted at `pat`.
    ///
    /// # Panics
    ///
    /// Panics if `pat` is not a slave.
    pub fn slave(&self, pat: PatRef) -> &SlaveSpec {
        match &self.nodes[pat] {
            PatternNode::Slave(spec) => spec,
            other => panic!("{pat} is not a slave: {other:?}"),
        }
    }

    /// Every pattern reachable from `root`, pre-order, each listed once.
    pub fn reachable(&self, root: PatRef) -> Vec<PatRef> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(pat) = stack.pop() {
            if out.contains(&pat) {
                continue;
            }
            out.push(pat);
            stack.extend(self.nodes[pat].links().into_iter().rev());
        }
        out
    }

    /// Patterns a search through `root` actually matches: like
    /// [`Patterns::reachable`], but an Overlay contributes only `through`
    /// and builder sources are not followed.
    pub fn search_side(&self, root: PatRef) -> Vec<PatRef> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(pat) = stack.pop() {
            if out.contains(&pat) {
                continue;
            }
            out.push(pat);
            match &self.nodes[pat] {
                PatternNode::Overlay { through, .. } => stack.push(*through),
                PatternNode::BuildIdentifier { .. } => {}
                node => stack.extend(node.links().into_iter().rev()),
            }
        }
        out
    }

    // === Builders ===

    /// Start a grammar pattern of `kind`; unset items stay wildcards.
    pub fn grammar(&mut self, kind: Kind) -> GrammarBuilder<'_> {
        GrammarBuilder {
            items: kind.schema().iter().map(|_| PatternItem::Any).collect(),
            patterns: self,
            kind,
            payload: None,
        }
    }

    /// Wildcard: any subject that is-a `kind`.
    pub fn any(&mut self, kind: Kind) -> PatRef {
        self.grammar(kind).build()
    }

    pub fn star(&mut self, kind: Kind) -> PatRef {
        self.push(PatternNode::Star {
            kind,
            restriction: None,
        })
    }

    /// Star whose every element must also match `restriction`.
    pub fn star_restricted(&mut self, kind: Kind, restriction: PatRef) -> PatRef {
        self.push(PatternNode::Star {
            kind,
            restriction: Some(restriction),
        })
    }

    pub fn stuff(&mut self, kind: Kind, terminus: PatRef) -> PatRef {
        self.push(PatternNode::Stuff {
            kind,
            terminus: Some(terminus),
            recurse_restriction: None,
        })
    }

    /// Stuff that only descends through nodes matching `recurse_restriction`.
    pub fn stuff_restricted(
        &mut self,
        kind: Kind,
        terminus: PatRef,
        recurse_restriction: PatRef,
    ) -> PatRef {
        self.push(PatternNode::Stuff {
            kind,
            terminus: Some(terminus),
            recurse_restriction: Some(recurse_restriction),
        })
    }

    pub fn match_all(&mut self, kind: Kind, patterns: impl IntoIterator<Item = PatRef>) -> PatRef {
        let patterns = self.logic_operands(kind, patterns);
        self.push(PatternNode::MatchAll { kind, patterns })
    }

    pub fn match_any(&mut self, kind: Kind, patterns: impl IntoIterator<Item = PatRef>) -> PatRef {
        let patterns = self.logic_operands(kind, patterns);
        self.push(PatternNode::MatchAny { kind, patterns })
    }

    pub fn not_match(&mut self, kind: Kind, pattern: PatRef) -> PatRef {
        self.check_not_star(pattern, "NotMatch");
        self.push(PatternNode::NotMatch { kind, pattern })
    }

    /// Search through `through`, build `overlay` in its place.
    pub fn overlay(&mut self, through: PatRef, overlay: PatRef) -> PatRef {
        self.check_not_star(through, "Overlay");
        self.check_not_star(overlay, "Overlay");
        let kind = self.kind(through);
        self.push(PatternNode::Overlay {
            kind,
            through,
            overlay,
        })
    }

    pub fn identity(&mut self, kind: Kind, node: NodeRef) -> PatRef {
        self.push(PatternNode::Identity { kind, node })
    }

    /// Fresh identifier named by `template`, each `{}` replaced by the name
    /// of the next source identifier.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is not an identifier kind or the number of `{}`
    /// placeholders differs from the number of sources.
    pub fn build_identifier(
        &mut self,
        kind: Kind,
        template: impl Into<String>,
        sources: impl IntoIterator<Item = PatRef>,
    ) -> PatRef {
        let template = template.into();
        let sources: PatRefs = sources.into_iter().collect();
        assert!(
            kind.is_a(Kind::Identifier) && !kind.is_abstract(),
            "BuildIdentifier needs a concrete identifier kind, got {kind}"
        );
        assert_eq!(
            template.matches("{}").count(),
            sources.len(),
            "template `{template}` does not fit {} sources",
            sources.len()
        );
        self.push(PatternNode::BuildIdentifier {
            kind,
            template,
            sources,
        })
    }

    /// Host a nested search and replace at the position `through` matches.
    pub fn host_slave(&mut self, through: PatRef, rule: Rule) -> PatRef {
        self.check_not_star(through, "Slave");
        let kind = self.kind(through);
        self.push(PatternNode::Slave(Box::new(SlaveSpec {
            kind,
            through,
            rule,
        })))
    }

    fn logic_operands(&self, kind: Kind, patterns: impl IntoIterator<Item = PatRef>) -> PatRefs {
        let patterns: PatRefs = patterns.into_iter().collect();
        assert!(!patterns.is_empty(), "logic pattern of {kind} has no operands");
        for &p in &patterns {
            self.check_not_star(p, "MatchAll/MatchAny");
        }
        patterns
    }

    fn check_not_star(&self, pat: PatRef, owner: &str) {
        assert!(
            !self.nodes[pat].is_star(),
            "invariant violation: Star {pat} may only appear directly in a container, not under {owner}"
        );
    }
}

/// Builder for a grammar pattern, addressing items by schema name.
pub struct GrammarBuilder<'p> {
    patterns: &'p mut Patterns,
    kind: Kind,
    payload: Option<Payload>,
    items: SmallVec<[PatternItem; 4]>,
}

impl GrammarBuilder<'_> {
    pub fn payload(mut self, payload: Payload) -> Self {
        assert_eq!(
            payload.shape(),
            self.kind.payload_shape(),
            "{} cannot carry {payload:?}",
            self.kind
        );
        self.payload = Some(payload);
        self
    }

    pub fn child(mut self, name: &str, pat: PatRef) -> Self {
        let index = self.index(name, ItemShape::Single);
        self.patterns.check_not_star(pat, self.kind.name());
        self.check_fits(index, pat);
        self.items[index] = PatternItem::Single(pat);
        self
    }

    pub fn sequence(mut self, name: &str, pats: impl IntoIterator<Item = PatRef>) -> Self {
        let index = self.index(name, ItemShape::Sequence);
        let pats: PatRefs = pats.into_iter().collect();
        for &p in &pats {
            self.check_fits(index, p);
        }
        self.items[index] = PatternItem::Sequence(pats);
        self
    }

    /// Collection item; at most one Star, which takes the unmatched rest.
    pub fn collection(mut self, name: &str, pats: impl IntoIterator<Item = PatRef>) -> Self {
        let index = self.index(name, ItemShape::Collection);
        let pats: PatRefs = pats.into_iter().collect();
        for &p in &pats {
            self.check_fits(index, p);
        }
        assert!(
            pats.iter().filter(|&&p| self.patterns.get(p).is_star()).count() <= 1,
            "collection `{name}` of {} holds more than one Star",
            self.kind
        );
        self.items[index] = PatternItem::Collection(pats);
        self
    }

    pub fn build(self) -> PatRef {
        self.patterns.push(PatternNode::Grammar {
            kind: self.kind,
            payload: self.payload,
            items: self.items,
        })
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

    /// A sub-pattern whose kind shares no concrete kind with the item could
    /// never match or build.
    fn check_fits(&self, index: usize, pat: PatRef) {
        let spec = &self.kind.schema()[index];
        let kind = self.patterns.kind(pat);
        assert!(
            kind.relation(spec.kind) != KindRelation::Disjoint,
            "{kind} pattern {pat} cannot stand in item `{}` of {}, which holds {}",
            spec.name,
            self.kind,
            spec.kind
        );
    }
}
