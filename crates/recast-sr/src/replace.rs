//! Building the replacement from a replace pattern and a match.
//!
//! Construction works in two phases. [`Replacer::build`] turns a pattern
//! into a value: an existing subject node, a sequence of them, or a node it
//! has just created. Values are not yet owned by anything. [`Replacer::place`]
//! then gives a value its one parent: a node may be linked in as-is if
//! nothing else in the new region holds it, otherwise it is duplicated.
//!
//! A node may be reused as-is when it was created during this application,
//! or when it belongs to the region being replaced, since the old region is
//! discarded by the splice. Anything else is still owned by the context
//! tree and is always copied.

use std::collections::{HashMap, HashSet};

use recast_tree::{
    Elements, Item, ItemShape, Kind, NodeData, NodeRef, Payload, PayloadShape, Symbol, Terminus,
    Tree, descendants,
};
use smallvec::SmallVec;

use crate::binding::{Binding, Bindings};
use crate::coupling::Couplings;
use crate::engine::run_rule;
use crate::errors::StepResult;
use crate::knowledge::SearchContext;
use crate::pattern::{PatRef, PatternItem, PatternNode, Patterns};

/// What an enclosing rule has matched and built so far, visible to the
/// slaves it hosts.
pub(crate) struct Outer<'a> {
    pub bindings: &'a Bindings,
    pub built: &'a HashMap<PatRef, Binding>,
    pub parent: Option<&'a Outer<'a>>,
}

pub(crate) struct Replacer<'a> {
    tree: &'a mut Tree,
    patterns: &'a Patterns,
    couplings: &'a Couplings,
    bindings: &'a Bindings,
    /// The view the match was made in; slaves extend it.
    context: &'a SearchContext,
    outer: Option<&'a Outer<'a>>,
    step: &'a str,
    region_root: NodeRef,
    /// Non-identifier nodes of the region being replaced.
    region: HashSet<NodeRef>,
    /// Nodes at or above this index were created by this application.
    watermark: usize,
    /// Nodes already linked into the replacement.
    claimed: HashSet<NodeRef>,
    /// Slave outputs, placed by the slave itself.
    pre_placed: HashSet<NodeRef>,
    built: HashMap<PatRef, Binding>,
    /// Identifier names created by this application.
    fresh_names: HashSet<Symbol>,
}

impl<'a> Replacer<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        tree: &'a mut Tree,
        patterns: &'a Patterns,
        couplings: &'a Couplings,
        bindings: &'a Bindings,
        context: &'a SearchContext,
        region_root: NodeRef,
        step: &'a str,
        outer: Option<&'a Outer<'a>>,
    ) -> Self {
        let region = descendants(tree, region_root)
            .into_iter()
            .filter(|&n| !tree.is_identifier(n))
            .collect();
        let watermark = tree.len();
        Self {
            tree,
            patterns,
            couplings,
            bindings,
            context,
            outer,
            step,
            region_root,
            region,
            watermark,
            claimed: HashSet::new(),
            pre_placed: HashSet::new(),
            built: HashMap::new(),
            fresh_names: HashSet::new(),
        }
    }

    /// Build `replace` and place it as the new region root.
    pub(crate) fn run(mut self, replace: PatRef) -> StepResult<NodeRef> {
        let value = self.build(replace, Some(Binding::Node(self.region_root)))?;
        let node = self.single(replace, &value);
        Ok(self.place(node))
    }

    /// Value for `pat`, built once per application.
    fn build(&mut self, pat: PatRef, hint: Option<Binding>) -> StepResult<Binding> {
        if let Some(value) = self.built.get(&pat) {
            return Ok(value.clone());
        }
        let value = self.construct(pat, hint)?;
        tracing::trace!("{}: built {pat} as {value:?}", self.step);
        self.built.insert(pat, value.clone());
        Ok(value)
    }

    /// What `pat` stands for when it does not construct anything itself.
    fn base(&self, pat: PatRef, hint: Option<Binding>) -> Option<Binding> {
        if let Some(value) = self.outer_built(pat) {
            return Some(value);
        }
        if let Some(value) = self.bindings.get(pat) {
            return Some(value.clone());
        }
        for &group in self.couplings.groups_of(pat) {
            if let Some(key) = self.bindings.key(group) {
                return Some(key.clone());
            }
            if let Some(value) = self
                .couplings
                .members(group)
                .iter()
                .find_map(|&m| self.outer_built(m))
            {
                return Some(value);
            }
        }
        hint
    }

    fn outer_built(&self, pat: PatRef) -> Option<Binding> {
        let mut outer = self.outer;
        while let Some(o) = outer {
            if let Some(value) = o.built.get(&pat) {
                return Some(value.clone());
            }
            outer = o.parent;
        }
        None
    }

    fn construct(&mut self, pat: PatRef, hint: Option<Binding>) -> StepResult<Binding> {
        let patterns = self.patterns;
        match patterns.get(pat) {
            PatternNode::Grammar {
                kind,
                payload,
                items,
            } => self.construct_grammar(pat, *kind, *payload, items, hint),
            PatternNode::Star { .. } => match self.base(pat, hint) {
                Some(value @ Binding::Sequence(_)) => Ok(value),
                other => panic!(
                    "invariant violation: {}: Star {pat} has no sequence to build from, got {other:?}",
                    self.step
                ),
            },
            PatternNode::Stuff { terminus, .. } => self.construct_stuff(pat, *terminus, hint),
            PatternNode::MatchAll { patterns: all, .. } => {
                let mut active = all.iter().copied().filter(|&p| self.is_active(p));
                match (active.next(), active.next()) {
                    (Some(p), None) => {
                        let base = self.base(pat, hint);
                        self.build(p, base)
                    }
                    (None, _) => Ok(self.passive(pat, hint)),
                    (Some(_), Some(_)) => panic!(
                        "invariant violation: {}: MatchAll {pat} has more than one operand to build",
                        self.step
                    ),
                }
            }
            PatternNode::MatchAny { .. } | PatternNode::NotMatch { .. } => {
                Ok(self.passive(pat, hint))
            }
            PatternNode::Overlay { overlay, .. } => {
                let base = self.base(pat, hint);
                self.build(*overlay, base)
            }
            PatternNode::Identity { node, .. } => Ok(Binding::Node(*node)),
            PatternNode::BuildIdentifier {
                kind,
                template,
                sources,
            } => self.construct_identifier(*kind, template, sources),
            PatternNode::Slave(spec) => {
                let base = self.base(pat, hint);
                let old_host = base.as_ref().and_then(Binding::node);
                let host = self.build(spec.through, base)?;
                let host = self.single(spec.through, &host);
                let mut root = self.place(host);
                // The slave looks at the whole context, with its host
                // already rebuilt.
                let context = self.context.substituted(old_host.unwrap_or(root), root);
                let limit = spec.rule.limit().unwrap_or_default();
                let name = format!("{}/{pat}", self.step);
                let outer = Outer {
                    bindings: self.bindings,
                    built: &self.built,
                    parent: self.outer,
                };
                let applied = run_rule(
                    &mut *self.tree,
                    patterns,
                    &spec.rule,
                    &name,
                    &context,
                    &mut root,
                    Some(limit),
                    Some(&outer),
                )?;
                tracing::debug!("{name}: applied {applied} time(s) under {host}");
                self.pre_placed.insert(root);
                Ok(Binding::Node(root))
            }
        }
    }

    /// Search-only patterns rebuild as whatever they matched.
    fn passive(&self, pat: PatRef, hint: Option<Binding>) -> Binding {
        self.base(pat, hint).unwrap_or_else(|| {
            panic!(
                "invariant violation: {}: {} pattern {pat} has nothing to build from",
                self.step,
                self.patterns.kind(pat)
            )
        })
    }

    /// Whether building `pat` can produce anything other than its match.
    fn is_active(&self, pat: PatRef) -> bool {
        self.patterns.search_side(pat).iter().any(|&p| {
            matches!(
                self.patterns.get(p),
                PatternNode::Overlay { .. } | PatternNode::Slave(_)
            )
        })
    }

    fn construct_grammar(
        &mut self,
        pat: PatRef,
        kind: Kind,
        payload: Option<Payload>,
        items: &[PatternItem],
        hint: Option<Binding>,
    ) -> StepResult<Binding> {
        let base = self.base(pat, hint);
        let wildcard = payload.is_none() && items.iter().all(|i| *i == PatternItem::Any);
        let fits = base
            .as_ref()
            .and_then(Binding::node)
            .is_some_and(|n| self.tree.kind(n).is_a(kind));
        // Identifiers are never rebuilt from a match: that would break the
        // link to their declaration.
        if let Some(base) = &base
            && fits
            && (wildcard || kind.is_a(Kind::Identifier))
        {
            return Ok(base.clone());
        }
        if kind.is_abstract() {
            panic!(
                "invariant violation: {}: cannot build abstract {kind} {pat} without a base",
                self.step
            );
        }

        let base_node = base
            .as_ref()
            .and_then(Binding::node)
            .filter(|&n| self.tree.kind(n) == kind);
        let payload = match (payload, base_node) {
            (Some(payload), _) => payload,
            (None, Some(node)) => self.tree.payload(node),
            (None, None) if kind.payload_shape() == PayloadShape::None => Payload::None,
            (None, None) => panic!(
                "invariant violation: {}: {kind} {pat} needs a payload to build",
                self.step
            ),
        };

        let schema = kind.schema();
        let mut new_items = SmallVec::new();
        for (index, pattern_item) in items.iter().enumerate() {
            let base_item = base_node.map(|n| self.tree.items(n)[index].clone());
            let item = match (pattern_item, base_item) {
                (PatternItem::Any, Some(Item::Single(Some(child)))) => {
                    Item::Single(Some(self.place(child)))
                }
                (PatternItem::Any, Some(Item::Sequence(elems))) => {
                    Item::Sequence(elems.into_iter().map(|e| self.place(e)).collect())
                }
                (PatternItem::Any, Some(Item::Collection(elems))) => {
                    Item::Collection(elems.into_iter().map(|e| self.place(e)).collect())
                }
                (PatternItem::Any, _) if schema[index].shape == ItemShape::Single => {
                    panic!(
                        "invariant violation: {}: item `{}` of {kind} {pat} is unset and has nothing to build from",
                        self.step, schema[index].name
                    )
                }
                (PatternItem::Any, _) => Item::empty(schema[index].shape),
                (PatternItem::Single(p), base_item) => {
                    let hint = match base_item {
                        Some(Item::Single(Some(child))) => Some(Binding::Node(child)),
                        _ => None,
                    };
                    let value = self.build(*p, hint)?;
                    let child = self.single(*p, &value);
                    Item::Single(Some(self.place(child)))
                }
                (PatternItem::Sequence(ps), _) => Item::Sequence(self.build_container(ps)?),
                (PatternItem::Collection(ps), _) => Item::Collection(self.build_container(ps)?),
            };
            new_items.push(item);
        }

        let node = self.tree.create(NodeData {
            kind,
            payload,
            items: new_items,
        });
        Ok(Binding::Node(node))
    }

    /// Build and place container elements; a Star expands in place.
    fn build_container(&mut self, pats: &[PatRef]) -> StepResult<Elements> {
        let mut out = Elements::new();
        for &p in pats {
            match self.build(p, None)? {
                Binding::Sequence(elems) => {
                    for e in elems {
                        out.push(self.place(e));
                    }
                }
                value => {
                    let node = self.single(p, &value);
                    out.push(self.place(node));
                }
            }
        }
        Ok(out)
    }

    /// Rebuild the surroundings of a Stuff match with its terminus replaced.
    fn construct_stuff(
        &mut self,
        pat: PatRef,
        terminus: Option<PatRef>,
        hint: Option<Binding>,
    ) -> StepResult<Binding> {
        let base = self.base(pat, hint);
        let Some(terminus) = terminus else {
            return Ok(self.passive(pat, base));
        };
        let (root, at) = match base {
            Some(Binding::Terminus { root, terminus }) => (root, terminus),
            other => panic!(
                "invariant violation: {}: Stuff {pat} has no terminus to build from, got {other:?}",
                self.step
            ),
        };
        let value = self.build(terminus, Some(Binding::Node(at)))?;
        let replacement = self.single(terminus, &value);
        if root == at {
            return Ok(Binding::Node(replacement));
        }
        let replacement = self.place(replacement);
        let node = self.tree.duplicate_subtree(root, Some(Terminus { at, replacement }));
        Ok(Binding::Node(node))
    }

    fn construct_identifier(
        &mut self,
        kind: Kind,
        template: &str,
        sources: &[PatRef],
    ) -> StepResult<Binding> {
        let mut name = String::with_capacity(template.len());
        let mut pieces = template.split("{}");
        name.push_str(pieces.next().unwrap_or_default());
        for (&source, piece) in sources.iter().zip(pieces) {
            let value = self.build(source, None)?;
            let node = self.single(source, &value);
            let Some(symbol) = self.tree.name(node) else {
                panic!(
                    "invariant violation: {}: identifier source {source} is {}, which has no name",
                    self.step,
                    self.tree.kind(node)
                );
            };
            symbol.with_str(|s| name.push_str(s));
            name.push_str(piece);
        }
        let symbol = self.unused_name(kind, &name);
        let node = self.tree.identifier(kind, symbol);
        Ok(Binding::Node(node))
    }

    /// `name`, or `name_N` with the smallest `N` that neither the context
    /// nor this application uses yet for an identifier of `kind`.
    fn unused_name(&mut self, kind: Kind, name: &str) -> Symbol {
        let tree = &*self.tree;
        let taken: HashSet<Symbol> = self
            .context
            .knowledge(tree)
            .of_kind(kind)
            .iter()
            .filter_map(|&n| tree.name(n))
            .chain(self.fresh_names.iter().copied())
            .collect();
        let mut symbol = Symbol::from_dynamic(name);
        let mut n = 0usize;
        while taken.contains(&symbol) {
            n += 1;
            symbol = Symbol::from_dynamic(&format!("{name}_{n}"));
        }
        self.fresh_names.insert(symbol);
        symbol
    }

    fn single(&self, pat: PatRef, value: &Binding) -> NodeRef {
        value.node().unwrap_or_else(|| {
            panic!(
                "invariant violation: {}: {pat} built a sequence where one node is needed",
                self.step
            )
        })
    }

    // ------------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------------

    /// Give `node` a parent in the replacement, duplicating it if it is
    /// already owned elsewhere.
    fn place(&mut self, node: NodeRef) -> NodeRef {
        if self.tree.is_identifier(node) {
            return node;
        }
        let placed = if self.pre_placed.remove(&node) {
            node
        } else if self.is_fresh(node) && !self.claimed.contains(&node) {
            node
        } else if self.region.contains(&node) && !self.subtree_claimed(node) {
            node
        } else {
            let copy = self.tree.duplicate_subtree(node, None);
            tracing::trace!("{}: {node} is owned elsewhere, placed copy {copy}", self.step);
            copy
        };
        self.claim(placed);
        placed
    }

    fn is_fresh(&self, node: NodeRef) -> bool {
        node.as_u32() as usize >= self.watermark
    }

    fn subtree_claimed(&self, node: NodeRef) -> bool {
        descendants(self.tree, node)
            .into_iter()
            .any(|n| self.claimed.contains(&n))
    }

    fn claim(&mut self, node: NodeRef) {
        for n in descendants(self.tree, node) {
            if !self.tree.is_identifier(n) {
                self.claimed.insert(n);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recast_tree::{simple_compare, validate};

    /// Build `replace` against bindings made by hand.
    fn replace_with(
        tree: &mut Tree,
        patterns: &Patterns,
        bindings: &[(PatRef, Binding)],
        region: NodeRef,
        replace: PatRef,
    ) -> NodeRef {
        let couplings = Couplings::default();
        let mut b = Bindings::new(&couplings);
        for (pat, value) in bindings {
            b.bind(&couplings, *pat, value.clone()).unwrap();
        }
        let context = SearchContext::new(region);
        Replacer::new(tree, patterns, &couplings, &b, &context, region, "Test", None)
            .run(replace)
            .unwrap()
    }

    #[test]
    fn region_nodes_are_reused_once() {
        let mut tree = Tree::new();
        let n = tree.nop();
        let block = tree.compound([], [n]);

        let mut p = Patterns::new();
        let s = p.any(Kind::Statement);
        let twice = p.grammar(Kind::Compound).sequence("statements", [s, s]).build();

        let out = replace_with(&mut tree, &p, &[(s, Binding::Node(n))], block, twice);
        let statements = tree.elements(out, "statements").to_vec();
        assert_eq!(statements[0], n);
        assert_ne!(statements[1], n);
        assert!(simple_compare(&tree, statements[0], statements[1]));
        assert!(validate(&tree, out).is_ok());
    }

    #[test]
    fn nodes_outside_the_region_are_copied() {
        let mut tree = Tree::new();
        let outside = tree.nop();
        let inside = tree.nop();
        let block = tree.compound([], [inside]);

        let mut p = Patterns::new();
        let s = p.any(Kind::Statement);
        let wrap = p.grammar(Kind::Compound).sequence("statements", [s]).build();

        let out = replace_with(&mut tree, &p, &[(s, Binding::Node(outside))], block, wrap);
        assert_ne!(tree.elements(out, "statements")[0], outside);
    }

    #[test]
    fn built_identifier_is_shared_by_every_reference() {
        let mut tree = Tree::new();
        let x = tree.label_identifier("X");
        let label = tree.label(x);
        let block = tree.compound([], [label]);

        let mut p = Patterns::new();
        let xp = p.any(Kind::LabelIdentifier);
        let fresh = p.build_identifier(Kind::LabelIdentifier, "{}_NEXT", [xp]);
        let decl = p.grammar(Kind::Label).child("identifier", fresh).build();
        let jump = p.grammar(Kind::Goto).child("destination", fresh).build();
        let out_pat = p
            .grammar(Kind::Compound)
            .sequence("statements", [jump, decl])
            .build();

        let out = replace_with(&mut tree, &p, &[(xp, Binding::Node(x))], block, out_pat);
        let goto = tree.elements(out, "statements")[0];
        let new_label = tree.elements(out, "statements")[1];
        let target = tree.child(goto, "destination");
        assert_eq!(target, tree.child(new_label, "identifier"));
        assert_eq!(tree.name(target.unwrap()).unwrap().to_string(), "X_NEXT");
        assert!(validate(&tree, out).is_ok());
    }
}
