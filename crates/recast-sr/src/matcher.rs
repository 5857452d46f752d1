//! Backtracking search of a pattern against a subject tree.
//!
//! Each attempt walks the pattern from the root, checking kinds before
//! descending, and makes every choice through the shared [`Conjecture`].
//! Enumeration order is document order: Star lengths shortest first, Stuff
//! candidates in pre-order, MatchAny alternatives and collection elements
//! in declared order. Any [`Mismatch`] abandons the attempt; the next one
//! replays with the conjecture advanced.
//!
//! NotMatch, Star restrictions and Stuff recurse restrictions run as
//! isolated sub-searches: they see the bindings made so far but bind
//! nothing themselves.

use recast_tree::{Elements, Item, Kind, NodeRef, Payload, Tree, WalkAction, walk};
use smallvec::SmallVec;
use std::ops::ControlFlow;

use crate::binding::{Binding, Bindings};
use crate::conjecture::Conjecture;
use crate::coupling::Couplings;
use crate::engine::Rule;
use crate::errors::{MatchResult, Mismatch};
use crate::knowledge::SearchContext;
use crate::pattern::{PatRef, PatternItem, PatternNode, Patterns};
use crate::symbolic::EvalKit;

/// First match of `rule`'s search pattern at `root`, starting from `seed`.
pub(crate) fn search(
    tree: &Tree,
    patterns: &Patterns,
    rule: &Rule,
    ctx: &SearchContext,
    root: NodeRef,
    seed: &Bindings,
) -> Option<Bindings> {
    let mut conjecture = Conjecture::new();
    let mut attempts = 0usize;
    loop {
        conjecture.rewind();
        attempts += 1;
        let outcome = {
            let mut attempt = Attempt {
                tree,
                patterns,
                couplings: rule.couplings(),
                ctx,
                conjecture: &mut conjecture,
                bindings: seed.clone(),
                slaves: Vec::new(),
            };
            attempt.run(rule, root).map(|()| attempt.bindings)
        };
        if let Ok(bindings) = outcome {
            tracing::trace!("search at {root}: matched after {attempts} attempt(s)");
            return Some(bindings);
        }
        if !conjecture.advance() {
            tracing::trace!("search at {root}: no match in {attempts} attempt(s)");
            return None;
        }
    }
}

struct Attempt<'a, 'c> {
    tree: &'a Tree,
    patterns: &'a Patterns,
    couplings: &'a Couplings,
    ctx: &'a SearchContext,
    conjecture: &'c mut Conjecture,
    bindings: Bindings,
    /// Slaves met during this attempt, with the node each is hosted at.
    slaves: Vec<(PatRef, NodeRef)>,
}

impl Attempt<'_, '_> {
    fn run(&mut self, rule: &Rule, root: NodeRef) -> MatchResult {
        self.match_pattern(rule.search(), root)?;
        if let Some(condition) = rule.condition() {
            let kit = EvalKit {
                tree: self.tree,
                bindings: &self.bindings,
                knowledge: self.ctx.knowledge(self.tree),
            };
            condition.evaluate(&kit)?;
        }
        self.check_slaves()
    }

    fn match_pattern(&mut self, pat: PatRef, subject: NodeRef) -> MatchResult {
        let (tree, patterns) = (self.tree, self.patterns);
        let node = patterns.get(pat);
        if !tree.kind(subject).is_a(node.kind()) {
            return Err(Mismatch);
        }

        let value = match node {
            PatternNode::Grammar { payload, items, .. } => {
                self.match_grammar(payload.as_ref(), items, subject)?;
                Binding::Node(subject)
            }
            PatternNode::Star { .. } => {
                panic!("invariant violation: Star {pat} outside a container")
            }
            PatternNode::Stuff {
                terminus,
                recurse_restriction,
                ..
            } => {
                let found = self.match_stuff(*terminus, *recurse_restriction, subject)?;
                Binding::Terminus {
                    root: subject,
                    terminus: found,
                }
            }
            PatternNode::MatchAll { patterns: all, .. } => {
                for &p in all {
                    self.match_pattern(p, subject)?;
                }
                Binding::Node(subject)
            }
            PatternNode::MatchAny { patterns: any, .. } => {
                let pick = self.conjecture.choose(any.len()).ok_or(Mismatch)?;
                self.match_pattern(any[pick], subject)?;
                Binding::Node(subject)
            }
            PatternNode::NotMatch { pattern, .. } => {
                if self.isolated(*pattern, subject) {
                    return Err(Mismatch);
                }
                Binding::Node(subject)
            }
            PatternNode::Overlay { through, .. } => {
                self.match_pattern(*through, subject)?;
                Binding::Node(subject)
            }
            PatternNode::Identity { node, .. } => {
                if subject != *node {
                    return Err(Mismatch);
                }
                Binding::Node(subject)
            }
            PatternNode::BuildIdentifier { .. } => {
                panic!("invariant violation: builder {pat} reached during search")
            }
            PatternNode::Slave(spec) => {
                self.match_pattern(spec.through, subject)?;
                self.slaves.push((pat, subject));
                Binding::Node(subject)
            }
        };

        self.bindings.bind(self.couplings, pat, value)
    }

    fn match_grammar(
        &mut self,
        payload: Option<&Payload>,
        items: &[PatternItem],
        subject: NodeRef,
    ) -> MatchResult {
        let tree = self.tree;
        if let Some(payload) = payload
            && tree.payload(subject) != *payload
        {
            return Err(Mismatch);
        }
        // A concrete pattern kind has no strict subclasses, so the subject
        // shares its schema.
        for (pattern_item, item) in items.iter().zip(tree.items(subject)) {
            match (pattern_item, item) {
                (PatternItem::Any, _) => {}
                (PatternItem::Single(p), Item::Single(Some(child))) => {
                    self.match_pattern(*p, *child)?
                }
                (PatternItem::Single(_), Item::Single(None)) => return Err(Mismatch),
                (PatternItem::Sequence(ps), Item::Sequence(elems)) => {
                    self.match_sequence(ps, elems)?
                }
                (PatternItem::Collection(ps), Item::Collection(elems)) => {
                    self.match_collection(ps, elems)?
                }
                (pattern_item, item) => panic!(
                    "invariant violation: pattern item {pattern_item:?} cannot match {:?} of {subject}",
                    item.shape()
                ),
            }
        }
        Ok(())
    }

    /// Match an ordered container. Every Star but the last enumerates its
    /// length, shortest first; the last takes what the fixed patterns
    /// after it leave over.
    fn match_sequence(&mut self, pats: &[PatRef], elems: &[NodeRef]) -> MatchResult {
        let Some((&first, rest)) = pats.split_first() else {
            return if elems.is_empty() { Ok(()) } else { Err(Mismatch) };
        };
        let patterns = self.patterns;
        if let PatternNode::Star { kind, restriction } = patterns.get(first) {
            let fixed = rest.iter().filter(|&&p| !patterns.get(p).is_star()).count();
            let Some(max) = elems.len().checked_sub(fixed) else {
                return Err(Mismatch);
            };
            let len = if rest.iter().any(|&p| patterns.get(p).is_star()) {
                self.conjecture.choose(max + 1).ok_or(Mismatch)?
            } else {
                max
            };
            self.match_star(first, *kind, *restriction, &elems[..len])?;
            self.match_sequence(rest, &elems[len..])
        } else {
            let Some((&elem, tail)) = elems.split_first() else {
                return Err(Mismatch);
            };
            self.match_pattern(first, elem)?;
            self.match_sequence(rest, tail)
        }
    }

    /// Match an unordered container: each non-Star pattern picks a distinct
    /// element, the Star, if any, takes the rest.
    fn match_collection(&mut self, pats: &[PatRef], elems: &[NodeRef]) -> MatchResult {
        let (tree, patterns) = (self.tree, self.patterns);
        let star = pats.iter().copied().find(|&p| patterns.get(p).is_star());
        let fixed = pats.len() - usize::from(star.is_some());
        if fixed > elems.len() || (star.is_none() && fixed != elems.len()) {
            return Err(Mismatch);
        }

        let mut remaining: Elements = elems.iter().copied().collect();
        for &p in pats.iter().filter(|&&p| Some(p) != star) {
            let kind = patterns.kind(p);
            let candidates: SmallVec<[usize; 8]> = remaining
                .iter()
                .enumerate()
                .filter(|(_, e)| tree.kind(**e).is_a(kind))
                .map(|(i, _)| i)
                .collect();
            let pick = self.conjecture.choose(candidates.len()).ok_or(Mismatch)?;
            let elem = remaining.remove(candidates[pick]);
            self.match_pattern(p, elem)?;
        }

        match star.map(|s| (s, patterns.get(s))) {
            Some((s, PatternNode::Star { kind, restriction })) => {
                self.match_star(s, *kind, *restriction, &remaining)
            }
            _ => Ok(()),
        }
    }

    fn match_star(
        &mut self,
        pat: PatRef,
        kind: Kind,
        restriction: Option<PatRef>,
        elems: &[NodeRef],
    ) -> MatchResult {
        for &elem in elems {
            if !self.tree.kind(elem).is_a(kind) {
                return Err(Mismatch);
            }
            if let Some(r) = restriction
                && !self.isolated(r, elem)
            {
                return Err(Mismatch);
            }
        }
        self.bindings.bind(
            self.couplings,
            pat,
            Binding::Sequence(elems.iter().copied().collect()),
        )
    }

    fn match_stuff(
        &mut self,
        terminus: Option<PatRef>,
        recurse_restriction: Option<PatRef>,
        subject: NodeRef,
    ) -> MatchResult<NodeRef> {
        let candidates = self.stuff_candidates(subject, terminus, recurse_restriction);
        let pick = self.conjecture.choose(candidates.len()).ok_or(Mismatch)?;
        let found = candidates[pick];
        if let Some(t) = terminus {
            self.match_pattern(t, found)?;
        }
        Ok(found)
    }

    /// Possible termini under `subject`, in pre-order, `subject` included.
    ///
    /// With a recurse restriction, the children of a node are only visited
    /// if that node matches the restriction; this holds for `subject` too.
    fn stuff_candidates(
        &self,
        subject: NodeRef,
        terminus: Option<PatRef>,
        recurse_restriction: Option<PatRef>,
    ) -> Vec<NodeRef> {
        let tree = self.tree;
        let wanted = terminus.map_or(Kind::Node, |t| self.patterns.kind(t));
        let mut out = Vec::new();
        let _ = walk::<()>(tree, subject, &mut |node| {
            if tree.kind(node).is_a(wanted) && !out.contains(&node) {
                out.push(node);
            }
            if tree.is_identifier(node) {
                return ControlFlow::Continue(WalkAction::Skip);
            }
            match recurse_restriction {
                Some(r) if !self.isolated(r, node) => ControlFlow::Continue(WalkAction::Skip),
                _ => ControlFlow::Continue(WalkAction::Advance),
            }
        });
        out
    }

    /// Whether `pat` matches `subject` given the current bindings, leaving
    /// them untouched.
    fn isolated(&self, pat: PatRef, subject: NodeRef) -> bool {
        let mut conjecture = Conjecture::new();
        loop {
            conjecture.rewind();
            let matched = Attempt {
                tree: self.tree,
                patterns: self.patterns,
                couplings: self.couplings,
                ctx: self.ctx,
                conjecture: &mut conjecture,
                bindings: self.bindings.clone(),
                slaves: Vec::new(),
            }
            .match_pattern(pat, subject)
            .is_ok();
            if matched {
                return true;
            }
            if !conjecture.advance() {
                return false;
            }
        }
    }

    /// Every slave met must find at least one match inside its host.
    fn check_slaves(&self) -> MatchResult {
        for &(pat, host) in &self.slaves {
            let spec = self.patterns.slave(pat);
            let seed = Bindings::seeded(&self.bindings, spec.rule.couplings());
            if search(self.tree, self.patterns, &spec.rule, self.ctx, host, &seed).is_none() {
                tracing::trace!("slave {pat} found nothing under {host}");
                return Err(Mismatch);
            }
        }
        Ok(())
    }
}
