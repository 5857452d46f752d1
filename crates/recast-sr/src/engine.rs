//! Search-and-replace engines and the step interface.

use recast_tree::{Kind, NodeRef, Tree};

use crate::binding::Bindings;
use crate::config::{OnExceed, RepetitionLimit};
use crate::coupling::Couplings;
use crate::errors::{StepError, StepResult};
use crate::knowledge::SearchContext;
use crate::matcher;
use crate::pattern::{PatRef, PatternNode, Patterns};
use crate::replace::{Outer, Replacer};
use crate::symbolic::{BoolExpr, Condition};

/// A transformation step.
pub trait Step {
    fn name(&self) -> &str;

    /// Rewrite the region under `root`, writing the new region root back.
    ///
    /// `context` is the whole tree the region belongs to; side conditions
    /// look at it. It may equal `*root`.
    fn apply(&self, tree: &mut Tree, context: NodeRef, root: &mut NodeRef) -> StepResult;
}

/// A search pattern, a replace pattern and what ties them together.
#[derive(Debug)]
pub struct Rule {
    search: PatRef,
    replace: PatRef,
    couplings: Couplings,
    condition: Option<Condition>,
    limit: Option<RepetitionLimit>,
}

impl Rule {
    /// Match `search` at the region root and build `replace` in its place.
    pub fn new(search: PatRef, replace: PatRef) -> Self {
        Self {
            search,
            replace,
            couplings: Couplings::default(),
            condition: None,
            limit: None,
        }
    }

    /// Match `search` anywhere under the region root and build `replace` at
    /// the position found.
    pub fn search_replace(patterns: &mut Patterns, search: PatRef, replace: PatRef) -> Self {
        let overlay = patterns.overlay(search, replace);
        let root = patterns.stuff(Kind::Node, overlay);
        Self::new(root, root)
    }

    pub fn with_couplings<G, I>(mut self, groups: G) -> Self
    where
        G: IntoIterator<Item = I>,
        I: IntoIterator<Item = PatRef>,
    {
        for group in groups {
            self.couplings.add(group);
        }
        self
    }

    /// Side condition checked after every structural match. `build` runs
    /// once, on first evaluation.
    pub fn with_condition(mut self, build: impl Fn() -> BoolExpr + 'static) -> Self {
        self.condition = Some(Condition::new(build));
        self
    }

    /// Re-apply until the search stops matching, at most `limit` times.
    pub fn with_repetition(mut self, limit: RepetitionLimit) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn search(&self) -> PatRef {
        self.search
    }

    pub fn replace(&self) -> PatRef {
        self.replace
    }

    pub fn couplings(&self) -> &Couplings {
        &self.couplings
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn limit(&self) -> Option<RepetitionLimit> {
        self.limit
    }
}

/// A named search-and-replace step over its own pattern arena.
///
/// Without a repetition limit the step applies exactly once and reports
/// `NoMatch` if its search finds nothing. With one, it re-applies until the
/// search stops matching; zero applications is fine.
#[derive(Debug)]
pub struct CompareReplace {
    name: String,
    patterns: Patterns,
    rule: Rule,
}

impl CompareReplace {
    /// # Panics
    ///
    /// Panics if a builder occurs on a search side, or a coupling member
    /// occurs in neither pattern of its rule (nor, for a slave, in its
    /// master's patterns).
    pub fn new(name: impl Into<String>, patterns: Patterns, rule: Rule) -> Self {
        let name = name.into();
        check_rule(&name, &patterns, &rule, &[]);
        Self {
            name,
            patterns,
            rule,
        }
    }

    /// [`Rule::search_replace`] as a step.
    pub fn search_replace(
        name: impl Into<String>,
        mut patterns: Patterns,
        search: PatRef,
        replace: PatRef,
        configure: impl FnOnce(Rule) -> Rule,
    ) -> Self {
        let rule = configure(Rule::search_replace(&mut patterns, search, replace));
        Self::new(name, patterns, rule)
    }

    pub fn patterns(&self) -> &Patterns {
        &self.patterns
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// First match under `root`, without changing anything.
    pub fn search(&self, tree: &Tree, context: NodeRef, root: NodeRef) -> Option<Bindings> {
        let ctx = SearchContext::new(context);
        let seed = Bindings::new(self.rule.couplings());
        matcher::search(tree, &self.patterns, &self.rule, &ctx, root, &seed)
    }

    /// Apply the step and report how many times it applied.
    pub fn apply_counted(
        &self,
        tree: &mut Tree,
        context: NodeRef,
        root: &mut NodeRef,
    ) -> StepResult<usize> {
        run_rule(
            tree,
            &self.patterns,
            &self.rule,
            &self.name,
            &SearchContext::new(context),
            root,
            self.rule.limit(),
            None,
        )
    }
}

impl Step for CompareReplace {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, tree: &mut Tree, context: NodeRef, root: &mut NodeRef) -> StepResult {
        self.apply_counted(tree, context, root).map(|_| ())
    }
}

/// Search and splice, once or until a fixpoint.
///
/// The splice only replaces `*root`; the caller owns the slot that points
/// at the region and writes `*root` back into it. Until then the context
/// tree still holds the old region, so later searches see `context` with
/// the new region substituted for the old one.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_rule(
    tree: &mut Tree,
    patterns: &Patterns,
    rule: &Rule,
    name: &str,
    context: &SearchContext,
    root: &mut NodeRef,
    limit: Option<RepetitionLimit>,
    outer: Option<&Outer<'_>>,
) -> StepResult<usize> {
    let original = *root;
    let mut applied = 0usize;
    let seed = match outer {
        Some(outer) => Bindings::seeded(outer.bindings, rule.couplings()),
        None => Bindings::new(rule.couplings()),
    };

    loop {
        let ctx = context.substituted(original, *root);
        let Some(bindings) = matcher::search(tree, patterns, rule, &ctx, *root, &seed) else {
            break;
        };

        if let Some(limit) = limit
            && applied == limit.max_repetitions
        {
            match limit.on_exceed {
                OnExceed::Error => {
                    return Err(StepError::repetition_limit_exceeded(
                        name,
                        limit.max_repetitions,
                    ));
                }
                OnExceed::Silent => {
                    tracing::warn!(
                        "{name}: still matching after {} repetitions, stopping",
                        limit.max_repetitions
                    );
                    return Ok(applied);
                }
            }
        }

        let replacement =
            Replacer::new(tree, patterns, rule.couplings(), &bindings, &ctx, *root, name, outer)
                .run(rule.replace())?;
        tracing::debug!(
            "{name}: application {} replaced {} with {replacement}",
            applied + 1,
            *root
        );
        *root = replacement;
        applied += 1;

        if limit.is_none() {
            break;
        }
    }

    if applied == 0 && limit.is_none() {
        return Err(StepError::no_match(name));
    }
    Ok(applied)
}

// ============================================================================
// Construction checks
// ============================================================================

/// `outer` holds every pattern of the enclosing rules, for slave couplings.
fn check_rule(name: &str, patterns: &Patterns, rule: &Rule, outer: &[PatRef]) {
    let search_side = patterns.search_side(rule.search);
    if let Some(builder) = search_side
        .iter()
        .find(|&&p| patterns.get(p).is_builder())
    {
        panic!("invariant violation: {name}: builder {builder} occurs in the search pattern");
    }

    let mut known = patterns.reachable(rule.search);
    for p in patterns.reachable(rule.replace) {
        if !known.contains(&p) {
            known.push(p);
        }
    }
    for member in rule.couplings.all_members() {
        assert!(
            known.contains(&member) || outer.contains(&member),
            "invariant violation: {name}: coupling member {member} occurs in no pattern of the rule"
        );
    }

    let mut enclosing = outer.to_vec();
    enclosing.extend(known.iter().copied());
    for &p in &known {
        if let PatternNode::Slave(spec) = patterns.get(p) {
            check_rule(&format!("{name}/{p}"), patterns, &spec.rule, &enclosing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "occurs in the search pattern")]
    fn builder_on_search_side_is_rejected() {
        let mut p = Patterns::new();
        let fresh = p.build_identifier(Kind::LabelIdentifier, "L", []);
        let search = p.grammar(Kind::Goto).child("destination", fresh).build();
        let replace = p.any(Kind::Statement);
        CompareReplace::new("Bad", p, Rule::new(search, replace));
    }

    #[test]
    fn builder_inside_overlay_is_replace_side() {
        let mut p = Patterns::new();
        let fresh = p.build_identifier(Kind::LabelIdentifier, "L", []);
        let search = p.any(Kind::Nop);
        let replace = p.grammar(Kind::Goto).child("destination", fresh).build();
        CompareReplace::search_replace("NopToGoto", p, search, replace, |r| r);
    }

    #[test]
    #[should_panic(expected = "occurs in no pattern of the rule")]
    fn dangling_coupling_member_is_rejected() {
        let mut p = Patterns::new();
        let search = p.any(Kind::Nop);
        let stray = p.any(Kind::Nop);
        let other = p.any(Kind::Nop);
        CompareReplace::new(
            "Dangling",
            p,
            Rule::new(search, search).with_couplings([[stray, other]]),
        );
    }

    #[test]
    fn slave_couplings_may_reach_into_the_master() {
        let mut p = Patterns::new();
        let label = p.any(Kind::LabelIdentifier);
        let dest = p.any(Kind::LabelIdentifier);
        let goto = p.grammar(Kind::Goto).child("destination", dest).build();
        let nop = p.any(Kind::Nop);
        let slave_rule = Rule::search_replace(&mut p, goto, nop).with_couplings([[dest, label]]);
        let through = p.any(Kind::Compound);
        let host = p.host_slave(through, slave_rule);
        let decl = p.grammar(Kind::Label).child("identifier", label).build();
        let search = p.grammar(Kind::Compound).sequence("statements", [decl]).build();
        let body = p.match_all(Kind::Compound, [host, search]);
        CompareReplace::new("SlaveCoupling", p, Rule::new(body, body));
    }
}
