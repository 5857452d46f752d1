//! Side conditions: lazily built Boolean expressions over predicates.
//!
//! A predicate fails the same way a structural match does, by returning
//! [`Mismatch`], so the matcher backtracks over semantic failures exactly as
//! it does over structural ones.

use std::cell::OnceCell;
use std::fmt;

use recast_tree::{NodeRef, Tree};
use smallvec::SmallVec;

use crate::binding::Bindings;
use crate::errors::{MatchResult, Mismatch};
use crate::knowledge::Knowledge;
use crate::pattern::PatRef;

/// Everything a predicate may look at.
pub struct EvalKit<'a> {
    pub tree: &'a Tree,
    pub bindings: &'a Bindings,
    pub knowledge: &'a Knowledge,
}

impl EvalKit<'_> {
    /// The node bound to an input.
    pub fn node(&self, pat: PatRef) -> MatchResult<NodeRef> {
        self.bindings.node(pat).ok_or(Mismatch)
    }
}

/// A leaf of a side condition.
pub trait Predicate {
    fn name(&self) -> &str;

    /// Pattern nodes that must be bound before the predicate can run.
    fn inputs(&self) -> SmallVec<[PatRef; 2]>;

    fn evaluate(&self, kit: &EvalKit<'_>) -> MatchResult;
}

/// Boolean operator tree over predicates.
pub enum BoolExpr {
    And(Vec<BoolExpr>),
    Or(Vec<BoolExpr>),
    Not(Box<BoolExpr>),
    Leaf(Box<dyn Predicate>),
}

impl BoolExpr {
    pub fn leaf(predicate: impl Predicate + 'static) -> Self {
        BoolExpr::Leaf(Box::new(predicate))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: BoolExpr) -> Self {
        BoolExpr::Not(Box::new(expr))
    }

    /// Evaluate against a tentative binding.
    ///
    /// If any leaf anywhere in the expression has an unbound input, the
    /// whole expression is a mismatch, whatever operators enclose the leaf.
    pub fn evaluate(&self, kit: &EvalKit<'_>) -> MatchResult {
        if let Some(missing) = self
            .inputs()
            .into_iter()
            .find(|&pat| kit.bindings.get(pat).is_none())
        {
            tracing::trace!("condition {self}: input {missing} is unbound");
            return Err(Mismatch);
        }
        self.evaluate_bound(kit)
    }

    fn evaluate_bound(&self, kit: &EvalKit<'_>) -> MatchResult {
        match self {
            BoolExpr::And(operands) => operands.iter().try_for_each(|op| op.evaluate_bound(kit)),
            BoolExpr::Or(operands) => {
                if operands.iter().any(|op| op.evaluate_bound(kit).is_ok()) {
                    Ok(())
                } else {
                    Err(Mismatch)
                }
            }
            BoolExpr::Not(operand) => match operand.evaluate_bound(kit) {
                Ok(()) => Err(Mismatch),
                Err(Mismatch) => Ok(()),
            },
            BoolExpr::Leaf(predicate) => predicate.evaluate(kit),
        }
    }

    /// Every input of every leaf.
    pub fn inputs(&self) -> Vec<PatRef> {
        let mut out = Vec::new();
        self.collect_inputs(&mut out);
        out
    }

    fn collect_inputs(&self, out: &mut Vec<PatRef>) {
        match self {
            BoolExpr::And(operands) | BoolExpr::Or(operands) => {
                for op in operands {
                    op.collect_inputs(out);
                }
            }
            BoolExpr::Not(operand) => operand.collect_inputs(out),
            BoolExpr::Leaf(predicate) => out.extend(predicate.inputs()),
        }
    }
}

impl fmt::Display for BoolExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, operands: &[BoolExpr], sep: &str| {
            write!(f, "(")?;
            for (i, op) in operands.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{op}")?;
            }
            write!(f, ")")
        };
        match self {
            BoolExpr::And(operands) => join(f, operands, "&&"),
            BoolExpr::Or(operands) => join(f, operands, "||"),
            BoolExpr::Not(operand) => write!(f, "!{operand}"),
            BoolExpr::Leaf(predicate) => {
                write!(f, "{}(", predicate.name())?;
                for (i, input) in predicate.inputs().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{input}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Debug for BoolExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A side condition, built on first evaluation and kept for the life of
/// its step.
pub struct Condition {
    build: Box<dyn Fn() -> BoolExpr>,
    expr: OnceCell<BoolExpr>,
}

impl Condition {
    pub fn new(build: impl Fn() -> BoolExpr + 'static) -> Self {
        Self {
            build: Box::new(build),
            expr: OnceCell::new(),
        }
    }

    pub fn expr(&self) -> &BoolExpr {
        self.expr.get_or_init(|| (self.build)())
    }

    pub fn is_built(&self) -> bool {
        self.expr.get().is_some()
    }

    pub fn evaluate(&self, kit: &EvalKit<'_>) -> MatchResult {
        self.expr().evaluate(kit)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr.get() {
            Some(expr) => write!(f, "Condition({expr})"),
            None => write!(f, "Condition(<unbuilt>)"),
        }
    }
}

// ============================================================================
// Built-in predicates
// ============================================================================

/// Control flow jumping to `expr` can land on `label`.
pub struct ReachesLabel {
    pub label: PatRef,
    pub expr: PatRef,
}

impl Predicate for ReachesLabel {
    fn name(&self) -> &str {
        "ReachesLabel"
    }

    fn inputs(&self) -> SmallVec<[PatRef; 2]> {
        SmallVec::from_slice(&[self.label, self.expr])
    }

    fn evaluate(&self, kit: &EvalKit<'_>) -> MatchResult {
        let label = kit.node(self.label)?;
        let expr = kit.node(self.expr)?;
        if kit.knowledge.can_reach(kit.tree, expr, label) {
            Ok(())
        } else {
            Err(Mismatch)
        }
    }
}

/// Some goto in the context tree can land on `label`.
pub struct LabelIsTargeted {
    pub label: PatRef,
}

impl Predicate for LabelIsTargeted {
    fn name(&self) -> &str {
        "LabelIsTargeted"
    }

    fn inputs(&self) -> SmallVec<[PatRef; 2]> {
        SmallVec::from_slice(&[self.label])
    }

    fn evaluate(&self, kit: &EvalKit<'_>) -> MatchResult {
        let label = kit.node(self.label)?;
        if kit.knowledge.is_targeted(kit.tree, label) {
            Ok(())
        } else {
            Err(Mismatch)
        }
    }
}

/// Predicate from a closure.
pub struct FnPredicate<F> {
    name: &'static str,
    inputs: SmallVec<[PatRef; 2]>,
    f: F,
}

impl<F> FnPredicate<F>
where
    F: Fn(&EvalKit<'_>) -> MatchResult,
{
    pub fn new(name: &'static str, inputs: impl IntoIterator<Item = PatRef>, f: F) -> Self {
        Self {
            name,
            inputs: inputs.into_iter().collect(),
            f,
        }
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&EvalKit<'_>) -> MatchResult,
{
    fn name(&self) -> &str {
        self.name
    }

    fn inputs(&self) -> SmallVec<[PatRef; 2]> {
        self.inputs.clone()
    }

    fn evaluate(&self, kit: &EvalKit<'_>) -> MatchResult {
        (self.f)(kit)
    }
}
