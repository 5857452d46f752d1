//! Running steps in sequence.
//!
//! ## Example
//!
//! ```
//! use recast::Pipeline;
//! use recast_tree::{Tree, print_tree};
//!
//! let mut tree = Tree::new();
//! let x = tree.instance_identifier("x");
//! let keep = tree.nop();
//! let drop = tree.nop();
//! let skip = tree.nop();
//! let body = tree.compound([], [keep, drop]);
//! let cond = tree.if_stmt(x, body, skip);
//! let block = tree.compound([], [cond]);
//!
//! let mut root = block;
//! let report = Pipeline::standard().run(&mut tree, &mut root).unwrap();
//! assert_eq!(report.applied.len(), 5);
//! assert!(!print_tree(&tree, root).contains("else"));
//! ```

use recast_sr::{Step, StepError, StepErrorKind};
use recast_tree::{NodeRef, Tree};

use crate::steps;

/// What a [`Pipeline::run`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Steps that completed, in order.
    pub applied: Vec<String>,
    /// Steps that reported `NoMatch` and were passed over.
    pub skipped: Vec<String>,
}

/// An ordered list of steps applied to one tree.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower every `if` to conditional gotos, then tidy labels and nops.
    ///
    /// Nops go first so that labels they separate become adjacent, and
    /// again last to sweep up the labels that were removed.
    pub fn standard() -> Self {
        Self::new()
            .add_step(steps::if_to_if_goto())
            .add_step(steps::cleanup_nop())
            .add_step(steps::merge_adjacent_labels())
            .add_step(steps::remove_unused_labels())
            .add_step(steps::cleanup_nop())
    }

    pub fn add_step<S>(mut self, step: S) -> Self
    where
        S: Step + 'static,
    {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Apply each step to the whole tree under `root`.
    ///
    /// A step that finds nothing to do is skipped. Any other failure stops
    /// the run; `root` then holds the result of the steps before it.
    ///
    /// Superseded nodes stay in `tree`; see [`Tree::compact`].
    pub fn run(&self, tree: &mut Tree, root: &mut NodeRef) -> Result<PipelineReport, StepError> {
        let mut report = PipelineReport::default();
        for step in &self.steps {
            let name = step.name().to_owned();
            let _span = tracing::debug_span!("step", name = %name).entered();
            match step.apply(tree, *root, root) {
                Ok(()) => {
                    tracing::debug!(nodes = tree.len(), "step applied");
                    report.applied.push(name);
                }
                Err(err) if matches!(err.kind(), StepErrorKind::NoMatch { .. }) => {
                    tracing::debug!("no match, skipping");
                    report.skipped.push(name);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "step failed");
                    return Err(err);
                }
            }
            debug_assert!(
                recast_tree::validate(tree, *root).is_ok(),
                "step `{}` left an invalid tree",
                step.name()
            );
        }
        Ok(report)
    }
}
