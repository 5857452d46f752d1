//! Error types for search and replace.
//!
//! There are two channels. [`Mismatch`] is the ordinary backtracking signal:
//! a structural, coupling or side-condition failure, always caught by the
//! matcher. [`StepError`] is what a whole step reports to its caller.
//! Broken invariants are neither: they panic.

use derive_more::{Display, Error, From};

/// A candidate binding failed; backtrack to the last choice point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Error)]
#[display("mismatch")]
pub struct Mismatch;

pub type MatchResult<T = ()> = Result<T, Mismatch>;

pub type StepResult<T = ()> = Result<T, StepError>;

#[derive(Display, Debug, From)]
#[display("{kind}")]
pub struct StepError {
    #[from]
    kind: Box<StepErrorKind>,
}

impl std::error::Error for StepError {}

impl From<StepErrorKind> for StepError {
    fn from(kind: StepErrorKind) -> Self {
        StepError {
            kind: Box::new(kind),
        }
    }
}

impl StepError {
    pub fn kind(&self) -> &StepErrorKind {
        &self.kind
    }

    pub(crate) fn no_match(step: &str) -> Self {
        StepErrorKind::NoMatch {
            step: step.to_owned(),
        }
        .into()
    }

    pub(crate) fn repetition_limit_exceeded(step: &str, limit: usize) -> Self {
        StepErrorKind::RepetitionLimitExceeded {
            step: step.to_owned(),
            limit,
        }
        .into()
    }
}

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum StepErrorKind {
    /// The step applies exactly once and its search found nothing.
    #[display("step `{step}` found no match")]
    NoMatch { step: String },

    /// The search still matched after the configured number of applications.
    #[display("step `{step}` still matches after {limit} repetitions")]
    RepetitionLimitExceeded { step: String, limit: usize },
}
