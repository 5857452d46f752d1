//! Repetition-limit configuration.
//!
//! ```json
//! { "max_repetitions": 100, "on_exceed": "silent" }
//! ```

use serde::{Deserialize, Serialize};

/// What to do when a repeating step still matches at its limit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnExceed {
    /// Abort the step with `StepErrorKind::RepetitionLimitExceeded`.
    #[default]
    Error,
    /// Log a warning and keep the tree as it is after the last application.
    Silent,
}

/// Bound on how many times a step re-applies before it must reach a fixpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepetitionLimit {
    pub max_repetitions: usize,
    #[serde(default)]
    pub on_exceed: OnExceed,
}

impl RepetitionLimit {
    /// Limit used for slaves that do not configure their own.
    pub const DEFAULT_MAX_REPETITIONS: usize = 100;

    pub fn error(max_repetitions: usize) -> Self {
        Self {
            max_repetitions,
            on_exceed: OnExceed::Error,
        }
    }

    pub fn silent(max_repetitions: usize) -> Self {
        Self {
            max_repetitions,
            on_exceed: OnExceed::Silent,
        }
    }
}

impl Default for RepetitionLimit {
    fn default() -> Self {
        Self::error(Self::DEFAULT_MAX_REPETITIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full() {
        let limit: RepetitionLimit =
            serde_json::from_str(r#"{"max_repetitions": 7, "on_exceed": "silent"}"#).unwrap();
        assert_eq!(limit, RepetitionLimit::silent(7));
    }

    #[test]
    fn on_exceed_defaults_to_error() {
        let limit: RepetitionLimit = serde_json::from_str(r#"{"max_repetitions": 2}"#).unwrap();
        assert_eq!(limit, RepetitionLimit::error(2));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = serde_json::from_str::<RepetitionLimit>(
            r#"{"max_repetitions": 2, "on_exceed": "panic"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown variant `panic`"), "{err}");
    }
}
