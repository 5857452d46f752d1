//! Search and replace over recast program trees.
//!
//! A step is a [`CompareReplace`]: a [`Rule`] of search and replace
//! patterns over its own [`Patterns`] arena. Searching is a backtracking
//! match that produces [`Bindings`]; replacing builds the replace pattern
//! from them and splices the result in for the region root.
//!
//! ```text
//! Patterns ──► Rule ──► CompareReplace::apply
//!                          │
//!                          ├─ matcher: Conjecture + Couplings + Condition
//!                          └─ replace: Bindings ──► new region root
//! ```

pub mod binding;
pub mod config;
pub mod conjecture;
pub mod coupling;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod knowledge;
mod matcher;
pub mod pattern;
mod replace;
pub mod slave;
pub mod symbolic;

pub use binding::{Binding, Bindings};
pub use config::{OnExceed, RepetitionLimit};
pub use coupling::{Couplings, GroupId};
pub use engine::{CompareReplace, Rule, Step};
pub use errors::{MatchResult, Mismatch, StepError, StepErrorKind, StepResult};
pub use graph::{GraphInfo, GraphLink, Graphable, to_dot};
pub use knowledge::{Knowledge, SearchContext};
pub use pattern::{GrammarBuilder, PatRef, PatternItem, PatternNode, Patterns};
pub use slave::SlaveSpec;
pub use symbolic::{BoolExpr, Condition, EvalKit, FnPredicate, LabelIsTargeted, Predicate, ReachesLabel};
