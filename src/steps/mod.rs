//! Ready-made transformation steps.

pub mod cleanup;
pub mod if_to_if_goto;
pub mod labels;

pub use cleanup::cleanup_nop;
pub use if_to_if_goto::{if_to_if_goto, if_to_if_goto_once};
pub use labels::{merge_adjacent_labels, remove_unused_labels};
