//! Program tree for the recast transformer.
//!
//! Nodes live in an arena ([`Tree`]) and refer to their children by
//! [`NodeRef`]. Every kind exposes its children generically as an ordered
//! list of items, so pattern matching and duplication can work on any node
//! without knowing its concrete kind.

pub mod compact;
pub mod compare;
pub mod construct;
pub mod duplicate;
pub mod kind;
pub mod node;
pub mod printer;
pub mod refs;
pub mod symbol;
pub mod tree;
pub mod validation;
pub mod walk;

pub use compare::simple_compare;
pub use duplicate::Terminus;
pub use kind::{ItemShape, ItemSpec, Kind, KindRelation, KindSet, PayloadShape};
pub use node::{BinaryOp, Elements, Item, NodeData, NodeDataBuilder, Payload};
pub use printer::{print_expr, print_tree};
pub use refs::NodeRef;
pub use symbol::Symbol;
pub use tree::{ContainerMut, Tree};
pub use validation::{TreeError, ValidationResult, validate};
pub use walk::{WalkAction, descendants, find, walk};

// Re-export smallvec for pattern builders in downstream crates
pub use smallvec;
