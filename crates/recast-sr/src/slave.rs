//! Slaves: nested search and replace hosted at a pattern position.
//!
//! A slave matches its `through` pattern at the host position like any
//! other pattern. Once the master's structural match and side condition
//! hold, the slave's own search must find at least one match inside the
//! host subtree, with the master's bindings visible to its couplings, or
//! the master attempt fails. When the master builds its replacement, the
//! host position is built first and the slave then rewrites that subtree
//! until it stops matching; the slave's output is what the master places.

use recast_tree::Kind;

use crate::engine::Rule;
use crate::pattern::PatRef;

#[derive(Debug)]
pub struct SlaveSpec {
    pub kind: Kind,
    pub through: PatRef,
    pub rule: Rule,
}
