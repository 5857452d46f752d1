//! Knowledge snapshot: an index over the context tree for side conditions.

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};

use recast_tree::{Kind, NodeRef, Tree};
use smallvec::SmallVec;

/// Per-search index over everything under a context root.
///
/// Identifiers are recorded by identity: `declarations` maps an identifier
/// to the node that introduces it, `uses` to every other node referring to
/// it.
#[derive(Debug, Default)]
pub struct Knowledge {
    order: Vec<NodeRef>,
    position: HashMap<NodeRef, usize>,
    parents: HashMap<NodeRef, NodeRef>,
    by_kind: HashMap<Kind, Vec<NodeRef>>,
    declarations: HashMap<NodeRef, NodeRef>,
    uses: HashMap<NodeRef, Vec<NodeRef>>,
    /// Values assigned to a variable, by the variable's identifier.
    assignments: HashMap<NodeRef, Vec<NodeRef>>,
    gotos: Vec<NodeRef>,
}

impl Knowledge {
    /// Index the tree under `root`.
    ///
    /// For each substitution `(old, new)`, the walk descends into `new`
    /// wherever it meets `old`. Substitutions apply in order, so a later
    /// one may replace a node an earlier one brought in. This lets a
    /// repeating step, or a slave inside a rule being replaced, see splices
    /// the caller has not written back yet.
    pub fn build(tree: &Tree, root: NodeRef, substitutions: &[(NodeRef, NodeRef)]) -> Self {
        let mut knowledge = Knowledge::default();
        let substitute = |node: NodeRef| {
            substitutions
                .iter()
                .fold(node, |node, &(old, new)| if node == old { new } else { node })
        };
        let root = substitute(root);
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            knowledge.record(tree, node);
            if tree.is_identifier(node) {
                continue;
            }
            let kind = tree.kind(node);
            let mut children = Vec::new();
            for (spec, item) in kind.schema().iter().zip(tree.items(node)) {
                for &child in item.elements() {
                    let child = substitute(child);
                    if tree.is_identifier(child) {
                        if spec.declares {
                            knowledge.declarations.insert(child, node);
                        } else {
                            knowledge.uses.entry(child).or_default().push(node);
                        }
                    } else {
                        knowledge.parents.insert(child, node);
                    }
                    children.push(child);
                }
            }
            knowledge.record_semantics(tree, node, &children);
            stack.extend(children.into_iter().rev());
        }
        tracing::trace!(
            "knowledge: indexed {} nodes under {root}",
            knowledge.order.len()
        );
        knowledge
    }

    fn record(&mut self, tree: &Tree, node: NodeRef) {
        self.position.entry(node).or_insert(self.order.len());
        self.order.push(node);
        self.by_kind.entry(tree.kind(node)).or_default().push(node);
    }

    fn record_semantics(&mut self, tree: &Tree, node: NodeRef, children: &[NodeRef]) {
        match tree.kind(node) {
            Kind::Assign => {
                if let [target, value] = *children
                    && tree.kind(target) == Kind::InstanceIdentifier
                {
                    self.assignments.entry(target).or_default().push(value);
                }
            }
            Kind::Instance => {
                if let [identifier, _, init] = *children
                    && tree.kind(init).is_a(Kind::Expression)
                {
                    self.assignments.entry(identifier).or_default().push(init);
                }
            }
            Kind::Goto => self.gotos.push(node),
            _ => {}
        }
    }

    /// Nodes in document order; identifiers appear at every reference.
    pub fn order(&self) -> &[NodeRef] {
        &self.order
    }

    /// Document position of the first visit of `node`.
    pub fn position(&self, node: NodeRef) -> Option<usize> {
        self.position.get(&node).copied()
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.position.contains_key(&node)
    }

    /// Owning parent of a non-identifier node.
    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.parents.get(&node).copied()
    }

    /// Nodes of exactly `kind`, in document order.
    pub fn of_kind(&self, kind: Kind) -> &[NodeRef] {
        match self.by_kind.get(&kind) {
            Some(nodes) => nodes,
            None => &[],
        }
    }

    pub fn declaration(&self, identifier: NodeRef) -> Option<NodeRef> {
        self.declarations.get(&identifier).copied()
    }

    pub fn uses(&self, identifier: NodeRef) -> &[NodeRef] {
        match self.uses.get(&identifier) {
            Some(nodes) => nodes,
            None => &[],
        }
    }

    pub fn gotos(&self) -> &[NodeRef] {
        &self.gotos
    }

    /// Whether jumping to `expr` can land on `label`.
    ///
    /// A variable reaches every label that any value assigned to it reaches.
    /// The walk keeps a visited set, so a cyclic chain of assignments ends
    /// in `false` instead of looping.
    pub fn can_reach(&self, tree: &Tree, expr: NodeRef, label: NodeRef) -> bool {
        let mut visited = HashSet::new();
        let mut pending = vec![expr];
        while let Some(expr) = pending.pop() {
            if expr == label {
                return true;
            }
            if tree.kind(expr) == Kind::InstanceIdentifier && visited.insert(expr) {
                if let Some(values) = self.assignments.get(&expr) {
                    pending.extend(values.iter().copied());
                }
            }
        }
        false
    }

    /// Whether any goto in the tree can land on `label`.
    pub fn is_targeted(&self, tree: &Tree, label: NodeRef) -> bool {
        self.gotos.iter().any(|&goto| {
            tree.child(goto, "destination")
                .is_some_and(|dest| self.can_reach(tree, dest, label))
        })
    }
}

/// Per-invocation state shared by every search attempt of one application.
pub struct SearchContext {
    root: NodeRef,
    substitutions: SmallVec<[(NodeRef, NodeRef); 2]>,
    knowledge: OnceCell<Knowledge>,
}

impl SearchContext {
    pub fn new(root: NodeRef) -> Self {
        Self {
            root,
            substitutions: SmallVec::new(),
            knowledge: OnceCell::new(),
        }
    }

    /// Context whose tree still holds `old` where `new` now belongs.
    pub fn with_substitution(root: NodeRef, old: NodeRef, new: NodeRef) -> Self {
        Self::new(root).substituted(old, new)
    }

    /// The same view with one more pending splice, and a fresh snapshot.
    pub fn substituted(&self, old: NodeRef, new: NodeRef) -> Self {
        let mut substitutions = self.substitutions.clone();
        if old != new {
            substitutions.push((old, new));
        }
        Self {
            root: self.root,
            substitutions,
            knowledge: OnceCell::new(),
        }
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    /// The snapshot, built on first use.
    pub fn knowledge(&self, tree: &Tree) -> &Knowledge {
        self.knowledge
            .get_or_init(|| Knowledge::build(tree, self.root, &self.substitutions))
    }

    pub fn is_built(&self) -> bool {
        self.knowledge.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `{ int p = &&A; p = q; q = p; A: B: goto p; }` with `q` undeclared.
    fn indirect(tree: &mut Tree) -> (NodeRef, [NodeRef; 4]) {
        let a = tree.label_identifier("A");
        let b = tree.label_identifier("B");
        let p = tree.instance_identifier("p");
        let q = tree.instance_identifier("q");
        let ty = tree.label_type();
        let decl = tree.instance(p, ty, a);
        let p_from_q = tree.assign(p, q);
        let q_from_p = tree.assign(q, p);
        let label_a = tree.label(a);
        let label_b = tree.label(b);
        let jump = tree.goto(p);
        let block = tree.compound([decl], [p_from_q, q_from_p, label_a, label_b, jump]);
        (block, [a, b, p, q])
    }

    #[test]
    fn reachability_follows_assignments() {
        let mut tree = Tree::new();
        let (block, [a, b, p, q]) = indirect(&mut tree);
        let knowledge = Knowledge::build(&tree, block, &[]);

        assert!(knowledge.can_reach(&tree, p, a));
        assert!(knowledge.can_reach(&tree, q, a));
        assert!(!knowledge.can_reach(&tree, p, b));
        assert!(knowledge.is_targeted(&tree, a));
        assert!(!knowledge.is_targeted(&tree, b));
    }

    #[test]
    fn cyclic_assignments_terminate() {
        let mut tree = Tree::new();
        let x = tree.instance_identifier("x");
        let y = tree.instance_identifier("y");
        let l = tree.label_identifier("L");
        let x_from_y = tree.assign(x, y);
        let y_from_x = tree.assign(y, x);
        let block = tree.compound([], [x_from_y, y_from_x]);
        let knowledge = Knowledge::build(&tree, block, &[]);
        assert!(!knowledge.can_reach(&tree, x, l));
    }

    #[test]
    fn index_records_declarations_and_parents() {
        let mut tree = Tree::new();
        let (block, [a, _, p, _]) = indirect(&mut tree);
        let knowledge = Knowledge::build(&tree, block, &[]);

        let label_a = knowledge.of_kind(Kind::Label)[0];
        assert_eq!(knowledge.declaration(a), Some(label_a));
        assert_eq!(knowledge.parent(label_a), Some(block));
        assert_eq!(knowledge.uses(p).len(), 3);
        assert_eq!(knowledge.gotos().len(), 1);
        assert_eq!(knowledge.position(block), Some(0));
    }

    #[test]
    fn substitution_redirects_the_walk() {
        let mut tree = Tree::new();
        let old = tree.nop();
        let new = tree.compound([], []);
        let block = tree.compound([], [old]);
        let knowledge = Knowledge::build(&tree, block, &[(old, new)]);
        assert!(knowledge.contains(new));
        assert!(!knowledge.contains(old));
        assert_eq!(knowledge.parent(new), Some(block));
    }

    #[test]
    fn substitutions_chain_in_order() {
        // `{ ; }` where the nop has become `{ L: }`, and that block in turn
        // `{ L: goto L; }`.
        let mut tree = Tree::new();
        let old = tree.nop();
        let block = tree.compound([], [old]);
        let l = tree.label_identifier("L");
        let first_label = tree.label(l);
        let first = tree.compound([], [first_label]);
        let second_label = tree.label(l);
        let jump = tree.goto(l);
        let second = tree.compound([], [second_label, jump]);

        let ctx = SearchContext::with_substitution(block, old, first).substituted(first, second);
        let knowledge = ctx.knowledge(&tree);
        assert!(knowledge.contains(second));
        assert!(!knowledge.contains(first));
        assert!(knowledge.is_targeted(&tree, l));
        assert_eq!(knowledge.parent(second), Some(block));
    }

    #[test]
    fn snapshot_is_lazy() {
        let mut tree = Tree::new();
        let block = tree.compound([], []);
        let ctx = SearchContext::new(block);
        assert!(!ctx.is_built());
        assert_eq!(ctx.knowledge(&tree).order(), &[block]);
        assert!(ctx.is_built());
    }
}
