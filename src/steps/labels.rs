//! Label cleanups.
//!
//! - [`merge_adjacent_labels`]: `A: B:` becomes `A:`, and every `goto B`
//!   in the enclosing function becomes `goto A`. The retargeting is a slave
//!   hosted at the function, so it reaches gotos at any depth.
//! - [`remove_unused_labels`]: a label no goto can reach becomes a nop.

use recast_sr::{BoolExpr, CompareReplace, LabelIsTargeted, Patterns, RepetitionLimit, Rule};
use recast_tree::Kind;

pub const MERGE_ADJACENT_LABELS: &str = "MergeAdjacentLabels";
pub const REMOVE_UNUSED_LABELS: &str = "RemoveUnusedLabels";

pub fn merge_adjacent_labels() -> CompareReplace {
    let mut p = Patterns::new();

    let kept = p.any(Kind::LabelIdentifier);
    let dropped = p.any(Kind::LabelIdentifier);
    let kept_decl = p.grammar(Kind::Label).child("identifier", kept).build();
    let dropped_decl = p.grammar(Kind::Label).child("identifier", dropped).build();
    let before = p.star(Kind::Statement);
    let after = p.star(Kind::Statement);
    let adjacent = p
        .grammar(Kind::Compound)
        .sequence("statements", [before, kept_decl, dropped_decl, after])
        .build();
    let merged = p
        .grammar(Kind::Compound)
        .sequence("statements", [before, kept_decl, after])
        .build();
    let merge = p.overlay(adjacent, merged);
    let somewhere = p.stuff(Kind::Statement, merge);
    let function = p.grammar(Kind::Function).child("body", somewhere).build();

    // Slave: inside the rebuilt function, `goto dropped` => `goto kept`.
    let destination = p.any(Kind::LabelIdentifier);
    let old_jump = p
        .grammar(Kind::Goto)
        .child("destination", destination)
        .build();
    let new_jump = p.grammar(Kind::Goto).child("destination", kept).build();
    let retarget =
        Rule::search_replace(&mut p, old_jump, new_jump).with_couplings([[destination, dropped]]);
    let host = p.host_slave(function, retarget);

    let root = p.stuff(Kind::Node, host);
    let rule = Rule::new(root, root).with_repetition(RepetitionLimit::default());
    CompareReplace::new(MERGE_ADJACENT_LABELS, p, rule)
}

pub fn remove_unused_labels() -> CompareReplace {
    let mut p = Patterns::new();
    let identifier = p.any(Kind::LabelIdentifier);
    let label = p.grammar(Kind::Label).child("identifier", identifier).build();
    let nop = p.any(Kind::Nop);
    CompareReplace::search_replace(REMOVE_UNUSED_LABELS, p, label, nop, |rule| {
        rule.with_repetition(RepetitionLimit::default())
            .with_condition(move || {
                BoolExpr::not(BoolExpr::leaf(LabelIsTargeted { label: identifier }))
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recast_sr::Step;
    use recast_tree::{NodeRef, Tree, print_tree, validate};

    /// `void f() { A: B: goto B; { goto B; } goto A; }`
    fn two_labels(tree: &mut Tree) -> NodeRef {
        let f = tree.instance_identifier("f");
        let void = tree.void_type();
        let a = tree.label_identifier("A");
        let b = tree.label_identifier("B");
        let label_a = tree.label(a);
        let label_b = tree.label(b);
        let to_b = tree.goto(b);
        let nested_to_b = tree.goto(b);
        let nested = tree.compound([], [nested_to_b]);
        let to_a = tree.goto(a);
        let body = tree.compound([], [label_a, label_b, to_b, nested, to_a]);
        let func = tree.function(f, void, [], body);
        tree.program([func])
    }

    #[test]
    fn adjacent_labels_merge_and_gotos_follow() {
        let mut tree = Tree::new();
        let program = two_labels(&mut tree);

        let mut root = program;
        let applied = merge_adjacent_labels()
            .apply_counted(&mut tree, program, &mut root)
            .unwrap();
        assert_eq!(applied, 1);

        insta::assert_snapshot!(print_tree(&tree, root), @r"
        void f()
        {
          A:
          goto A;
          {
            goto A;
          }
          goto A;
        }
        ");
        let result = validate(&tree, root);
        assert!(result.is_ok(), "{result}");
    }

    #[test]
    fn merge_needs_a_goto_to_retarget() {
        // With nothing jumping to B the slave finds nothing, so the master
        // does not match either.
        let mut tree = Tree::new();
        let f = tree.instance_identifier("f");
        let void = tree.void_type();
        let a = tree.label_identifier("A");
        let b = tree.label_identifier("B");
        let label_a = tree.label(a);
        let label_b = tree.label(b);
        let body = tree.compound([], [label_a, label_b]);
        let func = tree.function(f, void, [], body);
        let program = tree.program([func]);

        let mut root = program;
        let applied = merge_adjacent_labels()
            .apply_counted(&mut tree, program, &mut root)
            .unwrap();
        assert_eq!(applied, 0);
        assert_eq!(root, program);
    }

    #[test]
    fn only_untargeted_labels_are_removed() {
        let mut tree = Tree::new();
        let a = tree.label_identifier("A");
        let b = tree.label_identifier("B");
        let label_a = tree.label(a);
        let label_b = tree.label(b);
        let jump = tree.goto(a);
        let block = tree.compound([], [label_a, label_b, jump]);

        let step = remove_unused_labels();
        assert_eq!(step.name(), REMOVE_UNUSED_LABELS);
        let mut root = block;
        step.apply(&mut tree, block, &mut root).unwrap();

        insta::assert_snapshot!(print_tree(&tree, root), @r"
        {
          A:
          ;
          goto A;
        }
        ");
    }
}
