//! Lowering `if`/`else` on a whole program.

use recast::steps::{if_to_if_goto, if_to_if_goto_once};
use recast::{Pipeline, PipelineReport};
use recast_sr::{Step, StepErrorKind};
use recast_tree::{Kind, NodeRef, Tree, descendants, print_tree, validate};

struct Program {
    root: NodeRef,
    then_block: NodeRef,
    else_block: NodeRef,
}

/// `void f() { int x; int y; int z; if (x) { y; } else { z; } }`
fn program(tree: &mut Tree) -> Program {
    let f = tree.instance_identifier("f");
    let void = tree.void_type();
    let mut decls = Vec::new();
    let mut ids = Vec::new();
    for name in ["x", "y", "z"] {
        let id = tree.instance_identifier(name);
        let ty = tree.int_type(32);
        let uninit = tree.uninitialised();
        decls.push(tree.instance(id, ty, uninit));
        ids.push(id);
    }
    let then_block = tree.compound([], [ids[1]]);
    let else_block = tree.compound([], [ids[2]]);
    let cond = tree.if_stmt(ids[0], then_block, else_block);
    let body = tree.compound(decls, [cond]);
    let func = tree.function(f, void, [], body);
    Program {
        root: tree.program([func]),
        then_block,
        else_block,
    }
}

/// Label identifiers that are declared somewhere under `root`.
fn declared_labels(tree: &Tree, root: NodeRef) -> Vec<NodeRef> {
    descendants(tree, root)
        .into_iter()
        .filter(|&n| tree.kind(n) == Kind::Label)
        .filter_map(|n| tree.child(n, "identifier"))
        .collect()
}

fn count_jumps_to(tree: &Tree, root: NodeRef, label: NodeRef) -> usize {
    descendants(tree, root)
        .into_iter()
        .filter(|&n| tree.kind(n) == Kind::Goto && tree.child(n, "destination") == Some(label))
        .count()
}

const LOWERED: &str = "\
void f()
{
  int x;
  int y;
  int z;
  {
    if (!x)
      goto ELSE;
    {
      y;
    }
    goto END;
    ELSE:
    {
      z;
    }
    END:
  }
}
";

#[test]
fn if_else_becomes_conditional_gotos() {
    let mut tree = Tree::new();
    let input = program(&mut tree);
    assert!(declared_labels(&tree, input.root).is_empty());

    let mut root = input.root;
    let step = if_to_if_goto();
    step.apply(&mut tree, input.root, &mut root).unwrap();

    assert_eq!(print_tree(&tree, root), LOWERED);
    let result = validate(&tree, root);
    assert!(result.is_ok(), "{result}");

    let labels = declared_labels(&tree, root);
    assert_eq!(labels.len(), 2);
    assert_ne!(labels[0], labels[1]);
    for label in labels {
        assert_eq!(count_jumps_to(&tree, root, label), 1);
    }

    // Both branches are moved, not copied.
    let reachable = descendants(&tree, root);
    assert!(reachable.contains(&input.then_block));
    assert!(reachable.contains(&input.else_block));
}

#[test]
fn lowered_if_is_left_alone() {
    let mut tree = Tree::new();
    let input = program(&mut tree);
    let mut root = input.root;
    if_to_if_goto().apply(&mut tree, input.root, &mut root).unwrap();
    let lowered = root;

    // Only the `if (!x) goto ELSE;` is left, and it already has that shape.
    let err = if_to_if_goto_once()
        .apply(&mut tree, lowered, &mut root)
        .unwrap_err();
    assert!(matches!(err.kind(), StepErrorKind::NoMatch { .. }));
    assert_eq!(root, lowered);
}

#[test]
fn standard_pipeline_on_if_else() {
    let mut tree = Tree::new();
    let input = program(&mut tree);
    let mut root = input.root;

    let report = Pipeline::standard().run(&mut tree, &mut root).unwrap();
    assert_eq!(
        report,
        PipelineReport {
            applied: vec![
                "IfToIfGoto".to_owned(),
                "CleanupNop".to_owned(),
                "MergeAdjacentLabels".to_owned(),
                "RemoveUnusedLabels".to_owned(),
                "CleanupNop".to_owned(),
            ],
            skipped: vec![],
        }
    );
    assert_eq!(print_tree(&tree, root), LOWERED);
}

#[test]
fn pipeline_merges_the_labels_of_an_if_without_else() {
    // `void f() { int x; if (x) { x = 1; } }`
    let mut tree = Tree::new();
    let f = tree.instance_identifier("f");
    let void = tree.void_type();
    let x = tree.instance_identifier("x");
    let ty = tree.int_type(32);
    let uninit = tree.uninitialised();
    let decl = tree.instance(x, ty, uninit);
    let one = tree.integer(1);
    let assign = tree.assign(x, one);
    let then_block = tree.compound([], [assign]);
    let nothing = tree.nop();
    let cond = tree.if_stmt(x, then_block, nothing);
    let body = tree.compound([decl], [cond]);
    let func = tree.function(f, void, [], body);
    let program = tree.program([func]);

    // With the empty else gone, `ELSE:` and `END:` are adjacent and `END`
    // folds into `ELSE`.
    let mut root = program;
    Pipeline::standard().run(&mut tree, &mut root).unwrap();
    insta::assert_snapshot!(print_tree(&tree, root), @r"
    void f()
    {
      int x;
      {
        if (!x)
          goto ELSE;
        {
          x = 1;
        }
        goto ELSE;
        ELSE:
      }
    }
    ");
    let result = validate(&tree, root);
    assert!(result.is_ok(), "{result}");
}

#[test]
fn nested_ifs_get_distinct_label_names() {
    // `void f() { int x; int y; if (x) { if (y) { x = 1; } } }`
    let mut tree = Tree::new();
    let f = tree.instance_identifier("f");
    let void = tree.void_type();
    let mut decls = Vec::new();
    let mut ids = Vec::new();
    for name in ["x", "y"] {
        let id = tree.instance_identifier(name);
        let ty = tree.int_type(32);
        let uninit = tree.uninitialised();
        decls.push(tree.instance(id, ty, uninit));
        ids.push(id);
    }
    let one = tree.integer(1);
    let assign = tree.assign(ids[0], one);
    let innermost = tree.compound([], [assign]);
    let no_inner_else = tree.nop();
    let inner = tree.if_stmt(ids[1], innermost, no_inner_else);
    let then_block = tree.compound([], [inner]);
    let no_outer_else = tree.nop();
    let outer = tree.if_stmt(ids[0], then_block, no_outer_else);
    let body = tree.compound(decls, [outer]);
    let func = tree.function(f, void, [], body);
    let program = tree.program([func]);

    let mut root = program;
    assert_eq!(
        if_to_if_goto()
            .apply_counted(&mut tree, program, &mut root)
            .unwrap(),
        2
    );
    insta::assert_snapshot!(print_tree(&tree, root), @r"
    void f()
    {
      int x;
      int y;
      {
        if (!x)
          goto ELSE;
        {
          {
            if (!y)
              goto ELSE_1;
            {
              x = 1;
            }
            goto END_1;
            ELSE_1:
            ;
            END_1:
          }
        }
        goto END;
        ELSE:
        ;
        END:
      }
    }
    ");
    let result = validate(&tree, root);
    assert!(result.is_ok(), "{result}");
    assert_eq!(declared_labels(&tree, root).len(), 4);
}
