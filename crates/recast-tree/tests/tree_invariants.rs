//! Whole-tree checks: duplication keeps a program valid, splicing by
//! pointer replacement keeps the single-reference invariant.

use recast_tree::{Kind, NodeRef, Terminus, Tree, descendants, print_tree, simple_compare, validate};

/// `int f() { int x; x = 1; L: goto L; }`
fn sample(tree: &mut Tree) -> (NodeRef, NodeRef) {
    let f = tree.instance_identifier("f");
    let int = tree.int_type(32);
    let x = tree.instance_identifier("x");
    let x_ty = tree.int_type(32);
    let uninit = tree.uninitialised();
    let decl = tree.instance(x, x_ty, uninit);
    let one = tree.integer(1);
    let assign = tree.assign(x, one);
    let l = tree.label_identifier("L");
    let label = tree.label(l);
    let jump = tree.goto(l);
    let body = tree.compound([decl], [assign, label, jump]);
    let func = tree.function(f, int, [], body);
    (tree.program([func]), body)
}

#[test]
fn sample_program_is_valid() {
    let mut tree = Tree::new();
    let (program, _) = sample(&mut tree);
    let result = validate(&tree, program);
    assert!(result.is_ok(), "{result}");
}

#[test]
fn splice_of_duplicate_stays_valid() {
    let mut tree = Tree::new();
    let (program, body) = sample(&mut tree);

    // Replace the goto with a nop inside a fresh copy of the body, then swap
    // the copy in for the original.
    let jump = *tree.elements(body, "statements").last().unwrap();
    let nop = tree.nop();
    let copy = tree.duplicate_subtree(
        body,
        Some(Terminus {
            at: jump,
            replacement: nop,
        }),
    );
    let func = tree.elements(program, "members")[0];
    tree.set_child(func, "body", copy);

    let result = validate(&tree, program);
    assert!(result.is_ok(), "{result}");
    assert!(!simple_compare(&tree, copy, body));
    assert_eq!(
        descendants(&tree, copy)
            .into_iter()
            .filter(|&n| tree.kind(n) == Kind::Goto)
            .count(),
        0
    );

    insta::assert_snapshot!(print_tree(&tree, program), @r"
    int f()
    {
      int x;
      x = 1;
      L:
      ;
    }
    ");
}

#[test]
fn reusing_a_subtree_twice_is_caught() {
    let mut tree = Tree::new();
    let (program, body) = sample(&mut tree);
    let first = tree.elements(body, "statements")[0];
    tree.container_mut(body, "statements").push(first);

    let result = validate(&tree, program);
    assert!(!result.is_ok());
    insta::assert_snapshot!(result.to_string(), @r"
    1 tree error(s) found:
      - Assign node7 is referenced 2 times
    ");
}
