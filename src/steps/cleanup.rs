//! Drop `;` statements from blocks.

use recast_sr::{CompareReplace, Patterns, RepetitionLimit};
use recast_tree::Kind;

pub const NAME: &str = "CleanupNop";

pub fn cleanup_nop() -> CompareReplace {
    let mut p = Patterns::new();
    let before = p.star(Kind::Statement);
    let nop = p.any(Kind::Nop);
    let after = p.star(Kind::Statement);
    let with_nop = p
        .grammar(Kind::Compound)
        .sequence("statements", [before, nop, after])
        .build();
    let without = p
        .grammar(Kind::Compound)
        .sequence("statements", [before, after])
        .build();
    CompareReplace::search_replace(NAME, p, with_nop, without, |rule| {
        rule.with_repetition(RepetitionLimit::default())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recast_tree::{Tree, print_tree};

    #[test]
    fn nops_in_blocks_go_away() {
        let mut tree = Tree::new();
        let x = tree.instance_identifier("x");
        let ty = tree.int_type(32);
        let uninit = tree.uninitialised();
        let decl = tree.instance(x, ty, uninit);
        let first = tree.nop();
        let one = tree.integer(1);
        let assign = tree.assign(x, one);
        let inner_nop = tree.nop();
        let inner = tree.compound([], [inner_nop]);
        let last = tree.nop();
        let block = tree.compound([decl], [first, assign, inner, last]);

        let mut root = block;
        let applied = cleanup_nop()
            .apply_counted(&mut tree, block, &mut root)
            .unwrap();
        assert_eq!(applied, 3);
        insta::assert_snapshot!(print_tree(&tree, root), @r"
        {
          int x;
          x = 1;
          {
          }
        }
        ");
    }
}
