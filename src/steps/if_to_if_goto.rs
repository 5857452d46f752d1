//! Lower structured `if`/`else` to conditional gotos.
//!
//! ## Example
//!
//! ```text
//! if (x) { y; } else { z; }
//! ```
//!
//! becomes
//!
//! ```text
//! {
//!   if (!x)
//!     goto ELSE;
//!   { y; }
//!   goto END;
//!   ELSE:
//!   { z; }
//!   END:
//! }
//! ```
//!
//! An `if` that is already a conditional goto (body a goto, no else) is
//! left alone, which is what lets the step repeat to a fixpoint.

use recast_sr::{CompareReplace, Patterns, RepetitionLimit};
use recast_tree::Kind;

pub const NAME: &str = "IfToIfGoto";

/// Rewrites every structured `if` in the region.
pub fn if_to_if_goto() -> CompareReplace {
    build(Some(RepetitionLimit::default()))
}

/// Rewrites the first structured `if` found, and reports `NoMatch` if there
/// is none.
pub fn if_to_if_goto_once() -> CompareReplace {
    build(None)
}

fn build(limit: Option<RepetitionLimit>) -> CompareReplace {
    let mut p = Patterns::new();

    // === Search ===
    let condition = p.any(Kind::Expression);
    let body = p.any(Kind::Statement);
    let else_body = p.any(Kind::Statement);
    let structured = p
        .grammar(Kind::If)
        .child("condition", condition)
        .child("body", body)
        .child("else", else_body)
        .build();

    let jump = p.any(Kind::Goto);
    let nothing = p.any(Kind::Nop);
    let lowered = p
        .grammar(Kind::If)
        .child("body", jump)
        .child("else", nothing)
        .build();
    let not_lowered = p.not_match(Kind::If, lowered);
    let search = p.match_all(Kind::If, [structured, not_lowered]);

    // === Replace ===
    let else_label = p.build_identifier(Kind::LabelIdentifier, "ELSE", []);
    let end_label = p.build_identifier(Kind::LabelIdentifier, "END", []);

    let inverted = p.grammar(Kind::LogicalNot).child("operand", condition).build();
    let to_else = p.grammar(Kind::Goto).child("destination", else_label).build();
    let no_else = p.any(Kind::Nop);
    let branch = p
        .grammar(Kind::If)
        .child("condition", inverted)
        .child("body", to_else)
        .child("else", no_else)
        .build();
    let to_end = p.grammar(Kind::Goto).child("destination", end_label).build();
    let else_decl = p.grammar(Kind::Label).child("identifier", else_label).build();
    let end_decl = p.grammar(Kind::Label).child("identifier", end_label).build();
    let replace = p
        .grammar(Kind::Compound)
        .sequence(
            "statements",
            [branch, body, to_end, else_decl, else_body, end_decl],
        )
        .build();

    CompareReplace::search_replace(NAME, p, search, replace, |rule| match limit {
        Some(limit) => rule.with_repetition(limit),
        None => rule,
    })
}
