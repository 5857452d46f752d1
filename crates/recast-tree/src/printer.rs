//! C-like debug rendering of program trees.
//!
//! ```text
//! void main()
//! {
//!   int x;
//!   if (!x)
//!     goto ELSE;
//!   ELSE:
//! }
//! ```
//!
//! This is not the program renderer: it prints any tree, including
//! fragments and trees with unset children, and collections are printed in
//! storage order.

use std::fmt::{self, Write};

use crate::kind::Kind;
use crate::node::Payload;
use crate::refs::NodeRef;
use crate::tree::Tree;

// ============================================================================
// Public API
// ============================================================================

/// Print a subtree, statement-style.
pub fn print_tree(tree: &Tree, root: NodeRef) -> String {
    let mut out = String::new();
    write_statement(tree, &mut out, root, 0).expect("fmt::Write to String never fails");
    out
}

/// Print an expression or type inline.
pub fn print_expr(tree: &Tree, node: NodeRef) -> String {
    let mut out = String::new();
    write_expr(tree, &mut out, Some(node)).expect("fmt::Write to String never fails");
    out
}

// ============================================================================
// Statements and declarations
// ============================================================================

fn write_statement(tree: &Tree, f: &mut impl Write, node: NodeRef, indent: usize) -> fmt::Result {
    let pad = " ".repeat(indent);
    match tree.kind(node) {
        Kind::Program => {
            for (i, &member) in tree.elements(node, "members").iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                write_statement(tree, f, member, indent)?;
            }
            Ok(())
        }
        Kind::Function => {
            write!(f, "{pad}")?;
            write_expr(tree, f, tree.child(node, "return_type"))?;
            write!(f, " ")?;
            write_expr(tree, f, tree.child(node, "identifier"))?;
            write!(f, "(")?;
            for (i, &param) in tree.elements(node, "params").iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_instance(tree, f, param)?;
            }
            writeln!(f, ")")?;
            write_body(tree, f, tree.child(node, "body"), indent)
        }
        Kind::Instance => {
            write!(f, "{pad}")?;
            write_instance(tree, f, node)?;
            writeln!(f, ";")
        }
        Kind::Label => {
            write!(f, "{pad}")?;
            write_expr(tree, f, tree.child(node, "identifier"))?;
            writeln!(f, ":")
        }
        Kind::Compound => {
            writeln!(f, "{pad}{{")?;
            for &member in tree.elements(node, "members") {
                write_statement(tree, f, member, indent + 2)?;
            }
            for &stmt in tree.elements(node, "statements") {
                write_statement(tree, f, stmt, indent + 2)?;
            }
            writeln!(f, "{pad}}}")
        }
        Kind::If => {
            write!(f, "{pad}if (")?;
            write_expr(tree, f, tree.child(node, "condition"))?;
            writeln!(f, ")")?;
            write_body(tree, f, tree.child(node, "body"), indent)?;
            match tree.child(node, "else") {
                Some(else_body) if tree.kind(else_body) == Kind::Nop => Ok(()),
                else_body => {
                    writeln!(f, "{pad}else")?;
                    write_body(tree, f, else_body, indent)
                }
            }
        }
        Kind::While => {
            write!(f, "{pad}while (")?;
            write_expr(tree, f, tree.child(node, "condition"))?;
            writeln!(f, ")")?;
            write_body(tree, f, tree.child(node, "body"), indent)
        }
        Kind::Goto => {
            write!(f, "{pad}goto ")?;
            write_expr(tree, f, tree.child(node, "destination"))?;
            writeln!(f, ";")
        }
        Kind::Return => match tree.child(node, "value") {
            Some(value) if tree.kind(value) == Kind::Uninitialised => writeln!(f, "{pad}return;"),
            value => {
                write!(f, "{pad}return ")?;
                write_expr(tree, f, value)?;
                writeln!(f, ";")
            }
        },
        Kind::Nop => writeln!(f, "{pad};"),
        _ => {
            write!(f, "{pad}")?;
            write_expr(tree, f, Some(node))?;
            writeln!(f, ";")
        }
    }
}

/// Bodies are indented one level unless they are blocks.
fn write_body(tree: &Tree, f: &mut impl Write, body: Option<NodeRef>, indent: usize) -> fmt::Result {
    match body {
        Some(body) if tree.kind(body) == Kind::Compound => write_statement(tree, f, body, indent),
        Some(body) => write_statement(tree, f, body, indent + 2),
        None => writeln!(f, "{}<unset>", " ".repeat(indent + 2)),
    }
}

fn write_instance(tree: &Tree, f: &mut impl Write, node: NodeRef) -> fmt::Result {
    write_expr(tree, f, tree.child(node, "type"))?;
    write!(f, " ")?;
    write_expr(tree, f, tree.child(node, "identifier"))?;
    match tree.child(node, "initialiser") {
        Some(init) if tree.kind(init) == Kind::Uninitialised => Ok(()),
        init => {
            write!(f, " = ")?;
            write_expr(tree, f, init)
        }
    }
}

// ============================================================================
// Expressions and types
// ============================================================================

fn write_expr(tree: &Tree, f: &mut impl Write, node: Option<NodeRef>) -> fmt::Result {
    let Some(node) = node else {
        return write!(f, "<unset>");
    };
    match (tree.kind(node), tree.payload(node)) {
        (Kind::InstanceIdentifier | Kind::LabelIdentifier, Payload::Name(name)) => {
            write!(f, "{name}")
        }
        (Kind::IntegerLiteral, Payload::Integer(value)) => write!(f, "{value}"),
        (Kind::Binary, Payload::Operator(op)) => {
            write!(f, "(")?;
            write_expr(tree, f, tree.child(node, "lhs"))?;
            write!(f, " {} ", op.token())?;
            write_expr(tree, f, tree.child(node, "rhs"))?;
            write!(f, ")")
        }
        (Kind::Assign, _) => {
            write_expr(tree, f, tree.child(node, "target"))?;
            write!(f, " = ")?;
            write_expr(tree, f, tree.child(node, "value"))
        }
        (Kind::LogicalNot, _) => {
            write!(f, "!")?;
            write_expr(tree, f, tree.child(node, "operand"))
        }
        (Kind::Call, _) => {
            write_expr(tree, f, tree.child(node, "callee"))?;
            write!(f, "(")?;
            for (i, &arg) in tree.elements(node, "args").iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_expr(tree, f, Some(arg))?;
            }
            write!(f, ")")
        }
        (Kind::Void, _) => write!(f, "void"),
        (Kind::Int, _) => write!(f, "int"),
        (Kind::LabelType, _) => write!(f, "label"),
        (Kind::Uninitialised, _) => write!(f, "<uninitialised>"),
        (kind, _) => write!(f, "<{kind}>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::BinaryOp;

    #[test]
    fn print_function_with_control_flow() {
        let mut tree = Tree::new();
        let main = tree.instance_identifier("main");
        let void = tree.void_type();
        let x = tree.instance_identifier("x");
        let int = tree.int_type(32);
        let uninit = tree.uninitialised();
        let decl = tree.instance(x, int, uninit);

        let cond = tree.logical_not(x);
        let l = tree.label_identifier("ELSE");
        let jump = tree.goto(l);
        let nop = tree.nop();
        let branch = tree.if_stmt(cond, jump, nop);
        let one = tree.integer(1);
        let sum = tree.binary(BinaryOp::Add, x, one);
        let assign = tree.assign(x, sum);
        let label = tree.label(l);
        let body = tree.compound([decl], [branch, assign, label]);
        let func = tree.function(main, void, [], body);

        insta::assert_snapshot!(print_tree(&tree, func), @r"
        void main()
        {
          int x;
          if (!x)
            goto ELSE;
          x = (x + 1);
          ELSE:
        }
        ");
    }

    #[test]
    fn else_branch_is_printed_unless_nop() {
        let mut tree = Tree::new();
        let x = tree.instance_identifier("x");
        let then_body = tree.compound([], []);
        let zero = tree.integer(0);
        let assign = tree.assign(x, zero);
        let branch = tree.if_stmt(x, then_body, assign);

        insta::assert_snapshot!(print_tree(&tree, branch), @r"
        if (x)
        {
        }
        else
          x = 0;
        ");
    }
}
