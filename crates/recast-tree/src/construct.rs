//! Typed constructors for every concrete kind.

use crate::kind::Kind;
use crate::node::{BinaryOp, NodeDataBuilder, Payload};
use crate::refs::NodeRef;
use crate::symbol::Symbol;
use crate::tree::Tree;

impl Tree {
    pub fn program(&mut self, members: impl IntoIterator<Item = NodeRef>) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::Program)
                .collection("members", members)
                .build(),
        )
    }

    pub fn function(
        &mut self,
        identifier: NodeRef,
        return_type: NodeRef,
        params: impl IntoIterator<Item = NodeRef>,
        body: NodeRef,
    ) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::Function)
                .child("identifier", identifier)
                .child("return_type", return_type)
                .sequence("params", params)
                .child("body", body)
                .build(),
        )
    }

    pub fn instance(&mut self, identifier: NodeRef, ty: NodeRef, initialiser: NodeRef) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::Instance)
                .child("identifier", identifier)
                .child("type", ty)
                .child("initialiser", initialiser)
                .build(),
        )
    }

    pub fn label(&mut self, identifier: NodeRef) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::Label)
                .child("identifier", identifier)
                .build(),
        )
    }

    pub fn compound(
        &mut self,
        members: impl IntoIterator<Item = NodeRef>,
        statements: impl IntoIterator<Item = NodeRef>,
    ) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::Compound)
                .collection("members", members)
                .sequence("statements", statements)
                .build(),
        )
    }

    pub fn if_stmt(&mut self, condition: NodeRef, body: NodeRef, else_body: NodeRef) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::If)
                .child("condition", condition)
                .child("body", body)
                .child("else", else_body)
                .build(),
        )
    }

    pub fn while_loop(&mut self, condition: NodeRef, body: NodeRef) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::While)
                .child("condition", condition)
                .child("body", body)
                .build(),
        )
    }

    pub fn goto(&mut self, destination: NodeRef) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::Goto)
                .child("destination", destination)
                .build(),
        )
    }

    pub fn return_stmt(&mut self, value: NodeRef) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::Return)
                .child("value", value)
                .build(),
        )
    }

    pub fn nop(&mut self) -> NodeRef {
        self.create(NodeDataBuilder::new(Kind::Nop).build())
    }

    pub fn assign(&mut self, target: NodeRef, value: NodeRef) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::Assign)
                .child("target", target)
                .child("value", value)
                .build(),
        )
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: NodeRef, rhs: NodeRef) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::Binary)
                .payload(Payload::Operator(op))
                .child("lhs", lhs)
                .child("rhs", rhs)
                .build(),
        )
    }

    pub fn logical_not(&mut self, operand: NodeRef) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::LogicalNot)
                .child("operand", operand)
                .build(),
        )
    }

    pub fn call(&mut self, callee: NodeRef, args: impl IntoIterator<Item = NodeRef>) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::Call)
                .child("callee", callee)
                .sequence("args", args)
                .build(),
        )
    }

    pub fn integer(&mut self, value: i64) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::IntegerLiteral)
                .payload(Payload::Integer(value))
                .build(),
        )
    }

    pub fn instance_identifier(&mut self, name: &str) -> NodeRef {
        self.identifier(Kind::InstanceIdentifier, Symbol::from_dynamic(name))
    }

    pub fn label_identifier(&mut self, name: &str) -> NodeRef {
        self.identifier(Kind::LabelIdentifier, Symbol::from_dynamic(name))
    }

    /// Fresh identifier of the given identifier kind.
    pub fn identifier(&mut self, kind: Kind, name: Symbol) -> NodeRef {
        self.create(NodeDataBuilder::new(kind).payload(Payload::Name(name)).build())
    }

    pub fn uninitialised(&mut self) -> NodeRef {
        self.create(NodeDataBuilder::new(Kind::Uninitialised).build())
    }

    pub fn void_type(&mut self) -> NodeRef {
        self.create(NodeDataBuilder::new(Kind::Void).build())
    }

    pub fn int_type(&mut self, width: i64) -> NodeRef {
        self.create(
            NodeDataBuilder::new(Kind::Int)
                .payload(Payload::Integer(width))
                .build(),
        )
    }

    pub fn label_type(&mut self) -> NodeRef {
        self.create(NodeDataBuilder::new(Kind::LabelType).build())
    }
}
