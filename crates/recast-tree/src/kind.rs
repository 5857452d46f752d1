//! Grammar kinds and the is-a relation between them.
//!
//! The grammar uses multiple inheritance: a `Label` is both a declaration
//! and a statement, an `InstanceIdentifier` is both an identifier and an
//! expression. Instead of a class hierarchy every kind carries its
//! *ancestry*, the set of kinds it is-a (itself included), and two kinds are
//! compared by set containment. Failing one direction says nothing about the
//! other: `Statement` and `Declaration` are neither sub- nor superclass of
//! each other, yet both describe `Label`.

use std::fmt;

/// Every grammar kind, abstract categories first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    // === Abstract categories ===
    Node,
    Statement,
    Expression,
    Declaration,
    Type,
    Identifier,
    Literal,
    Scope,
    Loop,
    Operator,
    Initialiser,

    // === Concrete kinds ===
    Program,
    Function,
    Instance,
    Label,
    Compound,
    If,
    While,
    Goto,
    Return,
    Nop,
    Assign,
    Binary,
    LogicalNot,
    Call,
    IntegerLiteral,
    InstanceIdentifier,
    LabelIdentifier,
    Uninitialised,
    Void,
    Int,
    LabelType,
}

/// Relation of one kind to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindRelation {
    Equal,
    /// `self` is-a `other`, and they differ.
    StrictSubclass,
    /// `other` is-a `self`, and they differ.
    StrictSuperclass,
    /// Neither contains the other, but some concrete kind is-a both.
    Overlapping,
    /// No concrete kind is-a both.
    Disjoint,
}

impl KindRelation {
    /// Non-strict subclass: equal or strictly below.
    pub fn is_subclass(self) -> bool {
        matches!(self, KindRelation::Equal | KindRelation::StrictSubclass)
    }

    /// Non-strict superclass: equal or strictly above.
    pub fn is_superclass(self) -> bool {
        matches!(self, KindRelation::Equal | KindRelation::StrictSuperclass)
    }
}

/// Bit set over [`Kind`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct KindSet(u64);

impl KindSet {
    pub const fn empty() -> Self {
        KindSet(0)
    }

    pub const fn of(kind: Kind) -> Self {
        KindSet(1 << kind as u32)
    }

    pub const fn union(self, other: KindSet) -> Self {
        KindSet(self.0 | other.0)
    }

    pub const fn contains(self, kind: Kind) -> bool {
        self.0 & (1 << kind as u32) != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Kind> {
        Kind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

/// Shape of one item in a node's itemisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemShape {
    /// Exactly one child.
    Single,
    /// Ordered container.
    Sequence,
    /// Unordered container.
    Collection,
}

/// Declared field of a concrete kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemSpec {
    pub name: &'static str,
    pub shape: ItemShape,
    /// Kind every child in this item must be a (non-strict) subclass of.
    pub kind: Kind,
    /// The child is the identifier introduced by this node.
    pub declares: bool,
}

impl ItemSpec {
    const fn single(name: &'static str, kind: Kind) -> Self {
        ItemSpec {
            name,
            shape: ItemShape::Single,
            kind,
            declares: false,
        }
    }

    const fn declaring(name: &'static str, kind: Kind) -> Self {
        ItemSpec {
            name,
            shape: ItemShape::Single,
            kind,
            declares: true,
        }
    }

    const fn sequence(name: &'static str, kind: Kind) -> Self {
        ItemSpec {
            name,
            shape: ItemShape::Sequence,
            kind,
            declares: false,
        }
    }

    const fn collection(name: &'static str, kind: Kind) -> Self {
        ItemSpec {
            name,
            shape: ItemShape::Collection,
            kind,
            declares: false,
        }
    }
}

/// Which payload variant a kind carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadShape {
    None,
    Name,
    Integer,
    Operator,
}

// ============================================================================
// Schemas
// ============================================================================

const NO_ITEMS: &[ItemSpec] = &[];

const PROGRAM: &[ItemSpec] = &[ItemSpec::collection("members", Kind::Declaration)];

const FUNCTION: &[ItemSpec] = &[
    ItemSpec::declaring("identifier", Kind::InstanceIdentifier),
    ItemSpec::single("return_type", Kind::Type),
    ItemSpec::sequence("params", Kind::Instance),
    ItemSpec::single("body", Kind::Statement),
];

const INSTANCE: &[ItemSpec] = &[
    ItemSpec::declaring("identifier", Kind::InstanceIdentifier),
    ItemSpec::single("type", Kind::Type),
    ItemSpec::single("initialiser", Kind::Initialiser),
];

const LABEL: &[ItemSpec] = &[ItemSpec::declaring("identifier", Kind::LabelIdentifier)];

const COMPOUND: &[ItemSpec] = &[
    ItemSpec::collection("members", Kind::Declaration),
    ItemSpec::sequence("statements", Kind::Statement),
];

const IF: &[ItemSpec] = &[
    ItemSpec::single("condition", Kind::Expression),
    ItemSpec::single("body", Kind::Statement),
    ItemSpec::single("else", Kind::Statement),
];

const WHILE: &[ItemSpec] = &[
    ItemSpec::single("condition", Kind::Expression),
    ItemSpec::single("body", Kind::Statement),
];

const GOTO: &[ItemSpec] = &[ItemSpec::single("destination", Kind::Expression)];

const RETURN: &[ItemSpec] = &[ItemSpec::single("value", Kind::Initialiser)];

const ASSIGN: &[ItemSpec] = &[
    ItemSpec::single("target", Kind::Expression),
    ItemSpec::single("value", Kind::Expression),
];

const BINARY: &[ItemSpec] = &[
    ItemSpec::single("lhs", Kind::Expression),
    ItemSpec::single("rhs", Kind::Expression),
];

const LOGICAL_NOT: &[ItemSpec] = &[ItemSpec::single("operand", Kind::Expression)];

const CALL: &[ItemSpec] = &[
    ItemSpec::single("callee", Kind::Expression),
    ItemSpec::sequence("args", Kind::Expression),
];

impl Kind {
    pub const ALL: [Kind; 32] = [
        Kind::Node,
        Kind::Statement,
        Kind::Expression,
        Kind::Declaration,
        Kind::Type,
        Kind::Identifier,
        Kind::Literal,
        Kind::Scope,
        Kind::Loop,
        Kind::Operator,
        Kind::Initialiser,
        Kind::Program,
        Kind::Function,
        Kind::Instance,
        Kind::Label,
        Kind::Compound,
        Kind::If,
        Kind::While,
        Kind::Goto,
        Kind::Return,
        Kind::Nop,
        Kind::Assign,
        Kind::Binary,
        Kind::LogicalNot,
        Kind::Call,
        Kind::IntegerLiteral,
        Kind::InstanceIdentifier,
        Kind::LabelIdentifier,
        Kind::Uninitialised,
        Kind::Void,
        Kind::Int,
        Kind::LabelType,
    ];

    /// Abstract kinds never appear in a program tree.
    pub fn is_abstract(self) -> bool {
        (self as u32) < (Kind::Program as u32)
    }

    /// Direct superclasses.
    pub fn parents(self) -> &'static [Kind] {
        use Kind::*;
        match self {
            Node => &[],
            Statement | Declaration | Type | Identifier | Scope | Initialiser => &[Node],
            Expression => &[Statement, Initialiser],
            Literal | Operator => &[Expression],
            Loop => &[Statement],
            Program => &[Scope],
            Function => &[Declaration],
            Instance | Label => &[Declaration, Statement],
            Compound => &[Statement, Scope, Initialiser],
            If | Goto | Return | Nop => &[Statement],
            While => &[Loop],
            Assign | Binary | LogicalNot => &[Operator],
            Call => &[Expression],
            IntegerLiteral => &[Literal],
            InstanceIdentifier | LabelIdentifier => &[Identifier, Expression],
            Uninitialised => &[Initialiser],
            Void | Int | LabelType => &[Type],
        }
    }

    /// Every kind `self` is-a, including itself.
    pub fn ancestry(self) -> KindSet {
        self.parents()
            .iter()
            .fold(KindSet::of(self), |set, parent| set.union(parent.ancestry()))
    }

    /// Non-strict subclass test: `self` is-a `other`.
    pub fn is_a(self, other: Kind) -> bool {
        self.ancestry().contains(other)
    }

    /// Compare two kinds without knowing either concretely.
    pub fn relation(self, other: Kind) -> KindRelation {
        if self == other {
            KindRelation::Equal
        } else if self.is_a(other) {
            KindRelation::StrictSubclass
        } else if other.is_a(self) {
            KindRelation::StrictSuperclass
        } else if Kind::ALL
            .iter()
            .any(|k| !k.is_abstract() && k.is_a(self) && k.is_a(other))
        {
            KindRelation::Overlapping
        } else {
            KindRelation::Disjoint
        }
    }

    /// Declared items of a concrete kind, in field order. Abstract kinds have none.
    pub fn schema(self) -> &'static [ItemSpec] {
        match self {
            Kind::Program => PROGRAM,
            Kind::Function => FUNCTION,
            Kind::Instance => INSTANCE,
            Kind::Label => LABEL,
            Kind::Compound => COMPOUND,
            Kind::If => IF,
            Kind::While => WHILE,
            Kind::Goto => GOTO,
            Kind::Return => RETURN,
            Kind::Assign => ASSIGN,
            Kind::Binary => BINARY,
            Kind::LogicalNot => LOGICAL_NOT,
            Kind::Call => CALL,
            _ => NO_ITEMS,
        }
    }

    /// Index of the named item in [`Kind::schema`].
    pub fn item_index(self, name: &str) -> Option<usize> {
        self.schema().iter().position(|spec| spec.name == name)
    }

    pub fn payload_shape(self) -> PayloadShape {
        match self {
            Kind::InstanceIdentifier | Kind::LabelIdentifier => PayloadShape::Name,
            Kind::IntegerLiteral | Kind::Int => PayloadShape::Integer,
            Kind::Binary => PayloadShape::Operator,
            _ => PayloadShape::None,
        }
    }

    pub fn name(self) -> &'static str {
        use Kind::*;
        match self {
            Node => "Node",
            Statement => "Statement",
            Expression => "Expression",
            Declaration => "Declaration",
            Type => "Type",
            Identifier => "Identifier",
            Literal => "Literal",
            Scope => "Scope",
            Loop => "Loop",
            Operator => "Operator",
            Initialiser => "Initialiser",
            Program => "Program",
            Function => "Function",
            Instance => "Instance",
            Label => "Label",
            Compound => "Compound",
            If => "If",
            While => "While",
            Goto => "Goto",
            Return => "Return",
            Nop => "Nop",
            Assign => "Assign",
            Binary => "Binary",
            LogicalNot => "LogicalNot",
            Call => "Call",
            IntegerLiteral => "IntegerLiteral",
            InstanceIdentifier => "InstanceIdentifier",
            LabelIdentifier => "LabelIdentifier",
            Uninitialised => "Uninitialised",
            Void => "Void",
            Int => "Int",
            LabelType => "LabelType",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
