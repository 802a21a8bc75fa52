//! Syntax tree for parsed path expressions.

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Path(LocationPath),
    /// A primary expression filtered by predicates and optionally followed by
    /// more steps, as in `(//li)[1]` or `(//ul)[2]/li`.
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Literal(String),
    Number(f64),
    Call(Function, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
    /// Written with abbreviated syntax (`name`, `@name`, `.`, `..`, `//`)
    /// rather than an explicit `axis::`.
    pub abbreviated: bool,
}

impl Step {
    /// The step `//` stands for.
    pub(crate) fn descendant_or_self() -> Self {
        Step {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
            abbreviated: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    SelfAxis,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Attribute,
}

impl Axis {
    /// Axes we evaluate. Recognized-but-unavailable axes are reported by the
    /// parser separately.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "parent" => Axis::Parent,
            "self" => Axis::SelfAxis,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "attribute" => Axis::Attribute,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    Name(String),
    /// `*`
    Any,
    /// `text()`
    Text,
    /// `node()`
    Node,
    /// `comment()`
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Position,
    Last,
    Count,
    String,
    NormalizeSpace,
    StringLength,
    Contains,
    StartsWith,
    Concat,
    Not,
    True,
    False,
    Boolean,
    Name,
    LocalName,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "position" => Function::Position,
            "last" => Function::Last,
            "count" => Function::Count,
            "string" => Function::String,
            "normalize-space" => Function::NormalizeSpace,
            "string-length" => Function::StringLength,
            "contains" => Function::Contains,
            "starts-with" => Function::StartsWith,
            "concat" => Function::Concat,
            "not" => Function::Not,
            "true" => Function::True,
            "false" => Function::False,
            "boolean" => Function::Boolean,
            "name" => Function::Name,
            "local-name" => Function::LocalName,
            _ => return None,
        })
    }

    /// Accepted argument counts, as (min, max). `None` means unbounded.
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            Function::Position | Function::Last | Function::True | Function::False => {
                (0, Some(0))
            }
            Function::Count | Function::Not | Function::Boolean => (1, Some(1)),
            Function::String
            | Function::NormalizeSpace
            | Function::StringLength
            | Function::Name
            | Function::LocalName => (0, Some(1)),
            Function::Contains | Function::StartsWith => (2, Some(2)),
            Function::Concat => (2, None),
        }
    }
}
