use std::fmt;

use crate::lexer::token::Span;

/// A syntax tree node; every node knows the source range it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Abstract Syntax Tree node types for S# programs
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Literals
    Number(Number),
    String(String),
    List(Vec<Node>),

    // Variables
    VarAccess(String),
    VarAssign {
        name: Ident,
        value: Box<Node>,
    },

    // Operations
    BinaryOp {
        left: Box<Node>,
        op: BinaryOperator,
        right: Box<Node>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Node>,
    },

    // Control Flow
    If {
        cases: Vec<IfCase>,
        else_case: Option<ElseCase>,
    },
    For {
        var_name: Ident,
        start: Box<Node>,
        end: Box<Node>,
        step: Option<Box<Node>>,
        body: Box<Node>,
        should_return_null: bool,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
        should_return_null: bool,
    },

    // Functions
    FuncDef {
        name: Option<Ident>,
        params: Vec<Ident>,
        body: Box<Node>,
        /// `-> expr` bodies return their value implicitly.
        auto_return: bool,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },

    // Statements
    Return(Option<Box<Node>>),
    Continue,
    Break,
    Statements(Vec<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// One `IF`/`ELIF` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct IfCase {
    pub condition: Node,
    pub body: Node,
    /// Set when the body is a multi-line block closed by `END`.
    pub should_return_null: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseCase {
    pub body: Box<Node>,
    pub should_return_null: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Power,    // ^

    // Comparison
    Equal,              // ==
    NotEqual,           // !=
    LessThan,           // <
    GreaterThan,        // >
    LessThanOrEqual,    // <=
    GreaterThanOrEqual, // >=

    // Logical
    And, // AND
    Or,  // OR
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,   // +
    Negate, // -
    Not,    // NOT
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "NOT",
        }
    }
}

// Compact s-expression form, used for snapshots and debugging output.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Number(Number::Int(n)) => write!(f, "{}", n),
            NodeKind::Number(Number::Float(x)) => write!(f, "{:?}", x),
            NodeKind::String(s) => write!(f, "{:?}", s),
            NodeKind::List(elements) => write!(f, "[{}]", join(elements)),
            NodeKind::VarAccess(name) => f.write_str(name),
            NodeKind::VarAssign { name, value } => write!(f, "(var {} {})", name.name, value),
            NodeKind::BinaryOp { left, op, right } => write!(f, "({} {} {})", op.symbol(), left, right),
            NodeKind::UnaryOp { op, operand } => write!(f, "({} {})", op.symbol(), operand),
            NodeKind::If { cases, else_case } => {
                f.write_str("(if")?;
                for case in cases {
                    write!(f, " [{} {}{}]", case.condition, case.body, block_marker(case.should_return_null))?;
                }
                if let Some(else_case) = else_case {
                    write!(f, " [else {}{}]", else_case.body, block_marker(else_case.should_return_null))?;
                }
                f.write_str(")")
            }
            NodeKind::For {
                var_name,
                start,
                end,
                step,
                body,
                should_return_null,
            } => {
                write!(f, "(for {} {} {}", var_name.name, start, end)?;
                if let Some(step) = step {
                    write!(f, " step {}", step)?;
                }
                write!(f, " {}{})", body, block_marker(*should_return_null))
            }
            NodeKind::While {
                condition,
                body,
                should_return_null,
            } => write!(f, "(while {} {}{})", condition, body, block_marker(*should_return_null)),
            NodeKind::FuncDef {
                name,
                params,
                body,
                auto_return,
            } => {
                let name = name.as_ref().map_or("<anonymous>", |ident| ident.name.as_str());
                let params: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
                let arrow = if *auto_return { "->" } else { "block" };
                write!(f, "(fun {} ({}) {} {})", name, params.join(" "), arrow, body)
            }
            NodeKind::Call { callee, args } => {
                if args.is_empty() {
                    write!(f, "(call {})", callee)
                } else {
                    write!(f, "(call {} {})", callee, join(args))
                }
            }
            NodeKind::Return(Some(value)) => write!(f, "(return {})", value),
            NodeKind::Return(None) => f.write_str("(return)"),
            NodeKind::Continue => f.write_str("(continue)"),
            NodeKind::Break => f.write_str("(break)"),
            NodeKind::Statements(statements) => write!(f, "{{{}}}", statements_joined(statements)),
        }
    }
}

fn join(nodes: &[Node]) -> String {
    nodes.iter().map(Node::to_string).collect::<Vec<_>>().join(" ")
}

fn statements_joined(nodes: &[Node]) -> String {
    nodes.iter().map(Node::to_string).collect::<Vec<_>>().join("; ")
}

fn block_marker(should_return_null: bool) -> &'static str {
    if should_return_null {
        " :block"
    } else {
        ""
    }
}
