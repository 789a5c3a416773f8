//! Expression tree for mapping programs.

use serde_json::Value;

/// One node of a mapping program.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A JSON literal: number, string, boolean or null.
    Literal(Value),
    /// The whole input document (`$`).
    Context,
    /// Navigation from a base value.
    Path { base: Box<Expr>, steps: Vec<Step> },
    /// `{ "key": expr, ... }`, members in declaration order.
    Object(Vec<(String, Expr)>),
    /// `[expr, ...]`
    Array(Vec<Expr>),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },
    Call { function: Function, args: Vec<Expr> },
}

impl Expr {
    pub(crate) fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// A bare field reference resolved against the input document.
    pub(crate) fn field(name: String) -> Self {
        Expr::Path {
            base: Box::new(Expr::Context),
            steps: vec![Step::Field(name)],
        }
    }

    /// Height of the tree; a leaf is 1.
    ///
    /// Recursive, so only call it on trees the parser has already bounded.
    pub fn depth(&self) -> usize {
        let children = match self {
            Expr::Literal(_) | Expr::Context => 0,
            Expr::Path { base, .. } => base.depth(),
            Expr::Negate(inner) => inner.depth(),
            Expr::Object(members) => members.iter().map(|(_, e)| e.depth()).max().unwrap_or(0),
            Expr::Array(items) | Expr::Call { args: items, .. } => {
                items.iter().map(Expr::depth).max().unwrap_or(0)
            }
            Expr::Binary { left, right, .. } => left.depth().max(right.depth()),
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => test
                .depth()
                .max(then.depth())
                .max(otherwise.as_ref().map_or(0, |e| e.depth())),
        };
        children + 1
    }

    /// Appends navigation steps, merging into an existing path.
    pub(crate) fn with_steps(self, mut extra: Vec<Step>) -> Self {
        if extra.is_empty() {
            return self;
        }
        match self {
            Expr::Path { base, mut steps } => {
                steps.append(&mut extra);
                Expr::Path { base, steps }
            }
            other => Expr::Path {
                base: Box::new(other),
                steps: extra,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Field(String),
    Index(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Coalesce,
}

impl BinaryOp {
    /// Operator as written in source, quoted for error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "'+'",
            BinaryOp::Sub => "'-'",
            BinaryOp::Mul => "'*'",
            BinaryOp::Div => "'/'",
            BinaryOp::Rem => "'%'",
            BinaryOp::Concat => "'&'",
            BinaryOp::Eq => "'='",
            BinaryOp::Ne => "'!='",
            BinaryOp::Lt => "'<'",
            BinaryOp::Le => "'<='",
            BinaryOp::Gt => "'>'",
            BinaryOp::Ge => "'>='",
            BinaryOp::And => "'and'",
            BinaryOp::Or => "'or'",
            BinaryOp::Coalesce => "'??'",
        }
    }
}

/// The allow-list of callable functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Uppercase,
    Lowercase,
    Trim,
    String,
    Number,
    Exists,
    Round,
    Substring,
    Contains,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "uppercase" => Function::Uppercase,
            "lowercase" => Function::Lowercase,
            "trim" => Function::Trim,
            "string" => Function::String,
            "number" => Function::Number,
            "exists" => Function::Exists,
            "round" => Function::Round,
            "substring" => Function::Substring,
            "contains" => Function::Contains,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Uppercase => "$uppercase",
            Function::Lowercase => "$lowercase",
            Function::Trim => "$trim",
            Function::String => "$string",
            Function::Number => "$number",
            Function::Exists => "$exists",
            Function::Round => "$round",
            Function::Substring => "$substring",
            Function::Contains => "$contains",
        }
    }

    /// Accepted argument counts, inclusive.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Function::Round => (1, 2),
            Function::Substring => (2, 3),
            Function::Contains => (2, 2),
            _ => (1, 1),
        }
    }
}
