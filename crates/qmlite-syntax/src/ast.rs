//! Typed syntax tree for scripts and documents.
//!
//! Every node reports a short kind tag through `kind()`; downstream walkers
//! use it in diagnostics when they meet a node they do not handle.

use std::rc::Rc;

// ── Operators ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    StrictEq,
    NotEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    In,
    InstanceOf,
    Shr,
    Shl,
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn from_operator(op: &str) -> Option<Self> {
        Some(match op {
            "||" => Self::Or,
            "&&" => Self::And,
            "|" => Self::BitOr,
            "^" => Self::BitXor,
            "&" => Self::BitAnd,
            "==" => Self::Eq,
            "===" => Self::StrictEq,
            "!=" => Self::NotEq,
            "!==" => Self::StrictNotEq,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::LtEq,
            ">=" => Self::GtEq,
            "in" => Self::In,
            "instanceof" => Self::InstanceOf,
            ">>" => Self::Shr,
            "<<" => Self::Shl,
            ">>>" => Self::UShr,
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Mod,
            _ => return None,
        })
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::BitOr => 3,
            Self::BitXor => 4,
            Self::BitAnd => 5,
            Self::Eq | Self::StrictEq | Self::NotEq | Self::StrictNotEq => 6,
            Self::Lt | Self::Gt | Self::LtEq | Self::GtEq | Self::In | Self::InstanceOf => 7,
            Self::Shr | Self::Shl | Self::UShr => 8,
            Self::Add | Self::Sub => 9,
            Self::Mul | Self::Div | Self::Mod => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
            Self::Eq => "==",
            Self::StrictEq => "===",
            Self::NotEq => "!=",
            Self::StrictNotEq => "!==",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::In => "in",
            Self::InstanceOf => "instanceof",
            Self::Shr => ">>",
            Self::Shl => "<<",
            Self::UShr => ">>>",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }
}

/// Parse an assignment operator. `Some(None)` is plain `=`.
pub fn assignment_operator(op: &str) -> Option<Option<BinaryOp>> {
    match op {
        "=" => Some(None),
        "+=" | "-=" | "/=" | "*=" | "%=" | ">>=" | "<<=" | ">>>=" | "|=" | "^=" | "&=" => {
            BinaryOp::from_operator(&op[..op.len() - 1]).map(Some)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    TypeOf,
    Void,
    Delete,
    Increment,
    Decrement,
    Not,
    BitNot,
    Neg,
    Plus,
}

impl UnaryOp {
    pub fn prefix(op: &str) -> Option<Self> {
        Some(match op {
            "typeof" => Self::TypeOf,
            "void" => Self::Void,
            "delete" => Self::Delete,
            "++" => Self::Increment,
            "--" => Self::Decrement,
            "!" => Self::Not,
            "~" => Self::BitNot,
            "-" => Self::Neg,
            "+" => Self::Plus,
            _ => return None,
        })
    }

    pub fn postfix(op: &str) -> Option<Self> {
        match op {
            "++" => Some(Self::Increment),
            "--" => Some(Self::Decrement),
            _ => None,
        }
    }

    pub fn is_update(self) -> bool {
        matches!(self, Self::Increment | Self::Decrement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Atom {
    True,
    False,
    Null,
    Undefined,
}

impl Atom {
    pub fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "true" => Self::True,
            "false" => Self::False,
            "null" => Self::Null,
            "undefined" => Self::Undefined,
            _ => return None,
        })
    }
}

// ── Script nodes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Value(Expr),
    Getter(Rc<Function>),
    Setter(Rc<Function>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProperty {
    pub key: String,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var(Vec<VarDecl>),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `{ ... }`; the empty statement `;` is an empty block.
    Block(Vec<Stmt>),
    Expr(Expr),
    Var(Vec<VarDecl>),
    Const(Vec<VarDecl>),
    Defun(Rc<Function>),
    If { cond: Expr, then: Box<Stmt>, otherwise: Option<Box<Stmt>> },
    For {
        init: Option<ForInit>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn { declare: bool, target: Expr, object: Expr, body: Box<Stmt> },
    While { cond: Expr, body: Box<Stmt> },
    Do { body: Box<Stmt>, cond: Expr },
    Label { label: String, body: Box<Stmt> },
    Break(Option<String>),
    Continue(Option<String>),
    Return(Option<Expr>),
    Throw(Expr),
    Try {
        body: Vec<Stmt>,
        catch: Option<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    Switch { discriminant: Expr, cases: Vec<SwitchCase> },
    With { object: Expr, body: Box<Stmt> },
    Debugger,
}

impl Stmt {
    pub fn kind(&self) -> &'static str {
        match self {
            Stmt::Block(_) => "block",
            Stmt::Expr(_) => "stat",
            Stmt::Var(_) => "var",
            Stmt::Const(_) => "const",
            Stmt::Defun(_) => "defun",
            Stmt::If { .. } => "if",
            Stmt::For { .. } => "for",
            Stmt::ForIn { .. } => "for-in",
            Stmt::While { .. } => "while",
            Stmt::Do { .. } => "do",
            Stmt::Label { .. } => "label",
            Stmt::Break(_) => "break",
            Stmt::Continue(_) => "continue",
            Stmt::Return(_) => "return",
            Stmt::Throw(_) => "throw",
            Stmt::Try { .. } => "try",
            Stmt::Switch { .. } => "switch",
            Stmt::With { .. } => "with",
            Stmt::Debugger => "debugger",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),
    Name(String),
    Atom(Atom),
    Regexp { pattern: String, flags: String },
    /// Elisions (`[1,,2]`) are `None`.
    Array(Vec<Option<Expr>>),
    Object(Vec<ObjectProperty>),
    Function(Rc<Function>),
    Dot(Box<Expr>, String),
    Sub(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    New(Box<Expr>, Vec<Expr>),
    UnaryPrefix(UnaryOp, Box<Expr>),
    UnaryPostfix(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `None` operator is plain `=`.
    Assign(Option<BinaryOp>, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Seq(Box<Expr>, Box<Expr>),
    /// An element block written inside an expression, e.g. in a list.
    QmlElem(Rc<QmlElement>),
}

impl Expr {
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Num(_) => "num",
            Expr::Str(_) => "string",
            Expr::Name(_) => "name",
            Expr::Atom(_) => "atom",
            Expr::Regexp { .. } => "regexp",
            Expr::Array(_) => "array",
            Expr::Object(_) => "object",
            Expr::Function(_) => "function",
            Expr::Dot(..) => "dot",
            Expr::Sub(..) => "sub",
            Expr::Call(..) => "call",
            Expr::New(..) => "new",
            Expr::UnaryPrefix(..) => "unary-prefix",
            Expr::UnaryPostfix(..) => "unary-postfix",
            Expr::Binary(..) => "binary",
            Expr::Assign(..) => "assign",
            Expr::Conditional(..) => "conditional",
            Expr::Seq(..) => "seq",
            Expr::QmlElem(_) => "qmlelem",
        }
    }
}

// ── Document nodes ────────────────────────────────────────────────────────

/// `import QtQuick 2.0`, `import "dir" as X`. Kept, never resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub target: String,
    /// The target was a quoted path rather than a module name.
    pub is_path: bool,
    pub version: Option<String>,
    pub qualifier: Option<String>,
    pub line: usize,
}

/// A statement bound to a property, together with its verbatim source.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub stmt: Rc<Stmt>,
    pub source: String,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QmlElement {
    pub class_name: String,
    /// Target of `Class on prop { ... }`.
    pub on_property: Option<String>,
    pub body: Vec<QmlStatement>,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    pub type_name: String,
    pub value: Option<BoundStatement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalParam {
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QmlStatement {
    Element(Rc<QmlElement>),
    /// `name: stmt`
    Property { name: String, value: BoundStatement },
    /// `object.property: stmt`
    ObjectDef { object: String, property: String, value: BoundStatement },
    /// `object { name: stmt ... }`
    Object { object: String, body: Vec<QmlStatement> },
    PropertyDef(PropertyDecl),
    AliasDef { name: String, object: String, property: Option<String> },
    DefaultProperty(Box<QmlStatement>),
    SignalDef { name: String, params: Vec<SignalParam> },
    Method { name: String, function: Rc<Function>, source: String },
}

impl QmlStatement {
    pub fn kind(&self) -> &'static str {
        match self {
            QmlStatement::Element(_) => "qmlelem",
            QmlStatement::Property { .. } => "qmlprop",
            QmlStatement::ObjectDef { .. } => "qmlobjdef",
            QmlStatement::Object { .. } => "qmlobj",
            QmlStatement::PropertyDef(_) => "qmlpropdef",
            QmlStatement::AliasDef { .. } => "qmlaliasdef",
            QmlStatement::DefaultProperty(_) => "qmldefaultprop",
            QmlStatement::SignalDef { .. } => "qmlsignaldef",
            QmlStatement::Method { .. } => "qmlmethod",
        }
    }
}

/// A parsed document: imports followed by top-level statements. A loadable
/// document has exactly one, an element.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub imports: Vec<Import>,
    pub statements: Vec<QmlStatement>,
}
