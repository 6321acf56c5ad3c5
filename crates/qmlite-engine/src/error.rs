use qmlite_syntax::ParseError;
use thiserror::Error;

use crate::value::Value;

/// Runtime failure while evaluating a binding, handler or script call.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// A script `throw` that nobody caught.
    #[error("uncaught exception: {0}")]
    Thrown(Value),

    #[error("ReferenceError: {0} is not defined")]
    Reference(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("RangeError: {0}")]
    Range(String),

    /// A binding source that only fails when it is re-parsed on first use.
    #[error(transparent)]
    Syntax(#[from] ParseError),

    /// A property was re-entered while its own binding was being evaluated.
    #[error("binding loop detected for property \"{0}\"")]
    CyclicBinding(String),

    /// A binding was assigned without an object scope and a component scope.
    #[error("internal error: binding assigned to \"{0}\" without scope")]
    BindingScope(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl EvalError {
    pub(crate) fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    pub(crate) fn range_error(msg: impl Into<String>) -> Self {
        Self::Range(msg.into())
    }

    /// The value a script `catch` clause receives, or `None` when the error is
    /// not catchable from script.
    pub(crate) fn to_catch_value(&self) -> Option<Value> {
        match self {
            Self::Thrown(v) => Some(v.clone()),
            Self::Reference(_) | Self::Type(_) | Self::Range(_) => Some(Value::from(self.to_string())),
            _ => None,
        }
    }
}

/// Structural problem found while turning a document into element templates.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("document has no root element")]
    NoRootElement,

    #[error("document must have exactly one root element, found {0} top-level statements")]
    MultipleRoots(usize),

    #[error("{kind} is not allowed at line {line}")]
    Unexpected { kind: &'static str, line: usize },
}

/// Top-level error type of the engine API.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("no component registered under \"{0}\"")]
    UnknownComponent(String),
}
