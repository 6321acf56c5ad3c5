use std::fmt;

/// Which stage rejected the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad character, unterminated string/comment, malformed number.
    Lexical,
    /// Well-formed tokens in an order the grammar does not accept.
    Syntax,
}

/// A lexical or syntax error in a document or script.
///
/// Parse errors are fatal: a malformed document is never partially loaded.
/// Positions are 1-based; `pos` is a byte offset into the source after
/// line terminators have been normalized to `\n`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: usize,
    pub col: usize,
    pub pos: usize,
}

impl ParseError {
    pub(crate) fn lexical(message: impl Into<String>, line: usize, col: usize, pos: usize) -> Self {
        Self { kind: ErrorKind::Lexical, message: message.into(), line, col, pos }
    }

    pub(crate) fn syntax(message: impl Into<String>, line: usize, col: usize, pos: usize) -> Self {
        Self { kind: ErrorKind::Syntax, message: message.into(), line, col, pos }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.kind {
            ErrorKind::Lexical => "lexical",
            ErrorKind::Syntax => "syntax",
        };
        write!(f, "{stage} error at line {}, column {}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for ParseError {}
