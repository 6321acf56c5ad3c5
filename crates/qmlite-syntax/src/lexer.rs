use std::fmt;
use std::rc::Rc;

use crate::error::ParseError;

// ── Character classes ─────────────────────────────────────────────────────

const KEYWORDS: &[&str] = &[
    "break", "case", "catch", "const", "continue", "debugger", "default", "delete", "do",
    "else", "finally", "for", "function", "if", "in", "instanceof", "new", "return",
    "switch", "throw", "try", "typeof", "var", "void", "while", "with",
];

const KEYWORDS_BEFORE_EXPRESSION: &[&str] = &["return", "new", "delete", "throw", "else", "case"];

const KEYWORDS_ATOM: &[&str] = &["false", "null", "true", "undefined"];

/// Keywords that the parser treats as operators.
const OPERATOR_WORDS: &[&str] = &["in", "instanceof", "typeof", "new", "void", "delete"];

const OPERATORS: &[&str] = &[
    "++", "--", "+", "-", "!", "~", "&", "|", "^", "*", "/", "%", ">>", "<<", ">>>", "<", ">",
    "<=", ">=", "==", "===", "!=", "!==", "?", "=", "+=", "-=", "/=", "*=", "%=", ">>=", "<<=",
    ">>>=", "|=", "^=", "&=", "&&", "||",
];

const OPERATOR_CHARS: &str = "+-*&%=<>!?|~^";
const PUNC_CHARS: &str = "[]{}(),;:";
const PUNC_BEFORE_EXPRESSION: &str = "[{}(,.;:";

fn is_identifier_start(ch: char) -> bool {
    ch == '$' || ch == '_' || ch.is_alphabetic()
}

fn is_identifier_char(ch: char) -> bool {
    is_identifier_start(ch)
        || ch.is_alphanumeric()
        || matches!(ch, '\u{200c}' | '\u{200d}' | '\u{203f}' | '\u{2040}')
}

// ── Token ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Name(String),
    Num(f64),
    Str(String),
    Punc(char),
    Operator(String),
    Keyword(String),
    /// `true`, `false`, `null` or `undefined`.
    Atom(String),
    Regexp { pattern: String, flags: String },
    Eof,
}

impl Token {
    /// The token class name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Name(_) => "name",
            Token::Num(_) => "num",
            Token::Str(_) => "string",
            Token::Punc(_) => "punc",
            Token::Operator(_) => "operator",
            Token::Keyword(_) => "keyword",
            Token::Atom(_) => "atom",
            Token::Regexp { .. } => "regexp",
            Token::Eof => "eof",
        }
    }

    pub fn is_punc(&self, c: char) -> bool {
        matches!(self, Token::Punc(p) if *p == c)
    }

    pub fn is_operator(&self, op: &str) -> bool {
        matches!(self, Token::Operator(o) if o == op)
    }

    pub fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Token::Keyword(k) if k == kw)
    }

    pub fn is_name(&self, name: &str) -> bool {
        matches!(self, Token::Name(n) if n == name)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(s) | Token::Operator(s) | Token::Keyword(s) | Token::Atom(s) => {
                write!(f, "{} ({})", self.kind(), s)
            }
            Token::Str(s) => write!(f, "string ({:?})", s),
            Token::Num(n) => write!(f, "num ({})", n),
            Token::Punc(c) => write!(f, "punc ({})", c),
            Token::Regexp { pattern, flags } => write!(f, "regexp (/{}/{})", pattern, flags),
            Token::Eof => write!(f, "eof"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
}

/// A comment stripped by the lexer, attached to the next real token.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub kind: CommentKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
    pub pos: usize,
}

/// A token together with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenWithPos {
    pub token: Token,
    /// 1-based line of the first character.
    pub line: usize,
    /// 1-based column of the first character.
    pub col: usize,
    /// Byte offset of the first character.
    pub pos: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
    pub comments_before: Vec<Comment>,
}

// ── Lexer ─────────────────────────────────────────────────────────────────

/// On-demand tokenizer over a normalized copy of the source.
///
/// Regex literals and the division operator share the `/` character; the
/// lexer decides between them with `regex_allowed`, recomputed after every
/// token from its syntactic class.
#[derive(Clone)]
pub struct Lexer {
    src: Rc<str>,
    pos: usize,
    line: usize,
    col: usize,
    tok_pos: usize,
    tok_line: usize,
    tok_col: usize,
    newline_before: bool,
    regex_allowed: bool,
    comments_before: Vec<Comment>,
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        let src = src.strip_prefix('\u{feff}').unwrap_or(src);
        let src = src
            .replace("\r\n", "\n")
            .replace(['\r', '\u{2028}', '\u{2029}'], "\n");
        Self {
            src: src.into(),
            pos: 0,
            line: 1,
            col: 1,
            tok_pos: 0,
            tok_line: 1,
            tok_col: 1,
            newline_before: false,
            regex_allowed: false,
            comments_before: Vec::new(),
        }
    }

    /// The normalized source text. Token positions index into this string.
    pub fn source(&self) -> &str {
        &self.src
    }

    /// Lex the whole input, including the trailing `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<TokenWithPos>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token(false)?;
            let eof = tok.token == Token::Eof;
            tokens.push(tok);
            if eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.src[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.newline_before = true;
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn advance_or_eof(&mut self, eof_message: &str) -> Result<char, ParseError> {
        self.advance().ok_or_else(|| self.error(eof_message))
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::lexical(msg, self.tok_line, self.tok_col, self.tok_pos)
    }

    fn start_token(&mut self) {
        self.tok_line = self.line;
        self.tok_col = self.col;
        self.tok_pos = self.pos;
    }

    fn token(&mut self, token: Token) -> TokenWithPos {
        self.regex_allowed = match &token {
            Token::Operator(op) => op != "++" && op != "--",
            Token::Keyword(kw) => KEYWORDS_BEFORE_EXPRESSION.contains(&kw.as_str()),
            Token::Punc(c) => PUNC_BEFORE_EXPRESSION.contains(*c),
            _ => false,
        };
        let tok = TokenWithPos {
            token,
            line: self.tok_line,
            col: self.tok_col,
            pos: self.tok_pos,
            end: self.pos,
            newline_before: self.newline_before,
            comments_before: std::mem::take(&mut self.comments_before),
        };
        self.newline_before = false;
        tok
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace() || c == '\u{200b}') {
            self.advance();
        }
    }

    /// Produce the next token. `force_regex` re-reads the input as the body
    /// of a regex literal whose opening `/` has already been consumed.
    pub fn next_token(&mut self, force_regex: bool) -> Result<TokenWithPos, ParseError> {
        if force_regex {
            return self.read_regexp();
        }
        loop {
            self.skip_whitespace();
            self.start_token();
            let ch = match self.peek() {
                None => return Ok(self.token(Token::Eof)),
                Some(c) => c,
            };
            return match ch {
                '/' if self.peek_second() == Some('/') => {
                    self.read_line_comment();
                    continue;
                }
                '/' if self.peek_second() == Some('*') => {
                    self.read_block_comment()?;
                    continue;
                }
                c if c.is_ascii_digit() => self.read_num(None),
                '"' | '\'' => self.read_string(),
                c if PUNC_CHARS.contains(c) => {
                    self.advance();
                    Ok(self.token(Token::Punc(c)))
                }
                '.' => self.handle_dot(),
                '/' => {
                    self.advance();
                    if self.regex_allowed {
                        self.read_regexp()
                    } else {
                        Ok(self.read_operator("/".to_string()))
                    }
                }
                c if OPERATOR_CHARS.contains(c) => {
                    self.advance();
                    Ok(self.read_operator(c.to_string()))
                }
                c if c == '\\' || is_identifier_start(c) => self.read_word(),
                other => Err(self.error(format!("Unexpected character {:?}", other))),
            };
        }
    }

    /// Rewind to just after the `/` of `tok` and lex a regex literal from
    /// there. Used when the parser finds a `/` where a statement starts.
    pub fn reread_as_regexp(&mut self, tok: &TokenWithPos) -> Result<TokenWithPos, ParseError> {
        self.pos = tok.pos + 1;
        self.line = tok.line;
        self.col = tok.col + 1;
        self.tok_pos = tok.pos;
        self.tok_line = tok.line;
        self.tok_col = tok.col;
        self.newline_before = tok.newline_before;
        self.comments_before = tok.comments_before.clone();
        self.read_regexp()
    }

    fn read_line_comment(&mut self) {
        let (line, col, pos) = (self.line, self.col, self.pos);
        self.advance();
        self.advance(); // consume `//`
        let start = self.pos;
        while !matches!(self.peek(), None | Some('\n')) {
            self.advance();
        }
        self.comments_before.push(Comment {
            kind: CommentKind::Line,
            text: self.src[start..self.pos].to_string(),
            line,
            col,
            pos,
        });
    }

    fn read_block_comment(&mut self) -> Result<(), ParseError> {
        let (line, col, pos) = (self.line, self.col, self.pos);
        self.advance();
        self.advance(); // consume `/*`
        let start = self.pos;
        let Some(len) = self.src[start..].find("*/") else {
            return Err(self.error("Unterminated multiline comment"));
        };
        while self.pos < start + len {
            self.advance();
        }
        let text = self.src[start..self.pos].to_string();
        self.advance();
        self.advance(); // consume `*/`
        self.comments_before.push(Comment { kind: CommentKind::Block, text, line, col, pos });
        Ok(())
    }

    fn read_num(&mut self, prefix: Option<char>) -> Result<TokenWithPos, ParseError> {
        let mut num = String::new();
        if let Some(p) = prefix {
            num.push(p);
        }
        let (mut has_e, mut after_e, mut has_x) = (false, false, false);
        let mut has_dot = prefix == Some('.');
        while let Some(ch) = self.peek() {
            let accept = match ch {
                'x' | 'X' => !std::mem::replace(&mut has_x, true),
                'e' | 'E' if !has_x => {
                    if has_e {
                        false
                    } else {
                        has_e = true;
                        after_e = true;
                        true
                    }
                }
                '-' | '+' => std::mem::replace(&mut after_e, false),
                '.' => {
                    after_e = false;
                    if !has_dot && !has_x {
                        has_dot = true;
                        true
                    } else {
                        false
                    }
                }
                c => {
                    after_e = false;
                    c.is_alphanumeric()
                }
            };
            if !accept {
                break;
            }
            self.advance();
            num.push(ch);
        }
        match parse_js_number(&num) {
            Some(n) => Ok(self.token(Token::Num(n))),
            None => Err(self.error(format!("Invalid syntax: {}", num))),
        }
    }

    fn read_escaped_char(&mut self, eof_message: &str) -> Result<Option<char>, ParseError> {
        let ch = self.advance_or_eof(eof_message)?;
        Ok(Some(match ch {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'b' => '\u{8}',
            'v' => '\u{b}',
            'f' => '\u{c}',
            '0' => '\0',
            'x' => self.hex_char(2, eof_message)?,
            'u' => self.hex_char(4, eof_message)?,
            // line continuation
            '\n' => return Ok(None),
            other => other,
        }))
    }

    fn hex_char(&mut self, digits: usize, eof_message: &str) -> Result<char, ParseError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let ch = self.advance_or_eof(eof_message)?;
            let digit = ch
                .to_digit(16)
                .ok_or_else(|| self.error("Invalid hex-character pattern in string"))?;
            code = (code << 4) | digit;
        }
        Ok(char::from_u32(code).unwrap_or('\u{fffd}'))
    }

    fn read_string(&mut self) -> Result<TokenWithPos, ParseError> {
        const UNTERMINATED: &str = "Unterminated string constant";
        let quote = self.advance_or_eof(UNTERMINATED)?;
        let mut s = String::new();
        loop {
            match self.advance_or_eof(UNTERMINATED)? {
                '\\' => {
                    if let Some(c) = self.read_escaped_char(UNTERMINATED)? {
                        s.push(c);
                    }
                }
                c if c == quote => break,
                c => s.push(c),
            }
        }
        Ok(self.token(Token::Str(s)))
    }

    fn read_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.advance();
                if self.peek() != Some('u') {
                    return Err(self.error("Expecting UnicodeEscapeSequence -- uXXXX"));
                }
                self.advance();
                let c = self.hex_char(4, "Unterminated unicode escape")?;
                if !is_identifier_char(c) {
                    return Err(self.error(format!(
                        "Unicode char: {} is not valid in identifier",
                        c as u32
                    )));
                }
                name.push(c);
            } else if is_identifier_char(ch) {
                self.advance();
                name.push(ch);
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn read_regexp(&mut self) -> Result<TokenWithPos, ParseError> {
        const UNTERMINATED: &str = "Unterminated regular expression";
        let mut pattern = String::new();
        let (mut prev_backslash, mut in_class) = (false, false);
        loop {
            let ch = self.advance_or_eof(UNTERMINATED)?;
            if ch == '\n' {
                return Err(self.error(UNTERMINATED));
            }
            if prev_backslash {
                pattern.push('\\');
                pattern.push(ch);
                prev_backslash = false;
            } else if ch == '[' {
                in_class = true;
                pattern.push(ch);
            } else if ch == ']' && in_class {
                in_class = false;
                pattern.push(ch);
            } else if ch == '/' && !in_class {
                break;
            } else if ch == '\\' {
                prev_backslash = true;
            } else {
                pattern.push(ch);
            }
        }
        let flags = self.read_name()?;
        Ok(self.token(Token::Regexp { pattern, flags }))
    }

    fn read_operator(&mut self, mut op: String) -> TokenWithPos {
        while let Some(c) = self.peek() {
            let mut bigger = op.clone();
            bigger.push(c);
            if !OPERATORS.contains(&bigger.as_str()) {
                break;
            }
            self.advance();
            op = bigger;
        }
        self.token(Token::Operator(op))
    }

    fn handle_dot(&mut self) -> Result<TokenWithPos, ParseError> {
        self.advance();
        if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.read_num(Some('.'))
        } else {
            Ok(self.token(Token::Punc('.')))
        }
    }

    fn read_word(&mut self) -> Result<TokenWithPos, ParseError> {
        let word = self.read_name()?;
        let w = word.as_str();
        let token = if KEYWORDS.contains(&w) {
            if OPERATOR_WORDS.contains(&w) {
                Token::Operator(word)
            } else {
                Token::Keyword(word)
            }
        } else if KEYWORDS_ATOM.contains(&w) {
            Token::Atom(word)
        } else {
            Token::Name(word)
        };
        Ok(self.token(token))
    }
}

/// Parse a numeric literal the way the script language does: hex with a
/// `0x` prefix, legacy octal with a leading `0`, otherwise decimal.
fn parse_js_number(num: &str) -> Option<f64> {
    let lower = num.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return Some(hex.chars().fold(0.0, |acc, c| acc * 16.0 + c.to_digit(16).unwrap_or(0) as f64));
    }
    if lower.len() > 1 && lower.starts_with('0') && lower.chars().all(|c| ('0'..='7').contains(&c)) {
        return Some(lower.chars().fold(0.0, |acc, c| acc * 8.0 + c.to_digit(8).unwrap_or(0) as f64));
    }
    if !lower.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | '+' | '-')) {
        return None;
    }
    lower.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn division_chain_is_not_a_regex() {
        let toks = kinds("a / b / c");
        assert_eq!(
            toks,
            vec![
                Token::Name("a".into()),
                Token::Operator("/".into()),
                Token::Name("b".into()),
                Token::Operator("/".into()),
                Token::Name("c".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn regex_after_return() {
        let toks = kinds("return /abc/g");
        assert_eq!(toks[0], Token::Keyword("return".into()));
        assert_eq!(
            toks[1],
            Token::Regexp { pattern: "abc".into(), flags: "g".into() }
        );
    }

    #[test]
    fn regex_after_open_paren_and_divide_after_paren_close() {
        let toks = kinds("(/x/)");
        assert!(matches!(toks[1], Token::Regexp { .. }));
        let toks = kinds("(a) / 2");
        assert_eq!(toks[3], Token::Operator("/".into()));
    }

    #[test]
    fn spans_reconstruct_source() {
        let src = "Rectangle {\n    width: 100 * 2; color: 'red'\n    id: r1 }";
        let toks = Lexer::new(src).tokenize().unwrap();
        let mut rebuilt = String::new();
        for pair in toks.windows(2) {
            rebuilt.push_str(&src[pair[0].pos..pair[1].pos]);
        }
        assert_eq!(rebuilt, src);
        for t in &toks {
            if let Token::Name(n) = &t.token {
                assert_eq!(&src[t.pos..t.end], n);
            }
        }
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("0x1F")[0], Token::Num(31.0));
        assert_eq!(kinds("017")[0], Token::Num(15.0));
        assert_eq!(kinds("1.5e3")[0], Token::Num(1500.0));
        assert_eq!(kinds(".25")[0], Token::Num(0.25));
        assert_eq!(kinds("2e-2")[0], Token::Num(0.02));
    }

    #[test]
    fn invalid_number_reports_position() {
        let err = Lexer::new("x = 12abc").tokenize().unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.col, 5);
        assert_eq!(err.pos, 4);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(kinds(r#""a\tbA\x42""#)[0], Token::Str("a\tbAB".into()));
        assert_eq!(kinds(r#"'it\'s'"#)[0], Token::Str("it's".into()));
    }

    #[test]
    fn unterminated_constructs() {
        assert!(Lexer::new("'abc").tokenize().is_err());
        assert!(Lexer::new("/* abc").tokenize().is_err());
        assert!(Lexer::new("x = (/abc").tokenize().is_err());
    }

    #[test]
    fn comments_attach_to_next_token() {
        let toks = Lexer::new("// one\n/* two */ a").tokenize().unwrap();
        assert_eq!(toks[0].token, Token::Name("a".into()));
        assert_eq!(toks[0].comments_before.len(), 2);
        assert_eq!(toks[0].comments_before[0].text, " one");
        assert!(toks[0].newline_before);
    }

    #[test]
    fn word_classes() {
        let toks = kinds("typeof x in true function");
        assert_eq!(toks[0], Token::Operator("typeof".into()));
        assert_eq!(toks[2], Token::Operator("in".into()));
        assert_eq!(toks[3], Token::Atom("true".into()));
        assert_eq!(toks[4], Token::Keyword("function".into()));
    }

    #[test]
    fn line_terminators_are_normalized() {
        let toks = Lexer::new("a\r\nb\rc").tokenize().unwrap();
        assert_eq!(toks[1].line, 2);
        assert_eq!(toks[2].line, 3);
    }

    #[test]
    fn unicode_escape_in_identifier() {
        assert_eq!(kinds(r"\u0061bc")[0], Token::Name("abc".into()));
        assert!(Lexer::new(r"\x61").tokenize().is_err());
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(kinds("a >>>= 1")[1], Token::Operator(">>>=".into()));
        assert_eq!(kinds("a !== b")[1], Token::Operator("!==".into()));
    }

    #[test]
    fn regex_cannot_span_lines() {
        let err = Lexer::new("x = /ab\nc/").tokenize().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Lexical);
        assert!(err.message.contains("Unterminated regular expression"));
        assert!(Lexer::new("x = /a[/]b/g").tokenize().is_ok());
    }

    #[test]
    fn unexpected_character() {
        let err = Lexer::new("a @ b").tokenize().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Lexical);
        assert!(err.message.contains("Unexpected character"));
    }
}
