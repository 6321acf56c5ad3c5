use std::rc::Rc;

use crate::ast::{
    assignment_operator, Atom, BinaryOp, CatchClause, Expr, ForInit, Function, ObjectProperty,
    PropertyValue, Stmt, SwitchCase, UnaryOp, VarDecl,
};
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenWithPos};

type PResult<T> = Result<T, ParseError>;

// ── Parser ────────────────────────────────────────────────────────────────

/// Recursive-descent parser with one token of lookahead.
///
/// The document grammar (`document.rs`) extends this same struct, so element
/// blocks can appear inside expressions and scripts inside documents.
#[derive(Clone)]
pub struct Parser {
    pub(crate) lexer: Lexer,
    pub(crate) token: TokenWithPos,
    peeked: Option<TokenWithPos>,
    pub(crate) in_function: usize,
    in_loop: usize,
    in_switch: usize,
    labels: Vec<String>,
    exigent: bool,
}

impl Parser {
    pub fn new(src: &str) -> PResult<Self> {
        let mut lexer = Lexer::new(src);
        let token = lexer.next_token(false)?;
        Ok(Self {
            lexer,
            token,
            peeked: None,
            in_function: 0,
            in_loop: 0,
            in_switch: 0,
            labels: Vec::new(),
            exigent: false,
        })
    }

    /// Strict mode: no semicolon insertion, no trailing commas, assignment
    /// targets are validated.
    pub fn exigent(mut self, exigent: bool) -> Self {
        self.exigent = exigent;
        self
    }

    // ── Token helpers ─────────────────────────────────────────────────────

    pub(crate) fn is_punc(&self, c: char) -> bool {
        self.token.token.is_punc(c)
    }

    pub(crate) fn is_operator(&self, op: &str) -> bool {
        self.token.token.is_operator(op)
    }

    pub(crate) fn is_keyword(&self, kw: &str) -> bool {
        self.token.token.is_keyword(kw)
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.token.token == Token::Eof
    }

    pub(crate) fn peek(&mut self) -> PResult<&TokenWithPos> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token(false)?);
        }
        Ok(self.peeked.as_ref().unwrap_or(&self.token))
    }

    /// Move to the next token, returning the one just consumed.
    pub(crate) fn advance(&mut self) -> PResult<TokenWithPos> {
        let next = match self.peeked.take() {
            Some(tok) => tok,
            None => self.lexer.next_token(false)?,
        };
        Ok(std::mem::replace(&mut self.token, next))
    }

    pub(crate) fn croak(&self, msg: impl Into<String>) -> ParseError {
        ParseError::syntax(msg, self.token.line, self.token.col, self.token.pos)
    }

    pub(crate) fn unexpected_at(&self, tok: &TokenWithPos) -> ParseError {
        ParseError::syntax(format!("Unexpected token: {}", tok.token), tok.line, tok.col, tok.pos)
    }

    pub(crate) fn unexpected(&self) -> ParseError {
        self.unexpected_at(&self.token)
    }

    pub(crate) fn expect(&mut self, c: char) -> PResult<()> {
        if self.is_punc(c) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.croak(format!(
                "Unexpected token {}, expected punc ({})",
                self.token.token, c
            )))
        }
    }

    pub(crate) fn expect_name(&mut self) -> PResult<String> {
        match &self.token.token {
            Token::Name(n) => {
                let n = n.clone();
                self.advance()?;
                Ok(n)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn can_insert_semicolon(&self) -> bool {
        !self.exigent && (self.token.newline_before || self.is_eof() || self.is_punc('}'))
    }

    pub(crate) fn semicolon(&mut self) -> PResult<()> {
        if self.is_punc(';') {
            self.advance()?;
            Ok(())
        } else if self.can_insert_semicolon() {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn parenthesised(&mut self) -> PResult<Expr> {
        self.expect('(')?;
        let expr = self.expression(true, false)?;
        self.expect(')')?;
        Ok(expr)
    }

    fn in_loop<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        self.in_loop += 1;
        let result = f(self);
        self.in_loop -= 1;
        result
    }

    // ── Statements ────────────────────────────────────────────────────────

    pub fn parse_program(&mut self) -> PResult<Vec<Stmt>> {
        let mut out = Vec::new();
        while !self.is_eof() {
            out.push(self.statement()?);
        }
        Ok(out)
    }

    pub(crate) fn statement(&mut self) -> PResult<Stmt> {
        if self.is_operator("/") || self.is_operator("/=") {
            self.peeked = None;
            let current = self.token.clone();
            self.token = self.lexer.reread_as_regexp(&current)?;
        }
        let tok = self.token.token.clone();
        match tok {
            Token::Num(_) | Token::Str(_) | Token::Regexp { .. } | Token::Operator(_) | Token::Atom(_) => {
                self.simple_statement()
            }
            Token::Name(name) => {
                if self.peek()?.token.is_punc(':') {
                    self.advance()?;
                    self.advance()?;
                    self.labeled_statement(name)
                } else {
                    self.simple_statement()
                }
            }
            Token::Punc('{') => Ok(Stmt::Block(self.block()?)),
            Token::Punc('[') | Token::Punc('(') => self.simple_statement(),
            Token::Punc(';') => {
                self.advance()?;
                Ok(Stmt::Block(Vec::new()))
            }
            Token::Keyword(kw) => {
                self.advance()?;
                self.keyword_statement(&kw)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn keyword_statement(&mut self, kw: &str) -> PResult<Stmt> {
        match kw {
            "break" => self.break_cont(true),
            "continue" => self.break_cont(false),
            "debugger" => {
                self.semicolon()?;
                Ok(Stmt::Debugger)
            }
            "do" => {
                let body = self.in_loop(|p| p.statement())?;
                if !self.is_keyword("while") {
                    return Err(self.unexpected());
                }
                self.advance()?;
                let cond = self.parenthesised()?;
                self.semicolon()?;
                Ok(Stmt::Do { body: Box::new(body), cond })
            }
            "for" => self.for_statement(),
            "function" => Ok(Stmt::Defun(self.function(true)?)),
            "if" => {
                let cond = self.parenthesised()?;
                let then = Box::new(self.statement()?);
                let otherwise = if self.is_keyword("else") {
                    self.advance()?;
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If { cond, then, otherwise })
            }
            "return" => {
                if self.in_function == 0 {
                    return Err(self.croak("'return' outside of function"));
                }
                let value = if self.is_punc(';') {
                    self.advance()?;
                    None
                } else if self.can_insert_semicolon() {
                    None
                } else {
                    let expr = self.expression(true, false)?;
                    self.semicolon()?;
                    Some(expr)
                };
                Ok(Stmt::Return(value))
            }
            "switch" => {
                let discriminant = self.parenthesised()?;
                self.in_switch += 1;
                let cases = self.switch_block();
                self.in_switch -= 1;
                let cases = cases?;
                Ok(Stmt::Switch { discriminant, cases })
            }
            "throw" => {
                let expr = self.expression(true, false)?;
                self.semicolon()?;
                Ok(Stmt::Throw(expr))
            }
            "try" => self.try_statement(),
            "var" => {
                let decls = self.var_defs(false)?;
                self.semicolon()?;
                Ok(Stmt::Var(decls))
            }
            "const" => {
                let decls = self.var_defs(false)?;
                self.semicolon()?;
                Ok(Stmt::Const(decls))
            }
            "while" => {
                let cond = self.parenthesised()?;
                let body = Box::new(self.in_loop(|p| p.statement())?);
                Ok(Stmt::While { cond, body })
            }
            "with" => {
                let object = self.parenthesised()?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::With { object, body })
            }
            _ => Err(self.croak(format!("Unexpected token: keyword ({})", kw))),
        }
    }

    fn labeled_statement(&mut self, label: String) -> PResult<Stmt> {
        self.labels.push(label.clone());
        let start = self.token.clone();
        let body = self.statement()?;
        if self.exigent
            && !matches!(
                body,
                Stmt::For { .. } | Stmt::ForIn { .. } | Stmt::Do { .. } | Stmt::While { .. } | Stmt::Switch { .. }
            )
        {
            return Err(self.unexpected_at(&start));
        }
        self.labels.pop();
        Ok(Stmt::Label { label, body: Box::new(body) })
    }

    fn simple_statement(&mut self) -> PResult<Stmt> {
        let expr = self.expression(true, false)?;
        self.semicolon()?;
        Ok(Stmt::Expr(expr))
    }

    fn break_cont(&mut self, is_break: bool) -> PResult<Stmt> {
        let label = match &self.token.token {
            Token::Name(n) => Some(n.clone()),
            _ => None,
        };
        match &label {
            Some(name) => {
                self.advance()?;
                if !self.labels.contains(name) {
                    return Err(self.croak(format!(
                        "Label {} without matching loop or statement",
                        name
                    )));
                }
            }
            None if self.in_loop == 0 && (!is_break || self.in_switch == 0) => {
                let kw = if is_break { "break" } else { "continue" };
                return Err(self.croak(format!("{} not inside a loop or switch", kw)));
            }
            None => {}
        }
        self.semicolon()?;
        Ok(if is_break { Stmt::Break(label) } else { Stmt::Continue(label) })
    }

    fn for_statement(&mut self) -> PResult<Stmt> {
        self.expect('(')?;
        let mut init = None;
        if !self.is_punc(';') {
            let first = if self.is_keyword("var") {
                self.advance()?;
                ForInit::Var(self.var_defs(true)?)
            } else {
                ForInit::Expr(self.expression(true, true)?)
            };
            if self.is_operator("in") {
                return self.for_in(first);
            }
            init = Some(first);
        }
        self.expect(';')?;
        let cond = if self.is_punc(';') { None } else { Some(self.expression(true, false)?) };
        self.expect(';')?;
        let step = if self.is_punc(')') { None } else { Some(self.expression(true, false)?) };
        self.expect(')')?;
        let body = Box::new(self.in_loop(|p| p.statement())?);
        Ok(Stmt::For { init, cond, step, body })
    }

    fn for_in(&mut self, init: ForInit) -> PResult<Stmt> {
        let (declare, target) = match init {
            ForInit::Var(mut decls) if !decls.is_empty() => (true, Expr::Name(decls.swap_remove(0).name)),
            ForInit::Var(_) => return Err(self.unexpected()),
            ForInit::Expr(expr) => (false, expr),
        };
        self.advance()?; // `in`
        let object = self.expression(true, false)?;
        self.expect(')')?;
        let body = Box::new(self.in_loop(|p| p.statement())?);
        Ok(Stmt::ForIn { declare, target, object, body })
    }

    pub(crate) fn function(&mut self, in_statement: bool) -> PResult<Rc<Function>> {
        let name = match &self.token.token {
            Token::Name(n) => {
                let n = n.clone();
                self.advance()?;
                Some(n)
            }
            _ => None,
        };
        if in_statement && name.is_none() {
            return Err(self.unexpected());
        }
        self.expect('(')?;
        let mut params = Vec::new();
        let mut first = true;
        while !self.is_punc(')') {
            if !first {
                self.expect(',')?;
            }
            first = false;
            params.push(self.expect_name()?);
        }
        self.advance()?;

        self.in_function += 1;
        let saved_loop = std::mem::replace(&mut self.in_loop, 0);
        let saved_switch = std::mem::replace(&mut self.in_switch, 0);
        let body = self.block();
        self.in_function -= 1;
        self.in_loop = saved_loop;
        self.in_switch = saved_switch;

        Ok(Rc::new(Function { name, params, body: body? }))
    }

    pub(crate) fn block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect('{')?;
        let mut out = Vec::new();
        while !self.is_punc('}') {
            if self.is_eof() {
                return Err(self.unexpected());
            }
            out.push(self.statement()?);
        }
        self.advance()?;
        Ok(out)
    }

    fn switch_block(&mut self) -> PResult<Vec<SwitchCase>> {
        self.expect('{')?;
        let mut cases: Vec<SwitchCase> = Vec::new();
        while !self.is_punc('}') {
            if self.is_eof() {
                return Err(self.unexpected());
            }
            if self.is_keyword("case") {
                self.advance()?;
                let test = self.expression(true, false)?;
                self.expect(':')?;
                cases.push(SwitchCase { test: Some(test), body: Vec::new() });
            } else if self.is_keyword("default") {
                self.advance()?;
                self.expect(':')?;
                cases.push(SwitchCase { test: None, body: Vec::new() });
            } else {
                let stmt = self.statement()?;
                match cases.last_mut() {
                    Some(case) => case.body.push(stmt),
                    None => return Err(self.unexpected()),
                }
            }
        }
        self.advance()?;
        Ok(cases)
    }

    fn try_statement(&mut self) -> PResult<Stmt> {
        let body = self.block()?;
        let mut catch = None;
        let mut finally = None;
        if self.is_keyword("catch") {
            self.advance()?;
            self.expect('(')?;
            let param = match &self.token.token {
                Token::Name(n) => n.clone(),
                _ => return Err(self.croak("Name expected")),
            };
            self.advance()?;
            self.expect(')')?;
            catch = Some(CatchClause { param, body: self.block()? });
        }
        if self.is_keyword("finally") {
            self.advance()?;
            finally = Some(self.block()?);
        }
        if catch.is_none() && finally.is_none() {
            return Err(self.croak("Missing catch/finally blocks"));
        }
        Ok(Stmt::Try { body, catch, finally })
    }

    fn var_defs(&mut self, no_in: bool) -> PResult<Vec<VarDecl>> {
        let mut out = Vec::new();
        loop {
            let name = self.expect_name()?;
            let init = if self.is_operator("=") {
                self.advance()?;
                Some(self.expression(false, no_in)?)
            } else {
                None
            };
            out.push(VarDecl { name, init });
            if !self.is_punc(',') {
                break;
            }
            self.advance()?;
        }
        Ok(out)
    }

    // ── Expressions ───────────────────────────────────────────────────────

    pub(crate) fn expression(&mut self, commas: bool, no_in: bool) -> PResult<Expr> {
        let expr = self.maybe_qml_element(no_in)?;
        if commas && self.is_punc(',') {
            self.advance()?;
            let rest = self.expression(true, no_in)?;
            return Ok(Expr::Seq(Box::new(expr), Box::new(rest)));
        }
        Ok(expr)
    }

    fn maybe_qml_element(&mut self, no_in: bool) -> PResult<Expr> {
        let expr = self.maybe_assign(no_in)?;
        if self.is_punc('{') {
            if let Expr::Name(class_name) = &expr {
                let (line, col) = (self.token.line, self.token.col);
                let body = self.qml_block()?;
                return Ok(Expr::QmlElem(Rc::new(crate::ast::QmlElement {
                    class_name: class_name.clone(),
                    on_property: None,
                    body,
                    line,
                    col,
                })));
            }
        }
        Ok(expr)
    }

    fn maybe_assign(&mut self, no_in: bool) -> PResult<Expr> {
        let left = self.maybe_conditional(no_in)?;
        if let Token::Operator(op) = &self.token.token {
            if let Some(assign) = assignment_operator(op) {
                if !self.is_assignable(&left) {
                    return Err(self.croak("Invalid assignment"));
                }
                self.advance()?;
                let right = self.maybe_assign(no_in)?;
                return Ok(Expr::Assign(assign, Box::new(left), Box::new(right)));
            }
        }
        Ok(left)
    }

    fn maybe_conditional(&mut self, no_in: bool) -> PResult<Expr> {
        let expr = self.expr_ops(no_in)?;
        if self.is_operator("?") {
            self.advance()?;
            let yes = self.expression(false, false)?;
            self.expect(':')?;
            let no = self.expression(false, no_in)?;
            return Ok(Expr::Conditional(Box::new(expr), Box::new(yes), Box::new(no)));
        }
        Ok(expr)
    }

    fn expr_ops(&mut self, no_in: bool) -> PResult<Expr> {
        let atom = self.expr_atom(true)?;
        self.expr_op(atom, 0, no_in)
    }

    /// Precedence climbing over the binary operator table.
    fn expr_op(&mut self, left: Expr, min_prec: u8, no_in: bool) -> PResult<Expr> {
        let op = match &self.token.token {
            Token::Operator(o) => BinaryOp::from_operator(o),
            _ => None,
        };
        let op = op.filter(|op| !(no_in && *op == BinaryOp::In));
        match op {
            Some(op) if op.precedence() > min_prec => {
                self.advance()?;
                let atom = self.expr_atom(true)?;
                let right = self.expr_op(atom, op.precedence(), no_in)?;
                let combined = Expr::Binary(op, Box::new(left), Box::new(right));
                self.expr_op(combined, min_prec, no_in)
            }
            _ => Ok(left),
        }
    }

    fn is_assignable(&self, expr: &Expr) -> bool {
        if !self.exigent {
            return true;
        }
        match expr {
            Expr::Dot(..) | Expr::Sub(..) | Expr::New(..) | Expr::Call(..) => true,
            Expr::Name(n) => n != "this",
            _ => false,
        }
    }

    fn make_unary(&self, op: UnaryOp, expr: Expr, postfix: bool) -> PResult<Expr> {
        if op.is_update() && !self.is_assignable(&expr) {
            let sym = if op == UnaryOp::Increment { "++" } else { "--" };
            return Err(self.croak(format!("Invalid use of {} operator", sym)));
        }
        Ok(if postfix {
            Expr::UnaryPostfix(op, Box::new(expr))
        } else {
            Expr::UnaryPrefix(op, Box::new(expr))
        })
    }

    fn expr_atom(&mut self, allow_calls: bool) -> PResult<Expr> {
        let tok = self.token.token.clone();
        match tok {
            Token::Operator(op) if op == "new" => {
                self.advance()?;
                self.new_expression()
            }
            Token::Operator(op) => match UnaryOp::prefix(&op) {
                Some(unary) => {
                    self.advance()?;
                    let operand = self.expr_atom(allow_calls)?;
                    self.make_unary(unary, operand, false)
                }
                None => Err(self.unexpected()),
            },
            Token::Punc('(') => {
                self.advance()?;
                let expr = self.expression(true, false)?;
                self.expect(')')?;
                self.subscripts(expr, allow_calls)
            }
            Token::Punc('[') => {
                self.advance()?;
                let array = self.array_literal()?;
                self.subscripts(array, allow_calls)
            }
            Token::Punc('{') => {
                self.advance()?;
                let object = self.object_literal()?;
                self.subscripts(object, allow_calls)
            }
            Token::Keyword(kw) if kw == "function" => {
                self.advance()?;
                let function = self.function(false)?;
                self.subscripts(Expr::Function(function), allow_calls)
            }
            Token::Num(n) => self.atom_then_subscripts(Expr::Num(n), allow_calls),
            Token::Str(s) => self.atom_then_subscripts(Expr::Str(s), allow_calls),
            Token::Name(n) => self.atom_then_subscripts(Expr::Name(n), allow_calls),
            Token::Atom(a) => match Atom::from_word(&a) {
                Some(atom) => self.atom_then_subscripts(Expr::Atom(atom), allow_calls),
                None => Err(self.unexpected()),
            },
            Token::Regexp { pattern, flags } => {
                self.atom_then_subscripts(Expr::Regexp { pattern, flags }, allow_calls)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn atom_then_subscripts(&mut self, atom: Expr, allow_calls: bool) -> PResult<Expr> {
        self.advance()?;
        self.subscripts(atom, allow_calls)
    }

    fn new_expression(&mut self) -> PResult<Expr> {
        let callee = self.expr_atom(false)?;
        let args = if self.is_punc('(') {
            self.advance()?;
            self.expr_list(')', false, false)?.into_iter().flatten().collect()
        } else {
            Vec::new()
        };
        self.subscripts(Expr::New(Box::new(callee), args), true)
    }

    fn expr_list(
        &mut self,
        closing: char,
        allow_trailing_comma: bool,
        allow_empty: bool,
    ) -> PResult<Vec<Option<Expr>>> {
        let mut out = Vec::new();
        let mut first = true;
        while !self.is_punc(closing) {
            if !first {
                self.expect(',')?;
            }
            first = false;
            if allow_trailing_comma && self.is_punc(closing) {
                break;
            }
            if allow_empty && self.is_punc(',') {
                out.push(None);
            } else {
                out.push(Some(self.expression(false, false)?));
            }
        }
        self.advance()?;
        Ok(out)
    }

    fn array_literal(&mut self) -> PResult<Expr> {
        let allow_trailing = !self.exigent;
        Ok(Expr::Array(self.expr_list(']', allow_trailing, true)?))
    }

    fn object_literal(&mut self) -> PResult<Expr> {
        let mut props = Vec::new();
        let mut first = true;
        while !self.is_punc('}') {
            if !first {
                self.expect(',')?;
            }
            first = false;
            if !self.exigent && self.is_punc('}') {
                break;
            }
            let is_name = matches!(self.token.token, Token::Name(_));
            let key = self.property_name()?;
            if is_name && (key == "get" || key == "set") && !self.is_punc(':') {
                let accessor = self.as_name()?;
                let function = self.function(false)?;
                let value = if key == "get" {
                    PropertyValue::Getter(function)
                } else {
                    PropertyValue::Setter(function)
                };
                props.push(ObjectProperty { key: accessor, value });
            } else {
                self.expect(':')?;
                let value = self.expression(false, false)?;
                props.push(ObjectProperty { key, value: PropertyValue::Value(value) });
            }
        }
        self.advance()?;
        Ok(Expr::Object(props))
    }

    fn property_name(&mut self) -> PResult<String> {
        match self.token.token.clone() {
            Token::Num(n) => {
                self.advance()?;
                Ok(number_key(n))
            }
            Token::Str(s) => {
                self.advance()?;
                Ok(s)
            }
            _ => self.as_name(),
        }
    }

    fn as_name(&mut self) -> PResult<String> {
        match self.token.token.clone() {
            Token::Name(s) | Token::Operator(s) | Token::Keyword(s) | Token::Atom(s) => {
                self.advance()?;
                Ok(s)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn subscripts(&mut self, mut expr: Expr, allow_calls: bool) -> PResult<Expr> {
        loop {
            if self.is_punc('.') {
                self.advance()?;
                let name = self.as_name()?;
                expr = Expr::Dot(Box::new(expr), name);
            } else if self.is_punc('[') {
                self.advance()?;
                let index = self.expression(true, false)?;
                self.expect(']')?;
                expr = Expr::Sub(Box::new(expr), Box::new(index));
            } else if allow_calls && self.is_punc('(') {
                self.advance()?;
                let args = self.expr_list(')', false, false)?.into_iter().flatten().collect();
                expr = Expr::Call(Box::new(expr), args);
            } else if allow_calls && !self.token.newline_before && (self.is_operator("++") || self.is_operator("--")) {
                let op = if self.is_operator("++") { UnaryOp::Increment } else { UnaryOp::Decrement };
                let result = self.make_unary(op, expr, true)?;
                self.advance()?;
                return Ok(result);
            } else {
                return Ok(expr);
            }
        }
    }
}

/// Numeric object keys are stored the way the script language prints them.
fn number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ── Entry points ──────────────────────────────────────────────────────────

/// Parse a script into its top-level statements.
pub fn parse_program(src: &str) -> Result<Vec<Stmt>, ParseError> {
    Parser::new(src)?.parse_program()
}

/// Parse statements as a function body, where `return` is allowed.
pub fn parse_function_body(src: &str) -> Result<Vec<Stmt>, ParseError> {
    let mut parser = Parser::new(src)?;
    parser.in_function = 1;
    parser.parse_program()
}

/// Parse a lone expression; trailing input is an error.
pub fn parse_expression_only(src: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(src)?;
    let expr = parser.expression(true, false)?;
    if parser.is_punc(';') {
        parser.advance()?;
    }
    if !parser.is_eof() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}
