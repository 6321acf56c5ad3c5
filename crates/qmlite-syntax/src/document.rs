//! Declarative extensions on top of the script parser: imports, element
//! blocks and the property/signal/method statements allowed inside them.

use std::rc::Rc;

use crate::ast::{
    BoundStatement, Document, Import, PropertyDecl, QmlElement, QmlStatement, SignalParam, Stmt,
};
use crate::error::ParseError;
use crate::lexer::Token;
use crate::parser::Parser;

type PResult<T> = Result<T, ParseError>;

fn is_element_name(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

impl Parser {
    pub fn parse_document(&mut self) -> PResult<Document> {
        let mut imports = Vec::new();
        while self.token.token.is_name("import") {
            imports.push(self.import()?);
        }
        let mut statements = Vec::new();
        while !self.is_eof() {
            statements.push(self.qml_statement()?);
        }
        Ok(Document { imports, statements })
    }

    // ── Imports ───────────────────────────────────────────────────────────

    fn import(&mut self) -> PResult<Import> {
        let line = self.token.line;
        self.advance()?; // `import`
        let (target, is_path) = match self.token.token.clone() {
            Token::Str(path) => {
                self.advance()?;
                (path, true)
            }
            Token::Name(_) => {
                let mut module = self.expect_name()?;
                while self.is_punc('.') {
                    self.advance()?;
                    module.push('.');
                    module.push_str(&self.expect_name()?);
                }
                (module, false)
            }
            _ => return Err(self.unexpected()),
        };
        let version = match self.token.token {
            Token::Num(_) => {
                let tok = self.advance()?;
                Some(self.lexer.source()[tok.pos..tok.end].to_string())
            }
            _ => None,
        };
        let qualifier = if self.token.token.is_name("as") {
            self.advance()?;
            Some(self.expect_name()?)
        } else {
            None
        };
        if self.is_punc(';') {
            self.advance()?;
        }
        Ok(Import { target, is_path, version, qualifier, line })
    }

    // ── Element bodies ────────────────────────────────────────────────────

    pub(crate) fn qml_block(&mut self) -> PResult<Vec<QmlStatement>> {
        self.expect('{')?;
        let mut out = Vec::new();
        while !self.is_punc('}') {
            if self.is_eof() {
                return Err(self.unexpected());
            }
            out.push(self.qml_statement()?);
        }
        self.advance()?;
        Ok(out)
    }

    fn qml_statement(&mut self) -> PResult<QmlStatement> {
        if self.is_keyword("function") {
            return self.method();
        }
        if self.is_keyword("default") {
            self.advance()?;
            if !self.token.token.is_name("property") {
                return Err(self.unexpected());
            }
            self.advance()?;
            return Ok(QmlStatement::DefaultProperty(Box::new(self.property_definition()?)));
        }
        let name = match &self.token.token {
            Token::Name(n) => n.clone(),
            _ => return Err(self.unexpected()),
        };
        if name == "signal" && !self.peek()?.token.is_punc(':') {
            return self.signal_definition();
        }
        let (line, col) = (self.token.line, self.token.col);
        self.advance()?;

        let declares = matches!(&self.token.token, Token::Name(_)) || self.is_keyword("var");
        if name == "property" && declares {
            return self.property_definition();
        }
        if is_element_name(&name) && !self.is_punc('.') {
            let on_property = if self.token.token.is_name("on") {
                self.advance()?;
                Some(self.expect_name()?)
            } else {
                None
            };
            let body = self.qml_block()?;
            return Ok(QmlStatement::Element(Rc::new(QmlElement {
                class_name: name,
                on_property,
                body,
                line,
                col,
            })));
        }
        if self.is_punc('.') {
            // `anchors.left: ...`, `Component.onCompleted: ...`
            self.advance()?;
            let property = self.expect_name()?;
            self.expect(':')?;
            let value = self.bound_statement()?;
            return Ok(QmlStatement::ObjectDef { object: name, property, value });
        }
        if self.is_punc('{') {
            let body = self.qml_block()?;
            return Ok(QmlStatement::Object { object: name, body });
        }
        self.expect(':')?;
        let value = self.bound_statement()?;
        Ok(QmlStatement::Property { name, value })
    }

    fn method(&mut self) -> PResult<QmlStatement> {
        let from = self.token.pos;
        self.advance()?; // `function`
        let function = self.function(true)?;
        let source = self.lexer.source()[from..self.token.pos].to_string();
        let name = function.name.clone().unwrap_or_default();
        Ok(QmlStatement::Method { name, function, source })
    }

    fn signal_definition(&mut self) -> PResult<QmlStatement> {
        self.advance()?; // `signal`
        let name = self.expect_name()?;
        let mut params = Vec::new();
        if self.is_punc('(') {
            self.advance()?;
            let mut first = true;
            while !self.is_punc(')') {
                if !first {
                    self.expect(',')?;
                }
                first = false;
                let type_name = self.expect_name()?;
                let name = self.expect_name()?;
                params.push(SignalParam { type_name, name });
            }
            self.advance()?;
        }
        if self.is_punc(';') {
            self.advance()?;
        }
        Ok(QmlStatement::SignalDef { name, params })
    }

    /// After `property`: `<type> <name> [: stmt]` or `alias <name>: obj[.prop]`.
    fn property_definition(&mut self) -> PResult<QmlStatement> {
        let mut type_name = match self.token.token.clone() {
            Token::Name(t) | Token::Keyword(t) => t,
            _ => return Err(self.unexpected()),
        };
        self.advance()?;
        if type_name == "list" && self.is_operator("<") {
            self.advance()?;
            self.expect_name()?;
            if !self.is_operator(">") {
                return Err(self.unexpected());
            }
            self.advance()?;
            type_name = "list".to_string();
        }
        let name = self.expect_name()?;

        if type_name == "alias" {
            self.expect(':')?;
            let object = self.expect_name()?;
            let property = if self.is_punc('.') {
                self.advance()?;
                Some(self.expect_name()?)
            } else {
                None
            };
            if self.is_punc(';') {
                self.advance()?;
            }
            return Ok(QmlStatement::AliasDef { name, object, property });
        }

        let value = if self.is_punc(':') {
            self.advance()?;
            Some(self.bound_statement()?)
        } else {
            if self.is_punc(';') {
                self.advance()?;
            }
            None
        };
        Ok(QmlStatement::PropertyDef(PropertyDecl { name, type_name, value }))
    }

    /// Parse the statement after `name:` and keep its verbatim source slice.
    /// `return` is allowed, the statement may become a function body.
    fn bound_statement(&mut self) -> PResult<BoundStatement> {
        let (from, line, col) = (self.token.pos, self.token.line, self.token.col);
        self.in_function += 1;
        let stmt = self.property_value();
        self.in_function -= 1;
        let stmt = stmt?;
        let source = self.lexer.source()[from..self.token.pos].to_string();
        Ok(BoundStatement { stmt: Rc::new(stmt), source, line, col })
    }

    fn property_value(&mut self) -> PResult<Stmt> {
        if !self.is_punc('{') {
            return self.statement();
        }
        // `{ a: 1, b: 2 }` is not a valid block; retry it as an object literal.
        let snapshot = self.clone();
        match self.statement() {
            Ok(stmt) => Ok(stmt),
            Err(err) => {
                *self = snapshot;
                self.expression_statement().map_err(|_| err)
            }
        }
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr = self.expression(true, false)?;
        self.semicolon()?;
        Ok(Stmt::Expr(expr))
    }
}

/// Parse a document: imports, then element statements.
pub fn parse_document(src: &str) -> Result<Document, ParseError> {
    Parser::new(src)?.parse_document()
}
