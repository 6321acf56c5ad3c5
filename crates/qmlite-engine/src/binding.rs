//! Property bindings.
//!
//! A `Binding` keeps the verbatim source of a bound statement and its parsed
//! tree. It is compiled on first use into either an expression or a function
//! body, then evaluated against an (object, context) scope pair: free names
//! resolve in the object first, then the component context, then globals.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use qmlite_syntax::ast::{Expr, Function, Stmt};
use qmlite_syntax::{parse_expression_only, ParseError};

use crate::engine::Engine;
use crate::error::EvalError;
use crate::object::{Context, ObjectRef};
use crate::script::{self, Scope};
use crate::value::{self, Value};

enum Compiled {
    Expr(Expr),
    /// Statement form: runs like a function body, `return` gives the value.
    Body(Vec<Stmt>),
}

pub struct Binding {
    source: String,
    tree: Rc<Stmt>,
    compiled: OnceCell<Compiled>,
}

impl Binding {
    pub fn new(source: impl Into<String>, tree: Rc<Stmt>) -> Self {
        Self { source: source.into(), tree, compiled: OnceCell::new() }
    }

    /// Build a binding from a lone expression, for hosts creating bindings
    /// from Rust.
    pub fn from_expression(source: &str) -> Result<Self, ParseError> {
        let expr = parse_expression_only(source)?;
        Ok(Self::new(source, Rc::new(Stmt::Expr(expr))))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Stmt {
        &self.tree
    }

    /// A block whose first statement is not a label. A block of labels is an
    /// object literal that the statement grammar read as code.
    pub fn is_statement_form(&self) -> bool {
        matches!(&*self.tree, Stmt::Block(body) if body.first().is_some_and(|s| !matches!(s, Stmt::Label { .. })))
    }

    fn compile(&self) -> Result<&Compiled, EvalError> {
        if let Some(compiled) = self.compiled.get() {
            return Ok(compiled);
        }
        let compiled = match &*self.tree {
            Stmt::Block(body) if self.is_statement_form() => Compiled::Body(body.clone()),
            Stmt::Block(_) => Compiled::Expr(parse_expression_only(self.source.trim_end())?),
            Stmt::Expr(expr) => Compiled::Expr(expr.clone()),
            other => Compiled::Body(vec![other.clone()]),
        };
        Ok(self.compiled.get_or_init(|| compiled))
    }

    /// Evaluate in the (object, context) scope pair, with `this` bound to
    /// `object` in both forms.
    pub fn eval(&self, engine: &Engine, object: &ObjectRef, context: &Rc<Context>) -> Result<Value, EvalError> {
        let locals = Scope::locals(&Scope::binding(object, context), Value::Object(object.clone()));
        match self.compile()? {
            Compiled::Expr(expr) => script::eval_expression(engine, expr, &locals),
            Compiled::Body(body) => script::run_body(engine, body, &locals),
        }
    }

    /// Wrap the bound statement as a function taking `params`, closed over
    /// the (object, context) scope pair. Used for signal handlers and methods.
    pub fn to_function(
        &self,
        params: &[String],
        object: &ObjectRef,
        context: &Rc<Context>,
    ) -> Result<Value, EvalError> {
        let body = match self.compile()? {
            Compiled::Expr(expr) => vec![Stmt::Expr(expr.clone())],
            Compiled::Body(body) => body.clone(),
        };
        let def = Rc::new(Function { name: None, params: params.to_vec(), body });
        Ok(Value::Function(Rc::new(value::Function::Script {
            def,
            scope: Scope::binding(object, context),
        })))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Binding").field(&self.source).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmlite_syntax::parse_function_body;

    fn binding(src: &str) -> Binding {
        let stmt = parse_function_body(src).unwrap().into_iter().next().unwrap();
        Binding::new(src, Rc::new(stmt))
    }

    #[test]
    fn statement_form_detection() {
        assert!(binding("{ return 1 }").is_statement_form());
        assert!(!binding("{ a: 1 }").is_statement_form());
        assert!(!binding("a + 1").is_statement_form());
        assert!(!binding("{}").is_statement_form());
    }

    #[test]
    fn this_is_the_owner_in_both_forms() {
        let engine = Engine::default();
        let root = engine.compile_and_instantiate("Item { width: 4 }", None).unwrap();
        let context = root.context().unwrap();
        assert_eq!(binding("this.width + 1").eval(&engine, &root, &context).unwrap(), Value::from(5));
        assert_eq!(binding("{ return this.width * 2 }").eval(&engine, &root, &context).unwrap(), Value::from(8));
    }

    #[test]
    fn label_block_recompiles_as_object_literal() {
        let b = binding("{ a: 1 }");
        assert!(matches!(b.compile().unwrap(), Compiled::Expr(Expr::Object(props)) if props.len() == 1));
    }
}
