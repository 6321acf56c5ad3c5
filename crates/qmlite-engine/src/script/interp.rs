use std::cmp::Ordering;
use std::rc::Rc;

use indexmap::IndexMap;
use qmlite_syntax::ast::{Atom, BinaryOp, Expr, ForInit, PropertyValue, Stmt, UnaryOp, VarDecl};

use crate::engine::Engine;
use crate::error::EvalError;
use crate::meta;
use crate::value::{self, Function, Value};

use super::methods;
use super::scope::Scope;

/// How a statement finished.
pub(crate) enum Completion {
    Normal,
    Return(Value),
    Break(Option<String>),
    Continue(Option<String>),
}

enum LoopStep {
    Next,
    Exit(Completion),
}

/// Map a loop body's completion onto the loop labelled `label`.
fn loop_step(c: Completion, label: Option<&str>) -> LoopStep {
    match c {
        Completion::Normal | Completion::Continue(None) => LoopStep::Next,
        Completion::Continue(Some(l)) if Some(l.as_str()) == label => LoopStep::Next,
        Completion::Break(None) => LoopStep::Exit(Completion::Normal),
        Completion::Break(Some(l)) if Some(l.as_str()) == label => LoopStep::Exit(Completion::Normal),
        other => LoopStep::Exit(other),
    }
}

pub(crate) struct Interp<'e> {
    engine: &'e Engine,
}

impl<'e> Interp<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self { engine }
    }

    pub fn run_body(&self, body: &[Stmt], scope: &Rc<Scope>) -> Result<Value, EvalError> {
        for stmt in body {
            self.hoist(stmt, scope);
        }
        match self.exec_block(body, scope)? {
            Completion::Return(v) => Ok(v),
            _ => Ok(Value::Undefined),
        }
    }

    // ── Hoisting ──────────────────────────────────────────────────────────

    /// Declare `var` names and function declarations ahead of execution.
    fn hoist(&self, stmt: &Stmt, scope: &Rc<Scope>) {
        let decls = |decls: &[VarDecl]| {
            for d in decls {
                scope.declare(&d.name, None);
            }
        };
        match stmt {
            Stmt::Var(d) | Stmt::Const(d) => decls(d),
            Stmt::Defun(def) => {
                if let Some(name) = &def.name {
                    let f = Function::Script { def: def.clone(), scope: scope.clone() };
                    scope.declare(name, Some(Value::Function(Rc::new(f))));
                }
            }
            Stmt::Block(body) => body.iter().for_each(|s| self.hoist(s, scope)),
            Stmt::If { then, otherwise, .. } => {
                self.hoist(then, scope);
                if let Some(o) = otherwise {
                    self.hoist(o, scope);
                }
            }
            Stmt::For { init, body, .. } => {
                if let Some(ForInit::Var(d)) = init {
                    decls(d);
                }
                self.hoist(body, scope);
            }
            Stmt::ForIn { declare, target, body, .. } => {
                if let (true, Expr::Name(name)) = (declare, target) {
                    scope.declare(name, None);
                }
                self.hoist(body, scope);
            }
            Stmt::While { body, .. }
            | Stmt::Do { body, .. }
            | Stmt::Label { body, .. }
            | Stmt::With { body, .. } => self.hoist(body, scope),
            Stmt::Try { body, catch, finally } => {
                body.iter().for_each(|s| self.hoist(s, scope));
                if let Some(c) = catch {
                    c.body.iter().for_each(|s| self.hoist(s, scope));
                }
                if let Some(f) = finally {
                    f.iter().for_each(|s| self.hoist(s, scope));
                }
            }
            Stmt::Switch { cases, .. } => {
                for case in cases {
                    case.body.iter().for_each(|s| self.hoist(s, scope));
                }
            }
            _ => {}
        }
    }

    // ── Statements ────────────────────────────────────────────────────────

    fn exec_block(&self, body: &[Stmt], scope: &Rc<Scope>) -> Result<Completion, EvalError> {
        for stmt in body {
            match self.exec(stmt, scope, None)? {
                Completion::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal)
    }

    fn exec(&self, stmt: &Stmt, scope: &Rc<Scope>, label: Option<&str>) -> Result<Completion, EvalError> {
        match stmt {
            Stmt::Block(body) => self.exec_block(body, scope),
            Stmt::Expr(e) => {
                self.eval(e, scope)?;
                Ok(Completion::Normal)
            }
            Stmt::Var(decls) | Stmt::Const(decls) => {
                self.exec_var(decls, scope)?;
                Ok(Completion::Normal)
            }
            Stmt::Defun(_) | Stmt::Debugger => Ok(Completion::Normal),
            Stmt::If { cond, then, otherwise } => {
                if self.eval(cond, scope)?.truthy() {
                    self.exec(then, scope, None)
                } else if let Some(o) = otherwise {
                    self.exec(o, scope, None)
                } else {
                    Ok(Completion::Normal)
                }
            }
            Stmt::For { init, cond, step, body } => {
                match init {
                    Some(ForInit::Var(decls)) => self.exec_var(decls, scope)?,
                    Some(ForInit::Expr(e)) => {
                        self.eval(e, scope)?;
                    }
                    None => {}
                }
                loop {
                    if let Some(cond) = cond {
                        if !self.eval(cond, scope)?.truthy() {
                            break;
                        }
                    }
                    if let LoopStep::Exit(c) = loop_step(self.exec(body, scope, None)?, label) {
                        return Ok(c);
                    }
                    if let Some(step) = step {
                        self.eval(step, scope)?;
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::ForIn { target, object, body, .. } => {
                let object = self.eval(object, scope)?;
                for key in enumerate_keys(&object) {
                    let place = self.place(target, scope)?;
                    self.write_place(&place, Value::from(key), scope)?;
                    if let LoopStep::Exit(c) = loop_step(self.exec(body, scope, None)?, label) {
                        return Ok(c);
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::While { cond, body } => {
                while self.eval(cond, scope)?.truthy() {
                    if let LoopStep::Exit(c) = loop_step(self.exec(body, scope, None)?, label) {
                        return Ok(c);
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::Do { body, cond } => {
                loop {
                    if let LoopStep::Exit(c) = loop_step(self.exec(body, scope, None)?, label) {
                        return Ok(c);
                    }
                    if !self.eval(cond, scope)?.truthy() {
                        break;
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::Label { label, body } => match self.exec(body, scope, Some(label))? {
                Completion::Break(Some(l)) if &l == label => Ok(Completion::Normal),
                other => Ok(other),
            },
            Stmt::Break(l) => Ok(Completion::Break(l.clone())),
            Stmt::Continue(l) => Ok(Completion::Continue(l.clone())),
            Stmt::Return(e) => {
                let v = match e {
                    Some(e) => self.eval(e, scope)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(v))
            }
            Stmt::Throw(e) => Err(EvalError::Thrown(self.eval(e, scope)?)),
            Stmt::Try { body, catch, finally } => {
                let mut result = self.exec_block(body, scope);
                if let (Err(err), Some(clause)) = (&result, catch) {
                    if let Some(thrown) = err.to_catch_value() {
                        let inner = Scope::locals(scope, scope.this());
                        inner.declare(&clause.param, Some(thrown));
                        result = self.exec_block(&clause.body, &inner);
                    }
                }
                if let Some(fin) = finally {
                    match self.exec_block(fin, scope)? {
                        Completion::Normal => {}
                        abrupt => return Ok(abrupt),
                    }
                }
                result
            }
            Stmt::Switch { discriminant, cases } => {
                let d = self.eval(discriminant, scope)?;
                let mut start = None;
                for (i, case) in cases.iter().enumerate() {
                    if let Some(test) = &case.test {
                        if self.eval(test, scope)?.strict_eq(&d) {
                            start = Some(i);
                            break;
                        }
                    }
                }
                let start = start.or_else(|| cases.iter().position(|c| c.test.is_none()));
                let Some(start) = start else { return Ok(Completion::Normal) };
                for case in &cases[start..] {
                    match self.exec_block(&case.body, scope)? {
                        Completion::Normal => {}
                        Completion::Break(None) => return Ok(Completion::Normal),
                        abrupt => return Ok(abrupt),
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::With { object, body } => {
                let v = self.eval(object, scope)?;
                self.exec(body, &Scope::with(scope, v), None)
            }
        }
    }

    fn exec_var(&self, decls: &[VarDecl], scope: &Rc<Scope>) -> Result<(), EvalError> {
        for d in decls {
            if let Some(init) = &d.init {
                let v = self.eval(init, scope)?;
                scope.assign(self.engine, &d.name, v)?;
            }
        }
        Ok(())
    }

    // ── Expressions ───────────────────────────────────────────────────────

    pub fn eval(&self, expr: &Expr, scope: &Rc<Scope>) -> Result<Value, EvalError> {
        match expr {
            Expr::Num(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::from(s.as_str())),
            Expr::Name(name) if name == "this" => Ok(scope.this()),
            Expr::Name(name) => scope.lookup(self.engine, name),
            Expr::Atom(atom) => Ok(match atom {
                Atom::True => Value::Bool(true),
                Atom::False => Value::Bool(false),
                Atom::Null => Value::Null,
                Atom::Undefined => Value::Undefined,
            }),
            Expr::Regexp { pattern, .. } => {
                Err(EvalError::Unsupported(format!("regular expression /{pattern}/")))
            }
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(match item {
                        Some(e) => self.eval(e, scope)?,
                        None => Value::Undefined,
                    });
                }
                Ok(Value::array(out))
            }
            Expr::Object(props) => {
                let mut map = IndexMap::with_capacity(props.len());
                for p in props {
                    match &p.value {
                        PropertyValue::Value(e) => {
                            map.insert(p.key.clone(), self.eval(e, scope)?);
                        }
                        PropertyValue::Getter(_) | PropertyValue::Setter(_) => {
                            return Err(EvalError::Unsupported(format!("accessor property \"{}\"", p.key)));
                        }
                    }
                }
                Ok(Value::map(map))
            }
            Expr::Function(def) => {
                Ok(Value::Function(Rc::new(Function::Script { def: def.clone(), scope: scope.clone() })))
            }
            Expr::Dot(object, name) => {
                let object = self.eval(object, scope)?;
                methods::get_member(self.engine, &object, name)
            }
            Expr::Sub(object, key) => {
                let object = self.eval(object, scope)?;
                let key = property_key(&self.eval(key, scope)?);
                methods::get_member(self.engine, &object, &key)
            }
            Expr::Call(callee, args) => self.eval_call(callee, args, scope),
            Expr::New(callee, args) => {
                let f = self.eval(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                match &f {
                    Value::Function(func) if matches!(&**func, Function::Native { .. }) => {
                        self.engine.call(&f, Value::Undefined, &args)
                    }
                    _ => Err(EvalError::Unsupported("`new` with a script constructor".into())),
                }
            }
            Expr::UnaryPrefix(op, operand) => self.eval_prefix(*op, operand, scope),
            Expr::UnaryPostfix(op, operand) => {
                let place = self.place(operand, scope)?;
                let old = self.read_place(&place, scope)?.to_number();
                let new = if *op == UnaryOp::Increment { old + 1.0 } else { old - 1.0 };
                self.write_place(&place, Value::Number(new), scope)?;
                Ok(Value::Number(old))
            }
            Expr::Binary(BinaryOp::And, l, r) => {
                let l = self.eval(l, scope)?;
                if l.truthy() { self.eval(r, scope) } else { Ok(l) }
            }
            Expr::Binary(BinaryOp::Or, l, r) => {
                let l = self.eval(l, scope)?;
                if l.truthy() { Ok(l) } else { self.eval(r, scope) }
            }
            Expr::Binary(op, l, r) => {
                let l = self.eval(l, scope)?;
                let r = self.eval(r, scope)?;
                self.binary(*op, &l, &r)
            }
            Expr::Assign(op, target, value) => {
                let place = self.place(target, scope)?;
                let v = match op {
                    None => self.eval(value, scope)?,
                    Some(BinaryOp::And) => {
                        let cur = self.read_place(&place, scope)?;
                        if !cur.truthy() {
                            return Ok(cur);
                        }
                        self.eval(value, scope)?
                    }
                    Some(BinaryOp::Or) => {
                        let cur = self.read_place(&place, scope)?;
                        if cur.truthy() {
                            return Ok(cur);
                        }
                        self.eval(value, scope)?
                    }
                    Some(op) => {
                        let cur = self.read_place(&place, scope)?;
                        let rhs = self.eval(value, scope)?;
                        self.binary(*op, &cur, &rhs)?
                    }
                };
                self.write_place(&place, v.clone(), scope)?;
                Ok(v)
            }
            Expr::Conditional(cond, then, otherwise) => {
                if self.eval(cond, scope)?.truthy() {
                    self.eval(then, scope)
                } else {
                    self.eval(otherwise, scope)
                }
            }
            Expr::Seq(a, b) => {
                self.eval(a, scope)?;
                self.eval(b, scope)
            }
            Expr::QmlElem(elem) => {
                let meta = meta::compile_element(elem).map_err(|e| EvalError::type_error(e.to_string()))?;
                Ok(Value::Element(Rc::new(meta)))
            }
        }
    }

    fn eval_args(&self, args: &[Expr], scope: &Rc<Scope>) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|a| self.eval(a, scope)).collect()
    }

    fn eval_call(&self, callee: &Expr, args: &[Expr], scope: &Rc<Scope>) -> Result<Value, EvalError> {
        let (receiver, name) = match callee {
            Expr::Dot(object, name) => (self.eval(object, scope)?, name.clone()),
            Expr::Sub(object, key) => {
                let receiver = self.eval(object, scope)?;
                (receiver, property_key(&self.eval(key, scope)?))
            }
            _ => {
                let f = self.eval(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                return self.engine.call(&f, Value::Undefined, &args);
            }
        };
        let args = self.eval_args(args, scope)?;
        methods::call_method(self.engine, &receiver, &name, &args)
    }

    fn eval_prefix(&self, op: UnaryOp, operand: &Expr, scope: &Rc<Scope>) -> Result<Value, EvalError> {
        match op {
            UnaryOp::TypeOf => {
                if let Expr::Name(name) = operand {
                    if name != "this" && scope.resolve(self.engine, name)?.is_none() {
                        return Ok(Value::from("undefined"));
                    }
                }
                Ok(Value::from(self.eval(operand, scope)?.type_of()))
            }
            UnaryOp::Void => {
                self.eval(operand, scope)?;
                Ok(Value::Undefined)
            }
            UnaryOp::Delete => {
                let (object, key) = match operand {
                    Expr::Dot(object, name) => (self.eval(object, scope)?, name.clone()),
                    Expr::Sub(object, key) => {
                        let object = self.eval(object, scope)?;
                        (object, property_key(&self.eval(key, scope)?))
                    }
                    _ => return Ok(Value::Bool(true)),
                };
                if let Value::Map(map) = object {
                    map.borrow_mut().shift_remove(&key);
                }
                Ok(Value::Bool(true))
            }
            UnaryOp::Increment | UnaryOp::Decrement => {
                let place = self.place(operand, scope)?;
                let old = self.read_place(&place, scope)?.to_number();
                let new = Value::Number(if op == UnaryOp::Increment { old + 1.0 } else { old - 1.0 });
                self.write_place(&place, new.clone(), scope)?;
                Ok(new)
            }
            UnaryOp::Not => Ok(Value::Bool(!self.eval(operand, scope)?.truthy())),
            UnaryOp::BitNot => Ok(Value::Number(f64::from(!self.eval(operand, scope)?.to_int32()))),
            UnaryOp::Neg => Ok(Value::Number(-self.eval(operand, scope)?.to_number())),
            UnaryOp::Plus => Ok(Value::Number(self.eval(operand, scope)?.to_number())),
        }
    }

    /// Evaluates the object and key of an assignment target once, so a
    /// read-modify-write does not repeat their side effects.
    fn place<'t>(&self, target: &'t Expr, scope: &Rc<Scope>) -> Result<Place<'t>, EvalError> {
        match target {
            Expr::Name(name) => Ok(Place::Name(name)),
            Expr::Dot(object, name) => Ok(Place::Member(self.eval(object, scope)?, name.clone())),
            Expr::Sub(object, key) => {
                let object = self.eval(object, scope)?;
                Ok(Place::Member(object, property_key(&self.eval(key, scope)?)))
            }
            _ => Err(EvalError::Reference("invalid assignment target".into())),
        }
    }

    fn read_place(&self, place: &Place<'_>, scope: &Rc<Scope>) -> Result<Value, EvalError> {
        match place {
            Place::Name("this") => Ok(scope.this()),
            Place::Name(name) => scope.lookup(self.engine, name),
            Place::Member(object, key) => methods::get_member(self.engine, object, key),
        }
    }

    fn write_place(&self, place: &Place<'_>, value: Value, scope: &Rc<Scope>) -> Result<(), EvalError> {
        match place {
            Place::Name(name) => scope.assign(self.engine, name, value),
            Place::Member(object, key) => methods::set_member(self.engine, object, key, value),
        }
    }

    fn binary(&self, op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
        let num = |f: fn(f64, f64) -> f64| Value::Number(f(l.to_number(), r.to_number()));
        let int = |f: fn(i32, i32) -> i32| Value::Number(f64::from(f(l.to_int32(), r.to_int32())));
        Ok(match op {
            BinaryOp::Add => {
                let stringy = |v: &Value| !matches!(v, Value::Number(_) | Value::Bool(_) | Value::Undefined | Value::Null);
                if stringy(l) || stringy(r) {
                    Value::from(format!("{}{}", l.to_display_string(), r.to_display_string()))
                } else {
                    num(|a, b| a + b)
                }
            }
            BinaryOp::Sub => num(|a, b| a - b),
            BinaryOp::Mul => num(|a, b| a * b),
            BinaryOp::Div => num(|a, b| a / b),
            BinaryOp::Mod => num(|a, b| a % b),
            BinaryOp::Eq => Value::Bool(l.loose_eq(r)),
            BinaryOp::NotEq => Value::Bool(!l.loose_eq(r)),
            BinaryOp::StrictEq => Value::Bool(l.strict_eq(r)),
            BinaryOp::StrictNotEq => Value::Bool(!l.strict_eq(r)),
            BinaryOp::Lt => Value::Bool(compare(l, r) == Some(Ordering::Less)),
            BinaryOp::Gt => Value::Bool(compare(l, r) == Some(Ordering::Greater)),
            BinaryOp::LtEq => Value::Bool(matches!(compare(l, r), Some(Ordering::Less | Ordering::Equal))),
            BinaryOp::GtEq => Value::Bool(matches!(compare(l, r), Some(Ordering::Greater | Ordering::Equal))),
            BinaryOp::BitAnd => int(|a, b| a & b),
            BinaryOp::BitOr => int(|a, b| a | b),
            BinaryOp::BitXor => int(|a, b| a ^ b),
            BinaryOp::Shl => int(|a, b| a.wrapping_shl(b as u32 & 31)),
            BinaryOp::Shr => int(|a, b| a.wrapping_shr(b as u32 & 31)),
            BinaryOp::UShr => {
                let shifted = (l.to_int32() as u32) >> (r.to_int32() as u32 & 31);
                Value::Number(f64::from(shifted))
            }
            BinaryOp::In => {
                let key = property_key(l);
                match r {
                    Value::Map(map) => Value::Bool(map.borrow().contains_key(&key)),
                    Value::Object(obj) => Value::Bool(obj.has_member(&key)),
                    Value::Array(items) => Value::Bool(
                        key == "length" || array_index(&key).is_some_and(|i| i < items.borrow().len()),
                    ),
                    other => {
                        return Err(EvalError::type_error(format!(
                            "Cannot use 'in' operator to search for '{key}' in {}",
                            other.to_display_string()
                        )));
                    }
                }
            }
            BinaryOp::InstanceOf => {
                let ctor = match r {
                    Value::Function(f) => f.name().to_string(),
                    other => {
                        return Err(EvalError::type_error(format!(
                            "Right-hand side of 'instanceof' is not callable: {}",
                            other.to_display_string()
                        )));
                    }
                };
                Value::Bool(match ctor.as_str() {
                    "Array" => matches!(l, Value::Array(_)),
                    "Object" => !l.is_primitive(),
                    _ => false,
                })
            }
            BinaryOp::And => if l.truthy() { r.clone() } else { l.clone() },
            BinaryOp::Or => if l.truthy() { l.clone() } else { r.clone() },
        })
    }
}

/// A resolved assignment target.
enum Place<'e> {
    Name(&'e str),
    Member(Value, String),
}

/// Relational comparison: strings compare lexically, anything else
/// numerically, `None` when either side is NaN.
fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => l.to_number().partial_cmp(&r.to_number()),
    }
}

/// Keys visited by `for (k in v)`.
fn enumerate_keys(v: &Value) -> Vec<String> {
    match v {
        Value::Map(map) => map.borrow().keys().cloned().collect(),
        Value::Array(items) => (0..items.borrow().len()).map(|i| i.to_string()).collect(),
        Value::Object(obj) => obj.properties().iter().map(|p| p.name().to_string()).collect(),
        Value::String(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
        _ => Vec::new(),
    }
}

/// String form of a computed member key.
pub(crate) fn property_key(v: &Value) -> String {
    match v {
        Value::Number(n) => value::number_to_string(*n),
        other => other.to_display_string(),
    }
}

/// Canonical array index, rejecting forms like `"01"` or `"1.0"`.
pub(crate) fn array_index(key: &str) -> Option<usize> {
    let i: usize = key.parse().ok()?;
    (i.to_string() == key).then_some(i)
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::engine::Engine;
    use crate::error::EvalError;
    use crate::script::run_script;
    use crate::value::Value;

    fn run(src: &str) -> Value {
        let engine = Engine::new(EngineConfig::default());
        run_script(&engine, src).unwrap()
    }

    #[test]
    fn arithmetic_and_strings() {
        assert_eq!(run("return 1 + 2 * 3"), Value::from(7));
        assert_eq!(run("return '1' + 2"), Value::from("12"));
        assert_eq!(run("return 7 % 4 - -1"), Value::from(4));
        assert_eq!(run("return -1 >>> 28"), Value::from(15));
    }

    #[test]
    fn hoisted_functions_and_closures() {
        let src = "
            return counter()() + twice(4);
            function twice(x) { return x * 2 }
            function counter() { var n = 10; return function () { n++; return n } }
        ";
        assert_eq!(run(src), Value::from(19));
    }

    #[test]
    fn labelled_loops() {
        let src = "
            var hits = 0;
            outer: for (var i = 0; i < 3; i++) {
                for (var j = 0; j < 3; j++) {
                    if (j == 1) continue outer;
                    if (i == 2) break outer;
                    hits++;
                }
            }
            return hits;
        ";
        assert_eq!(run(src), Value::from(2));
    }

    #[test]
    fn switch_falls_through_until_break() {
        let src = "
            var out = '';
            switch (2) { case 1: out += 'a'; case 2: out += 'b'; case 3: out += 'c'; break; default: out += 'd' }
            return out;
        ";
        assert_eq!(run(src), Value::from("bc"));
    }

    #[test]
    fn try_catch_finally() {
        let src = "
            var log = [];
            try { throw 'x' } catch (e) { log.push(e) } finally { log.push('f') }
            try { undefinedName } catch (e) { log.push('ref') }
            return log.join(',');
        ";
        assert_eq!(run(src), Value::from("x,f,ref"));
    }

    #[test]
    fn for_in_over_object_literal() {
        assert_eq!(run("var s = ''; for (var k in {a: 1, b: 2}) s += k; return s"), Value::from("ab"));
    }

    #[test]
    fn typeof_undeclared_is_undefined() {
        assert_eq!(run("return typeof nothingHere"), Value::from("undefined"));
        assert_eq!(run("return typeof function () {}"), Value::from("function"));
    }

    #[test]
    fn oversized_array_writes_are_range_errors() {
        let engine = Engine::new(EngineConfig::default());
        let err = run_script(&engine, "var a = []; a[4294967294] = 1; return a.length;").unwrap_err();
        assert!(matches!(err, EvalError::Range(_)));
        let err = run_script(&engine, "var a = []; a['18446744073709551615'] = 1;").unwrap_err();
        assert!(matches!(err, EvalError::Range(_)));
        assert!(run_script(&engine, "var a = []; a.length = 1e12;").is_err());
        assert!(run_script(&engine, "return new Array(4294967295)").is_err());
        assert_eq!(run("var a = []; a[3] = 1; return a.length"), Value::from(4));
    }

    #[test]
    fn range_errors_are_catchable() {
        assert_eq!(run("try { [][1e10] = 1 } catch (e) { return 'caught' } return 'no'"), Value::from("caught"));
    }

    #[test]
    fn compound_targets_are_evaluated_once() {
        let src = "
            var calls = 0;
            var box = {x: 1};
            function get() { calls++; return box }
            get().x++;
            get().x += 10;
            ++get().x;
            return [calls, box.x].join(',');
        ";
        assert_eq!(run(src), Value::from("3,13"));
    }

    #[test]
    fn regexp_literals_are_rejected() {
        let engine = Engine::new(EngineConfig::default());
        assert!(run_script(&engine, "return /a/.test('a')").is_err());
    }
}
