//! Tree-walking interpreter for the script subset the parser accepts.
//!
//! | Module     | Role                                                 |
//! |------------|------------------------------------------------------|
//! | `scope`    | Scope chain: locals, object, context, `with`, globals |
//! | `interp`   | Statement execution and expression evaluation        |
//! | `methods`  | Built-in methods of arrays, strings, numbers, signals |
//! | `builtins` | Global objects (`Math`, `console`, `Qt`, `JSON`, ...) |

mod builtins;
mod interp;
mod methods;
mod scope;

use std::rc::Rc;

use qmlite_syntax::ast::{Expr, Stmt};

use crate::engine::Engine;
use crate::error::EvalError;
use crate::value::{Function, Value};

pub(crate) use builtins::install_globals;
pub use scope::Scope;

/// Evaluate a single expression in `scope`.
pub fn eval_expression(engine: &Engine, expr: &Expr, scope: &Rc<Scope>) -> Result<Value, EvalError> {
    interp::Interp::new(engine).eval(expr, scope)
}

/// Run a function body in `scope`, which must start with a fresh locals
/// frame. Returns the `return` value, or `undefined`.
pub fn run_body(engine: &Engine, body: &[Stmt], scope: &Rc<Scope>) -> Result<Value, EvalError> {
    interp::Interp::new(engine).run_body(body, scope)
}

/// Run a free-standing script against the engine's globals. `return`
/// gives the result.
pub fn run_script(engine: &Engine, source: &str) -> Result<Value, EvalError> {
    let program = qmlite_syntax::parse_function_body(source)?;
    run_body(engine, &program, &Scope::global())
}

/// Call a function value with `this` and positional arguments.
pub(crate) fn call_function(
    engine: &Engine,
    function: &Function,
    this: Value,
    args: &[Value],
) -> Result<Value, EvalError> {
    match function {
        Function::Native { call, .. } => call(engine, &this, args),
        Function::Script { def, scope } => {
            let locals = Scope::locals(scope, this);
            locals.declare("arguments", Some(Value::array(args.to_vec())));
            for (i, param) in def.params.iter().enumerate() {
                locals.declare(param, Some(args.get(i).cloned().unwrap_or_default()));
            }
            run_body(engine, &def.body, &locals)
        }
    }
}
