//! The engine: operation state, dependency tracking, the init phase and the
//! tick scheduler.
//!
//! There is no process-wide engine. Every evaluation and construction path
//! receives `&Engine`, and all mutable engine state lives in cells so that
//! re-entrant calls (a signal handler creating objects, a binding emitting a
//! signal) work through the shared reference.
//!
//! # Lifecycle
//!
//! | Step | What happens |
//! |------|--------------|
//! | `begin_init` | state becomes `Init`; binding assignments are queued |
//! | construction | objects, properties, handlers; ids registered |
//! | `end_init` (outermost) | previous state restored, aliases wired, queued bindings drained |
//! | `start` | state becomes `Running`; timers and group animations resume |
//! | completed | every queued `Component.completed` signal fires once |
//! | `tick` | animations and timers advance |

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use std::rc::{Rc, Weak};

use anyhow::Context as _;
use indexmap::IndexMap;

use crate::config::EngineConfig;
use crate::construct;
use crate::elements;
use crate::error::{EngineError, EvalError};
use crate::meta::{self, MetaElement};
use crate::object::{Context, Object, ObjectRef};
use crate::property::Property;
use crate::registry::{Factory, TypeRegistry};
use crate::script;
use crate::signal::Signal;
use crate::time::TickClock;
use crate::value::Value;

/// Nested re-evaluations of one property tolerated inside a single
/// propagation before it is reported as a binding loop.
const MAX_UPDATE_DEPTH: usize = 8;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OperationState {
    Idle,
    /// Objects are being constructed; bindings are recorded, not evaluated.
    Init,
    Running,
}

/// Pops one entry of a tracking stack when dropped, so the stack is
/// restored on every exit path including errors.
pub(crate) struct StackGuard<'a> {
    stack: &'a RefCell<Vec<Option<Rc<Property>>>>,
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

pub struct Engine {
    config: EngineConfig,
    state: Cell<OperationState>,
    resume_state: Cell<OperationState>,
    init_depth: Cell<usize>,

    // ── Dependency tracking ───────────────────────────────────────────────
    /// Properties whose binding is being evaluated, innermost last. `None`
    /// suspends tracking.
    evaluating: RefCell<Vec<Option<Rc<Property>>>>,
    /// Properties inside `update`, innermost last.
    updating: RefCell<Vec<Option<Rc<Property>>>>,

    // ── Init phase ────────────────────────────────────────────────────────
    pending_bindings: RefCell<Vec<Weak<Property>>>,
    pending_aliases: RefCell<Vec<Weak<Property>>>,
    completed: RefCell<Vec<Signal>>,
    draining: Cell<bool>,
    /// Names of registered components being instantiated, innermost last.
    instantiating: RefCell<Vec<String>>,

    // ── Scheduler ─────────────────────────────────────────────────────────
    tickers: RefCell<Vec<Weak<Object>>>,
    ticking: Cell<bool>,
    now_ms: Cell<f64>,
    clock: RefCell<TickClock>,

    // ── Registries ────────────────────────────────────────────────────────
    registry: RefCell<TypeRegistry>,
    components: RefCell<HashMap<String, Rc<MetaElement>>>,
    globals: RefCell<IndexMap<String, Value>>,
    roots: RefCell<Vec<ObjectRef>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let mut globals = IndexMap::new();
        script::install_globals(&mut globals);
        let clock = TickClock::with_clamps(std::time::Duration::ZERO, config.tick_clamp);
        Self {
            config,
            state: Cell::new(OperationState::Idle),
            resume_state: Cell::new(OperationState::Idle),
            init_depth: Cell::new(0),
            evaluating: RefCell::new(Vec::new()),
            updating: RefCell::new(Vec::new()),
            pending_bindings: RefCell::new(Vec::new()),
            pending_aliases: RefCell::new(Vec::new()),
            completed: RefCell::new(Vec::new()),
            draining: Cell::new(false),
            instantiating: RefCell::new(Vec::new()),
            tickers: RefCell::new(Vec::new()),
            ticking: Cell::new(false),
            now_ms: Cell::new(0.0),
            clock: RefCell::new(clock),
            registry: RefCell::new(TypeRegistry::with_builtins()),
            components: RefCell::new(HashMap::new()),
            globals: RefCell::new(globals),
            roots: RefCell::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> OperationState {
        self.state.get()
    }

    pub fn is_initializing(&self) -> bool {
        self.state.get() == OperationState::Init
    }

    /// Behaviors animate writes only in a running engine, and never while the
    /// init-phase bindings are being drained.
    pub fn animates_behaviors(&self) -> bool {
        self.state.get() == OperationState::Running && !self.draining.get()
    }

    // ── Dependency tracking ───────────────────────────────────────────────

    /// Mark `prop` as the property whose binding is being evaluated.
    /// Re-entering a property already on the stack is a binding loop.
    pub(crate) fn enter_evaluation(&self, prop: &Rc<Property>) -> Result<StackGuard<'_>, EvalError> {
        let reentered = self
            .evaluating
            .borrow()
            .iter()
            .flatten()
            .any(|p| Rc::ptr_eq(p, prop));
        if reentered {
            return Err(EvalError::CyclicBinding(prop.name().to_string()));
        }
        self.evaluating.borrow_mut().push(Some(prop.clone()));
        Ok(StackGuard { stack: &self.evaluating })
    }

    /// Mark `prop` as updating. A property that keeps re-entering its own
    /// update through change signals never settles.
    pub(crate) fn enter_update(&self, prop: &Rc<Property>) -> Result<StackGuard<'_>, EvalError> {
        let depth = self
            .updating
            .borrow()
            .iter()
            .flatten()
            .filter(|p| Rc::ptr_eq(p, prop))
            .count();
        if depth >= MAX_UPDATE_DEPTH {
            return Err(EvalError::CyclicBinding(prop.name().to_string()));
        }
        self.updating.borrow_mut().push(Some(prop.clone()));
        Ok(StackGuard { stack: &self.updating })
    }

    /// The property that reads should subscribe, if any.
    pub fn evaluating_property(&self) -> Option<Rc<Property>> {
        self.evaluating.borrow().last().cloned().flatten()
    }

    /// Run `f` with dependency tracking suspended.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        self.evaluating.borrow_mut().push(None);
        let _guard = StackGuard { stack: &self.evaluating };
        f()
    }

    // ── Calls and globals ─────────────────────────────────────────────────

    /// Call a function or emit a signal value.
    pub fn call(&self, callee: &Value, this: Value, args: &[Value]) -> Result<Value, EvalError> {
        match callee {
            Value::Function(f) => script::call_function(self, f, this, args),
            Value::Signal(signal) => {
                signal.emit(self, args)?;
                Ok(Value::Undefined)
            }
            other => Err(EvalError::type_error(format!("{} is not a function", other.to_display_string()))),
        }
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    pub fn set_global(&self, name: &str, value: Value) {
        self.globals.borrow_mut().insert(name.to_string(), value);
    }

    // ── Init phase ────────────────────────────────────────────────────────

    pub fn begin_init(&self) {
        if self.init_depth.get() == 0 {
            self.resume_state.set(self.state.get());
            self.state.set(OperationState::Init);
            log::trace!("init phase started");
        }
        self.init_depth.set(self.init_depth.get() + 1);
    }

    /// Leave the init phase. The outermost call restores the previous state,
    /// drains queued bindings and, in a running engine, fires the queued
    /// completed signals.
    pub fn end_init(&self) -> Result<(), EvalError> {
        let depth = self.init_depth.get().saturating_sub(1);
        self.init_depth.set(depth);
        if depth > 0 {
            return Ok(());
        }
        self.state.set(self.resume_state.get());
        log::trace!("init phase ended, draining");
        self.drain()?;
        if self.state.get() == OperationState::Running {
            self.fire_completed()?;
        }
        Ok(())
    }

    pub(crate) fn queue_binding(&self, prop: Weak<Property>) {
        self.pending_bindings.borrow_mut().push(prop);
    }

    pub(crate) fn queue_alias(&self, prop: Weak<Property>) {
        self.pending_aliases.borrow_mut().push(prop);
    }

    pub(crate) fn queue_completed(&self, signal: Signal) {
        self.completed.borrow_mut().push(signal);
    }

    fn drain(&self) -> Result<(), EvalError> {
        let was_draining = self.draining.replace(true);
        let result = self.drain_pending();
        self.draining.set(was_draining);
        result
    }

    fn drain_pending(&self) -> Result<(), EvalError> {
        let aliases = std::mem::take(&mut *self.pending_aliases.borrow_mut());
        for alias in aliases.iter().filter_map(Weak::upgrade) {
            if let Err(e) = alias.wire_alias(self) {
                log::warn!("alias \"{}\" has no target: {e}", alias.name());
            }
        }
        loop {
            let batch = std::mem::take(&mut *self.pending_bindings.borrow_mut());
            if batch.is_empty() {
                return Ok(());
            }
            log::trace!("draining {} bindings", batch.len());
            for prop in batch.iter().filter_map(Weak::upgrade) {
                prop.update(self)?;
            }
        }
    }

    /// Fire every queued `Component.completed` signal, in queue order.
    pub fn fire_completed(&self) -> Result<(), EvalError> {
        let signals = std::mem::take(&mut *self.completed.borrow_mut());
        for signal in signals {
            signal.emit(self, &[])?;
        }
        Ok(())
    }

    // ── Types and components ──────────────────────────────────────────────

    /// Register an element type under `name`, replacing any earlier one.
    pub fn register_type(&self, name: impl Into<String>, factory: Factory) {
        self.registry.borrow_mut().register(name, factory);
    }

    pub(crate) fn factory(&self, name: &str) -> Option<Factory> {
        self.registry.borrow().get(name)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.registry.borrow().contains(name)
    }

    /// Compile `source` and make it available as element type `name`.
    pub fn register_component(&self, name: impl Into<String>, source: &str) -> Result<(), EngineError> {
        let name = name.into();
        let meta = meta::parse_and_compile(source)?;
        log::debug!("registered component {name}");
        self.components.borrow_mut().insert(name, Rc::new(meta));
        Ok(())
    }

    pub fn component(&self, name: &str) -> Option<Rc<MetaElement>> {
        self.components.borrow().get(name).cloned()
    }

    /// Instantiate the registered component `name` as a new document root.
    pub fn create_component(&self, name: &str, parent: Option<&ObjectRef>) -> Result<ObjectRef, EngineError> {
        let template = self
            .component(name)
            .as_ref()
            .and_then(elements::component::template_of)
            .ok_or_else(|| EngineError::UnknownComponent(name.to_string()))?;
        let root = construct::create_object(self, &template, parent, &Context::new_root())?;
        if parent.is_none() {
            self.roots.borrow_mut().push(root.clone());
        }
        self.start()?;
        self.fire_completed()?;
        Ok(root)
    }

    /// Guard against a component that instantiates itself.
    pub(crate) fn enter_component(&self, name: &str) -> bool {
        let mut stack = self.instantiating.borrow_mut();
        if stack.iter().any(|n| n == name) {
            return false;
        }
        stack.push(name.to_string());
        true
    }

    pub(crate) fn leave_component(&self) {
        self.instantiating.borrow_mut().pop();
    }

    // ── Documents ─────────────────────────────────────────────────────────

    /// Parse, compile and construct a document, then drain its bindings,
    /// start the engine and fire the completed signals.
    ///
    /// Documents loaded without a parent stay alive as engine roots until
    /// the engine is dropped.
    pub fn compile_and_instantiate(&self, source: &str, parent: Option<&ObjectRef>) -> Result<ObjectRef, EngineError> {
        let meta = Rc::new(meta::parse_and_compile(source)?);
        let template = elements::component::template_of(&meta)
            .ok_or_else(|| EngineError::Eval(EvalError::type_error("Component has no content")))?;
        let root = construct::create_object(self, &template, parent, &Context::new_root())?;
        if parent.is_none() {
            self.roots.borrow_mut().push(root.clone());
        }
        self.start()?;
        self.fire_completed()?;
        log::debug!("instantiated {}", root.class_name());
        Ok(root)
    }

    /// Read a document from disk and instantiate it.
    ///
    /// Engine errors may carry script values, which are tied to this thread;
    /// they are reported as text.
    pub fn load_file(&self, path: impl AsRef<Path>) -> anyhow::Result<ObjectRef> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        self.compile_and_instantiate(&source, None)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("failed to load {}", path.display()))
    }

    /// Top-level objects loaded without a parent.
    pub fn roots(&self) -> Vec<ObjectRef> {
        self.roots.borrow().clone()
    }

    // ── Scheduler ─────────────────────────────────────────────────────────

    pub fn start(&self) -> Result<(), EvalError> {
        if self.state.get() == OperationState::Running {
            return Ok(());
        }
        self.state.set(OperationState::Running);
        log::debug!("engine started");
        for obj in self.live_tickers() {
            elements::on_engine_start(self, &obj)?;
        }
        Ok(())
    }

    pub fn stop(&self) -> Result<(), EvalError> {
        if self.state.get() != OperationState::Running {
            return Ok(());
        }
        self.state.set(OperationState::Idle);
        log::debug!("engine stopped");
        for obj in self.live_tickers() {
            elements::on_engine_stop(self, &obj)?;
        }
        Ok(())
    }

    pub(crate) fn add_ticker(&self, obj: &ObjectRef) {
        self.tickers.borrow_mut().push(Rc::downgrade(obj));
    }

    fn live_tickers(&self) -> Vec<ObjectRef> {
        let mut tickers = self.tickers.borrow_mut();
        tickers.retain(|w| w.upgrade().is_some_and(|o| !o.is_deleted()));
        tickers.iter().filter_map(Weak::upgrade).collect()
    }

    /// Milliseconds of the latest tick.
    pub fn now(&self) -> f64 {
        self.now_ms.get()
    }

    /// Advance animations and timers. Ignored unless running, and ticks
    /// never nest.
    pub fn tick(&self, now_ms: f64, elapsed_ms: f64) -> Result<(), EvalError> {
        if self.state.get() != OperationState::Running || self.ticking.replace(true) {
            return Ok(());
        }
        self.now_ms.set(now_ms);
        let result = self
            .live_tickers()
            .iter()
            .try_for_each(|obj| elements::tick(self, obj, now_ms, elapsed_ms));
        self.ticking.set(false);
        result
    }

    /// Tick with the engine's own clock.
    pub fn tick_clock(&self) -> Result<(), EvalError> {
        let tick = self.clock.borrow_mut().tick();
        self.tick(tick.now_ms, tick.elapsed_ms)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        for root in self.roots.get_mut().drain(..) {
            root.delete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_phase_nests_and_restores_state() {
        let engine = Engine::default();
        engine.begin_init();
        engine.begin_init();
        assert!(engine.is_initializing());
        engine.end_init().unwrap();
        assert!(engine.is_initializing());
        engine.end_init().unwrap();
        assert_eq!(engine.state(), OperationState::Idle);
    }

    #[test]
    fn ticks_are_ignored_until_started() {
        let engine = Engine::default();
        engine.tick(100.0, 16.0).unwrap();
        assert_eq!(engine.now(), 0.0);
        engine.start().unwrap();
        engine.tick(100.0, 16.0).unwrap();
        assert_eq!(engine.now(), 100.0);
    }

    #[test]
    fn calling_a_non_function_is_a_type_error() {
        let engine = Engine::default();
        let err = engine.call(&Value::from(3), Value::Undefined, &[]).unwrap_err();
        assert!(matches!(err, EvalError::Type(_)));
    }

    #[test]
    fn evaluation_stack_detects_reentry() {
        let engine = Engine::default();
        let prop = Property::new("a", "var", Weak::new());
        let guard = engine.enter_evaluation(&prop).unwrap();
        assert!(matches!(engine.enter_evaluation(&prop), Err(EvalError::CyclicBinding(_))));
        assert!(engine.untracked(|| engine.evaluating_property()).is_none());
        drop(guard);
        assert!(engine.evaluating_property().is_none());
    }
}
