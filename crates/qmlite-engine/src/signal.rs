//! Signal/slot dispatch.
//!
//! A `Signal` is a broadcast list of slots, called synchronously and in
//! connection order. It stores no value. Property change notifications and
//! user-declared signals share this type.
//!
//! Connections carry an optional receiver. A slot whose receiver has been
//! dropped or deleted is skipped, and connecting records the signal in the
//! receiver's tidy-up list so teardown can sever the connection from the
//! receiver's side too.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::engine::Engine;
use crate::error::EvalError;
use crate::object::{Object, ObjectRef};
use crate::property::Property;
use crate::value::Value;

pub type NativeSlot = dyn Fn(&Engine, &[Value]) -> Result<(), EvalError>;

/// The object or property a slot runs on behalf of.
#[derive(Clone)]
pub enum Receiver {
    Object(Weak<Object>),
    Property(Weak<Property>),
}

impl Receiver {
    pub fn object(obj: &ObjectRef) -> Self {
        Receiver::Object(Rc::downgrade(obj))
    }

    fn same(&self, other: &Receiver) -> bool {
        match (self, other) {
            (Receiver::Object(a), Receiver::Object(b)) => a.ptr_eq(b),
            (Receiver::Property(a), Receiver::Property(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

#[derive(Clone)]
pub enum Slot {
    /// Re-evaluate a dependent property's binding.
    Update(Weak<Property>),
    /// Script function, called with the receiver as `this`.
    Callable(Value),
    Native(Rc<NativeSlot>),
}

impl Slot {
    pub fn native(f: impl Fn(&Engine, &[Value]) -> Result<(), EvalError> + 'static) -> Self {
        Slot::Native(Rc::new(f))
    }

    fn same(&self, other: &Slot) -> bool {
        match (self, other) {
            (Slot::Update(a), Slot::Update(b)) => a.ptr_eq(b),
            (Slot::Callable(a), Slot::Callable(b)) => a.strict_eq(b),
            (Slot::Native(a), Slot::Native(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

#[derive(Clone)]
struct Connection {
    id: u64,
    receiver: Option<Receiver>,
    slot: Slot,
}

struct SignalInner {
    name: String,
    params: Vec<String>,
    owner: Weak<Object>,
    slots: RefCell<Vec<Connection>>,
    next_id: Cell<u64>,
}

#[derive(Clone)]
pub struct Signal(Rc<SignalInner>);

impl Signal {
    pub fn new(name: impl Into<String>, params: Vec<String>, owner: Weak<Object>) -> Self {
        Signal(Rc::new(SignalInner {
            name: name.into(),
            params,
            owner,
            slots: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Declared parameter names, bound by name in handler bodies.
    pub fn params(&self) -> &[String] {
        &self.0.params
    }

    pub fn owner(&self) -> Option<ObjectRef> {
        self.0.owner.upgrade()
    }

    pub fn same(&self, other: &Signal) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn slot_count(&self) -> usize {
        self.0.slots.borrow().len()
    }

    // ── Connecting ────────────────────────────────────────────────────────

    pub fn connect(&self, receiver: Option<Receiver>, slot: Slot) {
        let id = self.0.next_id.get();
        self.0.next_id.set(id + 1);

        match &receiver {
            Some(Receiver::Object(w)) => {
                if let Some(obj) = w.upgrade() {
                    if !self.0.owner.ptr_eq(w) {
                        obj.track_signal(self.clone());
                    }
                }
            }
            Some(Receiver::Property(w)) => {
                if let Some(prop) = w.upgrade() {
                    prop.track_signal(self.clone());
                }
            }
            None => {}
        }

        self.0.slots.borrow_mut().push(Connection { id, receiver, slot });
    }

    /// Connect a Rust closure running on behalf of `receiver`.
    pub fn connect_native(
        &self,
        receiver: &ObjectRef,
        f: impl Fn(&Engine, &[Value]) -> Result<(), EvalError> + 'static,
    ) {
        self.connect(Some(Receiver::object(receiver)), Slot::native(f));
    }

    /// Make `dependent` re-evaluate whenever this signal fires.
    pub fn connect_update(&self, dependent: &Rc<Property>) {
        let weak = Rc::downgrade(dependent);
        self.connect(Some(Receiver::Property(weak.clone())), Slot::Update(weak));
    }

    pub fn is_connected(&self, receiver: Option<&Receiver>, slot: &Slot) -> bool {
        self.0.slots.borrow().iter().any(|c| {
            c.slot.same(slot)
                && match (receiver, &c.receiver) {
                    (Some(a), Some(b)) => a.same(b),
                    (None, _) => true,
                    _ => false,
                }
        })
    }

    pub fn is_update_connected(&self, dependent: &Rc<Property>) -> bool {
        let weak = Rc::downgrade(dependent);
        self.0
            .slots
            .borrow()
            .iter()
            .any(|c| matches!(&c.slot, Slot::Update(w) if w.ptr_eq(&weak)))
    }

    // ── Disconnecting ─────────────────────────────────────────────────────

    /// Remove every connection running `slot`, whatever its receiver.
    pub fn disconnect_slot(&self, slot: &Slot) {
        self.0.slots.borrow_mut().retain(|c| !c.slot.same(slot));
    }

    /// Remove every connection made on behalf of `receiver`.
    pub fn disconnect_receiver(&self, receiver: &Receiver) {
        self.0
            .slots
            .borrow_mut()
            .retain(|c| !c.receiver.as_ref().is_some_and(|r| r.same(receiver)));
    }

    pub fn disconnect(&self, receiver: &Receiver, slot: &Slot) {
        self.0.slots.borrow_mut().retain(|c| {
            !(c.slot.same(slot) && c.receiver.as_ref().is_some_and(|r| r.same(receiver)))
        });
    }

    pub fn clear(&self) {
        self.0.slots.borrow_mut().clear();
    }

    // ── Emitting ──────────────────────────────────────────────────────────

    /// Call every live slot with `args`. The first slot error aborts the
    /// emission and is returned.
    pub fn emit(&self, engine: &Engine, args: &[Value]) -> Result<(), EvalError> {
        let snapshot = self.0.slots.borrow().clone();
        for conn in snapshot {
            // A slot earlier in this emission may have disconnected this one.
            if !self.0.slots.borrow().iter().any(|c| c.id == conn.id) {
                continue;
            }
            let this = match &conn.receiver {
                Some(Receiver::Object(w)) => match w.upgrade() {
                    Some(obj) if !obj.is_deleted() => Value::Object(obj),
                    _ => continue,
                },
                Some(Receiver::Property(w)) if w.strong_count() == 0 => continue,
                _ => Value::Undefined,
            };
            match &conn.slot {
                Slot::Update(w) => {
                    if let Some(prop) = w.upgrade() {
                        prop.update(engine)?;
                    }
                }
                Slot::Callable(f) => {
                    engine.call(f, this, args)?;
                }
                Slot::Native(f) => f(engine, args)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn counter() -> (Rc<Cell<usize>>, Slot) {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        (hits, Slot::native(move |_, _| {
            h.set(h.get() + 1);
            Ok(())
        }))
    }

    #[test]
    fn slots_run_in_connection_order() {
        let engine = Engine::new(EngineConfig::default());
        let sig = Signal::new("fired", vec![], Weak::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let log = log.clone();
            sig.connect(None, Slot::native(move |_, _| {
                log.borrow_mut().push(n);
                Ok(())
            }));
        }
        sig.emit(&engine, &[]).unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn disconnect_by_slot() {
        let engine = Engine::new(EngineConfig::default());
        let sig = Signal::new("fired", vec![], Weak::new());
        let (hits, slot) = counter();
        sig.connect(None, slot.clone());
        assert!(sig.is_connected(None, &slot));
        sig.disconnect_slot(&slot);
        sig.emit(&engine, &[]).unwrap();
        assert_eq!(hits.get(), 0);
        assert_eq!(sig.slot_count(), 0);
    }

    #[test]
    fn slot_disconnected_mid_emission_does_not_run() {
        let engine = Engine::new(EngineConfig::default());
        let sig = Signal::new("fired", vec![], Weak::new());
        let (hits, second) = counter();
        let (s, victim) = (sig.clone(), second.clone());
        sig.connect(None, Slot::native(move |_, _| {
            s.disconnect_slot(&victim);
            Ok(())
        }));
        sig.connect(None, second);
        sig.emit(&engine, &[]).unwrap();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn errors_propagate() {
        let engine = Engine::new(EngineConfig::default());
        let sig = Signal::new("fired", vec![], Weak::new());
        sig.connect(None, Slot::native(|_, _| Err(EvalError::type_error("boom"))));
        let (hits, slot) = counter();
        sig.connect(None, slot);
        assert!(sig.emit(&engine, &[]).is_err());
        assert_eq!(hits.get(), 0);
    }
}
