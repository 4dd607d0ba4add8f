#![forbid(unsafe_code)]

//! Identity-keyed data records with interceptable properties.
//!
//! # Design
//!
//! A [`Record`] is a shared handle (`Rc`) to an ordered set of named own
//! properties plus an optional prototype. Cloning the handle aliases the same
//! object, so identity (not contents) decides whether two handles are "the
//! same record".
//!
//! Each own property holds either a plain data slot or an intercepted slot.
//! An intercepted slot owns the captured value and the write hook installed by
//! the [`Registry`](crate::Registry); reads return the captured value, writes
//! swap it and hand the old and new values to the hook.
//!
//! ```text
//! Record ──► [ "Id"   : Data(1)                      ]
//!            [ "Name" : Intercepted{ cell, hook } ───┼──► Registry (dispatch)
//!            [ "greet": Data(Function)               ]
//!            prototype ──► Record (inherited, never intercepted)
//! ```
//!
//! # Failure Modes
//!
//! - **Reference cycles**: a record stored inside itself (directly or through
//!   other records) is never freed. Records are plain `Rc` graphs.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::value::{Method, Value};

/// Identity of a [`Record`], stable for the lifetime of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(usize);

impl RecordId {
    /// Raw identity value.
    #[must_use]
    pub fn get(self) -> usize {
        self.0
    }
}

/// Receives every write to an intercepted property.
pub(crate) trait WriteHook {
    fn on_write(&self, object: &Record, property: &Rc<str>, old_value: Value, new_value: Value);
}

/// Storage cell of one intercepted property.
pub(crate) struct InterceptedSlot {
    value: RefCell<Value>,
    hook: Rc<dyn WriteHook>,
}

impl InterceptedSlot {
    fn new(value: Value, hook: Rc<dyn WriteHook>) -> Self {
        Self {
            value: RefCell::new(value),
            hook,
        }
    }

    fn read(&self) -> Value {
        self.value.borrow().clone()
    }

    fn write(&self, object: &Record, property: &Rc<str>, new_value: Value) {
        let old_value = self.value.replace(new_value.clone());
        self.hook.on_write(object, property, old_value, new_value);
    }
}

enum Slot {
    Data(Value),
    Intercepted(Rc<InterceptedSlot>),
}

struct Property {
    name: Rc<str>,
    slot: Slot,
    enumerable: bool,
}

impl Property {
    fn value(&self) -> Value {
        match &self.slot {
            Slot::Data(v) => v.clone(),
            Slot::Intercepted(cell) => cell.read(),
        }
    }
}

struct RecordInner {
    /// Own properties in definition order.
    properties: RefCell<Vec<Property>>,
    prototype: Option<Record>,
}

/// A shared, identity-keyed structured record.
///
/// Cloning a `Record` creates a new handle to the **same** object.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RecordInner>,
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl Record {
    /// Create an empty record with no prototype.
    #[must_use]
    pub fn new() -> Self {
        Self::with_prototype(None)
    }

    /// Create an empty record whose lookups fall back to `prototype`.
    ///
    /// Properties reachable only through the prototype are inherited and are
    /// never intercepted on this record.
    #[must_use]
    pub fn inheriting(prototype: &Record) -> Self {
        Self::with_prototype(Some(prototype.clone()))
    }

    fn with_prototype(prototype: Option<Record>) -> Self {
        Self {
            inner: Rc::new(RecordInner {
                properties: RefCell::new(Vec::new()),
                prototype,
            }),
        }
    }

    /// Builder form of [`define`](Self::define).
    #[must_use]
    pub fn with(self, name: &str, value: impl Into<Value>) -> Self {
        self.define(name, value);
        self
    }

    /// Builder form of [`define_hidden`](Self::define_hidden).
    #[must_use]
    pub fn with_hidden(self, name: &str, value: impl Into<Value>) -> Self {
        self.define_hidden(name, value);
        self
    }

    /// Add a function-valued own property.
    #[must_use]
    pub fn with_method(self, name: &str, f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        self.define(name, Method::new(f));
        self
    }

    /// Define (or redefine) an own enumerable data property.
    ///
    /// Redefining an intercepted property turns it back into a plain data
    /// property; later writes to it no longer notify.
    pub fn define(&self, name: &str, value: impl Into<Value>) {
        self.upsert(name, Slot::Data(value.into()), true);
    }

    /// Define (or redefine) an own non-enumerable data property.
    pub fn define_hidden(&self, name: &str, value: impl Into<Value>) {
        self.upsert(name, Slot::Data(value.into()), false);
    }

    fn upsert(&self, name: &str, slot: Slot, enumerable: bool) {
        let mut props = self.inner.properties.borrow_mut();
        match props.iter().position(|p| &*p.name == name) {
            Some(idx) => {
                props[idx].slot = slot;
                props[idx].enumerable = enumerable;
            }
            None => props.push(Property {
                name: Rc::from(name),
                slot,
                enumerable,
            }),
        }
    }

    /// Read a property, own first, then along the prototype chain.
    ///
    /// Reads never notify.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.get_own(name)
            .or_else(|| self.inner.prototype.as_ref().and_then(|p| p.get(name)))
    }

    /// Read an own property, ignoring the prototype.
    #[must_use]
    pub fn get_own(&self, name: &str) -> Option<Value> {
        self.inner
            .properties
            .borrow()
            .iter()
            .find(|p| &*p.name == name)
            .map(Property::value)
    }

    /// Write a property.
    ///
    /// - Intercepted own property: the value is stored and a change is handed
    ///   to the registry, even when the new value equals the old one.
    /// - Plain own property: overwritten silently.
    /// - Otherwise: a new own enumerable data property is created, shadowing
    ///   any inherited property of the same name.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let intercepted = {
            let mut props = self.inner.properties.borrow_mut();
            match props.iter().position(|p| &*p.name == name) {
                Some(idx) => {
                    let prop = &mut props[idx];
                    match &mut prop.slot {
                        Slot::Data(current) => {
                            *current = value;
                            return;
                        }
                        Slot::Intercepted(cell) => (Rc::clone(&prop.name), Rc::clone(cell), value),
                    }
                }
                None => {
                    props.push(Property {
                        name: Rc::from(name),
                        slot: Slot::Data(value),
                        enumerable: true,
                    });
                    return;
                }
            }
        };

        // Borrow released: the hook may read this record.
        let (property, cell, value) = intercepted;
        cell.write(self, &property, value);
    }

    /// Call a function-valued property. `None` if the property is missing or
    /// not a function.
    pub fn invoke(&self, name: &str, args: &[Value]) -> Option<Value> {
        match self.get(name)? {
            Value::Function(method) => Some(method.call(args)),
            _ => None,
        }
    }

    /// Own enumerable property names in definition order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .properties
            .borrow()
            .iter()
            .filter(|p| p.enumerable)
            .map(|p| p.name.to_string())
            .collect()
    }

    /// Own enumerable `(name, value)` pairs in definition order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .properties
            .borrow()
            .iter()
            .filter(|p| p.enumerable)
            .map(|p| (p.name.to_string(), p.value()))
            .collect()
    }

    #[must_use]
    pub fn has_own(&self, name: &str) -> bool {
        self.inner
            .properties
            .borrow()
            .iter()
            .any(|p| &*p.name == name)
    }

    /// Own or inherited.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.has_own(name) || self.inner.prototype.as_ref().is_some_and(|p| p.has(name))
    }

    /// Whether `name` is an own intercepted property.
    #[must_use]
    pub fn is_intercepted(&self, name: &str) -> bool {
        self.inner
            .properties
            .borrow()
            .iter()
            .any(|p| &*p.name == name && matches!(p.slot, Slot::Intercepted(_)))
    }

    /// Names of own intercepted properties in definition order.
    #[must_use]
    pub fn intercepted_keys(&self) -> Vec<String> {
        self.inner
            .properties
            .borrow()
            .iter()
            .filter(|p| matches!(p.slot, Slot::Intercepted(_)))
            .map(|p| p.name.to_string())
            .collect()
    }

    #[must_use]
    pub fn prototype(&self) -> Option<&Record> {
        self.inner.prototype.as_ref()
    }

    #[must_use]
    pub fn id(&self) -> RecordId {
        RecordId(Rc::as_ptr(&self.inner) as usize)
    }

    /// Whether both handles refer to the same record.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakRecord {
        WeakRecord(Rc::downgrade(&self.inner))
    }

    /// Convert every own, enumerable data property accepted by `qualifies`
    /// into an intercepted property wired to `hook`. Returns the number of
    /// converted properties.
    pub(crate) fn intercept_own(
        &self,
        mut qualifies: impl FnMut(&str, &Value) -> bool,
        hook: &Rc<dyn WriteHook>,
    ) -> usize {
        let mut props = self.inner.properties.borrow_mut();
        let mut converted = 0;
        for prop in props.iter_mut() {
            if !prop.enumerable {
                continue;
            }
            let Slot::Data(value) = &prop.slot else {
                continue;
            };
            if !qualifies(&*prop.name, value) {
                continue;
            }
            let captured = value.clone();
            prop.slot = Slot::Intercepted(Rc::new(InterceptedSlot::new(captured, Rc::clone(hook))));
            converted += 1;
        }
        converted
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id().get())
            .field("keys", &self.keys())
            .field("intercepted", &self.intercepted_keys().len())
            .finish()
    }
}

/// Non-owning association to a record, held by registry entries.
pub(crate) struct WeakRecord(Weak<RecordInner>);

impl WeakRecord {
    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub(crate) fn upgrade(&self) -> Option<Record> {
        self.0.upgrade().map(|inner| Record { inner })
    }
}
