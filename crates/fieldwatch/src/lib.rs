#![forbid(unsafe_code)]

//! Property-level change observation for plain data records.
//!
//! # Role
//! `fieldwatch` turns the own data properties of a [`Record`] into intercepted
//! properties and notifies subscribers, through a deferred task queue, each
//! time one of them is written.
//!
//! # Primary pieces
//! - **Record**: identity-keyed structured record with own and inherited
//!   properties.
//! - **Registry**: converts records, keeps per-record subscriber lists and
//!   schedules delivery of [`ChangeRecord`]s.
//! - **TaskQueue**: single-threaded FIFO queue that deliveries and
//!   unsubscriptions are deferred to.
//! - **Disposer**: cancels exactly one subscription.
//!
//! # Default registry
//! The free functions [`observe`], [`make_observable`], [`run_pending`] and
//! [`run_until_idle`] use a registry shared by everything on the current
//! thread. Records are `!Send`, so that thread is the only one that can write
//! them.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use fieldwatch::Record;
//!
//! let person = Record::new()
//!     .with("Id", 1)
//!     .with("Name", "Brad")
//!     .with("Age", 12);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let observation = fieldwatch::observe(&person, move |change| {
//!     sink.borrow_mut().push(change.to_string());
//! });
//!
//! person.set("Name", "Krzysztof");
//! fieldwatch::run_pending();
//! assert_eq!(*seen.borrow(), vec!["Name: \"Brad\" -> \"Krzysztof\"".to_string()]);
//!
//! observation.dispose();
//! fieldwatch::run_pending();
//!
//! person.set("Age", 33);
//! fieldwatch::run_pending();
//! assert_eq!(seen.borrow().len(), 1);
//! ```

pub mod change;
pub mod options;
pub mod record;
pub mod registry;
pub mod task_queue;
pub mod value;

#[cfg(feature = "json")]
pub mod json;

pub use change::ChangeRecord;
pub use options::ObservableOptions;
pub use record::{Record, RecordId};
pub use registry::{Callback, Disposer, Registry, SubscriptionGuard};
pub use task_queue::TaskQueue;
pub use value::{Method, Value};

#[cfg(feature = "json")]
pub use json::JsonError;

thread_local! {
    static DEFAULT_REGISTRY: Registry = Registry::new();
}

/// Handle to this thread's default registry.
#[must_use]
pub fn registry() -> Registry {
    DEFAULT_REGISTRY.with(Registry::clone)
}

/// Observe `record` through the default registry.
pub fn observe(record: &Record, callback: impl Fn(&ChangeRecord) + 'static) -> Disposer {
    registry().observe(record, callback)
}

/// Convert `record` through the default registry, skipping `exclusions`.
pub fn make_observable(record: &Record, exclusions: &[&str]) {
    registry().make_observable(record, exclusions);
}

/// Run one turn of the default registry's task queue.
pub fn run_pending() -> usize {
    registry().run_pending()
}

/// Drain the default registry's task queue.
pub fn run_until_idle() -> usize {
    registry().run_until_idle()
}
