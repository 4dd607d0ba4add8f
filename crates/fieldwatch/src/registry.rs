#![forbid(unsafe_code)]

//! The observation registry: interception, subscriptions, dispatch.
//!
//! # Design
//!
//! A [`Registry`] maps record identity to an entry holding the record's
//! ordered subscriber list. Entries keep only a weak association to their
//! record, so observing a record never extends its lifetime; entries of
//! dropped records are pruned lazily on the next conversion.
//!
//! Writes to intercepted properties do not call subscribers directly. Each
//! write schedules one delivery task on the registry's [`TaskQueue`], and the
//! delivery reads the subscriber list when it runs. Disposal is deferred on the
//! same queue, so the scheduling order of a write and a dispose decides whether
//! the disposed subscriber still sees that write:
//!
//! ```text
//! set(); dispose();   queue: [deliver, remove]  -> subscriber notified once
//! dispose(); set();   queue: [remove, deliver]  -> subscriber not notified
//! ```
//!
//! # Invariants
//!
//! 1. A record is converted at most once per registry; repeated conversion
//!    requests are no-ops.
//! 2. Excluded, non-enumerable, function-valued and inherited properties are
//!    never intercepted.
//! 3. Subscribers are notified in registration order.
//! 4. A subscriber list shrinks only through [`Disposer::dispose`], and each
//!    disposer removes only its own registration.
//!
//! # Failure Modes
//!
//! - **Panicking subscriber**: the panic propagates out of the queue turn that
//!   delivered the change. Subscribers later in the list miss that change.
//! - **No error paths**: re-observing, double disposal and dispatch to a
//!   record without subscribers are silent no-ops.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::change::ChangeRecord;
use crate::options::ObservableOptions;
use crate::record::{Record, RecordId, WeakRecord, WriteHook};
use crate::task_queue::TaskQueue;
use crate::value::Value;

/// A subscriber callback. Registering the same `Rc` twice creates two
/// independent subscriptions.
pub type Callback = Rc<dyn Fn(&ChangeRecord)>;

struct Subscriber {
    /// Unique per registry; identifies one registration.
    id: u64,
    callback: Callback,
}

type SubscriberList = Rc<RefCell<Vec<Subscriber>>>;

struct Entry {
    object: WeakRecord,
    subscribers: SubscriberList,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<RecordId, Entry>,
    next_subscriber: u64,
}

/// Tracks observable records and their subscribers.
///
/// Cloning a `Registry` creates a new handle to the **same** registry.
#[derive(Clone, Default)]
pub struct Registry {
    state: Rc<RefCell<RegistryState>>,
    queue: TaskQueue,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("observed", &self.observed_count())
            .field("pending_tasks", &self.queue.pending())
            .finish()
    }
}

impl Registry {
    /// Create a registry with its own task queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that defers its work onto an existing queue.
    #[must_use]
    pub fn with_queue(queue: TaskQueue) -> Self {
        Self {
            state: Rc::default(),
            queue,
        }
    }

    /// The queue deliveries and removals are deferred to.
    #[must_use]
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Run one turn of the task queue.
    pub fn run_pending(&self) -> usize {
        self.queue.run_pending()
    }

    /// Run the task queue until it is empty.
    pub fn run_until_idle(&self) -> usize {
        self.queue.run_until_idle()
    }

    /// Convert `record` into an observable record, skipping `exclusions`.
    ///
    /// Shorthand for [`make_observable_with`](Self::make_observable_with).
    pub fn make_observable(&self, record: &Record, exclusions: &[&str]) {
        let options = ObservableOptions::new().with_exclusions(exclusions.iter().copied());
        self.make_observable_with(record, &options);
    }

    /// Convert every own, enumerable, non-function data property of `record`
    /// that `options` does not exclude into an intercepted property.
    ///
    /// No-op if the record already has an entry. If no property qualifies, no
    /// entry is created and a later call scans the record again.
    pub fn make_observable_with(&self, record: &Record, options: &ObservableOptions) {
        if self.is_observable(record) {
            trace!(record = record.id().get(), "record already observable");
            return;
        }
        self.prune();

        let hook: Rc<dyn WriteHook> = Rc::new(self.clone());
        let converted = record.intercept_own(
            |name, value| !options.excludes(name) && !value.is_function(),
            &hook,
        );
        if converted == 0 {
            debug!(
                record = record.id().get(),
                "no qualifying properties, record left unobserved"
            );
            return;
        }

        self.entry_for(record);
        debug!(
            record = record.id().get(),
            converted,
            excluded = options.exclusion_count(),
            "record made observable"
        );
    }

    /// Register `callback` for changes to `record`.
    ///
    /// Converts the record first if it has no entry. Every call adds a new
    /// registration; the returned [`Disposer`] cancels only this one.
    pub fn observe(&self, record: &Record, callback: impl Fn(&ChangeRecord) + 'static) -> Disposer {
        self.observe_shared(record, Rc::new(callback))
    }

    /// Like [`observe`](Self::observe), for a callback shared between
    /// several registrations.
    pub fn observe_shared(&self, record: &Record, callback: Callback) -> Disposer {
        if !self.is_observable(record) {
            self.make_observable_with(record, &ObservableOptions::new());
        }

        // Records with no qualifying property still get an entry so the
        // registration is kept; it is never notified.
        let subscribers = self.entry_for(record);
        let id = {
            let mut state = self.state.borrow_mut();
            state.next_subscriber += 1;
            state.next_subscriber
        };
        subscribers.borrow_mut().push(Subscriber { id, callback });

        debug!(
            record = record.id().get(),
            subscriber = id,
            subscribers = subscribers.borrow().len(),
            "subscriber added"
        );

        Disposer {
            subscribers,
            id,
            queue: self.queue.clone(),
        }
    }

    /// Whether `record` has an entry in this registry.
    #[must_use]
    pub fn is_observable(&self, record: &Record) -> bool {
        self.state.borrow().entries.contains_key(&record.id())
    }

    /// Number of registrations currently listed for `record`.
    #[must_use]
    pub fn subscriber_count(&self, record: &Record) -> usize {
        self.subscribers(record)
            .map_or(0, |list| list.borrow().len())
    }

    /// Number of live records with an entry.
    #[must_use]
    pub fn observed_count(&self) -> usize {
        self.state
            .borrow()
            .entries
            .values()
            .filter(|e| e.object.is_alive())
            .count()
    }

    /// Handles to every live record with an entry.
    #[must_use]
    pub fn observed(&self) -> Vec<Record> {
        self.state
            .borrow()
            .entries
            .values()
            .filter_map(|e| e.object.upgrade())
            .collect()
    }

    /// Drop entries whose record no longer exists. Returns the number removed.
    pub fn prune(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let before = state.entries.len();
        state.entries.retain(|_, e| e.object.is_alive());
        let pruned = before - state.entries.len();
        if pruned > 0 {
            trace!(pruned, "pruned entries of dropped records");
        }
        pruned
    }

    fn subscribers(&self, record: &Record) -> Option<SubscriberList> {
        self.state
            .borrow()
            .entries
            .get(&record.id())
            .map(|e| Rc::clone(&e.subscribers))
    }

    fn entry_for(&self, record: &Record) -> SubscriberList {
        let mut state = self.state.borrow_mut();
        let entry = state.entries.entry(record.id()).or_insert_with(|| Entry {
            object: record.downgrade(),
            subscribers: Rc::default(),
        });
        Rc::clone(&entry.subscribers)
    }

    /// Deliver `change` to the subscribers listed right now.
    fn deliver(&self, change: &ChangeRecord) {
        let Some(subscribers) = self.subscribers(change.object()) else {
            trace!(
                record = change.object().id().get(),
                "no entry at delivery, change dropped"
            );
            return;
        };

        // Snapshot so callbacks may observe, write or dispose.
        let callbacks: Vec<Callback> = subscribers
            .borrow()
            .iter()
            .map(|s| Rc::clone(&s.callback))
            .collect();

        trace!(
            record = change.object().id().get(),
            property = change.property(),
            subscribers = callbacks.len(),
            "delivering change"
        );
        for callback in &callbacks {
            callback(change);
        }
    }
}

impl WriteHook for Registry {
    fn on_write(&self, object: &Record, property: &Rc<str>, old_value: Value, new_value: Value) {
        trace!(
            record = object.id().get(),
            property = %property,
            "write intercepted, delivery deferred"
        );
        let change = ChangeRecord::new(object.clone(), Rc::clone(property), old_value, new_value);
        let registry = self.clone();
        self.queue.defer(move || registry.deliver(&change));
    }
}

/// Cancels one registration made by [`Registry::observe`].
pub struct Disposer {
    subscribers: SubscriberList,
    id: u64,
    queue: TaskQueue,
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("subscriber", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Disposer {
    /// Schedule removal of this registration on the task queue.
    ///
    /// No-op when the registration is no longer listed. Safe to call any
    /// number of times; the removal only ever takes out this registration.
    pub fn dispose(&self) {
        if !self.is_active() {
            trace!(subscriber = self.id, "dispose of unlisted subscriber ignored");
            return;
        }

        let subscribers = Rc::clone(&self.subscribers);
        let id = self.id;
        self.queue.defer(move || {
            let removed = {
                let mut list = subscribers.borrow_mut();
                list.iter()
                    .position(|s| s.id == id)
                    .map(|pos| list.remove(pos))
            };
            if removed.is_some() {
                debug!(
                    subscriber = id,
                    remaining = subscribers.borrow().len(),
                    "subscriber removed"
                );
            }
            // The callback is dropped here, outside the list borrow.
            drop(removed);
        });
        trace!(subscriber = id, "subscriber removal scheduled");
    }

    /// Whether the registration is still listed. Stays `true` after
    /// [`dispose`](Self::dispose) until the removal task has run.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscribers.borrow().iter().any(|s| s.id == self.id)
    }

    /// Turn this handle into a guard that disposes when dropped.
    #[must_use]
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { disposer: self }
    }
}

/// RAII form of [`Disposer`]: dropping the guard calls
/// [`Disposer::dispose`].
pub struct SubscriptionGuard {
    disposer: Disposer,
}

impl SubscriptionGuard {
    #[must_use]
    pub fn disposer(&self) -> &Disposer {
        &self.disposer
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.disposer.dispose();
    }
}

impl fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("disposer", &self.disposer)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
