//! Property-based tests for the observation laws.
//!
//! 1. Every write to a converted property is delivered once per active
//!    subscription, with the previous and the written value.
//! 2. Writes to excluded properties are never delivered.
//! 3. Converting twice leaves the same intercepted set as converting once.
//! 4. Disposing k of n registrations of one callback leaves n - k deliveries
//!    per write.
//! 5. Delivery order follows registration order.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use fieldwatch::{Callback, ChangeRecord, Record, Registry, Value};
use proptest::prelude::*;

// ── Strategies ────────────────────────────────────────────────────────────

const NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fn exclusions_strategy() -> impl Strategy<Value = BTreeSet<usize>> {
    proptest::collection::btree_set(0usize..NAMES.len(), 0..=NAMES.len())
}

fn writes_strategy() -> impl Strategy<Value = Vec<(usize, i64)>> {
    proptest::collection::vec((0usize..NAMES.len(), -1000i64..1000), 1..40)
}

fn sample_record() -> Record {
    NAMES
        .iter()
        .enumerate()
        .fold(Record::new(), |r, (i, name)| r.with(name, i as i64))
}

fn counting(count: &Rc<Cell<usize>>) -> Callback {
    let count = Rc::clone(count);
    Rc::new(move |_: &ChangeRecord| count.set(count.get() + 1))
}

// ── Laws ──────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn writes_deliver_previous_and_new_values(writes in writes_strategy()) {
        let registry = Registry::new();
        let record = sample_record();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_cb = Rc::clone(&seen);
        let _sub = registry.observe(&record, move |change| {
            seen_cb.borrow_mut().push((
                change.property().to_string(),
                change.old_value().clone(),
                change.new_value().clone(),
            ));
        });

        let mut expected = Vec::new();
        let mut current: Vec<i64> = (0..NAMES.len() as i64).collect();
        for &(idx, v) in &writes {
            expected.push((NAMES[idx].to_string(), Value::Int(current[idx]), Value::Int(v)));
            current[idx] = v;
            record.set(NAMES[idx], v);
        }
        registry.run_until_idle();

        prop_assert_eq!(&*seen.borrow(), &expected);
    }

    #[test]
    fn excluded_properties_never_deliver(
        excluded in exclusions_strategy(),
        writes in writes_strategy(),
    ) {
        let registry = Registry::new();
        let record = sample_record();
        let names: Vec<&str> = excluded.iter().map(|&i| NAMES[i]).collect();
        registry.make_observable(&record, &names);

        let delivered = Rc::new(RefCell::new(Vec::new()));
        let delivered_cb = Rc::clone(&delivered);
        let _sub = registry.observe(&record, move |change| {
            delivered_cb.borrow_mut().push(change.property().to_string());
        });

        for &(idx, v) in &writes {
            record.set(NAMES[idx], v);
        }
        registry.run_until_idle();

        let expected = writes.iter().filter(|(idx, _)| !excluded.contains(idx)).count();
        prop_assert_eq!(delivered.borrow().len(), expected);
        for name in delivered.borrow().iter() {
            prop_assert!(!names.contains(&name.as_str()));
        }
    }

    #[test]
    fn conversion_is_idempotent(
        first in exclusions_strategy(),
        second in exclusions_strategy(),
    ) {
        let registry = Registry::new();
        let record = sample_record();
        let first: Vec<&str> = first.iter().map(|&i| NAMES[i]).collect();
        let second: Vec<&str> = second.iter().map(|&i| NAMES[i]).collect();

        registry.make_observable(&record, &first);
        let once = record.intercepted_keys();
        registry.make_observable(&record, &second);
        prop_assert_eq!(record.intercepted_keys(), once);
    }

    #[test]
    fn disposing_some_registrations_keeps_the_rest(
        total in 1usize..8,
        disposed in 0usize..8,
    ) {
        let disposed = disposed.min(total);
        let registry = Registry::new();
        let record = sample_record();
        let count = Rc::new(Cell::new(0));
        let callback = counting(&count);

        let disposers: Vec<_> = (0..total)
            .map(|_| registry.observe_shared(&record, Rc::clone(&callback)))
            .collect();
        for d in disposers.iter().take(disposed) {
            d.dispose();
            d.dispose();
        }
        registry.run_until_idle();
        prop_assert_eq!(registry.subscriber_count(&record), total - disposed);

        record.set("a", 99);
        registry.run_until_idle();
        prop_assert_eq!(count.get(), total - disposed);
    }

    #[test]
    fn delivery_follows_registration_order(n in 1usize..10) {
        let registry = Registry::new();
        let record = sample_record();
        let order = Rc::new(RefCell::new(Vec::new()));
        let _subs: Vec<_> = (0..n)
            .map(|i| {
                let order = Rc::clone(&order);
                registry.observe(&record, move |_| order.borrow_mut().push(i))
            })
            .collect();

        record.set("b", 1);
        registry.run_until_idle();
        prop_assert_eq!(order.borrow().clone(), (0..n).collect::<Vec<_>>());
    }
}
