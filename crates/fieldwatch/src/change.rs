#![forbid(unsafe_code)]

//! The notification payload delivered to subscribers.

use std::fmt;
use std::rc::Rc;

use crate::record::Record;
use crate::value::Value;

/// Snapshot of one intercepted write.
///
/// Built when the write happens and handed by reference to every subscriber
/// when the deferred delivery runs. `object` is the written record itself, not
/// a copy.
#[derive(Clone, PartialEq)]
pub struct ChangeRecord {
    object: Record,
    property: Rc<str>,
    old_value: Value,
    new_value: Value,
}

impl ChangeRecord {
    pub(crate) fn new(object: Record, property: Rc<str>, old_value: Value, new_value: Value) -> Self {
        Self {
            object,
            property,
            old_value,
            new_value,
        }
    }

    /// The record that was written.
    #[must_use]
    pub fn object(&self) -> &Record {
        &self.object
    }

    /// Name of the written property.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Value held before the write.
    #[must_use]
    pub fn old_value(&self) -> &Value {
        &self.old_value
    }

    /// Value stored by the write.
    #[must_use]
    pub fn new_value(&self) -> &Value {
        &self.new_value
    }

    /// Whether the write replaced the value with an equal one.
    ///
    /// Such writes are still delivered.
    #[must_use]
    pub fn is_same_value(&self) -> bool {
        self.old_value == self.new_value
    }
}

impl fmt::Debug for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRecord")
            .field("object", &self.object.id().get())
            .field("property", &&*self.property)
            .field("old_value", &self.old_value)
            .field("new_value", &self.new_value)
            .finish()
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.property, self.old_value, self.new_value
        )
    }
}
