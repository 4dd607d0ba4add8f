#![forbid(unsafe_code)]

//! Options for converting a record into an observable record.

use std::collections::HashSet;

/// Configuration for [`Registry::make_observable_with`](crate::Registry::make_observable_with).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservableOptions {
    /// Property names left as plain data properties.
    exclusions: HashSet<String>,
}

impl ObservableOptions {
    /// Options with no exclusions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip interception of `name`.
    #[must_use]
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclusions.insert(name.into());
        self
    }

    /// Skip interception of every name in `names`.
    #[must_use]
    pub fn with_exclusions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.extend(names.into_iter().map(Into::into));
        self
    }

    /// Whether `name` is excluded.
    #[must_use]
    pub fn excludes(&self, name: &str) -> bool {
        self.exclusions.contains(name)
    }

    /// Number of distinct excluded names.
    #[must_use]
    pub fn exclusion_count(&self) -> usize {
        self.exclusions.len()
    }
}
