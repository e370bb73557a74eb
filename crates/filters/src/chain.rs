//! Filter chain executor
//!
//! Walks an ordered list of filters, feeding the output event set of each
//! into the next. Filters never merge events; fan-out grows the set, a drop
//! shrinks it, and an empty set terminates the chain early.

use std::sync::Arc;

use relay_event::Event;
use relay_plugin::Filter;

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// An ordered, shareable filter chain.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    /// Create a chain from ordered filter instances.
    pub fn new(filters: Vec<Arc<dyn Filter>>) -> Self {
        Self { filters }
    }

    /// Create an empty, pass-through chain.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of filters in the chain.
    #[inline]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the chain has no filters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Plugin kinds in chain order, for diagnostics.
    pub fn kinds(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.plugin().to_string()).collect()
    }

    /// Run one event through the chain, returning the surviving set.
    ///
    /// Each input event's terminal is owned by whichever filter consumes it;
    /// events in the returned set are still open and belong to the caller.
    pub async fn execute(&self, event: Event) -> Vec<Event> {
        let mut current = vec![event];
        for filter in &self.filters {
            if current.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for event in current {
                next.extend(filter.filter(event).await);
            }
            current = next;
        }
        current
    }
}
