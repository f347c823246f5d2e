//! Correlation lifecycle observers.
//!
//! An [`ObserverSet`] is an ordered, immutable list of
//! [`CorrelationObserver`]s fixed at construction. Both callbacks are invoked
//! in registration order. A failing observer is logged and skipped; it never
//! stops the request or the observers after it.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::ids::CorrelationId;

/// Listener notified when a request is assigned a correlation id and when
/// that request finishes.
pub trait CorrelationObserver: Send + Sync {
    /// Name used in logs when a callback fails.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once the id is bound, before the request is handled.
    fn assigned(&self, id: &CorrelationId) -> Result<()>;

    /// Called after the request finished, whatever the outcome.
    fn cleanup(&self, _id: &CorrelationId) -> Result<()> {
        Ok(())
    }
}

/// Ordered list of observers.
#[derive(Clone)]
pub struct ObserverSet {
    observers: Arc<[Arc<dyn CorrelationObserver>]>,
}

impl ObserverSet {
    pub fn new(observers: Vec<Arc<dyn CorrelationObserver>>) -> Self {
        Self {
            observers: observers.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Invoke `assigned` on every observer. Returns the number of failures.
    pub fn notify_assigned(&self, id: &CorrelationId) -> usize {
        self.notify(id, "assigned", |observer, id| observer.assigned(id))
    }

    /// Invoke `cleanup` on every observer. Returns the number of failures.
    pub fn notify_cleanup(&self, id: &CorrelationId) -> usize {
        self.notify(id, "cleanup", |observer, id| observer.cleanup(id))
    }

    fn notify<F>(&self, id: &CorrelationId, phase: &'static str, callback: F) -> usize
    where
        F: Fn(&dyn CorrelationObserver, &CorrelationId) -> Result<()>,
    {
        let mut failures = 0;
        for observer in self.observers.iter() {
            if let Err(e) = callback(observer.as_ref(), id) {
                failures += 1;
                tracing::warn!(
                    observer = observer.name(),
                    phase,
                    correlation_id = %id,
                    error = %e,
                    "Correlation observer failed"
                );
            }
        }
        failures
    }
}

impl Default for ObserverSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<Arc<dyn CorrelationObserver>> for ObserverSet {
    fn from_iter<I: IntoIterator<Item = Arc<dyn CorrelationObserver>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.observers.iter().map(|o| o.name()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TracingObserver
// ---------------------------------------------------------------------------

/// Observer that logs each lifecycle event at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CorrelationObserver for TracingObserver {
    fn name(&self) -> &str {
        "tracing"
    }

    fn assigned(&self, id: &CorrelationId) -> Result<()> {
        tracing::debug!(correlation_id = %id, "Correlation id assigned");
        Ok(())
    }

    fn cleanup(&self, id: &CorrelationId) -> Result<()> {
        tracing::debug!(correlation_id = %id, "Correlation id released");
        Ok(())
    }
}
