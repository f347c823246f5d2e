//! Scope-keyed correlation storage.
//!
//! [`CorrelationContext`] maps each live [`ScopeId`] to the id bound for that
//! request. The map is sharded ([`DashMap`]), so binds and reads from
//! unrelated requests do not contend on a single lock.
//!
//! Nothing here is thread-local. The inbound stage hands a [`RequestScope`]
//! to the request, and code that needs the id (including work spawned onto
//! other tasks) carries that handle explicitly.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ids::{CorrelationId, ScopeId};

/// Process-wide store of the correlation id bound to each request scope.
#[derive(Debug, Default)]
pub struct CorrelationContext {
    bindings: DashMap<ScopeId, CorrelationId>,
}

impl CorrelationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `id` to `scope`.
    ///
    /// Fails with [`Error::ScopeAlreadyBound`] if the scope already carries an
    /// id; the existing binding is left untouched.
    pub fn bind(&self, scope: ScopeId, id: CorrelationId) -> Result<()> {
        match self.bindings.entry(scope) {
            Entry::Occupied(existing) => Err(Error::ScopeAlreadyBound {
                scope: scope.to_string(),
                existing: existing.get().to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(id);
                Ok(())
            }
        }
    }

    /// The id bound to `scope`, if any.
    pub fn current(&self, scope: ScopeId) -> Option<CorrelationId> {
        self.bindings.get(&scope).map(|entry| entry.value().clone())
    }

    /// Release the binding for `scope`. Unbinding an unbound scope is a no-op.
    pub fn unbind(&self, scope: ScopeId) -> Option<CorrelationId> {
        self.bindings.remove(&scope).map(|(_, id)| id)
    }

    /// Number of scopes currently bound.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Open a fresh, unbound scope on this context.
    pub fn open_scope(self: &Arc<Self>) -> RequestScope {
        RequestScope {
            id: ScopeId::new(),
            context: Arc::clone(self),
        }
    }
}

// ---------------------------------------------------------------------------
// RequestScope
// ---------------------------------------------------------------------------

/// Handle to one inbound request's slot in a [`CorrelationContext`].
///
/// Clones share the same scope. Once the request finishes and the scope is
/// unbound, [`RequestScope::correlation_id`] returns `None` for every clone,
/// so a handle that outlives its request never leaks the old id.
#[derive(Debug, Clone)]
pub struct RequestScope {
    id: ScopeId,
    context: Arc<CorrelationContext>,
}

impl RequestScope {
    /// A scope on a private, empty context. Useful for work that runs outside
    /// any inbound request (scheduled jobs, startup probes).
    pub fn detached() -> Self {
        Arc::new(CorrelationContext::new()).open_scope()
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// The id bound to this scope, or `None` outside a live request.
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.context.current(self.id)
    }

    pub fn bind(&self, id: CorrelationId) -> Result<()> {
        self.context.bind(self.id, id)
    }

    pub fn unbind(&self) -> Option<CorrelationId> {
        self.context.unbind(self.id)
    }

    pub fn context(&self) -> &Arc<CorrelationContext> {
        &self.context
    }
}
