//! Inbound correlation stage.
//!
//! For every inbound request the stage:
//!
//! 1. resolves the id: the configured header verbatim when present and
//!    non-blank, otherwise a fresh id from the [`IdGenerator`];
//! 2. binds it to a new [`RequestScope`] and calls each observer's
//!    `assigned` callback in registration order;
//! 3. sets the configured header on the forwarded request to the resolved id,
//!    replacing whatever the caller sent, and attaches a [`RequestCorrelation`]
//!    plus a [`CorrelatedHeaders`] view (the caller's original headers with the
//!    override layered on top) to the request extensions;
//! 4. returns a [`FinalizeGuard`]. Finishing or dropping the guard calls each
//!    observer's `cleanup` callback, again in registration order, and then
//!    unbinds the scope.
//!
//! Because step 4 runs on drop, it also happens when the downstream future
//! returns an error, panics, or is cancelled.

use axum::http::{HeaderMap, HeaderName, Request};
use rc_core::{
    CorrelationConfig, CorrelationContext, CorrelationId, IdGenerator, ObserverSet, RequestScope,
    UuidGenerator,
};
use std::sync::Arc;

use crate::headers::CorrelatedHeaders;

/// Correlation attached to an inbound request's extensions.
#[derive(Debug, Clone)]
pub struct RequestCorrelation {
    id: CorrelationId,
    scope: RequestScope,
}

impl RequestCorrelation {
    pub fn new(id: CorrelationId, scope: RequestScope) -> Self {
        Self { id, scope }
    }

    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    /// Scope handle to pass to outbound clients and spawned work.
    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }

    /// Give up the id and keep only the scope, e.g. to move it into a task.
    pub fn into_scope(self) -> RequestScope {
        self.scope
    }
}

// ---------------------------------------------------------------------------
// InboundStage
// ---------------------------------------------------------------------------

/// Request-entry stage shared by the tower layer and the axum middleware.
pub struct InboundStage {
    header: HeaderName,
    generator: Arc<dyn IdGenerator>,
    observers: ObserverSet,
    context: Arc<CorrelationContext>,
}

impl InboundStage {
    /// Build a stage with the default generator and no observers.
    ///
    /// Fails if the configured header name is unusable.
    pub fn new(config: &CorrelationConfig) -> rc_core::Result<Self> {
        Ok(Self {
            header: config.header()?,
            generator: Arc::new(UuidGenerator),
            observers: ObserverSet::empty(),
            context: Arc::new(CorrelationContext::new()),
        })
    }

    pub fn with_generator(mut self, generator: Arc<dyn IdGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_observers(mut self, observers: ObserverSet) -> Self {
        self.observers = observers;
        self
    }

    /// Share an existing context, e.g. one also read by background workers.
    pub fn with_context(mut self, context: Arc<CorrelationContext>) -> Self {
        self.context = context;
        self
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header
    }

    pub fn context(&self) -> &Arc<CorrelationContext> {
        &self.context
    }

    pub fn observers(&self) -> &ObserverSet {
        &self.observers
    }

    /// Pick the caller's id or generate one.
    ///
    /// Only blank values count as absent. Bytes that are not UTF-8 are read
    /// as latin-1.
    pub fn resolve(&self, headers: &HeaderMap) -> CorrelationId {
        let supplied = headers
            .get(&self.header)
            .map(|v| decode_header(v.as_bytes()))
            .and_then(|v| CorrelationId::new(v).ok());

        match supplied {
            Some(id) => id,
            None => {
                let id = self.generator.generate();
                tracing::debug!(
                    header = %self.header,
                    correlation_id = %id,
                    "Correlation id not present, generated a new one"
                );
                id
            }
        }
    }

    /// Run steps 1 to 3 on `request` and hand back the finalizer.
    pub fn attach<B>(&self, request: &mut Request<B>) -> rc_core::Result<FinalizeGuard> {
        let id = self.resolve(request.headers());
        let value = id.header_value()?;

        let scope = self.context.open_scope();
        scope.bind(id.clone())?;
        let guard = FinalizeGuard {
            id: id.clone(),
            scope: scope.clone(),
            observers: self.observers.clone(),
            finished: false,
        };

        self.observers.notify_assigned(&id);

        let headers = CorrelatedHeaders::with_override(
            request.headers().clone(),
            self.header.clone(),
            value.clone(),
        );
        request.headers_mut().insert(self.header.clone(), value);
        let extensions = request.extensions_mut();
        extensions.insert(RequestCorrelation::new(id, scope));
        extensions.insert(headers);

        Ok(guard)
    }
}

fn decode_header(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

impl std::fmt::Debug for InboundStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundStage")
            .field("header", &self.header)
            .field("observers", &self.observers)
            .field("bound_scopes", &self.context.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// FinalizeGuard
// ---------------------------------------------------------------------------

/// Runs observer cleanup and unbinds the scope exactly once.
#[must_use = "dropping the guard finalizes the request immediately"]
#[derive(Debug)]
pub struct FinalizeGuard {
    id: CorrelationId,
    scope: RequestScope,
    observers: ObserverSet,
    finished: bool,
}

impl FinalizeGuard {
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.id
    }

    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }

    /// Finalize now instead of at drop.
    pub fn finish(mut self) {
        self.finalize();
    }

    fn finalize(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.observers.notify_cleanup(&self.id);
        self.scope.unbind();
    }
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        self.finalize();
    }
}
