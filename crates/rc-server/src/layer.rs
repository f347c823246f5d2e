//! Tower layer running the inbound stage around any HTTP service.
//!
//! Unlike the axum middleware, this works with any `Service<Request<B>>` and
//! passes the inner service's error type through untouched.

use axum::http::Request;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;

use crate::inbound::InboundStage;

/// Layer wrapping services in [`CorrelationService`].
#[derive(Debug, Clone)]
pub struct CorrelationLayer {
    stage: Arc<InboundStage>,
}

impl CorrelationLayer {
    pub fn new(stage: Arc<InboundStage>) -> Self {
        Self { stage }
    }

    pub fn stage(&self) -> &Arc<InboundStage> {
        &self.stage
    }
}

impl<S> Layer<S> for CorrelationLayer {
    type Service = CorrelationService<S>;

    fn layer(&self, service: S) -> Self::Service {
        CorrelationService {
            inner: service,
            stage: Arc::clone(&self.stage),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorrelationService<S> {
    inner: S,
    stage: Arc<InboundStage>,
}

impl<S, B> Service<Request<B>> for CorrelationService<S>
where
    S: Service<Request<B>>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let guard = match self.stage.attach(&mut request) {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!(error = %e, "Failed to correlate request, forwarding as-is");
                return Box::pin(self.inner.call(request));
            }
        };

        let span = tracing::info_span!("request", correlation_id = %guard.correlation_id());
        let future = self.inner.call(request);

        Box::pin(
            async move {
                let result = future.await;
                guard.finish();
                result
            }
            .instrument(span),
        )
    }
}
