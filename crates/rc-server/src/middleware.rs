//! Correlation middleware for axum routers.
//!
//! Install with `axum::middleware::from_fn_with_state(stage, correlation_middleware)`.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use tracing::Instrument;

use crate::inbound::InboundStage;

/// Resolve and bind the correlation id, run the rest of the stack inside a
/// `request` span, then finalize.
pub async fn correlation_middleware(
    State(stage): State<Arc<InboundStage>>,
    mut request: Request,
    next: Next,
) -> Response {
    let guard = match stage.attach(&mut request) {
        Ok(guard) => guard,
        Err(e) => {
            tracing::error!(error = %e, "Failed to correlate request, forwarding as-is");
            return next.run(request).await;
        }
    };

    let span = tracing::info_span!("request", correlation_id = %guard.correlation_id());
    let response = next.run(request).instrument(span).await;

    guard.finish();
    response
}
