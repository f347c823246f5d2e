//! Demo routes.
//!
//! `GET /` echoes the correlation header it sees. `GET /rest` and
//! `GET /declarative` call `/` through each client flavor and check that the
//! echoed id is their own.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use rc_core::{CorrelationId, Error};
use rc_server::{CorrelatedHeaders, RequestCorrelation};

use super::error::AppError;
use super::AppState;

pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Return the correlation header value from the request view.
pub async fn echo(State(state): State<AppState>, headers: CorrelatedHeaders) -> String {
    headers
        .get_str(state.header.as_str())
        .unwrap_or_default()
        .to_string()
}

pub async fn rest(
    State(state): State<AppState>,
    correlation: RequestCorrelation,
) -> Result<String, AppError> {
    let id = correlation.id().clone();
    let url = format!("{}/", state.downstream_base);

    let response = state
        .rest
        .for_scope(correlation.scope())
        .get(&url)
        .await
        .map_err(|e| AppError::new(e).with_request_id(&id))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::new(Error::outbound(e)).with_request_id(&id))?;
    if !status.is_success() {
        return Err(AppError::new(Error::downstream(status.as_u16(), body)).with_request_id(&id));
    }

    verify_echo(&id, body)
}

pub async fn declarative(
    State(state): State<AppState>,
    correlation: RequestCorrelation,
) -> Result<String, AppError> {
    let id = correlation.id().clone();
    let body = state
        .echo
        .echo(correlation.scope())
        .await
        .map_err(|e| AppError::new(e).with_request_id(&id))?;

    verify_echo(&id, body)
}

fn verify_echo(id: &CorrelationId, echoed: String) -> Result<String, AppError> {
    if echoed != id.as_str() {
        tracing::warn!(correlation_id = %id, echoed = %echoed, "Downstream echoed a different id");
        return Err(AppError::new(Error::Internal(format!(
            "downstream echoed '{echoed}' instead of '{id}'"
        )))
        .with_request_id(id));
    }
    Ok(echoed)
}
