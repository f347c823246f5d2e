//! Error-to-HTTP response conversion.
//!
//! Wraps [`rc_core::Error`] so demo handlers can return
//! `Result<T, AppError>` and still answer with a JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rc_core::CorrelationId;
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: rc_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: rc_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: &CorrelationId) -> Self {
        self.request_id = Some(id.to_string());
        self
    }

    pub fn inner(&self) -> &rc_core::Error {
        &self.inner
    }
}

impl From<rc_core::Error> for AppError {
    fn from(e: rc_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in demo handler"
            );
        }

        let code = match &self.inner {
            rc_core::Error::Configuration(_) => "configuration_error",
            rc_core::Error::InvalidCorrelationId(_) => "invalid_correlation_id",
            rc_core::Error::ScopeAlreadyBound { .. } => "scope_already_bound",
            rc_core::Error::Observer { .. } => "observer_error",
            rc_core::Error::Outbound { .. } => "outbound_error",
            rc_core::Error::Downstream { .. } => "downstream_error",
            rc_core::Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.inner.to_string(),
            "code": code,
            "request_id": self.request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}
