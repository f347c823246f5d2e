//! Axum extractors for the values the inbound stage attaches.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::convert::Infallible;

use crate::headers::CorrelatedHeaders;
use crate::inbound::RequestCorrelation;

/// Rejection used when a handler asks for correlation data on a route that
/// is not behind the correlation layer.
#[derive(Debug, Clone, Copy)]
pub struct MissingCorrelation;

impl IntoResponse for MissingCorrelation {
    fn into_response(self) -> Response {
        tracing::error!(
            "Handler requested correlation data but the correlation layer is not installed"
        );
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "request correlation is not configured for this route",
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for RequestCorrelation
where
    S: Send + Sync,
{
    type Rejection = MissingCorrelation;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestCorrelation>()
            .cloned()
            .ok_or(MissingCorrelation)
    }
}

impl<S> OptionalFromRequestParts<S> for RequestCorrelation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<RequestCorrelation>().cloned())
    }
}

impl<S> FromRequestParts<S> for CorrelatedHeaders
where
    S: Send + Sync,
{
    type Rejection = MissingCorrelation;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CorrelatedHeaders>()
            .cloned()
            .ok_or(MissingCorrelation)
    }
}
