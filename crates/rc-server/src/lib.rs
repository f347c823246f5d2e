//! rc-server: the inbound side of request correlation.
//!
//! This crate resolves a correlation id for every inbound HTTP request and
//! makes it available to handlers. It provides:
//!
//! - [`InboundStage`], which resolves, binds, and finalizes ids
//! - [`CorrelatedHeaders`], a header view with the resolved id layered on top
//! - [`CorrelationLayer`] for any tower HTTP service
//! - [`correlation_middleware`] for axum routers
//! - extractors for [`RequestCorrelation`] and [`CorrelatedHeaders`]

pub mod extract;
pub mod headers;
pub mod inbound;
pub mod layer;
pub mod middleware;

pub use extract::MissingCorrelation;
pub use headers::CorrelatedHeaders;
pub use inbound::{FinalizeGuard, InboundStage, RequestCorrelation};
pub use layer::{CorrelationLayer, CorrelationService};
pub use middleware::correlation_middleware;
