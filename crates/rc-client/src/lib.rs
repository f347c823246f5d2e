//! rc-client: the outbound side of request correlation.
//!
//! Two client flavors copy the current request's correlation id onto
//! outgoing calls:
//!
//! - [`CorrelatedClient`] wraps plain `reqwest` requests
//! - [`DeclarativeClient`] sends [`RequestTemplate`]s through an interceptor chain
//!
//! Both share [`OutboundCorrelation`], which writes to any [`HeaderSink`].

pub mod declarative;
pub mod propagate;
pub mod rest;

pub use declarative::{
    DeclarativeClient, DeclarativeClientBuilder, RequestInterceptor, RequestTemplate,
    TemplateCorrelationInterceptor,
};
pub use propagate::{HeaderSink, OutboundCorrelation};
pub use rest::{build_http_client, CorrelatedClient, CorrelationInterceptor, HttpExecution};
