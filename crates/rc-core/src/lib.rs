//! rc-core: correlation ids, request scopes, observers, and configuration.
//!
//! This crate is the foundational dependency for the other rc-* crates. It
//! owns the value types ([`CorrelationId`], [`ScopeId`]), the pluggable
//! [`IdGenerator`], the scope-keyed [`CorrelationContext`], the
//! [`CorrelationObserver`] contract, and the [`CorrelationConfig`] shared by
//! the inbound and outbound stages.

pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod ids;
pub mod observer;

// Re-export the most commonly used items at the crate root.
pub use config::{ClientConfig, CorrelationConfig, DEFAULT_HEADER_NAME};
pub use context::{CorrelationContext, RequestScope};
pub use error::{Error, Result};
pub use generator::{IdGenerator, UuidGenerator};
pub use ids::{CorrelationId, ScopeId};
pub use observer::{CorrelationObserver, ObserverSet, TracingObserver};
