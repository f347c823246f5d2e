//! Copying the current correlation id onto outgoing requests.
//!
//! Both client flavors go through [`OutboundCorrelation::propagate`]; they
//! differ only in what kind of request they hand it, which is abstracted by
//! [`HeaderSink`].

use http::{HeaderMap, HeaderName, HeaderValue};
use rc_core::{CorrelationConfig, CorrelationId, RequestScope, Result};

/// Anything an outgoing header can be written to.
///
/// Implementations must replace any existing values for `name`.
pub trait HeaderSink {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);
}

impl HeaderSink for HeaderMap {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.insert(name, value);
    }
}

impl HeaderSink for reqwest::Request {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers_mut().insert(name, value);
    }
}

impl<B> HeaderSink for http::Request<B> {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers_mut().insert(name, value);
    }
}

/// Writes the scope's correlation id under the configured header.
#[derive(Debug, Clone)]
pub struct OutboundCorrelation {
    header: HeaderName,
}

impl OutboundCorrelation {
    pub fn new(config: &CorrelationConfig) -> Result<Self> {
        Ok(Self {
            header: config.header()?,
        })
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header
    }

    /// Set the header from `scope` if it has a bound id.
    ///
    /// Returns the id that was written. With no scope, or a scope whose
    /// request has already finished, the sink is left untouched.
    pub fn propagate<S>(&self, scope: Option<&RequestScope>, sink: &mut S) -> Option<CorrelationId>
    where
        S: HeaderSink + ?Sized,
    {
        let id = scope?.correlation_id()?;
        match id.header_value() {
            Ok(value) => {
                sink.set_header(self.header.clone(), value);
                Some(id)
            }
            Err(e) => {
                tracing::warn!(
                    correlation_id = %id,
                    error = %e,
                    "Skipping unencodable correlation id"
                );
                None
            }
        }
    }
}
