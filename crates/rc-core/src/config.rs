//! Correlation configuration.
//!
//! [`CorrelationConfig`] is deserialized as part of the application config and
//! frozen at startup. Every field defaults sensibly so an empty section is
//! valid.

use http::HeaderName;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Header carrying the correlation id when nothing else is configured.
pub const DEFAULT_HEADER_NAME: &str = "X-Request-Id";

/// Settings shared by the inbound and outbound correlation stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Header read on inbound requests and written on outbound ones.
    pub header_name: String,
    pub client: ClientConfig,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_HEADER_NAME.into(),
            client: ClientConfig::default(),
        }
    }
}

impl CorrelationConfig {
    /// Default settings with a custom header name.
    pub fn with_header_name(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
            ..Self::default()
        }
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::configuration(format!("correlation config parse error: {e}")))
    }

    /// Parse the configured header name.
    ///
    /// This is the fail-fast check: stages call it at construction time so a
    /// bad name stops startup instead of surfacing per request.
    pub fn header(&self) -> Result<HeaderName> {
        let name = self.header_name.trim();
        if name.is_empty() {
            return Err(Error::configuration("correlation header_name is empty"));
        }
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            Error::configuration(format!(
                "correlation header_name '{}' is not a valid header name: {e}",
                self.header_name
            ))
        })
    }

    /// Validate the whole section.
    pub fn validate(&self) -> Result<()> {
        self.header().map(|_| ())
    }
}

/// Switches for the outbound interceptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Propagate on the generic HTTP client.
    pub http_enabled: bool,
    /// Propagate on declarative clients.
    pub declarative_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            http_enabled: true,
            declarative_enabled: true,
        }
    }
}
