//! Unified error type for request correlation.
//!
//! All rc-* crates funnel their failures into [`Error`], which carries enough
//! context for HTTP handlers to derive a status code via [`Error::http_status`].

/// Unified error type covering all correlation failure modes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A collaborator or setting was missing or invalid at construction time.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A correlation id value was blank or not representable as a header value.
    #[error("Invalid correlation id: {0}")]
    InvalidCorrelationId(String),

    /// A scope was bound twice within the same request.
    #[error("Scope {scope} is already bound to correlation id {existing}")]
    ScopeAlreadyBound {
        /// The scope that was rebound.
        scope: String,
        /// The id that is already bound to it.
        existing: String,
    },

    /// An observer callback failed.
    #[error("Observer error [{observer}]: {message}")]
    Observer {
        /// Name of the observer that failed.
        observer: String,
        /// Human-readable error description.
        message: String,
    },

    /// An outbound HTTP call failed.
    #[error("Outbound request failed: {source}")]
    Outbound {
        /// The underlying client error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A downstream service answered, but with something we cannot use.
    #[error("Downstream error [{status}]: {message}")]
    Downstream {
        /// HTTP status returned by the downstream service.
        status: u16,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Configuration(_) => 500,
            Error::InvalidCorrelationId(_) => 400,
            Error::ScopeAlreadyBound { .. } => 500,
            Error::Observer { .. } => 500,
            Error::Outbound { .. } => 502,
            Error::Downstream { .. } => 502,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Convenience constructor for [`Error::Observer`].
    pub fn observer(observer: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Observer {
            observer: observer.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Outbound`].
    pub fn outbound(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Outbound {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Downstream`].
    pub fn downstream(status: u16, message: impl Into<String>) -> Self {
        Error::Downstream {
            status,
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_display() {
        let err = Error::configuration("header name is empty");
        assert_eq!(err.to_string(), "Configuration error: header name is empty");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn invalid_id_display() {
        let err = Error::InvalidCorrelationId("blank".into());
        assert_eq!(err.to_string(), "Invalid correlation id: blank");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn scope_already_bound_display() {
        let err = Error::ScopeAlreadyBound {
            scope: "s-1".into(),
            existing: "abc".into(),
        };
        assert_eq!(
            err.to_string(),
            "Scope s-1 is already bound to correlation id abc"
        );
    }

    #[test]
    fn observer_display() {
        let err = Error::observer("audit", "sink closed");
        assert_eq!(err.to_string(), "Observer error [audit]: sink closed");
    }

    #[test]
    fn outbound_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::outbound(io_err);
        assert!(err.to_string().contains("refused"));
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn downstream_display() {
        let err = Error::downstream(503, "unavailable");
        assert_eq!(err.to_string(), "Downstream error [503]: unavailable");
        assert_eq!(err.http_status(), 502);
    }
}
