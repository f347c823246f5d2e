//! Identifier types.
//!
//! [`CorrelationId`] is the opaque token propagated between services.
//! [`ScopeId`] keys one inbound request inside a
//! [`CorrelationContext`](crate::CorrelationContext).

use http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// CorrelationId
// ---------------------------------------------------------------------------

/// Immutable correlation token.
///
/// The wrapped string is never blank and is always representable as an HTTP
/// header value. Values supplied by callers are kept verbatim; no trimming or
/// normalisation is applied. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Validate and wrap a token.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::InvalidCorrelationId(
                "correlation id must not be blank".into(),
            ));
        }
        if HeaderValue::from_str(&value).is_err() {
            return Err(Error::InvalidCorrelationId(format!(
                "'{}' is not a valid header value",
                value.escape_debug()
            )));
        }
        Ok(Self(Arc::from(value)))
    }

    /// Canonical hyphenated form of a UUID. Always valid.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(Arc::from(uuid.hyphenated().to_string()))
    }

    /// Borrow the token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the token as a header value.
    pub fn header_value(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(&self.0)
            .map_err(|e| Error::InvalidCorrelationId(format!("{}: {e}", self.0)))
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CorrelationId> for String {
    fn from(id: CorrelationId) -> Self {
        id.0.as_ref().to_owned()
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CorrelationId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for CorrelationId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

// ---------------------------------------------------------------------------
// ScopeId
// ---------------------------------------------------------------------------

/// Key for one unit of inbound-request execution.
///
/// A fresh random id is drawn for every request, so a scope is never reused
/// by a later request even when the worker task is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(Uuid);

impl ScopeId {
    /// Create a new random scope id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_value_verbatim() {
        let id = CorrelationId::new(" abc-123 ").unwrap();
        assert_eq!(id.as_str(), " abc-123 ");
    }

    #[test]
    fn rejects_blank() {
        assert!(CorrelationId::new("").is_err());
        assert!(CorrelationId::new("   \t").is_err());
    }

    #[test]
    fn rejects_non_header_characters() {
        let err = CorrelationId::new("abc\n123").unwrap_err();
        assert!(matches!(err, Error::InvalidCorrelationId(_)));
    }

    #[test]
    fn equality_by_value() {
        let a = CorrelationId::new("abc").unwrap();
        let b: CorrelationId = "abc".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "abc");
    }

    #[test]
    fn from_uuid_is_canonical() {
        let uuid = Uuid::new_v4();
        let id = CorrelationId::from_uuid(uuid);
        assert_eq!(id.as_str().len(), 36);
        assert_eq!(Uuid::parse_str(id.as_str()).unwrap(), uuid);
    }

    #[test]
    fn header_value_matches_token() {
        let id = CorrelationId::new("trace-42").unwrap();
        assert_eq!(id.header_value().unwrap(), "trace-42");
    }

    #[test]
    fn serde_rejects_blank() {
        let ok: CorrelationId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(ok, "abc");
        assert!(serde_json::from_str::<CorrelationId>("\"  \"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"abc\"");
    }

    #[test]
    fn scope_ids_are_unique() {
        assert_ne!(ScopeId::new(), ScopeId::new());
    }
}
