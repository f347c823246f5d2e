//! Read-only header view with an override layer.
//!
//! [`CorrelatedHeaders`] composes the headers of the raw inbound request with
//! a small override map. The raw request is never modified. Both layers are
//! immutable after construction and shared behind `Arc`, so the view can be
//! cloned into spawned tasks and read concurrently.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashSet;
use std::sync::Arc;

/// Header view where override entries replace same-named underlying entries.
#[derive(Debug, Clone, Default)]
pub struct CorrelatedHeaders {
    underlying: Arc<HeaderMap>,
    overrides: Arc<HeaderMap>,
}

impl CorrelatedHeaders {
    pub fn new(underlying: HeaderMap, overrides: HeaderMap) -> Self {
        Self {
            underlying: Arc::new(underlying),
            overrides: Arc::new(overrides),
        }
    }

    /// View with a single overridden header.
    pub fn with_override(underlying: HeaderMap, name: HeaderName, value: HeaderValue) -> Self {
        let mut overrides = HeaderMap::with_capacity(1);
        overrides.insert(name, value);
        Self::new(underlying, overrides)
    }

    /// First value for `name`. Lookup is case-insensitive.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        if self.overrides.contains_key(name) {
            return self.overrides.get(name);
        }
        self.underlying.get(name)
    }

    /// First value for `name` as text, if it is visible ASCII.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values for `name`. An overridden name yields only the override
    /// values; the underlying ones are hidden, not merged.
    pub fn get_all(&self, name: &str) -> Vec<&HeaderValue> {
        if self.overrides.contains_key(name) {
            self.overrides.get_all(name).iter().collect()
        } else {
            self.underlying.get_all(name).iter().collect()
        }
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.overrides.contains_key(name) || self.underlying.contains_key(name)
    }

    /// Every header name visible through the view, each exactly once.
    /// Override names come first, then the remaining underlying names.
    pub fn names(&self) -> Vec<&HeaderName> {
        let mut seen = HashSet::new();
        self.overrides
            .keys()
            .chain(self.underlying.keys())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// The headers exactly as the client sent them.
    pub fn underlying(&self) -> &HeaderMap {
        &self.underlying
    }

    pub fn overrides(&self) -> &HeaderMap {
        &self.overrides
    }

    /// Flatten the view into an owned map.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut merged = HeaderMap::with_capacity(self.underlying.keys_len());
        for name in self.names() {
            for value in self.get_all(name.as_str()) {
                merged.append(name.clone(), value.clone());
            }
        }
        merged
    }
}
