//! Outbound calls made by the demo routes.

use std::time::Duration;

use rc_client::{CorrelatedClient, DeclarativeClient, RequestTemplate};
use rc_core::{CorrelationConfig, RequestScope};

/// The echo endpoint as seen through the declarative client.
#[async_trait::async_trait]
pub trait EchoApi: Send + Sync {
    /// Call `GET /` and return whatever correlation id it echoed.
    async fn echo(&self, scope: &RequestScope) -> rc_core::Result<String>;
}

pub struct DeclarativeEcho {
    client: DeclarativeClient,
}

impl DeclarativeEcho {
    pub fn new(
        base_url: &str,
        config: &CorrelationConfig,
        timeout: Duration,
    ) -> rc_core::Result<Self> {
        let client = DeclarativeClient::builder(base_url)
            .correlation(config)?
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl EchoApi for DeclarativeEcho {
    async fn echo(&self, scope: &RequestScope) -> rc_core::Result<String> {
        self.client
            .for_scope(scope)
            .call_text(RequestTemplate::get("/"))
            .await
    }
}

/// Generic client for `/rest`, sharing one connection pool.
pub fn rest_client(
    config: &CorrelationConfig,
    timeout: Duration,
) -> rc_core::Result<CorrelatedClient> {
    CorrelatedClient::with_timeout(config, timeout)
}
