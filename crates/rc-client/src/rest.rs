//! Generic HTTP client flavor built on reqwest.
//!
//! [`CorrelationInterceptor`] sits between the caller and whatever actually
//! sends the request ([`HttpExecution`]). [`CorrelatedClient`] packages the
//! two with a request scope for handler code.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rc_core::{CorrelationConfig, Error, RequestScope, Result};
use reqwest::{Client, Method, Request, Response, Url};

use crate::propagate::OutboundCorrelation;

/// Default timeout for clients built from configuration.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a reqwest client with `timeout`, falling back to the defaults if the
/// TLS backend refuses the configuration.
pub fn build_http_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::warn!("Failed to build HTTP client with timeout: {}", e);
        Client::new()
    })
}

/// Sends a prepared request.
#[async_trait]
pub trait HttpExecution: Send + Sync {
    async fn execute(&self, request: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl HttpExecution for Client {
    async fn execute(&self, request: Request) -> reqwest::Result<Response> {
        Client::execute(self, request).await
    }
}

/// Sets the correlation header on outgoing requests, then executes them.
#[derive(Debug, Clone)]
pub struct CorrelationInterceptor {
    outbound: OutboundCorrelation,
    enabled: bool,
}

impl CorrelationInterceptor {
    pub fn new(config: &CorrelationConfig) -> Result<Self> {
        Ok(Self {
            outbound: OutboundCorrelation::new(config)?,
            enabled: config.client.http_enabled,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Decorate `request` from `scope` and call `execution` exactly once.
    ///
    /// The execution result, success or error, is returned as-is.
    pub async fn intercept<E>(
        &self,
        scope: Option<&RequestScope>,
        mut request: Request,
        execution: &E,
    ) -> reqwest::Result<Response>
    where
        E: HttpExecution + ?Sized,
    {
        if self.enabled {
            if let Some(id) = self.outbound.propagate(scope, &mut request) {
                tracing::debug!(
                    correlation_id = %id,
                    method = %request.method(),
                    url = %request.url(),
                    "Propagating correlation id"
                );
            }
        }
        execution.execute(request).await
    }
}

/// An HTTP client bound to one request scope.
///
/// Build one per application with [`CorrelatedClient::new`], then derive a
/// scoped copy per inbound request with [`CorrelatedClient::for_scope`].
#[derive(Clone)]
pub struct CorrelatedClient {
    execution: Arc<dyn HttpExecution>,
    interceptor: CorrelationInterceptor,
    scope: Option<RequestScope>,
}

impl CorrelatedClient {
    pub fn new(config: &CorrelationConfig) -> Result<Self> {
        Self::with_timeout(config, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(config: &CorrelationConfig, timeout: Duration) -> Result<Self> {
        Self::with_execution(config, Arc::new(build_http_client(timeout)))
    }

    pub fn with_execution(
        config: &CorrelationConfig,
        execution: Arc<dyn HttpExecution>,
    ) -> Result<Self> {
        Ok(Self {
            execution,
            interceptor: CorrelationInterceptor::new(config)?,
            scope: None,
        })
    }

    pub fn for_scope(&self, scope: &RequestScope) -> Self {
        Self {
            execution: Arc::clone(&self.execution),
            interceptor: self.interceptor.clone(),
            scope: Some(scope.clone()),
        }
    }

    pub fn scope(&self) -> Option<&RequestScope> {
        self.scope.as_ref()
    }

    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.interceptor
            .intercept(self.scope.as_ref(), request, self.execution.as_ref())
            .await
            .map_err(Error::outbound)
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        let url = Url::parse(url).map_err(Error::outbound)?;
        self.execute(Request::new(Method::GET, url)).await
    }
}

impl std::fmt::Debug for CorrelatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelatedClient")
            .field("interceptor", &self.interceptor)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_core::{CorrelationContext, CorrelationId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingExecution {
        calls: AtomicUsize,
        seen: Mutex<Vec<http::HeaderMap>>,
    }

    #[async_trait]
    impl HttpExecution for RecordingExecution {
        async fn execute(&self, request: Request) -> reqwest::Result<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.headers().clone());
            let response = http::Response::builder()
                .status(418)
                .body("teapot")
                .unwrap();
            Ok(Response::from(response))
        }
    }

    fn bound_scope(value: &str) -> RequestScope {
        let scope = Arc::new(CorrelationContext::new()).open_scope();
        scope.bind(CorrelationId::new(value).unwrap()).unwrap();
        scope
    }

    fn request() -> Request {
        Request::new(Method::GET, Url::parse("http://localhost/").unwrap())
    }

    #[tokio::test]
    async fn intercept_sets_header_and_executes_once() {
        let interceptor = CorrelationInterceptor::new(&CorrelationConfig::default()).unwrap();
        let execution = RecordingExecution::default();
        let scope = bound_scope("abc-123");

        let response = interceptor
            .intercept(Some(&scope), request(), &execution)
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 418);
        assert_eq!(execution.calls.load(Ordering::SeqCst), 1);
        let seen = execution.seen.lock().unwrap();
        assert_eq!(seen[0].get("x-request-id").unwrap(), "abc-123");
    }

    #[tokio::test]
    async fn intercept_without_scope_does_not_touch_headers() {
        let interceptor = CorrelationInterceptor::new(&CorrelationConfig::default()).unwrap();
        let execution = RecordingExecution::default();

        interceptor
            .intercept(None, request(), &execution)
            .await
            .unwrap();

        assert_eq!(execution.calls.load(Ordering::SeqCst), 1);
        assert!(execution.seen.lock().unwrap()[0].is_empty());
    }

    #[tokio::test]
    async fn disabled_interceptor_passes_through() {
        let mut config = CorrelationConfig::default();
        config.client.http_enabled = false;
        let interceptor = CorrelationInterceptor::new(&config).unwrap();
        let execution = RecordingExecution::default();
        let scope = bound_scope("abc-123");

        interceptor
            .intercept(Some(&scope), request(), &execution)
            .await
            .unwrap();

        assert!(!interceptor.is_enabled());
        assert!(execution.seen.lock().unwrap()[0].is_empty());
    }

    #[tokio::test]
    async fn scoped_client_uses_its_scope() {
        let execution = Arc::new(RecordingExecution::default());
        let client = CorrelatedClient::with_execution(
            &CorrelationConfig::with_header_name("X-TraceId"),
            execution.clone(),
        )
        .unwrap();
        let scope = bound_scope("trace-1");

        client
            .for_scope(&scope)
            .get("http://localhost/echo")
            .await
            .unwrap();
        client.get("http://localhost/echo").await.unwrap();

        let seen = execution.seen.lock().unwrap();
        assert_eq!(seen[0].get("x-traceid").unwrap(), "trace-1");
        assert!(seen[1].get("x-traceid").is_none());
    }

    #[tokio::test]
    async fn invalid_url_is_outbound_error() {
        let client = CorrelatedClient::with_execution(
            &CorrelationConfig::default(),
            Arc::new(RecordingExecution::default()),
        )
        .unwrap();

        let err = client.get("not a url").await.unwrap_err();
        assert!(matches!(err, Error::Outbound { .. }));
    }

    #[tokio::test]
    async fn built_client_applies_timeout() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client =
            CorrelatedClient::with_timeout(&CorrelationConfig::default(), Duration::from_millis(50))
                .unwrap();
        let err = client.get(&server.uri()).await.unwrap_err();

        match err {
            Error::Outbound { source } => {
                let source = source.downcast::<reqwest::Error>().unwrap();
                assert!(source.is_timeout());
            }
            other => panic!("expected outbound error, got {other:?}"),
        }
    }
}
