//! Declarative client flavor.
//!
//! Calls are described as [`RequestTemplate`]s relative to a base URL. Before
//! a template is rendered into a real request, every registered
//! [`RequestInterceptor`] gets to edit it, in registration order.

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use reqwest::{Request, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use rc_core::{CorrelationConfig, Error, RequestScope, Result};

use crate::propagate::{HeaderSink, OutboundCorrelation};
use crate::rest::{build_http_client, HttpExecution};

/// Default timeout for clients that bring no execution of their own.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A request described relative to a client's base URL.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl RequestTemplate {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| Error::Internal(format!("failed to encode request body: {e}")))?;
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(bytes);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

impl HeaderSink for RequestTemplate {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }
}

/// Edits a template before it is sent.
pub trait RequestInterceptor: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn apply(&self, scope: Option<&RequestScope>, template: &mut RequestTemplate);
}

/// Copies the scope's correlation id onto the template.
#[derive(Debug, Clone)]
pub struct TemplateCorrelationInterceptor {
    outbound: OutboundCorrelation,
    enabled: bool,
}

impl TemplateCorrelationInterceptor {
    pub fn new(config: &CorrelationConfig) -> Result<Self> {
        Ok(Self {
            outbound: OutboundCorrelation::new(config)?,
            enabled: config.client.declarative_enabled,
        })
    }
}

impl RequestInterceptor for TemplateCorrelationInterceptor {
    fn name(&self) -> &str {
        "correlation"
    }

    fn apply(&self, scope: Option<&RequestScope>, template: &mut RequestTemplate) {
        if !self.enabled {
            return;
        }
        if let Some(id) = self.outbound.propagate(scope, &mut *template) {
            tracing::debug!(
                correlation_id = %id,
                path = %template.path,
                "Propagating correlation id"
            );
        }
    }
}

/// Builder for [`DeclarativeClient`].
pub struct DeclarativeClientBuilder {
    base_url: String,
    execution: Option<Arc<dyn HttpExecution>>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    timeout: Duration,
}

impl DeclarativeClientBuilder {
    /// Append an interceptor to the chain.
    pub fn interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Append the correlation interceptor for `config`.
    pub fn correlation(self, config: &CorrelationConfig) -> Result<Self> {
        let interceptor = TemplateCorrelationInterceptor::new(config)?;
        Ok(self.interceptor(Arc::new(interceptor)))
    }

    /// Use a custom execution instead of a fresh reqwest client.
    pub fn execution(mut self, execution: Arc<dyn HttpExecution>) -> Self {
        self.execution = Some(execution);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<DeclarativeClient> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| {
            Error::configuration(format!("invalid base url '{}': {e}", self.base_url))
        })?;

        let timeout = self.timeout;
        let execution = self
            .execution
            .unwrap_or_else(|| Arc::new(build_http_client(timeout)));

        Ok(DeclarativeClient {
            base_url,
            execution,
            interceptors: self.interceptors.into(),
            scope: None,
        })
    }
}

/// A client that sends templates relative to a fixed base URL.
#[derive(Clone)]
pub struct DeclarativeClient {
    base_url: String,
    execution: Arc<dyn HttpExecution>,
    interceptors: Arc<[Arc<dyn RequestInterceptor>]>,
    scope: Option<RequestScope>,
}

impl DeclarativeClient {
    pub fn builder(base_url: impl Into<String>) -> DeclarativeClientBuilder {
        DeclarativeClientBuilder {
            base_url: base_url.into(),
            execution: None,
            interceptors: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn for_scope(&self, scope: &RequestScope) -> Self {
        Self {
            base_url: self.base_url.clone(),
            execution: Arc::clone(&self.execution),
            interceptors: Arc::clone(&self.interceptors),
            scope: Some(scope.clone()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run the interceptor chain over `template` and build the request.
    pub fn prepare(&self, mut template: RequestTemplate) -> Result<Request> {
        for interceptor in self.interceptors.iter() {
            interceptor.apply(self.scope.as_ref(), &mut template);
        }
        self.render(template)
    }

    fn render(&self, template: RequestTemplate) -> Result<Request> {
        let path = if template.path.starts_with('/') {
            template.path
        } else {
            format!("/{}", template.path)
        };
        let mut url = Url::parse(&format!("{}{}", self.base_url, path)).map_err(Error::outbound)?;
        if !template.query.is_empty() {
            url.query_pairs_mut().extend_pairs(template.query.iter());
        }

        let mut request = Request::new(template.method, url);
        *request.headers_mut() = template.headers;
        if let Some(body) = template.body {
            *request.body_mut() = Some(body.into());
        }
        Ok(request)
    }

    /// Send `template`, returning the raw response whatever its status.
    pub async fn execute(&self, template: RequestTemplate) -> Result<Response> {
        let request = self.prepare(template)?;
        self.execution
            .execute(request)
            .await
            .map_err(Error::outbound)
    }

    /// Send `template` and return the body, failing on a non-success status.
    pub async fn call_text(&self, template: RequestTemplate) -> Result<String> {
        let response = self.checked(template).await?;
        response.text().await.map_err(Error::outbound)
    }

    /// Send `template` and decode the JSON body, failing on a non-success status.
    pub async fn call_json<T: DeserializeOwned>(&self, template: RequestTemplate) -> Result<T> {
        let response = self.checked(template).await?;
        response.json().await.map_err(Error::outbound)
    }

    async fn checked(&self, template: RequestTemplate) -> Result<Response> {
        let response = self.execute(template).await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::downstream(status.as_u16(), message));
        }
        Ok(response)
    }
}

impl std::fmt::Debug for DeclarativeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.interceptors.iter().map(|i| i.name()).collect();
        f.debug_struct("DeclarativeClient")
            .field("base_url", &self.base_url)
            .field("interceptors", &names)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rc_core::{CorrelationContext, CorrelationId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingExecution {
        seen: Mutex<Vec<Request>>,
    }

    #[async_trait]
    impl HttpExecution for RecordingExecution {
        async fn execute(&self, request: Request) -> reqwest::Result<Response> {
            let echoed = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            self.seen.lock().unwrap().push(request);
            Ok(Response::from(http::Response::new(echoed)))
        }
    }

    struct Tag(&'static str);

    impl RequestInterceptor for Tag {
        fn name(&self) -> &str {
            self.0
        }

        fn apply(&self, _scope: Option<&RequestScope>, template: &mut RequestTemplate) {
            template.headers.append(
                HeaderName::from_static("x-chain"),
                HeaderValue::from_static(self.0),
            );
        }
    }

    fn bound_scope(value: &str) -> RequestScope {
        let scope = Arc::new(CorrelationContext::new()).open_scope();
        scope.bind(CorrelationId::new(value).unwrap()).unwrap();
        scope
    }

    fn client(config: &CorrelationConfig, execution: Arc<RecordingExecution>) -> DeclarativeClient {
        DeclarativeClient::builder("http://localhost:8080/")
            .correlation(config)
            .unwrap()
            .execution(execution)
            .build()
            .unwrap()
    }

    #[test]
    fn template_set_header_replaces() {
        let mut template = RequestTemplate::get("/")
            .header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("old"),
            );
        template.set_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("new"),
        );
        assert_eq!(template.headers().get_all("x-request-id").iter().count(), 1);
        assert_eq!(template.headers().get("x-request-id").unwrap(), "new");
    }

    #[test]
    fn prepare_renders_url_and_query() {
        let execution = Arc::new(RecordingExecution::default());
        let client = client(&CorrelationConfig::default(), execution);

        let request = client
            .prepare(RequestTemplate::get("items").query("page", "2"))
            .unwrap();

        assert_eq!(request.url().as_str(), "http://localhost:8080/items?page=2");
        assert_eq!(request.method(), &Method::GET);
    }

    #[test]
    fn correlation_interceptor_applies_scope() {
        let execution = Arc::new(RecordingExecution::default());
        let scope = bound_scope("abc-123");
        let client = client(&CorrelationConfig::default(), execution).for_scope(&scope);

        let request = client.prepare(RequestTemplate::get("/")).unwrap();

        assert_eq!(request.headers().get("x-request-id").unwrap(), "abc-123");
    }

    #[test]
    fn disabled_flavor_is_pass_through() {
        let mut config = CorrelationConfig::default();
        config.client.declarative_enabled = false;
        let execution = Arc::new(RecordingExecution::default());
        let scope = bound_scope("abc-123");
        let client = client(&config, execution).for_scope(&scope);

        let request = client.prepare(RequestTemplate::get("/")).unwrap();

        assert!(request.headers().get("x-request-id").is_none());
    }

    #[test]
    fn interceptors_run_in_order() {
        let client = DeclarativeClient::builder("http://localhost")
            .interceptor(Arc::new(Tag("one")))
            .interceptor(Arc::new(Tag("two")))
            .execution(Arc::new(RecordingExecution::default()))
            .build()
            .unwrap();

        let request = client.prepare(RequestTemplate::get("/")).unwrap();
        let chain: Vec<_> = request
            .headers()
            .get_all("x-chain")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();

        assert_eq!(chain, vec!["one", "two"]);
        assert!(format!("{client:?}").contains("\"one\", \"two\""));
    }

    #[test]
    fn bad_base_url_fails_fast() {
        let result = DeclarativeClient::builder("not a url").build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn call_text_returns_body() {
        let execution = Arc::new(RecordingExecution::default());
        let scope = bound_scope("echo-me");
        let client = client(&CorrelationConfig::default(), execution.clone()).for_scope(&scope);

        let body = client.call_text(RequestTemplate::get("/")).await.unwrap();

        assert_eq!(body, "echo-me");
        assert_eq!(execution.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn json_body_sets_content_type() {
        let template = RequestTemplate::post("/items")
            .json(&serde_json::json!({"name": "x"}))
            .unwrap();
        assert_eq!(
            template.headers().get("content-type").unwrap(),
            "application/json"
        );
        assert_eq!(template.body().unwrap(), br#"{"name":"x"}"#);
    }
}
