use crate::config::Config;
use anyhow::{Context, Result};
use axum::{http::HeaderName, middleware, routing::get, Router};
use rc_client::CorrelatedClient;
use rc_core::{CorrelationObserver, ObserverSet, TracingObserver};
use rc_server::{correlation_middleware, InboundStage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub mod downstream;
pub mod error;
pub mod routes;

use downstream::{DeclarativeEcho, EchoApi};

/// Shared state for the demo routes
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Configured correlation header, parsed once
    pub header: HeaderName,
    /// Base URL the outbound demo calls target
    pub downstream_base: Arc<str>,
    pub rest: CorrelatedClient,
    pub echo: Arc<dyn EchoApi>,
}

impl AppState {
    pub fn new(config: Arc<Config>, downstream_base: &str) -> Result<Self> {
        let timeout = Duration::from_secs(config.downstream.timeout_secs);
        let header = config
            .correlation
            .header()
            .context("Invalid correlation header")?;
        let rest = downstream::rest_client(&config.correlation, timeout)
            .context("Failed to build REST client")?;
        let echo = DeclarativeEcho::new(downstream_base, &config.correlation, timeout)
            .context("Failed to build declarative client")?;

        Ok(Self {
            header,
            downstream_base: downstream_base.trim_end_matches('/').into(),
            rest,
            echo: Arc::new(echo),
            config,
        })
    }
}

/// Build the inbound stage from configuration
pub fn build_stage(config: &Config) -> Result<InboundStage> {
    let mut observers: Vec<Arc<dyn CorrelationObserver>> = Vec::new();
    if config.observers.tracing {
        observers.push(Arc::new(TracingObserver));
    }

    let stage = InboundStage::new(&config.correlation)
        .context("Failed to build inbound correlation stage")?
        .with_observers(ObserverSet::new(observers));
    Ok(stage)
}

/// Create the Axum router with all demo routes
pub fn create_router(state: AppState, stage: Arc<InboundStage>) -> Router {
    Router::new()
        .route("/", get(routes::echo))
        .route("/rest", get(routes::rest))
        .route("/declarative", get(routes::declarative))
        .route("/health", get(routes::health_check))
        .layer(middleware::from_fn_with_state(stage, correlation_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build state and router for a listener bound at `local`
pub fn build_app(config: Arc<Config>, local: SocketAddr) -> Result<Router> {
    let downstream_base = config
        .downstream
        .base_url
        .clone()
        .unwrap_or_else(|| format!("http://127.0.0.1:{}", local.port()));

    let stage = Arc::new(build_stage(&config)?);
    let state = AppState::new(config, &downstream_base)?;

    tracing::info!(
        header = %state.header,
        downstream = %state.downstream_base,
        observers = ?stage.observers(),
        "Correlation configured"
    );

    Ok(create_router(state, stage))
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local = listener.local_addr()?;
    let app = build_app(Arc::new(config), local)?;

    tracing::info!("Starting server on {}", local);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(config: Config) -> Router {
        build_app(Arc::new(config), "127.0.0.1:9".parse().unwrap()).unwrap()
    }

    async fn get_text(router: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn echo_returns_supplied_id() {
        let (status, body) = get_text(
            app(Config::default()),
            Request::builder()
                .uri("/")
                .header("X-Request-Id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "abc-123");
    }

    #[tokio::test]
    async fn echo_returns_generated_id() {
        let (status, body) = get_text(
            app(Config::default()),
            Request::builder().uri("/").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.len(), 36);
    }

    #[tokio::test]
    async fn echo_uses_configured_header() {
        let mut config = Config::default();
        config.correlation.header_name = "X-TraceId".into();

        let (_, body) = get_text(
            app(config),
            Request::builder()
                .uri("/")
                .header("X-Request-Id", "ignored")
                .header("X-TraceId", "trace-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(body, "trace-1");
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, _) = get_text(
            app(Config::default()),
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn stage_observers_follow_config() {
        let mut config = Config::default();
        assert_eq!(build_stage(&config).unwrap().observers().len(), 1);

        config.observers.tracing = false;
        assert!(build_stage(&config).unwrap().observers().is_empty());
    }

    #[test]
    fn bad_header_fails_at_startup() {
        let mut config = Config::default();
        config.correlation.header_name = String::new();
        assert!(build_app(Arc::new(config), "127.0.0.1:9".parse().unwrap()).is_err());
    }
}
