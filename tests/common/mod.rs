//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which starts the demo router on a random port
//! so tests can talk to it over real HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use request_correlation::config::Config;
use request_correlation::server::build_app;

/// A running demo server and the configuration it was built from.
pub struct TestHarness {
    pub config: Arc<Config>,
}

impl TestHarness {
    /// Start a server with default configuration.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start a server with a custom configuration on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let config = Arc::new(config);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");
        let app = build_app(Arc::clone(&config), addr).expect("failed to build app");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (Self { config }, addr)
    }
}
