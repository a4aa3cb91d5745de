//! `SwarmServer` — Axum HTTP + SSE server.

use std::net::SocketAddr;
use std::time::Instant;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

/// The orchestrator's HTTP server.
pub struct SwarmServer {
    config: ServerConfig,
    state: AppState,
}

impl SwarmServer {
    /// Create a server over pre-wired application state.
    #[must_use]
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router with all routes and middleware.
    #[must_use]
    pub fn router(&self) -> Router {
        routes::api_router()
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
    }

    /// Bind and start serving. Returns the bound address and the server
    /// task handle; the task completes after graceful shutdown.
    #[instrument(skip_all, fields(host = %self.config.host, port = self.config.port))]
    pub async fn listen(&self) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), std::io::Error> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let bound_addr = listener.local_addr()?;
        info!(addr = %bound_addr, "server started");

        let router = self.router();
        let shutdown_token = self.state.shutdown.token();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    shutdown_token.cancelled().await;
                    info!("server shutdown initiated");
                })
                .await;
            info!("server shutdown complete");
        });

        Ok((bound_addr, handle))
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The shared application state.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }
}
