//! HTTP server for the RAG pipeline

pub mod routes;
pub mod state;

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::{RagConfig, ServerConfig};
use crate::error::{Error, Result};
use crate::pipeline::RagPipeline;
use state::AppState;

/// RAG HTTP Server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a server around an already-built pipeline
    pub fn new(config: RagConfig, pipeline: Arc<RagPipeline>) -> Self {
        let state = AppState::new(pipeline, config.pipeline.uploads_dir.clone());
        Self { config, state }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.config.server)
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        tokio::fs::create_dir_all(self.state.uploads_dir()).await?;

        let router = self.router();

        tracing::info!("Starting RAG server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Router over `state` with tracing, CORS and body-size middleware
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let router = Router::new()
        .merge(routes::api_routes(config.max_upload_size))
        .with_state(state)
        // Middleware layers (order matters - applied bottom to top)
        .layer(RequestBodyLimitLayer::new(config.max_upload_size))
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}
