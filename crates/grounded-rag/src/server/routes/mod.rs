//! API routes for the RAG server

pub mod documents;
pub mod health;
pub mod query;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/query", post(query::query_rag))
        // Larger body limit for file uploads
        .route(
            "/upload_document",
            post(upload::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/documents", get(documents::list_documents))
        .route("/health", get(health::health_check))
}
