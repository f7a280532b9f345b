//! Query endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /query - Answer a question from the indexed documents
pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();

    if request.query.trim().is_empty() {
        return Err(Error::BadRequest("query must not be empty".to_string()));
    }

    let result = state.pipeline().query(&request.query, request.top_k).await?;

    tracing::info!(
        "Query answered in {}ms with {} sources",
        start.elapsed().as_millis(),
        result.sources.len()
    );

    Ok(Json(QueryResponse::new(request.query, result)))
}
