//! Document listing endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::response::{DocumentListResponse, DocumentView};

/// GET /documents - List every indexed chunk
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentListResponse>> {
    let chunks = state.pipeline().list_documents().await?;

    Ok(Json(DocumentListResponse {
        documents: chunks.into_iter().map(DocumentView::from).collect(),
    }))
}
