//! Application state for the RAG server

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::pipeline::RagPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// The one pipeline instance owned by this process
    pipeline: Arc<RagPipeline>,
    /// Scratch directory for uploads
    uploads_dir: PathBuf,
}

impl AppState {
    /// Create new application state
    pub fn new(pipeline: Arc<RagPipeline>, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                uploads_dir: uploads_dir.into(),
            }),
        }
    }

    /// Get the pipeline
    pub fn pipeline(&self) -> &Arc<RagPipeline> {
        &self.inner.pipeline
    }

    /// Get the uploads directory
    pub fn uploads_dir(&self) -> &Path {
        &self.inner.uploads_dir
    }

    /// Check if the pipeline is ready to serve
    pub fn is_ready(&self) -> bool {
        self.inner.pipeline.is_initialized()
    }
}
