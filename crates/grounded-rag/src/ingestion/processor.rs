//! File and directory chunking

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::chunker::TextChunker;
use super::parser::{FileParser, FileType};
use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::Chunk;

/// Chunks gathered from a directory walk
#[derive(Debug, Default)]
pub struct DirectoryChunks {
    /// Chunks of every supported file, in walk order
    pub chunks: Vec<Chunk>,
    /// Files skipped because no loader handles their extension
    pub skipped: Vec<PathBuf>,
}

/// Loads files and splits them into chunks
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    chunker: TextChunker,
}

impl DocumentProcessor {
    /// Create a processor from chunking settings
    pub fn new(config: &ChunkingConfig) -> Result<Self> {
        Ok(Self {
            chunker: TextChunker::new(config.chunk_size, config.chunk_overlap)?,
        })
    }

    /// Load and chunk a single file
    ///
    /// Unsupported extensions produce no chunks and a warning, not an error.
    pub fn chunk_file(&self, path: &Path) -> Result<Vec<Chunk>> {
        if let FileType::Unsupported(ext) = FileType::from_path(path) {
            tracing::warn!(
                "No suitable loader for {} (extension '{}'), skipping",
                path.display(),
                ext
            );
            return Ok(Vec::new());
        }

        let documents = FileParser::load(path)?;
        let chunks = self.chunker.split_documents(&documents);

        tracing::debug!(
            "Chunked {} into {} chunks ({} loaded documents)",
            path.display(),
            chunks.len(),
            documents.len()
        );

        Ok(chunks)
    }

    /// Load and chunk every supported file under `dir`, recursively
    ///
    /// Files are visited in file-name order so repeated runs produce the same
    /// chunk sequence. A missing directory yields an empty result.
    pub fn chunk_directory(&self, dir: &Path) -> Result<DirectoryChunks> {
        let mut result = DirectoryChunks::default();

        if !dir.is_dir() {
            tracing::warn!("Directory not found: {}", dir.display());
            return Ok(result);
        }

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Failed to read directory entry under {}: {}", dir.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !FileType::from_path(path).is_supported() {
                tracing::warn!("Skipping unsupported file type: {}", path.display());
                result.skipped.push(path.to_path_buf());
                continue;
            }

            tracing::info!("Loading and chunking file: {}", path.display());
            result.chunks.extend(self.chunk_file(path)?);
        }

        tracing::info!(
            "Chunked directory {}: {} chunks, {} files skipped",
            dir.display(),
            result.chunks.len(),
            result.skipped.len()
        );

        Ok(result)
    }
}
