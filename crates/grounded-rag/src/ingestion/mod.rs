//! Document ingestion: loaders, recursive splitter and directory processing

mod chunker;
mod parser;
mod processor;

pub use chunker::TextChunker;
pub use parser::{FileParser, FileType, LoadedDocument};
pub use processor::{DirectoryChunks, DocumentProcessor};
