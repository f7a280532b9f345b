//! File loaders for plain text and PDF

use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::ChunkMetadata;

/// Ceiling for a single pdf-extract run; some fonts make it spin
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// File types the loaders understand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileType {
    /// Plain UTF-8 text (.txt)
    Text,
    /// PDF document
    Pdf,
    /// Anything else, with the lowercased extension
    Unsupported(String),
}

impl FileType {
    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "txt" => Self::Text,
            "pdf" => Self::Pdf,
            _ => Self::Unsupported(extension),
        }
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

/// A loaded document (or PDF page) before splitting
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Extracted text
    pub content: String,
    /// Metadata inherited by every chunk of this document
    pub metadata: ChunkMetadata,
}

/// Loader dispatch by file type
pub struct FileParser;

impl FileParser {
    /// Load a file into one or more documents
    ///
    /// Text files yield one document; PDFs yield one document per page with
    /// a 0-based `page` field.
    pub fn load(path: &Path) -> Result<Vec<LoadedDocument>> {
        let source = path.to_string_lossy().to_string();

        match FileType::from_path(path) {
            FileType::Text => Self::load_text(path, source),
            FileType::Pdf => {
                let data = std::fs::read(path)?;
                Self::load_pdf(&data, source)
            }
            FileType::Unsupported(ext) => Err(Error::UnsupportedFileType(if ext.is_empty() {
                format!("{} (no extension)", source)
            } else {
                format!("{} (.{})", source, ext)
            })),
        }
    }

    fn load_text(path: &Path, source: String) -> Result<Vec<LoadedDocument>> {
        let data = std::fs::read(path)?;
        let content = String::from_utf8(data)
            .map_err(|e| Error::file_parse(&source, format!("Invalid UTF-8: {}", e)))?;

        Ok(vec![LoadedDocument {
            content,
            metadata: ChunkMetadata::with_source(source),
        }])
    }

    /// Split PDF bytes into per-page documents
    pub fn load_pdf(data: &[u8], source: String) -> Result<Vec<LoadedDocument>> {
        let pages = Self::extract_pdf_pages(data, &source)?;

        if pages.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::file_parse(
                &source,
                "No text content could be extracted from PDF",
            ));
        }

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(page, text)| LoadedDocument {
                content: cleanup_pdf_text(&text),
                metadata: ChunkMetadata::with_source(source.clone()).with_field("page", page),
            })
            .collect())
    }

    /// Extract per-page text on a worker thread so a hanging font cannot block ingestion
    fn extract_pdf_pages(data: &[u8], source: &str) -> Result<Vec<String>> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem_by_pages(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
            Ok(Ok(pages)) => {
                let _ = handle.join();
                Ok(pages)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                tracing::warn!("pdf-extract failed on {}: {}, trying fallback", source, e);
                Self::extract_pdf_pages_fallback(data, source)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "PDF extraction timeout after {}s on {}",
                    PDF_EXTRACT_TIMEOUT.as_secs(),
                    source
                );
                Self::extract_pdf_pages_fallback(data, source)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("PDF extraction thread crashed on {}", source);
                Self::extract_pdf_pages_fallback(data, source)
            }
        }
    }

    /// Fallback PDF text extraction using lopdf directly
    fn extract_pdf_pages_fallback(data: &[u8], source: &str) -> Result<Vec<String>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(source, format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        for page_number in doc.get_pages().keys() {
            match doc.extract_text(&[*page_number]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    tracing::debug!("Could not extract page {} of {}: {}", page_number, source, e);
                    pages.push(String::new());
                }
            }
        }

        if pages.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::file_parse(
                source,
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        Ok(pages)
    }
}

/// Normalise ligatures, typographic punctuation and stray NULs left by PDF extraction
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{00A0}', " ")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_path(Path::new("a/b.txt")), FileType::Text);
        assert_eq!(FileType::from_path(Path::new("REPORT.PDF")), FileType::Pdf);
        assert_eq!(
            FileType::from_path(Path::new("sheet.csv")),
            FileType::Unsupported("csv".to_string())
        );
        assert!(!FileType::from_path(Path::new("README")).is_supported());
    }

    #[test]
    fn test_load_text_sets_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Olive oil is rich in monounsaturated fat.").unwrap();

        let docs = FileParser::load(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "Olive oil is rich in monounsaturated fat.");
        assert_eq!(docs[0].metadata.source(), Some(path.to_string_lossy().as_ref()));
    }

    #[test]
    fn test_unsupported_extension_is_an_error_here() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();

        assert!(matches!(
            FileParser::load(&path),
            Err(Error::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_invalid_pdf_bytes_fail_cleanly() {
        let result = FileParser::load_pdf(b"definitely not a pdf", "broken.pdf".to_string());
        assert!(matches!(result, Err(Error::FileParse { .. })));
    }

    #[test]
    fn test_cleanup_pdf_text() {
        assert_eq!(cleanup_pdf_text("\u{FB01}ne \u{2013} \u{201C}ok\u{201D}\0"), "fine - \"ok\"");
    }
}
