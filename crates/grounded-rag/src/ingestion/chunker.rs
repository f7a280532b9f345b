//! Recursive text splitting with overlap and start-offset tracking

use unicode_segmentation::UnicodeSegmentation;

use super::parser::LoadedDocument;
use crate::error::{Error, Result};
use crate::types::Chunk;

/// Boundary levels, coarsest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
    Char,
}

const BOUNDARIES: [Boundary; 5] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
    Boundary::Char,
];

impl Boundary {
    /// Split `text` at this boundary, separators kept at the start of the following piece
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self {
            Boundary::Paragraph => split_keeping_separator(text, "\n\n"),
            Boundary::Line => split_keeping_separator(text, "\n"),
            Boundary::Word => split_keeping_separator(text, " "),
            Boundary::Sentence => text.split_sentence_bounds().collect(),
            Boundary::Char => text
                .char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect(),
        }
    }

    /// Whether this boundary occurs in `text` at all
    fn occurs_in(&self, text: &str) -> bool {
        match self {
            Boundary::Paragraph => text.contains("\n\n"),
            Boundary::Line => text.contains('\n'),
            Boundary::Word => text.contains(' '),
            Boundary::Sentence => text.split_sentence_bounds().nth(1).is_some(),
            Boundary::Char => true,
        }
    }
}

/// Text chunker with configurable size and overlap, both in characters
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; overlap must be smaller than size
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split loaded documents into chunks, each tagged with its `start_index`
    pub fn split_documents(&self, documents: &[LoadedDocument]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for doc in documents {
            let mut index = 0usize;
            let mut previous_len = 0usize;

            for piece in self.split_text(&doc.content) {
                let offset = (index + previous_len).saturating_sub(self.chunk_overlap);
                index = find_from(&doc.content, &piece, offset).unwrap_or(offset);
                previous_len = char_len(&piece);

                let metadata = doc.metadata.clone().with_field("start_index", index);
                chunks.push(Chunk::new(piece, metadata));
            }
        }

        chunks
    }

    /// Split raw text into trimmed, non-empty chunks
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &BOUNDARIES)
    }

    fn split_recursive(&self, text: &str, boundaries: &[Boundary]) -> Vec<String> {
        let mut chunks = Vec::new();

        let (position, boundary) = boundaries
            .iter()
            .enumerate()
            .find(|(_, b)| b.occurs_in(text))
            .map(|(i, b)| (i, *b))
            .unwrap_or((boundaries.len().saturating_sub(1), Boundary::Char));
        let finer = boundaries.get(position + 1..).unwrap_or(&[]);

        let mut fitting: Vec<&str> = Vec::new();
        for piece in boundary.split(text) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }

            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }

        chunks
    }

    /// Greedily merge small pieces into windows of at most `chunk_size` characters
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut window: Vec<(&str, usize)> = Vec::new();
        let mut total = 0usize;
        let mut front = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }

                if front < window.len() {
                    push_joined(&mut merged, &window[front..]);

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        total -= window[front].1;
                        front += 1;
                    }
                }
            }

            window.push((*piece, len));
            total += len;
        }

        push_joined(&mut merged, &window[front..]);
        merged
    }
}

fn push_joined(out: &mut Vec<String>, window: &[(&str, usize)]) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Split at every occurrence of `separator`, attaching it to the following piece
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut last = 0;

    for (idx, _) in text.match_indices(separator) {
        if idx > last {
            pieces.push(&text[last..idx]);
        }
        last = idx;
    }
    if last < text.len() {
        pieces.push(&text[last..]);
    }

    pieces
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Character offset of `needle` in `haystack`, searching from character `from`
fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let byte_start = haystack
        .char_indices()
        .nth(from)
        .map(|(i, _)| i)
        .unwrap_or(haystack.len());

    haystack[byte_start..]
        .find(needle)
        .map(|byte_pos| from + char_len(&haystack[byte_start..byte_start + byte_pos]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use serde_json::json;

    fn alphabet_text(len: usize) -> String {
        (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect()
    }

    fn doc(content: String) -> LoadedDocument {
        LoadedDocument {
            content,
            metadata: ChunkMetadata::with_source("data/sample.txt"),
        }
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(TextChunker::new(100, 100).is_err());
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_1500_chars_make_two_overlapping_chunks() {
        let chunker = TextChunker::new(1000, 200).unwrap();
        let text = alphabet_text(1500);

        let chunks = chunker.split_documents(&[doc(text.clone())]);
        assert_eq!(chunks.len(), 2);

        assert_eq!(chunks[0].content.chars().count(), 1000);
        assert_eq!(chunks[0].metadata.get("start_index"), Some(&json!(0)));
        assert_eq!(chunks[1].metadata.get("start_index"), Some(&json!(800)));
        assert_eq!(chunks[1].content, text[800..]);
        assert_eq!(chunks[1].metadata.source(), Some("data/sample.txt"));
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let chunker = TextChunker::new(60, 10).unwrap();
        let text = "Oats are a whole grain.\n\nSugar adds sweetness to cereal.\n\nSalt should be limited.";

        let chunks = chunker.split_text(text);
        assert_eq!(
            chunks,
            vec![
                "Oats are a whole grain.\n\nSugar adds sweetness to cereal.",
                "Salt should be limited.",
            ]
        );
    }

    #[test]
    fn test_falls_back_to_words_for_long_lines() {
        let chunker = TextChunker::new(20, 5).unwrap();
        let text = "one two three four five six seven eight nine ten";

        let chunks = chunker.split_text(text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20, "chunk too long: {:?}", chunk);
            assert!(!chunk.starts_with(' ') && !chunk.ends_with(' '));
        }
        assert!(chunks[0].starts_with("one"));
        assert!(chunks.last().unwrap().ends_with("ten"));
    }

    #[test]
    fn test_no_chunk_exceeds_size_for_multibyte_text() {
        let chunker = TextChunker::new(50, 10).unwrap();
        let text = "Crème brûlée contient du sucre. ".repeat(20);

        let chunks = chunker.split_documents(&[doc(text.clone())]);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 50);
            let start = chunk.metadata.get("start_index").unwrap().as_u64().unwrap() as usize;
            let tail: String = text.chars().skip(start).collect();
            assert!(tail.starts_with(&chunk.content));
        }
    }

    #[test]
    fn test_empty_and_blank_text_yield_nothing() {
        let chunker = TextChunker::new(100, 20).unwrap();
        assert!(chunker.split_text("").is_empty());
        assert!(chunker.split_text(" \n\n \n").is_empty());
    }

    #[test]
    fn test_split_keeping_separator() {
        assert_eq!(
            split_keeping_separator("a\n\nb\n\n\n\nc", "\n\n"),
            vec!["a", "\n\nb", "\n\n", "\n\nc"]
        );
        assert_eq!(split_keeping_separator("\n\nx", "\n\n"), vec!["\n\nx"]);
    }
}
