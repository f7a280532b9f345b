//! Prompt templates for grounded answer generation

use crate::types::Chunk;

/// Returned when retrieval produced no chunks
pub const NO_CONTEXT_MESSAGE: &str =
    "I couldn't find any relevant information in the knowledge base for your query.";

/// Prefix of the listing returned when a chunk cannot be attributed
pub const INCOMPLETE_GROUNDING_PREFIX: &str =
    "Some sources were not found for the retrieved documents. Here are the top documents:\n\n";

/// Stand-in for a missing source in the listing
pub const MISSING_SOURCE_PLACEHOLDER: &str = "Source not available";

/// Prefix of the answer returned when completion fails
pub const GENERATION_ERROR_PREFIX: &str = "An error occurred while generating response: ";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the context block, one `Source`/`Content` pair per chunk in input order
    pub fn build_context(chunks: &[Chunk]) -> String {
        let mut context = String::new();

        for chunk in chunks {
            context.push_str(&format!(
                "Source: {}\nContent: {}\n\n",
                chunk.metadata.source().unwrap_or("N/A"),
                chunk.content
            ));
        }

        context
    }

    /// Build the full RAG prompt
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            "Answer the question based only on the following context. \
For each piece of information you use, you must cite the source.\n\n\
Context:\n{context}\n\n\
Question: {question}\n\n\
Answer:\n",
            context = context,
            question = question,
        )
    }

    /// List chunks verbatim when grounding is incomplete
    pub fn build_unattributed_listing(chunks: &[Chunk]) -> String {
        let documents: Vec<String> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                format!(
                    "Document {} (Source: {}):\nContent: {}\n",
                    i + 1,
                    chunk.metadata.source().unwrap_or(MISSING_SOURCE_PLACEHOLDER),
                    chunk.content
                )
            })
            .collect();

        format!("{}{}", INCOMPLETE_GROUNDING_PREFIX, documents.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;

    #[test]
    fn test_context_keeps_input_order() {
        let chunks = vec![
            Chunk::new("Oats contain fibre.", ChunkMetadata::with_source("a.txt")),
            Chunk::new("Honey is sugar.", ChunkMetadata::with_source("b.pdf")),
        ];

        assert_eq!(
            PromptBuilder::build_context(&chunks),
            "Source: a.txt\nContent: Oats contain fibre.\n\nSource: b.pdf\nContent: Honey is sugar.\n\n"
        );
    }

    #[test]
    fn test_prompt_contains_context_and_question() {
        let prompt = PromptBuilder::build_rag_prompt("Is honey vegan?", "Source: b.pdf\n");
        assert!(prompt.starts_with("Answer the question based only on the following context."));
        assert!(prompt.contains("you must cite the source"));
        assert!(prompt.contains("Context:\nSource: b.pdf\n"));
        assert!(prompt.contains("Question: Is honey vegan?"));
        assert!(prompt.trim_end().ends_with("Answer:"));
    }

    #[test]
    fn test_unattributed_listing_format() {
        let chunks = vec![
            Chunk::new("first", ChunkMetadata::with_source("a.txt")),
            Chunk::new("second", ChunkMetadata::default()),
        ];

        assert_eq!(
            PromptBuilder::build_unattributed_listing(&chunks),
            "Some sources were not found for the retrieved documents. Here are the top documents:\n\n\
Document 1 (Source: a.txt):\nContent: first\n\n\
Document 2 (Source: Source not available):\nContent: second\n"
        );
    }
}
