//! Query request types

use serde::{Deserialize, Serialize};

/// Query request for the RAG pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub query: String,

    /// Number of chunks used for the answer (default: 3)
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_defaults_to_three() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"query": "Which products are vegan?"}"#).unwrap();
        assert_eq!(request.top_k, 3);

        let request: QueryRequest =
            serde_json::from_str(r#"{"query": "sugar", "top_k": 5}"#).unwrap();
        assert_eq!(request.top_k, 5);
    }
}
