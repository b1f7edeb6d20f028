pub mod builder;
pub mod knowledge_base;
pub mod retriever;

pub use builder::{KnowledgeBaseBuilder, SourceDocument};
pub use knowledge_base::{ChunkMetadata, KnowledgeBase, VectorChunk, l2_normalize};
pub use retriever::{RetrievalResult, RetrievedContext, Retriever, SelectionPolicy};

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use quill_ai_llm::provider::EmbeddingProvider;
    use quill_ai_llm::{LlmError, Result};
    use std::collections::HashMap;

    /// Embedding provider backed by a fixed text-to-vector table.
    ///
    /// Unknown texts fail the way a collaborator outage would, so tests can
    /// exercise both the happy path and the failure policies.
    pub struct TableEmbeddingProvider {
        vectors: HashMap<String, Vec<f32>>,
        dimension: usize,
    }

    impl TableEmbeddingProvider {
        pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
            let dimension = entries.first().map(|(_, v)| v.len()).unwrap_or(0);
            Self {
                vectors: entries
                    .iter()
                    .map(|(text, v)| (text.to_string(), v.clone()))
                    .collect(),
                dimension,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for TableEmbeddingProvider {
        async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
            self.vectors.get(text).cloned().ok_or_else(|| {
                LlmError::malformed_response(format!("no embedding registered for: {text}"))
            })
        }

        fn embedding_dimension(&self) -> usize {
            self.dimension
        }

        fn provider_name(&self) -> &str {
            "table"
        }
    }
}
