//! Knowledge-base construction from flattened document rows.
//!
//! The builder chunks every row with a fixed word-window configuration,
//! assigns globally increasing chunk ids across the entire multi-document
//! build, embeds each chunk through the collaborator, and unit-normalizes
//! the vectors. A collaborator error fails the whole build so a knowledge
//! base never ships with missing vectors; a chunk whose embedding comes back
//! empty is logged and skipped instead.

use crate::error::{Result, RetrieverError};
use crate::retrieval::knowledge_base::{ChunkMetadata, KnowledgeBase, VectorChunk, l2_normalize};
use futures::stream::{self, StreamExt, TryStreamExt};
use quill_ai_context::FlattenedRow;
use quill_ai_context::document::{flatten_pages, parse_extraction};
use quill_ai_context::text::{ChunkingConfig, clean_for_embedding};
use quill_ai_llm::provider::EmbeddingProvider;
use std::sync::Arc;

/// One source document's flattened rows, tagged with its identifier.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub source: String,
    pub rows: Vec<FlattenedRow>,
}

impl SourceDocument {
    pub fn new(source: impl Into<String>, rows: Vec<FlattenedRow>) -> Self {
        Self {
            source: source.into(),
            rows,
        }
    }

    /// Parse an extraction JSON file into flattened rows.
    pub fn from_extraction_json(source: impl Into<String>, json: &str) -> Result<Self> {
        let pages = parse_extraction(json)?;
        Ok(Self::new(source, flatten_pages(&pages)))
    }
}

/// Builds a knowledge base from source documents.
pub struct KnowledgeBaseBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    chunking: ChunkingConfig,
    concurrency: usize,
}

impl KnowledgeBaseBuilder {
    /// Create a builder with the default chunking windows (250 words,
    /// 50-word overlap) and sequential embedding calls.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            chunking: ChunkingConfig::default(),
            concurrency: 1,
        }
    }

    /// Override the chunking windows (builder style)
    pub fn with_chunking(self, chunking: ChunkingConfig) -> Self {
        Self { chunking, ..self }
    }

    /// Allow up to `concurrency` embedding calls in flight (builder style).
    ///
    /// Results are restored to chunk order by index regardless of completion
    /// time, so chunk ids and entry order stay stable.
    pub fn with_concurrency(self, concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            ..self
        }
    }

    /// Build a complete knowledge base from all documents.
    ///
    /// There is no partial output: an embedding collaborator error (after
    /// the provider's own retries) aborts the whole build.
    pub async fn build(&self, documents: &[SourceDocument]) -> Result<KnowledgeBase> {
        let pending = self.chunk_documents(documents);
        tracing::info!(
            "Embedding {} chunks from {} documents",
            pending.len(),
            documents.len()
        );

        let texts: Vec<String> = pending.iter().map(|(text, _)| text.clone()).collect();
        let embeddings: Vec<Vec<f32>> = stream::iter(texts)
            .map(|text| {
                let provider = Arc::clone(&self.provider);
                async move { provider.embed_text(&text).await }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
            .map_err(RetrieverError::embedding)?;

        let mut entries = Vec::with_capacity(pending.len());
        let mut skipped = 0usize;
        for ((chunk_text, metadata), embedding) in pending.into_iter().zip(embeddings) {
            if embedding.is_empty() {
                skipped += 1;
                tracing::warn!(
                    "Skipping chunk {} from {}: collaborator returned an empty vector",
                    metadata.chunk_id,
                    metadata.source
                );
                continue;
            }
            let norm_embedding = l2_normalize(&embedding);
            entries.push(VectorChunk {
                chunk_text,
                metadata,
                embedding,
                norm_embedding,
            });
        }

        if skipped > 0 {
            tracing::warn!("Skipped {skipped} chunks with malformed embeddings");
        }

        KnowledgeBase::new(entries)
    }

    /// Chunk every row of every document, assigning global chunk ids.
    fn chunk_documents(&self, documents: &[SourceDocument]) -> Vec<(String, ChunkMetadata)> {
        let mut pending = Vec::new();
        let mut chunk_id: i64 = 0;

        for document in documents {
            for row in &document.rows {
                for chunk in self.chunking.chunk(&row.context) {
                    let chunk_text = clean_for_embedding(&chunk);
                    if chunk_text.is_empty() {
                        continue;
                    }
                    pending.push((
                        chunk_text,
                        ChunkMetadata {
                            chunk_id,
                            topic: row.keyword.clone(),
                            source: document.source.clone(),
                            page: row.page_number,
                        },
                    ));
                    chunk_id += 1;
                }
            }
        }

        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::test_support::TableEmbeddingProvider;
    use async_trait::async_trait;

    fn row(context: &str, keyword: &str, page: i64) -> FlattenedRow {
        FlattenedRow {
            context: context.to_string(),
            keyword: keyword.to_string(),
            page_number: page,
        }
    }

    #[tokio::test]
    async fn test_build_assigns_global_chunk_ids() {
        let provider = Arc::new(TableEmbeddingProvider::new(&[
            ("first policy text", vec![1.0, 0.0]),
            ("second policy text", vec![0.0, 1.0]),
            ("third policy text", vec![1.0, 1.0]),
        ]));
        let builder = KnowledgeBaseBuilder::new(provider);

        let documents = vec![
            SourceDocument::new(
                "manual_a",
                vec![
                    row("first policy text", "Approvals", 1),
                    row("second policy text", "Budgets", 2),
                ],
            ),
            SourceDocument::new("manual_b", vec![row("third policy text", "Audits", 1)]),
        ];

        let kb = builder.build(&documents).await.unwrap();
        assert_eq!(kb.len(), 3);

        // chunk_id is global across documents, never reset.
        let ids: Vec<i64> = kb.entries().iter().map(|e| e.metadata.chunk_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(kb.entries()[2].metadata.source, "manual_b");
        assert_eq!(kb.entries()[2].metadata.topic, "Audits");
    }

    #[tokio::test]
    async fn test_build_normalizes_embeddings() {
        let provider = Arc::new(TableEmbeddingProvider::new(&[(
            "some policy text",
            vec![3.0, 4.0],
        )]));
        let builder = KnowledgeBaseBuilder::new(provider);
        let documents = vec![SourceDocument::new(
            "doc",
            vec![row("some policy text", "General", 1)],
        )];

        let kb = builder.build(&documents).await.unwrap();
        let entry = &kb.entries()[0];
        assert_eq!(entry.embedding, vec![3.0, 4.0]);
        let norm: f32 = entry.norm_embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_build_fails_whole_build_on_collaborator_error() {
        // Second chunk has no registered embedding, which the table provider
        // reports as a collaborator error.
        let provider = Arc::new(TableEmbeddingProvider::new(&[("known text", vec![1.0])]));
        let builder = KnowledgeBaseBuilder::new(provider);
        let documents = vec![SourceDocument::new(
            "doc",
            vec![row("known text", "A", 1), row("unknown text", "B", 2)],
        )];

        let err = builder.build(&documents).await.unwrap_err();
        assert!(matches!(err, RetrieverError::Embedding { .. }));
    }

    #[tokio::test]
    async fn test_build_skips_empty_vectors() {
        struct EmptyForSecond;

        #[async_trait]
        impl quill_ai_llm::provider::EmbeddingProvider for EmptyForSecond {
            async fn embed_text(&self, text: &str) -> quill_ai_llm::Result<Vec<f32>> {
                if text.contains("second") {
                    Ok(vec![])
                } else {
                    Ok(vec![1.0, 0.0])
                }
            }

            fn embedding_dimension(&self) -> usize {
                2
            }

            fn provider_name(&self) -> &str {
                "empty-for-second"
            }
        }

        let builder = KnowledgeBaseBuilder::new(Arc::new(EmptyForSecond));
        let documents = vec![SourceDocument::new(
            "doc",
            vec![row("first text", "A", 1), row("second text", "B", 2)],
        )];

        let kb = builder.build(&documents).await.unwrap();
        assert_eq!(kb.len(), 1);
        assert_eq!(kb.entries()[0].metadata.topic, "A");
    }

    #[tokio::test]
    async fn test_bounded_fanout_preserves_order() {
        let words: Vec<String> = (0..20).map(|i| format!("text{i}")).collect();
        let table: Vec<(&str, Vec<f32>)> = words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.as_str(), vec![i as f32, 1.0]))
            .collect();
        let provider = Arc::new(TableEmbeddingProvider::new(&table));
        assert_eq!(provider.embedding_dimension(), 2);

        let rows: Vec<FlattenedRow> = words.iter().map(|w| row(w, "General", 1)).collect();
        let builder = KnowledgeBaseBuilder::new(provider).with_concurrency(8);
        let kb = builder
            .build(&[SourceDocument::new("doc", rows)])
            .await
            .unwrap();

        // Order restored by index, not completion time.
        for (i, entry) in kb.entries().iter().enumerate() {
            assert_eq!(entry.metadata.chunk_id, i as i64);
            assert_eq!(entry.embedding[0], i as f32);
        }
    }

    #[tokio::test]
    async fn test_from_extraction_json() {
        let json = r#"[
            {"page_number": 1, "extracted_data": [{"Policy": "Approvals need two signatures."}]}
        ]"#;
        let document = SourceDocument::from_extraction_json("manual", json).unwrap();
        assert_eq!(document.rows.len(), 1);
        assert_eq!(document.rows[0].keyword, "Policy");
    }
}
