//! Persistence for knowledge bases, retrieval results, and answers.
//!
//! The knowledge base is a row-oriented CSV table with columns
//! `chunk_text, metadata, embedding, norm_embedding`, where the last three
//! hold JSON-encoded values. Vectors round-trip exactly: decoding a
//! persisted embedding reproduces the original values to floating-point
//! equality. Retrieval results and generated answers are pretty-printed
//! JSON arrays.
//!
//! Loads are schema-validated; a malformed file surfaces as a descriptive
//! [`RetrieverError::CorruptKnowledgeBase`], never a raw parse panic.

use crate::error::{Result, RetrieverError};
use crate::retrieval::knowledge_base::{ChunkMetadata, KnowledgeBase, VectorChunk};
use crate::retrieval::retriever::RetrievalResult;
use crate::synthesis::GeneratedAnswer;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One CSV row of the persisted knowledge base. The inner columns are
/// JSON-encoded strings so the table stays flat and readable.
#[derive(Debug, Serialize, Deserialize)]
struct KbRecord {
    chunk_text: String,
    metadata: String,
    embedding: String,
    norm_embedding: String,
}

/// Persist a knowledge base to a CSV file.
pub fn save_knowledge_base(kb: &KnowledgeBase, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for entry in kb.entries() {
        writer.serialize(KbRecord {
            chunk_text: entry.chunk_text.clone(),
            metadata: serde_json::to_string(&entry.metadata)?,
            embedding: serde_json::to_string(&entry.embedding)?,
            norm_embedding: serde_json::to_string(&entry.norm_embedding)?,
        })?;
    }
    writer.flush()?;
    tracing::info!("Saved {} knowledge-base entries to {}", kb.len(), path.display());
    Ok(())
}

/// Load and validate a knowledge base from a CSV file.
pub fn load_knowledge_base(path: &Path) -> Result<KnowledgeBase> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        RetrieverError::corrupt_knowledge_base(format!("cannot open {}: {e}", path.display()))
    })?;

    let mut entries = Vec::new();
    for (row, record) in reader.deserialize::<KbRecord>().enumerate() {
        let record = record.map_err(|e| {
            RetrieverError::corrupt_knowledge_base(format!("row {row}: invalid CSV record: {e}"))
        })?;

        let metadata: ChunkMetadata = serde_json::from_str(&record.metadata).map_err(|e| {
            RetrieverError::corrupt_knowledge_base(format!("row {row}: invalid metadata: {e}"))
        })?;
        let embedding: Vec<f32> = serde_json::from_str(&record.embedding).map_err(|e| {
            RetrieverError::corrupt_knowledge_base(format!("row {row}: invalid embedding: {e}"))
        })?;
        let norm_embedding: Vec<f32> =
            serde_json::from_str(&record.norm_embedding).map_err(|e| {
                RetrieverError::corrupt_knowledge_base(format!(
                    "row {row}: invalid norm_embedding: {e}"
                ))
            })?;

        entries.push(VectorChunk {
            chunk_text: record.chunk_text,
            metadata,
            embedding,
            norm_embedding,
        });
    }

    // Dimension and non-emptiness invariants are enforced here too, so a
    // hand-edited file cannot reach retrieval half-valid.
    KnowledgeBase::new(entries)
}

/// Persist retrieval results as a pretty JSON array.
pub fn save_results(results: &[RetrievalResult], path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(results)?)?;
    Ok(())
}

/// Load retrieval results from a JSON file.
pub fn load_results(path: &Path) -> Result<Vec<RetrievalResult>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

/// Persist generated answers as a pretty JSON array.
pub fn save_answers(answers: &[GeneratedAnswer], path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(answers)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::knowledge_base::l2_normalize;
    use crate::retrieval::retriever::RetrievedContext;
    use tempfile::tempdir;

    fn sample_kb() -> KnowledgeBase {
        let embeddings = [
            vec![0.1f32, -0.7, 3.0],
            vec![1.0f32, 0.333_333_34, -0.000_001],
        ];
        let entries = embeddings
            .iter()
            .enumerate()
            .map(|(i, embedding)| VectorChunk {
                chunk_text: format!("chunk text {i}"),
                metadata: ChunkMetadata {
                    chunk_id: i as i64,
                    topic: "Approvals".to_string(),
                    source: "manual".to_string(),
                    page: 1,
                },
                embedding: embedding.clone(),
                norm_embedding: l2_normalize(embedding),
            })
            .collect();
        KnowledgeBase::new(entries).unwrap()
    }

    #[test]
    fn test_knowledge_base_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectorized_kb.csv");
        let kb = sample_kb();

        save_knowledge_base(&kb, &path).unwrap();
        let loaded = load_knowledge_base(&path).unwrap();

        // Vectors reproduce to floating-point equality, chunk ids stay
        // unique and in order.
        assert_eq!(loaded, kb);
        let ids: Vec<i64> = loaded
            .entries()
            .iter()
            .map(|e| e.metadata.chunk_id)
            .collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.csv");
        fs::write(
            &path,
            "chunk_text,metadata,embedding,norm_embedding\nhello,not-json,[1.0],[1.0]\n",
        )
        .unwrap();

        let err = load_knowledge_base(&path).unwrap_err();
        assert!(matches!(err, RetrieverError::CorruptKnowledgeBase { .. }));
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn test_load_missing_file_is_corrupt_error() {
        let err = load_knowledge_base(Path::new("/nonexistent/kb.csv")).unwrap_err();
        assert!(matches!(err, RetrieverError::CorruptKnowledgeBase { .. }));
    }

    #[test]
    fn test_results_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("query_results.json");
        let results = vec![RetrievalResult {
            question: "Who signs off?".to_string(),
            retrieved_context: vec![RetrievedContext {
                score: 0.87,
                context: "Two signatures are required.".to_string(),
                source: "manual".to_string(),
                section: "Approvals".to_string(),
                page: 3,
            }],
        }];

        save_results(&results, &path).unwrap();
        let loaded = load_results(&path).unwrap();
        assert_eq!(loaded, results);
    }
}
