//! Knowledge-base entry types and validation.
//!
//! A knowledge base is an ordered collection of vectorized chunks. Insertion
//! order does not affect retrieval correctness but is retained for
//! reproducible tie-breaking, so entries are kept in the exact order the
//! build produced them. A knowledge base is read-only once built; rebuilding
//! replaces it wholesale.

use crate::error::{Result, RetrieverError};
use serde::{Deserialize, Serialize};

/// Provenance metadata attached to every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Globally unique, strictly increasing across the whole multi-document
    /// build; never reset per document, so it serves as a stable external key.
    pub chunk_id: i64,
    /// Section heading the chunk came from, or "General".
    pub topic: String,
    /// Source document identifier.
    pub source: String,
    /// 1-based page number, or -1 when unknown.
    pub page: i64,
}

/// A chunk plus its embedding and unit-normalized copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorChunk {
    pub chunk_text: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
    pub norm_embedding: Vec<f32>,
}

/// Ordered, dimension-consistent collection of vectorized chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase {
    entries: Vec<VectorChunk>,
}

impl KnowledgeBase {
    /// Assemble a knowledge base, rejecting inconsistent entries up front.
    ///
    /// Every entry must carry a non-empty chunk text and an embedding of the
    /// same dimensionality as the first entry; anything else is a
    /// [`RetrieverError::CorruptKnowledgeBase`] so retrieval never runs
    /// against a half-valid collection.
    pub fn new(entries: Vec<VectorChunk>) -> Result<Self> {
        if let Some(first) = entries.first() {
            let dimension = first.embedding.len();
            if dimension == 0 {
                return Err(RetrieverError::corrupt_knowledge_base(
                    "first entry has an empty embedding",
                ));
            }
            for (i, entry) in entries.iter().enumerate() {
                if entry.chunk_text.trim().is_empty() {
                    return Err(RetrieverError::corrupt_knowledge_base(format!(
                        "entry {i} (chunk_id {}) has empty chunk text",
                        entry.metadata.chunk_id
                    )));
                }
                if entry.embedding.len() != dimension {
                    return Err(RetrieverError::corrupt_knowledge_base(format!(
                        "entry {i} (chunk_id {}) has embedding dimension {}, expected {dimension}",
                        entry.metadata.chunk_id,
                        entry.embedding.len()
                    )));
                }
                if entry.norm_embedding.len() != dimension {
                    return Err(RetrieverError::corrupt_knowledge_base(format!(
                        "entry {i} (chunk_id {}) has norm_embedding dimension {}, expected {dimension}",
                        entry.metadata.chunk_id,
                        entry.norm_embedding.len()
                    )));
                }
            }
        }
        Ok(Self { entries })
    }

    /// Entries in build order.
    pub fn entries(&self) -> &[VectorChunk] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shared embedding dimensionality, or None for an empty knowledge base.
    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|e| e.embedding.len())
    }

    /// Distinct source document identifiers, in first-seen order.
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !sources.contains(&entry.metadata.source.as_str()) {
                sources.push(&entry.metadata.source);
            }
        }
        sources
    }
}

/// Unit-normalize a vector by its L2 norm. A zero vector stays all zeros
/// rather than dividing by zero.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
