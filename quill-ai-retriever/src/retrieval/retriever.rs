//! Similarity-ranked retrieval with fixed top-K or adaptive top-P selection.
//!
//! Each query is embedded through the collaborator, scored against every
//! knowledge-base entry by cosine similarity, and a context set is selected
//! by one of two policies:
//!
//! - **Fixed-K**: the first `k` ranked entries (fewer if the knowledge base
//!   is smaller).
//! - **Adaptive cumulative-mass (top-P)**: entries are taken in rank order
//!   until their cumulative score reaches `top_p` of the total score mass.
//!   A peaky score distribution (one dominant match) yields a short context
//!   set; a flat distribution yields a long one.
//!
//! The top-P denominator sums *all* similarity scores, negatives included.
//! With negative similarities present this can make the effective cutoff
//! behave non-monotonically in `top_p`; the behavior is kept as documented,
//! with `positive_mass_only` available to sum only non-negative scores.

use crate::error::{Result, RetrieverError};
use crate::retrieval::knowledge_base::KnowledgeBase;
use quill_ai_llm::provider::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default cumulative-mass threshold for adaptive selection.
pub const DEFAULT_TOP_P: f32 = 0.9;

/// How many ranked entries make it into the context set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionPolicy {
    /// Select the first `k` ranked entries.
    TopK(usize),
    /// Select entries until cumulative score mass reaches `top_p` of the
    /// total. `positive_mass_only` restricts the denominator to
    /// non-negative scores.
    TopP { top_p: f32, positive_mass_only: bool },
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::TopP {
            top_p: DEFAULT_TOP_P,
            positive_mass_only: false,
        }
    }
}

impl SelectionPolicy {
    /// Adaptive selection with the given threshold and the documented
    /// all-scores denominator.
    pub fn top_p(top_p: f32) -> Self {
        Self::TopP {
            top_p,
            positive_mass_only: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::TopK(0) => Err(RetrieverError::configuration(
                "top_k must be greater than zero",
            )),
            Self::TopP { top_p, .. } if !(*top_p > 0.0 && *top_p <= 1.0) => Err(
                RetrieverError::configuration(format!("top_p must be in (0, 1], got {top_p}")),
            ),
            _ => Ok(()),
        }
    }
}

/// One selected knowledge-base entry, projected for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub score: f32,
    pub context: String,
    pub source: String,
    pub section: String,
    pub page: i64,
}

/// The ranked context set for one question, descending by score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub question: String,
    pub retrieved_context: Vec<RetrievedContext>,
}

/// Cosine similarity: dot product over the product of L2 norms, defined as
/// 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Rank entry indices by descending score, ties broken by ascending
/// knowledge-base index for a stable, reproducible order.
fn rank_indices(scores: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then_with(|| a.cmp(&b)));
    indices
}

/// Apply a selection policy to ranked scores, returning selected entry
/// indices in rank order.
pub fn select_indices(scores: &[f32], policy: SelectionPolicy) -> Vec<usize> {
    let ranked = rank_indices(scores);
    if ranked.is_empty() {
        return ranked;
    }

    match policy {
        SelectionPolicy::TopK(k) => ranked.into_iter().take(k).collect(),
        SelectionPolicy::TopP {
            top_p,
            positive_mass_only,
        } => {
            let total: f32 = if positive_mass_only {
                scores.iter().filter(|s| **s > 0.0).sum()
            } else {
                scores.iter().sum()
            };

            // Degenerate distribution (all zero or non-positive): take
            // exactly the top entry instead of everything or nothing.
            if total <= 0.0 {
                return vec![ranked[0]];
            }

            let mut cumulative = 0.0f32;
            let mut selected = Vec::new();
            for idx in ranked {
                cumulative += scores[idx];
                selected.push(idx);
                if cumulative >= top_p * total {
                    break;
                }
            }
            selected
        }
    }
}

/// Retrieves context sets from a read-only knowledge base.
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    policy: SelectionPolicy,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, policy: SelectionPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { provider, policy })
    }

    /// Retrieve the context set for a single question.
    pub async fn retrieve_one(
        &self,
        question: &str,
        kb: &KnowledgeBase,
    ) -> Result<RetrievalResult> {
        let query = self
            .provider
            .embed_text(question)
            .await
            .map_err(RetrieverError::embedding)?;

        if let Some(dimension) = kb.dimension() {
            if query.len() != dimension {
                return Err(RetrieverError::DimensionMismatch {
                    expected: dimension,
                    actual: query.len(),
                });
            }
        }

        let scores: Vec<f32> = kb
            .entries()
            .iter()
            .map(|entry| cosine_similarity(&query, &entry.embedding))
            .collect();

        let retrieved_context = select_indices(&scores, self.policy)
            .into_iter()
            .map(|idx| {
                let entry = &kb.entries()[idx];
                RetrievedContext {
                    score: scores[idx],
                    context: entry.chunk_text.clone(),
                    source: entry.metadata.source.clone(),
                    section: entry.metadata.topic.clone(),
                    page: entry.metadata.page,
                }
            })
            .collect();

        Ok(RetrievalResult {
            question: question.to_string(),
            retrieved_context,
        })
    }

    /// Retrieve context sets for a batch of questions.
    ///
    /// A collaborator failure is fatal to that query only: the failed
    /// question is logged and omitted, and the batch keeps going.
    pub async fn retrieve(&self, questions: &[String], kb: &KnowledgeBase) -> Vec<RetrievalResult> {
        let mut results = Vec::with_capacity(questions.len());
        for question in questions {
            match self.retrieve_one(question, kb).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Dropping query {question:?} from batch: {e}");
                }
            }
        }
        results
    }
}
