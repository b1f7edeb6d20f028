//! quill-ai-retriever: Document question-answering over a vectorized knowledge base
//!
//! This crate turns extracted document text into a searchable knowledge base
//! of embedded chunks and answers natural-language questions against it. The
//! extractor output (heading-keyed JSON per page) is flattened and chunked by
//! `quill-ai-context`; embeddings and chat completions come from the
//! collaborator traits in `quill-ai-llm`.
//!
//! ## Key Modules
//!
//! - **[`retrieval`]**: Knowledge-base building and similarity-ranked
//!   retrieval with fixed top-K or adaptive cumulative-mass (top-P) selection
//! - **[`synthesis`]**: Grounding-prompt assembly and answer generation with
//!   a partial-failure policy for batch jobs
//! - **[`storage`]**: CSV/JSON persistence for knowledge bases, retrieval
//!   results, and generated answers
//!
//! ## Architecture
//!
//! ```text
//! Extraction JSON → FlattenedRows → Chunks → Embeddings → KnowledgeBase (CSV)
//!                                                              ↓
//!                       Answers ← ChatProvider ← Prompt ← Retriever ← Queries
//! ```

pub mod error;
pub mod retrieval;
pub mod storage;
pub mod synthesis;

pub use error::RetrieverError;
