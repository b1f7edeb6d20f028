pub mod document;
pub mod error;
pub mod text;

// Re-export the main chunking types for external use
pub use document::{FlattenedRow, PageRecord, Section, flatten_pages};
pub use error::ContextError;
pub use text::{ChunkingConfig, DEFAULT_MAX_WORDS, DEFAULT_OVERLAP, clean_for_embedding};
