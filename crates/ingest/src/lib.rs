//! Structural chunking of long legal documents.
//!
//! Turns page-tagged extracted text into retrieval-sized chunks that never cut
//! through a list, a table, or (when it fits) a section, and tags every chunk
//! with its enclosing section, list hierarchy, tables and cross-references.

pub mod document;

pub use document::chunker::{
    Chunk, ChunkConfig, ChunkType, ChunkedDocument, ChunkerError, ChunkingPool, ClassifierRules,
    HeuristicChunker, ListItem, ListType, ParagraphChunker, QualityFlag, StructuralChunker,
};
pub use document::{extract_file, extract_text, ExtractedDocument, ExtractionError};
