//! Structural chunking engine.
//!
//! One ordered pass classifies every line and feeds three state machines
//! (sections, list hierarchy, table boundaries). A greedy assembler then packs
//! headings, paragraphs and atomic list/table blocks into chunks, and a
//! validator re-splits, merges, renders and scores them.

mod assembler;
pub mod classifier;
mod error;
mod helpers;
mod layout;
mod lists;
pub mod rules;
mod sections;
mod strategies;
mod tables;
mod types;
mod validator;

pub use classifier::{LineClassifier, LineKind};
pub use error::{ChunkerError, Result};
pub use rules::{ClassifierRules, FooterPattern};
pub use strategies::{ChunkedDocument, ChunkingPool, HeuristicChunker, ParagraphChunker, StructuralChunker};
pub use types::{Chunk, ChunkConfig, ChunkType, ListItem, ListType, QualityFlag, QualityWeights};
