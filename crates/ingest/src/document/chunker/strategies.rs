//! Chunking strategies: the structural pipeline, a paragraph baseline, and a
//! rayon pool that runs either across many documents.

use std::time::Instant;

use legis_core::config::{Config, IngestConfig};
use legis_core::Document;
use rayon::prelude::*;
use serde::Serialize;

use super::assembler::assemble;
use super::classifier::LineClassifier;
use super::error::{ChunkerError, Result};
use super::helpers::{char_len, merge_tiny, split_oversized};
use super::layout::analyze;
use super::rules::ClassifierRules;
use super::types::{Chunk, ChunkConfig, ChunkType};
use super::validator::finalize;

/// A pluggable chunking strategy. Implementations hold no per-call state, so
/// one instance serves every worker thread.
pub trait StructuralChunker: Send + Sync {
    fn name(&self) -> &'static str;

    /// Chunk one document. Never fails; a blank document yields no chunks.
    fn chunk(&self, doc: &Document) -> Vec<Chunk>;
}

// ── Heuristic strategy ──────────────────────────────────────────────────────

/// Line classification, structure tracking, greedy assembly and validation.
#[derive(Debug, Clone)]
pub struct HeuristicChunker {
    config: ChunkConfig,
    classifier: LineClassifier,
}

impl HeuristicChunker {
    pub fn new(config: ChunkConfig, rules: &ClassifierRules) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            classifier: LineClassifier::new(rules)?,
        })
    }

    /// Build from the env-driven workspace config, loading the rules file
    /// when `CHUNK_RULES_PATH` is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.chunking.validate()?;
        let rules = match &config.chunking.rules_path {
            Some(path) => ClassifierRules::from_file(path)?,
            None => ClassifierRules::default(),
        };
        Self::new(ChunkConfig::from(&config.chunking), &rules)
    }
}

impl StructuralChunker for HeuristicChunker {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn chunk(&self, doc: &Document) -> Vec<Chunk> {
        if doc.is_blank() {
            return Vec::new();
        }
        let layout = analyze(doc, &self.classifier, &self.config);
        let drafts = assemble(&layout, &self.config);
        finalize(&doc.id, &layout, drafts, &self.config)
    }
}

// ── Paragraph strategy ──────────────────────────────────────────────────────

/// Structure-blind baseline: each page is split at paragraphs, then
/// sentences, then words, and tiny fragments are folded into a neighbour.
#[derive(Debug, Clone, Default)]
pub struct ParagraphChunker {
    config: ChunkConfig,
}

impl ParagraphChunker {
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl StructuralChunker for ParagraphChunker {
    fn name(&self) -> &'static str {
        "paragraph"
    }

    fn chunk(&self, doc: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in &doc.pages {
            let pieces = split_oversized(&page.text, self.config.max_chunk_chars);
            for content in merge_tiny(pieces, self.config.min_chunk_chars) {
                let char_count = char_len(&content);
                let score = if char_count >= self.config.quality_length_threshold {
                    self.config.weights.length
                } else {
                    0.0
                };
                chunks.push(Chunk {
                    chunk_id: format!("{}_chunk_{}", doc.id, chunks.len()),
                    document_id: doc.id.to_string(),
                    content,
                    section_number: None,
                    section_title: None,
                    chunk_type: ChunkType::Plain,
                    list_items: Vec::new(),
                    cross_references: Vec::new(),
                    has_tables: false,
                    pages: vec![page.number],
                    char_count,
                    quality_score: score.clamp(0.0, 1.0),
                    quality_flags: Vec::new(),
                });
            }
        }
        chunks
    }
}

// ── Batch execution ─────────────────────────────────────────────────────────

/// Chunks of one document from a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkedDocument {
    pub document_id: String,
    pub filename: String,
    pub chunks: Vec<Chunk>,
}

/// Dedicated rayon pool for chunking document batches.
pub struct ChunkingPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl ChunkingPool {
    /// `workers == 0` uses one thread per CPU.
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("legis-chunk-{i}"))
            .build()
            .map_err(|e| ChunkerError::WorkerPool(e.to_string()))?;
        let workers = pool.current_num_threads();
        Ok(Self { pool, workers })
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        Self::new(config.workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Chunk every document in parallel. Output order matches `docs`.
    pub fn chunk_all(&self, chunker: &dyn StructuralChunker, docs: &[Document]) -> Vec<ChunkedDocument> {
        let started = Instant::now();
        let results: Vec<ChunkedDocument> = self.pool.install(|| {
            docs.par_iter()
                .map(|doc| ChunkedDocument {
                    document_id: doc.id.to_string(),
                    filename: doc.filename.clone(),
                    chunks: chunker.chunk(doc),
                })
                .collect()
        });
        tracing::info!(
            strategy = chunker.name(),
            documents = results.len(),
            chars = docs.iter().map(Document::total_chars).sum::<usize>(),
            chunks = results.iter().map(|r| r.chunks.len()).sum::<usize>(),
            workers = self.workers,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chunked document batch"
        );
        results
    }
}

impl std::fmt::Debug for ChunkingPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkingPool").field("workers", &self.workers).finish()
    }
}
