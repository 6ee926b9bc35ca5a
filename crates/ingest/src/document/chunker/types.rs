//! Chunk configuration and output types.

use legis_core::config::ChunkingConfig;
use serde::Serialize;

use super::classifier::NumberKind;
use super::error::{ChunkerError, Result};

// ── Configuration ───────────────────────────────────────────────────────────

/// Rubric weights behind `Chunk::quality_score`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityWeights {
    pub section: f32,
    pub list: f32,
    pub table: f32,
    pub length: f32,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            section: 0.3,
            list: 0.2,
            table: 0.2,
            length: 0.3,
        }
    }
}

/// Configuration for the structural chunking engine. All sizes are in characters.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Minimum chunk size — smaller chunks keep accumulating (default: 200).
    pub min_chunk_chars: usize,
    /// Soft maximum — prose never pushes a chunk past it (default: 1500).
    pub max_chunk_chars: usize,
    /// Atomic lists/tables may overflow up to this size (default: 3000).
    pub hard_ceiling_chars: usize,
    /// Ceiling multiplier for table-bearing chunks (default: 2.0).
    pub table_ceiling_factor: f64,
    /// Below this a chunk is degenerate (default: 40).
    pub min_meaningful_chars: usize,
    /// Chunks at least this long earn the length weight (default: 300).
    pub quality_length_threshold: usize,
    /// Fallback re-split threshold, as a share of `total_chars / max_chunk_chars`.
    pub fallback_min_ratio: f64,
    pub weights: QualityWeights,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::from(&ChunkingConfig::default())
    }
}

impl From<&ChunkingConfig> for ChunkConfig {
    fn from(c: &ChunkingConfig) -> Self {
        Self {
            min_chunk_chars: c.min_chunk_chars,
            max_chunk_chars: c.max_chunk_chars,
            hard_ceiling_chars: c.hard_ceiling_chars,
            table_ceiling_factor: c.table_ceiling_factor,
            min_meaningful_chars: c.min_meaningful_chars,
            quality_length_threshold: 300,
            fallback_min_ratio: c.fallback_min_ratio,
            weights: QualityWeights::default(),
        }
    }
}

impl ChunkConfig {
    /// Convenience constructor for the three size knobs; the rest stay default.
    pub fn with_sizes(min: usize, max: usize, ceiling: usize) -> Self {
        Self {
            min_chunk_chars: min,
            max_chunk_chars: max,
            hard_ceiling_chars: ceiling,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_chunk_chars == 0 || self.min_chunk_chars > self.max_chunk_chars {
            return Err(ChunkerError::InvalidConfig(format!(
                "min_chunk_chars ({}) must be in 1..=max_chunk_chars ({})",
                self.min_chunk_chars, self.max_chunk_chars
            )));
        }
        if self.max_chunk_chars > self.hard_ceiling_chars {
            return Err(ChunkerError::InvalidConfig(format!(
                "max_chunk_chars ({}) exceeds hard_ceiling_chars ({})",
                self.max_chunk_chars, self.hard_ceiling_chars
            )));
        }
        if !(self.table_ceiling_factor >= 1.0) {
            return Err(ChunkerError::InvalidConfig(
                "table_ceiling_factor must be at least 1.0".into(),
            ));
        }
        if self.min_meaningful_chars > self.min_chunk_chars {
            return Err(ChunkerError::InvalidConfig(format!(
                "min_meaningful_chars ({}) exceeds min_chunk_chars ({})",
                self.min_meaningful_chars, self.min_chunk_chars
            )));
        }
        if !(0.0..=1.0).contains(&self.fallback_min_ratio) {
            return Err(ChunkerError::InvalidConfig(
                "fallback_min_ratio must be within 0.0..=1.0".into(),
            ));
        }
        let w = self.weights;
        if [w.section, w.list, w.table, w.length].iter().any(|v| *v < 0.0) {
            return Err(ChunkerError::InvalidConfig("quality weights must be non-negative".into()));
        }
        Ok(())
    }

    /// Ceiling for a chunk, raised when it carries a table.
    pub fn ceiling(&self, has_table: bool) -> usize {
        if has_table {
            (self.hard_ceiling_chars as f64 * self.table_ceiling_factor) as usize
        } else {
            self.hard_ceiling_chars
        }
    }
}

// ── Chunk output ────────────────────────────────────────────────────────────

/// Derived shape of a chunk's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Plain,
    CompleteList,
    Table,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    Ordered,
    Unordered,
}

/// Policy decisions the assembler or validator applied to a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// An atomic block pushed the chunk past `max_chunk_chars`.
    AtomicOverflow,
    /// An atomic block above its ceiling was cut at item/row boundaries.
    ForcedSplit,
    /// Produced by the low-chunk-count fallback re-split.
    FallbackSplit,
    /// Below `min_meaningful_chars` with no neighbour to merge into.
    TooShort,
}

/// A list item with its owned subtree, as handed to the indexer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    /// Marker label without punctuation ("1", "a", "iv", "2.1", "•").
    pub number: String,
    #[serde(skip)]
    pub marker_kind: NumberKind,
    pub text: String,
    pub list_type: ListType,
    pub hierarchy_level: usize,
    /// First and last line index covered by this item's own text.
    #[serde(skip)]
    pub line_span: (usize, usize),
    pub children: Vec<ListItem>,
}

impl ListItem {
    /// Number of items in this subtree, including itself.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(ListItem::subtree_len).sum::<usize>()
    }
}

/// A chunk of document text with structural metadata for retrieval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// `<document_id>_chunk_<n>`, 0-based in emission order.
    pub chunk_id: String,
    pub document_id: String,
    pub content: String,
    pub section_number: Option<String>,
    pub section_title: Option<String>,
    pub chunk_type: ChunkType,
    /// Root items only; each owns its subtree.
    pub list_items: Vec<ListItem>,
    pub cross_references: Vec<String>,
    pub has_tables: bool,
    pub pages: Vec<u32>,
    pub char_count: usize,
    pub quality_score: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub quality_flags: Vec<QualityFlag>,
}

impl Chunk {
    pub fn has_flag(&self, flag: QualityFlag) -> bool {
        self.quality_flags.contains(&flag)
    }

    /// True when an atomic block forced this chunk outside the normal size bounds.
    pub fn is_atomic_overflow(&self) -> bool {
        self.has_flag(QualityFlag::AtomicOverflow) || self.has_flag(QualityFlag::ForcedSplit)
    }
}
