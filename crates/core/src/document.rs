use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable, collision-resistant identity of one ingested document.
///
/// Downstream indexers key their per-document write lock on this value, so two
/// uploads of a same-named file never share an id unless every input matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Derive the id from file metadata and the ingest timestamp.
    pub fn derive(source: &SourceInfo) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.filename.as_bytes());
        hasher.update([0u8]);
        hasher.update(source.size_bytes.to_le_bytes());
        hasher.update([0u8]);
        if let Some(mtime) = source.modified_at {
            hasher.update(mtime.to_rfc3339().as_bytes());
        }
        hasher.update([0u8]);
        hasher.update(source.ingested_at.to_rfc3339().as_bytes());
        Self::from_digest(&hasher.finalize())
    }

    /// Derive the id from the filename and full text when no file metadata exists.
    pub fn from_content(filename: &str, text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(filename.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        Self::from_digest(&hasher.finalize())
    }

    fn from_digest(digest: &[u8]) -> Self {
        let hex: String = digest[..16].iter().map(|b| format!("{b:02x}")).collect();
        DocumentId(format!("doc_{hex}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// File-level facts the ingestion service knows about an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub ingested_at: DateTime<Utc>,
}

/// One page of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
    /// Table blocks already detected by the extractor, as page-local line ranges.
    #[serde(default)]
    pub tables: Vec<Range<usize>>,
}

impl Page {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
            tables: Vec::new(),
        }
    }

    pub fn with_tables(mut self, tables: Vec<Range<usize>>) -> Self {
        self.tables = tables;
        self
    }
}

/// Page-tagged text of one document. Read-only input to the chunkers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn from_pages(id: DocumentId, filename: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            id,
            filename: filename.into(),
            pages,
        }
    }

    /// Build a document from raw text, splitting pages on form feed (`\x0C`).
    /// The id is derived from filename and content.
    pub fn from_text(filename: &str, text: &str) -> Self {
        let pages = text
            .split('\x0C')
            .enumerate()
            .map(|(i, page_text)| Page::new(i as u32 + 1, page_text))
            .collect();
        Self {
            id: DocumentId::from_content(filename, text),
            filename: filename.to_string(),
            pages,
        }
    }

    /// Total character count across all pages.
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }

    /// True when no page carries any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}
