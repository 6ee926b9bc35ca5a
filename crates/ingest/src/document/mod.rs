pub mod chunker;
mod txt;

use legis_core::{Document, DocumentId, Page};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of reading a text-like upload into pages.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Original filename.
    pub filename: String,
    /// File type: "txt", "md"
    pub file_type: String,
    /// Extracted pages, 1-based, split on form feed.
    pub pages: Vec<Page>,
}

impl ExtractedDocument {
    /// Get all text concatenated.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Convert into the engine's input, deriving the id from filename and text.
    pub fn into_document(self) -> Document {
        let id = DocumentId::from_content(&self.filename, &self.full_text());
        Document::from_pages(id, self.filename, self.pages)
    }
}

/// Read text-like uploads. Binary formats (PDF, DOCX) are extracted upstream
/// and arrive as pages already.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<ExtractedDocument, ExtractionError> {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    let file_type = ext.as_str();

    let pages = match file_type {
        "txt" | "text" | "md" | "markdown" => txt::extract_txt(bytes),
        other => return Err(ExtractionError::UnsupportedType(other.to_string())),
    };

    Ok(ExtractedDocument {
        filename: filename.to_string(),
        file_type: file_type.to_string(),
        pages,
    })
}

/// Read a file from disk and extract it.
pub fn extract_file(path: &std::path::Path) -> Result<ExtractedDocument, ExtractionError> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    extract_text(&bytes, filename)
}
