//! Error types for building chunkers (rule compilation, rule files, worker pools).
//!
//! Chunking a document never fails; only the setup around it can.

use std::path::PathBuf;

/// Errors raised while configuring the chunking engine.
#[derive(Debug, thiserror::Error)]
pub enum ChunkerError {
    /// A classifier rule carried a regex that does not compile.
    #[error("Invalid pattern in rule '{rule}': {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    /// YAML parse/deserialization error in a rules file.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Rules file could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Size limits or weights that cannot be honoured.
    #[error("Invalid chunk configuration: {0}")]
    InvalidConfig(String),

    /// Thread pool construction failed.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Core(#[from] legis_core::LegisError),
}

/// Result alias for chunker setup.
pub type Result<T> = std::result::Result<T, ChunkerError>;
