//! Declarative classifier configuration.
//!
//! Footer boilerplate, table vocabulary and cross-reference phrasing vary per
//! document template, so they live in data rather than code. A rules file is
//! a YAML document with the usual envelope:
//!
//! ```yaml
//! apiVersion: v1
//! kind: ClassifierRules
//! metadata:
//!   id: nhs-framework
//! spec:
//!   footer_patterns:
//!     - literal: "Commercial in Confidence"
//!     - regex: "^Framework Ref: RM\\d+"
//! ```
//!
//! Any `spec` field left out keeps its built-in default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ChunkerError, Result};

/// One footer/running-header pattern, written `literal: ...` or `regex: ...`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FooterPattern {
    /// Case-insensitive substring, only tested against short lines.
    Literal { literal: String },
    /// Regex tested against the trimmed line.
    Regex { regex: String },
}

impl FooterPattern {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal { literal: text.into() }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex { regex: pattern.into() }
    }
}

/// Vocabulary and limits the classifier rule table is compiled from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ClassifierRules {
    /// Boilerplate footer/header lines to discard.
    pub footer_patterns: Vec<FooterPattern>,
    /// Units that make a number "numeric-with-unit" in a table row.
    pub table_units: Vec<String>,
    /// Header vocabulary of service-level / KPI tables.
    pub table_header_keywords: Vec<String>,
    /// Phrases introducing a reference ("see", "as defined in").
    pub cross_reference_phrases: Vec<String>,
    /// Things a reference points at ("clause", "schedule").
    pub cross_reference_targets: Vec<String>,
    /// Longest remainder (in words) that still reads as a section title.
    pub max_title_words: usize,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            footer_patterns: vec![
                FooterPattern::literal("all rights reserved"),
                FooterPattern::literal("commercial in confidence"),
                FooterPattern::literal("strictly confidential"),
                FooterPattern::literal("official sensitive"),
                FooterPattern::regex(r"(?i)^(?:©|\(c\)|copyright)\s.{0,80}$"),
                FooterPattern::regex(r"(?i)^version\s+\d+(?:\.\d+)*\s*$"),
            ],
            table_units: owned(&[
                "%",
                "percent",
                "working days",
                "business days",
                "days",
                "day",
                "hours",
                "hour",
                "hrs",
                "minutes",
                "mins",
                "seconds",
                "weeks",
                "months",
            ]),
            table_header_keywords: owned(&[
                "service level",
                "kpi",
                "key performance indicator",
                "performance indicator",
                "metric",
                "bundle ref",
                "target",
                "measurement",
                "service credit",
                "threshold",
                "frequency",
                "reporting period",
            ]),
            cross_reference_phrases: owned(&[
                "see",
                "refer to",
                "referred to in",
                "pursuant to",
                "in accordance with",
                "subject to",
                "as defined in",
                "as set out in",
                "as described in",
                "as specified in",
                "under",
            ]),
            cross_reference_targets: owned(&[
                "clause",
                "section",
                "schedule",
                "paragraph",
                "annex",
                "appendix",
                "part",
                "article",
            ]),
            max_title_words: 12,
        }
    }
}

/// Envelope metadata of a rules file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RulesMetadata {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Top-level rules document as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClassifierRulesDocument {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: RulesMetadata,
    #[serde(default)]
    pub spec: ClassifierRules,
}

const RULES_KIND: &str = "ClassifierRules";

impl ClassifierRules {
    /// Parse a rules document from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let doc: ClassifierRulesDocument = serde_yaml::from_str(yaml)?;
        if doc.kind != RULES_KIND {
            return Err(ChunkerError::InvalidConfig(format!(
                "rules document '{}' has kind '{}', expected '{RULES_KIND}'",
                doc.metadata.id, doc.kind
            )));
        }
        if doc.spec.max_title_words == 0 {
            return Err(ChunkerError::InvalidConfig(format!(
                "rules document '{}': max_title_words must be positive",
                doc.metadata.id
            )));
        }
        tracing::debug!(rules_id = %doc.metadata.id, "parsed classifier rules");
        Ok(doc.spec)
    }

    /// Read and parse a rules file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ChunkerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }
}
