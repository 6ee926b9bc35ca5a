use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::LegisError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f64(profile: &str, key: &str, default: f64) -> f64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub chunking: ChunkingConfig,
    pub ingest: IngestConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `LEGIS_PROFILE` env var. When set (e.g. `STRICT`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("LEGIS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            chunking: ChunkingConfig::from_env_profiled(p),
            ingest: IngestConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject size settings the chunk assembler cannot honour.
    pub fn validate(&self) -> Result<(), LegisError> {
        self.chunking.validate()
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  chunking:    min={}, max={}, ceiling={}, table_factor={}",
            self.chunking.min_chunk_chars,
            self.chunking.max_chunk_chars,
            self.chunking.hard_ceiling_chars,
            self.chunking.table_ceiling_factor
        );
        tracing::info!(
            "  rules:       {}",
            self.chunking
                .rules_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in)".to_string())
        );
        tracing::info!("  ingest:      workers={}", self.ingest.workers);
    }

    /// Return a JSON view for status endpoints of the host service.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "chunking": {
                "min_chunk_chars": self.chunking.min_chunk_chars,
                "max_chunk_chars": self.chunking.max_chunk_chars,
                "hard_ceiling_chars": self.chunking.hard_ceiling_chars,
                "table_ceiling_factor": self.chunking.table_ceiling_factor,
                "min_meaningful_chars": self.chunking.min_meaningful_chars,
                "fallback_min_ratio": self.chunking.fallback_min_ratio,
                "custom_rules": self.chunking.rules_path.is_some(),
            },
            "ingest": { "workers": self.ingest.workers },
        })
    }
}

// ── Chunking ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Chunks below this size keep accumulating before they are emitted.
    pub min_chunk_chars: usize,
    /// Soft target; prose never pushes a chunk past it.
    pub max_chunk_chars: usize,
    /// Atomic blocks may overflow `max_chunk_chars` up to this size.
    pub hard_ceiling_chars: usize,
    /// Multiplier applied to the ceiling for table-bearing chunks.
    pub table_ceiling_factor: f64,
    /// Chunks shorter than this after cleanup are merged or flagged.
    pub min_meaningful_chars: usize,
    /// Fallback re-split fires when chunk count drops below this share of
    /// `total_chars / max_chunk_chars`.
    pub fallback_min_ratio: f64,
    /// Optional YAML file overriding the built-in classifier rules.
    pub rules_path: Option<PathBuf>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chunk_chars: 200,
            max_chunk_chars: 1500,
            hard_ceiling_chars: 3000,
            table_ceiling_factor: 2.0,
            min_meaningful_chars: 40,
            fallback_min_ratio: 0.5,
            rules_path: None,
        }
    }
}

impl ChunkingConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            min_chunk_chars: profiled_env_usize(p, "CHUNK_MIN_CHARS", d.min_chunk_chars),
            max_chunk_chars: profiled_env_usize(p, "CHUNK_MAX_CHARS", d.max_chunk_chars),
            hard_ceiling_chars: profiled_env_usize(p, "CHUNK_HARD_CEILING", d.hard_ceiling_chars),
            table_ceiling_factor: profiled_env_f64(p, "CHUNK_TABLE_CEILING_FACTOR", d.table_ceiling_factor),
            min_meaningful_chars: profiled_env_usize(
                p,
                "CHUNK_MIN_MEANINGFUL_CHARS",
                d.min_meaningful_chars,
            ),
            fallback_min_ratio: profiled_env_f64(p, "CHUNK_FALLBACK_MIN_RATIO", d.fallback_min_ratio),
            rules_path: profiled_env_opt(p, "CHUNK_RULES_PATH").map(PathBuf::from),
        }
    }

    pub fn validate(&self) -> Result<(), LegisError> {
        if self.min_chunk_chars == 0 {
            return Err(LegisError::InvalidConfig("CHUNK_MIN_CHARS must be positive".into()));
        }
        if self.min_chunk_chars > self.max_chunk_chars {
            return Err(LegisError::InvalidConfig(format!(
                "CHUNK_MIN_CHARS ({}) exceeds CHUNK_MAX_CHARS ({})",
                self.min_chunk_chars, self.max_chunk_chars
            )));
        }
        if self.max_chunk_chars > self.hard_ceiling_chars {
            return Err(LegisError::InvalidConfig(format!(
                "CHUNK_MAX_CHARS ({}) exceeds CHUNK_HARD_CEILING ({})",
                self.max_chunk_chars, self.hard_ceiling_chars
            )));
        }
        if !(self.table_ceiling_factor >= 1.0) {
            return Err(LegisError::InvalidConfig(
                "CHUNK_TABLE_CEILING_FACTOR must be at least 1.0".into(),
            ));
        }
        if self.min_meaningful_chars > self.min_chunk_chars {
            return Err(LegisError::InvalidConfig(format!(
                "CHUNK_MIN_MEANINGFUL_CHARS ({}) exceeds CHUNK_MIN_CHARS ({})",
                self.min_meaningful_chars, self.min_chunk_chars
            )));
        }
        if !(0.0..=1.0).contains(&self.fallback_min_ratio) {
            return Err(LegisError::InvalidConfig(
                "CHUNK_FALLBACK_MIN_RATIO must be within 0.0..=1.0".into(),
            ));
        }
        Ok(())
    }
}

// ── Ingest workers ────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Worker threads for cross-document chunking (0 = one per CPU).
    pub workers: usize,
}

impl IngestConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            workers: profiled_env_usize(p, "INGEST_WORKERS", 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.profile_label(), "default");
        assert_eq!(cfg.chunking.max_chunk_chars, 1500);
    }

    #[test]
    fn min_above_max_rejected() {
        let cfg = ChunkingConfig {
            min_chunk_chars: 900,
            max_chunk_chars: 500,
            ..ChunkingConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("CHUNK_MIN_CHARS"));
    }

    #[test]
    fn ceiling_below_max_rejected() {
        let cfg = ChunkingConfig {
            hard_ceiling_chars: 1000,
            ..ChunkingConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn table_factor_below_one_rejected() {
        let cfg = ChunkingConfig {
            table_ceiling_factor: 0.5,
            ..ChunkingConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn meaningful_size_above_min_rejected() {
        let cfg = ChunkingConfig {
            min_meaningful_chars: 300,
            ..ChunkingConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("CHUNK_MIN_MEANINGFUL_CHARS"));
    }

    #[test]
    fn profiled_keys_take_precedence() {
        env::set_var("LEGISTEST_CHUNK_MAX_CHARS", "900");
        let cfg = Config::for_profile("legistest");
        assert_eq!(cfg.profile, "LEGISTEST");
        assert_eq!(cfg.chunking.max_chunk_chars, 900);
        env::remove_var("LEGISTEST_CHUNK_MAX_CHARS");
    }

    #[test]
    fn summary_reports_custom_rules() {
        let mut cfg = Config::default();
        cfg.chunking.rules_path = Some(PathBuf::from("rules.yml"));
        let summary = cfg.redacted_summary();
        assert_eq!(summary["chunking"]["custom_rules"], true);
        assert_eq!(summary["profile"], "default");
    }
}
