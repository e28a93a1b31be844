//! Configuration management for the trendlens engine
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Word-group definitions live in a separate file
//! (see [`crate::keywords`]); a failure loading them aborts startup since
//! every later query depends on them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Known platforms, in display order
    pub platforms: Vec<PlatformConfig>,

    /// Corpus store configuration
    pub corpus: CorpusConfig,

    /// Ranking weight configuration
    pub ranking: RankingConfig,

    /// Series cache configuration
    pub cache: CacheSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// One crawled platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Stable identifier used in batch files (e.g., "hn")
    pub id: String,

    /// Human-readable name (e.g., "Hacker News")
    pub name: String,
}

/// Corpus store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Root of the date-partitioned batch tree written by the crawler
    pub data_dir: PathBuf,

    /// Attention word-group definition file
    pub word_groups_path: PathBuf,
}

/// Popularity-weight tunables
///
/// The weight curve is `1 / (rank + rank_offset)`: monotonically decreasing
/// in platform rank. Recency decay halves a weight every `half_life_hours`
/// when enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub rank_offset: f64,

    /// None disables recency decay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub half_life_hours: Option<f64>,
}

/// Series cache bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub enabled: bool,

    /// Maximum number of cached series
    pub max_entries: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl EngineConfig {
    /// Load configuration from environment variables, with defaults
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("TRENDLENS_DATA_DIR")
            .unwrap_or_else(|_| String::from("data/batches"))
            .into();

        let word_groups_path = std::env::var("TRENDLENS_WORD_GROUPS")
            .unwrap_or_else(|_| String::from("config/word_groups.txt"))
            .into();

        let rank_offset = std::env::var("TRENDLENS_RANK_OFFSET")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(1.0);

        let half_life_hours = std::env::var("TRENDLENS_HALF_LIFE_HOURS")
            .ok()
            .and_then(|v| v.parse::<f64>().ok());

        let cache_entries = std::env::var("TRENDLENS_CACHE_ENTRIES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(256);

        let log_level =
            std::env::var("TRENDLENS_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let log_format =
            std::env::var("TRENDLENS_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            platforms: Vec::new(),
            corpus: CorpusConfig {
                data_dir,
                word_groups_path,
            },
            ranking: RankingConfig {
                rank_offset,
                half_life_hours,
            },
            cache: CacheSettings {
                enabled: true,
                max_entries: cache_entries,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.ranking.rank_offset <= 0.0 {
            anyhow::bail!("ranking.rank_offset must be positive");
        }

        if let Some(half_life) = self.ranking.half_life_hours {
            if half_life <= 0.0 {
                anyhow::bail!("ranking.half_life_hours must be positive");
            }
        }

        if self.cache.enabled && self.cache.max_entries == 0 {
            anyhow::bail!("cache.max_entries must be greater than 0 when enabled");
        }

        let mut ids = std::collections::HashSet::new();
        for platform in &self.platforms {
            if platform.id.is_empty() {
                anyhow::bail!("platform id must not be empty");
            }
            if !ids.insert(platform.id.as_str()) {
                anyhow::bail!("duplicate platform id: {}", platform.id);
            }
        }

        Ok(())
    }

    /// Resolve a platform's display name, falling back to its id
    pub fn platform_name(&self, id: &str) -> String {
        self.platforms
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// All configured platform ids in declaration order
    pub fn platform_ids(&self) -> Vec<String> {
        self.platforms.iter().map(|p| p.id.clone()).collect()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platforms: Vec::new(),
            corpus: CorpusConfig {
                data_dir: PathBuf::from("data/batches"),
                word_groups_path: PathBuf::from("config/word_groups.txt"),
            },
            ranking: RankingConfig {
                rank_offset: 1.0,
                half_life_hours: None,
            },
            cache: CacheSettings {
                enabled: true,
                max_entries: 256,
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
