//! Read-only access to the crawler's persisted batch tree
//!
//! The crawling subsystem owns writes; the engine only queries. On disk one
//! batch is a directory `<root>/YYYY-MM-DD/HHMMSS/` holding one
//! `<platform>.json` file per platform, each a JSON array of stored items.
//!
//! [`CorpusStore::snapshot`] materializes an immutable [`CorpusSnapshot`]
//! for the requested date range. A snapshot never changes mid-query: each
//! query works on the batch list it was handed. An unreadable platform file
//! degrades gracefully: the platform is omitted from that batch and
//! reported in the snapshot's failure list instead of failing the query.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{Batch, DateRange, NewsItem, PlatformFailure};

/// On-disk record for one headline inside a platform file
///
/// Positional metadata (platform, capture time, batch id) is derived from
/// the file's location rather than repeated per item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredItem {
    pub title: String,
    pub rank: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

/// Immutable view of the batches visible to one query
#[derive(Debug, Clone, Default)]
pub struct CorpusSnapshot {
    /// Batches sorted by capture time, oldest first
    pub batches: Vec<Batch>,

    /// Platforms skipped while reading, with reasons
    pub failures: Vec<PlatformFailure>,
}

impl CorpusSnapshot {
    /// Most recent batch, if any
    pub fn latest_batch(&self) -> Option<&Batch> {
        self.batches.last()
    }

    /// Batches captured on one calendar date
    pub fn batches_on(&self, date: NaiveDate) -> Vec<&Batch> {
        self.batches
            .iter()
            .filter(|b| b.captured_at.date_naive() == date)
            .collect()
    }

    /// Distinct capture dates, ascending
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .batches
            .iter()
            .map(|b| b.captured_at.date_naive())
            .collect();
        dates.dedup();
        dates
    }

    /// Total item count across all batches
    pub fn item_count(&self) -> usize {
        self.batches.iter().map(|b| b.items.len()).sum()
    }

    /// Id of the newest batch; used for cache invalidation
    pub fn newest_batch_id(&self) -> Option<&str> {
        self.latest_batch().map(|b| b.id.as_str())
    }

    /// Platform ids observed anywhere in the snapshot, sorted
    pub fn platform_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .batches
            .iter()
            .flat_map(|b| b.platform_ids())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        ids.sort();
        ids
    }
}

/// Read-only corpus access
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Materialize the batches within `range` (all dates when `None`),
    /// optionally restricted to the given platforms
    async fn snapshot(
        &self,
        range: Option<DateRange>,
        platforms: Option<&[String]>,
    ) -> Result<CorpusSnapshot>;
}

/// File-backed corpus store over the crawler's batch tree
#[derive(Debug, Clone)]
pub struct FileCorpusStore {
    root: PathBuf,
}

impl FileCorpusStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_snapshot(
        &self,
        range: Option<DateRange>,
        platforms: Option<&[String]>,
    ) -> Result<CorpusSnapshot> {
        if !self.root.exists() {
            return Err(Error::UpstreamUnavailable(format!(
                "corpus root {} does not exist",
                self.root.display()
            )));
        }

        let mut batches = Vec::new();
        let mut failures = Vec::new();

        let mut date_dirs: Vec<(NaiveDate, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let Ok(date) = NaiveDate::parse_from_str(&name, "%Y-%m-%d") else {
                tracing::debug!(dir = %name, "Skipping non-date directory");
                continue;
            };
            if let Some(range) = range {
                if !range.contains(date) {
                    continue;
                }
            }
            date_dirs.push((date, path));
        }
        date_dirs.sort_by_key(|(date, _)| *date);

        for (date, date_dir) in date_dirs {
            let mut time_dirs: Vec<(NaiveTime, PathBuf)> = Vec::new();
            for entry in std::fs::read_dir(&date_dir)? {
                let entry = entry?;
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().to_string();
                let Ok(time) = NaiveTime::parse_from_str(&name, "%H%M%S") else {
                    tracing::debug!(dir = %name, "Skipping non-time directory");
                    continue;
                };
                time_dirs.push((time, path));
            }
            time_dirs.sort_by_key(|(time, _)| *time);

            for (time, batch_dir) in time_dirs {
                let captured_at: DateTime<Utc> =
                    DateTime::from_naive_utc_and_offset(date.and_time(time), Utc);
                let batch_id = format!("{}/{}", date.format("%Y-%m-%d"), time.format("%H%M%S"));

                let batch =
                    self.read_batch(&batch_dir, &batch_id, captured_at, platforms, &mut failures)?;
                if !batch.items.is_empty() {
                    batches.push(batch);
                }
            }
        }

        tracing::debug!(
            batches = batches.len(),
            failures = failures.len(),
            "Corpus snapshot materialized"
        );

        Ok(CorpusSnapshot { batches, failures })
    }

    fn read_batch(
        &self,
        batch_dir: &Path,
        batch_id: &str,
        captured_at: DateTime<Utc>,
        platforms: Option<&[String]>,
        failures: &mut Vec<PlatformFailure>,
    ) -> Result<Batch> {
        let mut items = Vec::new();

        let mut platform_files: Vec<(String, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(batch_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(platform_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(wanted) = platforms {
                if !wanted.iter().any(|p| p == platform_id) {
                    continue;
                }
            }
            platform_files.push((platform_id.to_string(), path));
        }
        platform_files.sort();

        for (platform_id, path) in platform_files {
            match Self::read_platform_file(&path) {
                Ok(stored) => {
                    for record in stored {
                        items.push(NewsItem {
                            title: record.title,
                            platform_id: platform_id.clone(),
                            rank: record.rank,
                            url: record.url,
                            captured_at,
                            batch_id: batch_id.to_string(),
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        platform = %platform_id,
                        batch = %batch_id,
                        error = %e,
                        "Skipping unreadable platform file"
                    );
                    failures.push(PlatformFailure {
                        platform_id,
                        reason: format!("batch {batch_id}: {e}"),
                    });
                }
            }
        }

        Ok(Batch {
            id: batch_id.to_string(),
            captured_at,
            items,
        })
    }

    fn read_platform_file(path: &Path) -> Result<Vec<StoredItem>> {
        let content = std::fs::read_to_string(path)?;
        let items: Vec<StoredItem> = serde_json::from_str(&content)?;
        Ok(items)
    }
}

#[async_trait]
impl CorpusStore for FileCorpusStore {
    async fn snapshot(
        &self,
        range: Option<DateRange>,
        platforms: Option<&[String]>,
    ) -> Result<CorpusSnapshot> {
        self.read_snapshot(range, platforms)
    }
}

/// Convenience alias used by the engine facade
pub type SharedStore = Arc<dyn CorpusStore>;
