// Core data structures for the trendlens engine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};

/// One crawled news headline
///
/// Immutable once persisted by the crawling subsystem. The title is the
/// primary matching key; platform + rank is positional metadata only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewsItem {
    pub title: String,
    pub platform_id: String,
    /// Position within its platform's batch, 1-based
    pub rank: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub batch_id: String,
}

/// One crawl run: a timestamped snapshot of per-platform item lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub captured_at: DateTime<Utc>,
    pub items: Vec<NewsItem>,
}

impl Batch {
    /// Check the (platform, rank) uniqueness invariant
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert((item.platform_id.as_str(), item.rank)) {
                return Err(Error::other(format!(
                    "duplicate (platform, rank) in batch {}: ({}, {})",
                    self.id, item.platform_id, item.rank
                )));
            }
        }
        Ok(())
    }

    /// Platform ids present in this batch, deduplicated
    pub fn platform_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .items
            .iter()
            .map(|i| i.platform_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        ids.sort();
        ids
    }

    /// Items for one platform, in rank order
    pub fn platform_items(&self, platform_id: &str) -> Vec<&NewsItem> {
        let mut items: Vec<&NewsItem> = self
            .items
            .iter()
            .filter(|i| i.platform_id == platform_id)
            .collect();
        items.sort_by_key(|i| i.rank);
        items
    }
}

/// Inclusive calendar-date range with `YYYY-MM-DD` serde representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a validated range (start must not be after end)
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateExpression(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Single-day range
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }

    /// Number of calendar days covered, inclusive
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// One time-series sample of mention activity for a topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub mention_count: u64,
    pub weighted_score: f64,
}

/// Derived per-scope mention statistics for one word group
///
/// Rebuilt on demand from batches; never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionRecord {
    pub date: NaiveDate,
    pub platform_id: String,
    pub group: String,
    pub count: u64,
    pub weighted_score: f64,
}

/// A news item with a relevance score attached by a search or similarity pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: NewsItem,
    /// Score in [0, 1]
    pub score: f64,
    pub matched_mode: String,
}

/// A platform the engine skipped mid-query, with the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformFailure {
    pub platform_id: String,
    pub reason: String,
}
