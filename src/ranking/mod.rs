//! Popularity weight and recency decay
//!
//! The shared scoring primitive used by search sorting, sentiment ranking
//! and summary-report selection. The weight curve from platform rank is
//! `1 / (rank + rank_offset)`, a documented monotonic decreasing function
//! treated as a tunable, tested constant. Recency decay halves a weight
//! every `half_life_hours` when configured.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RankingConfig;
use crate::models::NewsItem;

/// Weight model derived from [`RankingConfig`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightModel {
    rank_offset: f64,
    half_life_hours: Option<f64>,
}

impl WeightModel {
    pub fn new(rank_offset: f64, half_life_hours: Option<f64>) -> Self {
        Self {
            rank_offset,
            half_life_hours,
        }
    }

    pub fn from_config(config: &RankingConfig) -> Self {
        Self {
            rank_offset: config.rank_offset,
            half_life_hours: config.half_life_hours,
        }
    }

    /// Weight from platform rank alone; lower rank scores higher
    pub fn rank_weight(&self, rank: u32) -> f64 {
        1.0 / (f64::from(rank) + self.rank_offset)
    }

    /// Exponential recency factor in (0, 1]; 1.0 when decay is disabled
    pub fn recency_factor(&self, captured_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let Some(half_life) = self.half_life_hours else {
            return 1.0;
        };
        let age_hours = (now - captured_at).num_seconds().max(0) as f64 / 3600.0;
        0.5_f64.powf(age_hours / half_life)
    }

    /// Full popularity weight for an item
    pub fn item_weight(&self, item: &NewsItem, now: DateTime<Utc>) -> f64 {
        self.rank_weight(item.rank) * self.recency_factor(item.captured_at, now)
    }
}

impl Default for WeightModel {
    fn default() -> Self {
        Self {
            rank_offset: 1.0,
            half_life_hours: None,
        }
    }
}
