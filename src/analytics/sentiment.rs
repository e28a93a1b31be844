//! Coarse sentiment bucketing with popularity-weighted ranking
//!
//! Explicitly a heuristic proxy, not a trained classifier: titles are
//! bucketed into a positive/neutral/negative-adjacent distribution using a
//! fixed lexicon, and ranked by the shared popularity weight. Identical
//! titles appearing on several platforms are kept once, highest weight wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::HashSet;

use crate::models::NewsItem;
use crate::ranking::WeightModel;
use crate::search::tokenize;

lazy_static::lazy_static! {
    static ref POSITIVE_WORDS: HashSet<&'static str> = [
        "breakthrough", "record", "wins", "win", "growth", "surge", "soars",
        "success", "launch", "launches", "approved", "recovery", "rally",
        "gains", "boost", "milestone", "award", "celebrates", "expands",
    ]
    .into_iter()
    .collect();

    static ref NEGATIVE_WORDS: HashSet<&'static str> = [
        "crash", "crisis", "fraud", "scandal", "collapse", "layoffs", "cuts",
        "drop", "drops", "plunge", "plunges", "warning", "lawsuit", "death",
        "fire", "attack", "breach", "fails", "failure", "recall", "losses",
    ]
    .into_iter()
    .collect();
}

/// Coarse sentiment bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentBucket {
    Positive,
    Neutral,
    Negative,
}

/// Bucket counts with shares
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
    pub total: u64,
    pub positive_share: f64,
    pub neutral_share: f64,
    pub negative_share: f64,
}

/// One item with its weight and bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedNews {
    #[serde(flatten)]
    pub item: NewsItem,
    pub weight: f64,
    pub bucket: SentimentBucket,
}

/// Bucket a title by lexicon hits; ties and no-hits are neutral
pub fn classify_title(title: &str) -> SentimentBucket {
    let tokens = tokenize(title);
    let positive = tokens
        .iter()
        .filter(|t| POSITIVE_WORDS.contains(t.as_str()))
        .count();
    let negative = tokens
        .iter()
        .filter(|t| NEGATIVE_WORDS.contains(t.as_str()))
        .count();

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => SentimentBucket::Positive,
        std::cmp::Ordering::Less => SentimentBucket::Negative,
        std::cmp::Ordering::Equal => SentimentBucket::Neutral,
    }
}

/// Bucket, de-duplicate and rank a set of items
///
/// When `sort_by_weight` is false the ranking falls back to recency.
pub fn analyze_sentiment(
    items: &[&NewsItem],
    weights: &WeightModel,
    now: DateTime<Utc>,
    sort_by_weight: bool,
    limit: usize,
) -> (SentimentDistribution, Vec<WeightedNews>) {
    // Same title on several platforms counts once; highest weight kept
    let mut by_title: HashMap<String, WeightedNews> = HashMap::new();
    for item in items {
        let weight = weights.item_weight(item, now);
        let key = item.title.to_lowercase();
        match by_title.get(&key) {
            Some(existing) if existing.weight >= weight => {}
            _ => {
                by_title.insert(
                    key,
                    WeightedNews {
                        item: (*item).clone(),
                        weight,
                        bucket: classify_title(&item.title),
                    },
                );
            }
        }
    }

    let mut ranked: Vec<WeightedNews> = by_title.into_values().collect();
    if sort_by_weight {
        ranked.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.item.captured_at.cmp(&a.item.captured_at))
        });
    } else {
        ranked.sort_by(|a, b| b.item.captured_at.cmp(&a.item.captured_at));
    }

    let mut dist = SentimentDistribution::default();
    for news in &ranked {
        match news.bucket {
            SentimentBucket::Positive => dist.positive += 1,
            SentimentBucket::Neutral => dist.neutral += 1,
            SentimentBucket::Negative => dist.negative += 1,
        }
    }
    dist.total = dist.positive + dist.neutral + dist.negative;
    if dist.total > 0 {
        let total = dist.total as f64;
        dist.positive_share = dist.positive as f64 / total;
        dist.neutral_share = dist.neutral as f64 / total;
        dist.negative_share = dist.negative as f64 / total;
    }

    ranked.truncate(limit);
    (dist, ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(title: &str, platform: &str, rank: u32) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            platform_id: platform.to_string(),
            rank,
            url: None,
            captured_at: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
            batch_id: "2026-03-01/080000".to_string(),
        }
    }

    #[test]
    fn test_classify_buckets() {
        assert_eq!(
            classify_title("Startup celebrates record growth"),
            SentimentBucket::Positive
        );
        assert_eq!(
            classify_title("Exchange collapse triggers lawsuit"),
            SentimentBucket::Negative
        );
        assert_eq!(
            classify_title("Committee schedules hearing"),
            SentimentBucket::Neutral
        );
        // Mixed signals stay neutral
        assert_eq!(
            classify_title("Record growth ends in collapse and losses"),
            SentimentBucket::Neutral
        );
    }

    #[test]
    fn test_duplicate_titles_kept_once() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let a = item("Same headline", "echo", 5);
        let b = item("Same Headline", "drift", 1);
        let (dist, ranked) =
            analyze_sentiment(&[&a, &b], &WeightModel::default(), now, true, 50);

        assert_eq!(dist.total, 1);
        assert_eq!(ranked.len(), 1);
        // Rank 1 carries the higher weight
        assert_eq!(ranked[0].item.platform_id, "drift");
    }

    #[test]
    fn test_weight_ordering() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let low = item("Low ranked story", "echo", 20);
        let high = item("Top ranked story", "echo", 1);
        let (_, ranked) =
            analyze_sentiment(&[&low, &high], &WeightModel::default(), now, true, 50);
        assert_eq!(ranked[0].item.title, "Top ranked story");
    }

    #[test]
    fn test_distribution_shares_sum_to_one() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let items = [
            item("Startup wins award", "echo", 1),
            item("Market crash deepens", "echo", 2),
            item("Weather stays mild", "echo", 3),
        ];
        let refs: Vec<&NewsItem> = items.iter().collect();
        let (dist, _) = analyze_sentiment(&refs, &WeightModel::default(), now, true, 50);
        assert_eq!(dist.total, 3);
        let sum = dist.positive_share + dist.neutral_share + dist.negative_share;
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
