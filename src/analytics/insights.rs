//! Cross-sectional statistics over aggregated data
//!
//! Platform comparison, platform activity and keyword co-occurrence. All
//! three operate on the batches a query scope selected; a topic absent from
//! every platform still yields one entry per platform with a zero count so
//! callers can render the full comparison.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use crate::aggregate::CancelToken;
use crate::error::{Error, Result};
use crate::keywords::{KeywordIndex, WordGroup};
use crate::models::Batch;

/// Insight mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightType {
    PlatformCompare,
    PlatformActivity,
    KeywordCooccur,
}

impl FromStr for InsightType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "platform_compare" => Ok(Self::PlatformCompare),
            "platform_activity" => Ok(Self::PlatformActivity),
            "keyword_cooccur" => Ok(Self::KeywordCooccur),
            other => Err(Error::unsupported("insightType", other)),
        }
    }
}

/// Per-platform mention count and share-of-total for one topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformShare {
    pub platform_id: String,
    pub count: u64,
    /// Fraction of the topic's total mentions, 0 when the total is zero
    pub share: f64,
}

/// Per-platform publishing statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformActivity {
    pub platform_id: String,
    pub total_items: u64,
    pub batches: u64,
    pub items_per_batch: f64,
    /// Batch count per hour of day (UTC), 24 buckets
    pub hour_histogram: Vec<u64>,
}

/// Same-batch co-occurrence between two word groups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooccurrencePair {
    pub group_a: String,
    pub group_b: String,
    /// Items matching both groups within the same batch, summed over batches
    pub count: u64,
    /// Jaccard strength: intersection / union of the matched item sets
    pub strength: f64,
}

/// Per-platform counts and shares for one topic
///
/// Every platform in `platforms` appears in the result, zero counts
/// included. Ordering is count descending, ties broken by platform id
/// ascending for deterministic output.
pub fn platform_compare(
    batches: &[&Batch],
    group: &WordGroup,
    platforms: &[String],
) -> Vec<PlatformShare> {
    let mut counts: BTreeMap<String, u64> = platforms.iter().map(|p| (p.clone(), 0)).collect();

    for batch in batches {
        for item in &batch.items {
            if group.matches(&item.title) {
                *counts.entry(item.platform_id.clone()).or_insert(0) += 1;
            }
        }
    }

    let total: u64 = counts.values().sum();
    let mut shares: Vec<PlatformShare> = counts
        .into_iter()
        .map(|(platform_id, count)| PlatformShare {
            platform_id,
            count,
            share: if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            },
        })
        .collect();

    shares.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.platform_id.cmp(&b.platform_id))
    });
    shares
}

/// Per-platform totals, per-batch averages and active-hour histograms
pub fn platform_activity(batches: &[&Batch]) -> Vec<PlatformActivity> {
    struct Acc {
        total_items: u64,
        batches: u64,
        hour_histogram: Vec<u64>,
    }

    let mut acc: BTreeMap<String, Acc> = BTreeMap::new();

    for batch in batches {
        let hour = chrono::Timelike::hour(&batch.captured_at) as usize;
        for platform_id in batch.platform_ids() {
            let items = batch
                .items
                .iter()
                .filter(|i| i.platform_id == platform_id)
                .count() as u64;
            let entry = acc.entry(platform_id).or_insert_with(|| Acc {
                total_items: 0,
                batches: 0,
                hour_histogram: vec![0; 24],
            });
            entry.total_items += items;
            entry.batches += 1;
            entry.hour_histogram[hour] += 1;
        }
    }

    acc.into_iter()
        .map(|(platform_id, a)| PlatformActivity {
            platform_id,
            total_items: a.total_items,
            items_per_batch: if a.batches == 0 {
                0.0
            } else {
                a.total_items as f64 / a.batches as f64
            },
            batches: a.batches,
            hour_histogram: a.hour_histogram,
        })
        .collect()
}

/// Pairwise same-batch co-occurrence across all word groups
///
/// Only pairs whose summed intersection meets `min_frequency` are returned,
/// ordered by strength descending and truncated to `top_n`. Strength is
/// symmetric in the pair.
pub fn keyword_cooccur(
    batches: &[&Batch],
    index: &KeywordIndex,
    min_frequency: u64,
    top_n: usize,
    cancel: &CancelToken,
) -> Result<Vec<CooccurrencePair>> {
    let groups = index.groups();
    let n = groups.len();
    // (intersection, union) per unordered pair, indexed i < j
    let mut pair_counts: BTreeMap<(usize, usize), (u64, u64)> = BTreeMap::new();

    for batch in batches {
        cancel.checkpoint()?;

        // Matched item positions per group within this batch
        let matched: Vec<HashSet<usize>> = groups
            .iter()
            .map(|g| {
                batch
                    .items
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| g.matches(&item.title))
                    .map(|(pos, _)| pos)
                    .collect()
            })
            .collect();

        for i in 0..n {
            if matched[i].is_empty() {
                continue;
            }
            for j in (i + 1)..n {
                let inter = matched[i].intersection(&matched[j]).count() as u64;
                if inter == 0 && matched[j].is_empty() {
                    continue;
                }
                let union = matched[i].union(&matched[j]).count() as u64;
                let entry = pair_counts.entry((i, j)).or_insert((0, 0));
                entry.0 += inter;
                entry.1 += union;
            }
        }
    }

    let mut pairs: Vec<CooccurrencePair> = pair_counts
        .into_iter()
        .filter(|(_, (inter, _))| *inter >= min_frequency)
        .map(|((i, j), (inter, union))| CooccurrencePair {
            group_a: groups[i].name.clone(),
            group_b: groups[j].name.clone(),
            count: inter,
            strength: if union == 0 {
                0.0
            } else {
                inter as f64 / union as f64
            },
        })
        .collect();

    pairs.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.group_a.cmp(&b.group_a))
            .then_with(|| a.group_b.cmp(&b.group_b))
    });
    pairs.truncate(top_n);
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsItem;
    use chrono::{TimeZone, Utc};

    fn batch(day: u32, hour: u32, items: &[(&str, &str)]) -> Batch {
        let captured_at = Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap();
        let id = format!("2026-03-{day:02}/{hour:02}0000");
        Batch {
            captured_at,
            items: items
                .iter()
                .enumerate()
                .map(|(i, (platform, title))| NewsItem {
                    title: title.to_string(),
                    platform_id: platform.to_string(),
                    rank: i as u32 + 1,
                    url: None,
                    captured_at,
                    batch_id: id.clone(),
                })
                .collect(),
            id,
        }
    }

    fn topic(term: &str) -> WordGroup {
        WordGroup {
            name: term.to_string(),
            required: Vec::new(),
            optional: vec![term.to_string()],
            excluded: Vec::new(),
        }
    }

    #[test]
    fn test_insight_type_parsing() {
        assert_eq!(
            InsightType::from_str("keyword_cooccur").unwrap(),
            InsightType::KeywordCooccur
        );
        assert!(InsightType::from_str("platform_velocity").is_err());
    }

    #[test]
    fn test_platform_compare_counts_and_shares() {
        let b = batch(
            1,
            8,
            &[
                ("echo", "rust release lands"),
                ("echo", "rust ecosystem grows"),
                ("drift", "rust adoption rises"),
                ("drift", "unrelated story"),
            ],
        );
        let platforms = vec!["drift".to_string(), "echo".to_string(), "quiet".to_string()];
        let shares = platform_compare(&[&b], &topic("rust"), &platforms);

        assert_eq!(shares.len(), 3);
        assert_eq!(shares[0].platform_id, "echo");
        assert_eq!(shares[0].count, 2);
        assert!((shares[0].share - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(shares[2].platform_id, "quiet");
        assert_eq!(shares[2].count, 0);
    }

    #[test]
    fn test_platform_compare_absent_topic_keeps_platforms() {
        let b = batch(1, 8, &[("echo", "nothing relevant")]);
        let platforms = vec!["echo".to_string(), "drift".to_string()];
        let shares = platform_compare(&[&b], &topic("quantum"), &platforms);
        assert_eq!(shares.len(), 2);
        assert!(shares.iter().all(|s| s.count == 0 && s.share == 0.0));
        // Zero-count ties break by platform id ascending
        assert_eq!(shares[0].platform_id, "drift");
    }

    #[test]
    fn test_platform_activity_histogram() {
        let batches = vec![
            batch(1, 8, &[("echo", "a"), ("echo", "b")]),
            batch(1, 8, &[("echo", "c")]),
            batch(1, 20, &[("echo", "d"), ("drift", "e")]),
        ];
        let refs: Vec<&Batch> = batches.iter().collect();
        let activity = platform_activity(&refs);

        let echo = activity.iter().find(|a| a.platform_id == "echo").unwrap();
        assert_eq!(echo.total_items, 4);
        assert_eq!(echo.batches, 3);
        assert!((echo.items_per_batch - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(echo.hour_histogram[8], 2);
        assert_eq!(echo.hour_histogram[20], 1);

        let drift = activity.iter().find(|a| a.platform_id == "drift").unwrap();
        assert_eq!(drift.batches, 1);
    }

    #[test]
    fn test_cooccur_counts_same_batch_intersections() {
        let batches = vec![
            batch(
                1,
                8,
                &[
                    ("echo", "rust and wasm pair up"),
                    ("echo", "rust alone"),
                    ("echo", "wasm alone"),
                ],
            ),
            batch(1, 12, &[("echo", "rust meets wasm again")]),
        ];
        let refs: Vec<&Batch> = batches.iter().collect();
        let index = KeywordIndex::from_groups(vec![topic("rust"), topic("wasm")]);

        let pairs = keyword_cooccur(&refs, &index, 1, 10, &CancelToken::new()).unwrap();
        assert_eq!(pairs.len(), 1);
        let pair = &pairs[0];
        // Intersections: 1 (first batch) + 1 (second batch)
        assert_eq!(pair.count, 2);
        // Unions: 3 + 1
        assert!((pair.strength - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cooccur_min_frequency_floor() {
        let b = batch(1, 8, &[("echo", "rust and wasm pair up")]);
        let index = KeywordIndex::from_groups(vec![topic("rust"), topic("wasm")]);
        let pairs = keyword_cooccur(&[&b], &index, 2, 10, &CancelToken::new()).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_cooccur_symmetry() {
        let b = batch(
            1,
            8,
            &[("echo", "rust and wasm pair up"), ("echo", "wasm with rust")],
        );
        let forward = KeywordIndex::from_groups(vec![topic("rust"), topic("wasm")]);
        let reversed = KeywordIndex::from_groups(vec![topic("wasm"), topic("rust")]);

        let a = keyword_cooccur(&[&b], &forward, 1, 10, &CancelToken::new()).unwrap();
        let b2 = keyword_cooccur(&[&b], &reversed, 1, 10, &CancelToken::new()).unwrap();
        assert_eq!(a[0].count, b2[0].count);
        assert!((a[0].strength - b2[0].strength).abs() < 1e-12);
    }
}
