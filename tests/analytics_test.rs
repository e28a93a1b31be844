//! Property tests for the analytical invariants

mod common;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

use trendlens::aggregate::CancelToken;
use trendlens::analytics::insights::keyword_cooccur;
use trendlens::analytics::trend::{analyze, AnalysisParams, AnalysisType, TrendAnalysis};
use trendlens::keywords::{KeywordIndex, WordGroup};
use trendlens::models::{Batch, DateRange, NewsItem, TrendPoint};
use trendlens::search::{tokenize, token_similarity};
use trendlens::store::{CorpusStore, FileCorpusStore};

use common::FixtureCorpus;

fn series_from(counts: &[u64]) -> Vec<TrendPoint> {
    let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    counts
        .iter()
        .enumerate()
        .map(|(i, &c)| TrendPoint {
            timestamp: base + Duration::hours(i as i64 * 4),
            mention_count: c,
            weighted_score: c as f64,
        })
        .collect()
}

fn topic(term: &str) -> WordGroup {
    WordGroup {
        name: term.to_string(),
        required: Vec::new(),
        optional: vec![term.to_string()],
        excluded: Vec::new(),
    }
}

fn batch_of(titles: Vec<String>) -> Batch {
    let captured_at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    Batch {
        id: "2026-03-01/080000".to_string(),
        captured_at,
        items: titles
            .into_iter()
            .enumerate()
            .map(|(i, title)| NewsItem {
                title,
                platform_id: "echo".to_string(),
                rank: i as u32 + 1,
                url: None,
                captured_at,
                batch_id: "2026-03-01/080000".to_string(),
            })
            .collect(),
    }
}

proptest! {
    /// Lifecycle phases are non-overlapping and jointly cover the series
    #[test]
    fn lifecycle_phases_partition_any_series(counts in prop::collection::vec(0u64..100, 1..40)) {
        let series = series_from(&counts);
        let result = analyze("t", AnalysisType::Lifecycle, series, &AnalysisParams::default());
        let TrendAnalysis::Lifecycle { phases, series, .. } = result else {
            panic!("wrong variant");
        };

        let covered: usize = phases.iter().map(|s| s.points).sum();
        prop_assert_eq!(covered, series.len());
        for pair in phases.windows(2) {
            prop_assert!(pair[0].end < pair[1].start);
        }
    }

    /// Viral detection never fires with fewer than two window points
    #[test]
    fn viral_never_fires_on_two_points(a in 0u64..100, b in 0u64..1000) {
        let series = series_from(&[a, b]);
        let result = analyze("t", AnalysisType::Viral, series, &AnalysisParams::default());
        let TrendAnalysis::Viral { flagged, insufficient_data, .. } = result else {
            panic!("wrong variant");
        };
        prop_assert!(flagged.is_empty());
        prop_assert!(insufficient_data);
    }

    /// Token similarity is symmetric and bounded to [0, 1]
    #[test]
    fn token_similarity_symmetric_bounded(
        a in "[a-z]{2,8}( [a-z]{2,8}){0,5}",
        b in "[a-z]{2,8}( [a-z]{2,8}){0,5}",
    ) {
        let ta = tokenize(&a);
        let tb = tokenize(&b);
        let ab = token_similarity(&ta, &tb);
        let ba = token_similarity(&tb, &ta);
        prop_assert!((ab - ba).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&ab));
    }

    /// DateRange serde round-trip preserves start/end
    #[test]
    fn date_range_round_trips(start_off in 0i64..2000, span in 0i64..365) {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(start_off);
        let range = DateRange { start, end: start + Duration::days(span) };
        let json = serde_json::to_string(&range).unwrap();
        let back: DateRange = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, range);
    }

    /// Co-occurrence strength does not depend on group order
    #[test]
    fn cooccurrence_is_symmetric(flags in prop::collection::vec((any::<bool>(), any::<bool>()), 1..20)) {
        let titles: Vec<String> = flags
            .iter()
            .map(|(alpha, beta)| {
                let mut title = String::from("headline");
                if *alpha {
                    title.push_str(" alpha");
                }
                if *beta {
                    title.push_str(" beta");
                }
                title
            })
            .collect();
        let batch = batch_of(titles);

        let forward = KeywordIndex::from_groups(vec![topic("alpha"), topic("beta")]);
        let reversed = KeywordIndex::from_groups(vec![topic("beta"), topic("alpha")]);

        let a = keyword_cooccur(&[&batch], &forward, 1, 10, &CancelToken::new()).unwrap();
        let b = keyword_cooccur(&[&batch], &reversed, 1, 10, &CancelToken::new()).unwrap();

        prop_assert_eq!(a.len(), b.len());
        if let (Some(pa), Some(pb)) = (a.first(), b.first()) {
            prop_assert_eq!(pa.count, pb.count);
            prop_assert!((pa.strength - pb.strength).abs() < 1e-12);
        }
    }
}

/// News for a single day is a subset of any containing range
#[tokio::test]
async fn single_day_is_subset_of_containing_range() {
    let corpus = FixtureCorpus::new();
    corpus.write_batch("2026-03-08", "080000", "echo", &["early story"]);
    corpus.write_batch("2026-03-09", "080000", "echo", &["middle story", "second item"]);
    corpus.write_batch("2026-03-10", "080000", "echo", &["late story"]);

    let store = FileCorpusStore::new(corpus.root());
    let day = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();

    let single = store
        .snapshot(Some(DateRange::single(day)), None)
        .await
        .unwrap();
    let wide = store
        .snapshot(
            Some(DateRange {
                start: NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(),
                end: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            }),
            None,
        )
        .await
        .unwrap();

    let wide_titles: std::collections::HashSet<&str> = wide
        .batches
        .iter()
        .flat_map(|b| b.items.iter().map(|i| i.title.as_str()))
        .collect();

    for batch in &single.batches {
        for item in &batch.items {
            assert!(wide_titles.contains(item.title.as_str()));
        }
    }
    assert!(single.item_count() < wide.item_count());
}
