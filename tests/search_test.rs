//! Integration tests for search, similarity and related-history operations

mod common;

use chrono::{TimeZone, Utc};
use common::{make_engine, FixtureCorpus};

use trendlens::engine::{
    QueryContext, RelatedHistoryParams, SearchParams, SimilarNewsParams,
};
use trendlens::error::Error;

const WORD_GROUPS: &str = "\
ai
artificial intelligence
";

fn ctx() -> QueryContext {
    QueryContext::new(Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap())
}

fn seeded_corpus() -> FixtureCorpus {
    let corpus = FixtureCorpus::new();
    corpus.write_batch(
        "2026-03-10",
        "080000",
        "echo",
        &[
            "Company X cuts prices on Model Y",
            "Artificial intelligence regulation advances",
            "Quiet day in markets",
        ],
    );
    corpus.write_batch(
        "2026-03-09",
        "080000",
        "drift",
        &[
            "Company X announces price cut for Model Y",
            "Weather improves across coastal regions",
        ],
    );
    corpus
}

#[tokio::test]
async fn keyword_search_matches_group_synonyms() {
    let corpus = seeded_corpus();
    let engine = make_engine(&corpus, WORD_GROUPS, &[]);

    let result = engine
        .search_news(
            SearchParams {
                query: "ai".to_string(),
                ..serde_json::from_str(r#"{"query": "ai"}"#).unwrap()
            },
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(result.total, 1);
    assert!(result.items[0]
        .item
        .title
        .contains("Artificial intelligence"));
    assert!((result.items[0].score - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn fuzzy_search_never_returns_below_threshold() {
    let corpus = seeded_corpus();
    let engine = make_engine(&corpus, WORD_GROUPS, &[]);

    let mut params: SearchParams = serde_json::from_str(r#"{"query": "price cut"}"#).unwrap();
    params.search_mode = "fuzzy".to_string();
    params.threshold = 0.2;
    params.date_range = Some(serde_json::from_str(r#"{"start": "2026-03-09", "end": "2026-03-10"}"#).unwrap());

    let result = engine.search_news(params, &ctx()).await.unwrap();
    assert!(!result.items.is_empty());
    assert!(result.items.iter().all(|r| r.score >= 0.2));
}

#[tokio::test]
async fn entity_search_requires_capitalized_span() {
    let corpus = seeded_corpus();
    let engine = make_engine(&corpus, WORD_GROUPS, &[]);

    let mut params: SearchParams = serde_json::from_str(r#"{"query": "Company X"}"#).unwrap();
    params.search_mode = "entity".to_string();

    let result = engine.search_news(params, &ctx()).await.unwrap();
    assert_eq!(result.total, 1);
    assert!(result.items[0].item.title.starts_with("Company X"));
}

#[tokio::test]
async fn search_rejects_unknown_mode_and_bad_threshold() {
    let corpus = seeded_corpus();
    let engine = make_engine(&corpus, WORD_GROUPS, &[]);

    let mut params: SearchParams = serde_json::from_str(r#"{"query": "x"}"#).unwrap();
    params.search_mode = "semantic".to_string();
    let err = engine.search_news(params, &ctx()).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedMode { .. }));

    let mut params: SearchParams = serde_json::from_str(r#"{"query": "x"}"#).unwrap();
    params.threshold = 2.0;
    let err = engine.search_news(params, &ctx()).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRangeParameter { .. }));
}

#[tokio::test]
async fn search_sort_by_date_is_recency_ordered() {
    let corpus = seeded_corpus();
    let engine = make_engine(&corpus, WORD_GROUPS, &[]);

    let mut params: SearchParams = serde_json::from_str(r#"{"query": "company x"}"#).unwrap();
    params.sort_by = "date".to_string();
    params.date_range =
        Some(serde_json::from_str(r#"{"start": "2026-03-09", "end": "2026-03-10"}"#).unwrap());

    let result = engine.search_news(params, &ctx()).await.unwrap();
    assert_eq!(result.total, 2);
    assert!(result.items[0].item.captured_at >= result.items[1].item.captured_at);
}

#[tokio::test]
async fn similar_news_scenario_price_cut() {
    let corpus = seeded_corpus();
    let engine = make_engine(&corpus, WORD_GROUPS, &[]);

    let result = engine
        .find_similar_news(
            SimilarNewsParams {
                reference_title: "Company X cuts prices on Model Y".to_string(),
                threshold: 0.4,
                limit: 50,
                include_url: false,
            },
            &ctx(),
        )
        .await
        .unwrap();

    // The paraphrased candidate scores >= 0.4; the zero-overlap title is out
    assert!(result
        .items
        .iter()
        .any(|r| r.item.title == "Company X announces price cut for Model Y" && r.score >= 0.4));
    assert!(!result
        .items
        .iter()
        .any(|r| r.item.title == "Weather improves across coastal regions"));
}

#[tokio::test]
async fn similar_news_rejects_out_of_range_threshold() {
    let corpus = seeded_corpus();
    let engine = make_engine(&corpus, WORD_GROUPS, &[]);

    let err = engine
        .find_similar_news(
            SimilarNewsParams {
                reference_title: "anything".to_string(),
                threshold: -0.2,
                limit: 50,
                include_url: false,
            },
            &ctx(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OutOfRangeParameter { .. }));
}

#[tokio::test]
async fn related_history_yesterday_with_distribution() {
    let corpus = seeded_corpus();
    let engine = make_engine(&corpus, WORD_GROUPS, &[]);

    let result = engine
        .search_related_news_history(
            RelatedHistoryParams {
                reference_text: "Company X cuts prices on Model Y".to_string(),
                time_preset: "yesterday".to_string(),
                date_range: None,
                threshold: 0.4,
                limit: 50,
                include_url: false,
            },
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(result.items.len(), 1);
    let day = chrono::NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
    assert_eq!(result.time_distribution[&day], 1);
}

#[tokio::test]
async fn related_history_custom_requires_range() {
    let corpus = seeded_corpus();
    let engine = make_engine(&corpus, WORD_GROUPS, &[]);

    let err = engine
        .search_related_news_history(
            RelatedHistoryParams {
                reference_text: "anything".to_string(),
                time_preset: "custom".to_string(),
                date_range: None,
                threshold: 0.4,
                limit: 50,
                include_url: false,
            },
            &ctx(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDateExpression(_)));

    let err = engine
        .search_related_news_history(
            RelatedHistoryParams {
                reference_text: "anything".to_string(),
                time_preset: "last_year".to_string(),
                date_range: None,
                threshold: 0.4,
                limit: 50,
                include_url: false,
            },
            &ctx(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedMode { .. }));
}
