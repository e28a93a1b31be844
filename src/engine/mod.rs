//! Operation facade for the analytics engine
//!
//! Queries enter here with typed parameters, are validated and clamped at
//! the boundary, resolve a date/topic scope against the corpus store via
//! the aggregation layer, and are routed to the trend, insights, search or
//! sentiment engines. Results carry a `partial_failures` list: once a query
//! begins aggregating, an unreadable platform degrades gracefully instead
//! of failing the whole query.
//!
//! The engine is read-mostly and stateless per query beyond the immutable
//! corpus snapshot and word-group snapshot taken at entry, so concurrent
//! queries need no mutual exclusion on the read path.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::aggregate::{
    aggregate_groups, batches_in_scope, group_series, resolve_date_expr, CancelToken, Scope,
};
use crate::analytics::insights::{
    keyword_cooccur, platform_activity, platform_compare, CooccurrencePair, InsightType,
    PlatformActivity, PlatformShare,
};
use crate::analytics::sentiment::{analyze_sentiment, SentimentDistribution, WeightedNews};
use crate::analytics::trend::{analyze, AnalysisParams, AnalysisType, TrendAnalysis};
use crate::cache::{CacheStats, OptionalSeriesCache, SeriesCache};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::keywords::{KeywordIndex, KeywordIndexHandle};
use crate::models::{DateRange, NewsItem, PlatformFailure, ScoredItem};
use crate::ranking::WeightModel;
use crate::report::{HighlightRow, ReportData, ReportRenderer, ReportType, TopicRow};
use crate::search::{
    score_item, score_similar, sort_by_score_then_recency, time_distribution, tokenize,
    SearchMode, SortBy, TimePreset,
};
use crate::store::{CorpusSnapshot, CorpusStore, FileCorpusStore};

/// Hard caps from the operation contracts
const MAX_NEWS_LIMIT: usize = 1000;
const MAX_SCORED_LIMIT: usize = 100;
const MAX_TOP_N: usize = 100;

/// Default lookback for trend and insight scopes, in days
const DEFAULT_LOOKBACK_DAYS: i64 = 7;

/// Lookback for similar-news candidate generation, in days
const SIMILAR_LOOKBACK_DAYS: i64 = 30;

/// Upper bound on waiting for a persisted crawl confirmation
const CRAWL_CONFIRM_TIMEOUT_SECS: u64 = 60;

/// Per-query context supplied by the caller
///
/// Relative date expressions resolve against `now`; the cancel token is
/// checked at batch-iteration granularity during long aggregations.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub now: DateTime<Utc>,
    pub cancel: CancelToken,
}

impl QueryContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(now: DateTime<Utc>, cancel: CancelToken) -> Self {
        Self { now, cancel }
    }

    fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// Hand-off seam to the external crawling collaborator
///
/// The engine never blocks on crawl completion when only historical data is
/// requested; `trigger_crawl` is fire-and-forget unless the caller asked
/// for persisted confirmation.
#[async_trait]
pub trait CrawlTrigger: Send + Sync {
    /// Request a crawl of one platform. With `persist` set, return only once
    /// the platform's batch is durably written.
    async fn trigger(&self, platform: &str, persist: bool) -> Result<()>;
}

/// Per-platform outcome of a crawl request
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CrawlReceipt {
    pub accepted: Vec<String>,
    pub failed: Vec<PlatformFailure>,
}

// ---------------------------------------------------------------------------
// Operation parameters
// ---------------------------------------------------------------------------

fn default_limit() -> usize {
    50
}
fn default_true() -> bool {
    true
}
fn default_top_n() -> usize {
    10
}
fn default_insight_top_n() -> usize {
    20
}
fn default_min_frequency() -> u64 {
    3
}
fn default_mode_current() -> String {
    "current".to_string()
}
fn default_analysis_trend() -> String {
    "trend".to_string()
}
fn default_insight_compare() -> String {
    "platform_compare".to_string()
}
fn default_search_keyword() -> String {
    "keyword".to_string()
}
fn default_sort_relevance() -> String {
    "relevance".to_string()
}
fn default_preset_yesterday() -> String {
    "yesterday".to_string()
}
fn default_report_daily() -> String {
    "daily".to_string()
}
fn default_surge_threshold() -> f64 {
    3.0
}
fn default_time_window() -> u32 {
    24
}
fn default_lookahead() -> u32 {
    6
}
fn default_confidence() -> f64 {
    0.7
}
fn default_similarity_threshold() -> f64 {
    0.6
}
fn default_relatedness_threshold() -> f64 {
    0.4
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestNewsParams {
    pub platforms: Option<Vec<String>>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub include_url: bool,
}

impl Default for LatestNewsParams {
    fn default() -> Self {
        Self {
            platforms: None,
            limit: default_limit(),
            include_url: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsByDateParams {
    /// Natural-language expressions are accepted here and only here
    pub date_expr: Option<String>,
    pub platforms: Option<Vec<String>>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub include_url: bool,
}

impl Default for NewsByDateParams {
    fn default() -> Self {
        Self {
            date_expr: None,
            platforms: None,
            limit: default_limit(),
            include_url: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendingTopicsParams {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_mode_current")]
    pub mode: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicTrendParams {
    pub topic: String,
    #[serde(default = "default_analysis_trend")]
    pub analysis_type: String,
    pub date_range: Option<DateRange>,
    #[serde(default = "default_surge_threshold")]
    pub threshold: f64,
    #[serde(default = "default_time_window")]
    pub time_window: u32,
    #[serde(default = "default_lookahead")]
    pub lookahead_hours: u32,
    #[serde(default = "default_confidence")]
    pub confidence_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataInsightsParams {
    #[serde(default = "default_insight_compare")]
    pub insight_type: String,
    pub topic: Option<String>,
    pub date_range: Option<DateRange>,
    #[serde(default = "default_min_frequency")]
    pub min_frequency: u64,
    #[serde(default = "default_insight_top_n")]
    pub top_n: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentimentParams {
    pub topic: Option<String>,
    pub platforms: Option<Vec<String>>,
    pub date_range: Option<DateRange>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_true")]
    pub sort_by_weight: bool,
    #[serde(default)]
    pub include_url: bool,
}

impl Default for SentimentParams {
    fn default() -> Self {
        Self {
            topic: None,
            platforms: None,
            date_range: None,
            limit: default_limit(),
            sort_by_weight: true,
            include_url: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimilarNewsParams {
    pub reference_title: String,
    #[serde(default = "default_similarity_threshold")]
    pub threshold: f64,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub include_url: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_search_keyword")]
    pub search_mode: String,
    pub date_range: Option<DateRange>,
    pub platforms: Option<Vec<String>>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_sort_relevance")]
    pub sort_by: String,
    #[serde(default = "default_similarity_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub include_url: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedHistoryParams {
    pub reference_text: String,
    #[serde(default = "default_preset_yesterday")]
    pub time_preset: String,
    /// Required when `time_preset` is "custom"
    pub date_range: Option<DateRange>,
    #[serde(default = "default_relatedness_threshold")]
    pub threshold: f64,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub include_url: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryReportParams {
    #[serde(default = "default_report_daily")]
    pub report_type: String,
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerCrawlParams {
    pub platforms: Option<Vec<String>>,
    #[serde(default)]
    pub save_to_local: bool,
}

// ---------------------------------------------------------------------------
// Operation results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct NewsListResult {
    pub items: Vec<NewsItem>,
    pub total: usize,
    pub partial_failures: Vec<PlatformFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicCount {
    pub group: String,
    pub count: u64,
    pub weighted_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendingTopicsResult {
    pub mode: String,
    pub topics: Vec<TopicCount>,
    pub partial_failures: Vec<PlatformFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicTrendResult {
    #[serde(flatten)]
    pub analysis: TrendAnalysis,
    pub from_cache: bool,
    pub partial_failures: Vec<PlatformFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "insight_type", rename_all = "snake_case")]
pub enum InsightReport {
    PlatformCompare {
        topic: String,
        platforms: Vec<PlatformShare>,
    },
    PlatformActivity {
        platforms: Vec<PlatformActivity>,
    },
    KeywordCooccur {
        pairs: Vec<CooccurrencePair>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct DataInsightsResult {
    #[serde(flatten)]
    pub insight: InsightReport,
    pub partial_failures: Vec<PlatformFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentResult {
    pub distribution: SentimentDistribution,
    pub items: Vec<WeightedNews>,
    pub partial_failures: Vec<PlatformFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredListResult {
    pub items: Vec<ScoredItem>,
    pub total: usize,
    pub partial_failures: Vec<PlatformFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedHistoryResult {
    pub items: Vec<ScoredItem>,
    pub time_distribution: BTreeMap<NaiveDate, u64>,
    pub range: DateRange,
    pub partial_failures: Vec<PlatformFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReportResult {
    pub report_type: String,
    pub range: DateRange,
    pub markdown: String,
    pub partial_failures: Vec<PlatformFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub corpus_dates: Vec<NaiveDate>,
    pub batch_count: usize,
    pub item_count: usize,
    pub word_groups: usize,
    pub cache: CacheStats,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The trend & search analytics engine
pub struct Engine {
    config: EngineConfig,
    store: Arc<dyn CorpusStore>,
    keywords: KeywordIndexHandle,
    weights: WeightModel,
    cache: OptionalSeriesCache,
    crawler: Option<Arc<dyn CrawlTrigger>>,
}

impl Engine {
    /// Assemble an engine from pre-built parts
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn CorpusStore>,
        keywords: KeywordIndexHandle,
    ) -> Self {
        let weights = WeightModel::from_config(&config.ranking);
        let cache = if config.cache.enabled {
            OptionalSeriesCache::enabled(config.cache.max_entries)
        } else {
            OptionalSeriesCache::disabled()
        };
        Self {
            config,
            store,
            keywords,
            weights,
            cache,
            crawler: None,
        }
    }

    /// Build an engine from configuration: file-backed corpus store plus
    /// word groups loaded from disk. A word-group load failure is fatal.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::config(e.to_string()))?;
        let index = KeywordIndex::load(&config.corpus.word_groups_path)?;
        let store = Arc::new(FileCorpusStore::new(config.corpus.data_dir.clone()));
        Ok(Self::new(config, store, KeywordIndexHandle::new(index)))
    }

    /// Wire the external crawling collaborator
    pub fn with_crawler(mut self, crawler: Arc<dyn CrawlTrigger>) -> Self {
        self.crawler = Some(crawler);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn keywords(&self) -> &KeywordIndexHandle {
        &self.keywords
    }

    // -- boundary validation helpers ---------------------------------------

    fn clamp_limit(limit: usize, max: usize) -> usize {
        limit.clamp(1, max)
    }

    fn check_unit_range(name: &'static str, value: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&value) {
            return Err(Error::out_of_range(name, value, "[0, 1]"));
        }
        Ok(())
    }

    fn check_topic(topic: &str) -> Result<()> {
        if topic.trim().is_empty() {
            return Err(Error::other("topic must not be empty"));
        }
        Ok(())
    }

    /// Order items the way lists are presented: newest batch first, then
    /// platform id, then rank
    fn order_items(items: &mut [NewsItem]) {
        items.sort_by(|a, b| {
            b.captured_at
                .cmp(&a.captured_at)
                .then_with(|| a.platform_id.cmp(&b.platform_id))
                .then_with(|| a.rank.cmp(&b.rank))
        });
    }

    fn strip_urls(items: &mut [NewsItem]) {
        for item in items {
            item.url = None;
        }
    }

    async fn snapshot(
        &self,
        range: Option<DateRange>,
        platforms: Option<&[String]>,
    ) -> Result<CorpusSnapshot> {
        self.store.snapshot(range, platforms).await
    }

    // -- operations --------------------------------------------------------

    /// Latest batch of crawled news
    pub async fn latest_news(
        &self,
        params: LatestNewsParams,
        ctx: &QueryContext,
    ) -> Result<NewsListResult> {
        let limit = Self::clamp_limit(params.limit, MAX_NEWS_LIMIT);
        let snapshot = self
            .snapshot(None, params.platforms.as_deref())
            .await?;
        ctx.cancel.checkpoint()?;

        let mut items: Vec<NewsItem> = snapshot
            .latest_batch()
            .map(|b| b.items.clone())
            .unwrap_or_default();
        Self::order_items(&mut items);
        items.truncate(limit);
        if !params.include_url {
            Self::strip_urls(&mut items);
        }

        Ok(NewsListResult {
            total: items.len(),
            items,
            partial_failures: snapshot.failures,
        })
    }

    /// News for one date, resolved from an explicit or relative expression
    pub async fn news_by_date(
        &self,
        params: NewsByDateParams,
        ctx: &QueryContext,
    ) -> Result<NewsListResult> {
        let limit = Self::clamp_limit(params.limit, MAX_NEWS_LIMIT);
        let expr = params.date_expr.as_deref().unwrap_or("today");
        let date = resolve_date_expr(expr, ctx.today())?;

        let snapshot = self
            .snapshot(Some(DateRange::single(date)), params.platforms.as_deref())
            .await?;
        ctx.cancel.checkpoint()?;

        let mut items: Vec<NewsItem> = snapshot
            .batches
            .iter()
            .flat_map(|b| b.items.iter().cloned())
            .collect();
        Self::order_items(&mut items);
        items.truncate(limit);
        if !params.include_url {
            Self::strip_urls(&mut items);
        }

        Ok(NewsListResult {
            total: items.len(),
            items,
            partial_failures: snapshot.failures,
        })
    }

    /// Attention word-group frequency ranking
    pub async fn trending_topics(
        &self,
        params: TrendingTopicsParams,
        ctx: &QueryContext,
    ) -> Result<TrendingTopicsResult> {
        let top_n = Self::clamp_limit(params.top_n, MAX_TOP_N);
        let scope = match params.mode.as_str() {
            "current" => Scope::Current,
            "daily" => Scope::Daily(ctx.today()),
            other => return Err(Error::unsupported("mode", other)),
        };

        let snapshot = self.snapshot(scope.date_range(), None).await?;
        let index = self.keywords.snapshot();
        let aggregates = aggregate_groups(&snapshot, &index, &scope, &self.weights, &ctx.cancel)?;

        let mut topics: Vec<TopicCount> = aggregates
            .into_iter()
            .map(|a| TopicCount {
                group: a.group,
                count: a.total_mentions,
                weighted_score: a.total_weighted,
            })
            .collect();
        topics.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.group.cmp(&b.group))
        });
        topics.truncate(top_n);

        Ok(TrendingTopicsResult {
            mode: params.mode,
            topics,
            partial_failures: snapshot.failures,
        })
    }

    /// Unified topic trend analysis (trend / lifecycle / viral / predict)
    pub async fn analyze_topic_trend(
        &self,
        params: TopicTrendParams,
        ctx: &QueryContext,
    ) -> Result<TopicTrendResult> {
        Self::check_topic(&params.topic)?;
        let analysis_type = AnalysisType::from_str(&params.analysis_type)?;
        if params.threshold <= 0.0 {
            return Err(Error::out_of_range(
                "threshold",
                params.threshold,
                "(0, inf)",
            ));
        }
        Self::check_unit_range("confidence_threshold", params.confidence_threshold)?;
        let time_window = params.time_window.clamp(1, 24 * 30);

        let range = params.date_range.unwrap_or_else(|| DateRange {
            start: ctx.today() - Duration::days(DEFAULT_LOOKBACK_DAYS - 1),
            end: ctx.today(),
        });
        let scope = Scope::Range(range);

        let snapshot = self.snapshot(Some(range), None).await?;
        let index = self.keywords.snapshot();
        let group = index.resolve_topic(&params.topic);

        let cache_key = SeriesCache::cache_key(&group.name, "range", Some(range), None);
        let newest = snapshot.newest_batch_id().map(str::to_string);

        let (series, from_cache) = match self.cache.get(&cache_key, newest.as_deref()) {
            Some(series) => (series, true),
            None => {
                let batches = batches_in_scope(&snapshot, &scope);
                let series = group_series(&batches, &group, &self.weights, &ctx.cancel)?;
                if let Some(newest) = newest {
                    self.cache.put(cache_key, series.clone(), newest);
                }
                (series, false)
            }
        };
        let stats = self.cache.stats();
        crate::metrics::record_cache_stats(stats.hits, stats.misses);

        let analysis = analyze(
            &params.topic,
            analysis_type,
            series,
            &AnalysisParams {
                threshold: params.threshold,
                time_window_hours: time_window,
                lookahead_hours: params.lookahead_hours,
                confidence_threshold: params.confidence_threshold,
            },
        );

        Ok(TopicTrendResult {
            analysis,
            from_cache,
            partial_failures: snapshot.failures,
        })
    }

    /// Unified data insights (platform comparison / activity / co-occurrence)
    pub async fn analyze_data_insights(
        &self,
        params: DataInsightsParams,
        ctx: &QueryContext,
    ) -> Result<DataInsightsResult> {
        let insight_type = InsightType::from_str(&params.insight_type)?;
        let top_n = Self::clamp_limit(params.top_n, MAX_TOP_N);
        let min_frequency = params.min_frequency.max(1);

        let range = params.date_range.unwrap_or_else(|| DateRange {
            start: ctx.today() - Duration::days(DEFAULT_LOOKBACK_DAYS - 1),
            end: ctx.today(),
        });
        let snapshot = self.snapshot(Some(range), None).await?;
        let scope = Scope::Range(range);
        let batches = batches_in_scope(&snapshot, &scope);
        ctx.cancel.checkpoint()?;

        let insight = match insight_type {
            InsightType::PlatformCompare => {
                let topic = params
                    .topic
                    .as_deref()
                    .ok_or_else(|| Error::other("topic is required for platform_compare"))?;
                Self::check_topic(topic)?;
                let index = self.keywords.snapshot();
                let group = index.resolve_topic(topic);
                // Configured platforms first; fall back to what the corpus saw
                let mut platforms = self.config.platform_ids();
                if platforms.is_empty() {
                    platforms = snapshot.platform_ids();
                }
                InsightReport::PlatformCompare {
                    topic: topic.to_string(),
                    platforms: platform_compare(&batches, &group, &platforms),
                }
            }
            InsightType::PlatformActivity => InsightReport::PlatformActivity {
                platforms: platform_activity(&batches),
            },
            InsightType::KeywordCooccur => {
                let index = self.keywords.snapshot();
                InsightReport::KeywordCooccur {
                    pairs: keyword_cooccur(&batches, &index, min_frequency, top_n, &ctx.cancel)?,
                }
            }
        };

        Ok(DataInsightsResult {
            insight,
            partial_failures: snapshot.failures,
        })
    }

    /// Sentiment distribution plus popularity-weighted ranking
    pub async fn analyze_sentiment(
        &self,
        params: SentimentParams,
        ctx: &QueryContext,
    ) -> Result<SentimentResult> {
        let limit = Self::clamp_limit(params.limit, MAX_SCORED_LIMIT);
        let range = params
            .date_range
            .unwrap_or_else(|| DateRange::single(ctx.today()));

        let snapshot = self
            .snapshot(Some(range), params.platforms.as_deref())
            .await?;
        ctx.cancel.checkpoint()?;

        let index = self.keywords.snapshot();
        let topic_group = match &params.topic {
            Some(topic) => {
                Self::check_topic(topic)?;
                Some(index.resolve_topic(topic))
            }
            None => None,
        };

        let items: Vec<&NewsItem> = snapshot
            .batches
            .iter()
            .flat_map(|b| b.items.iter())
            .filter(|item| {
                topic_group
                    .as_ref()
                    .map_or(true, |g| g.matches(&item.title))
            })
            .collect();

        let (distribution, mut ranked) = analyze_sentiment(
            &items,
            &self.weights,
            ctx.now,
            params.sort_by_weight,
            limit,
        );
        if !params.include_url {
            for news in &mut ranked {
                news.item.url = None;
            }
        }

        Ok(SentimentResult {
            distribution,
            items: ranked,
            partial_failures: snapshot.failures,
        })
    }

    /// Titles similar to a reference title, blended-score ranked
    pub async fn find_similar_news(
        &self,
        params: SimilarNewsParams,
        ctx: &QueryContext,
    ) -> Result<ScoredListResult> {
        Self::check_unit_range("threshold", params.threshold)?;
        let limit = Self::clamp_limit(params.limit, MAX_SCORED_LIMIT);
        if params.reference_title.trim().is_empty() {
            return Err(Error::other("reference_title must not be empty"));
        }

        let range = DateRange {
            start: ctx.today() - Duration::days(SIMILAR_LOOKBACK_DAYS - 1),
            end: ctx.today(),
        };
        let snapshot = self.snapshot(Some(range), None).await?;

        let reference = tokenize(&params.reference_title);
        let mut results = Vec::new();
        for batch in &snapshot.batches {
            ctx.cancel.checkpoint()?;
            for item in &batch.items {
                if let Some(scored) =
                    score_similar(item, &reference, params.threshold, "similar")
                {
                    results.push(scored);
                }
            }
        }
        sort_by_score_then_recency(&mut results);
        results.truncate(limit);
        if !params.include_url {
            for scored in &mut results {
                scored.item.url = None;
            }
        }

        Ok(ScoredListResult {
            total: results.len(),
            items: results,
            partial_failures: snapshot.failures,
        })
    }

    /// Unified search (keyword / fuzzy / entity)
    pub async fn search_news(
        &self,
        params: SearchParams,
        ctx: &QueryContext,
    ) -> Result<ScoredListResult> {
        let mode = SearchMode::from_str(&params.search_mode)?;
        let sort_by = SortBy::from_str(&params.sort_by)?;
        Self::check_unit_range("threshold", params.threshold)?;
        let limit = Self::clamp_limit(params.limit, MAX_NEWS_LIMIT);
        if params.query.trim().is_empty() {
            return Err(Error::other("query must not be empty"));
        }

        let range = params
            .date_range
            .unwrap_or_else(|| DateRange::single(ctx.today()));
        let snapshot = self
            .snapshot(Some(range), params.platforms.as_deref())
            .await?;

        let index = self.keywords.snapshot();
        let query_tokens = tokenize(&params.query);
        let mut results = Vec::new();
        for batch in &snapshot.batches {
            ctx.cancel.checkpoint()?;
            for item in &batch.items {
                if let Some(scored) = score_item(
                    item,
                    &params.query,
                    &query_tokens,
                    mode,
                    params.threshold,
                    &index,
                ) {
                    results.push(scored);
                }
            }
        }

        match sort_by {
            SortBy::Relevance => sort_by_score_then_recency(&mut results),
            SortBy::Weight => {
                let weights = &self.weights;
                let now = ctx.now;
                results.sort_by(|a, b| {
                    let wa = weights.item_weight(&a.item, now);
                    let wb = weights.item_weight(&b.item, now);
                    wb.partial_cmp(&wa)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| {
                            b.score
                                .partial_cmp(&a.score)
                                .unwrap_or(std::cmp::Ordering::Equal)
                        })
                });
            }
            SortBy::Date => {
                results.sort_by(|a, b| b.item.captured_at.cmp(&a.item.captured_at));
            }
        }
        results.truncate(limit);
        if !params.include_url {
            for scored in &mut results {
                scored.item.url = None;
            }
        }

        Ok(ScoredListResult {
            total: results.len(),
            items: results,
            partial_failures: snapshot.failures,
        })
    }

    /// Related news in historical data, with a per-date distribution
    pub async fn search_related_news_history(
        &self,
        params: RelatedHistoryParams,
        ctx: &QueryContext,
    ) -> Result<RelatedHistoryResult> {
        let preset = TimePreset::from_str(&params.time_preset)?;
        Self::check_unit_range("threshold", params.threshold)?;
        let limit = Self::clamp_limit(params.limit, MAX_SCORED_LIMIT);
        if params.reference_text.trim().is_empty() {
            return Err(Error::other("reference_text must not be empty"));
        }

        let today = ctx.today();
        let range = match preset {
            TimePreset::Yesterday => DateRange::single(today - Duration::days(1)),
            TimePreset::LastWeek => DateRange {
                start: today - Duration::days(7),
                end: today,
            },
            TimePreset::LastMonth => DateRange {
                start: today - Duration::days(30),
                end: today,
            },
            TimePreset::Custom => params.date_range.ok_or_else(|| {
                Error::InvalidDateExpression(
                    "custom time preset requires an explicit date_range".to_string(),
                )
            })?,
        };

        let snapshot = self.snapshot(Some(range), None).await?;
        let reference = tokenize(&params.reference_text);
        let mut results = Vec::new();
        for batch in &snapshot.batches {
            ctx.cancel.checkpoint()?;
            for item in &batch.items {
                if let Some(scored) =
                    score_similar(item, &reference, params.threshold, "related")
                {
                    results.push(scored);
                }
            }
        }
        sort_by_score_then_recency(&mut results);
        results.truncate(limit);
        if !params.include_url {
            for scored in &mut results {
                scored.item.url = None;
            }
        }

        Ok(RelatedHistoryResult {
            time_distribution: time_distribution(&results),
            items: results,
            range,
            partial_failures: snapshot.failures,
        })
    }

    /// Daily/weekly markdown summary report
    pub async fn generate_summary_report(
        &self,
        params: SummaryReportParams,
        ctx: &QueryContext,
    ) -> Result<SummaryReportResult> {
        let report_type = ReportType::from_str(&params.report_type)?;
        let range = params.date_range.unwrap_or_else(|| DateRange {
            start: ctx.today() - Duration::days(report_type.default_days() - 1),
            end: ctx.today(),
        });

        let snapshot = self.snapshot(Some(range), None).await?;
        let index = self.keywords.snapshot();
        let scope = Scope::Range(range);
        let aggregates =
            aggregate_groups(&snapshot, &index, &scope, &self.weights, &ctx.cancel)?;

        let mut top_topics: Vec<_> = aggregates
            .into_iter()
            .filter(|a| a.total_mentions > 0)
            .collect();
        top_topics.sort_by(|a, b| {
            b.total_mentions
                .cmp(&a.total_mentions)
                .then_with(|| a.group.cmp(&b.group))
        });
        let topics: Vec<TopicRow> = top_topics
            .iter()
            .take(10)
            .enumerate()
            .map(|(i, a)| TopicRow {
                position: i + 1,
                name: a.group.clone(),
                mentions: a.total_mentions,
            })
            .collect();

        // Highest-weighted headlines across the range, one per title
        let mut seen = std::collections::HashSet::new();
        let mut weighted: Vec<(&NewsItem, f64)> = snapshot
            .batches
            .iter()
            .flat_map(|b| b.items.iter())
            .map(|item| (item, self.weights.item_weight(item, ctx.now)))
            .collect();
        weighted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let highlights: Vec<HighlightRow> = weighted
            .into_iter()
            .filter(|(item, _)| seen.insert(item.title.to_lowercase()))
            .take(10)
            .map(|(item, weight)| HighlightRow {
                title: item.title.clone(),
                platform: self.config.platform_name(&item.platform_id),
                weight: format!("{weight:.2}"),
            })
            .collect();

        let renderer = ReportRenderer::new()?;
        let markdown = renderer.render(&ReportData {
            title: report_type.title().to_string(),
            start: range.start,
            end: range.end,
            generated_at: ctx.now.format("%Y-%m-%d %H:%M").to_string(),
            batch_count: snapshot.batches.len(),
            topics,
            highlights,
        })?;

        Ok(SummaryReportResult {
            report_type: params.report_type,
            range,
            markdown,
            partial_failures: snapshot.failures,
        })
    }

    /// Engine and corpus health summary
    pub async fn system_status(&self) -> Result<SystemStatus> {
        let snapshot = self.snapshot(None, None).await?;
        Ok(SystemStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            corpus_dates: snapshot.dates(),
            batch_count: snapshot.batches.len(),
            item_count: snapshot.item_count(),
            word_groups: self.keywords.snapshot().len(),
            cache: self.cache.stats(),
        })
    }

    /// Hand a crawl off to the external collaborator
    ///
    /// Fire-and-forget unless `save_to_local` asks for persisted
    /// confirmation, in which case the wait is bounded.
    pub async fn trigger_crawl(&self, params: TriggerCrawlParams) -> Result<CrawlReceipt> {
        let crawler = self
            .crawler
            .clone()
            .ok_or_else(|| Error::UpstreamUnavailable("no crawling collaborator wired".into()))?;

        let platforms = params
            .platforms
            .unwrap_or_else(|| self.config.platform_ids());
        if platforms.is_empty() {
            return Err(Error::other("no platforms configured or requested"));
        }

        if params.save_to_local {
            let outcomes = tokio::time::timeout(
                std::time::Duration::from_secs(CRAWL_CONFIRM_TIMEOUT_SECS),
                futures::future::join_all(platforms.iter().map(|p| crawler.trigger(p, true))),
            )
            .await
            .map_err(|_| {
                Error::UpstreamUnavailable("crawl confirmation timed out".to_string())
            })?;

            // join_all preserves input order, so outcomes line up with platforms
            let mut receipt = CrawlReceipt::default();
            for (platform_id, outcome) in platforms.iter().zip(outcomes) {
                match outcome {
                    Ok(()) => receipt.accepted.push(platform_id.clone()),
                    Err(e) => receipt.failed.push(PlatformFailure {
                        platform_id: platform_id.clone(),
                        reason: e.to_string(),
                    }),
                }
            }
            return Ok(receipt);
        }

        let accepted = platforms.clone();
        tokio::spawn(async move {
            let outcomes =
                futures::future::join_all(platforms.iter().map(|p| crawler.trigger(p, false)))
                    .await;
            for (platform, outcome) in platforms.iter().zip(outcomes) {
                if let Err(e) = outcome {
                    tracing::warn!(platform = %platform, error = %e, "Fire-and-forget crawl failed");
                }
            }
        });

        Ok(CrawlReceipt {
            accepted,
            failed: Vec::new(),
        })
    }

    /// Dispatch a named operation with JSON parameters
    ///
    /// This is the boundary the remote tool surface calls through; it
    /// records per-operation metrics and serializes results.
    pub async fn execute(
        &self,
        operation: &str,
        params: serde_json::Value,
        ctx: &QueryContext,
    ) -> Result<serde_json::Value> {
        let started = std::time::Instant::now();
        let result = self.dispatch(operation, params, ctx).await;
        let status = match &result {
            Ok(_) => "ok",
            Err(e) => e.category().as_str(),
        };
        crate::metrics::record_query(operation, status, started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            tracing::warn!(op = %operation, error = %e, "Query failed");
        }
        result
    }

    async fn dispatch(
        &self,
        operation: &str,
        params: serde_json::Value,
        ctx: &QueryContext,
    ) -> Result<serde_json::Value> {
        fn to_json<T: Serialize>(value: T) -> Result<serde_json::Value> {
            Ok(serde_json::to_value(value)?)
        }

        match operation {
            "get_latest_news" => {
                to_json(self.latest_news(serde_json::from_value(params)?, ctx).await?)
            }
            "get_news_by_date" => {
                to_json(self.news_by_date(serde_json::from_value(params)?, ctx).await?)
            }
            "get_trending_topics" => to_json(
                self.trending_topics(serde_json::from_value(params)?, ctx)
                    .await?,
            ),
            "analyze_topic_trend" => to_json(
                self.analyze_topic_trend(serde_json::from_value(params)?, ctx)
                    .await?,
            ),
            "analyze_data_insights" => to_json(
                self.analyze_data_insights(serde_json::from_value(params)?, ctx)
                    .await?,
            ),
            "analyze_sentiment" => to_json(
                self.analyze_sentiment(serde_json::from_value(params)?, ctx)
                    .await?,
            ),
            "find_similar_news" => to_json(
                self.find_similar_news(serde_json::from_value(params)?, ctx)
                    .await?,
            ),
            "search_news" => {
                to_json(self.search_news(serde_json::from_value(params)?, ctx).await?)
            }
            "search_related_news_history" => to_json(
                self.search_related_news_history(serde_json::from_value(params)?, ctx)
                    .await?,
            ),
            "generate_summary_report" => to_json(
                self.generate_summary_report(serde_json::from_value(params)?, ctx)
                    .await?,
            ),
            "get_system_status" => to_json(self.system_status().await?),
            "trigger_crawl" => {
                to_json(self.trigger_crawl(serde_json::from_value(params)?).await?)
            }
            other => Err(Error::unsupported("operation", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_defaults() {
        let params: SearchParams = serde_json::from_str(r#"{"query": "rust"}"#).unwrap();
        assert_eq!(params.search_mode, "keyword");
        assert_eq!(params.sort_by, "relevance");
        assert_eq!(params.limit, 50);
        assert!((params.threshold - 0.6).abs() < 1e-9);

        let params: TopicTrendParams = serde_json::from_str(r#"{"topic": "rust"}"#).unwrap();
        assert_eq!(params.analysis_type, "trend");
        assert_eq!(params.time_window, 24);
        assert!((params.confidence_threshold - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_default_matches_empty_json() {
        // Constructed defaults and deserialized-empty-object defaults agree
        let from_json: LatestNewsParams = serde_json::from_str("{}").unwrap();
        let built = LatestNewsParams::default();
        assert_eq!(from_json.limit, built.limit);
        assert_eq!(from_json.include_url, built.include_url);

        let from_json: SentimentParams = serde_json::from_str("{}").unwrap();
        let built = SentimentParams::default();
        assert_eq!(from_json.limit, built.limit);
        assert_eq!(from_json.sort_by_weight, built.sort_by_weight);
    }

    #[test]
    fn test_missing_required_param_is_rejected() {
        let result: std::result::Result<TopicTrendParams, _> = serde_json::from_str("{}");
        assert!(result.is_err());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(Engine::clamp_limit(0, 1000), 1);
        assert_eq!(Engine::clamp_limit(50, 1000), 50);
        assert_eq!(Engine::clamp_limit(5000, 1000), 1000);
    }

    #[test]
    fn test_check_unit_range() {
        assert!(Engine::check_unit_range("threshold", 0.5).is_ok());
        assert!(Engine::check_unit_range("threshold", -0.1).is_err());
        assert!(Engine::check_unit_range("threshold", 1.1).is_err());
    }

    #[test]
    fn test_date_range_param_round_trip() {
        let json = r#"{"start": "2026-03-01", "end": "2026-03-07"}"#;
        let range: DateRange = serde_json::from_str(json).unwrap();
        let back = serde_json::to_string(&range).unwrap();
        let again: DateRange = serde_json::from_str(&back).unwrap();
        assert_eq!(range, again);
    }
}
