//! Time-windowed aggregation over corpus snapshots
//!
//! The shared substrate for every analytical query: date-expression
//! resolution, query scopes, per-batch mention counting and chronological
//! [`TrendPoint`] series building. Aggregations over many batches check a
//! [`CancelToken`] at batch-iteration granularity so callers can impose
//! their own query-level timeout and cancellation.

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::keywords::{KeywordIndex, WordGroup};
use crate::models::{Batch, DateRange, MentionRecord, TrendPoint};
use crate::ranking::WeightModel;
use crate::store::CorpusSnapshot;

lazy_static::lazy_static! {
    static ref DAYS_AGO: Regex = Regex::new(r"^(\d{1,3})\s+days?\s+ago$").unwrap();
}

/// Cooperative cancellation flag shared between a caller and a running query
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Bail out of a long aggregation if the caller gave up
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Which slice of the corpus a query reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Most recent batch only
    Current,
    /// All batches captured on the target date, summed
    Daily(NaiveDate),
    /// All batches within an inclusive date range
    Range(DateRange),
}

impl Scope {
    /// Date range to request from the corpus store; `None` means "latest"
    /// and needs the full tree to find the newest batch date
    pub fn date_range(&self) -> Option<DateRange> {
        match self {
            Self::Current => None,
            Self::Daily(date) => Some(DateRange::single(*date)),
            Self::Range(range) => Some(*range),
        }
    }
}

/// Resolve a date expression against the caller-supplied current date
///
/// Accepted forms: `YYYY-MM-DD`, `YYYY/MM/DD`, `today`, `yesterday`,
/// `day before yesterday`, `N days ago`. Anything else fails with
/// [`Error::InvalidDateExpression`] rather than silently defaulting.
pub fn resolve_date_expr(expr: &str, today: NaiveDate) -> Result<NaiveDate> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidDateExpression("empty expression".to_string()));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y/%m/%d") {
        return Ok(date);
    }

    let lowered = trimmed.to_lowercase();
    match lowered.as_str() {
        "today" => return Ok(today),
        "yesterday" => return Ok(today - Duration::days(1)),
        "day before yesterday" => return Ok(today - Duration::days(2)),
        _ => {}
    }

    if let Some(caps) = DAYS_AGO.captures(&lowered) {
        let days: i64 = caps[1]
            .parse()
            .map_err(|_| Error::InvalidDateExpression(expr.to_string()))?;
        return Ok(today - Duration::days(days));
    }

    Err(Error::InvalidDateExpression(expr.to_string()))
}

/// Select the batches a scope covers, oldest first
pub fn batches_in_scope<'a>(snapshot: &'a CorpusSnapshot, scope: &Scope) -> Vec<&'a Batch> {
    match scope {
        Scope::Current => snapshot.latest_batch().into_iter().collect(),
        Scope::Daily(date) => snapshot.batches_on(*date),
        Scope::Range(range) => snapshot
            .batches
            .iter()
            .filter(|b| range.contains(b.captured_at.date_naive()))
            .collect(),
    }
}

/// Count of matching items and their rank-weighted score within one batch
fn batch_mentions(batch: &Batch, group: &WordGroup, weights: &WeightModel) -> (u64, f64) {
    let mut count = 0u64;
    let mut score = 0.0f64;
    for item in &batch.items {
        if group.matches(&item.title) {
            count += 1;
            score += weights.rank_weight(item.rank);
        }
    }
    (count, score)
}

/// Chronological per-batch mention series for one group
///
/// A zero-batch scope yields an empty series, not an error. Timestamps are
/// strictly increasing because batches are unique by capture time.
pub fn group_series(
    batches: &[&Batch],
    group: &WordGroup,
    weights: &WeightModel,
    cancel: &CancelToken,
) -> Result<Vec<TrendPoint>> {
    let mut series = Vec::with_capacity(batches.len());
    for batch in batches {
        cancel.checkpoint()?;
        let (count, score) = batch_mentions(batch, group, weights);
        series.push(TrendPoint {
            timestamp: batch.captured_at,
            mention_count: count,
            weighted_score: score,
        });
    }
    Ok(series)
}

/// Cumulative per-day totals for a series
pub fn daily_totals(series: &[TrendPoint]) -> BTreeMap<NaiveDate, u64> {
    let mut totals = BTreeMap::new();
    for point in series {
        *totals.entry(point.timestamp.date_naive()).or_insert(0u64) += point.mention_count;
    }
    totals
}

/// Per-batch series plus cumulative daily totals for one word group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupAggregate {
    pub group: String,
    pub series: Vec<TrendPoint>,
    pub daily_totals: BTreeMap<NaiveDate, u64>,
    pub total_mentions: u64,
    pub total_weighted: f64,
}

/// Aggregate every configured word group over the scoped batches
pub fn aggregate_groups(
    snapshot: &CorpusSnapshot,
    index: &KeywordIndex,
    scope: &Scope,
    weights: &WeightModel,
    cancel: &CancelToken,
) -> Result<Vec<GroupAggregate>> {
    let batches = batches_in_scope(snapshot, scope);
    let mut aggregates = Vec::with_capacity(index.len());

    for group in index.groups() {
        let series = group_series(&batches, group, weights, cancel)?;
        let total_mentions = series.iter().map(|p| p.mention_count).sum();
        let total_weighted = series.iter().map(|p| p.weighted_score).sum();
        aggregates.push(GroupAggregate {
            group: group.name.clone(),
            daily_totals: daily_totals(&series),
            series,
            total_mentions,
            total_weighted,
        });
    }

    Ok(aggregates)
}

/// Per (date, platform, group) mention records across the scoped batches
pub fn mention_records(
    snapshot: &CorpusSnapshot,
    index: &KeywordIndex,
    scope: &Scope,
    weights: &WeightModel,
    cancel: &CancelToken,
) -> Result<Vec<MentionRecord>> {
    let batches = batches_in_scope(snapshot, scope);
    let mut acc: BTreeMap<(NaiveDate, String, String), (u64, f64)> = BTreeMap::new();

    for batch in batches {
        cancel.checkpoint()?;
        let date = batch.captured_at.date_naive();
        for item in &batch.items {
            for group in index.groups() {
                if group.matches(&item.title) {
                    let key = (date, item.platform_id.clone(), group.name.clone());
                    let entry = acc.entry(key).or_insert((0, 0.0));
                    entry.0 += 1;
                    entry.1 += weights.rank_weight(item.rank);
                }
            }
        }
    }

    Ok(acc
        .into_iter()
        .map(|((date, platform_id, group), (count, weighted_score))| MentionRecord {
            date,
            platform_id,
            group,
            count,
            weighted_score,
        })
        .collect())
}
