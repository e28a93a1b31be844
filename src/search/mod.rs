//! Multi-mode search and relatedness scoring over raw news items
//!
//! Three search modes share one candidate-generation step (the scoped item
//! scan) and diverge in scoring. Text similarity is a pure function over
//! tokenized, normalized strings so results are reproducible: lower-case,
//! strip punctuation, split on whitespace, drop a small stopword set.

use chrono::NaiveDate;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use crate::error::Error;
use crate::keywords::KeywordIndex;
use crate::models::{NewsItem, ScoredItem};

lazy_static::lazy_static! {
    /// Trivial English stopwords dropped before similarity scoring.
    /// Single-character tokens are kept: entity letters ("X", "Y") carry
    /// signal in headlines.
    static ref STOPWORDS: HashSet<&'static str> = [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from",
        "has", "in", "is", "it", "its", "of", "on", "or", "that", "the",
        "to", "was", "will", "with",
    ]
    .into_iter()
    .collect();

    static ref QUOTED_SPAN: Regex =
        Regex::new(r#""([^"]+)"|'([^']+)'|“([^”]+)”|‘([^’]+)’|«([^»]+)»"#).unwrap();
}

/// Search mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Keyword,
    Fuzzy,
    Entity,
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keyword" => Ok(Self::Keyword),
            "fuzzy" => Ok(Self::Fuzzy),
            "entity" => Ok(Self::Entity),
            other => Err(Error::unsupported("searchMode", other)),
        }
    }
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Fuzzy => "fuzzy",
            Self::Entity => "entity",
        }
    }
}

/// Sort contract for the unified search entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Relevance,
    Weight,
    Date,
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(Self::Relevance),
            "weight" => Ok(Self::Weight),
            "date" => Ok(Self::Date),
            other => Err(Error::unsupported("sortBy", other)),
        }
    }
}

/// Historical-search time presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePreset {
    Yesterday,
    LastWeek,
    LastMonth,
    Custom,
}

impl FromStr for TimePreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yesterday" => Ok(Self::Yesterday),
            "last_week" => Ok(Self::LastWeek),
            "last_month" => Ok(Self::LastMonth),
            "custom" => Ok(Self::Custom),
            other => Err(Error::unsupported("timePreset", other)),
        }
    }
}

/// Tokenize a title into its significant terms
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|token| !token.is_empty() && !STOPWORDS.contains(token.as_str()))
        .collect()
}

/// Symmetric token-set similarity: shared-token count normalized by the
/// larger token-set size. Empty sets score 0.
pub fn token_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / a.len().max(b.len()) as f64
}

/// Fraction of the reference's significant tokens present in the candidate
pub fn keyword_overlap(reference: &HashSet<String>, candidate: &HashSet<String>) -> f64 {
    if reference.is_empty() {
        return 0.0;
    }
    let shared = reference.intersection(candidate).count();
    shared as f64 / reference.len() as f64
}

/// Blend for similar-news and related-history scoring
pub fn blended_score(reference: &HashSet<String>, candidate: &HashSet<String>) -> f64 {
    0.7 * keyword_overlap(reference, candidate) + 0.3 * token_similarity(reference, candidate)
}

/// Collapse runs of whitespace and lower-case, for substring matching
fn normalize_query(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract candidate entity spans: quoted spans plus capitalized token runs
///
/// A lightweight named-entity heuristic, not general NLP extraction.
fn entity_spans(title: &str) -> Vec<String> {
    let mut spans = Vec::new();

    for caps in QUOTED_SPAN.captures_iter(title) {
        for group in caps.iter().skip(1).flatten() {
            spans.push(group.as_str().to_string());
        }
    }

    // Runs of consecutive words each starting with an uppercase letter
    let mut run: Vec<&str> = Vec::new();
    for word in title.split_whitespace() {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
        let capitalized = trimmed.chars().next().is_some_and(|c| c.is_uppercase());
        if capitalized {
            run.push(trimmed);
        } else {
            if run.len() > 1 || (run.len() == 1 && !run[0].is_empty()) {
                spans.push(run.join(" "));
            }
            run.clear();
        }
    }
    if !run.is_empty() {
        spans.push(run.join(" "));
    }

    spans
}

/// Check whether a title contains an entity span equal to the query
pub fn entity_matches(title: &str, query: &str) -> bool {
    let wanted = normalize_query(query);
    if wanted.is_empty() {
        return false;
    }
    let wanted_tokens: Vec<&str> = wanted.split(' ').collect();

    entity_spans(title).iter().any(|span| {
        let span_norm = normalize_query(span);
        if span_norm == wanted {
            return true;
        }
        // A multi-word query may sit inside a longer capitalized run
        let span_tokens: Vec<&str> = span_norm.split(' ').collect();
        span_tokens
            .windows(wanted_tokens.len().min(span_tokens.len()))
            .any(|window| window == wanted_tokens.as_slice())
    })
}

/// Check keyword-mode matching: normalized substring of the title, or the
/// item matches a word group whose name equals the query
pub fn keyword_matches(item: &NewsItem, query: &str, index: &KeywordIndex) -> bool {
    let needle = normalize_query(query);
    if needle.is_empty() {
        return false;
    }
    if normalize_query(&item.title).contains(&needle) {
        return true;
    }
    index
        .get(&needle)
        .is_some_and(|group| group.matches(&item.title))
}

/// Score one candidate item under a search mode
///
/// Returns `None` when the item does not match (or, in fuzzy mode, scores
/// below the threshold: excluded, never merely demoted).
pub fn score_item(
    item: &NewsItem,
    query: &str,
    query_tokens: &HashSet<String>,
    mode: SearchMode,
    threshold: f64,
    index: &KeywordIndex,
) -> Option<ScoredItem> {
    let score = match mode {
        SearchMode::Keyword => {
            if !keyword_matches(item, query, index) {
                return None;
            }
            1.0
        }
        SearchMode::Fuzzy => {
            let score = token_similarity(query_tokens, &tokenize(&item.title));
            if score < threshold {
                return None;
            }
            score
        }
        SearchMode::Entity => {
            if !entity_matches(&item.title, query) {
                return None;
            }
            1.0
        }
    };

    Some(ScoredItem {
        item: item.clone(),
        score,
        matched_mode: mode.as_str().to_string(),
    })
}

/// Score a candidate against a reference title with the blended measure
pub fn score_similar(
    item: &NewsItem,
    reference_tokens: &HashSet<String>,
    threshold: f64,
    matched_mode: &str,
) -> Option<ScoredItem> {
    let score = blended_score(reference_tokens, &tokenize(&item.title));
    if score < threshold {
        return None;
    }
    Some(ScoredItem {
        item: item.clone(),
        score,
        matched_mode: matched_mode.to_string(),
    })
}

/// Sort by blended/native score descending, ties broken by recency descending
pub fn sort_by_score_then_recency(results: &mut [ScoredItem]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.item.captured_at.cmp(&a.item.captured_at))
    });
}

/// Per-date result counts for related-history responses
pub fn time_distribution(results: &[ScoredItem]) -> BTreeMap<NaiveDate, u64> {
    let mut dist = BTreeMap::new();
    for result in results {
        *dist
            .entry(result.item.captured_at.date_naive())
            .or_insert(0u64) += 1;
    }
    dist
}
