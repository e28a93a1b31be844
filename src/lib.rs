//! trendlens - Trend & Search Analytics Engine
//!
//! An analytics engine over periodically crawled news headline batches:
//! latest-news retrieval, attention-keyword frequency tracking, topic
//! trend/lifecycle/anomaly/prediction analysis, cross-platform comparison,
//! keyword co-occurrence, sentiment-weighted ranking and multi-mode search
//! with relatedness scoring.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`keywords`] - Attention word-group definitions and matching
//! - [`store`] - Read-only corpus store over the crawler's batch tree
//! - [`aggregate`] - Date resolution and time-windowed aggregation
//! - [`analytics`] - Trend, insights and sentiment engines
//! - [`search`] - Multi-mode search and similarity scoring
//! - [`ranking`] - Popularity weight and recency decay
//! - [`report`] - Summary report rendering
//! - [`cache`] - Bounded in-process series cache
//! - [`engine`] - Operation facade with boundary validation
//!
//! # Example
//!
//! ```no_run
//! use trendlens::config::EngineConfig;
//! use trendlens::engine::{Engine, LatestNewsParams, QueryContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::from_env()?;
//!     let engine = Engine::from_config(config)?;
//!     let ctx = QueryContext::new(chrono::Utc::now());
//!     let latest = engine.latest_news(LatestNewsParams::default(), &ctx).await?;
//!     println!("{} items", latest.total);
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod analytics;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod keywords;
pub mod metrics;
pub mod models;
pub mod ranking;
pub mod report;
pub mod search;
pub mod store;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::aggregate::{resolve_date_expr, CancelToken, Scope};
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Engine, QueryContext};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::keywords::{KeywordIndex, KeywordIndexHandle, WordGroup};
    pub use crate::models::{Batch, DateRange, NewsItem, ScoredItem, TrendPoint};
    pub use crate::store::{CorpusStore, FileCorpusStore};
}

// Direct re-exports for convenience
pub use engine::{Engine, QueryContext};
pub use error::{Error, Result};
