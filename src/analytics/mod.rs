//! Analytical engines over aggregated mention data
//!
//! - [`trend`] - topic trajectory classification (trend/lifecycle/viral/predict)
//! - [`insights`] - cross-sectional statistics (platform comparison, activity,
//!   keyword co-occurrence)
//! - [`sentiment`] - coarse lexicon-based popularity/weight signal

pub mod insights;
pub mod sentiment;
pub mod trend;

pub use insights::{
    CooccurrencePair, InsightType, PlatformActivity, PlatformShare,
};
pub use sentiment::{SentimentBucket, SentimentDistribution};
pub use trend::{
    AnalysisType, LifecyclePhase, PhaseSegment, TrendAnalysis, TrendDirection, ViralPoint,
};
