use anyhow::{Context, Result};
use chrono::Utc;

use trendlens::config::EngineConfig;
use trendlens::engine::{Engine, QueryContext, TrendingTopicsParams};

/// Print the current attention-word ranking
pub async fn trending(config: EngineConfig, top_n: usize, mode: String) -> Result<()> {
    let engine = Engine::from_config(config).context("Failed to build engine")?;
    let ctx = QueryContext::new(Utc::now());

    let result = engine
        .trending_topics(TrendingTopicsParams { top_n, mode }, &ctx)
        .await?;

    if result.topics.is_empty() {
        println!("No topic activity in scope '{}'", result.mode);
        return Ok(());
    }

    println!("Trending topics ({} mode):", result.mode);
    println!("================================");
    for (i, topic) in result.topics.iter().enumerate() {
        println!(
            "{}. {} - {} mentions (weighted {:.2})",
            i + 1,
            topic.group,
            topic.count,
            topic.weighted_score
        );
    }

    if !result.partial_failures.is_empty() {
        println!();
        println!("Skipped platforms:");
        for failure in &result.partial_failures {
            println!("  {} - {}", failure.platform_id, failure.reason);
        }
    }

    Ok(())
}
