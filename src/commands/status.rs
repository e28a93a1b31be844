use anyhow::{Context, Result};

use trendlens::config::EngineConfig;
use trendlens::engine::Engine;

/// Print engine and corpus health
pub async fn status(config: EngineConfig) -> Result<()> {
    let engine = Engine::from_config(config).context("Failed to build engine")?;
    let status = engine.system_status().await?;

    println!("trendlens {}", status.version);
    println!("================================");
    println!("  Word groups: {}", status.word_groups);
    println!("  Batches: {}", status.batch_count);
    println!("  Items: {}", status.item_count);
    match (status.corpus_dates.first(), status.corpus_dates.last()) {
        (Some(first), Some(last)) => println!("  Coverage: {first} ~ {last}"),
        _ => println!("  Coverage: no data"),
    }
    println!(
        "  Series cache: {} entries, {:.0}% hit rate",
        status.cache.entries,
        status.cache.hit_rate() * 100.0
    );

    Ok(())
}
