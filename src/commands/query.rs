use anyhow::{Context, Result};
use chrono::Utc;

use trendlens::config::EngineConfig;
use trendlens::engine::{Engine, QueryContext};

/// Run one named operation with JSON parameters and print the result
pub async fn query(config: EngineConfig, operation: String, params: Option<String>) -> Result<()> {
    let engine = Engine::from_config(config).context("Failed to build engine")?;

    let params: serde_json::Value = match params {
        Some(raw) => serde_json::from_str(&raw).context("Failed to parse --params as JSON")?,
        None => serde_json::json!({}),
    };

    let ctx = QueryContext::new(Utc::now());
    let result = engine.execute(&operation, params, &ctx).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
