//! Stats command - tweet counts by status

use anyhow::{Context, Result};
use std::path::PathBuf;
use tweetsmith_adapters::SqliteTweetStore;
use tweetsmith_domain::TweetStore;

use crate::args::StatsArgs;
use crate::config::AppConfig;

pub async fn execute(args: StatsArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let store = SqliteTweetStore::new(&config.general.db_path)
        .await
        .context("Failed to initialize tweet store")?;

    let stats = store.stats_by_status().await?;
    let contexts = store.distinct_contexts().await?;

    if args.json {
        let mut counts = serde_json::Map::new();
        for (status, count) in &stats {
            counts.insert(status.to_string(), serde_json::json!(count));
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "counts": counts,
                "contexts": contexts,
            }))?
        );
        return Ok(());
    }

    if stats.is_empty() {
        println!("No tweets stored yet");
        return Ok(());
    }

    let total: i64 = stats.iter().map(|(_, count)| count).sum();
    for (status, count) in &stats {
        println!("{:>10}: {}", status.to_string(), count);
    }
    println!("{:>10}: {}", "total", total);
    println!("contexts: {}", contexts.join(", "));

    Ok(())
}
