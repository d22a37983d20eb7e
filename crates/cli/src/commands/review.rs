//! Review command - list and update queued tweets

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::sync::Arc;
use tweetsmith_adapters::SqliteTweetStore;
use tweetsmith_domain::{ReviewFilter, TweetId, TweetStatus, TweetStore};

use crate::args::{ReviewArgs, ReviewCommands};
use crate::config::AppConfig;

pub async fn execute(args: ReviewArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let store = Arc::new(
        SqliteTweetStore::new(&config.general.db_path)
            .await
            .context("Failed to initialize tweet store")?,
    );

    match args.command {
        ReviewCommands::List {
            status,
            context,
            json,
        } => list(store, &status, context, json).await,
        ReviewCommands::Update {
            id,
            status,
            text,
            score,
        } => update(store, id, &status, text.as_deref(), score).await,
    }
}

async fn list(
    store: Arc<SqliteTweetStore>,
    status: &str,
    context: Option<String>,
    json: bool,
) -> Result<()> {
    let status_filter = match status {
        "all" => None,
        other => Some(parse_status(other)?),
    };

    let records = store
        .get_pending_review(&ReviewFilter {
            status: status_filter,
            context,
        })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No tweets found");
        return Ok(());
    }

    for record in &records {
        let score = record
            .score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "#{} [{}] score={} context={}",
            record.id, record.status, score, record.context
        );
        println!("  {}", record.effective_text());
    }
    println!("{} tweet(s)", records.len());

    Ok(())
}

async fn update(
    store: Arc<SqliteTweetStore>,
    id: TweetId,
    status: &str,
    text: Option<&str>,
    score: Option<i64>,
) -> Result<()> {
    let status = parse_status(status)?;
    if status == TweetStatus::Sent {
        bail!("Status 'sent' is set by the dispatcher, not by review");
    }

    let updated = store.update_review(id, status, text, score).await?;
    if !updated {
        bail!("No reviewable tweet with id {} (unknown id or already sent)", id);
    }

    println!("Updated tweet {} to {}", id, status);
    Ok(())
}

fn parse_status(value: &str) -> Result<TweetStatus> {
    TweetStatus::parse(value).with_context(|| format!("Invalid status: {}", value))
}
