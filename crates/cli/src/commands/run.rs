//! Run command - the periodic dispatch loop

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tweetsmith_adapters::{SqliteTweetStore, XPublisher};
use tweetsmith_domain::{
    CycleOutcome, Publisher,
    usecases::{DispatchConfig, Dispatcher},
};

use crate::args::RunArgs;
use crate::commands::generate::load_api_key;
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let mut dry_run = args.dry_run;
    if !config.x.enabled && !dry_run {
        tracing::warn!("X publishing is disabled in config, forcing dry-run");
        dry_run = true;
    }

    tracing::info!(
        dry_run = dry_run,
        once = args.once,
        interval_secs = config.dispatch.interval_secs,
        min_score = config.dispatch.min_score,
        "Starting tweetsmith dispatch"
    );

    let store = Arc::new(
        SqliteTweetStore::new(&config.general.db_path)
            .await
            .context("Failed to initialize tweet store")?,
    );

    let publisher: Arc<dyn Publisher> = Arc::new(build_publisher(&config, dry_run)?);

    let dispatch_config = DispatchConfig {
        interval: Duration::from_secs(config.dispatch.interval_secs),
        backoff: Duration::from_secs(config.dispatch.backoff_secs),
        min_score: config.dispatch.min_score,
        claim_lease: Duration::from_secs(config.dispatch.claim_lease_secs),
        dry_run,
    };

    let dispatcher = Dispatcher::new(store, publisher, dispatch_config);

    if args.once {
        let outcome = dispatcher.cycle().await?;
        report_outcome(&outcome);
    } else {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        };

        dispatcher.run(shutdown).await;
    }

    tracing::info!("tweetsmith dispatch completed");
    Ok(())
}

fn build_publisher(config: &AppConfig, dry_run: bool) -> Result<XPublisher> {
    let user_token = if dry_run {
        // Never called in dry-run
        SecretString::new("".into())
    } else {
        load_api_key(&config.x.user_token_env, "x")?
    };

    XPublisher::with_base_url(user_token, config.x.base_url.clone())
        .context("Failed to build publisher")
}

fn report_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Idle => println!("Nothing to dispatch"),
        CycleOutcome::Sent { id, external_id } => {
            println!("Sent tweet {} (external id {})", id, external_id)
        }
        CycleOutcome::DryRun { id } => println!("Dry-run: would send tweet {}", id),
        CycleOutcome::PublishFailed { id, error } => {
            println!("Failed to publish tweet {}: {}", id, error)
        }
        CycleOutcome::Hazard { id, external_id } => println!(
            "Tweet {} published as {} but could not be recorded; halted in this \
             process only. A restart clears the halt: reconcile the record first.",
            id, external_id
        ),
        CycleOutcome::Skipped { id } => println!("Skipped halted tweet {}", id),
    }
}
