//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tweetsmith_domain::TweetId;

/// tweetsmith: generate, review, and dispatch tweets with an LLM-backed pipeline
#[derive(Parser, Debug)]
#[command(name = "tweetsmith")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the dispatch loop, publishing approved tweets on a schedule
    Run(RunArgs),

    /// Generate tweet candidates and queue them for review
    Generate(GenerateArgs),

    /// List and update tweets awaiting review
    Review(ReviewArgs),

    /// Show tweet counts by status
    Stats(StatsArgs),

    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Process one dispatch cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Run in dry-run mode (no actual publishing)
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Context to generate for; a configured context is picked at random
    /// when omitted
    #[arg(long)]
    pub context: Option<String>,

    /// Number of candidates to generate
    #[arg(long, default_value_t = 1)]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct ReviewArgs {
    #[command(subcommand)]
    pub command: ReviewCommands,
}

#[derive(Subcommand, Debug)]
pub enum ReviewCommands {
    /// List tweets, filtered by status and context
    List {
        /// Filter by status (review, approved, rejected, sent); "all" lists
        /// every status
        #[arg(long, default_value = "review")]
        status: String,

        /// Filter by context
        #[arg(long)]
        context: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update one tweet's review verdict
    Update {
        /// Tweet id
        id: TweetId,

        /// New status (review, approved, rejected)
        status: String,

        /// Replacement text to publish instead of the generated text
        #[arg(long)]
        text: Option<String>,

        /// Review score
        #[arg(long)]
        score: Option<i64>,
    },
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}
