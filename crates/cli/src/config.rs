//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub generate: GenerateConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub x: XConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    #[serde(default = "default_examples_path")]
    pub examples_path: PathBuf,

    #[serde(default = "default_num_examples")]
    pub num_examples: usize,

    #[serde(default = "default_promotion_min_score")]
    pub promotion_min_score: i64,

    /// System message override; the built-in one is used when absent
    #[serde(default)]
    pub system_message: Option<String>,

    /// Contexts to draw from when `generate` is called without one
    #[serde(default)]
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_llm_retries")]
    pub retries: u32,

    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_dispatch_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_dispatch_backoff")]
    pub backoff_secs: u64,

    #[serde(default = "default_dispatch_min_score")]
    pub min_score: i64,

    #[serde(default = "default_claim_lease")]
    pub claim_lease_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_x_user_token_env")]
    pub user_token_env: String,

    #[serde(default = "default_x_base_url")]
    pub base_url: String,

    #[serde(default = "default_x_max_chars")]
    pub max_chars: usize,
}

// Default value functions
fn default_db_path() -> PathBuf {
    PathBuf::from("./tweets.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_examples_path() -> PathBuf {
    PathBuf::from("./examples.jsonl")
}

fn default_num_examples() -> usize {
    3
}

fn default_promotion_min_score() -> i64 {
    4
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.9
}

fn default_max_output_tokens() -> u32 {
    120
}

fn default_timeout() -> u64 {
    45
}

fn default_llm_retries() -> u32 {
    2
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_dispatch_interval() -> u64 {
    5400
}

fn default_dispatch_backoff() -> u64 {
    60
}

fn default_dispatch_min_score() -> i64 {
    2
}

fn default_claim_lease() -> u64 {
    900
}

fn default_x_user_token_env() -> String {
    "X_USER_TOKEN".to_string()
}

fn default_x_base_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_x_max_chars() -> usize {
    280
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
        }
    }
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            examples_path: default_examples_path(),
            num_examples: default_num_examples(),
            promotion_min_score: default_promotion_min_score(),
            system_message: None,
            contexts: vec![],
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout(),
            retries: default_llm_retries(),
            api_key_env: default_openai_api_key_env(),
            base_url: default_openai_base_url(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_dispatch_interval(),
            backoff_secs: default_dispatch_backoff(),
            min_score: default_dispatch_min_score(),
            claim_lease_secs: default_claim_lease(),
        }
    }
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user_token_env: default_x_user_token_env(),
            base_url: default_x_base_url(),
            max_chars: default_x_max_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("TWEETSMITH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# tweetsmith configuration

[general]
db_path = "./tweets.sqlite"
log_level = "info"

[generate]
examples_path = "./examples.jsonl"
num_examples = 3
promotion_min_score = 4
contexts = ["runes", "ordinals"]
# system_message = "You write short, punchy tweets..."

[llm]
provider = "openai"  # openai, stub
model = "gpt-4o-mini"
temperature = 0.9
max_output_tokens = 120
timeout_secs = 45
retries = 2
api_key_env = "OPENAI_API_KEY"
base_url = "https://api.openai.com/v1"

[dispatch]
interval_secs = 5400
backoff_secs = 60
min_score = 2
claim_lease_secs = 900

[x]
enabled = false
user_token_env = "X_USER_TOKEN"
base_url = "https://api.twitter.com"
max_chars = 280
"#
        .to_string()
    }
}
