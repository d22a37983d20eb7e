//! Generate command - produce tweet candidates for review

use anyhow::{Context, Result, bail};
use rand::seq::SliceRandom;
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use tweetsmith_adapters::{
    GeneratorConfig, OpenAiGenerator, SqliteTweetStore, StubGenerator, load_static_pool,
};
use tweetsmith_domain::{
    Generator,
    usecases::{GenerationConfig, GenerationPipeline, Sanitizer, StaticPool},
};

use crate::args::GenerateArgs;
use crate::config::AppConfig;

pub async fn execute(args: GenerateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let store = Arc::new(
        SqliteTweetStore::new(&config.general.db_path)
            .await
            .context("Failed to initialize tweet store")?,
    );

    let static_pool = load_pool(&config)?;
    let generator: Arc<dyn Generator> = Arc::from(build_generator(&config)?);

    let pipeline = GenerationPipeline::new(
        generator,
        store,
        static_pool,
        Sanitizer::standard(&Sanitizer::default_markers(), config.x.max_chars),
        GenerationConfig {
            num_examples: config.generate.num_examples,
            promotion_min_score: config.generate.promotion_min_score,
        },
    );

    let mut rng = rand::thread_rng();
    for _ in 0..args.count.max(1) {
        let context = match &args.context {
            Some(context) => context.clone(),
            None => config
                .generate
                .contexts
                .choose(&mut rng)
                .cloned()
                .context("No context given and none configured under [generate]")?,
        };

        let id = pipeline.run_once(&context, &mut rng).await?;
        println!("Queued tweet {} for review (context: {})", id, context);
    }

    Ok(())
}

fn load_pool(config: &AppConfig) -> Result<StaticPool> {
    if config.generate.examples_path.exists() {
        load_static_pool(&config.generate.examples_path).context("Failed to load examples")
    } else {
        tracing::warn!(
            path = %config.generate.examples_path.display(),
            "Examples file not found, generating without a curated pool"
        );
        Ok(StaticPool::new())
    }
}

pub fn build_generator(config: &AppConfig) -> Result<Box<dyn Generator>> {
    let generator_config = GeneratorConfig {
        model: config.llm.model.clone(),
        temperature: config.llm.temperature,
        max_output_tokens: config.llm.max_output_tokens,
        timeout_secs: config.llm.timeout_secs,
        retries: config.llm.retries,
        system_message: config
            .generate
            .system_message
            .clone()
            .unwrap_or_else(|| tweetsmith_adapters::llm::DEFAULT_SYSTEM_MESSAGE.to_string()),
    };

    match config.llm.provider.as_str() {
        "openai" => {
            let api_key = load_api_key(&config.llm.api_key_env, "llm")?;
            let generator = OpenAiGenerator::with_base_url(
                api_key,
                config.llm.base_url.clone(),
                generator_config,
            )
            .context("Failed to build OpenAI generator")?;
            Ok(Box::new(generator))
        }
        "stub" => Ok(Box::new(StubGenerator::new())),
        other => bail!("Invalid LLM provider: {}", other),
    }
}

/// Read a secret from the environment variable named in the config
pub fn load_api_key(env_var: &str, purpose: &str) -> Result<SecretString> {
    let value = std::env::var(env_var)
        .with_context(|| format!("Missing {} credential: set {}", purpose, env_var))?;

    if value.trim().is_empty() {
        bail!("Credential in {} is empty", env_var);
    }

    Ok(SecretString::new(value.into()))
}
