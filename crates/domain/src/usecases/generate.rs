//! Generation pipeline - select examples, generate, sanitize, store
//!
//! Owns the write path into the store: a failure anywhere in the pipeline
//! produces no record at all.

use rand::Rng;
use std::sync::Arc;

use crate::model::TweetId;
use crate::ports::{GenerateError, Generator, StoreError, TweetStore};
use crate::usecases::sanitize::Sanitizer;
use crate::usecases::select_examples::{StaticPool, render_examples, select_examples};

/// Configuration for the generation pipeline
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Few-shot examples per generation request
    pub num_examples: usize,
    /// Minimum review score for a stored record to be promoted into the
    /// dynamic example pool
    pub promotion_min_score: i64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            num_examples: 3,
            promotion_min_score: 4,
        }
    }
}

/// Errors from the generation pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

/// Pipeline producing one `review`-status record per run
pub struct GenerationPipeline<G, St>
where
    G: Generator + ?Sized,
    St: TweetStore + ?Sized,
{
    generator: Arc<G>,
    store: Arc<St>,
    static_pool: StaticPool,
    sanitizer: Sanitizer,
    config: GenerationConfig,
}

impl<G, St> GenerationPipeline<G, St>
where
    G: Generator + ?Sized,
    St: TweetStore + ?Sized,
{
    pub fn new(
        generator: Arc<G>,
        store: Arc<St>,
        static_pool: StaticPool,
        sanitizer: Sanitizer,
        config: GenerationConfig,
    ) -> Self {
        Self {
            generator,
            store,
            static_pool,
            sanitizer,
            config,
        }
    }

    /// Generate one candidate for `context` and insert it for review
    pub async fn run_once(
        &self,
        context: &str,
        rng: &mut impl Rng,
    ) -> Result<TweetId, PipelineError> {
        let dynamic_pool = self
            .store
            .best_examples(self.config.promotion_min_score)
            .await?;

        let examples = select_examples(
            &self.static_pool,
            &dynamic_pool,
            Some(context),
            self.config.num_examples,
            rng,
        );

        tracing::debug!(
            context = %context,
            example_count = examples.len(),
            dynamic_available = dynamic_pool.len(),
            "Selected examples"
        );

        let raw = self
            .generator
            .generate(context, &render_examples(&examples))
            .await?;

        let text = self.sanitizer.sanitize(&raw);
        if text.is_empty() {
            return Err(GenerateError::EmptyOutput.into());
        }

        let id = self.store.insert(&text, context).await?;
        tracing::info!(id, context = %context, "Stored candidate for review");

        Ok(id)
    }
}
