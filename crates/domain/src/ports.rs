//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure; tests
//! substitute in-memory fakes. All collaborators are constructor-injected,
//! never held as globals.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::model::{BestExample, ReviewFilter, TweetId, TweetRecord, TweetStatus};

/// Error type for tweet store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for the durable tweet record store
///
/// The store is the sole synchronization point between the generation
/// pipeline and the dispatcher. All mutations are durable before the call
/// returns. `claim_next_sendable` and `mark_sent` are both conditional
/// updates so that concurrent dispatcher instances cannot double-publish
/// the same record.
#[async_trait]
pub trait TweetStore: Send + Sync {
    /// Create a record in `review` status with null adjusted/score/sent_at.
    /// All-or-nothing: a storage fault leaves no partial record behind.
    async fn insert(&self, text: &str, context: &str) -> Result<TweetId, StoreError>;

    /// List records for the review surface, newest first
    async fn get_pending_review(
        &self,
        filter: &ReviewFilter,
    ) -> Result<Vec<TweetRecord>, StoreError>;

    /// Partial update from review: omitted fields are left unchanged
    /// (COALESCE semantics, never overwritten with null). Returns whether a
    /// row was affected; an unknown id is not an error. Sent records are
    /// terminal and refuse the write with `false`.
    async fn update_review(
        &self,
        id: TweetId,
        status: TweetStatus,
        text_adjusted: Option<&str>,
        score: Option<i64>,
    ) -> Result<bool, StoreError>;

    /// Atomically claim the next sendable record: approved, unsent,
    /// `score >= min_score`, not under a live claim lease. Selection is
    /// deterministic best-first (`score DESC, created_at ASC`). Only one
    /// concurrent caller can win a given record; a crashed claimant's lease
    /// expires after `lease`.
    async fn claim_next_sendable(
        &self,
        min_score: i64,
        lease: Duration,
    ) -> Result<Option<TweetRecord>, StoreError>;

    /// Release a claim after a failed publish so the record is reconsidered
    /// on a later cycle
    async fn release_claim(&self, id: TweetId) -> Result<bool, StoreError>;

    /// Set `status = sent` and `sent_at = now` in one atomic conditional
    /// update guarded by `sent_at IS NULL`. A second call on an already-sent
    /// id is a no-op returning `false` (no double timestamping).
    async fn mark_sent(&self, id: TweetId) -> Result<bool, StoreError>;

    /// Approved records with `score >= min_score`, preferring
    /// `text_adjusted` over `text`, ordered by context then score
    async fn best_examples(&self, min_score: i64) -> Result<Vec<BestExample>, StoreError>;

    /// All distinct context labels seen by the store
    async fn distinct_contexts(&self) -> Result<Vec<String>, StoreError>;

    /// Record counts grouped by status
    async fn stats_by_status(&self) -> Result<Vec<(TweetStatus, i64)>, StoreError>;
}

/// Error type for the text generator
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Generation API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timeout")]
    Timeout,
    #[error("Empty or unusable output")]
    EmptyOutput,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Port for the external text generator
///
/// Given a context label and a rendered few-shot example block, returns
/// raw candidate text. Failures produce no record; the caller logs and
/// continues.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, context: &str, examples: &str) -> Result<String, GenerateError>;
}

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Rate limited")]
    RateLimited,
    /// Platform refused the content (e.g. policy, duplicate). Not transient:
    /// retrying the same text unchanged will fail again.
    #[error("Rejected by platform: {0}")]
    Rejected(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Transport failure: {0}")]
    Transport(String),
}

/// Result of a successful publish
#[derive(Debug, Clone)]
pub struct PublishReceipt {
    /// Platform-assigned id of the published post
    pub external_id: String,
}

/// Port for publishing to the external social platform
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<PublishReceipt, PublishError>;
}
