//! In-memory tweet store for tests and dry runs
//!
//! Mirrors the SQLite store's semantics exactly, including the claim
//! lease. All operations take the single mutex, so claims are atomic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use time::OffsetDateTime;
use tweetsmith_domain::{
    BestExample, ReviewFilter, StoreError, TweetId, TweetRecord, TweetStatus, TweetStore,
};

#[derive(Clone)]
struct StoredTweet {
    record: TweetRecord,
    claimed_at: Option<OffsetDateTime>,
}

#[derive(Default)]
struct Inner {
    tweets: HashMap<TweetId, StoredTweet>,
    next_id: TweetId,
}

/// In-memory implementation of the tweet store
#[derive(Default)]
pub struct InMemoryTweetStore {
    inner: Mutex<Inner>,
}

impl InMemoryTweetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Database("store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl TweetStore for InMemoryTweetStore {
    async fn insert(&self, text: &str, context: &str) -> Result<TweetId, StoreError> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = inner.next_id;

        inner.tweets.insert(
            id,
            StoredTweet {
                record: TweetRecord {
                    id,
                    text: text.to_string(),
                    text_adjusted: None,
                    status: TweetStatus::Review,
                    score: None,
                    context: context.to_string(),
                    created_at: OffsetDateTime::now_utc(),
                    updated_at: None,
                    sent_at: None,
                },
                claimed_at: None,
            },
        );

        Ok(id)
    }

    async fn get_pending_review(
        &self,
        filter: &ReviewFilter,
    ) -> Result<Vec<TweetRecord>, StoreError> {
        let inner = self.lock()?;

        let mut records: Vec<TweetRecord> = inner
            .tweets
            .values()
            .filter(|t| filter.status.is_none_or(|s| t.record.status == s))
            .filter(|t| {
                filter
                    .context
                    .as_deref()
                    .is_none_or(|c| t.record.context == c)
            })
            .map(|t| t.record.clone())
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn update_review(
        &self,
        id: TweetId,
        status: TweetStatus,
        text_adjusted: Option<&str>,
        score: Option<i64>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;

        let Some(tweet) = inner.tweets.get_mut(&id) else {
            return Ok(false);
        };
        // Sent records are terminal
        if tweet.record.sent_at.is_some() {
            return Ok(false);
        }

        tweet.record.status = status;
        if let Some(adjusted) = text_adjusted {
            tweet.record.text_adjusted = Some(adjusted.to_string());
        }
        if let Some(score) = score {
            tweet.record.score = Some(score);
        }
        tweet.record.updated_at = Some(OffsetDateTime::now_utc());

        Ok(true)
    }

    async fn claim_next_sendable(
        &self,
        min_score: i64,
        lease: Duration,
    ) -> Result<Option<TweetRecord>, StoreError> {
        let mut inner = self.lock()?;
        let now = OffsetDateTime::now_utc();
        let cutoff = now - lease;

        let best_id = inner
            .tweets
            .values()
            .filter(|t| {
                t.record.status == TweetStatus::Approved
                    && t.record.sent_at.is_none()
                    && t.record.score.is_some_and(|s| s >= min_score)
                    && t.claimed_at.is_none_or(|c| c < cutoff)
            })
            .min_by(|a, b| {
                b.record
                    .score
                    .cmp(&a.record.score)
                    .then(a.record.created_at.cmp(&b.record.created_at))
                    .then(a.record.id.cmp(&b.record.id))
            })
            .map(|t| t.record.id);

        let Some(id) = best_id else {
            return Ok(None);
        };

        let tweet = inner
            .tweets
            .get_mut(&id)
            .ok_or_else(|| StoreError::Database("claimed id vanished".to_string()))?;
        tweet.claimed_at = Some(now);

        Ok(Some(tweet.record.clone()))
    }

    async fn release_claim(&self, id: TweetId) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;

        let Some(tweet) = inner.tweets.get_mut(&id) else {
            return Ok(false);
        };
        tweet.claimed_at = None;

        Ok(true)
    }

    async fn mark_sent(&self, id: TweetId) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;

        let Some(tweet) = inner.tweets.get_mut(&id) else {
            return Ok(false);
        };
        if tweet.record.sent_at.is_some() {
            return Ok(false);
        }

        let now = OffsetDateTime::now_utc();
        tweet.record.status = TweetStatus::Sent;
        tweet.record.sent_at = Some(now);
        tweet.record.updated_at = Some(now);

        Ok(true)
    }

    async fn best_examples(&self, min_score: i64) -> Result<Vec<BestExample>, StoreError> {
        let inner = self.lock()?;

        let mut examples: Vec<BestExample> = inner
            .tweets
            .values()
            .filter(|t| {
                t.record.status == TweetStatus::Approved
                    && t.record.score.is_some_and(|s| s >= min_score)
            })
            .map(|t| BestExample {
                context: t.record.context.clone(),
                text: t.record.effective_text().to_string(),
                score: t.record.score.unwrap_or_default(),
            })
            .collect();

        examples.sort_by(|a, b| a.context.cmp(&b.context).then(b.score.cmp(&a.score)));
        Ok(examples)
    }

    async fn distinct_contexts(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.lock()?;

        let mut contexts: Vec<String> = inner
            .tweets
            .values()
            .map(|t| t.record.context.clone())
            .collect();
        contexts.sort();
        contexts.dedup();

        Ok(contexts)
    }

    async fn stats_by_status(&self) -> Result<Vec<(TweetStatus, i64)>, StoreError> {
        let inner = self.lock()?;

        let mut counts: HashMap<TweetStatus, i64> = HashMap::new();
        for tweet in inner.tweets.values() {
            *counts.entry(tweet.record.status).or_default() += 1;
        }

        let mut stats: Vec<(TweetStatus, i64)> = counts.into_iter().collect();
        stats.sort_by_key(|(status, _)| status.as_str());
        Ok(stats)
    }
}
