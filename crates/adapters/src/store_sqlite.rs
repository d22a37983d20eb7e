//! SQLite tweet store implementation
//!
//! Timestamps are stored as RFC 3339 text. Comparisons and ordering on
//! them go through `julianday()` so subsecond precision survives; plain
//! string comparison would lose ordering across different fractional
//! digit counts.

use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tweetsmith_domain::{
    BestExample, ReviewFilter, StoreError, TweetId, TweetRecord, TweetStatus, TweetStore,
};

/// SQLite-backed tweet store
///
/// An internal `claimed_at` column implements the dispatch lease; it is
/// not part of the interop record shape.
pub struct SqliteTweetStore {
    pool: SqlitePool,
}

const RECORD_COLUMNS: &str =
    "id, text, text_adjusted, status, score, context, created_at, updated_at, sent_at";

type RecordRow = (
    i64,
    String,
    Option<String>,
    String,
    Option<i64>,
    String,
    String,
    Option<String>,
    Option<String>,
);

impl SqliteTweetStore {
    /// Create a new SQLite tweet store, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tweets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                text_adjusted TEXT,
                status TEXT NOT NULL,
                score INTEGER,
                context TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                sent_at TEXT,
                claimed_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_tweets_dispatch
            ON tweets(status, sent_at, score)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn format_ts(ts: OffsetDateTime) -> Result<String, StoreError> {
        ts.format(&Rfc3339)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn parse_ts(s: &str) -> Result<OffsetDateTime, StoreError> {
        OffsetDateTime::parse(s, &Rfc3339).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn row_to_record(row: RecordRow) -> Result<TweetRecord, StoreError> {
        let (id, text, text_adjusted, status, score, context, created_at, updated_at, sent_at) =
            row;

        let status = TweetStatus::parse(&status)
            .ok_or_else(|| StoreError::Serialization(format!("Unknown status: {}", status)))?;

        Ok(TweetRecord {
            id,
            text,
            text_adjusted,
            status,
            score,
            context,
            created_at: Self::parse_ts(&created_at)?,
            updated_at: updated_at.as_deref().map(Self::parse_ts).transpose()?,
            sent_at: sent_at.as_deref().map(Self::parse_ts).transpose()?,
        })
    }
}

#[async_trait]
impl TweetStore for SqliteTweetStore {
    async fn insert(&self, text: &str, context: &str) -> Result<TweetId, StoreError> {
        let created_at = Self::format_ts(OffsetDateTime::now_utc())?;

        let result = sqlx::query(
            r#"
            INSERT INTO tweets (text, status, context, created_at)
            VALUES (?, 'review', ?, ?)
            "#,
        )
        .bind(text)
        .bind(context)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn get_pending_review(
        &self,
        filter: &ReviewFilter,
    ) -> Result<Vec<TweetRecord>, StoreError> {
        let mut sql = format!("SELECT {} FROM tweets WHERE 1=1", RECORD_COLUMNS);
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.context.is_some() {
            sql.push_str(" AND context = ?");
        }
        sql.push_str(" ORDER BY julianday(created_at) DESC, id DESC");

        let mut query = sqlx::query_as::<_, RecordRow>(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(context) = &filter.context {
            query = query.bind(context);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn update_review(
        &self,
        id: TweetId,
        status: TweetStatus,
        text_adjusted: Option<&str>,
        score: Option<i64>,
    ) -> Result<bool, StoreError> {
        let updated_at = Self::format_ts(OffsetDateTime::now_utc())?;

        // Sent records are terminal: refusing the write here keeps the
        // sent_at <=> status invariant intact
        let result = sqlx::query(
            r#"
            UPDATE tweets
            SET status = ?,
                text_adjusted = COALESCE(?, text_adjusted),
                score = COALESCE(?, score),
                updated_at = ?
            WHERE id = ? AND sent_at IS NULL
            "#,
        )
        .bind(status.as_str())
        .bind(text_adjusted)
        .bind(score)
        .bind(&updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn claim_next_sendable(
        &self,
        min_score: i64,
        lease: Duration,
    ) -> Result<Option<TweetRecord>, StoreError> {
        let now = OffsetDateTime::now_utc();
        let now_str = Self::format_ts(now)?;
        let lease_cutoff = Self::format_ts(now - lease)?;

        // Single conditional update: only one concurrent caller can win a
        // given row. Expired leases (crashed claimants) are claimable again.
        let sql = format!(
            r#"
            UPDATE tweets
            SET claimed_at = ?
            WHERE id = (
                SELECT id FROM tweets
                WHERE status = 'approved'
                  AND sent_at IS NULL
                  AND score >= ?
                  AND (claimed_at IS NULL OR julianday(claimed_at) < julianday(?))
                ORDER BY score DESC, julianday(created_at) ASC, id ASC
                LIMIT 1
            )
            AND (claimed_at IS NULL OR julianday(claimed_at) < julianday(?))
            RETURNING {}
            "#,
            RECORD_COLUMNS
        );

        let row: Option<RecordRow> = sqlx::query_as(&sql)
            .bind(&now_str)
            .bind(min_score)
            .bind(&lease_cutoff)
            .bind(&lease_cutoff)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(Self::row_to_record).transpose()
    }

    async fn release_claim(&self, id: TweetId) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE tweets SET claimed_at = NULL WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_sent(&self, id: TweetId) -> Result<bool, StoreError> {
        let now = Self::format_ts(OffsetDateTime::now_utc())?;

        // One atomic update sets both fields, guarded so a second call on
        // an already-sent id changes nothing
        let result = sqlx::query(
            r#"
            UPDATE tweets
            SET status = 'sent', sent_at = ?, updated_at = ?
            WHERE id = ? AND sent_at IS NULL
            "#,
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn best_examples(&self, min_score: i64) -> Result<Vec<BestExample>, StoreError> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT context, COALESCE(text_adjusted, text) AS text, score
            FROM tweets
            WHERE status = 'approved' AND score >= ?
            ORDER BY context, score DESC
            "#,
        )
        .bind(min_score)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(context, text, score)| BestExample {
                context,
                text,
                score,
            })
            .collect())
    }

    async fn distinct_contexts(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT context FROM tweets ORDER BY context")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|(context,)| context).collect())
    }

    async fn stats_by_status(&self) -> Result<Vec<(TweetStatus, i64)>, StoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM tweets GROUP BY status ORDER BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|(status, count)| {
                TweetStatus::parse(&status)
                    .map(|s| (s, count))
                    .ok_or_else(|| StoreError::Serialization(format!("Unknown status: {}", status)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASE: Duration = Duration::from_secs(900);

    async fn store() -> SqliteTweetStore {
        SqliteTweetStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_creates_review_record() {
        let store = store().await;
        let id = store.insert("gm frens", "runes").await.unwrap();

        let pending = store
            .get_pending_review(&ReviewFilter::default())
            .await
            .unwrap();

        assert_eq!(pending.len(), 1);
        let record = &pending[0];
        assert_eq!(record.id, id);
        assert_eq!(record.status, TweetStatus::Review);
        assert_eq!(record.text, "gm frens");
        assert_eq!(record.context, "runes");
        assert!(record.text_adjusted.is_none());
        assert!(record.score.is_none());
        assert!(record.sent_at.is_none());
        assert!(record.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_listing_filters_by_status_and_context() {
        let store = store().await;
        let a = store.insert("one", "runes").await.unwrap();
        let b = store.insert("two", "ordinals").await.unwrap();
        store
            .update_review(b, TweetStatus::Approved, None, Some(3))
            .await
            .unwrap();

        let reviews = store
            .get_pending_review(&ReviewFilter::default())
            .await
            .unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].id, a);

        let ordinals = store
            .get_pending_review(&ReviewFilter {
                status: Some(TweetStatus::Approved),
                context: Some("ordinals".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(ordinals.len(), 1);
        assert_eq!(ordinals[0].id, b);

        let all = store
            .get_pending_review(&ReviewFilter {
                status: None,
                context: None,
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_review_never_nulls_existing_fields() {
        let store = store().await;
        let id = store.insert("original", "runes").await.unwrap();

        store
            .update_review(id, TweetStatus::Approved, Some("edited"), Some(4))
            .await
            .unwrap();

        // Omitted fields keep their values
        let affected = store
            .update_review(id, TweetStatus::Approved, None, None)
            .await
            .unwrap();
        assert!(affected);

        let record = store
            .get_pending_review(&ReviewFilter {
                status: Some(TweetStatus::Approved),
                context: None,
            })
            .await
            .unwrap()
            .remove(0);

        assert_eq!(record.text_adjusted.as_deref(), Some("edited"));
        assert_eq!(record.score, Some(4));
        assert!(record.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_update_review_unknown_id_is_boolean_not_error() {
        let store = store().await;
        let affected = store
            .update_review(999, TweetStatus::Approved, None, None)
            .await
            .unwrap();
        assert!(!affected);
    }

    #[tokio::test]
    async fn test_rejected_is_not_terminal() {
        let store = store().await;
        let id = store.insert("maybe later", "runes").await.unwrap();

        store
            .update_review(id, TweetStatus::Rejected, None, None)
            .await
            .unwrap();
        let affected = store
            .update_review(id, TweetStatus::Review, None, None)
            .await
            .unwrap();
        assert!(affected);

        let pending = store
            .get_pending_review(&ReviewFilter::default())
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_requires_approval_and_threshold() {
        let store = store().await;
        let id = store.insert("gm", "runes").await.unwrap();

        // Not approved yet
        assert!(store.claim_next_sendable(2, LEASE).await.unwrap().is_none());

        // Approved but below the default threshold
        store
            .update_review(id, TweetStatus::Approved, None, Some(1))
            .await
            .unwrap();
        assert!(store.claim_next_sendable(2, LEASE).await.unwrap().is_none());

        // Raised score qualifies
        store
            .update_review(id, TweetStatus::Approved, None, Some(3))
            .await
            .unwrap();
        let claimed = store.claim_next_sendable(2, LEASE).await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
    }

    #[tokio::test]
    async fn test_claim_is_exclusive_until_released() {
        let store = store().await;
        let id = store.insert("gm", "runes").await.unwrap();
        store
            .update_review(id, TweetStatus::Approved, None, Some(5))
            .await
            .unwrap();

        assert!(store.claim_next_sendable(2, LEASE).await.unwrap().is_some());
        // Live lease blocks a second claimant
        assert!(store.claim_next_sendable(2, LEASE).await.unwrap().is_none());

        assert!(store.release_claim(id).await.unwrap());
        assert!(store.claim_next_sendable(2, LEASE).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_lease_is_claimable_again() {
        let store = store().await;
        let id = store.insert("gm", "runes").await.unwrap();
        store
            .update_review(id, TweetStatus::Approved, None, Some(5))
            .await
            .unwrap();

        assert!(store.claim_next_sendable(2, LEASE).await.unwrap().is_some());

        // Zero lease: the existing claim is already expired
        let reclaimed = store
            .claim_next_sendable(2, Duration::ZERO)
            .await
            .unwrap();
        assert!(reclaimed.is_some());
    }

    #[tokio::test]
    async fn test_claim_orders_best_first() {
        let store = store().await;
        let low = store.insert("low", "runes").await.unwrap();
        let high = store.insert("high", "runes").await.unwrap();
        store
            .update_review(low, TweetStatus::Approved, None, Some(2))
            .await
            .unwrap();
        store
            .update_review(high, TweetStatus::Approved, None, Some(5))
            .await
            .unwrap();

        let first = store.claim_next_sendable(2, LEASE).await.unwrap().unwrap();
        assert_eq!(first.id, high);

        let second = store.claim_next_sendable(2, LEASE).await.unwrap().unwrap();
        assert_eq!(second.id, low);
    }

    #[tokio::test]
    async fn test_mark_sent_is_idempotent() {
        let store = store().await;
        let id = store.insert("gm", "runes").await.unwrap();
        store
            .update_review(id, TweetStatus::Approved, None, Some(3))
            .await
            .unwrap();

        assert!(store.mark_sent(id).await.unwrap());

        let first = store
            .get_pending_review(&ReviewFilter {
                status: Some(TweetStatus::Sent),
                context: None,
            })
            .await
            .unwrap()
            .remove(0);
        let sent_at = first.sent_at.expect("sent_at set");

        // Second call is a no-op, no double timestamping
        assert!(!store.mark_sent(id).await.unwrap());

        let second = store
            .get_pending_review(&ReviewFilter {
                status: Some(TweetStatus::Sent),
                context: None,
            })
            .await
            .unwrap()
            .remove(0);
        assert_eq!(second.sent_at, Some(sent_at));
    }

    #[tokio::test]
    async fn test_sent_at_iff_status_sent() {
        let store = store().await;
        let a = store.insert("a", "runes").await.unwrap();
        let b = store.insert("b", "runes").await.unwrap();
        store
            .update_review(a, TweetStatus::Approved, None, Some(3))
            .await
            .unwrap();
        store
            .update_review(b, TweetStatus::Rejected, None, None)
            .await
            .unwrap();
        store.mark_sent(a).await.unwrap();

        let all = store
            .get_pending_review(&ReviewFilter {
                status: None,
                context: None,
            })
            .await
            .unwrap();

        for record in all {
            assert_eq!(
                record.sent_at.is_some(),
                record.status == TweetStatus::Sent,
                "invariant violated for id {}",
                record.id
            );
        }
    }

    #[tokio::test]
    async fn test_sent_records_refuse_review_updates() {
        let store = store().await;
        let id = store.insert("gm", "runes").await.unwrap();
        store
            .update_review(id, TweetStatus::Approved, None, Some(3))
            .await
            .unwrap();
        store.mark_sent(id).await.unwrap();

        let affected = store
            .update_review(id, TweetStatus::Approved, None, None)
            .await
            .unwrap();
        assert!(!affected);

        let record = store
            .get_pending_review(&ReviewFilter {
                status: None,
                context: None,
            })
            .await
            .unwrap()
            .remove(0);
        assert_eq!(record.status, TweetStatus::Sent);
        assert_eq!(
            record.sent_at.is_some(),
            record.status == TweetStatus::Sent
        );
    }

    #[tokio::test]
    async fn test_sent_records_are_never_claimable() {
        let store = store().await;
        let id = store.insert("gm", "runes").await.unwrap();
        store
            .update_review(id, TweetStatus::Approved, None, Some(5))
            .await
            .unwrap();
        store.mark_sent(id).await.unwrap();

        assert!(store.claim_next_sendable(2, LEASE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_best_examples_prefers_adjusted_text() {
        let store = store().await;
        let a = store.insert("raw text", "runes").await.unwrap();
        let b = store.insert("other", "ordinals").await.unwrap();
        let c = store.insert("too low", "runes").await.unwrap();
        store
            .update_review(a, TweetStatus::Approved, Some("polished text"), Some(5))
            .await
            .unwrap();
        store
            .update_review(b, TweetStatus::Approved, None, Some(4))
            .await
            .unwrap();
        store
            .update_review(c, TweetStatus::Approved, None, Some(2))
            .await
            .unwrap();

        let best = store.best_examples(4).await.unwrap();

        assert_eq!(best.len(), 2);
        assert_eq!(best[0].context, "ordinals");
        assert_eq!(best[0].text, "other");
        assert_eq!(best[1].context, "runes");
        assert_eq!(best[1].text, "polished text");
        assert_eq!(best[1].score, 5);
    }

    #[tokio::test]
    async fn test_distinct_contexts_and_stats() {
        let store = store().await;
        store.insert("a", "runes").await.unwrap();
        store.insert("b", "runes").await.unwrap();
        let c = store.insert("c", "ordinals").await.unwrap();
        store
            .update_review(c, TweetStatus::Approved, None, Some(3))
            .await
            .unwrap();

        let contexts = store.distinct_contexts().await.unwrap();
        assert_eq!(contexts, vec!["ordinals".to_string(), "runes".to_string()]);

        let stats = store.stats_by_status().await.unwrap();
        assert_eq!(
            stats,
            vec![(TweetStatus::Approved, 1), (TweetStatus::Review, 2)]
        );
    }
}
