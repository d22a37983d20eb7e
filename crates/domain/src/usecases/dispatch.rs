//! Dispatch scheduler - claims one approved record per cycle and publishes it
//!
//! A single long-lived loop: claim the next sendable record, publish it,
//! record the outcome, sleep. Publish failures leave the record unsent for
//! a later cycle. A store failure after a successful external publish is a
//! reconciliation hazard: the external platform has the post but the store
//! does not know, so the record is halted from automatic sending and never
//! re-published unchanged.
//!
//! The loop stays correct with multiple dispatcher instances running
//! against the same store: the claim is an atomic conditional update only
//! one caller can win, and `mark_sent` is guarded by `sent_at IS NULL`.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::model::{CycleOutcome, TweetId};
use crate::ports::{Publisher, StoreError, TweetStore};

/// Configuration for the dispatch loop
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Sleep between ordinary cycles
    pub interval: Duration,
    /// Sleep after a failed cycle (store unreachable etc.)
    pub backoff: Duration,
    /// Minimum review score a record needs to be sendable
    pub min_score: i64,
    /// How long a claim stays live before a crashed claimant's record is
    /// offered again
    pub claim_lease: Duration,
    /// Claim but do not publish
    pub dry_run: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5400),
            backoff: Duration::from_secs(60),
            min_score: 2,
            claim_lease: Duration::from_secs(900),
            dry_run: false,
        }
    }
}

/// Dispatch loop orchestrator
pub struct Dispatcher<St, P>
where
    St: TweetStore + ?Sized,
    P: Publisher + ?Sized,
{
    store: Arc<St>,
    publisher: Arc<P>,
    config: DispatchConfig,
    /// Records halted after a reconciliation hazard; never auto-sent again
    /// by this process. Process-local: a restart forgets the halt, so the
    /// record must be reconciled before restarting.
    halted: Mutex<HashSet<TweetId>>,
}

impl<St, P> Dispatcher<St, P>
where
    St: TweetStore + ?Sized,
    P: Publisher + ?Sized,
{
    pub fn new(store: Arc<St>, publisher: Arc<P>, config: DispatchConfig) -> Self {
        Self {
            store,
            publisher,
            config,
            halted: Mutex::new(HashSet::new()),
        }
    }

    /// Run one dispatch cycle: claim, publish, record
    ///
    /// Store failures during the claim propagate as `Err` so the loop can
    /// back off; everything after a successful claim resolves to an outcome.
    pub async fn cycle(&self) -> Result<CycleOutcome, StoreError> {
        let claimed = self
            .store
            .claim_next_sendable(self.config.min_score, self.config.claim_lease)
            .await?;

        let Some(record) = claimed else {
            tracing::debug!("No sendable records");
            return Ok(CycleOutcome::Idle);
        };

        if self.halted.lock().await.contains(&record.id) {
            tracing::warn!(
                id = record.id,
                "Record halted after earlier reconciliation hazard, not publishing"
            );
            return Ok(CycleOutcome::Skipped { id: record.id });
        }

        if self.config.dry_run {
            tracing::info!(
                id = record.id,
                text = %record.effective_text(),
                "[DRY RUN] Would publish"
            );
            self.store.release_claim(record.id).await?;
            return Ok(CycleOutcome::DryRun { id: record.id });
        }

        tracing::info!(id = record.id, context = %record.context, "Publishing");

        match self.publisher.publish(record.effective_text()).await {
            Ok(receipt) => match self.store.mark_sent(record.id).await {
                Ok(true) => {
                    tracing::info!(
                        id = record.id,
                        external_id = %receipt.external_id,
                        "Published and marked sent"
                    );
                    Ok(CycleOutcome::Sent {
                        id: record.id,
                        external_id: receipt.external_id,
                    })
                }
                Ok(false) => {
                    // Another instance marked it between our claim and here.
                    // The claim should make this unreachable; surface it.
                    tracing::warn!(
                        id = record.id,
                        external_id = %receipt.external_id,
                        "Record was already marked sent by another writer"
                    );
                    Ok(CycleOutcome::Sent {
                        id: record.id,
                        external_id: receipt.external_id,
                    })
                }
                Err(e) => {
                    // The post exists externally but the store does not know.
                    // Never retried: a retry would publish the text twice.
                    self.halted.lock().await.insert(record.id);
                    tracing::error!(
                        id = record.id,
                        external_id = %receipt.external_id,
                        error = %e,
                        "RECONCILIATION HAZARD: published externally but mark_sent failed; \
                         record halted in this process only, reconcile before restarting"
                    );
                    Ok(CycleOutcome::Hazard {
                        id: record.id,
                        external_id: receipt.external_id,
                    })
                }
            },
            Err(error) => {
                match &error {
                    crate::ports::PublishError::Rejected(reason) => {
                        tracing::warn!(
                            id = record.id,
                            reason = %reason,
                            "Platform rejected content; the text needs another review pass"
                        );
                    }
                    other => {
                        tracing::warn!(id = record.id, error = %other, "Publish failed, will retry on a later cycle");
                    }
                }
                self.store.release_claim(record.id).await?;
                Ok(CycleOutcome::PublishFailed {
                    id: record.id,
                    error,
                })
            }
        }
    }

    /// Run cycles until the shutdown future resolves
    ///
    /// Cancellation is only observed at the sleep boundary so an in-flight
    /// publish/record step is never interrupted mid-way. A failed cycle
    /// sleeps the short backoff interval instead of the full dispatch
    /// interval.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let delay = match self.cycle().await {
                Ok(outcome) => {
                    if let CycleOutcome::Sent { id, .. } = &outcome {
                        tracing::debug!(id, "Cycle sent a record");
                    }
                    self.config.interval
                }
                Err(e) => {
                    tracing::error!(error = %e, "Dispatch cycle failed, backing off");
                    self.config.backoff
                }
            };

            tokio::select! {
                _ = sleep(delay) => {}
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping dispatcher");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BestExample, ReviewFilter, TweetRecord, TweetStatus};
    use crate::ports::{PublishError, PublishReceipt};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::OffsetDateTime;

    #[derive(Default)]
    struct FakeStore {
        records: StdMutex<HashMap<TweetId, TweetRecord>>,
        claims: StdMutex<HashSet<TweetId>>,
        fail_mark_sent: std::sync::atomic::AtomicBool,
    }

    impl FakeStore {
        fn with_approved(score: i64) -> Self {
            let store = Self::default();
            store.put(TweetRecord {
                id: 1,
                text: "gm".to_string(),
                text_adjusted: None,
                status: TweetStatus::Approved,
                score: Some(score),
                context: "runes".to_string(),
                created_at: OffsetDateTime::now_utc(),
                updated_at: None,
                sent_at: None,
            });
            store
        }

        fn put(&self, record: TweetRecord) {
            self.records.lock().unwrap().insert(record.id, record);
        }

        fn get(&self, id: TweetId) -> TweetRecord {
            self.records.lock().unwrap()[&id].clone()
        }
    }

    #[async_trait]
    impl TweetStore for FakeStore {
        async fn insert(&self, _text: &str, _context: &str) -> Result<TweetId, StoreError> {
            unimplemented!()
        }

        async fn get_pending_review(
            &self,
            _filter: &ReviewFilter,
        ) -> Result<Vec<TweetRecord>, StoreError> {
            unimplemented!()
        }

        async fn update_review(
            &self,
            _id: TweetId,
            _status: TweetStatus,
            _text_adjusted: Option<&str>,
            _score: Option<i64>,
        ) -> Result<bool, StoreError> {
            unimplemented!()
        }

        async fn claim_next_sendable(
            &self,
            min_score: i64,
            _lease: Duration,
        ) -> Result<Option<TweetRecord>, StoreError> {
            // Claim set guarded by the same lock as the scan, so two
            // concurrent callers cannot win the same record
            let records = self.records.lock().unwrap();
            let mut claims = self.claims.lock().unwrap();

            let mut candidates: Vec<&TweetRecord> = records
                .values()
                .filter(|r| {
                    r.status == TweetStatus::Approved
                        && r.sent_at.is_none()
                        && r.score.is_some_and(|s| s >= min_score)
                        && !claims.contains(&r.id)
                })
                .collect();
            candidates.sort_by(|a, b| {
                b.score
                    .cmp(&a.score)
                    .then(a.created_at.cmp(&b.created_at))
            });

            match candidates.first() {
                Some(record) => {
                    claims.insert(record.id);
                    Ok(Some((*record).clone()))
                }
                None => Ok(None),
            }
        }

        async fn release_claim(&self, id: TweetId) -> Result<bool, StoreError> {
            Ok(self.claims.lock().unwrap().remove(&id))
        }

        async fn mark_sent(&self, id: TweetId) -> Result<bool, StoreError> {
            if self.fail_mark_sent.load(Ordering::SeqCst) {
                return Err(StoreError::Database("store unreachable".to_string()));
            }
            let mut records = self.records.lock().unwrap();
            match records.get_mut(&id) {
                Some(record) if record.sent_at.is_none() => {
                    record.status = TweetStatus::Sent;
                    record.sent_at = Some(OffsetDateTime::now_utc());
                    record.updated_at = record.sent_at;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn best_examples(&self, _min_score: i64) -> Result<Vec<BestExample>, StoreError> {
            unimplemented!()
        }

        async fn distinct_contexts(&self) -> Result<Vec<String>, StoreError> {
            unimplemented!()
        }

        async fn stats_by_status(&self) -> Result<Vec<(TweetStatus, i64)>, StoreError> {
            unimplemented!()
        }
    }

    struct FakePublisher {
        calls: AtomicUsize,
        fail_with: Option<fn() -> PublishError>,
    }

    impl FakePublisher {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_with: None,
            }
        }

        fn failing(f: fn() -> PublishError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_with: Some(f),
            }
        }
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn publish(&self, _text: &str) -> Result<PublishReceipt, PublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(f) => Err(f()),
                None => Ok(PublishReceipt {
                    external_id: "ext-1".to_string(),
                }),
            }
        }
    }

    fn dispatcher(
        store: Arc<FakeStore>,
        publisher: Arc<FakePublisher>,
    ) -> Dispatcher<FakeStore, FakePublisher> {
        Dispatcher::new(store, publisher, DispatchConfig::default())
    }

    #[tokio::test]
    async fn test_idle_when_nothing_sendable() {
        let store = Arc::new(FakeStore::default());
        let publisher = Arc::new(FakePublisher::ok());
        let d = dispatcher(store, Arc::clone(&publisher));

        let outcome = d.cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Idle));
        assert_eq!(publisher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_cycle_marks_sent() {
        let store = Arc::new(FakeStore::with_approved(3));
        let publisher = Arc::new(FakePublisher::ok());
        let d = dispatcher(Arc::clone(&store), publisher);

        let outcome = d.cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Sent { id: 1, .. }));

        let record = store.get(1);
        assert_eq!(record.status, TweetStatus::Sent);
        assert!(record.sent_at.is_some());
    }

    #[tokio::test]
    async fn test_below_threshold_is_not_claimed() {
        let store = Arc::new(FakeStore::with_approved(1));
        let publisher = Arc::new(FakePublisher::ok());
        let d = dispatcher(store, Arc::clone(&publisher));

        let outcome = d.cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Idle));
        assert_eq!(publisher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_leaves_record_unsent() {
        let store = Arc::new(FakeStore::with_approved(3));
        let publisher = Arc::new(FakePublisher::failing(|| {
            PublishError::Transport("connection reset".to_string())
        }));
        let d = dispatcher(Arc::clone(&store), publisher);

        let outcome = d.cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::PublishFailed { id: 1, .. }));

        let record = store.get(1);
        assert_eq!(record.status, TweetStatus::Approved);
        assert!(record.sent_at.is_none());
        // Claim released: the next cycle reconsiders the record
        assert!(store.claims.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hazard_halts_record_without_republishing() {
        let store = Arc::new(FakeStore::with_approved(3));
        store.fail_mark_sent.store(true, Ordering::SeqCst);
        let publisher = Arc::new(FakePublisher::ok());
        let d = dispatcher(Arc::clone(&store), Arc::clone(&publisher));

        let outcome = d.cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Hazard { id: 1, .. }));
        assert_eq!(publisher.calls.load(Ordering::SeqCst), 1);

        // The record is offered again once the lease would expire, but the
        // halted set prevents a second external publish
        store.claims.lock().unwrap().clear();
        store.fail_mark_sent.store(false, Ordering::SeqCst);

        let outcome = d.cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Skipped { id: 1 }));
        assert_eq!(publisher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dry_run_publishes_nothing() {
        let store = Arc::new(FakeStore::with_approved(3));
        let publisher = Arc::new(FakePublisher::ok());
        let d = Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&publisher),
            DispatchConfig {
                dry_run: true,
                ..Default::default()
            },
        );

        let outcome = d.cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::DryRun { id: 1 }));
        assert_eq!(publisher.calls.load(Ordering::SeqCst), 0);
        assert!(store.get(1).sent_at.is_none());
    }

    #[tokio::test]
    async fn test_no_double_dispatch_under_concurrency() {
        let store = Arc::new(FakeStore::with_approved(3));
        let publisher = Arc::new(FakePublisher::ok());
        let d = Arc::new(dispatcher(Arc::clone(&store), Arc::clone(&publisher)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let d = Arc::clone(&d);
            handles.push(tokio::spawn(async move { d.cycle().await.unwrap() }));
        }

        let mut sent = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), CycleOutcome::Sent { .. }) {
                sent += 1;
            }
        }

        assert_eq!(sent, 1, "exactly one caller may mark the record sent");
        assert_eq!(publisher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(1).status, TweetStatus::Sent);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = Arc::new(FakeStore::default());
        let publisher = Arc::new(FakePublisher::ok());
        let d = Dispatcher::new(
            store,
            publisher,
            DispatchConfig {
                interval: Duration::from_secs(3600),
                ..Default::default()
            },
        );

        // Shutdown already resolved: the loop runs one cycle and exits at
        // the sleep boundary
        tokio::time::timeout(Duration::from_secs(5), d.run(async {}))
            .await
            .expect("run should return promptly after shutdown");
    }
}
