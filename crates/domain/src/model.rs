//! Domain models and value objects

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ports::PublishError;

/// Record identifier, assigned by the store at insertion
pub type TweetId = i64;

/// Review lifecycle status of a tweet record
///
/// Records are created in `Review`, moved to `Approved` or `Rejected` by a
/// human reviewer (any number of times; `Rejected` is not terminal), and
/// end in `Sent` once the dispatcher has published them. `Sent` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TweetStatus {
    Review,
    Approved,
    Rejected,
    Sent,
}

impl TweetStatus {
    /// Storage representation (also the interop contract for the review UI)
    pub fn as_str(&self) -> &'static str {
        match self {
            TweetStatus::Review => "review",
            TweetStatus::Approved => "approved",
            TweetStatus::Rejected => "rejected",
            TweetStatus::Sent => "sent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "review" => Some(TweetStatus::Review),
            "approved" => Some(TweetStatus::Approved),
            "rejected" => Some(TweetStatus::Rejected),
            "sent" => Some(TweetStatus::Sent),
            _ => None,
        }
    }
}

impl std::fmt::Display for TweetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated post tracked from creation through review to publication
///
/// Field names are normative for interop with the review surface:
/// `id, text, text_adjusted, status, score, context, created_at,
/// updated_at, sent_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetRecord {
    /// Unique id, immutable after insertion
    pub id: TweetId,
    /// Original generated text, immutable after creation
    pub text: String,
    /// Human-edited replacement text; once set it is never cleared and is
    /// preferred by all downstream consumers
    pub text_adjusted: Option<String>,
    /// Lifecycle status
    pub status: TweetStatus,
    /// Review-assigned quality rating; meaningful only while `Approved`
    pub score: Option<i64>,
    /// Topical bucket the record was generated for
    pub context: String,
    /// Set at insertion, immutable
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Set whenever status/score/text_adjusted change
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    /// Set exactly once, on successful publication. Its presence is the
    /// authoritative "already published" marker, independent of `status`.
    #[serde(with = "time::serde::rfc3339::option")]
    pub sent_at: Option<OffsetDateTime>,
}

impl TweetRecord {
    /// The text downstream consumers should use: the human edit when one
    /// exists, otherwise the original generated text.
    pub fn effective_text(&self) -> &str {
        self.text_adjusted.as_deref().unwrap_or(&self.text)
    }
}

/// Filter for review-surface listings
#[derive(Debug, Clone)]
pub struct ReviewFilter {
    /// Status to match; `None` lists every status
    pub status: Option<TweetStatus>,
    /// Context to match; `None` lists every context
    pub context: Option<String>,
}

impl Default for ReviewFilter {
    fn default() -> Self {
        Self {
            status: Some(TweetStatus::Review),
            context: None,
        }
    }
}

/// A promoted high-scoring record usable as a few-shot example
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestExample {
    pub context: String,
    /// `text_adjusted` when present, else `text`
    pub text: String,
    pub score: i64,
}

/// Outcome of one dispatch cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// No sendable record was available
    Idle,
    /// A record was published and durably marked sent
    Sent { id: TweetId, external_id: String },
    /// Dry-run mode: a record qualified but nothing was published
    DryRun { id: TweetId },
    /// The publish call failed; the record stays approved/unsent and will
    /// be reconsidered on a later cycle
    PublishFailed { id: TweetId, error: PublishError },
    /// Publish succeeded externally but `mark_sent` failed. The record is
    /// halted from automatic sending until an operator reconciles it. The
    /// halt lives in process memory only: a restart clears it, so the
    /// record must be reconciled (marked sent or pulled from approved)
    /// before the dispatcher is restarted.
    Hazard { id: TweetId, external_id: String },
    /// The claimed record is halted from a previous hazard
    Skipped { id: TweetId },
}
