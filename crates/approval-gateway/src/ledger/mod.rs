//! Poll approval ledger with persistent storage.
//!
//! The ledger is the system of record for operator decisions: the
//! ingestion paths (webhook, update poller) write verdicts into it and
//! the check endpoint reads them back, so a decision survives between
//! requests without re-fetching the bot's update log.

mod store;

pub use store::Store;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Operator decision for a poll.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approved,
    Rejected,
}

impl Verdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved)
    }
}

/// One tracked approval poll.
///
/// `verdict == None` means the operator has not answered yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollRecord {
    /// Poll identifier assigned by the messaging service
    pub poll_id: String,

    /// Phone number the poll was opened for, when known
    pub phone_number: Option<String>,

    /// When the poll was opened (or first answered, whichever was seen first)
    pub created_at: DateTime<Utc>,

    /// Operator decision, if one arrived
    pub verdict: Option<Verdict>,

    /// `update_id` of the answer that produced `verdict`
    pub decided_update_id: Option<i64>,

    /// When the decision was recorded
    pub decided_at: Option<DateTime<Utc>>,
}

impl PollRecord {
    /// Create a new undecided record.
    pub fn new_pending(poll_id: String, phone_number: Option<String>) -> Self {
        Self {
            poll_id,
            phone_number,
            created_at: Utc::now(),
            verdict: None,
            decided_update_id: None,
            decided_at: None,
        }
    }

    pub fn is_decided(&self) -> bool {
        self.verdict.is_some()
    }
}

/// Mapping from poll identifier to its record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovalLedger {
    records: HashMap<String, PollRecord>,
}

impl ApprovalLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Track a freshly opened poll.
    ///
    /// Upsert: if an answer already arrived for this poll id (the webhook
    /// can beat the verification handler to the ledger), the verdict is
    /// kept; only the phone number is filled in.
    pub fn open_poll(&mut self, poll_id: &str, phone_number: Option<String>) {
        let record = self
            .records
            .entry(poll_id.to_string())
            .or_insert_with(|| PollRecord::new_pending(poll_id.to_string(), None));

        if phone_number.is_some() {
            record.phone_number = phone_number;
        }
    }

    /// Record an operator answer for a poll.
    ///
    /// Last writer wins by `update_id`: an answer is applied only if it is
    /// at least as recent as the one already recorded, so a changed vote
    /// overrides an earlier one and a re-delivered update is idempotent.
    /// Unknown poll ids are upserted (an answer can be observed without a
    /// preceding `open_poll`, e.g. after a memory-mode restart).
    ///
    /// Returns whether the answer was applied.
    pub fn record_answer(
        &mut self,
        poll_id: &str,
        update_id: i64,
        verdict: Verdict,
        decided_at: DateTime<Utc>,
    ) -> bool {
        let record = self
            .records
            .entry(poll_id.to_string())
            .or_insert_with(|| PollRecord::new_pending(poll_id.to_string(), None));

        if let Some(previous) = record.decided_update_id {
            if update_id < previous {
                return false;
            }
        }

        record.verdict = Some(verdict);
        record.decided_update_id = Some(update_id);
        record.decided_at = Some(decided_at);
        true
    }

    /// Decision for a poll, if one was recorded.
    pub fn verdict(&self, poll_id: &str) -> Option<Verdict> {
        self.records.get(poll_id).and_then(|r| r.verdict)
    }

    /// Get a record by poll id.
    pub fn get(&self, poll_id: &str) -> Option<&PollRecord> {
        self.records.get(poll_id)
    }

    /// Total number of tracked polls.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Number of polls awaiting a decision.
    pub fn count_pending(&self) -> usize {
        self.records.values().filter(|r| !r.is_decided()).count()
    }

    /// Number of decided polls.
    pub fn count_decided(&self) -> usize {
        self.records.values().filter(|r| r.is_decided()).count()
    }

    /// Drop records older than `max_age`. Returns how many were removed.
    pub fn prune_expired(&mut self, max_age: Duration) -> usize {
        let Ok(max_age) = ChronoDuration::from_std(max_age) else {
            return 0;
        };
        let cutoff = Utc::now() - max_age;

        let before = self.records.len();
        self.records.retain(|_, record| record.created_at > cutoff);
        before - self.records.len()
    }
}

/// Spawn a background task that periodically prunes expired records and
/// persists the ledger when anything was removed.
pub fn spawn_pruner(
    ledger: Arc<RwLock<ApprovalLedger>>,
    store: Arc<Store>,
    ttl: Duration,
) -> tokio::task::JoinHandle<()> {
    let prune_interval = Duration::from_secs(60);

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(prune_interval).await;

            let mut guard = ledger.write().await;
            let removed = guard.prune_expired(ttl);
            if removed > 0 {
                debug!("Pruned {} expired poll records", removed);
                if let Err(e) = store.save(&guard).await {
                    error!("Failed to persist ledger after pruning: {}", e);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_poll_and_verdict() {
        let mut ledger = ApprovalLedger::new();
        ledger.open_poll("poll-1", Some("+14155551234".into()));

        assert_eq!(ledger.count(), 1);
        assert_eq!(ledger.count_pending(), 1);
        assert_eq!(ledger.verdict("poll-1"), None);

        assert!(ledger.record_answer("poll-1", 10, Verdict::Approved, Utc::now()));
        assert_eq!(ledger.verdict("poll-1"), Some(Verdict::Approved));
        assert_eq!(ledger.count_decided(), 1);
        assert_eq!(ledger.count_pending(), 0);
    }

    #[test]
    fn test_later_answer_overrides_earlier() {
        let mut ledger = ApprovalLedger::new();
        ledger.open_poll("poll-1", None);

        assert!(ledger.record_answer("poll-1", 10, Verdict::Rejected, Utc::now()));
        assert!(ledger.record_answer("poll-1", 11, Verdict::Approved, Utc::now()));

        assert_eq!(ledger.verdict("poll-1"), Some(Verdict::Approved));
        assert_eq!(ledger.get("poll-1").unwrap().decided_update_id, Some(11));
    }

    #[test]
    fn test_stale_answer_is_ignored() {
        let mut ledger = ApprovalLedger::new();

        assert!(ledger.record_answer("poll-1", 11, Verdict::Approved, Utc::now()));
        // An older update delivered late must not flip the decision.
        assert!(!ledger.record_answer("poll-1", 10, Verdict::Rejected, Utc::now()));

        assert_eq!(ledger.verdict("poll-1"), Some(Verdict::Approved));
    }

    #[test]
    fn test_redelivered_answer_is_idempotent() {
        let mut ledger = ApprovalLedger::new();

        assert!(ledger.record_answer("poll-1", 10, Verdict::Rejected, Utc::now()));
        assert!(ledger.record_answer("poll-1", 10, Verdict::Rejected, Utc::now()));

        assert_eq!(ledger.verdict("poll-1"), Some(Verdict::Rejected));
        assert_eq!(ledger.count(), 1);
    }

    #[test]
    fn test_answer_before_open_keeps_verdict() {
        let mut ledger = ApprovalLedger::new();

        // Webhook delivery lands before the verification handler records
        // the poll.
        assert!(ledger.record_answer("poll-1", 10, Verdict::Approved, Utc::now()));
        ledger.open_poll("poll-1", Some("+14155551234".into()));

        assert_eq!(ledger.verdict("poll-1"), Some(Verdict::Approved));
        assert_eq!(
            ledger.get("poll-1").unwrap().phone_number.as_deref(),
            Some("+14155551234")
        );
    }

    #[test]
    fn test_prune_expired() {
        let mut ledger = ApprovalLedger::new();
        ledger.open_poll("old", None);
        ledger.open_poll("fresh", None);

        // Age one record past the TTL by hand.
        ledger.records.get_mut("old").unwrap().created_at =
            Utc::now() - ChronoDuration::hours(48);

        let removed = ledger.prune_expired(Duration::from_secs(24 * 60 * 60));
        assert_eq!(removed, 1);
        assert!(ledger.get("old").is_none());
        assert!(ledger.get("fresh").is_some());
    }

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_string(&Verdict::Approved).unwrap();
        assert_eq!(json, "\"approved\"");

        let json = serde_json::to_string(&Verdict::Rejected).unwrap();
        assert_eq!(json, "\"rejected\"");
    }

    #[test]
    fn test_ledger_serialization_round_trip() {
        let mut ledger = ApprovalLedger::new();
        ledger.open_poll("poll-1", Some("+14155551234".into()));
        ledger.record_answer("poll-1", 10, Verdict::Approved, Utc::now());

        let json = serde_json::to_string(&ledger).unwrap();
        let restored: ApprovalLedger = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.verdict("poll-1"), Some(Verdict::Approved));
        assert_eq!(restored.count(), 1);
    }
}
