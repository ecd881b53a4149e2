//! Interpretation of operator poll answers.
//!
//! The approval poll is a two-option poll; which option the operator
//! picked decides the verdict. Votes can be changed or retracted in the
//! chat, so interpretation always favors the most recent answer.

use crate::ledger::{ApprovalLedger, Verdict};
use chrono::Utc;
use std::collections::HashSet;
use telegram_client::{PollAnswer, Update};
use tracing::info;

/// Options of an approval poll, in order.
pub const POLL_OPTIONS: [&str; 2] = ["Approve", "Reject"];

/// Option index that counts as approval.
const APPROVE_OPTION: i64 = 0;

/// Interpret a single poll answer.
///
/// Approval means the approve option is among the selected ids, not
/// that the reject option is absent: a retracted vote carries an empty
/// id list and is treated as a rejection.
pub fn verdict_from_answer(answer: &PollAnswer) -> Verdict {
    if answer.option_ids.contains(&APPROVE_OPTION) {
        Verdict::Approved
    } else {
        Verdict::Rejected
    }
}

/// Most recent answer for `poll_id` in a batch of updates.
///
/// Updates arrive in ascending `update_id` order, so scanning from the
/// end finds the operator's latest word first. Returns the update id
/// alongside the verdict so the ledger can order answers across batches.
pub fn latest_poll_answer(updates: &[Update], poll_id: &str) -> Option<(i64, Verdict)> {
    updates.iter().rev().find_map(|update| {
        update
            .poll_answer
            .as_ref()
            .filter(|answer| answer.poll_id == poll_id)
            .map(|answer| (update.update_id, verdict_from_answer(answer)))
    })
}

/// Fold a batch of updates into the ledger.
///
/// Every poll mentioned in the batch gets at most one `record_answer`
/// call, with that poll's most recent answer in the batch. Returns how
/// many records actually changed.
pub fn apply_updates(ledger: &mut ApprovalLedger, updates: &[Update]) -> usize {
    let poll_ids: HashSet<&str> = updates
        .iter()
        .filter_map(|u| u.poll_answer.as_ref())
        .map(|a| a.poll_id.as_str())
        .collect();

    let now = Utc::now();
    let mut applied = 0;
    for poll_id in poll_ids {
        if let Some((update_id, verdict)) = latest_poll_answer(updates, poll_id) {
            if ledger.record_answer(poll_id, update_id, verdict, now) {
                info!(poll_id, update_id, ?verdict, "Recorded poll answer");
                applied += 1;
            }
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use telegram_client::PollAnswer;

    fn answer_update(update_id: i64, poll_id: &str, option_ids: Vec<i64>) -> Update {
        Update {
            update_id,
            poll_answer: Some(PollAnswer {
                poll_id: poll_id.to_string(),
                user: None,
                option_ids,
            }),
        }
    }

    fn other_update(update_id: i64) -> Update {
        Update {
            update_id,
            poll_answer: None,
        }
    }

    fn answer(option_ids: Vec<i64>) -> PollAnswer {
        PollAnswer {
            poll_id: "poll-1".to_string(),
            user: None,
            option_ids,
        }
    }

    #[test]
    fn test_approve_option_selected() {
        assert_eq!(verdict_from_answer(&answer(vec![0])), Verdict::Approved);
    }

    #[test]
    fn test_reject_option_selected() {
        assert_eq!(verdict_from_answer(&answer(vec![1])), Verdict::Rejected);
    }

    #[test]
    fn test_approve_among_multiple_selections() {
        // Approval is presence of option 0, whatever else is selected.
        assert_eq!(verdict_from_answer(&answer(vec![0, 1])), Verdict::Approved);
        assert_eq!(verdict_from_answer(&answer(vec![1, 0])), Verdict::Approved);
    }

    #[test]
    fn test_retracted_vote_is_rejected() {
        assert_eq!(verdict_from_answer(&answer(vec![])), Verdict::Rejected);
    }

    #[test]
    fn test_latest_answer_no_match_is_none() {
        let updates = vec![
            other_update(1),
            answer_update(2, "other-poll", vec![0]),
        ];
        assert_eq!(latest_poll_answer(&updates, "poll-1"), None);
    }

    #[test]
    fn test_latest_answer_picks_most_recent() {
        let updates = vec![
            answer_update(10, "poll-1", vec![1]),
            other_update(11),
            answer_update(12, "poll-1", vec![0]),
        ];
        assert_eq!(
            latest_poll_answer(&updates, "poll-1"),
            Some((12, Verdict::Approved))
        );
    }

    #[test]
    fn test_latest_answer_ignores_other_polls() {
        let updates = vec![
            answer_update(10, "poll-1", vec![0]),
            answer_update(11, "poll-2", vec![1]),
        ];
        assert_eq!(
            latest_poll_answer(&updates, "poll-1"),
            Some((10, Verdict::Approved))
        );
    }

    #[test]
    fn test_apply_updates_changed_vote_in_one_batch() {
        let mut ledger = ApprovalLedger::new();
        let updates = vec![
            answer_update(10, "poll-1", vec![0]),
            answer_update(11, "poll-1", vec![1]),
        ];

        assert_eq!(apply_updates(&mut ledger, &updates), 1);
        assert_eq!(ledger.verdict("poll-1"), Some(Verdict::Rejected));
    }

    #[test]
    fn test_apply_updates_across_batches_keeps_latest() {
        let mut ledger = ApprovalLedger::new();

        apply_updates(&mut ledger, &[answer_update(10, "poll-1", vec![1])]);
        apply_updates(&mut ledger, &[answer_update(11, "poll-1", vec![0])]);
        assert_eq!(ledger.verdict("poll-1"), Some(Verdict::Approved));

        // Late redelivery of the earlier batch changes nothing.
        assert_eq!(
            apply_updates(&mut ledger, &[answer_update(10, "poll-1", vec![1])]),
            0
        );
        assert_eq!(ledger.verdict("poll-1"), Some(Verdict::Approved));
    }

    #[test]
    fn test_apply_updates_multiple_polls() {
        let mut ledger = ApprovalLedger::new();
        let updates = vec![
            answer_update(10, "poll-1", vec![0]),
            answer_update(11, "poll-2", vec![1]),
            other_update(12),
        ];

        assert_eq!(apply_updates(&mut ledger, &updates), 2);
        assert_eq!(ledger.verdict("poll-1"), Some(Verdict::Approved));
        assert_eq!(ledger.verdict("poll-2"), Some(Verdict::Rejected));
    }

    #[test]
    fn test_apply_updates_empty_batch() {
        let mut ledger = ApprovalLedger::new();
        assert_eq!(apply_updates(&mut ledger, &[]), 0);
        assert_eq!(ledger.count(), 0);
    }
}
