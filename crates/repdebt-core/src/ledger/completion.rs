//! Registration, reported completions and resets.
//!
//! Completions always count fully toward the lifetime total. The part of a
//! completion that does not fit inside the outstanding debt is not carried
//! forward as credit.

use serde::Serialize;
use tracing::{debug, info};

use super::{LedgerSnapshot, ParticipantRecord};
use crate::error::{NotFoundError, ValidationError};

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Created(ParticipantRecord),
    AlreadyRegistered(ParticipantRecord),
}

impl Registration {
    pub fn record(&self) -> &ParticipantRecord {
        match self {
            Registration::Created(r) | Registration::AlreadyRegistered(r) => r,
        }
    }
}

/// What a reported completion did to a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReceipt {
    pub record: ParticipantRecord,
    pub reported: u64,
    /// Portion of `reported` that went toward the debt.
    pub paid: u64,
}

/// Ensures a record exists for `participant_id`.
///
/// Existing counters are never touched; the display name is refreshed to the
/// latest observed value.
pub fn register(
    snapshot: &mut LedgerSnapshot,
    participant_id: &str,
    display_name: &str,
) -> Registration {
    let (record, created) = upsert(snapshot, participant_id, display_name);
    if created {
        Registration::Created(record.clone())
    } else {
        Registration::AlreadyRegistered(record.clone())
    }
}

/// The record for `participant_id`, inserted zeroed if missing, with its
/// display name refreshed. The flag is `true` when the record is new.
fn upsert<'a>(
    snapshot: &'a mut LedgerSnapshot,
    participant_id: &str,
    display_name: &str,
) -> (&'a mut ParticipantRecord, bool) {
    let created = snapshot.participant(participant_id).is_none();
    let record =
        snapshot.insert_participant(ParticipantRecord::new(participant_id, display_name));
    record.display_name = display_name.to_string();
    if created {
        info!(participant_id, display_name, "participant registered");
    }
    (record, created)
}

/// Applies a reported completion, creating the participant on first contact.
///
/// Non-positive counts are rejected before anything is mutated.
pub fn apply_completion(
    snapshot: &mut LedgerSnapshot,
    participant_id: &str,
    display_name: &str,
    reported_count: i64,
) -> Result<CompletionReceipt, ValidationError> {
    let reported = u64::try_from(reported_count)
        .ok()
        .filter(|n| *n > 0)
        .ok_or(ValidationError::NonPositiveCount {
            count: reported_count,
        })?;

    let (record, _) = upsert(snapshot, participant_id, display_name);
    record.total_completed = record.total_completed.saturating_add(reported);
    let paid = record.outstanding_debt.min(reported);
    record.outstanding_debt -= paid;

    debug!(
        participant_id,
        reported,
        paid,
        total = record.total_completed,
        debt = record.outstanding_debt,
        "completion applied"
    );

    Ok(CompletionReceipt {
        record: record.clone(),
        reported,
        paid,
    })
}

/// Zeroes both counters of exactly one participant.
pub fn reset(
    snapshot: &mut LedgerSnapshot,
    participant_id: &str,
) -> Result<ParticipantRecord, NotFoundError> {
    let record = snapshot
        .participant_mut(participant_id)
        .ok_or_else(|| NotFoundError::Participant {
            id: participant_id.to_string(),
        })?;

    record.total_completed = 0;
    record.outstanding_debt = 0;
    info!(participant_id, "participant stats reset");
    Ok(record.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn with_debt(id: &str, debt: u64, total: u64) -> LedgerSnapshot {
        let mut snapshot = LedgerSnapshot::new();
        snapshot.insert_participant(ParticipantRecord {
            id: id.into(),
            display_name: "Test".into(),
            total_completed: total,
            outstanding_debt: debt,
        });
        snapshot
    }

    #[test]
    fn register_creates_zeroed_record() {
        let mut snapshot = LedgerSnapshot::new();
        let outcome = register(&mut snapshot, "1", "Anna");
        assert!(matches!(outcome, Registration::Created(_)));
        let record = snapshot.participant("1").unwrap();
        assert_eq!(record.total_completed, 0);
        assert_eq!(record.outstanding_debt, 0);
    }

    #[test]
    fn register_twice_keeps_counters_and_refreshes_name() {
        let mut snapshot = with_debt("1", 8, 40);
        let outcome = register(&mut snapshot, "1", "Anna B.");
        assert!(matches!(outcome, Registration::AlreadyRegistered(_)));
        assert_eq!(snapshot.len(), 1);
        let record = snapshot.participant("1").unwrap();
        assert_eq!(record.display_name, "Anna B.");
        assert_eq!(record.total_completed, 40);
        assert_eq!(record.outstanding_debt, 8);
    }

    #[test]
    fn completion_creates_participant_on_first_report() {
        let mut snapshot = LedgerSnapshot::new();
        let receipt = apply_completion(&mut snapshot, "9", "Ira", 15).unwrap();
        assert_eq!(receipt.record.total_completed, 15);
        assert_eq!(receipt.paid, 0);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn completion_refreshes_name_of_known_participant() {
        let mut snapshot = with_debt("1", 3, 10);
        let receipt = apply_completion(&mut snapshot, "1", "Anna B.", 5).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(receipt.record.display_name, "Anna B.");
        assert_eq!(receipt.record.total_completed, 15);
        assert_eq!(receipt.record.outstanding_debt, 0);
        assert_eq!(snapshot.participant("1"), Some(&receipt.record));
    }

    #[test]
    fn completion_pays_debt_up_to_its_size() {
        let mut snapshot = with_debt("1", 17, 4);
        let receipt = apply_completion(&mut snapshot, "1", "Test", 20).unwrap();
        assert_eq!(receipt.paid, 17);
        assert_eq!(receipt.record.total_completed, 24);
        assert_eq!(receipt.record.outstanding_debt, 0);
    }

    #[test]
    fn non_positive_counts_are_rejected_without_mutation() {
        let mut snapshot = with_debt("1", 5, 5);
        let before = snapshot.clone();
        for count in [0, -3] {
            let err = apply_completion(&mut snapshot, "1", "Renamed", count).unwrap_err();
            assert_eq!(err, ValidationError::NonPositiveCount { count });
        }
        assert_eq!(snapshot, before);

        let mut empty = LedgerSnapshot::new();
        assert!(apply_completion(&mut empty, "2", "New", 0).is_err());
        assert!(empty.is_empty());
    }

    #[test]
    fn reset_touches_only_target() {
        let mut snapshot = with_debt("1", 5, 50);
        snapshot.insert_participant(ParticipantRecord {
            id: "2".into(),
            display_name: "Other".into(),
            total_completed: 7,
            outstanding_debt: 3,
        });

        let record = reset(&mut snapshot, "1").unwrap();
        assert_eq!(record.total_completed, 0);
        assert_eq!(record.outstanding_debt, 0);

        let other = snapshot.participant("2").unwrap();
        assert_eq!(other.total_completed, 7);
        assert_eq!(other.outstanding_debt, 3);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn reset_of_unknown_participant_is_not_found() {
        let mut snapshot = LedgerSnapshot::new();
        let err = reset(&mut snapshot, "nobody").unwrap_err();
        assert_eq!(err, NotFoundError::Participant { id: "nobody".into() });
        assert!(snapshot.is_empty());
    }

    proptest! {
        #[test]
        fn completion_arithmetic(debt in 0u64..10_000, total in 0u64..10_000, count in 1i64..10_000) {
            let mut snapshot = with_debt("p", debt, total);
            let receipt = apply_completion(&mut snapshot, "p", "P", count).unwrap();
            let count = count as u64;
            prop_assert_eq!(receipt.record.total_completed, total + count);
            prop_assert_eq!(receipt.record.outstanding_debt, debt.saturating_sub(count));
            prop_assert_eq!(receipt.paid, debt.min(count));
        }
    }
}
