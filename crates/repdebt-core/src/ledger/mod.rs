//! Participant ledger: records, snapshot, and the rules that mutate them.
//!
//! - [`completion`]: registration, reported completions, resets
//! - [`accrual`]: challenge calendar and daily quota accrual
//!
//! A [`LedgerSnapshot`] is plain data. Loading and saving it is the job of a
//! [`crate::storage::LedgerStore`]; serializing mutations is the job of
//! [`crate::service::LedgerHandle`].

pub mod accrual;
pub mod completion;

pub use accrual::{accrue_day, AccrualOutcome, ChallengeCalendar};
pub use completion::{apply_completion, register, reset, CompletionReceipt, Registration};

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One tracked participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantRecord {
    /// Platform-assigned id, never regenerated.
    pub id: String,
    pub display_name: String,
    /// Lifetime repetitions reported.
    pub total_completed: u64,
    /// Accrued quota not yet paid off by completions.
    pub outstanding_debt: u64,
}

impl ParticipantRecord {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            total_completed: 0,
            outstanding_debt: 0,
        }
    }
}

/// Every participant and broadcast destination at a point in time.
///
/// Participants iterate in first-registration order, which keeps rendered
/// reports stable across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SnapshotFile", into = "SnapshotFile")]
pub struct LedgerSnapshot {
    participants: IndexMap<String, ParticipantRecord>,
    destinations: IndexSet<String>,
    /// Last calendar date each named trigger accrued for.
    accruals: BTreeMap<String, NaiveDate>,
}

impl LedgerSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn participant(&self, id: &str) -> Option<&ParticipantRecord> {
        self.participants.get(id)
    }

    pub fn participants(&self) -> impl Iterator<Item = &ParticipantRecord> {
        self.participants.values()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.destinations.iter().map(String::as_str)
    }

    /// Adds a broadcast destination. Returns `false` if it was already known.
    pub fn register_destination(&mut self, destination_id: impl Into<String>) -> bool {
        self.destinations.insert(destination_id.into())
    }

    pub fn last_accrual(&self, trigger: &str) -> Option<NaiveDate> {
        self.accruals.get(trigger).copied()
    }

    pub(crate) fn mark_accrued(&mut self, trigger: &str, date: NaiveDate) {
        self.accruals.insert(trigger.to_string(), date);
    }

    pub(crate) fn participant_mut(&mut self, id: &str) -> Option<&mut ParticipantRecord> {
        self.participants.get_mut(id)
    }

    pub(crate) fn participants_mut(&mut self) -> impl Iterator<Item = &mut ParticipantRecord> {
        self.participants.values_mut()
    }

    pub(crate) fn insert_participant(&mut self, record: ParticipantRecord) -> &mut ParticipantRecord {
        let id = record.id.clone();
        self.participants.entry(id).or_insert(record)
    }
}

// ── On-disk shape ────────────────────────────────────────────────────
//
// Kept readable by (and from) the `data.json` layout older deployments
// already have on disk: `users` keyed by id, numeric or string `chatIds`.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    users: IndexMap<String, StoredParticipant>,
    #[serde(default, rename = "chatIds")]
    chat_ids: Vec<DestinationId>,
    #[serde(default)]
    accruals: BTreeMap<String, NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredParticipant {
    name: String,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    debt: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DestinationId {
    Text(String),
    Number(i64),
}

impl From<DestinationId> for String {
    fn from(id: DestinationId) -> Self {
        match id {
            DestinationId::Text(s) => s,
            DestinationId::Number(n) => n.to_string(),
        }
    }
}

impl From<SnapshotFile> for LedgerSnapshot {
    fn from(file: SnapshotFile) -> Self {
        let participants = file
            .users
            .into_iter()
            .map(|(id, stored)| {
                let record = ParticipantRecord {
                    id: id.clone(),
                    display_name: stored.name,
                    total_completed: stored.total,
                    outstanding_debt: stored.debt,
                };
                (id, record)
            })
            .collect();

        Self {
            participants,
            destinations: file.chat_ids.into_iter().map(String::from).collect(),
            accruals: file.accruals,
        }
    }
}

impl From<LedgerSnapshot> for SnapshotFile {
    fn from(snapshot: LedgerSnapshot) -> Self {
        Self {
            users: snapshot
                .participants
                .into_iter()
                .map(|(id, record)| {
                    let stored = StoredParticipant {
                        name: record.display_name,
                        total: record.total_completed,
                        debt: record.outstanding_debt,
                    };
                    (id, stored)
                })
                .collect(),
            chat_ids: snapshot
                .destinations
                .into_iter()
                .map(DestinationId::Text)
                .collect(),
            accruals: snapshot.accruals,
        }
    }
}
