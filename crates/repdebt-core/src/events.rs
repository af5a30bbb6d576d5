use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An already-parsed inbound chat event.
///
/// The transport turns commands and hashtag reports into one of these; the
/// core answers with a [`Reply`] and never talks to the chat itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundEvent {
    Registration {
        participant_id: String,
        display_name: String,
    },
    Report {
        participant_id: String,
        display_name: String,
        count: i64,
    },
    Query {
        kind: QueryKind,
        participant_id: String,
    },
    /// A chat asking to receive the daily announcements.
    Subscribe {
        destination_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Roster,
    SelfStats,
    Reset,
}

/// Text to send back to whoever raised an [`InboundEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "text", rename_all = "snake_case")]
pub enum Reply {
    Accepted(String),
    /// Input failed validation; nothing changed.
    Rejected(String),
    /// The sender has not joined yet.
    NotRegistered(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Accepted(t) | Reply::Rejected(t) | Reply::NotRegistered(t) => t,
        }
    }
}

/// An announcement ready to be handed to the broadcast sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Broadcast {
    pub trigger: String,
    pub date: NaiveDate,
    pub day_number: u32,
    pub required_quota: u64,
    pub text: String,
    pub destinations: Vec<String>,
}

/// Result of firing a daily trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TriggerOutcome {
    Broadcast(Broadcast),
    /// This trigger already accrued for `date`; nothing changed.
    AlreadyAccrued { trigger: String, date: NaiveDate },
}
