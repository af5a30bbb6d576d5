//! Human-readable renderings of ledger state.
//!
//! All functions here are pure: they read a snapshot and return text.

use std::fmt::Write;

use crate::error::NotFoundError;
use crate::ledger::{CompletionReceipt, LedgerSnapshot, Registration};

/// Roster text when nobody has joined yet.
pub const EMPTY_ROSTER: &str = "No participant data yet.";

/// Guidance for participants who have not joined.
pub const NOT_REGISTERED: &str = "You haven't joined the challenge yet. Send /start to join.";

/// Denial for reports without a usable count.
pub const INVALID_COUNT: &str = "❌ Enter a positive number of reps, e.g. /pushups 20";

/// Confirmation after a reset.
pub const RESET_DONE: &str = "✅ Your stats have been reset.";

/// One line per participant: name, lifetime total, outstanding debt.
pub fn format_roster(snapshot: &LedgerSnapshot) -> String {
    if snapshot.is_empty() {
        return EMPTY_ROSTER.to_string();
    }

    let mut out = String::from("📊 Stats:\n\n");
    for record in snapshot.participants() {
        let _ = writeln!(
            out,
            "{} — {} reps (debt: {})",
            record.display_name, record.total_completed, record.outstanding_debt
        );
    }
    out
}

/// A single participant's card.
pub fn format_participant(
    snapshot: &LedgerSnapshot,
    participant_id: &str,
) -> Result<String, NotFoundError> {
    let record = snapshot
        .participant(participant_id)
        .ok_or_else(|| NotFoundError::Participant {
            id: participant_id.to_string(),
        })?;

    Ok(format!(
        "👤 {}\n\nTotal reps: {}\nDebt: {}",
        record.display_name, record.total_completed, record.outstanding_debt
    ))
}

/// Day header plus each participant's standing.
///
/// Render this from the snapshot as it was *before* the day's accrual.
pub fn format_daily_announcement(
    day_number: u32,
    required_quota: u64,
    snapshot: &LedgerSnapshot,
) -> String {
    let mut out = format!("📅 Day {day_number}: today's quota is {required_quota} reps.\n\n");
    for record in snapshot.participants() {
        let _ = writeln!(
            out,
            "{} — debt: {}, total: {}",
            record.display_name, record.outstanding_debt, record.total_completed
        );
    }
    out
}

pub fn format_registration(registration: &Registration) -> String {
    match registration {
        Registration::Created(r) => {
            format!("👋 Hi, {}! You've joined the challenge!", r.display_name)
        }
        Registration::AlreadyRegistered(r) => {
            format!("👋 Hi, {}! You're already in the challenge!", r.display_name)
        }
    }
}

pub fn format_completion(receipt: &CompletionReceipt) -> String {
    let mut out = format!(
        "✅ Logged: {} did {} reps!",
        receipt.record.display_name, receipt.reported
    );
    if receipt.paid > 0 {
        let _ = write!(
            out,
            " {} went to debt, {} left.",
            receipt.paid, receipt.record.outstanding_debt
        );
    }
    out
}
