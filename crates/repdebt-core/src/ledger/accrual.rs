//! Challenge calendar and daily quota accrual.
//!
//! Day 1 is the start date itself and requires `base_quota`; every following
//! day requires one more repetition than the day before.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::LedgerSnapshot;

/// Fixed challenge parameters, set at deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeCalendar {
    pub start_date: NaiveDate,
    pub base_quota: u32,
}

/// Day and quota an accrual was applied for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccrualOutcome {
    pub day_number: u32,
    pub required_quota: u64,
    /// Number of participants whose debt grew.
    pub participants: usize,
}

impl ChallengeCalendar {
    pub fn new(start_date: NaiveDate, base_quota: u32) -> Self {
        Self {
            start_date,
            base_quota,
        }
    }

    /// Challenge day for `date`, clamped to day 1 before the start date.
    pub fn day_number(&self, date: NaiveDate) -> u32 {
        let elapsed = (date - self.start_date).num_days();
        if elapsed < 0 {
            warn!(
                %date,
                start_date = %self.start_date,
                "date precedes challenge start, treating as day 1"
            );
            return 1;
        }
        u32::try_from(elapsed + 1).unwrap_or(u32::MAX)
    }

    /// Repetitions required on challenge day `day_number`.
    pub fn quota_for_day(&self, day_number: u32) -> u64 {
        u64::from(self.base_quota) + u64::from(day_number.max(1)) - 1
    }

    /// Day number and quota for a calendar date.
    pub fn quota_for_date(&self, date: NaiveDate) -> (u32, u64) {
        let day = self.day_number(date);
        (day, self.quota_for_day(day))
    }
}

/// Adds the quota for `date` to every participant's debt.
///
/// Not idempotent: each call accrues again. Callers guard repeats with
/// [`LedgerSnapshot::last_accrual`].
pub fn accrue_day(
    snapshot: &mut LedgerSnapshot,
    calendar: &ChallengeCalendar,
    date: NaiveDate,
) -> AccrualOutcome {
    let (day_number, required_quota) = calendar.quota_for_date(date);

    let mut participants = 0;
    for record in snapshot.participants_mut() {
        record.outstanding_debt = record.outstanding_debt.saturating_add(required_quota);
        participants += 1;
    }

    info!(day_number, required_quota, participants, "daily quota accrued");
    AccrualOutcome {
        day_number,
        required_quota,
        participants,
    }
}
