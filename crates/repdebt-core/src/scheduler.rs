//! Wall-clock daily triggers.
//!
//! [`DailySchedule`] works out when the next configured trigger is due in
//! the deployment's fixed offset. [`Scheduler`] sleeps until then, fires the
//! trigger through the [`LedgerHandle`], and hands the announcement to a
//! [`BroadcastSink`] for every registered destination.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::{ConfigError, CoreError, Result};
use crate::events::TriggerOutcome;
use crate::service::LedgerHandle;
use crate::storage::Config;

/// Delivers announcement text to one destination. Delivery failures are
/// the sink's concern; the scheduler only logs them.
pub trait BroadcastSink: Send + Sync {
    fn deliver(
        &self,
        destination_id: &str,
        text: &str,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Named trigger times in one fixed offset.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    offset: FixedOffset,
    triggers: Vec<(String, NaiveTime)>,
}

impl DailySchedule {
    pub fn new(offset: FixedOffset, triggers: Vec<(String, NaiveTime)>) -> Self {
        Self { offset, triggers }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(config.offset()?, config.trigger_times()?))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The earliest trigger strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<(String, DateTime<Utc>)> {
        let today = now.with_timezone(&self.offset).date_naive();
        [today, today + Duration::days(1)]
            .into_iter()
            .flat_map(|date| {
                self.triggers.iter().filter_map(move |(name, time)| {
                    let at = self
                        .offset
                        .from_local_datetime(&date.and_time(*time))
                        .single()?
                        .with_timezone(&Utc);
                    Some((name.clone(), at))
                })
            })
            .filter(|(_, at)| *at > now)
            .min_by_key(|(_, at)| *at)
    }
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct Scheduler<S> {
    schedule: DailySchedule,
    ledger: LedgerHandle,
    sink: S,
    clock: Clock,
}

impl<S: BroadcastSink> Scheduler<S> {
    pub fn new(schedule: DailySchedule, ledger: LedgerHandle, sink: S) -> Self {
        Self {
            schedule,
            ledger,
            sink,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the wall clock `run` reads before planning each trigger.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Fire `trigger` for the day `now` falls on and broadcast the result.
    ///
    /// Returns how many destinations accepted the announcement.
    pub async fn fire(&self, trigger: &str, now: DateTime<Utc>) -> Result<usize> {
        let broadcast = match self.ledger.run_trigger(trigger, now).await? {
            TriggerOutcome::Broadcast(b) => b,
            TriggerOutcome::AlreadyAccrued { .. } => return Ok(0),
        };

        let mut delivered = 0;
        for destination in &broadcast.destinations {
            match self.sink.deliver(destination, &broadcast.text) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(destination = %destination, error = %e, "broadcast delivery failed"),
            }
        }
        info!(
            trigger,
            delivered,
            destinations = broadcast.destinations.len(),
            "daily announcement sent"
        );
        Ok(delivered)
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// A failed trigger is logged and the loop moves on to the next one;
    /// only a stopped ledger service ends the loop with an error.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = (self.clock)();
            let Some((trigger, at)) = self.schedule.next_after(now) else {
                warn!("no triggers configured, scheduler idle");
                break;
            };
            info!(trigger = %trigger, at = %at.with_timezone(&self.schedule.offset()), "next trigger scheduled");

            let wait = (at - now).to_std().unwrap_or_default();
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            match self.fire(&trigger, at).await {
                Ok(_) => {}
                Err(CoreError::Service(e)) => return Err(e.into()),
                Err(e) => error!(trigger = %trigger, error = %e, "daily trigger failed"),
            }
        }

        info!("scheduler stopped");
        Ok(())
    }
}
