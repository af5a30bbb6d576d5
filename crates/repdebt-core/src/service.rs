//! Ledger operations with persistence, and the actor that serializes them.
//!
//! [`LedgerService`] performs one full load-mutate-save cycle per call.
//! [`LedgerHandle`] owns the service on a single blocking thread and feeds it
//! commands one at a time, so chat events and scheduler ticks can never
//! interleave their cycles and lose an update.

use chrono::{DateTime, FixedOffset, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CoreError, NotFoundError, Result, ServiceError};
use crate::events::{Broadcast, InboundEvent, QueryKind, Reply, TriggerOutcome};
use crate::ledger::{self, ChallengeCalendar, CompletionReceipt, LedgerSnapshot, ParticipantRecord, Registration};
use crate::report;
use crate::storage::{Config, JsonLedgerStore, LedgerStore};

const COMMAND_QUEUE: usize = 64;

pub struct LedgerService {
    store: Box<dyn LedgerStore>,
    calendar: ChallengeCalendar,
    offset: FixedOffset,
}

impl LedgerService {
    pub fn new(store: Box<dyn LedgerStore>, calendar: ChallengeCalendar, offset: FixedOffset) -> Self {
        Self {
            store,
            calendar,
            offset,
        }
    }

    /// Service over the JSON ledger the config points at.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = JsonLedgerStore::with_path(config.ledger_path()?);
        Ok(Self::new(Box::new(store), config.calendar(), config.offset()?))
    }

    pub fn calendar(&self) -> &ChallengeCalendar {
        &self.calendar
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.store.load().into_snapshot()
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        self.store.save(snapshot)?;
        Ok(())
    }

    pub fn register(&self, participant_id: &str, display_name: &str) -> Result<Registration> {
        let mut snapshot = self.snapshot();
        let registration = ledger::register(&mut snapshot, participant_id, display_name);
        self.save(&snapshot)?;
        Ok(registration)
    }

    pub fn report(
        &self,
        participant_id: &str,
        display_name: &str,
        count: i64,
    ) -> Result<CompletionReceipt> {
        let mut snapshot = self.snapshot();
        let receipt = ledger::apply_completion(&mut snapshot, participant_id, display_name, count)?;
        self.save(&snapshot)?;
        Ok(receipt)
    }

    pub fn reset(&self, participant_id: &str) -> Result<ParticipantRecord> {
        let mut snapshot = self.snapshot();
        let record = ledger::reset(&mut snapshot, participant_id)?;
        self.save(&snapshot)?;
        Ok(record)
    }

    /// Returns `false` if the destination was already registered.
    pub fn subscribe(&self, destination_id: &str) -> Result<bool> {
        let mut snapshot = self.snapshot();
        if !snapshot.register_destination(destination_id) {
            return Ok(false);
        }
        self.save(&snapshot)?;
        info!(destination_id, "broadcast destination added");
        Ok(true)
    }

    /// Announce, then accrue, for the calendar day `now` falls on.
    ///
    /// The announcement is rendered before the accrual so it shows what was
    /// owed coming into the day. A trigger that already accrued for that day
    /// is skipped.
    pub fn run_trigger(&self, trigger: &str, now: DateTime<Utc>) -> Result<TriggerOutcome> {
        let date = now.with_timezone(&self.offset).date_naive();
        let mut snapshot = self.snapshot();

        if snapshot.last_accrual(trigger) == Some(date) {
            warn!(trigger, %date, "trigger already accrued for this date, skipping");
            return Ok(TriggerOutcome::AlreadyAccrued {
                trigger: trigger.to_string(),
                date,
            });
        }

        let (day_number, required_quota) = self.calendar.quota_for_date(date);
        let text = report::format_daily_announcement(day_number, required_quota, &snapshot);

        ledger::accrue_day(&mut snapshot, &self.calendar, date);
        snapshot.mark_accrued(trigger, date);
        self.save(&snapshot)?;

        let destinations: Vec<String> = snapshot.destinations().map(str::to_string).collect();
        if destinations.is_empty() {
            warn!(trigger, "no broadcast destinations registered");
        }
        info!(trigger, %date, day_number, required_quota, "daily trigger fired");

        Ok(TriggerOutcome::Broadcast(Broadcast {
            trigger: trigger.to_string(),
            date,
            day_number,
            required_quota,
            text,
            destinations,
        }))
    }

    /// Answer an inbound event.
    ///
    /// Validation and not-found outcomes become replies; only storage and
    /// service failures come back as errors.
    pub fn handle(&self, event: InboundEvent) -> Result<Reply> {
        debug!(?event, "handling inbound event");
        match event {
            InboundEvent::Registration {
                participant_id,
                display_name,
            } => {
                let registration = self.register(&participant_id, &display_name)?;
                Ok(Reply::Accepted(report::format_registration(&registration)))
            }
            InboundEvent::Report {
                participant_id,
                display_name,
                count,
            } => match self.report(&participant_id, &display_name, count) {
                Ok(receipt) => Ok(Reply::Accepted(report::format_completion(&receipt))),
                Err(CoreError::Validation(e)) => {
                    debug!(participant_id = %participant_id, error = %e, "report rejected");
                    Ok(Reply::Rejected(report::INVALID_COUNT.to_string()))
                }
                Err(e) => Err(e),
            },
            InboundEvent::Query {
                kind: QueryKind::Roster,
                ..
            } => Ok(Reply::Accepted(report::format_roster(&self.snapshot()))),
            InboundEvent::Query {
                kind: QueryKind::SelfStats,
                participant_id,
            } => match report::format_participant(&self.snapshot(), &participant_id) {
                Ok(text) => Ok(Reply::Accepted(text)),
                Err(NotFoundError::Participant { .. }) => {
                    Ok(Reply::NotRegistered(report::NOT_REGISTERED.to_string()))
                }
            },
            InboundEvent::Query {
                kind: QueryKind::Reset,
                participant_id,
            } => match self.reset(&participant_id) {
                Ok(_) => Ok(Reply::Accepted(report::RESET_DONE.to_string())),
                Err(CoreError::NotFound(_)) => {
                    Ok(Reply::NotRegistered(report::NOT_REGISTERED.to_string()))
                }
                Err(e) => Err(e),
            },
            InboundEvent::Subscribe { destination_id } => {
                let text = if self.subscribe(&destination_id)? {
                    "✅ This chat will receive the daily reports."
                } else {
                    "This chat already receives the daily reports."
                };
                Ok(Reply::Accepted(text.to_string()))
            }
        }
    }
}

enum Command {
    Handle {
        event: InboundEvent,
        reply: oneshot::Sender<Result<Reply>>,
    },
    Trigger {
        trigger: String,
        now: DateTime<Utc>,
        reply: oneshot::Sender<Result<TriggerOutcome>>,
    },
    Snapshot {
        reply: oneshot::Sender<LedgerSnapshot>,
    },
}

/// Cloneable handle to the single ledger owner.
#[derive(Clone)]
pub struct LedgerHandle {
    tx: mpsc::Sender<Command>,
}

impl LedgerHandle {
    /// Move `service` onto its own blocking thread and return a handle to it.
    ///
    /// The thread exits once every handle has been dropped.
    pub fn spawn(service: LedgerService) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Command>(COMMAND_QUEUE);
        let task = tokio::task::spawn_blocking(move || {
            while let Some(command) = rx.blocking_recv() {
                match command {
                    Command::Handle { event, reply } => {
                        let _ = reply.send(service.handle(event));
                    }
                    Command::Trigger {
                        trigger,
                        now,
                        reply,
                    } => {
                        let _ = reply.send(service.run_trigger(&trigger, now));
                    }
                    Command::Snapshot { reply } => {
                        let _ = reply.send(service.snapshot());
                    }
                }
            }
            debug!("ledger service stopped");
        });
        (Self { tx }, task)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ServiceError::Stopped)?;
        Ok(rx.await.map_err(|_| ServiceError::Stopped)?)
    }

    pub async fn handle(&self, event: InboundEvent) -> Result<Reply> {
        self.request(|reply| Command::Handle { event, reply }).await?
    }

    pub async fn run_trigger(&self, trigger: &str, now: DateTime<Utc>) -> Result<TriggerOutcome> {
        let trigger = trigger.to_string();
        self.request(|reply| Command::Trigger {
            trigger,
            now,
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<LedgerSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLedgerStore;
    use chrono::{NaiveDate, TimeZone};
    use std::sync::Arc;

    struct SharedStore(Arc<MemoryLedgerStore>);

    impl LedgerStore for SharedStore {
        fn load(&self) -> crate::storage::LoadOutcome {
            self.0.load()
        }
        fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), crate::error::StorageError> {
            self.0.save(snapshot)
        }
    }

    fn utc3() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn service_with(store: Arc<MemoryLedgerStore>) -> LedgerService {
        let calendar = ChallengeCalendar::new(NaiveDate::from_ymd_opt(2025, 5, 9).unwrap(), 10);
        LedgerService::new(Box::new(SharedStore(store)), calendar, utc3())
    }

    fn service() -> LedgerService {
        service_with(Arc::new(MemoryLedgerStore::new()))
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        utc3().with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().with_timezone(&Utc)
    }

    fn report(id: &str, count: i64) -> InboundEvent {
        InboundEvent::Report {
            participant_id: id.into(),
            display_name: format!("User {id}"),
            count,
        }
    }

    fn query(kind: QueryKind, id: &str) -> InboundEvent {
        InboundEvent::Query {
            kind,
            participant_id: id.into(),
        }
    }

    #[test]
    fn registration_replies_differ_for_repeat() {
        let svc = service();
        let event = InboundEvent::Registration {
            participant_id: "1".into(),
            display_name: "Anna".into(),
        };
        let first = svc.handle(event.clone()).unwrap();
        let second = svc.handle(event).unwrap();
        assert!(first.text().contains("You've joined"));
        assert!(second.text().contains("already"));
        assert_eq!(svc.snapshot().len(), 1);
    }

    #[test]
    fn invalid_report_is_rejected_reply() {
        let svc = service();
        let reply = svc.handle(report("1", 0)).unwrap();
        assert_eq!(reply, Reply::Rejected(report::INVALID_COUNT.into()));
        assert!(svc.snapshot().is_empty());
    }

    #[test]
    fn self_stats_and_reset_for_stranger_guide_to_join() {
        let svc = service();
        for kind in [QueryKind::SelfStats, QueryKind::Reset] {
            let reply = svc.handle(query(kind, "ghost")).unwrap();
            assert_eq!(reply, Reply::NotRegistered(report::NOT_REGISTERED.into()));
        }
    }

    #[test]
    fn reset_reply_and_effect() {
        let svc = service();
        svc.handle(report("1", 30)).unwrap();
        let reply = svc.handle(query(QueryKind::Reset, "1")).unwrap();
        assert_eq!(reply.text(), report::RESET_DONE);
        let record = svc.snapshot().participant("1").cloned().unwrap();
        assert_eq!((record.total_completed, record.outstanding_debt), (0, 0));
    }

    #[test]
    fn trigger_announces_pre_accrual_state_then_accrues() {
        let svc = service();
        svc.handle(report("1", 5)).unwrap();
        svc.subscribe("chat-a").unwrap();

        let outcome = svc.run_trigger("morning", at(2025, 5, 10, 8)).unwrap();
        let TriggerOutcome::Broadcast(b) = outcome else {
            panic!("expected broadcast");
        };
        assert_eq!((b.day_number, b.required_quota), (2, 11));
        assert!(b.text.contains("User 1 — debt: 0, total: 5"));
        assert_eq!(b.destinations, vec!["chat-a".to_string()]);
        assert_eq!(svc.snapshot().participant("1").unwrap().outstanding_debt, 11);
    }

    #[test]
    fn trigger_uses_configured_offset_for_calendar_day() {
        let svc = service();
        svc.register("1", "A").unwrap();
        // 22:30 UTC on May 9 is already May 10 at +03:00.
        let now = Utc.with_ymd_and_hms(2025, 5, 9, 22, 30, 0).unwrap();
        let TriggerOutcome::Broadcast(b) = svc.run_trigger("late", now).unwrap() else {
            panic!("expected broadcast");
        };
        assert_eq!(b.date, NaiveDate::from_ymd_opt(2025, 5, 10).unwrap());
        assert_eq!(b.day_number, 2);
    }

    #[test]
    fn same_trigger_same_day_accrues_once() {
        let svc = service();
        svc.register("1", "A").unwrap();

        svc.run_trigger("morning", at(2025, 5, 9, 8)).unwrap();
        let again = svc.run_trigger("morning", at(2025, 5, 9, 9)).unwrap();
        assert!(matches!(again, TriggerOutcome::AlreadyAccrued { .. }));
        assert_eq!(svc.snapshot().participant("1").unwrap().outstanding_debt, 10);

        // A different trigger on the same day still accrues.
        svc.run_trigger("evening", at(2025, 5, 9, 22)).unwrap();
        assert_eq!(svc.snapshot().participant("1").unwrap().outstanding_debt, 20);
    }

    #[test]
    fn storage_failure_surfaces_as_error() {
        let store = Arc::new(MemoryLedgerStore::new());
        let svc = service_with(store.clone());
        svc.register("1", "A").unwrap();
        store.set_fail_writes(true);

        assert!(matches!(svc.handle(report("1", 10)), Err(CoreError::Storage(_))));
        assert!(matches!(
            svc.run_trigger("morning", at(2025, 5, 9, 8)),
            Err(CoreError::Storage(_))
        ));
        let record = svc.snapshot().participant("1").cloned().unwrap();
        assert_eq!((record.total_completed, record.outstanding_debt), (0, 0));
        assert_eq!(svc.snapshot().last_accrual("morning"), None);
    }

    #[test]
    fn subscribe_is_idempotent() {
        let svc = service();
        assert!(svc.subscribe("chat").unwrap());
        assert!(!svc.subscribe("chat").unwrap());
        assert_eq!(svc.snapshot().destinations().count(), 1);
    }

    #[tokio::test]
    async fn concurrent_reports_through_handle_are_not_lost() {
        let (handle, task) = LedgerHandle::spawn(service());

        let mut joins = Vec::new();
        for i in 0..20 {
            let handle = handle.clone();
            joins.push(tokio::spawn(async move {
                handle.handle(report(&format!("{}", i % 4), 1)).await
            }));
        }
        for join in joins {
            join.await.unwrap().unwrap();
        }

        let snapshot = handle.snapshot().await.unwrap();
        let total: u64 = snapshot.participants().map(|p| p.total_completed).sum();
        assert_eq!(total, 20);
        assert_eq!(snapshot.len(), 4);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn actor_exits_once_all_handles_dropped() {
        let (handle, task) = LedgerHandle::spawn(service());
        let clone = handle.clone();
        drop(handle);
        assert!(clone.snapshot().await.is_ok());
        drop(clone);
        task.await.unwrap();
    }
}
