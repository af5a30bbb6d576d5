//! # repdebt Core Library
//!
//! Ledger engine for a group exercise challenge run through a chat bot.
//! Participants report repetitions; every day the quota grows by one and is
//! added to everyone's debt; reported repetitions pay the debt down.
//!
//! ## Architecture
//!
//! - **Ledger**: participant records, registration, completions, resets and
//!   daily accrual as pure operations on a [`LedgerSnapshot`]
//! - **Storage**: whole-snapshot JSON persistence with atomic replace, and
//!   TOML configuration
//! - **Report**: text renderings of the roster, a single participant, and
//!   the daily announcement
//! - **Service**: load-mutate-save per event, serialized through a single
//!   owner ([`LedgerHandle`])
//! - **Scheduler**: fixed daily triggers that accrue and broadcast
//!
//! Chat transport is not part of this crate: callers hand in parsed
//! [`InboundEvent`]s and deliver the returned text themselves.

pub mod error;
pub mod events;
pub mod ledger;
pub mod report;
pub mod scheduler;
pub mod service;
pub mod storage;

pub use error::{
    ConfigError, CoreError, NotFoundError, ServiceError, StorageError, ValidationError,
};
pub use events::{Broadcast, InboundEvent, QueryKind, Reply, TriggerOutcome};
pub use ledger::{ChallengeCalendar, LedgerSnapshot, ParticipantRecord};
pub use scheduler::{BroadcastSink, DailySchedule, Scheduler};
pub use service::{LedgerHandle, LedgerService};
pub use storage::{Config, JsonLedgerStore, LedgerStore, LoadOutcome, MemoryLedgerStore};
