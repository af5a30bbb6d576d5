use chrono::Utc;
use repdebt_core::{BroadcastSink, DailySchedule, LedgerHandle, LedgerService, Scheduler};
use tokio::sync::watch;
use tracing::info;

use super::Context;

/// Prints announcements instead of sending them to a chat.
struct StdoutSink;

impl BroadcastSink for StdoutSink {
    fn deliver(
        &self,
        destination_id: &str,
        text: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("--> {destination_id}\n{text}");
        Ok(())
    }
}

pub fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let config = ctx.config()?;
    let today = Utc::now().with_timezone(&config.offset()?).date_naive();
    config.validate(today)?;

    let schedule = DailySchedule::from_config(&config)?;
    let service = LedgerService::from_config(&config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let (ledger, actor) = LedgerHandle::spawn(service);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
            }
            let _ = shutdown_tx.send(true);
        });

        let scheduler = Scheduler::new(schedule, ledger, StdoutSink);
        let result = scheduler.run(shutdown_rx).await;
        // The scheduler held the last handle; the actor drains and exits.
        let _ = actor.await;
        result
    })?;
    Ok(())
}
