use chrono::{NaiveDate, TimeZone, Utc};
use clap::Args;
use repdebt_core::TriggerOutcome;

use super::Context;

#[derive(Args)]
pub struct TriggerArgs {
    /// Trigger name, e.g. "morning"
    name: String,
    /// Accrue for this date (YYYY-MM-DD) instead of today
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(ctx: &Context, args: TriggerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = ctx.config()?;
    let offset = config.offset()?;
    let now = match args.date {
        Some(date) => date
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| offset.from_local_datetime(&midnight).single())
            .ok_or("date is not representable in the configured offset")?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let service = repdebt_core::LedgerService::from_config(&config)?;
    let outcome = service.run_trigger(&args.name, now)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        TriggerOutcome::Broadcast(broadcast) => {
            if broadcast.destinations.is_empty() {
                println!("{}", broadcast.text);
            }
            for destination in &broadcast.destinations {
                println!("--> {destination}\n{}", broadcast.text);
            }
        }
        TriggerOutcome::AlreadyAccrued { trigger, date } => {
            println!("trigger '{trigger}' already accrued for {date}");
        }
    }
    Ok(())
}
