use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "repdebt-cli", version, about = "repdebt challenge ledger CLI")]
struct Cli {
    /// Config file (default: ~/.config/repdebt/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Ledger file, overriding storage.ledger_path
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the challenge
    Register {
        participant_id: String,
        display_name: String,
    },
    /// Report completed repetitions
    Report {
        participant_id: String,
        display_name: String,
        #[arg(allow_negative_numbers = true)]
        count: i64,
    },
    /// Everyone's totals and debt
    Stats,
    /// One participant's totals and debt
    Me { participant_id: String },
    /// Zero a participant's totals and debt
    Reset { participant_id: String },
    /// Send daily announcements to a destination
    Subscribe { destination_id: String },
    /// Fire a daily trigger now and print the announcement
    Trigger(commands::trigger::TriggerArgs),
    /// Run the daily scheduler until interrupted
    Run,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = commands::Context {
        config_path: cli.config,
        ledger_path: cli.ledger,
    };

    let result = match cli.command {
        Commands::Register {
            participant_id,
            display_name,
        } => commands::participant::register(&ctx, participant_id, display_name),
        Commands::Report {
            participant_id,
            display_name,
            count,
        } => commands::participant::report(&ctx, participant_id, display_name, count),
        Commands::Stats => commands::participant::stats(&ctx),
        Commands::Me { participant_id } => commands::participant::me(&ctx, participant_id),
        Commands::Reset { participant_id } => commands::participant::reset(&ctx, participant_id),
        Commands::Subscribe { destination_id } => {
            commands::participant::subscribe(&ctx, destination_id)
        }
        Commands::Trigger(args) => commands::trigger::run(&ctx, args),
        Commands::Run => commands::daemon::run(&ctx),
        Commands::Config { action } => commands::config::run(&ctx, action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
