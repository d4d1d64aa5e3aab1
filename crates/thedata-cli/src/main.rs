mod cmd;
mod output;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "thedata",
    about = "Liveness service for the NATS broker and the thedata asset repository",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log level or filter directive (e.g. INFO, debug, thedata_server=trace)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "INFO")]
    log_level: String,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to NATS and serve GET /health
    Serve {
        /// Address to listen on
        #[arg(long, env = "THEDATA_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on (0 = OS-assigned)
        #[arg(long, env = "THEDATA_PORT", default_value = "8000")]
        port: u16,
    },

    /// Show the assets, jobs and schedules of the repository
    Definitions,

    /// Show upcoming schedule ticks
    Schedule {
        /// Only this schedule
        name: Option<String>,

        /// Number of ticks per schedule (1-1000)
        #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=1000))]
        count: u32,

        /// Start from this RFC 3339 time instead of now
        #[arg(long)]
        after: Option<DateTime<Utc>>,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level.to_ascii_lowercase()).unwrap_or_else(|e| {
        eprintln!("warning: invalid LOG_LEVEL '{level}' ({e}), using info");
        EnvFilter::new("info")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Serve { host, port } => cmd::serve::run(&host, port),
        Commands::Definitions => cmd::definitions::run(cli.json),
        Commands::Schedule { name, count, after } => {
            cmd::schedule::run(name.as_deref(), count as usize, after, cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
