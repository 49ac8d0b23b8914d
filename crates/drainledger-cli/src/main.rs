//! CLI for drainledger — battery drain attribution from usage snapshots.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "drainledger")]
#[command(about = "drainledger — every milliamp-hour gets an owner")]
#[command(version = drainledger_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attribute battery drain from a usage snapshot and print the ranked ledger
    Report {
        /// Path to the usage snapshot JSON
        snapshot: String,

        /// Path to a power profile JSON (built-in reference table if omitted)
        #[arg(long)]
        profile: Option<String>,

        /// Accounting period
        #[arg(long, default_value = "charged", value_parser = ["boot", "unplugged", "charged"])]
        period: String,

        /// Rank this user's apps individually (repeatable; default: user 0)
        #[arg(long = "user")]
        users: Vec<u32>,

        /// Rank every user's apps individually
        #[arg(long)]
        all_users: bool,

        /// Minimum discharge percent before reconciling against the envelope
        #[arg(long, default_value = "2")]
        min_pct: u32,

        /// Device has no cellular radio; skip the cell category
        #[arg(long)]
        wifi_only: bool,

        /// Print the full ledger as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Rank applications by mobile radio signaling overhead (ms per packet)
    Signaling {
        /// Path to the usage snapshot JSON
        snapshot: String,

        /// Path to a power profile JSON (built-in reference table if omitted)
        #[arg(long)]
        profile: Option<String>,

        /// Accounting period
        #[arg(long, default_value = "charged", value_parser = ["boot", "unplugged", "charged"])]
        period: String,
    },

    /// Inspect a power profile coefficient table
    Profile {
        /// Path to the power profile JSON (built-in reference table if omitted)
        path: Option<String>,
    },

    /// Serve the ledger as a JSON API over HTTP
    Serve {
        /// Path to the usage snapshot JSON (re-read on cache invalidation)
        snapshot: String,

        /// Path to a power profile JSON (built-in reference table if omitted)
        #[arg(long)]
        profile: Option<String>,

        /// Port to listen on
        #[arg(long, default_value = "8424")]
        port: u16,

        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Minimum discharge percent before reconciling against the envelope
        #[arg(long, default_value = "2")]
        min_pct: u32,

        /// Device has no cellular radio; skip the cell category
        #[arg(long)]
        wifi_only: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            snapshot,
            profile,
            period,
            users,
            all_users,
            min_pct,
            wifi_only,
            json,
        } => commands::report::run(commands::report::ReportCommandConfig {
            snapshot_path: &snapshot,
            profile_path: profile.as_deref(),
            period: &period,
            users: &users,
            all_users,
            min_pct,
            wifi_only,
            json,
        }),
        Commands::Signaling {
            snapshot,
            profile,
            period,
        } => commands::signaling::run(&snapshot, profile.as_deref(), &period),
        Commands::Profile { path } => commands::profile::run(path.as_deref()),
        Commands::Serve {
            snapshot,
            profile,
            port,
            host,
            min_pct,
            wifi_only,
        } => commands::serve::run(&snapshot, profile.as_deref(), &host, port, min_pct, wifi_only),
    }
}
