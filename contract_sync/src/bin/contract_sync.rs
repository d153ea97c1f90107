use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use refdata::providers::FixtureSource;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Contract mapping and rollover CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply pending schema migrations.
    Migrate,
    /// Exchange configuration commands.
    Config(ConfigCmd),
    /// Resolve and persist mappings for one trade date.
    Map {
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: NaiveDate,
        #[arg(long, value_name = "FILE")]
        config: String,
        /// Maximum in-flight reference-data lookups.
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Print each active generic's latest mapping and rollover status.
    Report {
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: NaiveDate,
    },
}

#[derive(Args)]
struct ConfigCmd {
    #[command(subcommand)]
    sub: ConfigSub,
}

#[derive(Subcommand)]
enum ConfigSub {
    Sync {
        #[arg(long, value_name = "FILE")]
        file: String,
        #[arg(long)]
        dry_run: bool,
    },
}

fn database_url() -> Result<String> {
    std::env::var("DATABASE_URL").context("DATABASE_URL must be set")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Migrate => {
            contract_sync::db::migrate::run_sqlite(&database_url()?)?;
        }
        Cmd::Config(ConfigCmd {
            sub: ConfigSub::Sync { file, dry_run },
        }) => {
            let exchanges = contract_sync::config::load_exchanges_path(&file)?;
            let mut conn = contract_sync::db::connection::connect_sqlite(&database_url()?)?;
            let opt = contract_sync::sync::SyncOptions { dry_run };
            let diff = contract_sync::sync::sync_exchanges(&mut conn, &exchanges, opt)?;
            println!("{diff}");
        }
        Cmd::Map {
            date,
            config,
            concurrency,
        } => {
            let exchanges = contract_sync::config::load_exchanges_path(&config)?;
            let mut conn = contract_sync::db::connection::connect_sqlite(&database_url()?)?;
            // No live vendor feed is wired in yet; maturity fields stay
            // null until the reference adapter lands and back-fills them.
            let source = FixtureSource::new();
            let report =
                contract_sync::engine::run_date(&mut conn, &exchanges, date, &source, concurrency)
                    .await?;
            println!("{report}");
            if report.needs_attention() {
                anyhow::bail!("failure rate {:.0}% exceeds threshold", report.failure_rate() * 100.0);
            }
        }
        Cmd::Report { date } => {
            let mut conn = contract_sync::db::connection::connect_sqlite(&database_url()?)?;
            let rows = contract_sync::mapping::current_positions(&mut conn, date)?;
            if rows.is_empty() {
                println!("No mappings yet");
            }
            for row in rows {
                let decision =
                    contract_sync::rollover::needs_rollover(&mut conn, &row.generic, date)?;
                let dte = row
                    .days_to_expiry
                    .map_or_else(|| "?".to_string(), |d| d.to_string());
                println!(
                    "{:<8} {:<10} {}  dte={:<4} roll={}",
                    row.generic.ticker, row.contract_ticker, row.trade_date, dte, decision
                );
            }
        }
    }

    Ok(())
}
