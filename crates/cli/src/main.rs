//! Taskgate CLI - fire bursts of calls at a bounded sequential queue
//! and report which ran, which failed and which were turned away

mod burst;
mod logging;

use anyhow::{Context, Result};
use burst::{BurstOptions, BurstReport};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::time::Duration;
use tabled::Table;
use taskgate_core::domain::queue::{DEFAULT_QUEUE_NAME, ENV_QUEUE_CAPACITY, ENV_QUEUE_NAME};
use taskgate_core::{Capacity, QueueConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "taskgate")]
#[command(about = "Bounded sequential task queue driver", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a burst of back-to-back calls through one queue
    Burst {
        /// Queue capacity (pending + executing)
        #[arg(short, long, env = ENV_QUEUE_CAPACITY, default_value = "1")]
        capacity: Capacity,

        /// Queue name used in log output
        #[arg(short, long, env = ENV_QUEUE_NAME, default_value = DEFAULT_QUEUE_NAME)]
        queue: String,

        /// Number of calls to issue
        #[arg(short = 'n', long, default_value = "2")]
        calls: usize,

        /// Simulated duration of each call
        #[arg(short, long, default_value = "120")]
        delay_ms: u64,

        /// Make every k-th executed call fail (0 = never)
        #[arg(long, default_value = "0")]
        fail_every: usize,

        /// Divert failures to an error handler instead of returning them
        #[arg(long)]
        safe: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the queue configuration resolved from the environment
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Burst {
            capacity,
            queue,
            calls,
            delay_ms,
            fail_every,
            safe,
            json,
        } => {
            let config = QueueConfig::new(queue, capacity);
            config.validate().context("Invalid queue configuration")?;

            info!(
                queue = %config.name,
                capacity = %config.capacity,
                calls,
                delay_ms,
                safe,
                "Starting burst"
            );

            let options = BurstOptions {
                calls,
                delay: Duration::from_millis(delay_ms),
                fail_every,
                safe,
            };
            let report = burst::run(&config, options).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Commands::Config => {
            let config = QueueConfig::from_env().context("Failed to load configuration")?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn print_report(report: &BurstReport) {
    let mode = if report.safe { "supervised" } else { "strict" };
    println!(
        "{}",
        format!("Burst of {} calls ({} mode)", report.calls.len(), mode).bold()
    );
    println!();
    println!("{}", Table::new(&report.calls));
    println!();

    let stats = &report.stats;
    println!(
        "{} {}  {} {}  {} {}",
        "succeeded:".green(),
        stats.succeeded,
        "failed:".red(),
        stats.failed,
        "rejected:".yellow(),
        stats.rejected
    );

    if !report.diverted.is_empty() {
        println!();
        println!("{}", "Diverted to error handler:".yellow().bold());
        for message in &report.diverted {
            println!("  - {}", message);
        }
    }
}
