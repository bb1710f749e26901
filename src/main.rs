//! Review Monitor CLI
//!
//! Runs one scan of a repository's review queue per invocation, or reports on
//! the runs already stored. Logs go to stderr; reports and JSON go to stdout.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use review_monitor::config::{ConfigLoader, MonitorConfig};
use review_monitor::github::GitHubClient;
use review_monitor::monitor::{latest_status, run_report};
use review_monitor::state::JsonFileStore;
use review_monitor::{MonitorError, ReviewMonitor, ScanOptions};

#[derive(Parser)]
#[command(name = "review-monitor")]
#[command(about = "Classify open issues and PRs of a repository and pace follow-up scans")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// State document path (overrides configuration)
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Repository as owner/name (overrides configuration)
    #[arg(long, global = true)]
    repo: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scan and record it
    Scan {
        /// Print a rendered summary instead of JSON, throttled on unchanged scans
        #[arg(long)]
        report: bool,

        /// Upsert the audit-delta and digest comments when the scan changed
        #[arg(long)]
        post_comments: bool,

        /// Compute everything but neither post comments nor save state
        #[arg(long)]
        dry_run: bool,
    },
    /// Aggregate recent runs
    Report {
        /// Lookback window in hours
        #[arg(long)]
        hours: Option<f64>,

        /// Maximum number of runs to include
        #[arg(long, default_value_t = 50)]
        max_runs: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the latest stored run and the next scheduled action
    Status,
}

fn load_config(cli: &Cli) -> anyhow::Result<MonitorConfig> {
    let mut config = ConfigLoader::from_process_env().load(cli.config.as_deref())?;
    if let Some(path) = &cli.state_file {
        config.state_file = path.clone();
    }
    if let Some(repo) = &cli.repo {
        config.repo = Some(repo.clone());
    }
    Ok(config)
}

fn github_client(config: &MonitorConfig) -> anyhow::Result<GitHubClient> {
    let token = config
        .token
        .as_deref()
        .ok_or_else(|| MonitorError::missing_setting("GITHUB_TOKEN"))?;
    let repo = config
        .repo
        .as_deref()
        .ok_or_else(|| MonitorError::missing_setting("REVIEW_MONITOR_REPO"))?;
    Ok(GitHubClient::new(token, repo, config.api_url.as_deref())?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_monitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let store = JsonFileStore::new(config.state_file.clone());

    match cli.command {
        Commands::Scan {
            report,
            post_comments,
            dry_run,
        } => {
            let client = github_client(&config)?;
            info!("Scanning {}/{}", client.owner(), client.repo());

            let monitor = ReviewMonitor::new(client, store, config);
            let options = ScanOptions {
                post_comments,
                report_mode: report,
                dry_run,
            };
            let outcome = monitor
                .scan(Utc::now(), options)
                .await
                .context("scan failed, no state was written")?;

            if report {
                if let Some(text) = outcome.report_text() {
                    println!("{}", text);
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?);
            }
        }
        Commands::Report {
            hours,
            max_runs,
            json,
        } => {
            let report = run_report(&store, &config.thresholds, Utc::now(), hours, max_runs)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.render());
            }
        }
        Commands::Status => {
            match latest_status(&store)? {
                Some(text) => println!("{}", text),
                None => println!("No runs recorded in {:?}", store.path()),
            }
        }
    }

    Ok(())
}
