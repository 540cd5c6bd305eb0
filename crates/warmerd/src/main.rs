//! warmerd — the page warmer daemon.
//!
//! Loads the warmer config, wires the HTTP fetcher and alert notifier into
//! the scheduler, and runs the timer loop in the foreground until Ctrl-C.
//!
//! # Usage
//!
//! ```text
//! warmerd run --config /etc/warmer/warmer.toml
//! warmerd once --config config.json
//! warmerd validate --config warmer.toml
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use warmer_check::HttpFetcher;
use warmer_core::WarmerConfig;
use warmer_notify::{EmailNotifier, LogNotifier, Notifier, SmtpMailTransport};
use warmer_scheduler::{Warmer, WarmerService};

const DEFAULT_LOG_FILTER: &str = "info,warmer=debug";

#[derive(Parser)]
#[command(name = "warmerd", about = "Page warmer daemon", version)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the timer loop in the foreground until Ctrl-C.
    Run {
        /// Path to the config file (.toml or .json).
        #[arg(long, short)]
        config: PathBuf,
    },
    /// Run a single tick and exit. Exits non-zero if any page failed.
    Once {
        #[arg(long, short)]
        config: PathBuf,
    },
    /// Load and validate a config file, then print a summary.
    Validate {
        #[arg(long, short)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Command::Run { config } => run(&config).await,
        Command::Once { config } => once(&config).await,
        Command::Validate { config } => validate(&config),
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: &Path) -> anyhow::Result<Arc<WarmerConfig>> {
    let config = WarmerConfig::from_file(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    info!(
        path = %path.display(),
        pages = config.pages.len(),
        interval_secs = config.timer_resolution_seconds,
        random_page = config.warm_one_random_page_per_timer_loop,
        "config loaded"
    );
    Ok(Arc::new(config))
}

fn build_notifier(config: &WarmerConfig) -> Arc<dyn Notifier> {
    match &config.email {
        Some(email) => {
            info!(to = %email.to, host = %email.host, "email alerts enabled");
            Arc::new(EmailNotifier::new(SmtpMailTransport::new(email), email))
        }
        None => {
            warn!("no email settings; alerts will only be logged");
            Arc::new(LogNotifier)
        }
    }
}

fn build_warmer(config: Arc<WarmerConfig>) -> anyhow::Result<Warmer> {
    let fetcher =
        HttpFetcher::new(config.request_timeout()?).context("failed to build HTTP client")?;
    let notifier = build_notifier(&config);
    Ok(Warmer::new(config, Arc::new(fetcher), notifier))
}

async fn run(config_path: &Path) -> anyhow::Result<ExitCode> {
    info!("page warmer starting");
    let config = load_config(config_path)?;
    let warmer = build_warmer(config)?;

    let mut service = WarmerService::new(Arc::new(warmer))?;
    service.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to install Ctrl-C handler")?;
    info!("shutdown signal received");

    service.stop().await;
    info!("page warmer stopped");
    Ok(ExitCode::SUCCESS)
}

async fn once(config_path: &Path) -> anyhow::Result<ExitCode> {
    let config = load_config(config_path)?;
    let warmer = build_warmer(config)?;

    let report = warmer.run().await;
    for failure in &report.failures {
        warn!(url = %failure.url, kind = %failure.kind, "page failed");
    }
    info!(
        checked = report.checked,
        succeeded = report.succeeded,
        failed = report.failures.len(),
        aborted = report.aborted,
        "tick complete"
    );

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn validate(config_path: &Path) -> anyhow::Result<ExitCode> {
    let config = load_config(config_path)?;

    println!(
        "config OK: {} page(s), tick every {}s, {}",
        config.pages.len(),
        config.timer_resolution_seconds,
        if config.warm_one_random_page_per_timer_loop {
            "one random page per tick"
        } else {
            "all pages per tick"
        }
    );
    for page in &config.pages {
        println!(
            "  {}  threshold={}s  token={}",
            page.url,
            page.response_threshold_seconds,
            page.token().unwrap_or("-")
        );
    }
    match &config.email {
        Some(email) => println!("alerts: email to {} via {}:{}", email.to, email.host, email.port),
        None => println!("alerts: log only"),
    }

    Ok(ExitCode::SUCCESS)
}
