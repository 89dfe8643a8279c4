//! Cadence CLI - keeps a rate-limited chat session busy
//!
//! Usage:
//!   cadence init                Write .cadence/config.toml with defaults
//!   cadence run [--start]       Open the terminal dashboard
//!   cadence headless            Run the loop without a UI until Ctrl+C
//!   cadence status              Log in once and print account, points and quota

use anyhow::{Context, Result};
use cadence_client::{ApiClient, PromptPool};
use cadence_core::{CadenceConfig, DiagnosticSink, StatusSink, SystemClock};
use cadence_dashboard::DashboardConfig;
use cadence_engine::{ActivityLogger, LogStatusSink, Services, Session, SessionSettings};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about = "Paced chat automation against a rate-limited service")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to .cadence/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config to .cadence/config.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Open the terminal dashboard
    Run {
        /// Start the session as soon as the dashboard opens
        #[arg(long)]
        start: bool,

        /// Redraw interval in milliseconds
        #[arg(long, default_value = "100")]
        tick: u64,
    },

    /// Run the loop without a UI until Ctrl+C
    Headless,

    /// Log in once and print account, points and quota
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { path, force } = &cli.command {
        init_logging(cli.verbose, None)?;
        return cmd_init(path, *force);
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Run { start, tick } => {
            // The dashboard owns the terminal, so tracing goes to a file
            init_logging(cli.verbose, Some(&config.logging.trace_log))?;
            cmd_run(config, start, tick).await
        }
        Commands::Headless => {
            init_logging(cli.verbose, None)?;
            cmd_headless(config).await
        }
        Commands::Status => {
            init_logging(cli.verbose, None)?;
            cmd_status(config).await
        }
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` wins when set; otherwise `--verbose` picks debug over info.
/// With a `log_file`, output is appended there instead of stderr.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {:?}", parent))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<CadenceConfig> {
    match path {
        Some(path) => CadenceConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => CadenceConfig::load_or_default(Path::new("."))
            .context("Failed to load .cadence/config.toml"),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    let target = path.join(cadence_core::config::CONFIG_DIR).join("config.toml");
    if target.exists() && !force {
        println!("Config already exists at {:?} (use --force to overwrite)", target);
        return Ok(());
    }

    let written = CadenceConfig::write_default(path).context("Failed to write default config")?;
    println!("Initialized Cadence in {:?}", path);
    println!("Created:");
    println!("  {}", written.display());
    println!();
    println!("Set {} before running:", CadenceConfig::default().api.api_key_env);
    println!("  cadence run --start");
    Ok(())
}

/// Build a session wired to the HTTP client, the prompt pool and the
/// activity log, reporting to `status`
fn build_session(config: &CadenceConfig, status: Arc<dyn StatusSink>) -> Result<Session> {
    let client = Arc::new(ApiClient::new(&config.api).context("Failed to create API client")?);
    let generator = Arc::new(PromptPool::new(config.prompts.messages.iter().cloned()));

    let session_id = uuid::Uuid::new_v4().to_string();
    let activity = ActivityLogger::new(&config.logging.activity_log, &session_id);
    activity.log_session_start(client.base_url());
    info!(
        "Session {} logging activity to {:?}",
        session_id,
        activity.path()
    );
    let diagnostics: Arc<dyn DiagnosticSink> = Arc::new(activity);

    let services = Services {
        credentials: client.clone(),
        chat: client.clone(),
        generator,
        quota: client.clone(),
        points: client,
        status,
        diagnostics,
        clock: Arc::new(SystemClock),
    };

    Ok(Session::with_id(
        session_id,
        services,
        SessionSettings::from_config(config),
    ))
}

async fn cmd_run(config: CadenceConfig, start: bool, tick: u64) -> Result<()> {
    let (sink, events) = cadence_dashboard::channel();
    let session = build_session(&config, Arc::new(sink.clone()))?;

    let dashboard_config = DashboardConfig {
        tick_ms: tick.max(10),
        autostart: start,
        ..Default::default()
    };

    let result = cadence_dashboard::run(session.clone(), sink, events, dashboard_config).await;
    session.stop().await;
    result.context("Dashboard failed")?;
    Ok(())
}

async fn cmd_headless(config: CadenceConfig) -> Result<()> {
    let session = build_session(&config, Arc::new(LogStatusSink))?;

    info!("Starting headless session (Ctrl+C to stop)");
    // A transient start failure schedules its own restart, so keep waiting
    if let Err(e) = session.start().await {
        if !e.is_transient() {
            return Err(e).context("Failed to start session");
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    let snapshot = session.snapshot().await;
    session.stop().await;
    info!(
        "Stopped after {} cycles: {} sent, {} failed",
        snapshot.stats.cycles, snapshot.stats.messages_sent, snapshot.stats.send_failures
    );
    Ok(())
}

async fn cmd_status(config: CadenceConfig) -> Result<()> {
    use cadence_core::{CredentialProvider, PointsService, QuotaService};

    let client = ApiClient::new(&config.api).context("Failed to create API client")?;
    client.login().await.context("Login failed")?;

    let user = client
        .current_user(false)
        .await
        .context("Failed to fetch user")?;
    let points = client.get_points().await.context("Failed to fetch points")?;
    let quota = client.get_quota().await.context("Failed to fetch quota")?;

    println!("Cadence Status");
    println!("==============");
    println!("{:<14} {}", "Endpoint", client.base_url());
    println!("{:<14} {}", "User", user.username);
    println!("{:<14} {}", "User ID", user.id);
    if let Some(code) = &user.referral_code {
        println!("{:<14} {}", "Referral code", code);
    }
    println!();
    println!("{:<14} {}", "Points", points.total);
    println!("{:<14} {}", "  inference", points.inference);
    println!("{:<14} {}", "  referral", points.referral);
    println!();
    println!(
        "{:<14} {}/{} remaining",
        "Quota", quota.remaining, quota.limit
    );
    println!(
        "{:<14} {}",
        "Resets at",
        quota.reset_time.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if quota.is_exhausted() {
        println!("\nQuota exhausted: the loop will wait for the reset");
    }

    Ok(())
}
