use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Parser;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use usage_dashboard::{
    AppState, build_app, cache,
    clock::{Clock, SystemClock},
    config::{ConfigError, DashboardConfig},
    jobs,
    models::{CacheRecord, DateRange, Snapshot},
    observability,
    report::ReportImport,
};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "usage-dashboard.toml";

/// CLI arguments for the usage dashboard
#[derive(Parser, Debug)]
#[command(version, about = "PostHog usage dashboard backend", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./usage-dashboard.toml if it exists,
    /// otherwise configuration comes from POSTHOG_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Refresh the snapshot once, print it as JSON, and exit
    Refresh {
        /// Days of history to aggregate (defaults to aggregation.default_days)
        #[arg(short, long)]
        days: Option<u32>,
        /// Also list this many organizations by total time on stderr
        #[arg(long, default_value_t = 0)]
        top: usize,
    },
    /// Convert a markdown usage report into a snapshot and print it as JSON
    Import {
        /// Markdown report to read
        report: PathBuf,
        /// First day covered (defaults to the earliest day of activity)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day covered (defaults to the latest day of activity)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Store the snapshot in the configured cache slot
        #[arg(long)]
        write_cache: bool,
        /// Print the parsed report sections instead of the snapshot
        #[arg(long)]
        raw: bool,
        /// Organizations to list by total time on stderr
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Initialize a new configuration file
    Init {
        /// Path to create the config file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Starter configuration written by `init`.
fn default_config_toml() -> &'static str {
    r#"# Usage dashboard configuration

[server]
host = "0.0.0.0"
port = 8080
cors_allow_origin = "*"

[posthog]
# Falls back to the POSTHOG_API_KEY environment variable when unset.
# api_key = "${POSTHOG_API_KEY}"
project_id = "54557"
host = "https://eu.i.posthog.com"
timeout_secs = 30

# Single-slot snapshot cache. Use type = "memory" to keep it in-process.
[cache]
type = "file"
path = "/tmp/posthog-dashboard-cache.json"
max_age_secs = 3600

[aggregation]
default_days = 60
daily_cap_minutes = 480

[observability.logging]
level = "info"
format = "compact"

# Keep the cache warm in the background.
[jobs.snapshot_refresh]
enabled = false
interval_secs = 3000
"#
}

/// Load configuration from an explicit path, the working directory, or the
/// environment, in that order.
fn load_config(explicit_path: Option<&Path>) -> Result<DashboardConfig, ConfigError> {
    if let Some(path) = explicit_path {
        return DashboardConfig::from_file(path);
    }

    let cwd_config = PathBuf::from(DEFAULT_CONFIG_FILE);
    if cwd_config.exists() {
        return DashboardConfig::from_file(&cwd_config);
    }

    DashboardConfig::from_env()
}

fn load_config_or_exit(explicit_path: Option<&Path>) -> DashboardConfig {
    match load_config(explicit_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing_or_exit(config: &DashboardConfig) {
    if let Err(e) = observability::init_tracing(&config.observability.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Init { output, force }) => {
            run_init(output, force);
        }
        Some(Command::Refresh { days, top }) => {
            run_refresh(args.config.as_deref(), days, top).await;
        }
        Some(Command::Import {
            report,
            start,
            end,
            write_cache,
            raw,
            top,
        }) => {
            let options = ImportOptions {
                start,
                end,
                write_cache,
                raw,
                top,
            };
            run_import(args.config.as_deref(), &report, options).await;
        }
        Some(Command::Serve) | None => {
            run_server(args.config.as_deref()).await;
        }
    }
}

/// Initialize a new configuration file
fn run_init(output: Option<PathBuf>, force: bool) {
    let output_path = output.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if output_path.exists() && !force {
        eprintln!(
            "Config file already exists: {}\nUse --force to overwrite.",
            output_path.display()
        );
        std::process::exit(1);
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create directory {}: {}", parent.display(), e);
        std::process::exit(1);
    }

    if let Err(e) = std::fs::write(&output_path, default_config_toml()) {
        eprintln!("Failed to write config file: {}", e);
        std::process::exit(1);
    }

    println!("Created config file: {}", output_path.display());
    println!();
    println!("Set POSTHOG_API_KEY, then start the server with:");
    println!("  usage-dashboard serve");
}

/// One-shot refresh for cron jobs and debugging.
async fn run_refresh(explicit_config_path: Option<&Path>, days: Option<u32>, top: usize) {
    let config = load_config_or_exit(explicit_config_path);
    init_tracing_or_exit(&config);

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    let snapshot = match state.services.refresh.refresh(days, state.clock.now()).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("Refresh failed: {}", e);
            std::process::exit(1);
        }
    };

    print_json(&snapshot);
    print_top_organizations(&snapshot, top);
}

struct ImportOptions {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    write_cache: bool,
    raw: bool,
    top: usize,
}

/// Offline import of the markdown usage report.
async fn run_import(explicit_config_path: Option<&Path>, report: &Path, options: ImportOptions) {
    let config = load_config_or_exit(explicit_config_path);
    init_tracing_or_exit(&config);

    let import = match ReportImport::from_file(report) {
        Ok(import) => import,
        Err(e) => {
            eprintln!("Failed to import report: {}", e);
            std::process::exit(1);
        }
    };

    if options.raw {
        print_json(&import);
        return;
    }

    let now = SystemClock.now();
    let fallback = DateRange::ending_at(now, config.aggregation.default_days);
    let range = match import_range(&import, options.start, options.end, fallback) {
        Ok(range) => range,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let snapshot = import.to_snapshot(range, now);

    if options.write_cache {
        let store = cache::create_store(&config.cache);
        if let Err(e) = store.write(CacheRecord::new(snapshot.clone(), now)).await {
            eprintln!("Failed to write snapshot cache: {}", e);
            std::process::exit(1);
        }
        tracing::info!(
            backend = store.backend(),
            organizations = snapshot.organizations.len(),
            "Imported snapshot written to cache"
        );
    }

    print_json(&snapshot);
    print_top_organizations(&snapshot, options.top);
}

/// Date window for an imported snapshot: explicit bounds first, then the
/// report's own activity, then the default window ending today.
fn import_range(
    import: &ReportImport,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    fallback: DateRange,
) -> Result<DateRange, String> {
    let activity = import.activity_range().unwrap_or(fallback);
    let range = DateRange {
        start: start.unwrap_or(activity.start),
        end: end.unwrap_or(activity.end),
    };

    if range.start > range.end {
        return Err(format!(
            "Start date {} is after end date {}",
            range.start, range.end
        ));
    }
    Ok(range)
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize output: {}", e);
            std::process::exit(1);
        }
    }
}

/// Summary goes to stderr so stdout stays valid JSON.
fn print_top_organizations(snapshot: &Snapshot, limit: usize) {
    if limit == 0 {
        return;
    }

    eprintln!("Top {} organizations by time:", limit);
    for summary in snapshot.top_organizations(limit) {
        eprintln!("  {}", summary);
    }
}

async fn run_server(explicit_config_path: Option<&Path>) {
    let config = load_config_or_exit(explicit_config_path);
    init_tracing_or_exit(&config);

    if !config.posthog.has_api_key() {
        tracing::warn!(
            "PostHog API key not configured; serving cached snapshots only, refreshes will fail"
        );
    }

    let state = match AppState::new(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            std::process::exit(1);
        }
    };

    let task_tracker = TaskTracker::new();
    let shutdown = CancellationToken::new();

    if config.jobs.snapshot_refresh.enabled {
        task_tracker.spawn(jobs::start_snapshot_refresh_worker(
            state.services.refresh.clone(),
            state.clock.clone(),
            config.jobs.snapshot_refresh.clone(),
            shutdown.clone(),
        ));
    }

    let app = build_app(&config, state);

    let bind_addr = config.server.socket_addr();
    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_addr, error = %e, "Failed to bind to address");
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on http://{}", bind_addr);

    // Graceful shutdown: wait for SIGINT/SIGTERM, then wait for background tasks
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(task_tracker, shutdown))
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal(task_tracker: TaskTracker, shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, waiting for background tasks to complete...");

    shutdown.cancel();
    task_tracker.close();

    // An in-flight refresh is bounded by the upstream timeout
    let wait_result =
        tokio::time::timeout(std::time::Duration::from_secs(30), task_tracker.wait()).await;

    match wait_result {
        Ok(()) => tracing::info!("All background tasks completed"),
        Err(_) => {
            tracing::warn!("Timeout waiting for background tasks, some may not have completed")
        }
    }

    tracing::info!("Shutdown complete");
}
