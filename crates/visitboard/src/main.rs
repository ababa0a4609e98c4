//! visitboard - Visitor analytics dashboard backend

mod cli;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::View;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use visitboard_core::{AnalyticsService, CompareRequest, ComparePreset, DashboardConfig, Lookback};
use visitboard_web::AppState;

#[derive(Parser)]
#[command(
    name = "visitboard",
    version,
    about = "Visitor analytics dashboard backend",
    long_about = "Serves weekly and monthly rollups of day-level site traffic over HTTP,\n\
                  with period-over-period change rates and a scheduled collection endpoint.\n\
                  \n\
                  Examples:\n\
                    visitboard serve                       # API on 127.0.0.1:3333\n\
                    visitboard serve --port 8080           # Custom port\n\
                    visitboard aggregate --days 30         # Weekly table for the last 30 days\n\
                    visitboard aggregate --view monthly    # Monthly rollup\n\
                    visitboard aggregate --json            # Full payload as JSON\n\
                    visitboard compare --preset month      # This month vs last month\n\
                    visitboard collect                     # Refresh the store once\n\
                    visitboard clear-cache                 # Drop cached data\n\
                  \n\
                  Environment Variables:\n\
                    VISITBOARD_CONFIG                      # Path to config.toml\n\
                    VISITBOARD_LOG_JSON                    # JSON log lines on stderr\n\
                    VISITBOARD_NO_COLOR                    # Disable ANSI colors\n\
                    RUST_LOG                               # Log filter (default: info)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: <config dir>/visitboard/config.toml)
    #[arg(long, env = "VISITBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "VISITBOARD_LOG_JSON")]
    log_json: bool,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, env = "VISITBOARD_NO_COLOR")]
    no_color: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the aggregated view
    Aggregate {
        /// Lookback window in days (1-730)
        #[arg(long)]
        days: Option<u32>,
        /// Skip caches and hit the source
        #[arg(long)]
        refresh: bool,
        /// Print the full payload as JSON
        #[arg(long)]
        json: bool,
        /// Which rollup to print
        #[arg(long, value_enum, default_value_t = View::Weekly)]
        view: View,
    },
    /// Fetch recent days into the store
    Collect {
        /// Days to re-fetch (overrides config)
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Compare the current period with the previous one
    Compare {
        /// week or month
        #[arg(long, default_value = "week")]
        preset: String,
        #[arg(long)]
        json: bool,
    },
    /// Clear the persistent store and in-process caches
    ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_json, cli.no_color);

    let config = DashboardConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let service = Arc::new(
        AnalyticsService::from_config(&config).context("Failed to set up analytics service")?,
    );

    match cli.command {
        Command::Serve { host, port } => run_serve(service, &config, host, port).await,
        Command::Aggregate {
            days,
            refresh,
            json,
            view,
        } => run_aggregate(&service, days, refresh, json, view, cli.no_color).await,
        Command::Collect { days, json } => run_collect(&service, &config, days, json).await,
        Command::Compare { preset, json } => run_compare(&service, &preset, json, cli.no_color).await,
        Command::ClearCache => run_clear_cache(&service),
    }
}

/// Logs go to stderr so table/JSON output on stdout stays clean
fn init_tracing(json: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(!no_color),
            )
            .init();
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn run_serve(
    service: Arc<AnalyticsService>,
    config: &DashboardConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

    let state = AppState::from_config(service, config);
    if state.cron_secret.is_none() {
        tracing::warn!("No cron secret configured, collection endpoint is open");
    }

    visitboard_web::run(state, addr).await
}

async fn run_aggregate(
    service: &AnalyticsService,
    days: Option<u32>,
    refresh: bool,
    json: bool,
    view: View,
    no_color: bool,
) -> Result<()> {
    let lookback = days
        .map(Lookback::new)
        .unwrap_or_else(|| service.default_lookback());

    let pb = spinner("Aggregating...");
    let response = service.aggregated(lookback, refresh).await;
    pb.finish_and_clear();

    if json {
        println!("{}", cli::to_json(&response));
        return Ok(());
    }

    println!("{} ({})", lookback.display(), response.origin);
    let data = &response.data;
    let body = match view {
        View::Daily => cli::format_daily_table(&data.daily, no_color),
        View::Weekly => cli::format_weekly_table(&data.weekly, no_color),
        View::Monthly => cli::format_monthly_table(&data.monthly, no_color),
        View::Summary => cli::format_summary(&data.summary, response.origin),
    };
    println!("{}", body);

    Ok(())
}

async fn run_collect(
    service: &AnalyticsService,
    config: &DashboardConfig,
    days: Option<u32>,
    json: bool,
) -> Result<()> {
    let collector = service.collector(days.unwrap_or(config.cron.collect_days));

    let pb = spinner("Collecting...");
    let report = collector.collect().await;
    pb.finish_and_clear();

    if json {
        println!("{}", cli::to_json(&report));
    } else {
        println!("{}", cli::format_collection_report(&report));
    }

    if !report.success {
        anyhow::bail!("Collection failed");
    }
    Ok(())
}

async fn run_compare(
    service: &AnalyticsService,
    preset: &str,
    json: bool,
    no_color: bool,
) -> Result<()> {
    let preset: ComparePreset = preset.parse()?;

    let pb = spinner("Comparing...");
    let result = service.compare(CompareRequest::Preset(preset)).await;
    pb.finish_and_clear();
    let response = result.context("Failed to load comparison data")?;

    if json {
        println!("{}", cli::to_json(&response));
    } else {
        println!("{}", cli::format_comparison(&response.comparison, no_color));
    }

    Ok(())
}

fn run_clear_cache(service: &AnalyticsService) -> Result<()> {
    service.clear_cache()?;
    println!("Cache cleared");
    Ok(())
}
