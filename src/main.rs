//! NetDash CLI - Network Device Dashboard
//!
//! Browse devices, alerts, interfaces and metrics from the terminal.

use chrono::{DateTime, Utc};
use clap::Parser;
use console::style;
use netdash::api::{DashboardClient, HttpTransport, MetricsQuery};
use netdash::config::{CliArgs, Commands, DashboardConfig, LogFormat, OutputFormat, SortArg};
use netdash::dashboard::{metrics_summary, metrics_table, DeviceDetail, DeviceListView};
use netdash::error::{DashboardError, Result};
use netdash::filter::FilterClause;
use netdash::progress::LoadingSpinner;
use netdash::query::QueryCache;
use netdash::url_state::{SortState, UrlStateManager};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Upper bound on the cache GC sweep interval
const MAX_GC_INTERVAL: Duration = Duration::from_secs(60);

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    init_logging(&args);

    // Handle result
    if let Err(e) = run(args) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(args: &CliArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("netdash={}", args.log_level())));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match args.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}

fn run(args: CliArgs) -> Result<()> {
    let config = DashboardConfig::from_cli(&args)?;

    if args.verbose > 0 {
        print_config(&config);
    }

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| DashboardError::config(format!("Failed to create runtime: {}", e)))?;

    rt.block_on(async {
        let transport = HttpTransport::new(&config.base_url, config.request_timeout)?
            .with_token(config.token.clone());
        let cache = QueryCache::new(config.cache_config());
        cache.spawn_gc(config.gc_time.min(MAX_GC_INTERVAL));
        let client = DashboardClient::new(Arc::new(transport), cache.clone());

        let result = handle_command(&args, &config, client).await;

        tracing::debug!(stats = ?cache.stats(), "disposing query cache");
        cache.dispose();
        result
    })
}

async fn handle_command(args: &CliArgs, config: &DashboardConfig, client: DashboardClient) -> Result<()> {
    match &args.command {
        Commands::Devices {
            state,
            search,
            page,
            page_size,
            sort,
            direction,
            filters,
        } => {
            let edits = DeviceListEdits {
                state: state.as_deref(),
                search: search.as_deref(),
                page: *page,
                page_size: *page_size,
                sort: sort.as_deref(),
                direction: *direction,
                filters,
            };
            cmd_devices(args, config, client, edits).await
        }
        Commands::Device {
            id,
            alerts,
            interfaces,
            acknowledge,
        } => cmd_device(args, &client, id, *alerts, *interfaces, acknowledge.as_deref()).await,
        Commands::Metrics {
            device_id,
            metric,
            from,
            to,
        } => cmd_metrics(args, &client, device_id, metric, *from, *to).await,
    }
}

/// Device list flags, applied on top of `--state` in a fixed order
struct DeviceListEdits<'a> {
    state: Option<&'a str>,
    search: Option<&'a str>,
    page: Option<u32>,
    page_size: Option<u32>,
    sort: Option<&'a str>,
    direction: Option<SortArg>,
    filters: &'a [FilterClause],
}

async fn cmd_devices(
    args: &CliArgs,
    config: &DashboardConfig,
    client: DashboardClient,
    edits: DeviceListEdits<'_>,
) -> Result<()> {
    let location = match edits.state {
        Some(query) => format!("/devices?{}", query.trim_start_matches('?')),
        None => "/devices".to_string(),
    };
    let cache = client.cache().clone();
    let mut view = DeviceListView::new(client, UrlStateManager::from_location(&location)?, config.default_page_size);

    if let Some(search) = edits.search {
        view.set_search(search);
    }
    for clause in edits.filters {
        view.apply_filter(clause.clone());
    }
    if let Some(page_size) = edits.page_size {
        view.set_page_size(page_size);
    }
    if let Some(column) = edits.sort {
        let sort = match edits.direction {
            Some(SortArg::Desc) => SortState::descending(column),
            _ => SortState::ascending(column),
        };
        if !view.table().column(column).is_some_and(|c| c.sortable) {
            return Err(DashboardError::InvalidState(format!("cannot sort by '{}'", column)));
        }
        view.set_sort(sort);
    }
    // Page last: search, filter and page-size edits reset it
    if let Some(page) = edits.page {
        view.go_to_page(page);
    }

    tracing::info!(location = %view.location(), "loading device list");
    let quiet = args.quiet || args.format == OutputFormat::Json;
    let spinner = LoadingSpinner::start("Loading devices", quiet);
    let table = view.load().await;
    spinner.clear();

    let state = cache.state(&view.query_key());
    match args.format {
        OutputFormat::Json => match (&state.data, state.error) {
            (Some(data), _) => print_json(&**data),
            (None, Some(error)) => Err(error),
            (None, None) => Err(DashboardError::Cancelled),
        },
        OutputFormat::Text => {
            println!("{}", table);
            if !args.quiet {
                eprintln!("{}", style(view.location()).dim());
            }
            match state.error {
                Some(error) if table.is_error() => Err(error),
                _ => Ok(()),
            }
        }
    }
}

async fn cmd_device(
    args: &CliArgs,
    client: &DashboardClient,
    id: &str,
    alerts: bool,
    interfaces: bool,
    acknowledge: Option<&str>,
) -> Result<()> {
    let quiet = args.quiet || args.format == OutputFormat::Json;

    if let Some(alert_id) = acknowledge {
        with_spinner(
            &format!("Acknowledging alert {}", alert_id),
            quiet,
            client.acknowledge_alert(id, alert_id),
        )
        .await
        .map_err(|e| e.with_context(format!("Acknowledging alert {} on device {}", alert_id, id)))?;
        if !quiet {
            eprintln!("{} alert {} acknowledged", style("✓").green(), alert_id);
        }
    }

    let detail = with_spinner(
        &format!("Loading device {}", id),
        quiet,
        DeviceDetail::load(client, id, alerts || acknowledge.is_some(), interfaces),
    )
    .await?;

    if args.format == OutputFormat::Json {
        return print_json(&detail);
    }

    println!("{}", detail.summary_text());
    if let Some(table) = detail.alerts_table()? {
        println!("\n{}", style("Alerts").bold());
        println!("{}", table);
    }
    if let Some(table) = detail.interfaces_table()? {
        println!("\n{}", style("Interfaces").bold());
        println!("{}", table);
    }
    Ok(())
}

async fn cmd_metrics(
    args: &CliArgs,
    client: &DashboardClient,
    device_id: &str,
    metric: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(DashboardError::config("--from must not be later than --to"));
        }
    }

    let quiet = args.quiet || args.format == OutputFormat::Json;
    let query = MetricsQuery::new(device_id, metric).between(from, to);
    let series = with_spinner(
        &format!("Loading {} for device {}", metric, device_id),
        quiet,
        client.metrics(&query),
    )
    .await?;

    if args.format == OutputFormat::Json {
        return print_json(&series);
    }

    if let Some(summary) = metrics_summary(&series) {
        println!("{}", style(summary).bold());
    }
    println!("{}", metrics_table(&series)?);
    Ok(())
}

async fn with_spinner<T>(message: &str, quiet: bool, work: impl Future<Output = Result<T>>) -> Result<T> {
    let spinner = LoadingSpinner::start(message, quiet);
    let result = work.await;
    match &result {
        Ok(_) => spinner.clear(),
        Err(e) => spinner.finish_error(&e.user_message()),
    }
    result
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_config(config: &DashboardConfig) {
    eprintln!("=== Configuration ===");
    eprintln!("Base URL:        {}", config.base_url);
    eprintln!("Token:           {}", if config.token.is_some() { "set" } else { "none" });
    eprintln!("Request timeout: {}", humantime::format_duration(config.request_timeout));
    eprintln!("Stale time:      {}", humantime::format_duration(config.stale_time));
    eprintln!("GC time:         {}", humantime::format_duration(config.gc_time));
    eprintln!(
        "Retries:         {} (base delay {}, max delay {})",
        config.retry.max_retries,
        humantime::format_duration(config.retry.base_delay),
        humantime::format_duration(config.retry.max_delay)
    );
    eprintln!("Page size:       {}", config.default_page_size);
    eprintln!();
}
