//! Configuration settings for NetDash
//!
//! Settings resolve in three layers: built-in defaults, then an optional
//! JSON config file, then command-line flags and environment variables.

use crate::error::{DashboardError, Result};
use crate::filter::FilterClause;
use crate::query::{CacheConfig, RetryPolicy, DEFAULT_GC_TIME, DEFAULT_STALE_TIME};
use crate::url_state::SortDirection;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Default rows per page of the device list
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// NetDash - network device dashboard for the terminal
#[derive(Parser, Debug, Clone)]
#[command(
    name = "netdash",
    author,
    version = env!("CARGO_PKG_VERSION"),
    about = "Browse network devices, alerts and metrics from the terminal",
    long_about = r#"
NetDash talks to the network-device REST API and renders its data as
tables. Device list state (page, sort, search, filters) is expressed as a
URL query string, so any view can be reproduced with --state.

Examples:
  netdash devices --sort hostName --filter status.equals=down
  netdash devices --state "page=2&pageSize=50&search=core"
  netdash device 42 --alerts --interfaces
  netdash metrics 42 --metric cpu --from 6h
"#
)]
pub struct CliArgs {
    /// API base URL
    #[arg(long, env = "NETDASH_BASE_URL", global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, env = "NETDASH_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// JSON config file
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Per-request timeout (e.g. 10s, 1m)
    #[arg(long, global = true, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Retries after a failed request (network and 5xx errors only)
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// How long fetched data counts as fresh
    #[arg(long, global = true, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub stale_time: Option<Duration>,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Log format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only, no spinner)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List devices
    #[command(name = "devices")]
    Devices {
        /// Start from a saved list state query string
        #[arg(long, value_name = "QUERY")]
        state: Option<String>,

        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,

        /// Page number (1-based)
        #[arg(short, long)]
        page: Option<u32>,

        /// Rows per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Sort column
        #[arg(long, value_name = "COLUMN")]
        sort: Option<String>,

        /// Sort direction
        #[arg(long, value_enum)]
        direction: Option<SortArg>,

        /// Filter as field.operator=value (repeatable)
        #[arg(short, long = "filter", value_name = "FIELD.OP=VALUE", value_parser = parse_filter_arg)]
        filters: Vec<FilterClause>,
    },

    /// Show one device
    #[command(name = "device")]
    Device {
        /// Device ID
        id: String,

        /// Also list the device's alerts
        #[arg(long)]
        alerts: bool,

        /// Also list the device's interfaces
        #[arg(long)]
        interfaces: bool,

        /// Acknowledge an alert before showing the device
        #[arg(long, value_name = "ALERT_ID")]
        acknowledge: Option<String>,
    },

    /// Show a metric time series
    #[command(name = "metrics")]
    Metrics {
        /// Device ID
        device_id: String,

        /// Metric name (e.g. cpu, memory, rx_bps)
        #[arg(short, long)]
        metric: String,

        /// Range start: RFC 3339 time or a duration ago (e.g. 6h)
        #[arg(long, value_parser = parse_time_arg)]
        from: Option<DateTime<Utc>>,

        /// Range end: RFC 3339 time or a duration ago
        #[arg(long, value_parser = parse_time_arg)]
        to: Option<DateTime<Utc>>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Text,
    /// JSON documents
    Json,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Sort direction flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Asc,
    Desc,
}

impl From<SortArg> for SortDirection {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Asc => SortDirection::Asc,
            SortArg::Desc => SortDirection::Desc,
        }
    }
}

impl CliArgs {
    /// Log level implied by `-q` / `-v`
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Parse a `field.operator=value` filter flag
pub fn parse_filter_arg(s: &str) -> std::result::Result<FilterClause, String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD.OP=VALUE, got '{}'", s))?;
    FilterClause::from_url_pair(key.trim(), value.trim())
        .ok_or_else(|| format!("invalid filter '{}'", s))
}

/// Parse a time flag: RFC 3339, or a humantime duration counted back from now
pub fn parse_time_arg(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(time) = DateTime::parse_from_rfc3339(s) {
        return Ok(time.with_timezone(&Utc));
    }
    let ago = humantime::parse_duration(s).map_err(|e| format!("invalid time '{}': {}", s, e))?;
    let ago = chrono::Duration::from_std(ago).map_err(|e| format!("invalid time '{}': {}", s, e))?;
    Ok(Utc::now() - ago)
}

/// Resolved runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// API base URL
    pub base_url: String,
    /// Bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Per-request timeout
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Freshness window of cached queries
    #[serde(with = "duration_serde")]
    pub stale_time: Duration,
    /// How long unobserved entries are kept
    #[serde(with = "duration_serde")]
    pub gc_time: Duration,
    /// Retry policy for failed fetches
    pub retry: RetryPolicy,
    /// Device list page size when the state has none
    pub default_page_size: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            request_timeout: crate::api::DEFAULT_REQUEST_TIMEOUT,
            stale_time: DEFAULT_STALE_TIME,
            gc_time: DEFAULT_GC_TIME,
            retry: RetryPolicy::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl DashboardConfig {
    /// Load a JSON config file; missing keys keep their defaults
    pub fn load_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DashboardError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| DashboardError::config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Build configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load_file(path)?,
            None => Self::default(),
        };

        if let Some(url) = &args.base_url {
            config.base_url = url.clone();
        }
        if args.token.is_some() {
            config.token = args.token.clone();
        }
        if let Some(timeout) = args.timeout {
            config.request_timeout = timeout;
        }
        if let Some(retries) = args.retries {
            config.retry.max_retries = retries;
        }
        if let Some(stale_time) = args.stale_time {
            config.stale_time = stale_time;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| DashboardError::config(format!("invalid base URL '{}': {}", self.base_url, e)))?;
        if self.default_page_size == 0 {
            return Err(DashboardError::config("default_page_size must be at least 1"));
        }
        if self.request_timeout.is_zero() {
            return Err(DashboardError::config("request_timeout must be positive"));
        }
        Ok(())
    }

    /// Query cache settings
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            stale_time: self.stale_time,
            gc_time: self.gc_time,
            retry: self.retry,
        }
    }
}

/// Serde adapter writing durations as humantime strings (`"30s"`, `"5m"`)
pub mod duration_serde {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(de::Error::custom)
    }
}
