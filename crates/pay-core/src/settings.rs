use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{PayError, Result};
use crate::time_utils::TimezoneHandler;

/// Endpoint returning USD-relative exchange rates.
pub const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// Port the feedback relay listens on when `SERVER_PORT` is unset.
pub const DEFAULT_RELAY_PORT: u16 = 3001;

/// Timezone used for export timestamps that carry no offset.
pub const DEFAULT_TIMEZONE: &str = "America/Chicago";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Earnings analyzer for piecework CSV exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "outlier-pay",
    about = "Earnings analyzer for piecework CSV exports",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Timezone for export dates without an explicit offset
    #[arg(long, global = true, default_value = DEFAULT_TIMEZONE)]
    pub timezone: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Parse an earnings CSV and print statistics for a date range
    Analyze(AnalyzeArgs),
    /// List the currencies available for conversion
    Currencies(CurrenciesArgs),
    /// Run the feedback relay server
    Relay(RelayArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Path to the earnings export (.csv)
    pub file: PathBuf,

    /// Date range to analyse
    #[arg(long, default_value = "current", value_parser = ["current", "previous", "lifetime"])]
    pub range: String,

    /// Custom range start; overrides --range together with --to
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Custom range end (inclusive)
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// Currency code to display amounts in
    #[arg(long, default_value = "USD")]
    pub currency: String,

    /// Skip the exchange-rate lookup and report in USD
    #[arg(long)]
    pub offline: bool,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Exchange-rate endpoint
    #[arg(long, default_value = DEFAULT_RATES_URL)]
    pub rates_url: String,
}

#[derive(Args, Debug, Clone)]
pub struct CurrenciesArgs {
    /// Exchange-rate endpoint
    #[arg(long, default_value = DEFAULT_RATES_URL)]
    pub rates_url: String,
}

#[derive(Args, Debug, Clone)]
pub struct RelayArgs {
    /// Port to listen on
    #[arg(long, env = "SERVER_PORT", default_value_t = DEFAULT_RELAY_PORT)]
    pub port: u16,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Chat webhook suggestions are forwarded to
    #[arg(long, env = "DISCORD_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Allowed CORS origin (any origin when unset)
    #[arg(long, env = "DOMAIN")]
    pub allowed_origin: Option<String>,
}

impl Settings {
    /// Parse the process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`Settings::load`] for an explicit argument list.
    pub fn load_from<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Settings::try_parse_from(args).map(Self::resolve)
    }

    /// Reject values clap cannot check on its own, such as an unknown
    /// `--timezone`.
    pub fn validate(&self) -> Result<()> {
        if !TimezoneHandler::validate_timezone(&self.timezone) {
            return Err(PayError::Config(format!(
                "unknown timezone \"{}\" (expected an IANA name such as America/Chicago)",
                self.timezone
            )));
        }
        Ok(())
    }

    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

impl AnalyzeArgs {
    /// `true` when an explicit `--from`/`--to` range was given.
    pub fn has_custom_range(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }
}

impl RelayArgs {
    /// `host:port` string to bind the listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
