mod bootstrap;
mod report;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Utc;
use pay_core::currency::{find_currency, Currency, BASE_CURRENCY};
use pay_core::settings::{AnalyzeArgs, Command, CurrenciesArgs, RelayArgs, Settings};
use pay_core::time_utils::TimezoneHandler;
use pay_data::analysis::{analyze, RangeSelection};
use pay_data::reader::load_csv_file;
use pay_runtime::rates::{fetch_currencies, HttpRateSource, RateCache, RateSource};
use pay_runtime::relay::{self, HttpWebhookClient, RelayState};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();
    settings.validate()?;

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("outlier-pay v{} starting", env!("CARGO_PKG_VERSION"));

    let rates = SharedRateCache::default();

    match &settings.command {
        Command::Analyze(args) => run_analyze(args, &settings.timezone, &rates).await,
        Command::Currencies(args) => run_currencies(args, &rates).await,
        Command::Relay(args) => run_relay(args).await,
    }
}

/// Process-wide exchange-rate cache shared by every currency lookup.
type SharedRateCache = Arc<Mutex<RateCache>>;

async fn run_analyze(args: &AnalyzeArgs, timezone: &str, rates: &SharedRateCache) -> Result<()> {
    bootstrap::ensure_input_file(&args.file)?;

    let tz = TimezoneHandler::new(timezone);
    let items = load_csv_file(&args.file, &tz)?;
    let selection = range_selection(args, &tz)?;

    let currency = if args.offline {
        if !args.currency.eq_ignore_ascii_case(BASE_CURRENCY) {
            tracing::warn!(
                "--offline given; reporting in {} instead of {}",
                BASE_CURRENCY,
                args.currency
            );
        }
        Currency::usd()
    } else {
        let source = Arc::new(HttpRateSource::new(args.rates_url.clone()));
        let currencies = load_currencies(rates, source).await?;
        find_currency(&currencies, &args.currency)
    };

    let result = analyze(&items, selection, Utc::now(), tz.default_tz());

    let output = match args.format.as_str() {
        "json" => report::render_json(&result, &currency)?,
        _ => report::render_text(&result, &currency, tz.default_tz()),
    };
    println!("{}", output);
    Ok(())
}

async fn run_currencies(args: &CurrenciesArgs, rates: &SharedRateCache) -> Result<()> {
    let source = Arc::new(HttpRateSource::new(args.rates_url.clone()));
    for currency in load_currencies(rates, source).await? {
        println!(
            "{:<4} {:<4} {:<22} {:>12.4}",
            currency.code, currency.symbol, currency.name, currency.rate
        );
    }
    Ok(())
}

async fn run_relay(args: &RelayArgs) -> Result<()> {
    let addr: SocketAddr = args
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid bind address {}", args.bind_addr()))?;

    let state = RelayState::new(
        args.webhook_url.clone(),
        args.allowed_origin.clone(),
        Arc::new(HttpWebhookClient::new()),
    );

    relay::serve(addr, state).await
}

/// Fetch the currency list on the blocking pool, through the shared cache.
async fn load_currencies(
    rates: &SharedRateCache,
    source: Arc<dyn RateSource + Send + Sync>,
) -> Result<Vec<Currency>> {
    let cache = Arc::clone(rates);
    tokio::task::spawn_blocking(move || {
        let mut cache = cache
            .lock()
            .map_err(|_| anyhow::anyhow!("exchange-rate cache lock poisoned"))?;
        Ok::<_, anyhow::Error>(fetch_currencies(&mut cache, source.as_ref()))
    })
    .await?
}

/// Turn the `--range`/`--from`/`--to` flags into a [`RangeSelection`].
///
/// A date-only `--to` covers that whole day.
fn range_selection(args: &AnalyzeArgs, tz: &TimezoneHandler) -> Result<RangeSelection> {
    if let (Some(from), Some(to)) = (args.from.as_deref(), args.to.as_deref()) {
        let start = tz
            .parse_timestamp(from)
            .with_context(|| format!("unrecognised --from date: {}", from))?;
        let end = match tz.parse_date(to) {
            Some(date) => tz.end_of_day(date),
            None => tz.parse_timestamp(to),
        }
        .with_context(|| format!("unrecognised --to date: {}", to))?;
        if end < start {
            anyhow::bail!("--to ({}) is before --from ({})", to, from);
        }
        return Ok(RangeSelection::Custom { start, end });
    }

    Ok(match args.range.as_str() {
        "previous" => RangeSelection::Previous,
        "lifetime" => RangeSelection::Lifetime,
        _ => RangeSelection::Current,
    })
}
