//! CSV ingestion for earnings exports.
//!
//! Turns the raw text of an export into [`WorkItem`]s. Columns are read by
//! position; malformed rows degrade field by field instead of failing the
//! whole file.

use std::path::Path;
use std::sync::OnceLock;

use pay_core::error::{PayError, Result};
use pay_core::models::{WorkDuration, WorkItem};
use pay_core::time_utils::TimezoneHandler;
use regex::Regex;
use tracing::{debug, info};

/// Number of positional columns in an export row.
pub const EXPECTED_COLUMNS: usize = 8;

const COL_WORK_DATE: usize = 0;
const COL_ITEM_ID: usize = 1;
const COL_DURATION: usize = 2;
const COL_RATE: usize = 3;
const COL_PAYOUT: usize = 4;
const COL_PAY_TYPE: usize = 5;
const COL_PROJECT: usize = 6;
const COL_STATUS: usize = 7;

// ── Public API ────────────────────────────────────────────────────────────────

/// Parse export text into work items, in row order.
///
/// The first line is a header and is dropped, as are whitespace-only lines.
/// Rows with missing columns yield empty text fields and zero amounts.
pub fn parse_csv(content: &str, tz: &TimezoneHandler) -> Vec<WorkItem> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let items: Vec<WorkItem> = content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_row(line, tz))
        .collect();

    info!("Parsed {} work items", items.len());
    items
}

/// Read an export from disk and parse it.
///
/// Only files with a `.csv` extension are accepted.
pub fn load_csv_file(path: &Path, tz: &TimezoneHandler) -> Result<Vec<WorkItem>> {
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if !is_csv {
        return Err(PayError::InvalidFileType(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| PayError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Loaded {} bytes from {}", content.len(), path.display());
    Ok(parse_csv(&content, tz))
}

/// Split one CSV line on commas, keeping quoted sections intact.
///
/// Every field is trimmed and loses its surrounding quotes; a doubled quote
/// inside a quoted field becomes a single quote.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::with_capacity(EXPECTED_COLUMNS);
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                fields.push(clean_field(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(clean_field(&current));
    fields
}

/// Parse a duration such as `"1h 30m 0s"`. Missing units count as zero.
pub fn parse_duration(raw: &str) -> WorkDuration {
    let (mut hours, mut minutes, mut seconds) = (0, 0, 0);

    for cap in duration_regex().captures_iter(raw) {
        let Ok(value) = cap[1].parse::<u64>() else {
            debug!("Duration part out of range in \"{}\"", raw);
            continue;
        };
        match &cap[2] {
            "h" => hours = value,
            "m" => minutes = value,
            _ => seconds = value,
        }
    }

    WorkDuration::checked_new(hours, minutes, seconds).unwrap_or_else(|| {
        debug!("Duration \"{}\" overflows; treating as zero", raw);
        WorkDuration::default()
    })
}

/// Parse an hourly rate such as `"$12.50/hr"`.
pub fn parse_rate(raw: &str) -> f64 {
    let trimmed = raw.trim();
    parse_amount(trimmed.strip_suffix("/hr").unwrap_or(trimmed))
}

/// Parse a payout such as `"$10.00"` or `"-$2.50"`.
pub fn parse_payout(raw: &str) -> f64 {
    parse_amount(raw)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn parse_row(line: &str, tz: &TimezoneHandler) -> WorkItem {
    let fields = split_csv_line(line);
    if fields.len() < EXPECTED_COLUMNS {
        debug!(
            "Row has {} of {} columns: {}",
            fields.len(),
            EXPECTED_COLUMNS,
            line
        );
    }
    let field = |idx: usize| fields.get(idx).map(String::as_str).unwrap_or("");

    WorkItem {
        work_date: tz.parse_timestamp(field(COL_WORK_DATE)),
        item_id: field(COL_ITEM_ID).to_string(),
        duration: parse_duration(field(COL_DURATION)),
        rate_applied: parse_rate(field(COL_RATE)),
        payout: parse_payout(field(COL_PAYOUT)),
        pay_type: field(COL_PAY_TYPE).to_string(),
        project_name: field(COL_PROJECT).to_string(),
        status: field(COL_STATUS).to_string(),
    }
}

fn clean_field(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => trimmed.to_string(),
    }
}

/// Strip the first `$` and any thousands separators, then parse.
fn parse_amount(raw: &str) -> f64 {
    let cleaned = raw.trim().replacen('$', "", 1).replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse::<f64>().unwrap_or_else(|_| {
        debug!("Unparseable amount \"{}\", using 0", raw);
        0.0
    })
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*([hms])").expect("regex is valid"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
