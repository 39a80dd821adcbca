//! Range selection and the parse → filter → aggregate pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use pay_core::currency::Currency;
use pay_core::models::{DailyStats, DashboardStats, WorkItem};
use pay_core::time_utils::{current_pay_cycle_at, PayCycle};
use serde::{Deserialize, Serialize};

use crate::aggregator::{calculate_stats, daily_breakdown};

// ── Public types ──────────────────────────────────────────────────────────────

/// Which slice of the export a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelection {
    /// The pay cycle in progress.
    Current,
    /// The pay cycle before the one in progress.
    Previous,
    /// Earliest to latest valid item date.
    Lifetime,
    /// Explicit inclusive bounds.
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Inclusive instant range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<PayCycle> for DateRange {
    fn from(cycle: PayCycle) -> Self {
        Self {
            start: cycle.start,
            end: cycle.end,
        }
    }
}

/// The output of [`analyze`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Resolved bounds, or `None` for a lifetime view of an export with no
    /// valid dates.
    pub range: Option<DateRange>,
    /// Items inside the range.
    pub items_in_range: usize,
    /// Items in the whole export.
    pub items_total: usize,
    pub stats: DashboardStats,
    /// Per-day series over the items in range, gaps filled.
    pub daily: BTreeMap<NaiveDate, DailyStats>,
}

impl AnalysisResult {
    /// Copy with every money amount converted into `currency`.
    pub fn converted(&self, currency: &Currency) -> Self {
        Self {
            range: self.range,
            items_in_range: self.items_in_range,
            items_total: self.items_total,
            stats: self.stats.scaled(currency.rate),
            daily: self
                .daily
                .iter()
                .map(|(date, day)| (*date, day.scaled(currency.rate)))
                .collect(),
        }
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Keep the items dated within `[start, end]`, both ends inclusive.
///
/// Items with an invalid date never match.
pub fn filter_items_by_date_range(
    items: &[WorkItem],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<WorkItem> {
    items
        .iter()
        .filter(|item| matches!(item.work_date, Some(d) if d >= start && d <= end))
        .cloned()
        .collect()
}

/// Earliest and latest valid item dates.
pub fn lifetime_range(items: &[WorkItem]) -> Option<DateRange> {
    let mut dates = items.iter().filter_map(|item| item.work_date);
    let first = dates.next()?;
    let (start, end) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some(DateRange { start, end })
}

/// Resolve a selection into concrete bounds as of `now`.
pub fn resolve_range(
    selection: RangeSelection,
    items: &[WorkItem],
    now: DateTime<Utc>,
) -> Option<DateRange> {
    match selection {
        RangeSelection::Current => Some(current_pay_cycle_at(now).into()),
        RangeSelection::Previous => Some(current_pay_cycle_at(now).previous().into()),
        RangeSelection::Lifetime => lifetime_range(items),
        RangeSelection::Custom { start, end } => Some(DateRange { start, end }),
    }
}

/// Run the pipeline over an already-parsed export.
///
/// 1. Resolve `selection` against `now`.
/// 2. Filter the items to the resolved range.
/// 3. Aggregate the survivors, and bucket them per local day in `tz`.
///
/// A lifetime view with no valid dates aggregates nothing.
pub fn analyze(
    items: &[WorkItem],
    selection: RangeSelection,
    now: DateTime<Utc>,
    tz: Tz,
) -> AnalysisResult {
    let range = resolve_range(selection, items, now);

    let in_range = match range {
        Some(r) => filter_items_by_date_range(items, r.start, r.end),
        None => Vec::new(),
    };
    let stats = calculate_stats(&in_range);
    let daily = daily_breakdown(&in_range, tz);

    tracing::info!(
        selection = ?selection,
        items_total = items.len(),
        items_in_range = in_range.len(),
        "analysis complete"
    );

    AnalysisResult {
        range,
        items_in_range: in_range.len(),
        items_total: items.len(),
        stats,
        daily,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
