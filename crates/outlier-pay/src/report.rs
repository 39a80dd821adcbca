//! Terminal and JSON rendering of an [`AnalysisResult`].

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use pay_core::currency::Currency;
use pay_core::formatting::{format_hours, format_minutes, percentage};
use pay_data::analysis::AnalysisResult;
use serde::Serialize;

const LABEL_WIDTH: usize = 18;
const RANGE_FORMAT: &str = "%Y-%m-%d %H:%M %Z";

/// Machine-readable report: the analysis plus the display currency.
/// Money amounts in `analysis` are already in `currency`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport<'a> {
    pub currency: &'a Currency,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}

pub fn render_json(result: &AnalysisResult, currency: &Currency) -> anyhow::Result<String> {
    let report = JsonReport {
        currency,
        analysis: result.converted(currency),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Plain-text report with headline totals, the per-project table, the
/// daily series and the pay-type and status breakdowns.
pub fn render_text(result: &AnalysisResult, currency: &Currency, tz: Tz) -> String {
    let stats = &result.stats;
    let money = |amount: f64| currency.format_amount(amount);
    let mut out = String::new();

    let range = match result.range {
        Some(r) => format!("{} .. {}", local(r.start, tz), local(r.end, tz)),
        None => "no dated items".to_string(),
    };
    line(&mut out, "Range", &range);
    line(
        &mut out,
        "Items",
        &format!("{} of {}", result.items_in_range, result.items_total),
    );
    if currency.code != pay_core::currency::BASE_CURRENCY {
        line(
            &mut out,
            "Currency",
            &format!("{} ({}), 1 USD = {}", currency.code, currency.name, currency.rate),
        );
    }
    out.push('\n');

    line(&mut out, "Total Earnings", &money(stats.total_earnings));
    line(&mut out, "Total Hours", &format_hours(stats.total_hours));
    line(&mut out, "Avg Hourly", &money(stats.average_hourly_rate));
    line(
        &mut out,
        "Avg w/ Rewards",
        &money(stats.average_hourly_rate_with_rewards),
    );
    line(&mut out, "Mission Rewards", &money(stats.mission_rewards));

    let projects = stats.projects_by_hours();
    if !projects.is_empty() {
        let name_width = projects
            .iter()
            .map(|(name, _)| name.chars().count())
            .max()
            .unwrap_or(0)
            .max("Project".len());

        out.push_str("\nProjects\n");
        let _ = writeln!(
            out,
            "  {:<name_width$}  {:>14}  {:>9}  {:>6}  {:>9}  {:>10}  {:>20}",
            "Project", "Earnings", "Hours", "Tasks", "Avg/Task", "Rate", "Overtime"
        );
        for (name, project) in projects {
            let overtime = format!(
                "{} ({:.1}%)",
                money(project.overtime_pay),
                project.overtime_percentage()
            );
            let _ = writeln!(
                out,
                "  {:<name_width$}  {:>14}  {:>9}  {:>6}  {:>9}  {:>10}  {:>20}",
                name,
                money(project.total_earnings),
                format_hours(project.total_hours),
                project.item_count,
                format_minutes(project.average_minutes_per_item()),
                money(project.average_rate),
                overtime,
            );
        }
    }

    if !result.daily.is_empty() {
        out.push_str("\nDaily\n");
        let _ = writeln!(
            out,
            "  {:<10}  {:>14}  {:>14}  {:>9}",
            "Date", "Earnings", "Overtime", "Hours"
        );
        for (date, day) in &result.daily {
            let _ = writeln!(
                out,
                "  {:<10}  {:>14}  {:>14}  {:>9}",
                date.format("%Y-%m-%d").to_string(),
                money(day.earnings),
                money(day.overtime),
                format_hours(day.hours),
            );
        }
    }

    distribution(&mut out, "Pay Types", &stats.pay_type_distribution);
    distribution(&mut out, "Statuses", &stats.status_distribution);
    out
}

fn line(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{:<width$}{}", label, value, width = LABEL_WIDTH);
}

fn local(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format(RANGE_FORMAT).to_string()
}

fn distribution(out: &mut String, title: &str, counts: &BTreeMap<String, u32>) {
    if counts.is_empty() {
        return;
    }
    let total: u32 = counts.values().sum();
    let width = counts.keys().map(|k| k.chars().count()).max().unwrap_or(0);

    let _ = writeln!(out, "\n{}", title);
    for (key, count) in counts {
        let share = percentage(f64::from(*count), f64::from(total), 1);
        let _ = writeln!(out, "  {:<width$}  {:>6}  {:>5.1}%", key, count, share);
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
