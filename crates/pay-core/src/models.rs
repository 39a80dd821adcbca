use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pay type of bonus payouts that never count towards hours or project earnings.
pub const MISSION_REWARD: &str = "missionReward";

/// Pay type tracked as a per-project sub-total.
pub const OVERTIME_PAY: &str = "overtimePay";

/// Elapsed time worked on a single item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkDuration {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    /// Always `hours * 3600 + minutes * 60 + seconds`.
    pub total_seconds: u64,
}

impl WorkDuration {
    /// Build a duration from its parts, deriving `total_seconds`.
    ///
    /// `total_seconds` saturates at `u64::MAX`; use [`WorkDuration::checked_new`]
    /// to detect overflow.
    pub fn new(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self::checked_new(hours, minutes, seconds).unwrap_or(Self {
            hours,
            minutes,
            seconds,
            total_seconds: u64::MAX,
        })
    }

    /// Like [`WorkDuration::new`], but `None` when `total_seconds` would
    /// overflow.
    pub fn checked_new(hours: u64, minutes: u64, seconds: u64) -> Option<Self> {
        let total_seconds = hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(seconds)?;
        Some(Self {
            hours,
            minutes,
            seconds,
            total_seconds,
        })
    }

    /// Duration expressed in fractional hours.
    pub fn as_hours(&self) -> f64 {
        self.total_seconds as f64 / 3600.0
    }
}

/// One unit of completed, paid work as read from an earnings export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    /// Timestamp the work was attributed to; `None` when the export held an
    /// unparseable date.
    pub work_date: Option<DateTime<Utc>>,
    /// Opaque identifier. Not guaranteed unique.
    #[serde(rename = "itemID")]
    pub item_id: String,
    pub duration: WorkDuration,
    /// Hourly rate in source currency units. Informational only.
    pub rate_applied: f64,
    /// Signed amount in source currency (USD).
    pub payout: f64,
    pub pay_type: String,
    pub project_name: String,
    pub status: String,
}

impl WorkItem {
    /// `true` for bonus payouts excluded from hours-based statistics.
    pub fn is_mission_reward(&self) -> bool {
        self.pay_type == MISSION_REWARD
    }

    /// `true` for payouts tracked as project overtime.
    pub fn is_overtime(&self) -> bool {
        self.pay_type == OVERTIME_PAY
    }
}

/// Running totals for all regular items of a single project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total_earnings: f64,
    pub total_hours: f64,
    /// `(total_earnings - overtime_pay) / total_hours`, with zero hours
    /// treated as a divisor of one.
    pub average_rate: f64,
    pub item_count: u32,
    pub overtime_pay: f64,
}

impl ProjectStats {
    /// Earnings excluding the overtime sub-total.
    pub fn regular_earnings(&self) -> f64 {
        self.total_earnings - self.overtime_pay
    }

    /// Average minutes spent per item, `0.0` for an empty project.
    pub fn average_minutes_per_item(&self) -> f64 {
        if self.item_count == 0 {
            return 0.0;
        }
        self.total_hours / f64::from(self.item_count) * 60.0
    }

    /// Overtime as a share of the project's earnings, in percent.
    pub fn overtime_percentage(&self) -> f64 {
        if self.total_earnings == 0.0 {
            return 0.0;
        }
        self.overtime_pay / self.total_earnings * 100.0
    }

    /// Copy with every money field multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            total_earnings: self.total_earnings * factor,
            average_rate: self.average_rate * factor,
            overtime_pay: self.overtime_pay * factor,
            ..self.clone()
        }
    }
}

/// Earnings and hours attributed to one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// Payouts other than overtime.
    pub earnings: f64,
    pub overtime: f64,
    pub hours: f64,
}

impl DailyStats {
    /// Copy with the money fields multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            earnings: self.earnings * factor,
            overtime: self.overtime * factor,
            hours: self.hours,
        }
    }
}

/// Summary of one set of work items, as consumed by the report layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Sum of every payout, mission rewards included.
    pub total_earnings: f64,
    /// Hours across all non-reward items.
    pub total_hours: f64,
    pub average_hourly_rate: f64,
    pub average_hourly_rate_with_rewards: f64,
    pub mission_rewards: f64,
    pub project_stats: BTreeMap<String, ProjectStats>,
    pub pay_type_distribution: BTreeMap<String, u32>,
    pub status_distribution: BTreeMap<String, u32>,
}

impl DashboardStats {
    /// Projects ordered by hours worked, busiest first.
    pub fn projects_by_hours(&self) -> Vec<(&str, &ProjectStats)> {
        let mut projects: Vec<(&str, &ProjectStats)> = self
            .project_stats
            .iter()
            .map(|(name, stats)| (name.as_str(), stats))
            .collect();
        projects.sort_by(|a, b| b.1.total_hours.total_cmp(&a.1.total_hours));
        projects
    }

    /// Copy with every money field multiplied by `factor`. Hours and
    /// counts are unchanged.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            total_earnings: self.total_earnings * factor,
            total_hours: self.total_hours,
            average_hourly_rate: self.average_hourly_rate * factor,
            average_hourly_rate_with_rewards: self.average_hourly_rate_with_rewards * factor,
            mission_rewards: self.mission_rewards * factor,
            project_stats: self
                .project_stats
                .iter()
                .map(|(name, p)| (name.clone(), p.scaled(factor)))
                .collect(),
            pay_type_distribution: self.pay_type_distribution.clone(),
            status_distribution: self.status_distribution.clone(),
        }
    }

    /// Number of items counted into project totals.
    pub fn regular_item_count(&self) -> u32 {
        self.project_stats.values().map(|p| p.item_count).sum()
    }
}
