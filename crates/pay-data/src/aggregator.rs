//! Earnings aggregation over a set of work items.
//!
//! One pass accumulates totals, per-project stats and the pay-type/status
//! distributions; a second pass over the projects derives average rates.
//! [`daily_breakdown`] produces the per-day series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use pay_core::models::{DailyStats, DashboardStats, ProjectStats, WorkItem};

/// Divisor used for rates: the value itself, or `1.0` when it is zero.
fn divisor_or_one(value: f64) -> f64 {
    if value == 0.0 {
        1.0
    } else {
        value
    }
}

// ── StatsAccumulator ──────────────────────────────────────────────────────────

/// Running totals for one aggregation pass.
#[derive(Debug, Default)]
struct StatsAccumulator {
    /// Payout of regular (non-reward) items only.
    earnings: f64,
    seconds: u64,
    mission_rewards: f64,
    stats: DashboardStats,
}

impl StatsAccumulator {
    fn add_item(&mut self, item: &WorkItem) {
        if item.is_mission_reward() {
            self.mission_rewards += item.payout;
            *self
                .stats
                .pay_type_distribution
                .entry(item.pay_type.clone())
                .or_default() += 1;
            return;
        }

        self.earnings += item.payout;
        self.seconds = self.seconds.saturating_add(item.duration.total_seconds);

        let project = self
            .stats
            .project_stats
            .entry(item.project_name.clone())
            .or_default();
        project.total_earnings += item.payout;
        project.total_hours += item.duration.as_hours();
        project.item_count += 1;
        if item.is_overtime() {
            project.overtime_pay += item.payout;
        }

        *self
            .stats
            .pay_type_distribution
            .entry(item.pay_type.clone())
            .or_default() += 1;
        *self
            .stats
            .status_distribution
            .entry(item.status.clone())
            .or_default() += 1;
    }

    fn finish(mut self) -> DashboardStats {
        for project in self.stats.project_stats.values_mut() {
            project.average_rate = project.regular_earnings() / divisor_or_one(project.total_hours);
        }

        let total_hours = self.seconds as f64 / 3600.0;
        let regular_earnings: f64 = self
            .stats
            .project_stats
            .values()
            .map(ProjectStats::regular_earnings)
            .sum();
        let hours_divisor = divisor_or_one(total_hours);

        self.stats.total_hours = total_hours;
        self.stats.average_hourly_rate = regular_earnings / hours_divisor;
        self.stats.average_hourly_rate_with_rewards =
            (regular_earnings + self.mission_rewards) / hours_divisor;
        self.stats.mission_rewards = self.mission_rewards;
        self.stats.total_earnings = self.earnings + self.mission_rewards;
        self.stats
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Aggregate `items` into a [`DashboardStats`] summary.
///
/// Mission rewards count towards total earnings and the rewards-inclusive
/// rate only; they add no hours and join no project. Overtime payouts count
/// towards project earnings but not towards the regular rate base. Zero
/// hours are treated as a divisor of one, so an empty slice yields zeros.
pub fn calculate_stats(items: &[WorkItem]) -> DashboardStats {
    let mut acc = StatsAccumulator::default();
    for item in items {
        acc.add_item(item);
    }
    let stats = acc.finish();

    tracing::debug!(
        items = items.len(),
        projects = stats.project_stats.len(),
        total_earnings = stats.total_earnings,
        "calculated stats"
    );
    stats
}

/// Per-day earnings, overtime and hours of the regular items, keyed by the
/// local date in `tz`.
///
/// Every day between the first and last dated item is present, so quiet
/// days show up as zeros. Mission rewards and undated items are left out.
pub fn daily_breakdown(items: &[WorkItem], tz: Tz) -> BTreeMap<NaiveDate, DailyStats> {
    let mut days: BTreeMap<NaiveDate, DailyStats> = BTreeMap::new();

    for item in items.iter().filter(|item| !item.is_mission_reward()) {
        let Some(work_date) = item.work_date else {
            continue;
        };
        let day = days
            .entry(work_date.with_timezone(&tz).date_naive())
            .or_default();
        if item.is_overtime() {
            day.overtime += item.payout;
        } else {
            day.earnings += item.payout;
        }
        day.hours += item.duration.as_hours();
    }

    let bounds = days
        .keys()
        .next()
        .copied()
        .zip(days.keys().next_back().copied());
    if let Some((first, last)) = bounds {
        for date in first.iter_days().take_while(|d| *d <= last) {
            days.entry(date).or_default();
        }
    }
    days
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse_csv;
    use chrono::{TimeZone, Utc};
    use pay_core::models::{WorkDuration, MISSION_REWARD, OVERTIME_PAY};
    use pay_core::time_utils::TimezoneHandler;

    fn make_item(project: &str, pay_type: &str, payout: f64, minutes: u64) -> WorkItem {
        WorkItem {
            work_date: Some(Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()),
            item_id: format!("{project}-{pay_type}-{minutes}"),
            duration: WorkDuration::new(minutes / 60, minutes % 60, 0),
            rate_applied: 20.0,
            payout,
            pay_type: pay_type.to_string(),
            project_name: project.to_string(),
            status: "approved".to_string(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mixed_regular_and_reward_scenario() {
        let csv = "workDate,itemID,duration,rateApplied,payout,payType,projectName,status\n\
                   2024-01-01,1,1h 0m 0s,$10/hr,$10.00,regularPay,ProjA,approved\n\
                   2024-01-01,2,0h 30m 0s,$10/hr,$5.00,missionReward,ProjA,approved";
        let items = parse_csv(csv, &TimezoneHandler::new("UTC"));
        let stats = calculate_stats(&items);

        assert!(close(stats.total_earnings, 15.0));
        assert!(close(stats.total_hours, 1.0));
        assert!(close(stats.mission_rewards, 5.0));
        assert_eq!(stats.project_stats["ProjA"].item_count, 1);
        assert_eq!(stats.pay_type_distribution.len(), 2);
        assert_eq!(stats.pay_type_distribution["regularPay"], 1);
        assert_eq!(stats.pay_type_distribution["missionReward"], 1);
        assert!(close(stats.average_hourly_rate, 10.0));
        assert!(close(stats.average_hourly_rate_with_rewards, 15.0));
        // Rewards are not counted in the status distribution.
        assert_eq!(stats.status_distribution["approved"], 1);
    }

    #[test]
    fn test_empty_input_is_zeroed() {
        let stats = calculate_stats(&[]);
        assert_eq!(stats.total_hours, 0.0);
        assert_eq!(stats.total_earnings, 0.0);
        assert_eq!(stats.average_hourly_rate, 0.0);
        assert_eq!(stats.average_hourly_rate_with_rewards, 0.0);
        assert!(!stats.average_hourly_rate.is_nan());
        assert!(stats.project_stats.is_empty());
        assert!(stats.pay_type_distribution.is_empty());
    }

    #[test]
    fn test_overtime_excluded_from_rate_base() {
        let items = vec![
            make_item("P", "regularPay", 40.0, 120),
            make_item("P", OVERTIME_PAY, 30.0, 60),
        ];
        let stats = calculate_stats(&items);
        let project = &stats.project_stats["P"];

        assert!(close(project.total_earnings, 70.0));
        assert!(close(project.overtime_pay, 30.0));
        assert!(close(project.total_hours, 3.0));
        assert_eq!(project.item_count, 2);
        assert!(close(project.average_rate, 40.0 / 3.0));
        assert!(close(stats.average_hourly_rate, 40.0 / 3.0));
        assert!(close(stats.total_earnings, 70.0));
    }

    #[test]
    fn test_zero_hour_project_uses_divisor_one() {
        let items = vec![make_item("Bonus", "adjustment", 12.0, 0)];
        let stats = calculate_stats(&items);

        assert!(close(stats.project_stats["Bonus"].average_rate, 12.0));
        assert!(close(stats.average_hourly_rate, 12.0));
        assert_eq!(stats.total_hours, 0.0);
    }

    #[test]
    fn test_rewards_only() {
        let items = vec![
            make_item("P", MISSION_REWARD, 5.0, 30),
            make_item("Q", MISSION_REWARD, 7.5, 30),
        ];
        let stats = calculate_stats(&items);

        assert!(stats.project_stats.is_empty());
        assert!(stats.status_distribution.is_empty());
        assert_eq!(stats.pay_type_distribution[MISSION_REWARD], 2);
        assert!(close(stats.total_earnings, 12.5));
        assert!(close(stats.mission_rewards, 12.5));
        assert_eq!(stats.total_hours, 0.0);
        assert!(close(stats.average_hourly_rate_with_rewards, 12.5));
    }

    #[test]
    fn test_total_earnings_equals_sum_of_payouts() {
        let items = vec![
            make_item("A", "regularPay", 10.25, 30),
            make_item("B", OVERTIME_PAY, 3.5, 15),
            make_item("A", MISSION_REWARD, 4.0, 0),
            make_item("C", "regularPay", -1.0, 5),
        ];
        let stats = calculate_stats(&items);
        let payout_sum: f64 = items.iter().map(|i| i.payout).sum();
        let reward_sum: f64 = items
            .iter()
            .filter(|i| i.is_mission_reward())
            .map(|i| i.payout)
            .sum();

        assert!(close(stats.total_earnings, payout_sum));
        assert!(close(stats.mission_rewards, reward_sum));
    }

    #[test]
    fn test_project_item_counts_cover_non_reward_items() {
        let items = vec![
            make_item("A", "regularPay", 1.0, 10),
            make_item("A", "regularPay", 1.0, 10),
            make_item("B", OVERTIME_PAY, 1.0, 10),
            make_item("B", MISSION_REWARD, 1.0, 10),
            make_item("C", "regularPay", 1.0, 10),
        ];
        let stats = calculate_stats(&items);
        let non_reward = items.iter().filter(|i| !i.is_mission_reward()).count() as u32;

        assert_eq!(stats.regular_item_count(), non_reward);
        assert_eq!(stats.project_stats["A"].item_count, 2);
        assert_eq!(stats.project_stats["B"].item_count, 1);
    }

    #[test]
    fn test_rate_with_rewards_not_below_regular_rate() {
        let items = vec![
            make_item("A", "regularPay", 25.0, 90),
            make_item("A", MISSION_REWARD, 10.0, 0),
        ];
        let stats = calculate_stats(&items);
        assert!(stats.average_hourly_rate <= stats.average_hourly_rate_with_rewards);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let items = vec![
            make_item("A", "regularPay", 10.0, 60),
            make_item("B", OVERTIME_PAY, 5.0, 20),
            make_item("A", MISSION_REWARD, 2.0, 0),
        ];
        assert_eq!(calculate_stats(&items), calculate_stats(&items));
    }

    #[test]
    fn test_status_distribution_counts() {
        let mut items = vec![
            make_item("A", "regularPay", 1.0, 10),
            make_item("A", "regularPay", 1.0, 10),
        ];
        items[1].status = "pending".to_string();
        let stats = calculate_stats(&items);
        assert_eq!(stats.status_distribution["approved"], 1);
        assert_eq!(stats.status_distribution["pending"], 1);
    }

    #[test]
    fn test_total_seconds_saturate() {
        let mut huge = make_item("A", "regularPay", 1.0, 0);
        huge.duration = WorkDuration::new(u64::MAX / 3600, 0, 0);
        let stats = calculate_stats(&[huge.clone(), huge]);
        assert!(stats.total_hours.is_finite());
        assert!(close(stats.total_hours, u64::MAX as f64 / 3600.0));
    }

    // ── daily_breakdown ───────────────────────────────────────────────────────

    fn dated(mut item: WorkItem, y: i32, m: u32, d: u32, h: u32) -> WorkItem {
        item.work_date = Some(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap());
        item
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_breakdown_fills_gaps() {
        let items = vec![
            dated(make_item("A", "regularPay", 10.0, 60), 2024, 1, 1, 12),
            dated(make_item("A", OVERTIME_PAY, 4.0, 30), 2024, 1, 1, 15),
            dated(make_item("B", "regularPay", 6.0, 90), 2024, 1, 4, 9),
        ];
        let days = daily_breakdown(&items, Tz::UTC);

        let keys: Vec<NaiveDate> = days.keys().copied().collect();
        assert_eq!(
            keys,
            vec![day(2024, 1, 1), day(2024, 1, 2), day(2024, 1, 3), day(2024, 1, 4)]
        );
        let first = days[&day(2024, 1, 1)];
        assert!(close(first.earnings, 10.0));
        assert!(close(first.overtime, 4.0));
        assert!(close(first.hours, 1.5));
        assert_eq!(days[&day(2024, 1, 2)], DailyStats::default());
        assert!(close(days[&day(2024, 1, 4)].hours, 1.5));
    }

    #[test]
    fn test_daily_breakdown_skips_rewards_and_undated() {
        let mut undated = make_item("A", "regularPay", 99.0, 60);
        undated.work_date = None;
        let items = vec![
            dated(make_item("A", "regularPay", 10.0, 60), 2024, 1, 1, 12),
            dated(make_item("-", MISSION_REWARD, 50.0, 0), 2024, 1, 3, 12),
            undated,
        ];
        let days = daily_breakdown(&items, Tz::UTC);
        assert_eq!(days.len(), 1);
        assert!(close(days[&day(2024, 1, 1)].earnings, 10.0));
    }

    #[test]
    fn test_daily_breakdown_uses_local_date() {
        // 03:00 UTC on Jan 2 is still Jan 1 in Chicago.
        let items = vec![dated(make_item("A", "regularPay", 10.0, 60), 2024, 1, 2, 3)];
        let days = daily_breakdown(&items, chrono_tz::America::Chicago);
        assert!(days.contains_key(&day(2024, 1, 1)));
        assert!(!days.contains_key(&day(2024, 1, 2)));
    }

    #[test]
    fn test_daily_breakdown_empty() {
        assert!(daily_breakdown(&[], Tz::UTC).is_empty());
    }
}
