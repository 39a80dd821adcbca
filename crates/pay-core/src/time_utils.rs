use chrono::{
    DateTime, Datelike, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ── Pay cycle ─────────────────────────────────────────────────────────────────

/// Offset of the pay-cycle reference zone ("Central", UTC−6), in seconds west of UTC.
pub const PAY_CYCLE_UTC_OFFSET_WEST_SECS: i32 = 6 * 3600;

/// Local hour (in the reference zone) at which every cycle starts on Monday.
pub const PAY_CYCLE_START_HOUR: u32 = 19;

/// Length of one pay cycle.
pub const PAY_CYCLE_DAYS: i64 = 7;

/// The fixed reference zone pay cycles are evaluated in.
pub fn pay_cycle_offset() -> FixedOffset {
    FixedOffset::west_opt(PAY_CYCLE_UTC_OFFSET_WEST_SECS).unwrap_or_else(|| Utc.fix())
}

/// One weekly earnings period, both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayCycle {
    /// Monday 19:00:00.000 in the reference zone.
    pub start: DateTime<Utc>,
    /// The following Monday 18:59:59.999 in the reference zone.
    pub end: DateTime<Utc>,
}

impl PayCycle {
    /// The cycle immediately before this one.
    pub fn previous(&self) -> PayCycle {
        let shift = Duration::days(PAY_CYCLE_DAYS);
        PayCycle {
            start: self.start - shift,
            end: self.end - shift,
        }
    }

    /// `true` when `ts` falls inside the cycle, bounds included.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// The pay cycle in progress at `now`.
///
/// Walks back to the most recent Monday 19:00 in the reference zone. On a
/// Monday before 19:00 that is the previous week's Monday, so the instant
/// Monday 19:00:00.000 is the first instant of a new cycle.
pub fn current_pay_cycle_at(now: DateTime<Utc>) -> PayCycle {
    let offset = pay_cycle_offset();
    let local = now.with_timezone(&offset).naive_local();

    let days_since_monday = i64::from(local.weekday().num_days_from_monday());
    let monday = local.date() - Duration::days(days_since_monday);
    let mut start_local = monday.and_time(cycle_start_time());
    if local < start_local {
        start_local -= Duration::days(PAY_CYCLE_DAYS);
    }

    let start = local_to_utc(start_local, offset);
    let end = start + Duration::days(PAY_CYCLE_DAYS) - Duration::milliseconds(1);
    PayCycle { start, end }
}

/// The pay cycle in progress right now.
pub fn current_pay_cycle() -> PayCycle {
    current_pay_cycle_at(Utc::now())
}

fn cycle_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(PAY_CYCLE_START_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn local_to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, Utc)
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Offset-less date-time layouts accepted in earnings exports.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%b %d, %Y %I:%M:%S %p",
    "%b %d, %Y %I:%M %p",
    "%B %d, %Y %I:%M:%S %p",
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
];

/// Date-only layouts; these resolve to local midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y"];

/// Parses export timestamps, interpreting offset-less values in a default zone.
#[derive(Debug, Clone)]
pub struct TimezoneHandler {
    default_tz: Tz,
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self { default_tz: Tz::UTC }
    }
}

impl TimezoneHandler {
    /// Create a handler with the given IANA timezone name as the default.
    ///
    /// If `tz_name` is not a recognised IANA timezone, falls back to UTC
    /// and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { default_tz: tz }
    }

    /// Parse a timestamp string into a UTC [`DateTime`].
    ///
    /// Accepts RFC 3339 / RFC 2822 values with an explicit offset, plus a
    /// set of common offset-less date-time and date-only layouts which are
    /// read in the handler's default zone. Returns `None` for empty or
    /// unrecognised input.
    pub fn parse_timestamp(&self, s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let normalised = match s.strip_suffix('Z') {
            Some(stripped) => format!("{}+00:00", stripped),
            None => s.to_string(),
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&Utc));
        }

        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                if let Some(dt) = self.localize(naive) {
                    return Some(dt);
                }
            }
        }

        if let Some(date) = self.parse_date(s) {
            return self.start_of_day(date);
        }

        debug!("TimezoneHandler: could not parse timestamp \"{}\"", s);
        None
    }

    /// Parse a date-only value in any of the accepted date layouts.
    pub fn parse_date(&self, s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    }

    /// First instant of `date` in the default zone. If a DST jump skips
    /// local midnight, the first hour that exists.
    pub fn start_of_day(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        (0..24).find_map(|hour| self.localize(date.and_hms_opt(hour, 0, 0)?))
    }

    /// Last millisecond of `date` in the default zone: the next day's
    /// start minus 1 ms, so 23- and 25-hour days are covered exactly.
    pub fn end_of_day(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let next = self.start_of_day(date.succ_opt()?)?;
        Some(next - Duration::milliseconds(1))
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    /// Expose the configured default timezone.
    pub fn default_tz(&self) -> Tz {
        self.default_tz
    }

    /// Attach the default zone to a wall-clock time. Ambiguous times (DST
    /// fall-back) take the earlier instant; skipped times yield `None`.
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.default_tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
            LocalResult::None => None,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
