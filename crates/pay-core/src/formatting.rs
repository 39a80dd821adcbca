//! Number rendering shared by the currency display and the text report.

/// Render `value` with comma thousands separators and exactly `decimals`
/// fractional digits. Non-finite input renders as `"-"`.
///
/// ```
/// use pay_core::formatting::format_number;
///
/// assert_eq!(format_number(2_480.5, 2), "2,480.50");
/// assert_eq!(format_number(1_000_000.0, 0), "1,000,000");
/// assert_eq!(format_number(-312.25, 1), "-312.3");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }

    // Half-ULP nudge so payouts like 1.005 round up instead of down.
    let scale = 10_f64.powi(decimals as i32);
    let magnitude = value.abs();
    let rounded = (magnitude * scale + f64::EPSILON * magnitude * scale).round() / scale;

    let fixed = format!("{:.*}", decimals as usize, rounded);
    let (whole, fraction) = match fixed.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + whole.len() / 3 + 1);
    if value < 0.0 && rounded > 0.0 {
        out.push('-');
    }
    out.push_str(&with_separators(whole));
    if let Some(f) = fraction {
        out.push('.');
        out.push_str(f);
    }
    out
}

/// Format fractional hours with one decimal and an `h` suffix.
///
/// ```
/// use pay_core::formatting::format_hours;
///
/// assert_eq!(format_hours(12.345), "12.3h");
/// assert_eq!(format_hours(0.0), "0.0h");
/// ```
pub fn format_hours(hours: f64) -> String {
    format!("{}h", format_number(hours, 1))
}

/// Whole minutes with an `m` suffix.
pub fn format_minutes(minutes: f64) -> String {
    format!("{}m", format_number(minutes.round(), 0))
}

/// `part` as a percentage of `whole`, rounded to `decimal_places`.
/// A zero `whole` yields `0.0`.
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let scale = 10_f64.powi(decimal_places as i32);
    (part / whole * 100.0 * scale).round() / scale
}

fn with_separators(digits: &str) -> String {
    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(bytes.len() + bytes.len() / 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(char::from(*b));
    }
    out
}
