use chrono::{DateTime, Local};

/// Significant digits shown for scalar values in the tooltip.
pub const VALUE_PRECISION: usize = 4;

fn non_finite(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_sign_positive() {
        "Inf".to_string()
    } else {
        "-Inf".to_string()
    }
}

/// Format a scalar with [`VALUE_PRECISION`] significant digits. Magnitudes
/// of at least `1e4` or below `1e-2` use exponent notation with a
/// [`VALUE_PRECISION`]-decimal mantissa, trailing zeroes trimmed.
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    let abs = value.abs();
    if abs < 1e-15 {
        return "0".to_string();
    }
    if abs >= 1e4 || abs < 1e-2 {
        return format_exponent(value, VALUE_PRECISION);
    }
    format_significant(value, VALUE_PRECISION)
}

/// Format a step count with an SI suffix (`12.35k`, `2M`).
pub fn format_step(step: f64) -> String {
    if !step.is_finite() {
        return non_finite(step);
    }
    const SUFFIXES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "G"), (1e6, "M"), (1e3, "k")];
    let abs = step.abs();
    for (scale, suffix) in SUFFIXES {
        if abs >= scale {
            return format!("{}{suffix}", format_significant(step / scale, VALUE_PRECISION));
        }
    }
    format_significant(step, VALUE_PRECISION)
}

/// Format a wall time (seconds since the epoch) in local time.
pub fn format_wall_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return non_finite(seconds);
    }
    let secs = seconds.floor();
    let nanos = ((seconds - secs) * 1e9) as u32;
    match DateTime::from_timestamp(secs as i64, nanos) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => non_finite(f64::NAN),
    }
}

/// Format a duration in seconds using its two most significant units,
/// e.g. `1d 3h`, `2h 5m`, `4m 10s`, `42.5s`.
pub fn format_relative(seconds: f64) -> String {
    if !seconds.is_finite() {
        return non_finite(seconds);
    }
    let sign = if seconds < 0.0 { "-" } else { "" };
    let mut rest = seconds.abs();
    let days = (rest / 86_400.0).floor();
    rest -= days * 86_400.0;
    let hours = (rest / 3_600.0).floor();
    rest -= hours * 3_600.0;
    let minutes = (rest / 60.0).floor();
    rest -= minutes * 60.0;

    let body = if days > 0.0 {
        format!("{days}d {hours}h")
    } else if hours > 0.0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0.0 {
        format!("{minutes}m {}s", rest.floor())
    } else {
        format!("{}s", trim_trailing_zeroes(format!("{rest:.1}")))
    };
    format!("{sign}{body}")
}

fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits as i32 - 1 - magnitude).max(0) as usize;
    trim_trailing_zeroes(format!("{value:.decimals$}"))
}

fn format_exponent(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$e}");
    let (mantissa, exponent) = formatted
        .split_once('e')
        .unwrap_or((formatted.as_str(), "0"));
    let mantissa = trim_trailing_zeroes(mantissa.to_string());
    if exponent.starts_with('-') {
        format!("{mantissa}e{exponent}")
    } else {
        format!("{mantissa}e+{exponent}")
    }
}

fn trim_trailing_zeroes(mut s: String) -> String {
    if let Some(dot) = s.find('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.len() == dot + 1 {
            s.pop();
        }
    }
    s
}
