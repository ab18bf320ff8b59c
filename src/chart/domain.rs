use super::axis::Domain;

/// Fallback y domain when there is nothing finite to show.
pub const EMPTY_DOMAIN: Domain = Domain {
    min: -0.1,
    max: 1.1,
};

/// Quantile of an ascending slice with linear interpolation (`p` in [0, 1]).
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (h - lo as f64))
}

/// Padded y domain for `values`.
///
/// Non-finite values are skipped. With `ignore_outliers` the 5th..95th
/// percentile range is used instead of min..max. Zero is kept in view when
/// doing so costs less than the data's own span.
pub fn compute_domain(values: impl IntoIterator<Item = f64>, ignore_outliers: bool) -> Domain {
    let mut finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return EMPTY_DOMAIN;
    }
    finite.sort_by(f64::total_cmp);

    let (a, b) = if ignore_outliers {
        (
            quantile(&finite, 0.05).unwrap_or(finite[0]),
            quantile(&finite, 0.95).unwrap_or(finite[finite.len() - 1]),
        )
    } else {
        (finite[0], finite[finite.len() - 1])
    };

    let span = b - a;
    let padding = if span == 0.0 {
        a.abs() * 1.1 + 1.1
    } else {
        span * 0.2
    };

    if a >= 0.0 && a < span {
        Domain::new(-0.1 * b, b + padding)
    } else {
        Domain::new(a - padding, b + padding)
    }
}

/// Plain min..max of the finite values, widened when degenerate.
pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<Domain> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return None;
    }
    if (max - min).abs() < 1e-9 {
        return Some(Domain::new(min - 0.5, max + 0.5));
    }
    Some(Domain::new(min, max))
}
