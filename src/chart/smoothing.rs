use crate::data::model::Datum;

// ---------------------------------------------------------------------------
// Moving-average smoothing
// ---------------------------------------------------------------------------

/// Clamped smoothing settings as applied to a chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingConfig {
    pub enabled: bool,
    pub weight: f64,
}

impl SmoothingConfig {
    /// Build a config, clamping `weight` into `[0, 1]`. NaN becomes 0.
    pub fn new(enabled: bool, weight: f64) -> Self {
        let clamped = if weight.is_nan() {
            0.0
        } else {
            weight.clamp(0.0, 1.0)
        };
        if clamped.to_bits() != weight.to_bits() {
            log::warn!("smoothing weight {weight} outside [0, 1], using {clamped}");
        }
        Self {
            enabled,
            weight: clamped,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            weight: 0.6,
        }
    }
}

/// Half-window size for a series of `len` points.
///
/// `1000^w` grows slowly near 0 and quickly near 1, so the slider feels
/// linear to the eye. Weight 0 gives radius 0, weight 1 gives `len / 2`.
pub fn kernel_radius(len: usize, weight: f64) -> usize {
    let factor = (1000f64.powf(weight) - 1.0) / 999.0;
    let radius = (len as f64 * factor / 2.0).floor();
    if radius.is_finite() && radius > 0.0 {
        radius as usize
    } else {
        0
    }
}

/// Running totals over a series, so any window mean costs O(1).
///
/// Non-finite scalars are counted instead of summed; adding them into the
/// finite sum would turn every later difference into NaN.
struct PrefixSums {
    finite: Vec<f64>,
    nan: Vec<usize>,
    pos_inf: Vec<usize>,
    neg_inf: Vec<usize>,
}

impl PrefixSums {
    fn new(data: &[Datum]) -> Self {
        let n = data.len();
        let mut sums = Self {
            finite: Vec::with_capacity(n + 1),
            nan: Vec::with_capacity(n + 1),
            pos_inf: Vec::with_capacity(n + 1),
            neg_inf: Vec::with_capacity(n + 1),
        };
        let (mut finite, mut nan, mut pos_inf, mut neg_inf) = (0.0, 0, 0, 0);
        sums.push(finite, nan, pos_inf, neg_inf);
        for d in data {
            let v = d.scalar;
            if v.is_nan() {
                nan += 1;
            } else if v == f64::INFINITY {
                pos_inf += 1;
            } else if v == f64::NEG_INFINITY {
                neg_inf += 1;
            } else {
                finite += v;
            }
            sums.push(finite, nan, pos_inf, neg_inf);
        }
        sums
    }

    fn push(&mut self, finite: f64, nan: usize, pos_inf: usize, neg_inf: usize) {
        self.finite.push(finite);
        self.nan.push(nan);
        self.pos_inf.push(pos_inf);
        self.neg_inf.push(neg_inf);
    }

    /// Mean of `data[start..end]`, with NaN and infinities behaving as in a
    /// plain summation.
    fn mean(&self, start: usize, end: usize) -> f64 {
        let nan = self.nan[end] - self.nan[start];
        let pos_inf = self.pos_inf[end] - self.pos_inf[start];
        let neg_inf = self.neg_inf[end] - self.neg_inf[start];
        match (nan, pos_inf, neg_inf) {
            (0, 0, 0) => (self.finite[end] - self.finite[start]) / (end - start) as f64,
            (0, _, 0) => f64::INFINITY,
            (0, 0, _) => f64::NEG_INFINITY,
            _ => f64::NAN,
        }
    }
}

/// Simple moving average over `[i - r, i + r]`, where `r` shrinks near the
/// start of the series to the number of points available on the left.
///
/// Points without `r` neighbours on the right are not smoothed at all; their
/// scalar is `NaN` so the smoothed line stops short of the raw line. A NaN
/// anywhere in a window makes that output NaN. Series of 0 or 1 points are
/// returned unchanged.
pub fn smooth(data: &[Datum], weight: f64) -> Vec<Datum> {
    let n = data.len();
    if n <= 1 {
        return data.to_vec();
    }
    let radius = kernel_radius(n, weight);
    if radius == 0 {
        return data.to_vec();
    }
    let sums = PrefixSums::new(data);

    data.iter()
        .enumerate()
        .map(|(i, d)| {
            let r = radius.min(i);
            if i + r >= n {
                return d.with_scalar(f64::NAN);
            }
            d.with_scalar(sums.mean(i - r, i + r + 1))
        })
        .collect()
}
