use serde::{Deserialize, Serialize};

use super::format::{format_relative, format_step, format_value, format_wall_time};
use crate::data::model::Datum;

/// What the horizontal axis measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XType {
    #[default]
    Step,
    WallTime,
    /// Seconds since the first datum of the same series.
    Relative,
}

impl XType {
    pub const ALL: [XType; 3] = [XType::Step, XType::WallTime, XType::Relative];

    /// X coordinate of `datum`, given the first datum of its series.
    pub fn x_value(self, datum: &Datum, first: &Datum) -> f64 {
        match self {
            XType::Step => datum.step as f64,
            XType::WallTime => datum.wall_time,
            XType::Relative => datum.wall_time - first.wall_time,
        }
    }

    pub fn format(self, x: f64) -> String {
        match self {
            XType::Step => format_step(x),
            XType::WallTime => format_wall_time(x),
            XType::Relative => format_relative(x),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            XType::Step => "Step",
            XType::WallTime => "Wall time",
            XType::Relative => "Relative",
        }
    }
}

/// Vertical scale kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YScaleType {
    #[default]
    Linear,
    /// Modified log, `sign(y) * log10(1 + |y|)`, defined for all reals.
    Log,
}

impl YScaleType {
    pub fn transform(self, y: f64) -> f64 {
        match self {
            YScaleType::Linear => y,
            YScaleType::Log => y.signum() * (1.0 + y.abs()).log10(),
        }
    }

    pub fn invert(self, y: f64) -> f64 {
        match self {
            YScaleType::Linear => y,
            YScaleType::Log => y.signum() * (10f64.powf(y.abs()) - 1.0),
        }
    }

    /// Tick label for a transformed coordinate.
    pub fn format(self, transformed: f64) -> String {
        format_value(self.invert(transformed))
    }
}

/// Axis configuration handed to a surface when a chart anchors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxesConfig {
    pub x_type: XType,
    pub y_scale: YScaleType,
}

/// A closed value range on one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub min: f64,
    pub max: f64,
}

impl Domain {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x_values_per_axis_kind() {
        let first = Datum::new(10, 1_000.0, 0.0);
        let d = Datum::new(25, 1_090.0, 1.0);
        assert_eq!(XType::Step.x_value(&d, &first), 25.0);
        assert_eq!(XType::WallTime.x_value(&d, &first), 1_090.0);
        assert_eq!(XType::Relative.x_value(&d, &first), 90.0);
    }

    #[test]
    fn modified_log_round_trips_sign() {
        let scale = YScaleType::Log;
        assert_eq!(scale.transform(0.0), 0.0);
        assert!((scale.transform(99.0) - 2.0).abs() < 1e-12);
        assert!((scale.transform(-99.0) + 2.0).abs() < 1e-12);
        assert!((scale.invert(scale.transform(-3.5)) + 3.5).abs() < 1e-9);
    }
}
