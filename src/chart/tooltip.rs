use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use eframe::egui::Color32;
use serde::{Deserialize, Serialize};

use super::format::{format_relative, format_step, format_value, format_wall_time};
use crate::data::model::{Datum, MetadataValue, SeriesMetadata};

/// Order of the rows in the hover tooltip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TooltipSortingMethod {
    /// Visible-series order.
    #[default]
    Default,
    Ascending,
    Descending,
    /// Closest datum to the cursor first.
    Nearest,
}

impl TooltipSortingMethod {
    pub const ALL: [TooltipSortingMethod; 4] = [
        TooltipSortingMethod::Default,
        TooltipSortingMethod::Ascending,
        TooltipSortingMethod::Descending,
        TooltipSortingMethod::Nearest,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TooltipSortingMethod::Default => "Default",
            TooltipSortingMethod::Ascending => "Ascending",
            TooltipSortingMethod::Descending => "Descending",
            TooltipSortingMethod::Nearest => "Nearest",
        }
    }
}

/// Where the tooltip table sits relative to the plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TooltipPosition {
    #[default]
    Bottom,
    Right,
}

/// Chart-wide state a column may depend on.
#[derive(Debug, Clone, Copy)]
pub struct TooltipStatus {
    pub smoothing_enabled: bool,
}

/// The datum a tooltip row describes.
#[derive(Debug, Clone, Copy)]
pub struct TooltipPoint<'a> {
    pub series: &'a str,
    pub index: usize,
    pub datum: &'a Datum,
    /// Smoothed scalar at `index`; NaN where the smoothed line is absent.
    pub smoothed: Option<f64>,
    /// First datum of the series, for relative time.
    pub first: &'a Datum,
    pub metadata: Option<&'a SeriesMetadata>,
}

impl TooltipPoint<'_> {
    /// Display name from metadata, falling back to the series name.
    pub fn display_name(&self) -> String {
        match self.metadata.and_then(|m| m.get("name")) {
            Some(MetadataValue::Null) | None => self.series.to_string(),
            Some(name) => name.to_string(),
        }
    }
}

type Evaluate = dyn Fn(&TooltipPoint<'_>, &TooltipStatus) -> String;

/// A titled tooltip column computed from a point.
#[derive(Clone)]
pub struct TooltipColumn {
    pub title: String,
    evaluate: Rc<Evaluate>,
}

impl TooltipColumn {
    pub fn new(
        title: impl Into<String>,
        evaluate: impl Fn(&TooltipPoint<'_>, &TooltipStatus) -> String + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            evaluate: Rc::new(evaluate),
        }
    }

    pub fn evaluate(&self, point: &TooltipPoint<'_>, status: &TooltipStatus) -> String {
        (self.evaluate)(point, status)
    }
}

impl fmt::Debug for TooltipColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TooltipColumn")
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// Name, Smoothed, Value, Step, Time and Relative columns.
pub fn default_columns() -> Vec<TooltipColumn> {
    vec![
        TooltipColumn::new("Name", |p, _| p.display_name()),
        TooltipColumn::new("Smoothed", |p, status| {
            let value = if status.smoothing_enabled {
                p.smoothed.unwrap_or(p.datum.scalar)
            } else {
                p.datum.scalar
            };
            format_value(value)
        }),
        TooltipColumn::new("Value", |p, _| format_value(p.datum.scalar)),
        TooltipColumn::new("Step", |p, _| format_step(p.datum.step as f64)),
        TooltipColumn::new("Time", |p, _| format_wall_time(p.datum.wall_time)),
        TooltipColumn::new("Relative", |p, _| {
            format_relative(p.datum.wall_time - p.first.wall_time)
        }),
    ]
}

/// One evaluated row of the tooltip table.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipRow {
    pub series: String,
    pub color: Color32,
    /// X coordinate of the chosen datum.
    pub x: f64,
    /// Distance to the query position, in x-axis units.
    pub distance: f64,
    /// Raw scalar of the chosen datum; what the `Value` column shows.
    pub value: f64,
    pub cells: Vec<String>,
}

/// NaN sorts after every number regardless of direction.
fn compare_values(a: f64, b: f64, descending: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if descending => b.total_cmp(&a),
        (false, false) => a.total_cmp(&b),
    }
}

/// Order rows in place. `rows` must arrive in visible-series order; every
/// sort is stable so ties keep that order.
pub fn sort_rows(rows: &mut [TooltipRow], method: TooltipSortingMethod) {
    match method {
        TooltipSortingMethod::Default => {}
        TooltipSortingMethod::Ascending => {
            rows.sort_by(|a, b| compare_values(a.value, b.value, false))
        }
        TooltipSortingMethod::Descending => {
            rows.sort_by(|a, b| compare_values(a.value, b.value, true))
        }
        TooltipSortingMethod::Nearest => {
            rows.sort_by(|a, b| compare_values(a.distance, b.distance, false))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(series: &str, value: f64, distance: f64) -> TooltipRow {
        TooltipRow {
            series: series.to_string(),
            color: Color32::GRAY,
            x: 0.0,
            distance,
            value,
            cells: Vec::new(),
        }
    }

    fn order(rows: &[TooltipRow]) -> Vec<&str> {
        rows.iter().map(|r| r.series.as_str()).collect()
    }

    #[test]
    fn sorting_modes() {
        let base = vec![row("b", 5.0, 2.0), row("a", 1.0, 0.5), row("c", 3.0, 1.0)];

        let mut rows = base.clone();
        sort_rows(&mut rows, TooltipSortingMethod::Default);
        assert_eq!(order(&rows), ["b", "a", "c"]);

        let mut rows = base.clone();
        sort_rows(&mut rows, TooltipSortingMethod::Ascending);
        assert_eq!(order(&rows), ["a", "c", "b"]);

        let mut rows = base.clone();
        sort_rows(&mut rows, TooltipSortingMethod::Descending);
        assert_eq!(order(&rows), ["b", "c", "a"]);

        let mut rows = base;
        sort_rows(&mut rows, TooltipSortingMethod::Nearest);
        assert_eq!(order(&rows), ["a", "c", "b"]);
    }

    #[test]
    fn ties_keep_visible_order_and_nan_goes_last() {
        let mut rows = vec![
            row("x", f64::NAN, 0.0),
            row("y", 2.0, 0.0),
            row("z", 2.0, 0.0),
            row("w", 1.0, 0.0),
        ];
        sort_rows(&mut rows, TooltipSortingMethod::Descending);
        assert_eq!(order(&rows), ["y", "z", "w", "x"]);
        sort_rows(&mut rows, TooltipSortingMethod::Ascending);
        assert_eq!(order(&rows), ["w", "y", "z", "x"]);
    }

    #[test]
    fn default_columns_render_point() {
        let first = Datum::new(0, 1_000.0, 0.0);
        let datum = Datum::new(1_500, 1_065.0, f64::NAN);
        let mut meta = SeriesMetadata::new();
        meta.insert("name".into(), "train/loss".into());
        let point = TooltipPoint {
            series: "train",
            index: 1,
            datum: &datum,
            smoothed: Some(0.25),
            first: &first,
            metadata: Some(&meta),
        };

        let status = TooltipStatus {
            smoothing_enabled: true,
        };
        let cells: Vec<String> = default_columns()
            .iter()
            .map(|c| c.evaluate(&point, &status))
            .collect();
        assert_eq!(cells[0], "train/loss");
        assert_eq!(cells[1], "0.25");
        assert_eq!(cells[2], "NaN");
        assert_eq!(cells[3], "1.5k");
        assert_eq!(cells[5], "1m 5s");

        let off = TooltipStatus {
            smoothing_enabled: false,
        };
        assert_eq!(default_columns()[1].evaluate(&point, &off), "NaN");
    }

    #[test]
    fn name_falls_back_to_series() {
        let d = Datum::new(0, 0.0, 1.0);
        let point = TooltipPoint {
            series: "eval",
            index: 0,
            datum: &d,
            smoothed: None,
            first: &d,
            metadata: None,
        };
        assert_eq!(point.display_name(), "eval");
    }
}
