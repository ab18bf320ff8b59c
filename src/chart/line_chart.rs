use std::collections::BTreeMap;
use std::rc::Rc;

use eframe::egui::Color32;

use super::axis::{AxesConfig, Domain, XType, YScaleType};
use super::domain::{compute_domain, extent};
use super::smoothing::smooth;
use super::surface::{ChartSurface, LineMark, MarkKind};
use super::tooltip::{
    sort_rows, TooltipColumn, TooltipPoint, TooltipPosition, TooltipRow, TooltipSortingMethod,
    TooltipStatus,
};
use super::ChartError;
use crate::data::model::{Datum, SeriesMetadata};

/// Reads the plotted y value from a datum.
pub type YAccessor = Rc<dyn Fn(&Datum) -> f64>;

/// Maps a series name to its line color.
pub type ColorFn = Rc<dyn Fn(&str) -> Color32>;

/// The y accessor used unless the host supplies another: the raw scalar.
pub fn scalar_accessor() -> YAccessor {
    Rc::new(|d: &Datum| d.scalar)
}

/// Configuration fixed for the lifetime of one chart instance.
#[derive(Clone)]
pub struct LineChartOptions {
    pub x_type: XType,
    pub y_accessor: YAccessor,
    pub y_scale: YScaleType,
    pub color_fn: ColorFn,
    pub tooltip_columns: Vec<TooltipColumn>,
    pub default_x_range: Option<Domain>,
    pub default_y_range: Option<Domain>,
}

#[derive(Debug, Default)]
struct SeriesState {
    data: Vec<Datum>,
    /// Smoothed `data` and the weight it was smoothed with. Index-aligned
    /// with `data`; dropped whenever `data` changes.
    smoothed: Option<(f64, Vec<Datum>)>,
    metadata: Option<SeriesMetadata>,
}

impl SeriesState {
    /// The smoothed data if it matches `weight`.
    fn smoothed_with(&self, weight: Option<f64>) -> Option<&[Datum]> {
        match (weight, &self.smoothed) {
            (Some(w), Some((sw, data))) if w.to_bits() == sw.to_bits() => Some(data),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// LineChart – one rendering pipeline, rebuilt whenever its options change
// ---------------------------------------------------------------------------

pub struct LineChart {
    options: LineChartOptions,
    surface: Box<dyn ChartSurface>,
    anchored: bool,
    series: BTreeMap<String, SeriesState>,
    visible: Vec<String>,
    /// Smoothing weight while smoothing is enabled.
    smoothing: Option<f64>,
    ignore_outliers: bool,
    sorting: TooltipSortingMethod,
    position: TooltipPosition,
    x_domain: Domain,
    y_domain: Domain,
    smooth_runs: usize,
}

impl LineChart {
    pub fn new(options: LineChartOptions, surface: Box<dyn ChartSurface>) -> Self {
        Self {
            options,
            surface,
            anchored: false,
            series: BTreeMap::new(),
            visible: Vec::new(),
            smoothing: None,
            ignore_outliers: false,
            sorting: TooltipSortingMethod::default(),
            position: TooltipPosition::default(),
            x_domain: Domain::new(0.0, 1.0),
            y_domain: Domain::new(0.0, 1.0),
            smooth_runs: 0,
        }
    }

    /// Anchor the chart on its surface. Nothing is drawn before this.
    pub fn render_to(&mut self) -> Result<(), ChartError> {
        let axes = AxesConfig {
            x_type: self.options.x_type,
            y_scale: self.options.y_scale,
        };
        self.surface.anchor(&axes)?;
        self.anchored = true;
        self.reset_domain()
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    pub fn options(&self) -> &LineChartOptions {
        &self.options
    }

    pub fn visible_series(&self) -> &[String] {
        &self.visible
    }

    pub fn smoothing_weight(&self) -> Option<f64> {
        self.smoothing
    }

    pub fn tooltip_sorting_method(&self) -> TooltipSortingMethod {
        self.sorting
    }

    pub fn tooltip_position(&self) -> TooltipPosition {
        self.position
    }

    pub fn ignores_y_outliers(&self) -> bool {
        self.ignore_outliers
    }

    pub fn domain(&self) -> (Domain, Domain) {
        (self.x_domain, self.y_domain)
    }

    /// Smoothed data of a series, when smoothing is on.
    pub fn smoothed_data(&self, name: &str) -> Option<&[Datum]> {
        self.series.get(name)?.smoothed_with(self.smoothing)
    }

    /// Whether the chart holds data or metadata for `name`.
    pub fn has_series(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    /// Names of every series held, visible or not.
    pub fn series_names(&self) -> impl Iterator<Item = &String> {
        self.series.keys()
    }

    pub fn set_series_data(&mut self, name: &str, data: Vec<Datum>) -> Result<(), ChartError> {
        let state = self.series.entry(name.to_string()).or_default();
        state.data = data;
        state.smoothed = None;
        if self.is_visible(name) {
            self.ensure_smoothed(name);
            self.refresh_domain()?;
            self.render_series(name)?;
        }
        Ok(())
    }

    pub fn set_series_metadata(
        &mut self,
        name: &str,
        metadata: SeriesMetadata,
    ) -> Result<(), ChartError> {
        self.series.entry(name.to_string()).or_default().metadata = Some(metadata);
        if self.is_visible(name) {
            self.render_series(name)?;
        }
        Ok(())
    }

    /// Restrict rendering to `names`, in that order. Newly visible series
    /// are smoothed if needed; call [`LineChart::redraw`] afterwards to draw
    /// the new set.
    pub fn set_visible_series(&mut self, names: &[String]) {
        for name in &self.visible {
            if !names.contains(name) {
                self.surface.remove_series(name);
            }
        }
        self.visible = names.to_vec();
        self.smooth_visible();
    }

    /// Drop every series and the visible set.
    pub fn clear_series(&mut self) -> Result<(), ChartError> {
        self.series.clear();
        self.visible.clear();
        self.surface.clear();
        self.reset_domain()
    }

    pub fn smoothing_update(&mut self, weight: f64) -> Result<(), ChartError> {
        self.smoothing = Some(weight);
        self.smooth_visible();
        self.redraw(false)
    }

    pub fn smoothing_disable(&mut self) -> Result<(), ChartError> {
        self.smoothing = None;
        self.redraw(false)
    }

    /// Times [`smooth`] has run on this chart.
    pub fn smooth_count(&self) -> usize {
        self.smooth_runs
    }

    pub fn ignore_y_outliers(&mut self, ignore: bool) -> Result<(), ChartError> {
        if self.ignore_outliers != ignore {
            self.ignore_outliers = ignore;
            self.reset_domain()?;
        }
        Ok(())
    }

    pub fn set_tooltip_sorting_method(&mut self, method: TooltipSortingMethod) {
        self.sorting = method;
    }

    pub fn set_tooltip_position(&mut self, position: TooltipPosition) {
        self.position = position;
    }

    /// Recompute both axis domains from the visible data.
    pub fn reset_domain(&mut self) -> Result<(), ChartError> {
        self.x_domain = self
            .options
            .default_x_range
            .or_else(|| extent(self.visible_x_values()))
            .unwrap_or(Domain::new(0.0, 1.0));
        self.y_domain = match self.options.default_y_range {
            Some(range) => range,
            None => compute_domain(self.visible_y_values(), self.ignore_outliers),
        };
        if self.anchored {
            self.surface.set_domain(self.x_domain, self.y_domain)?;
        }
        Ok(())
    }

    /// Draw every visible series again. `clear_cache` also recomputes the
    /// smoothed data and the domain.
    pub fn redraw(&mut self, clear_cache: bool) -> Result<(), ChartError> {
        if clear_cache {
            for state in self.series.values_mut() {
                state.smoothed = None;
            }
            self.smooth_visible();
            self.reset_domain()?;
        }
        if !self.anchored {
            return Ok(());
        }
        self.surface.clear();
        for name in self.visible.clone() {
            self.render_series(&name)?;
        }
        Ok(())
    }

    /// One row per visible series that has data, for the datum whose x is
    /// nearest to `query_x`, ordered by the current sorting method.
    pub fn tooltip_rows(&self, query_x: f64) -> Vec<TooltipRow> {
        let status = TooltipStatus {
            smoothing_enabled: self.smoothing.is_some(),
        };
        let x_type = self.options.x_type;

        let mut rows: Vec<TooltipRow> = self
            .visible
            .iter()
            .filter_map(|name| {
                let state = self.series.get(name)?;
                let first = state.data.first()?;
                let (index, x, distance) = state
                    .data
                    .iter()
                    .enumerate()
                    .map(|(i, d)| {
                        let x = x_type.x_value(d, first);
                        (i, x, (x - query_x).abs())
                    })
                    .min_by(|a, b| a.2.total_cmp(&b.2))?;
                let datum = &state.data[index];
                let point = TooltipPoint {
                    series: name,
                    index,
                    datum,
                    smoothed: state.smoothed_with(self.smoothing).map(|s| s[index].scalar),
                    first,
                    metadata: state.metadata.as_ref(),
                };
                Some(TooltipRow {
                    series: name.clone(),
                    color: (self.options.color_fn)(name),
                    x,
                    distance,
                    value: datum.scalar,
                    cells: self
                        .options
                        .tooltip_columns
                        .iter()
                        .map(|c| c.evaluate(&point, &status))
                        .collect(),
                })
            })
            .collect();

        sort_rows(&mut rows, self.sorting);
        rows
    }

    /// Release the surface. The chart cannot be used afterwards.
    pub fn destroy(mut self) {
        self.surface.release();
        self.anchored = false;
    }

    fn is_visible(&self, name: &str) -> bool {
        self.visible.iter().any(|v| v == name)
    }

    /// Smooth the visible series whose cached result is missing or was made
    /// with another weight. Hidden series are smoothed once they are shown.
    fn smooth_visible(&mut self) {
        for name in self.visible.clone() {
            self.ensure_smoothed(&name);
        }
    }

    fn ensure_smoothed(&mut self, name: &str) {
        let Some(weight) = self.smoothing else {
            return;
        };
        let Some(state) = self.series.get_mut(name) else {
            return;
        };
        if state.smoothed_with(Some(weight)).is_none() {
            state.smoothed = Some((weight, smooth(&state.data, weight)));
            self.smooth_runs += 1;
        }
    }

    fn refresh_domain(&mut self) -> Result<(), ChartError> {
        if self.options.default_x_range.is_some() && self.options.default_y_range.is_some() {
            return Ok(());
        }
        self.reset_domain()
    }

    fn visible_states(&self) -> impl Iterator<Item = &SeriesState> + '_ {
        self.visible.iter().filter_map(|name| self.series.get(name))
    }

    fn visible_x_values(&self) -> Vec<f64> {
        let x_type = self.options.x_type;
        self.visible_states()
            .flat_map(|state| {
                let first = state.data.first();
                state
                    .data
                    .iter()
                    .filter_map(move |d| first.map(|f| x_type.x_value(d, f)))
            })
            .collect()
    }

    fn visible_y_values(&self) -> Vec<f64> {
        let accessor = &self.options.y_accessor;
        self.visible_states()
            .flat_map(|state| match state.smoothed_with(self.smoothing) {
                Some(smoothed) => smoothed.iter().map(|d| accessor(d)).collect::<Vec<_>>(),
                None => state.data.iter().map(|d| accessor(d)).collect(),
            })
            .collect()
    }

    fn render_series(&mut self, name: &str) -> Result<(), ChartError> {
        if !self.anchored {
            return Ok(());
        }
        let Some(state) = self.series.get(name) else {
            return Ok(());
        };
        let color = (self.options.color_fn)(name);
        let x_type = self.options.x_type;
        let accessor = &self.options.y_accessor;
        let points = |data: &[Datum]| -> Vec<[f64; 2]> {
            match state.data.first() {
                Some(first) => data
                    .iter()
                    .map(|d| [x_type.x_value(d, first), accessor(d)])
                    .collect(),
                None => Vec::new(),
            }
        };

        let marks = match state.smoothed_with(self.smoothing) {
            Some(smoothed) => vec![
                LineMark {
                    kind: MarkKind::Ghost,
                    color,
                    points: points(&state.data),
                },
                LineMark {
                    kind: MarkKind::Smoothed,
                    color,
                    points: points(smoothed),
                },
            ],
            None => vec![LineMark {
                kind: MarkKind::Raw,
                color,
                points: points(&state.data),
            }],
        };
        let label = match state.metadata.as_ref().and_then(|m| m.get("name")) {
            Some(value) => value.to_string(),
            None => name.to_string(),
        };

        self.surface.draw_series(name, &label, marks)?;
        Ok(())
    }
}
