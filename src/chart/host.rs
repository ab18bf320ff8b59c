use std::rc::Rc;
use std::time::Duration;

use super::axis::{Domain, XType, YScaleType};
use super::cache::SeriesCache;
use super::line_chart::{scalar_accessor, ColorFn, LineChart, LineChartOptions, YAccessor};
use super::smoothing::SmoothingConfig;
use super::surface::SurfaceProvider;
use super::timer::{Clock, DebounceTimer, SystemClock, DEFAULT_BUILD_DELAY};
use super::tooltip::{default_columns, TooltipColumn, TooltipPosition, TooltipRow, TooltipSortingMethod};
use super::ChartError;
use crate::data::model::{Datum, SeriesMetadata};

/// Where the chart lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartState {
    NoChart,
    /// A rebuild is scheduled; an older chart may still be on screen.
    PendingBuild,
    Built,
}

/// Notifications for the embedding UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartEvent {
    /// A new chart instance was anchored on its surface.
    Attached,
}

// ---------------------------------------------------------------------------
// SmoothedSeriesChart – the host widget
// ---------------------------------------------------------------------------

/// Owns the configuration and the series cache, and (re)builds the
/// ephemeral [`LineChart`] a debounce delay after the last change to any
/// setting that requires a new rendering pipeline.
pub struct SmoothedSeriesChart {
    x_type: XType,
    y_accessor: Option<YAccessor>,
    y_scale: YScaleType,
    tooltip_columns: Option<Vec<TooltipColumn>>,
    color_fn: ColorFn,
    default_x_range: Option<Domain>,
    default_y_range: Option<Domain>,

    smoothing: SmoothingConfig,
    ignore_outliers: bool,
    sorting: TooltipSortingMethod,
    position: TooltipPosition,

    cache: SeriesCache,
    provider: Box<dyn SurfaceProvider>,
    clock: Rc<dyn Clock>,
    timer: DebounceTimer,
    attached: bool,
    chart: Option<LineChart>,
    events: Vec<ChartEvent>,
    builds: usize,
}

impl SmoothedSeriesChart {
    pub fn new(provider: Box<dyn SurfaceProvider>, color_fn: ColorFn) -> Self {
        Self {
            x_type: XType::default(),
            y_accessor: Some(scalar_accessor()),
            y_scale: YScaleType::default(),
            tooltip_columns: Some(default_columns()),
            color_fn,
            default_x_range: None,
            default_y_range: None,
            smoothing: SmoothingConfig::default(),
            ignore_outliers: false,
            sorting: TooltipSortingMethod::default(),
            position: TooltipPosition::default(),
            cache: SeriesCache::new(),
            provider,
            clock: Rc::new(SystemClock),
            timer: DebounceTimer::new(DEFAULT_BUILD_DELAY),
            attached: false,
            chart: None,
            events: Vec::new(),
            builds: 0,
        }
    }

    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.timer = DebounceTimer::new(delay);
        self
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // -- lifecycle ----------------------------------------------------------

    pub fn state(&self) -> ChartState {
        if self.timer.is_pending() {
            ChartState::PendingBuild
        } else if self.chart.is_some() {
            ChartState::Built
        } else {
            ChartState::NoChart
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Mount the widget; the first chart is built after the debounce delay.
    pub fn attach(&mut self) {
        self.attached = true;
        self.schedule_build();
    }

    /// Unmount: cancel any pending build and destroy the chart now.
    pub fn detach(&mut self) {
        self.attached = false;
        self.timer.cancel();
        if let Some(chart) = self.chart.take() {
            log::debug!("destroying chart on detach");
            chart.destroy();
        }
    }

    pub fn destroy(&mut self) {
        self.detach();
    }

    /// Drive the debounce timer. Call once per UI frame.
    pub fn tick(&mut self) -> Result<(), ChartError> {
        if self.timer.fire_if_due(self.clock.now()) {
            self.build()?;
        }
        Ok(())
    }

    /// Time left before a pending build fires.
    pub fn time_until_build(&self) -> Option<Duration> {
        self.timer.remaining(self.clock.now())
    }

    pub fn drain_events(&mut self) -> Vec<ChartEvent> {
        std::mem::take(&mut self.events)
    }

    /// Chart instances constructed so far.
    pub fn build_count(&self) -> usize {
        self.builds
    }

    pub fn chart(&self) -> Option<&LineChart> {
        self.chart.as_ref()
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    fn schedule_build(&mut self) {
        if !self.attached {
            return;
        }
        if self.timer.is_pending() {
            log::debug!("chart build rescheduled");
        }
        self.timer.schedule(self.clock.now());
    }

    fn build(&mut self) -> Result<(), ChartError> {
        let (Some(y_accessor), Some(tooltip_columns)) =
            (self.y_accessor.clone(), self.tooltip_columns.clone())
        else {
            log::debug!("chart build skipped: y accessor or tooltip columns unset");
            return Ok(());
        };
        let options = LineChartOptions {
            x_type: self.x_type,
            y_accessor,
            y_scale: self.y_scale,
            color_fn: Rc::clone(&self.color_fn),
            tooltip_columns,
            default_x_range: self.default_x_range,
            default_y_range: self.default_y_range,
        };

        let surface = self.provider.create_surface()?;
        let mut chart = LineChart::new(options, surface);
        if let Err(e) = chart.render_to() {
            chart.destroy();
            return Err(e);
        }
        if let Some(previous) = self.chart.take() {
            previous.destroy();
        }
        self.builds += 1;
        log::debug!(
            "chart #{} built ({:?}, {:?})",
            self.builds,
            self.x_type,
            self.y_scale
        );

        let result = self.populate(&mut chart);
        self.chart = Some(chart);
        self.events.push(ChartEvent::Attached);
        result
    }

    /// Replay the visible part of the cache and the live settings onto a
    /// fresh chart. Hidden series are loaded when they are shown.
    fn populate(&self, chart: &mut LineChart) -> Result<(), ChartError> {
        chart.set_tooltip_sorting_method(self.sorting);
        chart.set_tooltip_position(self.position);
        chart.ignore_y_outliers(self.ignore_outliers)?;
        if self.smoothing.enabled {
            chart.smoothing_update(self.smoothing.weight)?;
        }
        Self::load_missing(&self.cache, chart)?;
        chart.set_visible_series(self.cache.visible());
        chart.reset_domain()?;
        chart.redraw(false)
    }

    /// Copy cached visible series the chart does not hold yet.
    fn load_missing(cache: &SeriesCache, chart: &mut LineChart) -> Result<(), ChartError> {
        for name in cache.visible() {
            if chart.has_series(name) {
                continue;
            }
            if let Some(data) = cache.data(name) {
                chart.set_series_data(name, data.to_vec())?;
            }
            if let Some(metadata) = cache.metadata(name) {
                chart.set_series_metadata(name, metadata.clone())?;
            }
        }
        Ok(())
    }

    // -- settings that need a new chart ------------------------------------

    pub fn set_x_type(&mut self, x_type: XType) {
        if self.x_type != x_type {
            self.x_type = x_type;
            self.schedule_build();
        }
    }

    pub fn x_type(&self) -> XType {
        self.x_type
    }

    pub fn set_y_value_accessor(&mut self, accessor: Option<YAccessor>) {
        self.y_accessor = accessor;
        self.schedule_build();
    }

    pub fn set_y_scale_type(&mut self, y_scale: YScaleType) {
        if self.y_scale != y_scale {
            self.y_scale = y_scale;
            self.schedule_build();
        }
    }

    pub fn y_scale_type(&self) -> YScaleType {
        self.y_scale
    }

    pub fn set_tooltip_columns(&mut self, columns: Option<Vec<TooltipColumn>>) {
        self.tooltip_columns = columns;
        self.schedule_build();
    }

    pub fn tooltip_columns(&self) -> Option<&[TooltipColumn]> {
        self.tooltip_columns.as_deref()
    }

    pub fn set_color_fn(&mut self, color_fn: ColorFn) {
        if !Rc::ptr_eq(&self.color_fn, &color_fn) {
            self.color_fn = color_fn;
            self.schedule_build();
        }
    }

    /// Both bounds or neither. Applied on the next build.
    pub fn set_default_ranges(&mut self, x: Option<Domain>, y: Option<Domain>) {
        self.default_x_range = x;
        self.default_y_range = y;
    }

    // -- data -----------------------------------------------------------------

    /// Cache `data` for `name`. The chart receives it only while it shows
    /// or already holds the series.
    pub fn set_series_data(&mut self, name: &str, data: Vec<Datum>) -> Result<(), ChartError> {
        if !self.cache.set_data(name, data) {
            return Ok(());
        }
        let wanted = self.wants_series(name);
        match (&mut self.chart, self.cache.data(name)) {
            (Some(chart), Some(data)) if wanted || chart.has_series(name) => {
                chart.set_series_data(name, data.to_vec())
            }
            _ => Ok(()),
        }
    }

    pub fn set_series_metadata(
        &mut self,
        name: &str,
        metadata: SeriesMetadata,
    ) -> Result<(), ChartError> {
        if !self.cache.set_metadata(name, metadata.clone()) {
            return Ok(());
        }
        let wanted = self.wants_series(name);
        match &mut self.chart {
            Some(chart) if wanted || chart.has_series(name) => {
                chart.set_series_metadata(name, metadata)
            }
            _ => Ok(()),
        }
    }

    pub fn set_visible_series<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), ChartError> {
        if !self.cache.set_visible(names) {
            return Ok(());
        }
        match &mut self.chart {
            Some(chart) => {
                Self::load_missing(&self.cache, chart)?;
                chart.set_visible_series(self.cache.visible());
                chart.reset_domain()?;
                chart.redraw(false)
            }
            None => Ok(()),
        }
    }

    /// Forget every series, cached and charted. Used when the data source
    /// changes so runs of the previous source do not linger.
    pub fn clear_series(&mut self) -> Result<(), ChartError> {
        self.cache.clear();
        match &mut self.chart {
            Some(chart) => chart.clear_series(),
            None => Ok(()),
        }
    }

    fn wants_series(&self, name: &str) -> bool {
        self.cache.visible().iter().any(|v| v == name)
    }

    pub fn visible_series(&self) -> &[String] {
        self.cache.visible()
    }

    // -- live settings --------------------------------------------------------

    pub fn set_smoothing(&mut self, enabled: bool, weight: f64) -> Result<(), ChartError> {
        let smoothing = SmoothingConfig::new(enabled, weight);
        if smoothing == self.smoothing {
            return Ok(());
        }
        self.smoothing = smoothing;
        match &mut self.chart {
            Some(chart) if smoothing.enabled => chart.smoothing_update(smoothing.weight),
            Some(chart) => chart.smoothing_disable(),
            None => Ok(()),
        }
    }

    pub fn smoothing(&self) -> SmoothingConfig {
        self.smoothing
    }

    pub fn set_outlier_ignoring(&mut self, ignore: bool) -> Result<(), ChartError> {
        self.ignore_outliers = ignore;
        match &mut self.chart {
            Some(chart) => chart.ignore_y_outliers(ignore),
            None => Ok(()),
        }
    }

    pub fn ignores_outliers(&self) -> bool {
        self.ignore_outliers
    }

    pub fn set_tooltip_sorting_method(&mut self, method: TooltipSortingMethod) {
        self.sorting = method;
        if let Some(chart) = &mut self.chart {
            chart.set_tooltip_sorting_method(method);
        }
    }

    pub fn tooltip_sorting_method(&self) -> TooltipSortingMethod {
        self.sorting
    }

    pub fn set_tooltip_position(&mut self, position: TooltipPosition) {
        self.position = position;
        if let Some(chart) = &mut self.chart {
            chart.set_tooltip_position(position);
        }
    }

    pub fn tooltip_position(&self) -> TooltipPosition {
        self.position
    }

    /// No-op before the first chart is built.
    pub fn reset_domain(&mut self) -> Result<(), ChartError> {
        match &mut self.chart {
            Some(chart) => chart.reset_domain(),
            None => Ok(()),
        }
    }

    pub fn redraw(&mut self, clear_cache: bool) -> Result<(), ChartError> {
        match &mut self.chart {
            Some(chart) => chart.redraw(clear_cache),
            None => Ok(()),
        }
    }

    /// Tooltip rows for a cursor at `query_x` (x-axis units).
    pub fn tooltip_rows(&self, query_x: f64) -> Vec<TooltipRow> {
        self.chart
            .as_ref()
            .map(|chart| chart.tooltip_rows(query_x))
            .unwrap_or_default()
    }
}

impl Drop for SmoothedSeriesChart {
    fn drop(&mut self) {
        self.detach();
    }
}
