use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use eframe::egui::Color32;
use runlens::chart::axis::{XType, YScaleType};
use runlens::chart::line_chart::{scalar_accessor, ColorFn};
use runlens::chart::axis::{AxesConfig, Domain};
use runlens::chart::surface::{
    ChartSurface, LineMark, SceneProvider, SurfaceError, SurfaceProvider,
};
use runlens::chart::timer::ManualClock;
use runlens::chart::tooltip::{default_columns, TooltipSortingMethod};
use runlens::chart::{ChartError, ChartEvent, ChartState, SmoothedSeriesChart};
use runlens::data::model::{Datum, MetadataValue};

const DELAY: Duration = Duration::from_millis(350);
const MS: Duration = Duration::from_millis(1);

fn white() -> ColorFn {
    Rc::new(|_: &str| Color32::WHITE)
}

fn host() -> (SmoothedSeriesChart, SceneProvider, ManualClock) {
    let provider = SceneProvider::new();
    let clock = ManualClock::new();
    let chart = SmoothedSeriesChart::new(Box::new(provider.clone()), white())
        .with_build_delay(DELAY)
        .with_clock(Rc::new(clock.clone()));
    (chart, provider, clock)
}

fn series(values: &[f64]) -> Vec<Datum> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| Datum::new(i as i64, 100.0 + i as f64, v))
        .collect()
}

/// Attach and let the first build fire.
fn built() -> (SmoothedSeriesChart, SceneProvider, ManualClock) {
    let (mut chart, provider, clock) = host();
    chart.attach();
    clock.advance(DELAY);
    chart.tick().unwrap();
    assert_eq!(chart.state(), ChartState::Built);
    chart.drain_events();
    (chart, provider, clock)
}

/// Scene provider whose surfaces can be made to fail on demand.
#[derive(Clone, Default)]
struct FlakyProvider {
    scenes: SceneProvider,
    fail_create: Rc<Cell<bool>>,
    fail_anchor: Rc<Cell<bool>>,
}

struct FlakySurface {
    inner: Box<dyn ChartSurface>,
    fail_anchor: bool,
}

impl ChartSurface for FlakySurface {
    fn anchor(&mut self, axes: &AxesConfig) -> Result<(), SurfaceError> {
        if self.fail_anchor {
            return Err(SurfaceError::NotAnchored);
        }
        self.inner.anchor(axes)
    }

    fn set_domain(&mut self, x: Domain, y: Domain) -> Result<(), SurfaceError> {
        self.inner.set_domain(x, y)
    }

    fn draw_series(
        &mut self,
        series: &str,
        label: &str,
        marks: Vec<LineMark>,
    ) -> Result<(), SurfaceError> {
        self.inner.draw_series(series, label, marks)
    }

    fn remove_series(&mut self, series: &str) {
        self.inner.remove_series(series);
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn release(&mut self) {
        self.inner.release();
    }
}

impl SurfaceProvider for FlakyProvider {
    fn create_surface(&mut self) -> Result<Box<dyn ChartSurface>, SurfaceError> {
        if self.fail_create.get() {
            return Err(SurfaceError::Create("no display".into()));
        }
        Ok(Box::new(FlakySurface {
            inner: self.scenes.create_surface()?,
            fail_anchor: self.fail_anchor.get(),
        }))
    }
}

fn flaky_built() -> (SmoothedSeriesChart, FlakyProvider, ManualClock) {
    let provider = FlakyProvider::default();
    let clock = ManualClock::new();
    let mut chart = SmoothedSeriesChart::new(Box::new(provider.clone()), white())
        .with_build_delay(DELAY)
        .with_clock(Rc::new(clock.clone()));
    chart.attach();
    clock.advance(DELAY);
    chart.tick().unwrap();
    chart.drain_events();
    (chart, provider, clock)
}

fn draw_count(provider: &SceneProvider) -> usize {
    provider.current().map_or(0, |scene| scene.borrow().draw_count)
}

#[test]
fn first_build_waits_for_the_delay() {
    let (mut chart, provider, clock) = host();
    assert_eq!(chart.state(), ChartState::NoChart);

    chart.attach();
    assert_eq!(chart.state(), ChartState::PendingBuild);
    assert_eq!(chart.time_until_build(), Some(DELAY));

    clock.advance(DELAY - MS);
    chart.tick().unwrap();
    assert_eq!(chart.build_count(), 0);
    assert_eq!(provider.live_surfaces(), 0);

    clock.advance(MS);
    chart.tick().unwrap();
    assert_eq!(chart.state(), ChartState::Built);
    assert_eq!(chart.build_count(), 1);
    assert_eq!(chart.drain_events(), vec![ChartEvent::Attached]);
    assert!(chart.drain_events().is_empty());
    assert_eq!(provider.live_surfaces(), 1);
}

#[test]
fn rapid_changes_build_once_with_the_last_values() {
    let (mut chart, provider, clock) = host();
    chart.attach();

    chart.set_x_type(XType::WallTime);
    clock.advance(Duration::from_millis(100));
    chart.set_y_scale_type(YScaleType::Log);
    clock.advance(Duration::from_millis(100));
    chart.set_x_type(XType::Relative);
    clock.advance(Duration::from_millis(100));
    chart.set_color_fn(white());
    clock.advance(Duration::from_millis(100));
    chart.set_tooltip_columns(Some(default_columns()));

    // 400ms have passed since attach, but each change restarted the delay.
    chart.tick().unwrap();
    assert_eq!(chart.build_count(), 0);

    clock.advance(DELAY - MS);
    chart.tick().unwrap();
    assert_eq!(chart.build_count(), 0);

    clock.advance(MS);
    chart.tick().unwrap();
    clock.advance(DELAY * 4);
    chart.tick().unwrap();
    assert_eq!(chart.build_count(), 1);

    let options = chart.chart().unwrap().options();
    assert_eq!(options.x_type, XType::Relative);
    assert_eq!(options.y_scale, YScaleType::Log);
    let scene = provider.current().unwrap();
    let axes = scene.borrow().axes.unwrap();
    assert_eq!((axes.x_type, axes.y_scale), (XType::Relative, YScaleType::Log));
}

#[test]
fn unchanged_axis_settings_do_not_reschedule() {
    let (mut chart, _provider, _clock) = built();
    chart.set_x_type(XType::Step);
    chart.set_y_scale_type(YScaleType::Linear);
    assert_eq!(chart.state(), ChartState::Built);
}

#[test]
fn detach_during_pending_build_leaves_nothing() {
    let (mut chart, provider, clock) = host();
    chart.attach();
    chart.set_series_data("a", series(&[1.0, 2.0])).unwrap();
    clock.advance(Duration::from_millis(200));

    chart.detach();
    assert_eq!(chart.state(), ChartState::NoChart);
    clock.advance(DELAY * 2);
    chart.tick().unwrap();

    assert_eq!(chart.build_count(), 0);
    assert!(chart.drain_events().is_empty());
    assert_eq!(provider.live_surfaces(), 0);
    assert!(provider.current().is_none());
}

#[test]
fn detach_destroys_the_built_chart_and_cancels_a_rebuild() {
    let (mut chart, provider, clock) = built();
    chart.set_x_type(XType::WallTime);
    assert_eq!(chart.state(), ChartState::PendingBuild);

    chart.destroy();
    assert_eq!(chart.state(), ChartState::NoChart);
    assert_eq!(provider.live_surfaces(), 0);

    clock.advance(DELAY);
    chart.tick().unwrap();
    assert_eq!(chart.build_count(), 1);
    assert!(chart.chart().is_none());
}

#[test]
fn dropping_the_host_releases_its_surface() {
    let (chart, provider, _clock) = built();
    assert_eq!(provider.live_surfaces(), 1);
    drop(chart);
    assert_eq!(provider.live_surfaces(), 0);
}

#[test]
fn repeated_visible_set_is_a_no_op() {
    let (mut chart, provider, _clock) = built();
    chart.set_series_data("a", series(&[1.0, 2.0])).unwrap();
    chart.set_series_data("b", series(&[3.0, 4.0])).unwrap();

    chart.set_visible_series(&["b", "a"]).unwrap();
    let after_first = draw_count(&provider);
    assert!(after_first >= 2);

    chart.set_visible_series(&["b", "a"]).unwrap();
    assert_eq!(draw_count(&provider), after_first);

    // Equal data is ignored too.
    chart.set_series_data("a", series(&[1.0, 2.0])).unwrap();
    assert_eq!(draw_count(&provider), after_first);

    chart.set_series_data("a", series(&[1.0, 5.0])).unwrap();
    assert_eq!(draw_count(&provider), after_first + 1);
}

#[test]
fn rebuild_replays_the_cache_and_releases_the_old_surface() {
    let (mut chart, provider, clock) = host();
    chart.set_series_data("a", series(&[1.0, 2.0, 3.0])).unwrap();
    chart.set_series_data("b", series(&[4.0, 5.0])).unwrap();
    chart
        .set_series_metadata(
            "a",
            BTreeMap::from([("name".to_string(), MetadataValue::from("run a"))]),
        )
        .unwrap();
    chart.set_visible_series(&["a"]).unwrap();
    chart.attach();
    clock.advance(DELAY);
    chart.tick().unwrap();

    let first = provider.current().unwrap();
    assert_eq!(first.borrow().series.len(), 1);

    chart.set_x_type(XType::WallTime);
    // The old chart stays on screen until the rebuild fires.
    assert!(provider.current().is_some());
    clock.advance(DELAY);
    chart.tick().unwrap();

    assert_eq!(chart.build_count(), 2);
    assert!(first.borrow().released);
    assert_eq!(provider.live_surfaces(), 1);

    let scene = provider.current().unwrap();
    let scene = scene.borrow();
    assert_eq!(scene.series.len(), 1);
    let (name, label, marks) = &scene.series[0];
    assert_eq!((name.as_str(), label.as_str()), ("a", "run a"));
    assert_eq!(marks[0].points[0], [100.0, 1.0]);

    // Only visible series were replayed; the rest come from the cache once
    // they are shown.
    assert!(!chart.chart().unwrap().has_series("b"));
    drop(scene);
    chart.set_visible_series(&["a", "b"]).unwrap();
    assert_eq!(provider.current().unwrap().borrow().series.len(), 2);
}

#[test]
fn build_without_accessor_is_skipped() {
    let (mut chart, provider, clock) = host();
    chart.set_y_value_accessor(None);
    chart.attach();
    clock.advance(DELAY);
    chart.tick().unwrap();

    assert_eq!(chart.state(), ChartState::NoChart);
    assert_eq!(chart.build_count(), 0);
    assert!(chart.drain_events().is_empty());
    assert_eq!(provider.live_surfaces(), 0);

    chart.set_y_value_accessor(Some(scalar_accessor()));
    clock.advance(DELAY);
    chart.tick().unwrap();
    assert_eq!(chart.state(), ChartState::Built);
}

#[test]
fn skipped_rebuild_keeps_the_previous_chart() {
    let (mut chart, provider, clock) = built();
    chart.set_tooltip_columns(None);
    clock.advance(DELAY);
    chart.tick().unwrap();

    assert_eq!(chart.build_count(), 1);
    assert_eq!(chart.state(), ChartState::Built);
    assert_eq!(provider.live_surfaces(), 1);
}

#[test]
fn live_settings_apply_without_rebuilding() {
    let (mut chart, _provider, _clock) = built();
    chart.set_series_data("b", series(&[5.0])).unwrap();
    chart.set_series_data("a", series(&[1.0])).unwrap();
    chart.set_series_data("c", series(&[3.0])).unwrap();
    chart.set_visible_series(&["b", "a", "c"]).unwrap();

    let names = |chart: &SmoothedSeriesChart| -> Vec<String> {
        chart.tooltip_rows(0.0).into_iter().map(|r| r.series).collect()
    };
    assert_eq!(names(&chart), ["b", "a", "c"]);

    chart.set_tooltip_sorting_method(TooltipSortingMethod::Ascending);
    assert_eq!(names(&chart), ["a", "c", "b"]);

    chart.set_smoothing(true, 0.6).unwrap();
    chart.set_outlier_ignoring(true).unwrap();
    chart.reset_domain().unwrap();
    assert!(chart.chart().unwrap().smoothed_data("a").is_some());
    assert!(chart.chart().unwrap().ignores_y_outliers());

    chart.set_smoothing(false, 0.6).unwrap();
    assert!(chart.chart().unwrap().smoothed_data("a").is_none());
    assert_eq!(chart.build_count(), 1);
    assert_eq!(chart.state(), ChartState::Built);
}

#[test]
fn smoothing_set_before_the_build_is_applied_to_it() {
    let (mut chart, _provider, clock) = host();
    chart.set_smoothing(true, 1.0).unwrap();
    chart.set_series_data("a", series(&[1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
    chart.set_visible_series(&["a"]).unwrap();
    chart.attach();
    clock.advance(DELAY);
    chart.tick().unwrap();

    let built = chart.chart().unwrap();
    assert_eq!(built.smoothing_weight(), Some(1.0));
    let smoothed = built.smoothed_data("a").unwrap();
    assert_eq!(smoothed.len(), 5);
    assert_eq!(smoothed[0].scalar, 1.0);
    assert_eq!(smoothed[1].scalar, 2.0);
    assert!(smoothed[4].scalar.is_nan());
}

#[test]
fn surface_creation_failure_reaches_the_host() {
    let (mut chart, provider, clock) = flaky_built();
    let first = provider.scenes.current().unwrap();

    provider.fail_create.set(true);
    chart.set_x_type(XType::WallTime);
    clock.advance(DELAY);
    let result = chart.tick();

    assert!(matches!(result, Err(ChartError::Surface(SurfaceError::Create(_)))));
    assert_eq!(chart.state(), ChartState::Built);
    assert_eq!(chart.build_count(), 1);
    assert_eq!(chart.chart().unwrap().options().x_type, XType::Step);
    assert!(!first.borrow().released);
    assert_eq!(provider.scenes.live_surfaces(), 1);
    assert!(chart.drain_events().is_empty());
}

#[test]
fn anchor_failure_reaches_the_host_and_frees_the_new_surface() {
    let (mut chart, provider, clock) = flaky_built();
    let first = provider.scenes.current().unwrap();

    provider.fail_anchor.set(true);
    chart.set_y_scale_type(YScaleType::Log);
    clock.advance(DELAY);
    let result = chart.tick();

    assert!(matches!(result, Err(ChartError::Surface(SurfaceError::NotAnchored))));
    assert_eq!(chart.state(), ChartState::Built);
    assert_eq!(chart.build_count(), 1);
    assert_eq!(chart.chart().unwrap().options().y_scale, YScaleType::Linear);
    assert!(!first.borrow().released);
    assert_eq!(provider.scenes.live_surfaces(), 1);
    assert!(chart.drain_events().is_empty());
    // The UI keeps showing the old scene.
    assert!(Rc::ptr_eq(&provider.scenes.current().unwrap(), &first));

    // The next successful build replaces the old chart as usual.
    provider.fail_anchor.set(false);
    chart.set_x_type(XType::Relative);
    clock.advance(DELAY);
    chart.tick().unwrap();
    assert_eq!(chart.build_count(), 2);
    assert!(first.borrow().released);
    assert_eq!(provider.scenes.live_surfaces(), 1);
    assert_eq!(chart.drain_events(), vec![ChartEvent::Attached]);
}

#[test]
fn clearing_series_forgets_the_previous_source() {
    let (mut chart, _provider, _clock) = built();
    chart.set_series_data("a", series(&[1.0, 2.0])).unwrap();
    chart.set_series_data("b", series(&[3.0])).unwrap();
    chart.set_visible_series(&["a", "b"]).unwrap();

    chart.clear_series().unwrap();
    chart.set_series_data("c", series(&[4.0])).unwrap();
    chart.set_visible_series(&["c"]).unwrap();

    let cached: Vec<&String> = chart.cache().names().collect();
    assert_eq!(cached, ["c"]);
    let held: Vec<&String> = chart.chart().unwrap().series_names().collect();
    assert_eq!(held, ["c"]);
}

#[test]
fn showing_series_again_does_not_resmooth_them() {
    let (mut chart, _provider, _clock) = built();
    chart.set_smoothing(true, 0.9).unwrap();
    chart.set_series_data("a", series(&[1.0, 2.0, 3.0, 4.0])).unwrap();
    chart.set_series_data("b", series(&[4.0, 3.0, 2.0, 1.0])).unwrap();
    chart.set_visible_series(&["a", "b"]).unwrap();
    let smoothed = chart.chart().unwrap().smooth_count();
    assert_eq!(smoothed, 2);

    chart.set_visible_series(&["a"]).unwrap();
    chart.set_visible_series(&["a", "b"]).unwrap();
    assert_eq!(chart.chart().unwrap().smooth_count(), smoothed);
}
