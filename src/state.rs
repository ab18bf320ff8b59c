use std::collections::BTreeMap;

use anyhow::Result;

use crate::chart::surface::SceneProvider;
use crate::chart::{ChartError, SmoothedSeriesChart};
use crate::color::ColorScale;
use crate::config::ViewerConfig;
use crate::data::model::{MetadataValue, ScalarDataset};
use crate::data::runs::RunSource;
use crate::selector::{DataSelectRow, Experiment, Selection, SelectorError};
use crate::storage::{JsonFileStore, KeyValueStore, MemoryStore};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: ViewerConfig,

    /// Loaded dataset (None until user loads a file).
    pub dataset: Option<ScalarDataset>,

    /// Run checkboxes and tag filter for the loaded dataset.
    pub selector: DataSelectRow,

    /// Last selection reported by the selector.
    pub selection: Selection,

    /// Where selector state persists.
    pub store: Box<dyn KeyValueStore>,

    /// Run → colour, shared by the checkboxes and the chart.
    pub color_scale: ColorScale,

    /// Tag currently charted.
    pub tag: Option<String>,

    /// Tag filter text as typed; applied on commit.
    pub tag_filter_text: String,

    pub chart: SmoothedSeriesChart,

    /// Surfaces handed to the chart; the plot draws the latest one.
    pub scene: SceneProvider,

    /// Cursor x from the last frame, in x-axis units.
    pub hover_x: Option<f64>,

    /// Plot view should snap back to the chart domain next frame.
    pub view_reset_pending: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a file loading operation is in progress.
    pub loading: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

impl AppState {
    pub fn new(config: ViewerConfig) -> Self {
        let store: Box<dyn KeyValueStore> = match &config.storage_path {
            Some(path) => match JsonFileStore::open(path) {
                Ok(store) => Box::new(store),
                Err(e) => {
                    log::warn!("selection will not persist: {e}");
                    Box::new(MemoryStore::new())
                }
            },
            None => Box::new(MemoryStore::new()),
        };

        let color_scale = ColorScale::new(config.palette);
        let scene = SceneProvider::new();
        let mut chart =
            SmoothedSeriesChart::new(Box::new(scene.clone()), color_scale.color_fn())
                .with_build_delay(config.build_delay());
        chart.set_x_type(config.x_type);
        chart.set_y_scale_type(config.y_scale);
        chart.set_tooltip_sorting_method(config.tooltip_sorting);
        chart.set_tooltip_position(config.tooltip_position);
        let smoothing = config.smoothing();
        let ignore_outliers = config.ignore_outliers;

        let mut state = Self {
            config,
            dataset: None,
            selector: DataSelectRow::new(None, Experiment::default(), false),
            selection: Selection::default(),
            store,
            color_scale,
            tag: None,
            tag_filter_text: String::new(),
            chart,
            scene,
            hover_x: None,
            view_reset_pending: false,
            status_message: None,
            loading: false,
        };
        let result = state
            .chart
            .set_smoothing(smoothing.enabled, smoothing.weight)
            .and_then(|()| state.chart.set_outlier_ignoring(ignore_outliers));
        state.report(result);
        state.chart.attach();
        state
    }

    /// Ingest a newly loaded dataset: restore its selection, recolour runs,
    /// and chart the first matching tag.
    pub fn set_dataset(&mut self, dataset: ScalarDataset, source: &str) -> Result<()> {
        let runs = dataset.runs();
        let names: Vec<&str> = runs.iter().map(|r| r.name.as_str()).collect();
        self.color_scale.set_domain(&names);
        self.chart.set_color_fn(self.color_scale.color_fn());

        let experiment = Experiment {
            name: source.to_string(),
            start_time: runs
                .iter()
                .filter_map(|r| r.start_time)
                .min_by(|a, b| a.total_cmp(b)),
            ..Experiment::default()
        };
        let mut selector =
            DataSelectRow::new(Some(source.to_string()), experiment, false).with_run_coloring(true);
        selector.attach(self.store.as_ref())?;
        self.selection = selector.set_runs(runs, self.store.as_mut())?;
        self.tag_filter_text = selector.tag_regex().to_string();
        self.selector = selector;

        self.chart.clear_series()?;
        self.dataset = Some(dataset);
        self.tag = None;
        self.status_message = None;
        self.loading = false;
        self.refresh_tag();
        self.push_series()?;
        Ok(())
    }

    /// Tags of the loaded dataset passing the tag filter.
    pub fn matching_tags(&self) -> Vec<String> {
        let Some(ds) = &self.dataset else {
            return Vec::new();
        };
        let tags = ds.tags();
        match self.selection.matching_tags(tags.iter().map(String::as_str)) {
            Ok(tags) => tags.into_iter().map(str::to_string).collect(),
            Err(e) => {
                log::warn!("{e}");
                Vec::new()
            }
        }
    }

    pub fn set_tag(&mut self, tag: String) {
        if self.tag.as_deref() == Some(tag.as_str()) {
            return;
        }
        self.tag = Some(tag);
        let result = self.push_series();
        self.report(result);
    }

    pub fn toggle_run(&mut self, id: &str) {
        let result = self.selector.toggle_run(id, self.store.as_mut());
        self.apply_selection(result);
    }

    pub fn select_all_runs(&mut self) {
        let result = self.selector.select_all(self.store.as_mut());
        self.apply_selection(result);
    }

    pub fn select_no_runs(&mut self) {
        let result = self.selector.select_none(self.store.as_mut());
        self.apply_selection(result);
    }

    /// Commit `tag_filter_text` as the tag filter.
    pub fn commit_tag_filter(&mut self) {
        let pattern = self.tag_filter_text.clone();
        let result = self.selector.set_tag_regex(&pattern, self.store.as_mut());
        self.apply_selection(result);
    }

    /// Reset both the chart domain and the plot view.
    pub fn reset_view(&mut self) {
        let result = self.chart.reset_domain();
        self.report(result);
        self.view_reset_pending = true;
    }

    /// Record a failure for the status line.
    pub fn report<E: Into<anyhow::Error>>(&mut self, result: std::result::Result<(), E>) {
        if let Err(e) = result {
            let e = e.into();
            log::error!("{e:#}");
            self.status_message = Some(format!("Error: {e:#}"));
        }
    }

    fn apply_selection(&mut self, result: std::result::Result<Selection, SelectorError>) {
        match result {
            Ok(selection) => {
                self.selection = selection;
                self.status_message = None;
                self.refresh_tag();
                let result = self.push_series();
                self.report(result);
            }
            Err(e) => self.report(Err::<(), _>(e)),
        }
    }

    /// Keep the charted tag inside the filter.
    fn refresh_tag(&mut self) {
        let tags = self.matching_tags();
        let keep = self.tag.as_ref().is_some_and(|t| tags.contains(t));
        if !keep {
            self.tag = tags.into_iter().next();
        }
    }

    /// Send the selected runs' data for the current tag to the chart.
    fn push_series(&mut self) -> Result<(), ChartError> {
        let (Some(ds), Some(tag)) = (&self.dataset, &self.tag) else {
            return self.chart.set_visible_series::<String>(&[]);
        };

        let mut visible = Vec::new();
        for run in &self.selection.runs {
            let Some(data) = ds.data(&run.name, tag) else {
                continue;
            };
            self.chart.set_series_data(&run.name, data.to_vec())?;
            let metadata = BTreeMap::from([
                ("name".to_string(), MetadataValue::from(run.name.as_str())),
                ("tag".to_string(), MetadataValue::from(tag.as_str())),
            ]);
            self.chart.set_series_metadata(&run.name, metadata)?;
            visible.push(run.name.clone());
        }
        log::debug!("charting {tag} for {} runs", visible.len());
        self.chart.set_visible_series(&visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Datum;

    fn state() -> AppState {
        AppState::new(ViewerConfig {
            storage_path: None,
            ..ViewerConfig::default()
        })
    }

    fn dataset() -> ScalarDataset {
        let mut ds = ScalarDataset::default();
        for (run, offset) in [("a", 0.0), ("b", 1.0)] {
            for step in 0..5 {
                ds.push(run, "loss", Datum::new(step, step as f64, offset + step as f64));
                ds.push(run, "accuracy", Datum::new(step, step as f64, 0.1 * step as f64));
            }
        }
        ds
    }

    #[test]
    fn loading_selects_all_runs_and_first_tag() {
        let mut state = state();
        state.set_dataset(dataset(), "demo").unwrap();
        assert_eq!(state.selection.runs.len(), 2);
        assert_eq!(state.tag.as_deref(), Some("accuracy"));
        assert_eq!(state.chart.visible_series(), ["a", "b"]);
        assert_eq!(state.store.get("grdemo", ""), "$all");
    }

    #[test]
    fn loading_another_dataset_drops_the_previous_runs() {
        let mut state = state();
        state.set_dataset(dataset(), "first").unwrap();

        let mut second = ScalarDataset::default();
        for run in ["c", "d"] {
            for step in 0..3 {
                second.push(run, "loss", Datum::new(step, step as f64, step as f64));
            }
        }
        state.set_dataset(second, "second").unwrap();

        assert_eq!(state.chart.visible_series(), ["c", "d"]);
        let cached: Vec<&String> = state.chart.cache().names().collect();
        assert_eq!(cached, ["c", "d"]);
    }

    #[test]
    fn toggling_a_run_hides_its_series() {
        let mut state = state();
        state.set_dataset(dataset(), "demo").unwrap();
        state.toggle_run("0");
        assert_eq!(state.chart.visible_series(), ["b"]);
    }

    #[test]
    fn tag_filter_moves_the_charted_tag() {
        let mut state = state();
        state.set_dataset(dataset(), "demo").unwrap();
        state.tag_filter_text = "^lo".into();
        state.commit_tag_filter();
        assert_eq!(state.matching_tags(), ["loss"]);
        assert_eq!(state.tag.as_deref(), Some("loss"));
        assert_eq!(state.chart.cache().data("a").map(<[Datum]>::len), Some(5));

        state.tag_filter_text = "(".into();
        state.commit_tag_filter();
        assert!(state.status_message.is_some());
        assert_eq!(state.tag.as_deref(), Some("loss"));
    }
}
