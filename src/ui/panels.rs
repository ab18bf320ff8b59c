use std::path::Path;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::chart::axis::{XType, YScaleType};
use crate::chart::tooltip::{TooltipPosition, TooltipSortingMethod};
use crate::state::AppState;

/// Upper end of the smoothing slider; a weight of 1 flattens everything.
const MAX_SLIDER_WEIGHT: f64 = 0.999;

// ---------------------------------------------------------------------------
// Left side panel – runs, tags and chart settings
// ---------------------------------------------------------------------------

/// Render the left settings panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            chart_settings(ui, state);
            ui.separator();

            if state.dataset.is_none() {
                ui.label("No dataset loaded.");
                return;
            }
            tag_section(ui, state);
            ui.separator();
            run_section(ui, state);
        });
}

fn chart_settings(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Chart");

    // ---- Smoothing ----
    let smoothing = state.chart.smoothing();
    let mut enabled = smoothing.enabled;
    let mut weight = smoothing.weight;
    ui.horizontal(|ui: &mut Ui| {
        ui.checkbox(&mut enabled, "Smoothing");
        ui.add_enabled(
            enabled,
            egui::Slider::new(&mut weight, 0.0..=MAX_SLIDER_WEIGHT).fixed_decimals(3),
        );
    });
    if enabled != smoothing.enabled || weight != smoothing.weight {
        let result = state.chart.set_smoothing(enabled, weight);
        state.report(result);
    }

    // ---- Axes ----
    let mut x_type = state.chart.x_type();
    egui::ComboBox::from_label("Horizontal axis")
        .selected_text(x_type.label())
        .show_ui(ui, |ui: &mut Ui| {
            for option in XType::ALL {
                ui.selectable_value(&mut x_type, option, option.label());
            }
        });
    state.chart.set_x_type(x_type);

    let mut y_scale = state.chart.y_scale_type();
    ui.horizontal(|ui: &mut Ui| {
        ui.radio_value(&mut y_scale, YScaleType::Linear, "Linear");
        ui.radio_value(&mut y_scale, YScaleType::Log, "Log");
    });
    state.chart.set_y_scale_type(y_scale);

    let mut ignore = state.chart.ignores_outliers();
    if ui
        .checkbox(&mut ignore, "Ignore outliers in chart scaling")
        .changed()
    {
        let result = state.chart.set_outlier_ignoring(ignore);
        state.report(result);
    }

    // ---- Tooltip ----
    let mut sorting = state.chart.tooltip_sorting_method();
    egui::ComboBox::from_label("Tooltip sorting")
        .selected_text(sorting.label())
        .show_ui(ui, |ui: &mut Ui| {
            for option in TooltipSortingMethod::ALL {
                ui.selectable_value(&mut sorting, option, option.label());
            }
        });
    if sorting != state.chart.tooltip_sorting_method() {
        state.chart.set_tooltip_sorting_method(sorting);
    }

    let mut position = state.chart.tooltip_position();
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Tooltip");
        ui.radio_value(&mut position, TooltipPosition::Bottom, "Bottom");
        ui.radio_value(&mut position, TooltipPosition::Right, "Right");
    });
    if position != state.chart.tooltip_position() {
        state.chart.set_tooltip_position(position);
    }

    if ui.button("Reset view").clicked() {
        state.reset_view();
    }
}

fn tag_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Tags");
    let response = ui.add(
        egui::TextEdit::singleline(&mut state.tag_filter_text).hint_text("Filter tags (regex)"),
    );
    if response.lost_focus() && state.tag_filter_text != state.selector.tag_regex() {
        state.commit_tag_filter();
    }

    let tags = state.matching_tags();
    let current = state.tag.clone().unwrap_or_default();
    egui::ComboBox::from_id_salt("tag_picker")
        .selected_text(&current)
        .show_ui(ui, |ui: &mut Ui| {
            for tag in tags {
                if ui.selectable_label(current == tag, &tag).clicked() {
                    state.set_tag(tag);
                }
            }
        });
}

fn run_section(ui: &mut Ui, state: &mut AppState) {
    let selected = state.selector.runs_selection_state();
    let n_selected = selected.values().filter(|on| **on).count();
    ui.strong(format!("Runs  ({n_selected}/{})", selected.len()));

    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("All").clicked() {
            state.select_all_runs();
        }
        if ui.small_button("None").clicked() {
            state.select_no_runs();
        }
    });

    let runs = state.selector.runs().to_vec();
    for ((id, title), run) in state.selector.run_options().into_iter().zip(&runs) {
        let mut checked = selected.get(&id).copied().unwrap_or(false);
        let mut text = RichText::new(title);
        if let Some(color) = state.selector.run_color(run, &state.color_scale) {
            text = text.color(color);
        }
        if ui.checkbox(&mut checked, text).changed() {
            state.toggle_run(&id);
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{}: {} runs, {} points, {} shown",
                state.selector.experiment().name,
                ds.series.len(),
                ds.len(),
                state.chart.visible_series().len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open scalar logs")
        .add_filter("Supported files", &["parquet", "pq", "json", "csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        open_path(state, &path);
    }
}

/// Load `path` and show it; failures end up on the status line.
pub fn open_path(state: &mut AppState, path: &Path) {
    state.loading = true;
    let source = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scalars")
        .to_string();
    let result = crate::data::loader::load_file(path)
        .and_then(|dataset| state.set_dataset(dataset, &source));
    state.loading = false;
    state.report(result);
}
