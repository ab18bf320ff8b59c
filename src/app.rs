use std::path::Path;

use eframe::egui;

use crate::chart::ChartEvent;
use crate::config::ViewerConfig;
use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RunLensApp {
    pub state: AppState,
}

impl Default for RunLensApp {
    fn default() -> Self {
        Self {
            state: AppState::default(),
        }
    }
}

impl RunLensApp {
    pub fn new(config: ViewerConfig, initial_file: Option<&Path>) -> Self {
        let mut state = AppState::new(config);
        if let Some(path) = initial_file {
            panels::open_path(&mut state, path);
        }
        Self { state }
    }

    /// Fire a due chart build and keep frames coming while one is pending.
    fn drive_chart(&mut self, ctx: &egui::Context) {
        let result = self.state.chart.tick();
        self.state.report(result);
        for event in self.state.chart.drain_events() {
            match event {
                ChartEvent::Attached => {
                    log::debug!("chart attached");
                    self.state.hover_x = None;
                }
            }
        }
        if let Some(wait) = self.state.chart.time_until_build() {
            ctx.request_repaint_after(wait);
        }
    }
}

impl eframe::App for RunLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drive_chart(ctx);

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: runs, tags, settings ----
        egui::SidePanel::left("settings_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: chart ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::scalar_chart(ui, &mut self.state);
        });

        // Settings changed this frame may have scheduled a build.
        if let Some(wait) = self.state.chart.time_until_build() {
            ctx.request_repaint_after(wait);
        }
    }
}
