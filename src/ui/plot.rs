use eframe::egui::{self, Color32, RichText, Sense, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Legend, Line, Plot, PlotPoints, VLine};

use crate::chart::axis::YScaleType;
use crate::chart::surface::{LineMark, MarkKind};
use crate::chart::tooltip::{TooltipPosition, TooltipRow};
use crate::state::AppState;

const TOOLTIP_BOTTOM_HEIGHT: f32 = 150.0;
const TOOLTIP_RIGHT_WIDTH: f32 = 320.0;

// ---------------------------------------------------------------------------
// Scalar chart (central panel)
// ---------------------------------------------------------------------------

/// Render the chart and its tooltip table in the central panel.
pub fn scalar_chart(ui: &mut Ui, state: &mut AppState) {
    if state.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view scalars  (File → Open…)");
        });
        return;
    }

    // The table shows the previous frame's hover; the panel has to be laid
    // out before the plot that fills the rest.
    let rows = state
        .hover_x
        .map(|x| state.chart.tooltip_rows(x))
        .unwrap_or_default();
    let titles: Vec<String> = state
        .chart
        .tooltip_columns()
        .map(|cols| cols.iter().map(|c| c.title.clone()).collect())
        .unwrap_or_default();

    match state.chart.tooltip_position() {
        TooltipPosition::Bottom => {
            egui::TopBottomPanel::bottom("tooltip_table")
                .exact_height(TOOLTIP_BOTTOM_HEIGHT)
                .show_inside(ui, |ui: &mut Ui| tooltip_table(ui, &titles, &rows));
        }
        TooltipPosition::Right => {
            egui::SidePanel::right("tooltip_table")
                .default_width(TOOLTIP_RIGHT_WIDTH)
                .show_inside(ui, |ui: &mut Ui| tooltip_table(ui, &titles, &rows));
        }
    }

    plot_scene(ui, state);
}

fn plot_scene(ui: &mut Ui, state: &mut AppState) {
    let Some(scene) = state.scene.current() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.spinner();
        });
        return;
    };
    let scene = scene.borrow();
    let Some(axes) = scene.axes else {
        return;
    };
    let x_type = axes.x_type;
    let y_scale = axes.y_scale;

    let mut plot = Plot::new("scalar_plot")
        .legend(Legend::default())
        .x_axis_label(x_type.label())
        .y_axis_label(state.tag.clone().unwrap_or_default())
        .x_axis_formatter(move |mark, _range| x_type.format(mark.value))
        .y_axis_formatter(move |mark, _range| y_scale.format(mark.value))
        .label_formatter(|_name, _point| String::new())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);

    if let (Some(x), Some(y)) = (scene.x_domain, scene.y_domain) {
        plot = plot
            .include_x(x.min)
            .include_x(x.max)
            .include_y(y_scale.transform(y.min))
            .include_y(y_scale.transform(y.max));
    }
    if state.view_reset_pending {
        plot = plot.reset();
        state.view_reset_pending = false;
    }

    let hover_x = state.hover_x;
    let response = plot.show(ui, |plot_ui| {
        for (_name, label, marks) in &scene.series {
            for mark in marks {
                for line in mark_lines(mark, y_scale) {
                    plot_ui.line(line.name(label));
                }
            }
        }
        if let Some(x) = hover_x {
            plot_ui.vline(VLine::new(x).color(Color32::from_gray(140)).width(1.0));
        }
        if plot_ui.response().hovered() {
            plot_ui.pointer_coordinate().map(|p| p.x)
        } else {
            None
        }
    });

    if response.inner != state.hover_x {
        state.hover_x = response.inner;
        ui.ctx().request_repaint();
    }
}

/// One plot line per run of finite points; NaN values break the line.
fn mark_lines(mark: &LineMark, y_scale: YScaleType) -> Vec<Line> {
    let (color, width) = match mark.kind {
        MarkKind::Ghost => (mark.color.gamma_multiply(0.35), 1.0_f32),
        MarkKind::Raw | MarkKind::Smoothed => (mark.color, 1.5),
    };
    mark.points
        .split(|[x, y]| !x.is_finite() || !y.is_finite())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let points: PlotPoints = segment
                .iter()
                .map(|&[x, y]| [x, y_scale.transform(y)])
                .collect();
            Line::new(points).color(color).width(width)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tooltip table
// ---------------------------------------------------------------------------

fn tooltip_table(ui: &mut Ui, titles: &[String], rows: &[TooltipRow]) {
    if rows.is_empty() {
        ui.weak("Hover the chart to inspect values.");
        return;
    }
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::exact(14.0))
        .columns(Column::auto().at_least(60.0), titles.len())
        .header(20.0, |mut header| {
            header.col(|_ui| {});
            for title in titles {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for row in rows {
                body.row(18.0, |mut table_row| {
                    table_row.col(|ui| {
                        let (rect, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), Sense::hover());
                        ui.painter().rect_filled(rect, 2.0, row.color);
                    });
                    for cell in &row.cells {
                        table_row.col(|ui| {
                            ui.label(RichText::new(cell).monospace());
                        });
                    }
                });
            }
        });
}
