use eframe::egui;
use runlens::app::RunLensApp;
use runlens::config::ViewerConfig;

fn main() -> eframe::Result {
    env_logger::init();

    let config = ViewerConfig::load().unwrap_or_else(|e| {
        log::error!("{e}; falling back to defaults");
        ViewerConfig::default()
    });
    // A file given on the command line is opened at startup.
    let initial_file = std::env::args_os().nth(1).map(std::path::PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "runlens – Scalar Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(RunLensApp::new(config, initial_file.as_deref())))),
    )
}
