//! Live plotting GUI for the friction rig
//!
//! Scrolling position and force plots for monitoring an experiment as it
//! runs, with CSV recording and playback of logged runs.

mod app;
mod live;
mod state;

use app::RigPlotApp;

fn main() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 700.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Friction Rig Live Plot",
        options,
        Box::new(|cc| Ok(Box::new(RigPlotApp::new(cc)))),
    )
}
