//! Main GUI application

use crate::live::{self, ConnectResult};
use crate::state::{AppMode, AppState};
use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};
use friction_rig::{CsvLogger, LoggedRun};
use std::path::Path;
use std::sync::mpsc::TryRecvError;
use std::time::Instant;

/// Main application struct
pub struct RigPlotApp {
    state: AppState,
}

impl RigPlotApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            state: AppState::default(),
        }
    }

    /// Poll for new samples from the streaming thread
    fn poll_rig_data(&mut self) {
        if let Some(handle) = &self.state.live.rig_handle {
            loop {
                match handle.rx.try_recv() {
                    Ok(sample) => {
                        self.state.live.buffer.push(sample);

                        if self.state.live.is_recording {
                            if let Some(logger) = &mut self.state.live.logger {
                                if let Err(e) = logger.append(&sample) {
                                    self.state.ui.error =
                                        Some(format!("Recording failed: {}", e));
                                    self.state.live.is_recording = false;
                                }
                            }
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        // Thread died, clean up
                        self.disconnect_rig();
                        self.state.ui.error = Some("Rig connection lost".to_string());
                        break;
                    }
                }
            }
        }
    }

    /// Connect to the rig
    fn connect_rig(&mut self) {
        self.state.ui.error = None;
        self.state.ui.status = "Connecting...".to_string();

        let baud = match self.state.ui.baud_text.parse::<u32>() {
            Ok(baud) => baud,
            Err(_) => {
                self.state.ui.error =
                    Some(format!("Invalid baud rate: {}", self.state.ui.baud_text));
                return;
            }
        };

        match live::connect_rig(&self.state.ui.port_name, baud) {
            ConnectResult::Success(handle) => {
                self.state.live.rig_handle = Some(handle);
                self.state.live.buffer.clear();
                self.state.mode = AppMode::Live;
                self.state.ui.status = "Connected".to_string();
            }
            ConnectResult::Error(e) => {
                self.state.ui.error = Some(e);
                self.state.ui.status = "Connection failed".to_string();
            }
        }
    }

    /// Disconnect from the rig
    fn disconnect_rig(&mut self) {
        if let Some(handle) = self.state.live.rig_handle.take() {
            handle.stop();
            if let Some(thread) = handle.thread {
                let _ = thread.join();
            }
        }

        // Stop recording if active
        self.stop_recording();

        self.state.mode = AppMode::Idle;
        self.state.ui.status = "Disconnected".to_string();
    }

    /// Start recording to CSV
    fn start_recording(&mut self) {
        if self.state.live.is_recording {
            return;
        }

        let filename = format!(
            "rig_recording_{}.csv",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );

        match CsvLogger::create(&filename) {
            Ok(logger) => {
                self.state.live.logger = Some(logger);
                self.state.live.recording_start = Some(Instant::now());
                self.state.live.is_recording = true;
                self.state.ui.status = format!("Recording to {}", filename);
            }
            Err(e) => {
                self.state.ui.error = Some(format!("Failed to start recording: {}", e));
            }
        }
    }

    /// Stop recording and flush the tail batch
    fn stop_recording(&mut self) {
        if !self.state.live.is_recording {
            return;
        }

        if let Some(mut logger) = self.state.live.logger.take() {
            let samples = logger.sample_count();
            let path = logger.path().to_path_buf();
            if let Err(e) = logger.flush() {
                self.state.ui.error = Some(format!("Failed to flush recording: {}", e));
            } else {
                self.state.ui.status =
                    format!("Saved {} samples to {}", samples, path.display());
            }
        }

        self.state.live.is_recording = false;
        self.state.live.recording_start = None;
    }

    /// Load a logged run for playback
    fn load_file(&mut self, path: &Path) {
        match LoggedRun::load(path) {
            Ok(run) if run.is_empty() => {
                self.state.ui.error = Some(format!("{} contains no samples", path.display()));
            }
            Ok(run) => {
                self.state.ui.status = format!(
                    "Loaded {} samples ({:.1}s) from {}",
                    run.len(),
                    run.duration_secs(),
                    path.display()
                );
                self.state.file_run = Some(run);
                self.state.file_path = Some(path.to_path_buf());
                self.state.mode = AppMode::Playback;
                self.state.ui.error = None;
            }
            Err(e) => {
                self.state.ui.error = Some(format!("Failed to load file: {}", e));
            }
        }
    }

    /// Render the top toolbar
    fn render_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Friction Rig");
                ui.separator();

                let is_connected = self.state.mode == AppMode::Live;

                if is_connected {
                    if ui.button("⏹ Disconnect").clicked() {
                        self.disconnect_rig();
                    }
                    ui.label("🟢 Connected");
                } else {
                    ui.label("Port:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.state.ui.port_name)
                            .hint_text("/dev/ttyACM0")
                            .desired_width(140.0),
                    );
                    ui.label("Baud:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.state.ui.baud_text)
                            .desired_width(80.0),
                    );
                    if ui.button("▶ Connect").clicked() {
                        self.connect_rig();
                    }
                }

                ui.separator();

                if ui.button("📂 Open CSV").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("CSV Files", &["csv"])
                        .pick_file()
                    {
                        self.load_file(&path);
                    }
                }

                ui.separator();

                // Recording controls (only when connected)
                if is_connected {
                    if self.state.live.is_recording {
                        if ui.button("⏹ Stop Recording").clicked() {
                            self.stop_recording();
                        }

                        let elapsed = self
                            .state
                            .live
                            .recording_start
                            .map(|s| s.elapsed().as_secs())
                            .unwrap_or(0);
                        let samples = self
                            .state
                            .live
                            .logger
                            .as_ref()
                            .map(|l| l.sample_count())
                            .unwrap_or(0);
                        ui.label(format!(
                            "🔴 REC {:02}:{:02} | {} samples",
                            elapsed / 60,
                            elapsed % 60,
                            samples
                        ));
                    } else if ui.button("⏺ Start Recording").clicked() {
                        self.start_recording();
                    }
                }

                // Status on the right
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(error) = &self.state.ui.error {
                        ui.colored_label(egui::Color32::RED, error);
                    } else {
                        ui.label(&self.state.ui.status);
                    }
                });
            });
        });
    }

    /// Render the left sidebar
    fn render_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("sidebar")
            .resizable(true)
            .default_width(180.0)
            .show(ctx, |ui| {
                ui.heading("Mode");
                match self.state.mode {
                    AppMode::Idle => ui.label("⚪ Idle"),
                    AppMode::Live => ui.label("🟢 Live Streaming"),
                    AppMode::Playback => ui.label("📁 File Playback"),
                };
                ui.separator();

                ui.heading("Info");
                match self.state.mode {
                    AppMode::Live => {
                        ui.label(format!("Buffer: {} samples", self.state.live.buffer.len()));
                        if let Some(sample) = self.state.live.buffer.latest() {
                            ui.label(format!("Position: {:.3} mm", sample.position));
                            ui.label(format!("Force: {:.3} N", sample.force));
                            ui.label(format!("Time: {:.1}s", sample.position_time_secs()));
                        }
                    }
                    AppMode::Playback => {
                        if let Some(run) = &self.state.file_run {
                            ui.label(format!("Samples: {}", run.len()));
                            ui.label(format!("Duration: {:.1}s", run.duration_secs()));
                        }
                        if let Some(path) = &self.state.file_path {
                            ui.label(
                                path.file_name()
                                    .map(|n| n.to_string_lossy().into_owned())
                                    .unwrap_or_default(),
                            );
                        }
                    }
                    AppMode::Idle => {
                        ui.label("No data");
                    }
                }
                ui.separator();

                if self.state.mode == AppMode::Live {
                    ui.heading("Live View");
                    ui.horizontal(|ui| {
                        ui.label("Window:");
                        ui.add(
                            egui::Slider::new(&mut self.state.live.time_window, 0.25..=30.0)
                                .suffix("s")
                                .logarithmic(true),
                        );
                    });
                    ui.checkbox(&mut self.state.live.paused, "Pause display");
                    if ui.button("Clear buffer").clicked() {
                        self.state.live.buffer.clear();
                    }
                }
            });
    }

    /// Render the main content area
    fn render_main_content(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| match self.state.mode {
            AppMode::Live => self.render_live_view(ui),
            AppMode::Playback => self.render_playback(ui),
            AppMode::Idle => {
                ui.centered_and_justified(|ui| {
                    ui.vertical_centered(|ui| {
                        ui.heading("Not Connected");
                        ui.label("Enter a port and click Connect, or open a logged CSV.");
                    });
                });
            }
        });
    }

    /// Render scrolling live plots
    fn render_live_view(&mut self, ui: &mut egui::Ui) {
        let window = self.state.live.time_window;
        let samples = self.state.live.buffer.get_window(window);

        if samples.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label("Waiting for data...");
            });
            return;
        }

        let available_height = ui.available_height();

        ui.label("Position (mm)");
        let position_plot = Plot::new("live_position")
            .height(available_height * 0.45)
            .allow_zoom(false)
            .allow_drag(false)
            .x_axis_label("Time (s)")
            .legend(egui_plot::Legend::default());

        position_plot.show(ui, |plot_ui| {
            let points: PlotPoints = samples
                .iter()
                .map(|s| [s.position_time_secs(), s.position as f64])
                .collect();
            plot_ui.line(
                Line::new(points)
                    .name("Position")
                    .color(egui::Color32::from_rgb(255, 100, 100))
                    .width(1.5),
            );
        });

        ui.add_space(5.0);

        ui.label("Force (N)");
        let force_plot = Plot::new("live_force")
            .height(available_height * 0.45)
            .allow_zoom(false)
            .allow_drag(false)
            .x_axis_label("Time (s)")
            .legend(egui_plot::Legend::default());

        force_plot.show(ui, |plot_ui| {
            let points: PlotPoints = samples
                .iter()
                .map(|s| [s.force_time_secs(), s.force as f64])
                .collect();
            plot_ui.line(
                Line::new(points)
                    .name("Force")
                    .color(egui::Color32::from_rgb(100, 100, 255))
                    .width(1.5),
            );
        });
    }

    /// Render a loaded run
    fn render_playback(&mut self, ui: &mut egui::Ui) {
        let Some(run) = &self.state.file_run else {
            ui.centered_and_justified(|ui| {
                ui.label("No run loaded.");
            });
            return;
        };

        let available_height = ui.available_height();

        ui.heading("Position (mm)");
        let position_plot = Plot::new("playback_position")
            .height(available_height * 0.45)
            .allow_zoom(true)
            .allow_drag(true)
            .x_axis_label("Time (s)")
            .legend(egui_plot::Legend::default());

        position_plot.show(ui, |plot_ui| {
            let points: PlotPoints = run
                .position_time
                .iter()
                .zip(run.position.iter())
                .map(|(&t, &p)| [t, p])
                .collect();
            plot_ui.line(
                Line::new(points)
                    .name("Position")
                    .color(egui::Color32::from_rgb(255, 100, 100))
                    .width(1.5),
            );
        });

        ui.add_space(10.0);

        ui.heading("Force (N)");
        let force_plot = Plot::new("playback_force")
            .height(available_height * 0.45)
            .allow_zoom(true)
            .allow_drag(true)
            .x_axis_label("Time (s)")
            .legend(egui_plot::Legend::default());

        force_plot.show(ui, |plot_ui| {
            let points: PlotPoints = run
                .force_time
                .iter()
                .zip(run.force.iter())
                .map(|(&t, &f)| [t, f])
                .collect();
            plot_ui.line(
                Line::new(points)
                    .name("Force")
                    .color(egui::Color32::from_rgb(100, 100, 255))
                    .width(1.5),
            );
        });
    }
}

impl eframe::App for RigPlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Drain the channel every frame; recording must not stall while the
        // display is paused
        self.poll_rig_data();

        self.render_toolbar(ctx);
        self.render_sidebar(ctx);
        self.render_main_content(ctx);

        // Keep redrawing while streaming even without input events
        if self.state.mode == AppMode::Live && !self.state.live.paused {
            ctx.request_repaint_after(std::time::Duration::from_millis(16));
        }
    }
}
