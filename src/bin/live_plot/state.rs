//! Application state management

use friction_rig::{CsvLogger, LoggedRun, RigSample, DEFAULT_BAUD_RATE};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// Main application state
pub struct AppState {
    /// Current application mode
    pub mode: AppMode,

    /// Live streaming state
    pub live: LiveState,

    /// Loaded run for playback
    pub file_path: Option<PathBuf>,
    pub file_run: Option<LoggedRun>,

    /// UI state
    pub ui: UiState,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Idle,
            live: LiveState::default(),
            file_path: None,
            file_run: None,
            ui: UiState::default(),
        }
    }
}

/// Application mode
#[derive(Default, PartialEq, Clone, Copy)]
pub enum AppMode {
    #[default]
    Idle,     // No connection, no file
    Live,     // Connected to the rig
    Playback, // Viewing a logged run
}

/// Live streaming state
pub struct LiveState {
    /// Rig thread handle
    pub rig_handle: Option<RigHandle>,

    /// Circular buffer for live data
    pub buffer: CircularBuffer,

    /// Recording state
    pub is_recording: bool,
    pub recording_start: Option<Instant>,
    pub logger: Option<CsvLogger>,

    /// Display is paused (buffer still fills)
    pub paused: bool,

    /// Time window to display (seconds)
    pub time_window: f64,
}

impl Default for LiveState {
    fn default() -> Self {
        Self {
            rig_handle: None,
            buffer: CircularBuffer::new(20_000), // ~20 seconds at 1 kHz
            is_recording: false,
            recording_start: None,
            logger: None,
            paused: false,
            time_window: 2.0,
        }
    }
}

/// Handle to the rig streaming thread
pub struct RigHandle {
    pub rx: Receiver<RigSample>,
    pub stop_signal: Arc<AtomicBool>,
    pub thread: Option<JoinHandle<()>>,
}

impl RigHandle {
    pub fn new(rx: Receiver<RigSample>, stop_signal: Arc<AtomicBool>, thread: JoinHandle<()>) -> Self {
        Self {
            rx,
            stop_signal,
            thread: Some(thread),
        }
    }

    /// Signal the thread to stop
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }
}

/// Circular buffer for live samples
pub struct CircularBuffer {
    data: VecDeque<RigSample>,
    max_samples: usize,
}

impl CircularBuffer {
    pub fn new(max_samples: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn push(&mut self, sample: RigSample) {
        if self.data.len() >= self.max_samples {
            self.data.pop_front();
        }
        self.data.push_back(sample);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get samples within the last `window_secs` of the position clock
    pub fn get_window(&self, window_secs: f64) -> Vec<&RigSample> {
        let Some(latest) = self.data.back() else {
            return vec![];
        };
        let cutoff = latest.position_time_secs() - window_secs;

        self.data
            .iter()
            .filter(|s| s.position_time_secs() >= cutoff)
            .collect()
    }

    /// Get the latest sample
    pub fn latest(&self) -> Option<&RigSample> {
        self.data.back()
    }
}

/// UI-specific state
pub struct UiState {
    /// Serial port path entered by the operator
    pub port_name: String,

    /// Baud rate entered by the operator
    pub baud_text: String,

    /// Status message
    pub status: String,

    /// Connection error message
    pub error: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_text: DEFAULT_BAUD_RATE.to_string(),
            status: String::from("Ready"),
            error: None,
        }
    }
}
