//! Rig streaming thread management

use crate::state::RigHandle;
use friction_rig::{FrictionRig, RigSample, StreamControl};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

/// Result of attempting to connect to the rig
pub enum ConnectResult {
    Success(RigHandle),
    Error(String),
}

/// Open the rig's serial port and start streaming in a background thread
///
/// The port is opened on the caller's thread so a bad device path fails
/// immediately; the open handle then moves into the reader thread.
pub fn connect_rig(port_name: &str, baud_rate: u32) -> ConnectResult {
    let rig = match FrictionRig::open(port_name, baud_rate) {
        Ok(rig) => rig,
        Err(e) => return ConnectResult::Error(format!("Failed to open {}: {}", port_name, e)),
    };

    let (tx, rx) = mpsc::channel::<RigSample>();
    let stop_signal = Arc::new(AtomicBool::new(false));
    let stop_clone = stop_signal.clone();

    let thread = thread::spawn(move || {
        run_rig_thread(rig, tx, stop_clone);
    });

    ConnectResult::Success(RigHandle::new(rx, stop_signal, thread))
}

/// Reader thread main loop
fn run_rig_thread(mut rig: FrictionRig, tx: Sender<RigSample>, stop_signal: Arc<AtomicBool>) {
    let result = rig.stream(|sample| {
        if stop_signal.load(Ordering::Relaxed) {
            return StreamControl::Break;
        }

        if tx.send(sample).is_err() {
            // Receiver dropped, stop streaming
            return StreamControl::Break;
        }

        StreamControl::Continue
    });

    if let Err(e) = result {
        eprintln!("Rig thread: stream error: {}", e);
    }
}
