//! Host-side tools for a vibratory friction rig
//!
//! This library talks to a rig that slides an object along a track with an
//! asymmetric vibration waveform while a linear encoder tracks the object
//! and a load cell measures the tangential force. The firmware streams
//! fixed-width binary records over a serial port; this crate decodes the
//! stream, logs it to CSV, and derives friction coefficients and slip
//! velocities from logged runs.
//!
//! # Quick Start
//!
//! ## Streaming Samples
//! ```no_run
//! use friction_rig::{FrictionRig, StreamControl, DEFAULT_BAUD_RATE};
//!
//! let mut rig = FrictionRig::open("/dev/ttyACM0", DEFAULT_BAUD_RATE)?;
//!
//! rig.stream(|sample| {
//!     println!("{:.3} mm  {:.3} N", sample.position, sample.force);
//!
//!     if sample.position > 12.0 {
//!         StreamControl::Break  // end of track
//!     } else {
//!         StreamControl::Continue
//!     }
//! })?;
//! # Ok::<(), friction_rig::RigError>(())
//! ```
//!
//! ## Logging a Run to CSV
//! ```no_run
//! use friction_rig::{CsvLogger, FrictionRig, StreamControl, DEFAULT_BAUD_RATE};
//!
//! let mut rig = FrictionRig::open("/dev/ttyACM0", DEFAULT_BAUD_RATE)?;
//! let mut logger = CsvLogger::create("run.csv")?;
//!
//! rig.stream(|sample| {
//!     if logger.append(&sample).is_err() {
//!         return StreamControl::Break;
//!     }
//!     StreamControl::Continue
//! })?;
//!
//! logger.flush()?;
//! # Ok::<(), friction_rig::RigError>(())
//! ```
//!
//! ## Loading a Logged Run
//! ```no_run
//! use friction_rig::LoggedRun;
//!
//! let run = LoggedRun::load("run.csv")?.trim(100, 50)?;
//! println!("{} samples over {:.2} s", run.len(), run.duration_secs());
//! # Ok::<(), friction_rig::RigError>(())
//! ```
//!
//! Friction coefficients, slip velocities, and chart rendering live in the
//! `analysis` and `plot` modules behind the `analysis` feature.

pub mod common;
pub mod csv_log;
pub mod error;
pub mod frame;
pub mod rig;

#[cfg(feature = "analysis")]
pub mod analysis;
#[cfg(feature = "analysis")]
pub mod plot;

// Re-export public API
pub use common::{create_bar, TimeKeeper};
pub use csv_log::{CsvLogger, LoggedRun, CSV_HEADER, FLUSH_THRESHOLD};
pub use error::{Result, RigError};
pub use frame::{RigSample, FRAME_SIZE};
pub use rig::{FrictionRig, StreamControl, DEFAULT_BAUD_RATE};
