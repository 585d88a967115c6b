//! Serial acquisition interface to the vibratory friction rig
//!
//! The rig firmware streams fixed-width binary records (see [`crate::frame`])
//! at a fixed rate of roughly 1 kHz. This module owns the serial handle and
//! the read loop: it polls the driver for a full frame's worth of bytes,
//! reads exactly one frame at a time, and hands decoded samples to a
//! caller-supplied callback. Reading whole frames only is what keeps the
//! stream aligned; there is no sync marker to recover from a partial read.

use crate::error::{Result, RigError};
use crate::frame::{RigSample, FRAME_SIZE};
use std::io::Read;
use std::time::{Duration, Instant};

/// Baud rate used by the rig firmware
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial read timeout for a single frame
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Sleep between polls when no full frame is waiting
const IDLE_POLL: Duration = Duration::from_micros(200);

/// Control flow for streaming operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    /// Continue streaming
    Continue,
    /// Stop streaming
    Break,
}

/// Connection to the rig's serial stream
pub struct FrictionRig {
    port: Box<dyn serialport::SerialPort>,
}

impl FrictionRig {
    /// Open the rig's serial port
    ///
    /// # Arguments
    /// * `port_name` - Serial device path, e.g. `/dev/ttyACM0`
    /// * `baud_rate` - Line speed; the firmware uses [`DEFAULT_BAUD_RATE`]
    ///
    /// # Returns
    /// * `Ok(FrictionRig)` - Open connection
    /// * `Err(RigError)` - If the port cannot be opened
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;

        Ok(FrictionRig { port })
    }

    /// List serial ports present on the system
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - Device paths, e.g. `/dev/ttyACM0`
    /// * `Err(RigError::NoPortsFound)` - If the system reports none
    pub fn available_ports() -> Result<Vec<String>> {
        let ports = serialport::available_ports()?;
        if ports.is_empty() {
            return Err(RigError::NoPortsFound);
        }

        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    /// Name of the underlying serial device, if the driver reports one
    pub fn port_name(&self) -> Option<String> {
        self.port.name()
    }

    /// Try to read one sample without blocking on a partial frame
    ///
    /// Polls the driver's receive buffer; only when at least [`FRAME_SIZE`]
    /// bytes are waiting does it read exactly one frame and decode it.
    ///
    /// # Returns
    /// * `Ok(Some(RigSample))` - A full frame was waiting and decoded
    /// * `Ok(None)` - Less than one frame is buffered; try again later
    /// * `Err(RigError)` - Serial communication failed
    pub fn read_sample(&mut self) -> Result<Option<RigSample>> {
        let available = self.port.bytes_to_read()? as usize;
        if available < FRAME_SIZE {
            return Ok(None);
        }

        let mut buf = [0u8; FRAME_SIZE];
        self.port.read_exact(&mut buf)?;

        Ok(Some(RigSample::decode(&buf)?))
    }

    /// Stream samples to a callback until it asks to stop
    ///
    /// The loop polls for full frames and sleeps briefly when none is
    /// waiting. A serial failure aborts the loop and is returned to the
    /// caller; there are no retries.
    ///
    /// # Arguments
    /// * `callback` - Called once per sample. Return `StreamControl::Continue`
    ///                to keep streaming or `StreamControl::Break` to stop.
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of samples delivered before stopping
    /// * `Err(RigError)` - If a read error occurs
    ///
    /// # Example
    /// ```no_run
    /// use friction_rig::{FrictionRig, StreamControl, DEFAULT_BAUD_RATE};
    ///
    /// let mut rig = FrictionRig::open("/dev/ttyACM0", DEFAULT_BAUD_RATE)?;
    /// let mut peak_force = 0.0f32;
    ///
    /// rig.stream(|sample| {
    ///     peak_force = peak_force.max(sample.force.abs());
    ///     if sample.position > 12.0 {
    ///         StreamControl::Break  // carriage reached end of travel
    ///     } else {
    ///         StreamControl::Continue
    ///     }
    /// })?;
    /// # Ok::<(), friction_rig::RigError>(())
    /// ```
    pub fn stream<F>(&mut self, mut callback: F) -> Result<u64>
    where
        F: FnMut(RigSample) -> StreamControl,
    {
        let mut count = 0u64;

        loop {
            match self.read_sample()? {
                Some(sample) => {
                    count += 1;
                    if callback(sample) == StreamControl::Break {
                        break;
                    }
                }
                None => std::thread::sleep(IDLE_POLL),
            }
        }

        Ok(count)
    }

    /// Stream samples for a fixed duration
    ///
    /// # Arguments
    /// * `duration` - How long to stream
    /// * `callback` - Called once per sample
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of samples delivered
    /// * `Err(RigError)` - If a read error occurs
    pub fn stream_for<F>(&mut self, duration: Duration, mut callback: F) -> Result<u64>
    where
        F: FnMut(RigSample),
    {
        let end_time = Instant::now() + duration;

        self.stream(|sample| {
            callback(sample);
            if Instant::now() >= end_time {
                StreamControl::Break
            } else {
                StreamControl::Continue
            }
        })
    }

    /// Collect a fixed number of samples
    ///
    /// # Arguments
    /// * `num_samples` - Number of samples to collect
    ///
    /// # Returns
    /// * `Ok(Vec<RigSample>)` - Collected samples
    /// * `Err(RigError)` - If a read error occurs
    pub fn collect_samples(&mut self, num_samples: usize) -> Result<Vec<RigSample>> {
        let mut samples = Vec::with_capacity(num_samples);

        self.stream(|sample| {
            samples.push(sample);
            if samples.len() >= num_samples {
                StreamControl::Break
            } else {
                StreamControl::Continue
            }
        })?;

        Ok(samples)
    }
}
