//! Wire format for the rig's serial stream
//!
//! The rig firmware emits one fixed-width binary record per sampling tick:
//! two little-endian (timestamp, value) pairs, 16 bytes total. The first
//! pair is the object position from the linear encoder, the second the
//! tangential force from the load cell.

use crate::error::{Result, RigError};

/// Size of one serial record in bytes
pub const FRAME_SIZE: usize = 16;

/// One decoded sample from the rig
///
/// Field layout on the wire (all little-endian):
/// * bytes 0..4:   position timestamp, µs since firmware boot
/// * bytes 4..8:   object position, mm
/// * bytes 8..12:  force timestamp, µs since firmware boot
/// * bytes 12..16: tangential force, N
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigSample {
    /// Position timestamp (µs since firmware boot)
    pub position_timestamp: u32,
    /// Object position (mm)
    pub position: f32,
    /// Force timestamp (µs since firmware boot)
    pub force_timestamp: u32,
    /// Tangential force (N)
    pub force: f32,
}

impl RigSample {
    /// Decode one sample from raw serial bytes
    ///
    /// # Returns
    /// * `Ok(RigSample)` - Decoded sample
    /// * `Err(RigError::ShortFrame)` - If fewer than [`FRAME_SIZE`] bytes are given
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FRAME_SIZE {
            return Err(RigError::ShortFrame {
                expected: FRAME_SIZE,
                actual: bytes.len(),
            });
        }

        let position_timestamp = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let position = f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let force_timestamp = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let force = f32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

        Ok(RigSample {
            position_timestamp,
            position,
            force_timestamp,
            force,
        })
    }

    /// Position timestamp in seconds
    pub fn position_time_secs(&self) -> f64 {
        self.position_timestamp as f64 / 1e6
    }

    /// Force timestamp in seconds
    pub fn force_time_secs(&self) -> f64 {
        self.force_timestamp as f64 / 1e6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(position_timestamp: u32, position: f32, force_timestamp: u32, force: f32) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FRAME_SIZE);
        bytes.extend_from_slice(&position_timestamp.to_le_bytes());
        bytes.extend_from_slice(&position.to_le_bytes());
        bytes.extend_from_slice(&force_timestamp.to_le_bytes());
        bytes.extend_from_slice(&force.to_le_bytes());
        bytes
    }

    #[test]
    fn test_decode_known_frame() {
        let bytes = pack(1_500_000, 4.25, 1_500_210, -9.5);
        let sample = RigSample::decode(&bytes).unwrap();

        assert_eq!(sample.position_timestamp, 1_500_000);
        assert_eq!(sample.position, 4.25);
        assert_eq!(sample.force_timestamp, 1_500_210);
        assert_eq!(sample.force, -9.5);
    }

    #[test]
    fn test_decode_short_slice_is_error() {
        let bytes = pack(0, 0.0, 0, 0.0);
        let err = RigSample::decode(&bytes[..10]).unwrap_err();
        match err {
            RigError::ShortFrame { expected, actual } => {
                assert_eq!(expected, FRAME_SIZE);
                assert_eq!(actual, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_timestamp_conversion() {
        let bytes = pack(2_500_000, 0.0, 3_000_000, 0.0);
        let sample = RigSample::decode(&bytes).unwrap();
        assert!((sample.position_time_secs() - 2.5).abs() < 1e-9);
        assert!((sample.force_time_secs() - 3.0).abs() < 1e-9);
    }
}
