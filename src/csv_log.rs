//! CSV persistence for logged acquisition runs
//!
//! The write side batches decoded samples in memory and flushes them to disk
//! every [`FLUSH_THRESHOLD`] lines so the read loop never waits on the
//! filesystem. The read side loads a logged run into column vectors with
//! timestamps converted to seconds and re-zeroed on the first sample, which
//! is the convention every analysis expects.

use crate::error::{Result, RigError};
use crate::frame::RigSample;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Column order of a logged run
pub const CSV_HEADER: [&str; 4] = ["position_timestamp", "position", "force_timestamp", "force"];

/// Number of buffered lines that triggers a write-out
pub const FLUSH_THRESHOLD: usize = 500;

/// Batching CSV writer for live acquisition
pub struct CsvLogger {
    writer: csv::Writer<File>,
    pending: Vec<RigSample>,
    sample_count: usize,
    path: PathBuf,
}

impl CsvLogger {
    /// Create a new log file and write the column header
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = csv::Writer::from_writer(File::create(&path)?);
        writer.write_record(CSV_HEADER)?;
        writer.flush()?;

        Ok(CsvLogger {
            writer,
            pending: Vec::with_capacity(FLUSH_THRESHOLD),
            sample_count: 0,
            path,
        })
    }

    /// Buffer one sample, flushing the batch once it reaches [`FLUSH_THRESHOLD`]
    pub fn append(&mut self, sample: &RigSample) -> Result<()> {
        self.pending.push(*sample);
        self.sample_count += 1;

        if self.pending.len() >= FLUSH_THRESHOLD {
            self.write_pending()?;
        }

        Ok(())
    }

    /// Write out any buffered samples and sync the file
    pub fn flush(&mut self) -> Result<()> {
        self.write_pending()
    }

    /// Total samples appended so far
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        for sample in self.pending.drain(..) {
            self.writer.write_record([
                sample.position_timestamp.to_string(),
                sample.position.to_string(),
                sample.force_timestamp.to_string(),
                sample.force.to_string(),
            ])?;
        }
        self.writer.flush()?;

        Ok(())
    }
}

impl Drop for CsvLogger {
    fn drop(&mut self) {
        // Backstop: the tail batch must reach disk even on an abnormal exit
        let _ = self.write_pending();
    }
}

/// A logged run loaded into column vectors
///
/// Times are in seconds relative to the run's first sample; positions in mm,
/// forces in N.
#[derive(Debug, Clone, Default)]
pub struct LoggedRun {
    pub position_time: Vec<f64>,
    pub position: Vec<f64>,
    pub force_time: Vec<f64>,
    pub force: Vec<f64>,
}

impl LoggedRun {
    /// Load a logged run from a CSV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path.as_ref())?;

        let mut position_ts = Vec::new();
        let mut position = Vec::new();
        let mut force_ts = Vec::new();
        let mut force = Vec::new();

        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if record.len() < 4 {
                return Err(RigError::MalformedRecord {
                    line,
                    reason: format!("expected 4 fields, got {}", record.len()),
                });
            }

            position_ts.push(parse_field(&record, 0, line)?);
            position.push(parse_field(&record, 1, line)?);
            force_ts.push(parse_field(&record, 2, line)?);
            force.push(parse_field(&record, 3, line)?);
        }

        // Timestamps arrive in µs since firmware boot; re-zero on the first
        // sample and convert to seconds.
        let position_time = rezero_to_secs(&position_ts);
        let force_time = rezero_to_secs(&force_ts);

        Ok(LoggedRun {
            position_time,
            position,
            force_time,
            force,
        })
    }

    pub fn len(&self) -> usize {
        self.position_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position_time.is_empty()
    }

    /// Duration of the run in seconds (position clock)
    pub fn duration_secs(&self) -> f64 {
        match (self.position_time.first(), self.position_time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Drop `lower` samples from the head and `upper` from the tail
    ///
    /// Runs are trimmed by hand-picked index margins to cut the ramp-up and
    /// ring-down around the steady-sliding stretch.
    pub fn trim(&self, lower: usize, upper: usize) -> Result<LoggedRun> {
        if lower + upper >= self.len() {
            return Err(RigError::InsufficientData(format!(
                "trim ({lower}, {upper}) leaves no samples of {}",
                self.len()
            )));
        }

        Ok(self.slice(lower, self.len() - upper))
    }

    /// Flip the sign of every force sample
    ///
    /// Runs recorded with the load cell mounted in compression log negative
    /// force for a positive drag.
    pub fn invert_forces(&mut self) {
        for f in &mut self.force {
            *f = -*f;
        }
    }

    /// Keep the stretch where the object travels between two positions
    ///
    /// Selects from the first sample above `lo` mm to the last sample below
    /// `hi` mm, the single-cutoff selection used when a run sweeps the whole
    /// track once.
    pub fn clip_to_position_band(&self, lo: f64, hi: f64) -> Result<LoggedRun> {
        let start = self
            .position
            .iter()
            .position(|&p| p > lo)
            .unwrap_or(0);
        let end = self
            .position
            .iter()
            .rposition(|&p| p < hi)
            .unwrap_or_else(|| self.len().saturating_sub(1));

        if start >= end {
            return Err(RigError::InsufficientData(format!(
                "position band ({lo}, {hi}) mm selects no samples"
            )));
        }

        Ok(self.slice(start, end + 1))
    }

    /// Segment a multi-trial capture at carriage re-homing jumps
    ///
    /// A downward position step larger than `threshold` mm marks the start of
    /// the next trial. Each segment's clocks are re-zeroed on its first
    /// sample.
    pub fn split_on_position_reset(&self, threshold: f64) -> Vec<LoggedRun> {
        let mut boundaries = vec![0];
        for i in 1..self.len() {
            if self.position[i] - self.position[i - 1] < -threshold {
                boundaries.push(i);
            }
        }
        boundaries.push(self.len());

        let mut segments = Vec::with_capacity(boundaries.len() - 1);
        for pair in boundaries.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            if start >= end {
                continue;
            }
            let mut segment = self.slice(start, end);
            let t0_pos = segment.position_time[0];
            let t0_force = segment.force_time[0];
            for t in &mut segment.position_time {
                *t -= t0_pos;
            }
            for t in &mut segment.force_time {
                *t -= t0_force;
            }
            segments.push(segment);
        }

        segments
    }

    fn slice(&self, start: usize, end: usize) -> LoggedRun {
        LoggedRun {
            position_time: self.position_time[start..end].to_vec(),
            position: self.position[start..end].to_vec(),
            force_time: self.force_time[start..end].to_vec(),
            force: self.force[start..end].to_vec(),
        }
    }
}

fn parse_field(record: &csv::StringRecord, index: usize, line: u64) -> Result<f64> {
    record[index]
        .trim()
        .parse::<f64>()
        .map_err(|e| RigError::MalformedRecord {
            line,
            reason: format!("field {}: {}", CSV_HEADER[index], e),
        })
}

fn rezero_to_secs(timestamps_us: &[f64]) -> Vec<f64> {
    match timestamps_us.first() {
        Some(&t0) => timestamps_us.iter().map(|&t| (t - t0) / 1e6).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_csv_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("friction_rig_{}_{}.csv", tag, std::process::id()))
    }

    fn sample(ts: u32, position: f32, force: f32) -> RigSample {
        RigSample {
            position_timestamp: ts,
            position,
            force_timestamp: ts + 100,
            force,
        }
    }

    #[test]
    fn test_logger_roundtrip() {
        let path = temp_csv_path("roundtrip");

        {
            let mut logger = CsvLogger::create(&path).unwrap();
            logger.append(&sample(1_000_000, 1.5, -2.0)).unwrap();
            logger.append(&sample(1_001_000, 1.75, -2.5)).unwrap();
            logger.append(&sample(1_002_000, 2.0, -3.0)).unwrap();
            logger.flush().unwrap();
            assert_eq!(logger.sample_count(), 3);
        }

        let run = LoggedRun::load(&path).unwrap();
        assert_eq!(run.len(), 3);
        assert_eq!(run.position_time[0], 0.0);
        assert!((run.position_time[2] - 0.002).abs() < 1e-9);
        assert_eq!(run.position, vec![1.5, 1.75, 2.0]);
        assert_eq!(run.force, vec![-2.0, -2.5, -3.0]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_logger_batches_until_threshold() {
        let path = temp_csv_path("batching");
        let mut logger = CsvLogger::create(&path).unwrap();

        for i in 0..(FLUSH_THRESHOLD - 1) {
            logger.append(&sample(i as u32 * 1000, 0.0, 0.0)).unwrap();
        }
        // Below the threshold nothing but the header has hit the disk
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk.lines().count(), 1);

        logger.append(&sample(0, 0.0, 0.0)).unwrap();
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk.lines().count(), FLUSH_THRESHOLD + 1);

        drop(logger);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_drop_flushes_tail() {
        let path = temp_csv_path("drop_flush");

        {
            let mut logger = CsvLogger::create(&path).unwrap();
            for i in 0..7 {
                logger.append(&sample(i * 1000, 0.5, -1.0)).unwrap();
            }
        }

        let run = LoggedRun::load(&path).unwrap();
        assert_eq!(run.len(), 7);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_malformed_row() {
        let path = temp_csv_path("malformed");
        std::fs::write(
            &path,
            "position_timestamp,position,force_timestamp,force\n100,1.0,200,not_a_number\n",
        )
        .unwrap();

        let err = LoggedRun::load(&path).unwrap_err();
        match err {
            RigError::MalformedRecord { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_trim_and_invert() {
        let mut run = LoggedRun {
            position_time: vec![0.0, 0.1, 0.2, 0.3, 0.4],
            position: vec![1.0, 2.0, 3.0, 4.0, 5.0],
            force_time: vec![0.0, 0.1, 0.2, 0.3, 0.4],
            force: vec![-1.0, -2.0, -3.0, -4.0, -5.0],
        };

        run.invert_forces();
        assert_eq!(run.force, vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        let trimmed = run.trim(1, 2).unwrap();
        assert_eq!(trimmed.position, vec![2.0, 3.0]);

        assert!(run.trim(3, 2).is_err());
    }

    #[test]
    fn test_clip_to_position_band() {
        let run = LoggedRun {
            position_time: vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5],
            position: vec![0.5, 2.0, 4.0, 6.0, 8.0, 10.0],
            force_time: vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5],
            force: vec![0.0; 6],
        };

        let clipped = run.clip_to_position_band(1.0, 9.0).unwrap();
        assert_eq!(clipped.position, vec![2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_split_on_position_reset() {
        let run = LoggedRun {
            position_time: vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5],
            position: vec![1.0, 2.0, 3.0, 0.1, 1.1, 2.1],
            force_time: vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5],
            force: vec![0.0; 6],
        };

        let segments = run.split_on_position_reset(1.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].position, vec![1.0, 2.0, 3.0]);
        assert_eq!(segments[1].position, vec![0.1, 1.1, 2.1]);
        // Each segment's clock restarts at zero
        assert_eq!(segments[1].position_time[0], 0.0);
        assert!((segments[1].position_time[2] - 0.2).abs() < 1e-9);
    }
}
