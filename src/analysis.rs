//! Offline analysis of logged runs
//!
//! Everything a friction experiment derives from a logged run: least-squares
//! velocity fits, per-cycle slip velocities from position peaks, static and
//! kinetic friction coefficients, a drive-frequency sanity check, and the
//! closed-form stick-slip waveform model the measurements are compared
//! against.

use crate::error::{Result, RigError};
use num_complex::Complex;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Standard gravity (m/s²)
pub const GRAVITY: f64 = 9.81;

// ============================================================================
// AGGREGATES
// ============================================================================

/// Mean of a slice
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation of a slice
pub fn std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Summary statistics of a signal
#[derive(Debug, Clone, Copy)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Compute summary statistics for a signal
pub fn compute_stats(data: &[f64]) -> Result<Stats> {
    if data.is_empty() {
        return Err(RigError::InsufficientData("empty signal".into()));
    }

    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(Stats {
        mean: mean(data),
        std_dev: std_dev(data),
        min,
        max,
    })
}

// ============================================================================
// LINE FITTING
// ============================================================================

/// Least-squares degree-1 fit
///
/// For position-vs-time data the slope is the part velocity in mm/s.
#[derive(Debug, Clone, Copy)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LineFit {
    /// Evaluate the fitted line at `x`
    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a line to (x, y) data by least squares
pub fn line_fit(x: &[f64], y: &[f64]) -> Result<LineFit> {
    if x.len() != y.len() {
        return Err(RigError::InvalidParameter(format!(
            "mismatched lengths: {} x values, {} y values",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(RigError::InsufficientData(
            "line fit needs at least 2 points".into(),
        ));
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        sxx += (xi - mean_x) * (xi - mean_x);
        sxy += (xi - mean_x) * (yi - mean_y);
    }

    if sxx == 0.0 {
        return Err(RigError::InsufficientData(
            "line fit needs x values with spread".into(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| (yi - (slope * xi + intercept)).powi(2))
        .sum();
    let ss_tot: f64 = y.iter().map(|&yi| (yi - mean_y).powi(2)).sum();
    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        1.0
    };

    Ok(LineFit {
        slope,
        intercept,
        r_squared,
    })
}

// ============================================================================
// PEAK DETECTION
// ============================================================================

/// Find local maxima separated by at least `min_distance` indices
///
/// Taller peaks win when two candidates fall within `min_distance` of each
/// other. For one peak per actuation cycle use
/// `min_distance = sample_rate / waveform_frequency`.
///
/// # Returns
/// Peak indices in ascending order.
pub fn find_peaks(values: &[f64], min_distance: usize) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }

    let mut candidates: Vec<usize> = (1..values.len() - 1)
        .filter(|&i| values[i] > values[i - 1] && values[i] > values[i + 1])
        .collect();

    // Tallest first, then greedily enforce the spacing
    candidates.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap());

    let mut kept: Vec<usize> = Vec::new();
    for i in candidates {
        if kept
            .iter()
            .all(|&k| i.abs_diff(k) >= min_distance.max(1))
        {
            kept.push(i);
        }
    }

    kept.sort_unstable();
    kept
}

// ============================================================================
// SLIP VELOCITY
// ============================================================================

/// Per-cycle slip velocities between consecutive position peaks (mm/s)
///
/// Each actuation cycle advances the part by one stick-slip step; the rise
/// between consecutive cycle peaks over the time between them is that
/// cycle's velocity.
pub fn cycle_velocities(times: &[f64], positions: &[f64], peaks: &[usize]) -> Vec<f64> {
    peaks
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            let dt = times[b] - times[a];
            if dt > 0.0 {
                Some((positions[b] - positions[a]) / dt)
            } else {
                None
            }
        })
        .collect()
}

/// Average velocity from a line fit through the cycle peaks (mm/s)
pub fn peak_line_velocity(times: &[f64], positions: &[f64], peaks: &[usize]) -> Result<f64> {
    if peaks.len() < 2 {
        return Err(RigError::InsufficientData(format!(
            "need at least 2 peaks, found {}",
            peaks.len()
        )));
    }

    let peak_times: Vec<f64> = peaks.iter().map(|&i| times[i]).collect();
    let peak_positions: Vec<f64> = peaks.iter().map(|&i| positions[i]).collect();

    Ok(line_fit(&peak_times, &peak_positions)?.slope)
}

/// Average velocity over every window one waveform period long (mm/s)
///
/// Peak-free estimator: slides a window of `period` seconds across the run
/// and averages Δposition/Δtime over all of them.
pub fn windowed_velocity(times: &[f64], positions: &[f64], period: f64) -> Result<f64> {
    if period <= 0.0 {
        return Err(RigError::InvalidParameter(format!(
            "period must be positive, got {period}"
        )));
    }
    if times.len() < 2 {
        return Err(RigError::InsufficientData(
            "windowed velocity needs at least 2 samples".into(),
        ));
    }

    let mut velocities = Vec::new();
    let mut k = 0usize;

    for j in 0..times.len() {
        let target = times[j] + period;
        if k < j {
            k = j;
        }
        while k < times.len() && times[k] < target {
            k += 1;
        }
        if k >= times.len() {
            break;
        }
        let dt = times[k] - times[j];
        if dt > 0.0 {
            velocities.push((positions[k] - positions[j]) / dt);
        }
    }

    if velocities.is_empty() {
        return Err(RigError::InsufficientData(
            "run shorter than one waveform period".into(),
        ));
    }

    Ok(mean(&velocities))
}

// ============================================================================
// FRICTION COEFFICIENTS
// ============================================================================

/// Coefficient of static friction: peak drag force over the object's weight
///
/// The drag force peaks at the moment of break-away, so µ_s = max(F)/(m·g).
pub fn static_friction_coefficient(forces: &[f64], mass_kg: f64) -> Result<f64> {
    if mass_kg <= 0.0 {
        return Err(RigError::InvalidParameter(format!(
            "mass must be positive, got {mass_kg}"
        )));
    }
    let stats = compute_stats(forces)?;
    Ok(stats.max / (mass_kg * GRAVITY))
}

/// Coefficient of kinetic friction: mean drag force during steady sliding
/// over the object's weight, µ_k = mean(F)/(m·g)
pub fn kinetic_friction_coefficient(forces: &[f64], mass_kg: f64) -> Result<f64> {
    if mass_kg <= 0.0 {
        return Err(RigError::InvalidParameter(format!(
            "mass must be positive, got {mass_kg}"
        )));
    }
    let stats = compute_stats(forces)?;
    Ok(stats.mean / (mass_kg * GRAVITY))
}

// ============================================================================
// DRIVE FREQUENCY CHECK
// ============================================================================

/// Dominant frequency of a signal (Hz)
///
/// Hann-windowed FFT of the mean-removed signal; used to confirm the
/// actuator ran at the commanded waveform frequency. Returns `None` when the
/// signal is too short to resolve anything.
pub fn dominant_frequency(values: &[f64], sample_rate: f64) -> Option<f64> {
    const MIN_SAMPLES: usize = 16;

    let n = values.len();
    if n < MIN_SAMPLES || sample_rate <= 0.0 {
        return None;
    }

    let signal_mean = mean(values);
    let mut buffer: Vec<Complex<f64>> = values
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let window = 0.5 * (1.0 - ((2.0 * PI * i as f64) / (n as f64 - 1.0)).cos());
            Complex::new((x - signal_mean) * window, 0.0)
        })
        .collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    // Skip the DC bin; second half mirrors the first
    let (peak_bin, _) = buffer
        .iter()
        .take(n / 2)
        .enumerate()
        .skip(1)
        .map(|(i, c)| (i, c.norm()))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())?;

    Some(peak_bin as f64 * sample_rate / n as f64)
}

// ============================================================================
// STICK-SLIP WAVEFORM MODEL
// ============================================================================

/// Asymmetric-acceleration waveform driving the rig
///
/// Each period accelerates the track gently (`a_stick`, below the static
/// friction limit, the part rides along) and snaps it back hard (`a_slip`,
/// the part slips). Accelerations in m/s², frequency in Hz.
#[derive(Debug, Clone, Copy)]
pub struct WaveformModel {
    pub a_stick: f64,
    pub a_slip: f64,
    pub frequency: f64,
}

impl WaveformModel {
    /// Normal force below which the part never slips (N)
    ///
    /// Slip requires the stick-phase inertial force to exceed the static
    /// friction the normal force can supply: F > (m/µ_s)·(a_stick + g).
    pub fn slip_threshold_force(&self, mu_s: f64, mass_kg: f64) -> f64 {
        mass_kg / mu_s * (self.a_stick + GRAVITY)
    }

    /// Predicted average part velocity (mm/s) under a given normal force
    ///
    /// Closed-form average of the per-cycle slip distance over the period:
    /// v = 1000·(T/2)·a_s²(a_max − a_k) / ((a_s + a_max)(a_s + a_k)), with
    /// a_k = g + µ_k·F/m. Zero below the slip threshold.
    pub fn predicted_velocity(
        &self,
        mu_s: f64,
        mu_k: f64,
        mass_kg: f64,
        normal_force: f64,
    ) -> f64 {
        if normal_force <= self.slip_threshold_force(mu_s, mass_kg) {
            return 0.0;
        }

        let period = 1.0 / self.frequency;
        let a_k = GRAVITY + mu_k * normal_force / mass_kg;
        let a_s = self.a_stick;
        let a_max = self.a_slip;

        1000.0 * period / 2.0 * (a_s * a_s * (a_max - a_k)) / ((a_s + a_max) * (a_s + a_k))
    }

    /// Peak actuator travel per cycle (mm)
    ///
    /// Used to check a waveform against the hardware's travel limit before
    /// running it.
    pub fn displacement_amplitude(&self) -> f64 {
        let period = 1.0 / self.frequency;
        let t_1 = self.a_slip / (self.a_stick + self.a_slip) * (period / 2.0);
        let t_max = t_1 * (self.a_stick / self.a_slip + 1.0);

        (self.a_stick * t_1 * (t_max - 0.5 * t_1)
            + self.a_slip * (t_1 * t_max - 0.5 * t_max * t_max - 0.5 * t_1 * t_1))
            * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Synthetic stick-slip trace: linear drift plus one wiggle per cycle
    fn synthetic_run(
        drift_mm_s: f64,
        wiggle_mm: f64,
        freq_hz: f64,
        sample_rate: f64,
        duration_s: f64,
    ) -> (Vec<f64>, Vec<f64>) {
        let n = (duration_s * sample_rate) as usize;
        let times: Vec<f64> = (0..n).map(|i| i as f64 / sample_rate).collect();
        let positions: Vec<f64> = times
            .iter()
            .map(|&t| drift_mm_s * t + wiggle_mm * (2.0 * PI * freq_hz * t).sin())
            .collect();
        (times, positions)
    }

    #[test]
    fn test_line_fit_exact() {
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|&xi| 2.0 * xi + 1.0).collect();

        let fit = line_fit(&x, &y).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_line_fit_rejects_degenerate_input() {
        assert!(line_fit(&[1.0], &[1.0]).is_err());
        assert!(line_fit(&[1.0, 1.0], &[1.0, 2.0]).is_err());
        assert!(line_fit(&[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn test_find_peaks_counts_cycles() {
        let (_, positions) = synthetic_run(0.0, 1.0, 5.0, 100.0, 2.0);
        // 5 Hz over 2 s with spacing of at least 3/4 cycle
        let peaks = find_peaks(&positions, 15);
        assert_eq!(peaks.len(), 10);
    }

    #[test]
    fn test_find_peaks_enforces_distance() {
        let values = vec![0.0, 3.0, 0.0, 2.9, 0.0];
        let peaks = find_peaks(&values, 4);
        // Both maxima are within 4 indices; only the taller survives
        assert_eq!(peaks, vec![1]);
    }

    #[test]
    fn test_cycle_velocities_recover_drift() {
        let (times, positions) = synthetic_run(3.0, 0.2, 10.0, 1000.0, 2.0);
        let peaks = find_peaks(&positions, 80);
        let velocities = cycle_velocities(&times, &positions, &peaks);

        assert!(!velocities.is_empty());
        let avg = mean(&velocities);
        assert!((avg - 3.0).abs() < 0.2, "avg velocity {avg} far from 3.0");
    }

    #[test]
    fn test_peak_line_velocity_recovers_drift() {
        let (times, positions) = synthetic_run(5.0, 0.2, 10.0, 1000.0, 2.0);
        let peaks = find_peaks(&positions, 80);
        let velocity = peak_line_velocity(&times, &positions, &peaks).unwrap();
        assert!((velocity - 5.0).abs() < 0.2);
    }

    #[test]
    fn test_windowed_velocity_on_ramp() {
        let times: Vec<f64> = (0..200).map(|i| i as f64 * 0.01).collect();
        let positions: Vec<f64> = times.iter().map(|&t| 4.0 * t).collect();

        let velocity = windowed_velocity(&times, &positions, 0.1).unwrap();
        assert!((velocity - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_friction_coefficients() {
        // 0.5 kg object, forces in N
        let forces = vec![1.0, 2.0, 3.0, 4.0];
        let mass = 0.5;

        let mu_s = static_friction_coefficient(&forces, mass).unwrap();
        assert!((mu_s - 4.0 / (0.5 * GRAVITY)).abs() < 1e-12);

        let mu_k = kinetic_friction_coefficient(&forces, mass).unwrap();
        assert!((mu_k - 2.5 / (0.5 * GRAVITY)).abs() < 1e-12);

        assert!(static_friction_coefficient(&forces, 0.0).is_err());
        assert!(kinetic_friction_coefficient(&[], mass).is_err());
    }

    #[test]
    fn test_dominant_frequency_of_sine() {
        let sample_rate = 128.0;
        let n = 256;
        let values: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 5.0 * i as f64 / sample_rate).sin())
            .collect();

        let freq = dominant_frequency(&values, sample_rate).unwrap();
        assert!((freq - 5.0).abs() <= sample_rate / n as f64);
    }

    #[test]
    fn test_dominant_frequency_short_signal() {
        assert!(dominant_frequency(&[0.0; 4], 100.0).is_none());
    }

    #[test]
    fn test_waveform_model_threshold() {
        let model = WaveformModel {
            a_stick: 1.0 * GRAVITY,
            a_slip: 50.0 * GRAVITY,
            frequency: 20.0,
        };
        let (mu_s, mu_k, mass) = (1.2, 1.06, 0.332);

        let threshold = model.slip_threshold_force(mu_s, mass);
        assert!(model.predicted_velocity(mu_s, mu_k, mass, threshold * 0.9) == 0.0);

        let v = model.predicted_velocity(mu_s, mu_k, mass, threshold * 1.5);
        assert!(v > 0.0);

        // More clamp force means more kinetic drag and a slower part
        let v_heavier = model.predicted_velocity(mu_s, mu_k, mass, threshold * 2.0);
        assert!(v_heavier < v);
    }

    #[test]
    fn test_waveform_amplitude_positive() {
        let model = WaveformModel {
            a_stick: 0.7 * GRAVITY,
            a_slip: 10.0 * GRAVITY,
            frequency: 20.0,
        };
        let amplitude = model.displacement_amplitude();
        assert!(amplitude > 0.0);
        // Slower waveforms travel farther per cycle
        let slower = WaveformModel {
            frequency: 10.0,
            ..model
        };
        assert!(slower.displacement_amplitude() > amplitude);
    }
}
