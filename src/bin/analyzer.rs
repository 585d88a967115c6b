//! Rig run analyzer
//!
//! Post-processing tool for logged CSV runs: friction coefficients, slip
//! velocities, drive-frequency check, and chart rendering.
//!
//! Usage:
//!   analyzer --input run.csv --mass 0.230 --friction kinetic
//!   analyzer --input s1.csv --input s2.csv --mass 0.230 --friction static --lower 800
//!   analyzer --input capture.csv --split --slip --frequency 20 --plot run.png

use clap::Parser;
use friction_rig::analysis::{
    compute_stats, cycle_velocities, dominant_frequency, find_peaks, kinetic_friction_coefficient,
    line_fit, mean, peak_line_velocity, static_friction_coefficient, std_dev, windowed_velocity,
    WaveformModel, GRAVITY,
};
use friction_rig::plot::{render_run_chart, render_velocity_force_chart};
use friction_rig::{LoggedRun, RigError};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "analyzer")]
#[command(about = "Analyze logged friction rig runs", long_about = None)]
struct Args {
    /// Input CSV file (repeat for multiple runs)
    #[arg(short, long, required = true)]
    input: Vec<PathBuf>,

    /// Object mass in kg (needed for friction coefficients)
    #[arg(short, long)]
    mass: Option<f64>,

    /// Samples to drop from the start of each run
    #[arg(long, default_value_t = 0)]
    lower: usize,

    /// Samples to drop from the end of each run
    #[arg(long, default_value_t = 0)]
    upper: usize,

    /// Keep only the stretch between two positions (mm): --band LO HI
    #[arg(long, num_args = 2, value_names = ["LO", "HI"])]
    band: Option<Vec<f64>>,

    /// Flip the force sign (load cell mounted in compression)
    #[arg(long)]
    invert_force: bool,

    /// Split each file into trials at carriage re-homing jumps
    #[arg(long)]
    split: bool,

    /// Downward position step (mm) that marks a new trial
    #[arg(long, default_value_t = 1.0)]
    reset_threshold: f64,

    /// Friction analysis mode: "static" or "kinetic"
    #[arg(long)]
    friction: Option<String>,

    /// Compute per-cycle slip velocities from position peaks
    #[arg(long)]
    slip: bool,

    /// Run all analyses
    #[arg(long)]
    all: bool,

    /// Actuation waveform frequency in Hz
    #[arg(long, default_value_t = 20.0)]
    frequency: f64,

    /// Logging sample rate in Hz
    #[arg(long, default_value_t = 2000.0)]
    sample_rate: f64,

    /// Render a position/force chart per run (PNG; trial index is appended)
    #[arg(long)]
    plot: Option<PathBuf>,

    /// Render velocity-vs-force chart across all runs (PNG)
    #[arg(long)]
    velocity_plot: Option<PathBuf>,

    /// Waveform stick acceleration in g (for the theoretical overlay)
    #[arg(long)]
    model_astick: Option<f64>,

    /// Waveform slip acceleration in g (for the theoretical overlay)
    #[arg(long)]
    model_aslip: Option<f64>,

    /// Static friction coefficient for the theoretical overlay
    #[arg(long, default_value_t = 1.2)]
    mu_s: f64,

    /// Kinetic friction coefficient for the theoretical overlay
    #[arg(long, default_value_t = 1.06)]
    mu_k: f64,

    /// Output report file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let run_static = args.all || matches!(args.friction.as_deref(), Some("static"));
    let run_kinetic = args.all || matches!(args.friction.as_deref(), Some("kinetic"));
    let run_slip = args.all || args.slip;

    if let Some(mode) = args.friction.as_deref() {
        if mode != "static" && mode != "kinetic" {
            eprintln!("Error: --friction must be 'static' or 'kinetic'");
            std::process::exit(1);
        }
    }

    if !run_static && !run_kinetic && !run_slip {
        eprintln!("Error: Must request at least one analysis (--friction, --slip, or --all)");
        std::process::exit(1);
    }

    if (run_static || run_kinetic) && args.mass.is_none() {
        eprintln!("Error: Friction coefficients need the object mass (--mass, kg)");
        std::process::exit(1);
    }

    // Load and prepare every trial before reporting
    let mut trials: Vec<(String, LoggedRun)> = Vec::new();
    for path in &args.input {
        println!("Loading {}...", path.display());
        let mut run = LoggedRun::load(path)?;

        if run.is_empty() {
            eprintln!("Warning: {} contains no samples, skipping", path.display());
            continue;
        }

        if args.invert_force {
            run.invert_forces();
        }

        if let Some(band) = &args.band {
            run = run.clip_to_position_band(band[0], band[1])?;
        }

        if args.lower > 0 || args.upper > 0 {
            run = run.trim(args.lower, args.upper)?;
        }

        if args.split {
            for (i, segment) in run
                .split_on_position_reset(args.reset_threshold)
                .into_iter()
                .enumerate()
            {
                trials.push((format!("{} [trial {}]", path.display(), i + 1), segment));
            }
        } else {
            trials.push((path.display().to_string(), run));
        }
    }

    if trials.is_empty() {
        return Err(Box::new(RigError::InsufficientData(
            "no usable trials in the given inputs".into(),
        )));
    }

    let mut output: Box<dyn Write> = if let Some(path) = &args.output {
        Box::new(File::create(path)?)
    } else {
        Box::new(io::stdout())
    };

    writeln!(output, "{}", "=".repeat(80))?;
    writeln!(output, "FRICTION RIG ANALYSIS REPORT")?;
    writeln!(output, "{}", "=".repeat(80))?;
    writeln!(output)?;
    writeln!(output, "Trials: {}", trials.len())?;
    if let Some(mass) = args.mass {
        writeln!(output, "Object mass: {:.3} kg ({:.2} N weight)", mass, mass * GRAVITY)?;
    }
    writeln!(output, "Waveform frequency: {:.1} Hz", args.frequency)?;
    writeln!(output, "Sample rate: {:.0} Hz", args.sample_rate)?;

    let mut static_coefficients = Vec::new();
    let mut kinetic_coefficients = Vec::new();
    let mut velocity_force_points = Vec::new();

    for (index, (label, run)) in trials.iter().enumerate() {
        writeln!(output, "\n{}", "=".repeat(80))?;
        writeln!(output, "TRIAL: {}", label)?;
        writeln!(output, "{}", "=".repeat(80))?;

        report_overview(&mut output, run)?;

        if run_static {
            let mu_s = static_friction_coefficient(&run.force, args.mass.unwrap())?;
            static_coefficients.push(mu_s);
            writeln!(output)?;
            writeln!(output, "Static friction:")?;
            writeln!(output, "  Peak force: {:.3} N", compute_stats(&run.force)?.max)?;
            writeln!(output, "  mu_s = {:.3}", mu_s)?;
        }

        if run_kinetic {
            let mu_k = kinetic_friction_coefficient(&run.force, args.mass.unwrap())?;
            kinetic_coefficients.push(mu_k);
            let fit = line_fit(&run.position_time, &run.position)?;
            writeln!(output)?;
            writeln!(output, "Kinetic friction:")?;
            writeln!(output, "  Mean force: {:.3} N", mean(&run.force))?;
            writeln!(output, "  mu_k = {:.3}", mu_k)?;
            writeln!(
                output,
                "  Sliding velocity: {:.2} mm/s (r² = {:.4})",
                fit.slope, fit.r_squared
            )?;
        }

        let mut slip_velocity = None;
        if run_slip {
            slip_velocity = report_slip(&mut output, run, args.frequency, args.sample_rate)?;
        }

        // Frequency check on the position wiggle
        if let Some(freq) = dominant_frequency(&run.position, args.sample_rate) {
            writeln!(output)?;
            writeln!(
                output,
                "Drive frequency check: dominant {:.1} Hz (commanded {:.1} Hz)",
                freq, args.frequency
            )?;
        }

        if let Some(velocity) = slip_velocity {
            velocity_force_points.push((mean(&run.force).abs(), velocity));
        }

        if let Some(plot_path) = &args.plot {
            let path = indexed_path(plot_path, index, trials.len());
            let fit = line_fit(&run.position_time, &run.position).ok();
            render_run_chart(run, fit.as_ref(), label, &path)?;
            writeln!(output)?;
            writeln!(output, "Chart written to {}", path.display())?;
        }
    }

    // Cross-trial summary
    if trials.len() > 1 {
        writeln!(output, "\n{}", "=".repeat(80))?;
        writeln!(output, "SUMMARY ({} trials)", trials.len())?;
        writeln!(output, "{}", "=".repeat(80))?;
        if !static_coefficients.is_empty() {
            writeln!(
                output,
                "Static Coefficient of Friction = {:.2} ± {:.2}",
                mean(&static_coefficients),
                std_dev(&static_coefficients)
            )?;
        }
        if !kinetic_coefficients.is_empty() {
            writeln!(
                output,
                "Kinetic Coefficient of Friction = {:.2} ± {:.2}",
                mean(&kinetic_coefficients),
                std_dev(&kinetic_coefficients)
            )?;
        }
    }

    if let Some(path) = &args.velocity_plot {
        let theory = theoretical_curve(&args, &velocity_force_points);
        render_velocity_force_chart(&velocity_force_points, &theory, path)?;
        writeln!(output, "\nVelocity-force chart written to {}", path.display())?;
    }

    writeln!(output, "\n{}", "=".repeat(80))?;
    writeln!(output, "Analysis complete!")?;

    Ok(())
}

fn report_overview(output: &mut dyn Write, run: &LoggedRun) -> io::Result<()> {
    writeln!(output)?;
    writeln!(output, "Samples: {}", run.len())?;
    writeln!(output, "Duration: {:.2} s", run.duration_secs())?;

    if let (Ok(position), Ok(force)) = (compute_stats(&run.position), compute_stats(&run.force)) {
        writeln!(output)?;
        writeln!(
            output,
            "{:<10} {:>12} {:>12} {:>12} {:>12}",
            "Signal", "Mean", "Std Dev", "Min", "Max"
        )?;
        writeln!(output, "{:-<62}", "")?;
        writeln!(
            output,
            "{:<10} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
            "Position", position.mean, position.std_dev, position.min, position.max
        )?;
        writeln!(
            output,
            "{:<10} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
            "Force", force.mean, force.std_dev, force.min, force.max
        )?;
    }

    Ok(())
}

/// Slip-velocity section; returns the per-cycle mean velocity when it could
/// be computed
fn report_slip(
    output: &mut dyn Write,
    run: &LoggedRun,
    frequency: f64,
    sample_rate: f64,
) -> Result<Option<f64>, Box<dyn std::error::Error>> {
    let min_distance = (sample_rate / frequency) as usize;
    let peaks = find_peaks(&run.position, min_distance);

    writeln!(output)?;
    writeln!(output, "Slip velocity:")?;
    writeln!(output, "  Cycle peaks found: {}", peaks.len())?;

    if peaks.len() < 2 {
        writeln!(output, "  Not enough peaks for a velocity estimate")?;
        return Ok(None);
    }

    let velocities = cycle_velocities(&run.position_time, &run.position, &peaks);
    let cycle_mean = mean(&velocities);
    writeln!(
        output,
        "  Per-cycle velocity: {:.2} ± {:.2} mm/s ({} cycles)",
        cycle_mean,
        std_dev(&velocities),
        velocities.len()
    )?;

    if let Ok(v) = peak_line_velocity(&run.position_time, &run.position, &peaks) {
        writeln!(output, "  Peak line fit velocity: {:.2} mm/s", v)?;
    }

    if let Ok(v) = windowed_velocity(&run.position_time, &run.position, 1.0 / frequency) {
        writeln!(output, "  Windowed velocity: {:.2} mm/s", v)?;
    }

    Ok(Some(cycle_mean))
}

/// Model curve over the measured force range, when waveform parameters were
/// given
fn theoretical_curve(args: &Args, measured: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let (Some(a_stick), Some(a_slip)) = (args.model_astick, args.model_aslip) else {
        return Vec::new();
    };
    let Some(mass) = args.mass else {
        return Vec::new();
    };
    if measured.is_empty() {
        return Vec::new();
    }

    let model = WaveformModel {
        a_stick: a_stick * GRAVITY,
        a_slip: a_slip * GRAVITY,
        frequency: args.frequency,
    };

    let f_min = measured.iter().map(|&(f, _)| f).fold(f64::INFINITY, f64::min);
    let f_max = measured
        .iter()
        .map(|&(f, _)| f)
        .fold(f64::NEG_INFINITY, f64::max);

    const POINTS: usize = 200;
    (0..POINTS)
        .map(|i| {
            let force = f_min + (f_max - f_min) * i as f64 / (POINTS - 1) as f64;
            let velocity = model.predicted_velocity(args.mu_s, args.mu_k, mass, force);
            (force, velocity)
        })
        .collect()
}

/// Derive a per-trial output path: chart.png -> chart_3.png
fn indexed_path(base: &PathBuf, index: usize, total: usize) -> PathBuf {
    if total <= 1 {
        return base.clone();
    }

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chart".into());
    let extension = base
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".into());

    base.with_file_name(format!("{}_{}.{}", stem, index + 1, extension))
}
