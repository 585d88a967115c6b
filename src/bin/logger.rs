//! Rig data logger
//!
//! Streams the rig's serial output to a CSV log file, batching writes so the
//! read loop keeps up with the incoming ~1 kHz stream.
//!
//! Usage:
//!   logger --port /dev/ttyACM0 --output run.csv
//!   logger --port /dev/ttyACM0 --duration 60

use clap::Parser;
use friction_rig::{CsvLogger, FrictionRig, StreamControl, TimeKeeper, DEFAULT_BAUD_RATE};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "logger")]
#[command(about = "Log the friction rig's serial stream to a CSV file", long_about = None)]
struct Args {
    /// Serial device path, e.g. /dev/ttyACM0
    #[arg(short, long)]
    port: String,

    /// Serial baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Output CSV file path (default: timestamped name in the working directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Duration in seconds (optional, runs until Ctrl+C if omitted)
    #[arg(short, long)]
    duration: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "rig_log_{}.csv",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ))
    });

    println!("Friction Rig Logger");
    println!("===================");
    println!("Port: {} @ {} baud", args.port, args.baud);
    println!("Output file: {}", output.display());
    if let Some(duration) = args.duration {
        println!("Duration: {} seconds", duration);
    } else {
        println!("Duration: continuous (Ctrl+C to stop)");
    }
    println!();

    println!("Opening serial port...");
    let mut rig = FrictionRig::open(&args.port, args.baud)?;
    println!("Port open!\n");

    let mut logger = CsvLogger::create(&output)?;

    // Setup Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\nReceived Ctrl+C, stopping logging...");
        r.store(false, Ordering::SeqCst);
    })?;

    let end_time = args
        .duration
        .map(|d| Instant::now() + Duration::from_secs(d));

    println!("Logging started. Press Ctrl+C to stop.\n");

    let timer = TimeKeeper::new();
    let mut write_error = None;

    let result = rig.stream(|sample| {
        if !running.load(Ordering::SeqCst) {
            return StreamControl::Break;
        }

        if let Some(end) = end_time {
            if Instant::now() >= end {
                return StreamControl::Break;
            }
        }

        if let Err(e) = logger.append(&sample) {
            write_error = Some(e);
            return StreamControl::Break;
        }

        // Progress line once a second's worth of samples has arrived
        if logger.sample_count() % 1000 == 0 {
            println!(
                "  {} samples | {:.1}s | last: {:.3} mm, {:.3} N",
                logger.sample_count(),
                timer.elapsed_secs(),
                sample.position,
                sample.force
            );
        }

        StreamControl::Continue
    });

    // The tail batch must reach disk regardless of how the loop ended
    if let Err(e) = logger.flush() {
        eprintln!("Failed to flush log file: {}", e);
    }

    if let Some(e) = write_error {
        eprintln!("\nError writing log file: {}", e);
        return Err(Box::new(e));
    }

    match result {
        Ok(samples) => {
            let elapsed = timer.elapsed_secs();
            println!("\nLogging complete!");
            println!("Total samples: {}", samples);
            println!("Elapsed time: {:.2} seconds", elapsed);
            if elapsed > 0.0 {
                println!("Actual sample rate: {:.1} Hz", samples as f64 / elapsed);
            }
            println!("File: {}", output.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("\nSerial error during logging: {}", e);
            eprintln!("Partial data flushed to {}", output.display());
            Err(Box::new(e))
        }
    }
}
