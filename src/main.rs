//! Rig monitor - live console view of the serial stream
//!
//! Opens the rig's serial port and continuously displays object position and
//! tangential force with bar meters, plus the achieved sample rate.

use clap::Parser;
use friction_rig::{create_bar, FrictionRig, RigError, StreamControl, TimeKeeper, DEFAULT_BAUD_RATE};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Display ranges for the bar meters
const POSITION_RANGE_MM: (f32, f32) = (0.0, 12.0);
const FORCE_RANGE_N: (f32, f32) = (0.0, 50.0);

#[derive(Parser, Debug)]
#[command(name = "rig-monitor")]
#[command(about = "Live console view of the friction rig's serial stream", long_about = None)]
struct Args {
    /// Serial device path, e.g. /dev/ttyACM0
    #[arg(short, long)]
    port: String,

    /// Serial baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Friction Rig Monitor");
    println!("====================");
    println!("Opening {} at {} baud...", args.port, args.baud);

    let mut rig = match FrictionRig::open(&args.port, args.baud) {
        Ok(rig) => {
            println!("Connected!\n");
            rig
        }
        Err(e) => {
            eprintln!("Error opening {}: {}", args.port, e);
            match FrictionRig::available_ports() {
                Ok(ports) => {
                    eprintln!("Available serial ports:");
                    for port in ports {
                        eprintln!("  {}", port);
                    }
                }
                Err(RigError::NoPortsFound) => {
                    eprintln!("No serial ports found. Is the rig plugged in?");
                }
                Err(e) => eprintln!("Could not list ports: {}", e),
            }
            return Err(Box::new(e));
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut timer = TimeKeeper::new();

    // Clear screen once at start
    print!("\x1B[2J\x1B[H");
    io::stdout().flush()?;

    let result = rig.stream(|sample| {
        if !running.load(Ordering::SeqCst) {
            return StreamControl::Break;
        }

        timer.tick();

        // Redraw at most every 10th sample; the stream runs near 1 kHz and
        // the terminal cannot keep up with more
        if timer.samples() % 10 != 0 {
            return StreamControl::Continue;
        }

        // Move cursor to top without clearing (reduces flicker)
        print!("\x1B[H");

        println!("Friction Rig Monitor - Live Data                                ");
        println!("================================                                ");
        println!(
            "Time: {:.2}s | Samples: {} | Rate: {:.1} Hz                     ",
            timer.elapsed_secs(),
            timer.samples(),
            timer.rate_hz()
        );
        println!();

        println!(
            "POSITION (mm)                  {:>4.0} ──────────────► {:<4.0}",
            POSITION_RANGE_MM.0, POSITION_RANGE_MM.1
        );
        println!(
            "  {:8.3} mm  [{}]",
            sample.position,
            create_bar(sample.position, POSITION_RANGE_MM.0, POSITION_RANGE_MM.1, 40)
        );
        println!();

        println!(
            "FORCE (N)                      {:>4.0} ──────────────► {:<4.0}",
            FORCE_RANGE_N.0, FORCE_RANGE_N.1
        );
        println!(
            "  {:8.3} N   [{}]",
            sample.force.abs(),
            create_bar(sample.force.abs(), FORCE_RANGE_N.0, FORCE_RANGE_N.1, 40)
        );
        println!();
        println!("Press Ctrl+C to exit                                            ");

        let _ = io::stdout().flush();

        StreamControl::Continue
    });

    match result {
        Ok(samples) => {
            println!("\nStopped after {} samples.", samples);
            Ok(())
        }
        Err(e) => {
            eprintln!("\nSerial stream failed: {}", e);
            Err(Box::new(e))
        }
    }
}
