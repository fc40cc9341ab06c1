//! Blink Test Tool
//!
//! Toggles a pin on a board running the nango firmware and reports timing.
//!
//! Usage:
//!   cargo run --example blink -- [OPTIONS]
//!
//! Options:
//!   --port PORT       Serial port (default: /dev/ttyACM0)
//!   --baud RATE       Baud rate (default: 115200)
//!   --settle MS       Delay after port open in ms (default: 2000)
//!   --timeout MS      Read timeout in ms (default: 2000)
//!   --pin PIN         Pin to toggle (default: 13)
//!   --count N         Number of toggles (default: 10)
//!   --config FILE     Load connection settings from a JSON file
//!   --demo            Use the simulated board instead of a serial port
//!   --scan            Scan the I2C bus afterwards
//!
//! Set RUST_LOG=nango_core=trace to see every flushed request.

use anyhow::{bail, Context, Result};
use nango_core::demo::ScriptedDevice;
use nango_core::prelude::*;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = ConnectionConfig::new("/dev/ttyACM0", 115200);
    config.settle_delay_ms = 2000;
    let mut pin = "13".to_string();
    let mut count = 10u32;
    let mut demo = false;
    let mut scan = false;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--port" | "-p", Some(v)) => config.serial.port_name = v.clone(),
            ("--baud" | "-b", Some(v)) => config.serial.baud_rate = v.parse().context("baud")?,
            ("--settle" | "-s", Some(v)) => config.settle_delay_ms = v.parse().context("settle")?,
            ("--timeout" | "-t", Some(v)) => config.read_timeout_ms = v.parse().context("timeout")?,
            ("--pin", Some(v)) => pin = v.clone(),
            ("--count" | "-n", Some(v)) => count = v.parse().context("count")?,
            ("--config" | "-c", Some(v)) => config = ConnectionConfig::load(v)?,
            ("--demo", _) => {
                demo = true;
                i += 1;
                continue;
            }
            ("--scan", _) => {
                scan = true;
                i += 1;
                continue;
            }
            (flag, _) => bail!("unknown or incomplete option: {}", flag),
        }
        i += 2;
    }

    let client = Client::with_config(config.clone());
    if demo {
        println!("Using simulated board");
        let (device, _probe) = ScriptedDevice::demo_board();
        client.open_with(Box::new(device))?;
    } else {
        println!(
            "Opening {} at {} baud (settle {}ms)",
            config.serial.port_name, config.serial.baud_rate, config.settle_delay_ms
        );
        client
            .open()
            .with_context(|| format!("opening {}", config.serial.port_name))?;
    }

    let arduino = ArduinoApi::new(client.clone());
    arduino.pin_mode(&pin, PinMode::Output)?;

    let mut level = PinLevel::Low;
    let mut total = Duration::ZERO;
    for n in 0..count {
        level = match level {
            PinLevel::Low => PinLevel::High,
            PinLevel::High => PinLevel::Low,
        };
        let start = Instant::now();
        arduino.digital_write(&pin, level)?;
        let readback = arduino.digital_read(&pin)?;
        let elapsed = start.elapsed();
        total += elapsed;
        println!(
            "[{:>3}] pin {} -> {:?} (read back {:?}) in {:.1}ms",
            n,
            pin,
            level,
            readback,
            elapsed.as_secs_f64() * 1000.0
        );
        std::thread::sleep(Duration::from_millis(100));
    }
    if count > 0 {
        println!(
            "Average round trip (write + read): {:.1}ms",
            total.as_secs_f64() * 1000.0 / count as f64
        );
    }
    println!("Board uptime: {}ms", arduino.millis()?);

    if scan {
        let master = I2cMaster::new(Wire::new(client.clone()));
        let found = master.scan()?;
        if found.is_empty() {
            println!("No I2C devices found");
        }
        for address in found {
            println!("I2C device at {}", address);
        }
    }

    let (timeout_ms, (tx, rx)) = client.with_connection(|conn| {
        (conn.config().read_timeout_ms, conn.get_counters())
    });
    println!(
        "Traffic: sent {} bytes, received {} bytes (read timeout {}ms)",
        tx, rx, timeout_ms
    );

    client.close()?;
    Ok(())
}
