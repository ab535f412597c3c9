//! midisense command line.
//!
//! ```text
//! midisense list
//! midisense read <port> [interval_ms] [count]
//! midisense config <file.json>
//! ```

use midisense::{Error, MidiDriver, Reader, Registry, ResourceConfig, Result};
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::error;

const DEFAULT_INTERVAL_MS: u64 = 500;
const USAGE: &str = "usage: midisense list | read <port> [interval_ms] [count] | config <file.json>";

#[cfg(feature = "midi-io")]
fn driver() -> Arc<dyn MidiDriver> {
    Arc::new(midisense::MidirDriver::new())
}

#[cfg(not(feature = "midi-io"))]
fn driver() -> Arc<dyn MidiDriver> {
    Arc::new(midisense::VirtualDriver::new())
}

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("list") => list(driver().as_ref()),
        Some("read") => {
            let port = args.get(1).ok_or_else(usage)?;
            let interval_ms = parse_arg(args.get(2), DEFAULT_INTERVAL_MS)?;
            let count = args.get(3).map(|c| parse_arg(Some(c), 0)).transpose()?;
            read(driver(), port, Duration::from_millis(interval_ms), count)
        }
        Some("config") => {
            let path = args.get(1).ok_or_else(usage)?;
            config(driver(), path)
        }
        _ => Err(usage()),
    }
}

fn usage() -> Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, USAGE).into()
}

fn parse_arg(arg: Option<&String>, default: u64) -> Result<u64> {
    match arg {
        Some(value) => value.parse::<u64>().map_err(|_| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("expected a number, got '{}'", value),
            ))
        }),
        None => Ok(default),
    }
}

fn list(driver: &dyn MidiDriver) -> Result<()> {
    let ports = driver.input_ports()?;
    if ports.is_empty() {
        println!("No MIDI input ports");
    }
    for port in ports {
        println!("{}: {}", port.index, port.name);
    }
    Ok(())
}

/// Print one JSON line per interval; runs until `count` lines when given.
fn read(
    driver: Arc<dyn MidiDriver>,
    port: &str,
    interval: Duration,
    count: Option<u64>,
) -> Result<()> {
    let reader = Reader::configure(driver, port)?;
    eprintln!("Reading {} every {:?}", reader.port_name(), interval);

    let mut printed = 0;
    while count.map_or(true, |c| printed < c) {
        thread::sleep(interval);
        let readings = reader.read_and_reset();
        let mut line = serde_json::Map::new();
        line.insert("keys".into(), readings.keys.into());
        if let Some(channels) = readings.channels {
            line.insert("channels".into(), channels.into());
        }
        line.insert("velocities".into(), readings.velocities.into());
        line.insert("state".into(), reader.status().as_str().into());
        println!("{}", serde_json::Value::Object(line));
        printed += 1;
    }

    reader.close();
    Ok(())
}

fn config(driver: Arc<dyn MidiDriver>, path: &str) -> Result<()> {
    let resource = ResourceConfig::from_file(path)?;
    let registry = Registry::new(driver);
    let sensor = registry.build(&resource)?;

    let readings = sensor.readings(&serde_json::Map::new())?;
    println!("{}", serde_json::to_string_pretty(&readings)?);

    sensor.close();
    Ok(())
}
