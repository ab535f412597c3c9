//! Hardware integration tests using a loopback MIDI port.
//!
//! Requires a port that echoes its output back as input (IAC Driver on macOS,
//! `snd-virmidi` on Linux). Set `MIDISENSE_TEST_PORT` to its name.
//! All tests are `#[ignore]` so CI doesn't fail without hardware.
//!
//! Run with:
//!   MIDISENSE_TEST_PORT="IAC Driver Bus 1" cargo test -p midisense-midi --test hardware -- --ignored --test-threads=1

#![cfg(feature = "midi-io")]

use midir::MidiOutput;
use midisense_midi::{ListenerState, MidiDriver, MidirDriver, Reader, TrackingMode};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SETTLE: Duration = Duration::from_millis(200);
const SEND_READ_DELAY: Duration = Duration::from_millis(100);

fn test_port() -> String {
    std::env::var("MIDISENSE_TEST_PORT").unwrap_or_else(|_| "IAC Driver Bus 1".to_string())
}

fn send_all(port_name: &str, messages: &[[u8; 3]]) {
    let output = MidiOutput::new("midisense-test-out").unwrap();
    let port = output
        .ports()
        .into_iter()
        .find(|p| output.port_name(p).is_ok_and(|n| n.contains(port_name)))
        .expect("loopback output port not found");
    let mut connection = output.connect(&port, "midisense-test").unwrap();
    for message in messages {
        connection.send(message).unwrap();
    }
    thread::sleep(SEND_READ_DELAY);
    connection.close();
}

#[test]
#[ignore]
fn test_port_is_listed() {
    let ports = MidirDriver::new().input_ports().unwrap();
    let name = test_port();
    assert!(
        ports.iter().any(|p| p.name.contains(&name)),
        "{} not in {:?}",
        name,
        ports
    );
}

#[test]
#[ignore]
fn test_loopback_note_on() {
    let name = test_port();
    let reader = Reader::configure(Arc::new(MidirDriver::new()), &name).unwrap();
    assert_eq!(reader.status(), ListenerState::Listening);
    thread::sleep(SETTLE);

    send_all(&name, &[[0x90, 60, 100], [0x90, 64, 90]]);

    let readings = reader.read_and_reset();
    let mut keys: Vec<&str> = readings.keys.split(' ').collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["60", "64"]);
    assert!(reader.read_and_reset().is_empty());

    reader.close();
    assert_eq!(reader.status(), ListenerState::Stopped);
}

#[test]
#[ignore]
fn test_loopback_active_sets() {
    let name = test_port();
    let reader = Reader::builder(Arc::new(MidirDriver::new()))
        .port_name(&name)
        .tracking(TrackingMode::ActiveSets)
        .build()
        .unwrap();
    thread::sleep(SETTLE);

    // Second note on channel 2 released with a zero-velocity note on
    send_all(&name, &[[0x90, 60, 100], [0x91, 62, 80], [0x91, 62, 0]]);

    let readings = reader.read_and_reset();
    assert_eq!(readings.keys, "60");
    assert_eq!(readings.velocities, "100");
    assert_eq!(readings.channels.as_deref(), Some("0"));
}

#[test]
#[ignore]
fn test_reopen_after_close() {
    let name = test_port();
    let driver = Arc::new(MidirDriver::new());

    let first = Reader::configure(driver.clone(), &name).unwrap();
    first.close();

    let second = Reader::configure(driver, &name).unwrap();
    thread::sleep(SETTLE);
    send_all(&name, &[[0x90, 72, 127]]);
    assert_eq!(second.read_and_reset().keys, "72");
}
