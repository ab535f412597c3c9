//! MIDI input reader sensor.

use crate::config::MidiInputConfig;
use crate::error::{Error, Result};
use crate::resource::{Model, Sensor};
use midisense_midi::{MidiDriver, Reader};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub const MODEL_NAMESPACE: &str = "jalen";
pub const MODEL_FAMILY: &str = "midi-controller";
pub const MODEL_NAME: &str = "midi-input-reader";

pub fn midi_input_reader_model() -> Model {
    Model::new(MODEL_NAMESPACE, MODEL_FAMILY, MODEL_NAME)
}

pub struct MidiInputReader {
    name: String,
    model: Model,
    driver: Arc<dyn MidiDriver>,
    reader: Reader,
}

impl MidiInputReader {
    pub fn new(
        name: impl Into<String>,
        driver: Arc<dyn MidiDriver>,
        config: &MidiInputConfig,
    ) -> Result<Self> {
        let name = name.into();
        config.validate(&name)?;

        let reader = config.apply(Reader::builder(Arc::clone(&driver))).build()?;
        info!(
            "Sensor {} reading {} ({})",
            name,
            reader.port_name(),
            reader.tracking().as_str()
        );

        Ok(Self {
            name,
            model: midi_input_reader_model(),
            driver,
            reader,
        })
    }

    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    fn status(&self) -> Map<String, Value> {
        let mut result = Map::new();
        result.insert("state".into(), self.reader.status().as_str().into());
        result.insert("port".into(), self.reader.port_name().into());
        result.insert(
            "fault".into(),
            self.reader.fault().map_or(Value::Null, Value::String),
        );
        result
    }

    fn list_ports(&self) -> Result<Map<String, Value>> {
        let ports: Vec<Value> = self
            .driver
            .input_ports()?
            .into_iter()
            .map(|p| Value::String(p.name))
            .collect();
        let mut result = Map::new();
        result.insert("ports".into(), Value::Array(ports));
        Ok(result)
    }
}

impl Sensor for MidiInputReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &Model {
        &self.model
    }

    fn readings(&self, _extra: &Map<String, Value>) -> Result<Map<String, Value>> {
        let readings = self.reader.read_and_reset();

        let mut result = Map::new();
        result.insert("keys".into(), readings.keys.into());
        if let Some(channels) = readings.channels {
            result.insert("channels".into(), channels.into());
        }
        result.insert("velocities".into(), readings.velocities.into());
        Ok(result)
    }

    fn do_command(&self, command: &Map<String, Value>) -> Result<Map<String, Value>> {
        let name = command
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default();
        debug!("Sensor {} command: {:?}", self.name, name);

        match name {
            "status" => Ok(self.status()),
            "list_ports" => self.list_ports(),
            other => Err(Error::UnsupportedCommand(other.to_string())),
        }
    }

    fn close(&self) {
        if !self.reader.is_closed() {
            info!("Closing sensor {}", self.name);
        }
        self.reader.close();
    }
}

impl std::fmt::Debug for MidiInputReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiInputReader")
            .field("name", &self.name)
            .field("model", &self.model.to_string())
            .field("reader", &self.reader)
            .finish()
    }
}
