//! Model registry.
//!
//! Maps model identifiers to constructors. Hosts create one registry per
//! driver and build every configured resource through it.

use crate::config::{MidiInputConfig, ResourceConfig};
use crate::error::{Error, Result};
use crate::resource::{Model, Sensor, SENSOR_API};
use crate::sensor::{midi_input_reader_model, MidiInputReader};
use midisense_midi::MidiDriver;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Builds a sensor from its resource config.
pub type SensorConstructor =
    Box<dyn Fn(Arc<dyn MidiDriver>, &ResourceConfig) -> Result<Box<dyn Sensor>> + Send + Sync>;

pub struct Registry {
    driver: Arc<dyn MidiDriver>,
    constructors: BTreeMap<Model, SensorConstructor>,
}

impl Registry {
    /// Registry with the MIDI input reader already registered.
    pub fn new(driver: Arc<dyn MidiDriver>) -> Self {
        let mut registry = Self::empty(driver);
        registry.register(
            midi_input_reader_model(),
            Box::new(|driver: Arc<dyn MidiDriver>, config: &ResourceConfig| {
                let attributes = MidiInputConfig::from_attributes(&config.attributes)?;
                let sensor = MidiInputReader::new(config.name.clone(), driver, &attributes)?;
                Ok(Box::new(sensor) as Box<dyn Sensor>)
            }),
        );
        registry
    }

    pub fn empty(driver: Arc<dyn MidiDriver>) -> Self {
        Self {
            driver,
            constructors: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, model: Model, constructor: SensorConstructor) {
        info!("Registered {} model {}", SENSOR_API, model);
        self.constructors.insert(model, constructor);
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.constructors.keys()
    }

    pub fn driver(&self) -> &Arc<dyn MidiDriver> {
        &self.driver
    }

    pub fn build(&self, config: &ResourceConfig) -> Result<Box<dyn Sensor>> {
        let model: Model = config.model.parse()?;
        let constructor = self
            .constructors
            .get(&model)
            .ok_or_else(|| Error::UnknownModel(config.model.clone()))?;
        constructor(Arc::clone(&self.driver), config)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("models", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}
