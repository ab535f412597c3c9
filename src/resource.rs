//! Host resource surface: model triplets and the sensor trait.

use crate::error::Result;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// API a model implements. Only sensors exist today.
pub const SENSOR_API: &str = "sensor";

/// `namespace:family:name` model identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Model {
    pub namespace: String,
    pub family: String,
    pub name: String,
}

impl Model {
    pub fn new(
        namespace: impl Into<String>,
        family: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            family: family.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.family, self.name)
    }
}

impl FromStr for Model {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(family), Some(name), None)
                if !namespace.is_empty() && !family.is_empty() && !name.is_empty() =>
            {
                Ok(Self::new(namespace, family, name))
            }
            _ => Err(crate::error::Error::UnknownModel(s.to_string())),
        }
    }
}

/// A polled sensor resource.
pub trait Sensor: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &Model;

    /// Current readings. `extra` carries caller-specific options.
    fn readings(&self, extra: &Map<String, Value>) -> Result<Map<String, Value>>;

    /// Model-specific command, keyed by the `command` field.
    fn do_command(&self, command: &Map<String, Value>) -> Result<Map<String, Value>>;

    /// Release the resource. Calling it again does nothing.
    fn close(&self);
}
