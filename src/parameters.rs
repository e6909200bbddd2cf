//! Operational parameters submitted alongside the tire image.
//!
//! The store only constrains values by type. Domain checks happen when the
//! controller prepares a submission, see [`ParameterSet::validate`].

use crate::error::SessionError;
use serde::Serialize;
use std::fmt;

pub const DEFAULT_ROAD_CONDITION: &str = "paved";

pub const DEFAULT_PRESSURE_PSI: f64 = 32.0;
pub const DEFAULT_LOAD_LBS: f64 = 1500.0;
pub const DEFAULT_TKPH: f64 = 150.0;
pub const DEFAULT_TEMPERATURE_C: f64 = 25.0;
pub const DEFAULT_SPEED_KMH: f64 = 60.0;

/// Numeric fields of a [`ParameterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Pressure,
    Load,
    Tkph,
    Temperature,
    Speed,
}

impl Parameter {
    pub const ALL: [Parameter; 5] = [
        Parameter::Pressure,
        Parameter::Load,
        Parameter::Tkph,
        Parameter::Temperature,
        Parameter::Speed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Parameter::Pressure => "pressure",
            Parameter::Load => "load",
            Parameter::Tkph => "tkph",
            Parameter::Temperature => "temperature",
            Parameter::Speed => "speed",
        }
    }

    /// Multipart field name expected by the prediction service.
    pub fn form_field(self) -> &'static str {
        match self {
            Parameter::Temperature => "temp",
            other => other.as_str(),
        }
    }

    /// Inclusive `(min, max)` accepted at submit time.
    pub fn domain(self) -> (f64, f64) {
        match self {
            Parameter::Pressure => (20.0, 15_000.0),
            Parameter::Load => (500.0, 15_000.0),
            Parameter::Tkph => (50.0, 800.0),
            Parameter::Temperature => (-20.0, 80.0),
            Parameter::Speed => (20.0, 200.0),
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Parameter::Pressure => "PSI",
            Parameter::Load => "lbs",
            Parameter::Tkph => "",
            Parameter::Temperature => "°C",
            Parameter::Speed => "km/h",
        }
    }

    pub fn contains(self, value: f64) -> bool {
        let (min, max) = self.domain();
        value.is_finite() && value >= min && value <= max
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    pub pressure: f64,
    pub load: f64,
    pub tkph: f64,
    #[serde(rename = "temp")]
    pub temperature: f64,
    pub speed: f64,
    pub road_condition: String,
    pub debug_mode: bool,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            pressure: DEFAULT_PRESSURE_PSI,
            load: DEFAULT_LOAD_LBS,
            tkph: DEFAULT_TKPH,
            temperature: DEFAULT_TEMPERATURE_C,
            speed: DEFAULT_SPEED_KMH,
            road_condition: DEFAULT_ROAD_CONDITION.to_string(),
            debug_mode: false,
        }
    }
}

impl ParameterSet {
    pub fn value(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Pressure => self.pressure,
            Parameter::Load => self.load,
            Parameter::Tkph => self.tkph,
            Parameter::Temperature => self.temperature,
            Parameter::Speed => self.speed,
        }
    }

    /// Reports the first numeric field outside its domain.
    pub fn validate(&self) -> Result<(), SessionError> {
        for parameter in Parameter::ALL {
            let value = self.value(parameter);
            if !parameter.contains(value) {
                let (min, max) = parameter.domain();
                return Err(SessionError::InvalidParameter {
                    parameter,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Every field as a stringified scalar, in wire order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields: Vec<(&'static str, String)> = Parameter::ALL
            .iter()
            .map(|parameter| (parameter.form_field(), self.value(*parameter).to_string()))
            .collect();
        fields.push(("road_condition", self.road_condition.clone()));
        fields.push(("debug_mode", self.debug_mode.to_string()));
        fields
    }
}

/// A single typed mutation of the parameter set.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterUpdate {
    Pressure(f64),
    Load(f64),
    Tkph(f64),
    Temperature(f64),
    Speed(f64),
    RoadCondition(String),
    DebugMode(bool),
}

impl ParameterUpdate {
    pub fn numeric(parameter: Parameter, value: f64) -> Self {
        match parameter {
            Parameter::Pressure => ParameterUpdate::Pressure(value),
            Parameter::Load => ParameterUpdate::Load(value),
            Parameter::Tkph => ParameterUpdate::Tkph(value),
            Parameter::Temperature => ParameterUpdate::Temperature(value),
            Parameter::Speed => ParameterUpdate::Speed(value),
        }
    }
}

#[derive(Debug, Default)]
pub struct ParameterStore {
    current: ParameterSet,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, update: ParameterUpdate) {
        match update {
            ParameterUpdate::Pressure(value) => self.current.pressure = value,
            ParameterUpdate::Load(value) => self.current.load = value,
            ParameterUpdate::Tkph(value) => self.current.tkph = value,
            ParameterUpdate::Temperature(value) => self.current.temperature = value,
            ParameterUpdate::Speed(value) => self.current.speed = value,
            ParameterUpdate::RoadCondition(value) => self.current.road_condition = value,
            ParameterUpdate::DebugMode(value) => self.current.debug_mode = value,
        }
    }

    pub fn get(&self) -> ParameterSet {
        self.current.clone()
    }

    pub fn current(&self) -> &ParameterSet {
        &self.current
    }
}
