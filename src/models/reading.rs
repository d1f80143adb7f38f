use chrono::{DateTime, Utc};
use serde::Serialize;

/// One data message reported by a sensor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reading {
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    /// Numeric values in the order of `labels`
    pub values: Vec<f64>,
    pub labels: Vec<String>,
    /// Human-readable value as shown in iMonnit, e.g. `21.5° C`
    pub display: String,
    pub battery: Option<u8>,
    pub signal_strength: Option<i32>,
    pub voltage: Option<f64>,
}

impl Reading {
    /// First numeric value, if the message carried any.
    pub fn value(&self) -> Option<f64> {
        self.values.first().copied()
    }
}

/// Aggregated readings of one sensor over a whole fetch window.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorReadings {
    pub sensor_id: String,
    pub readings: Vec<Reading>,
}

impl SensorReadings {
    pub fn new(sensor_id: impl Into<String>, readings: Vec<Reading>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            readings,
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
