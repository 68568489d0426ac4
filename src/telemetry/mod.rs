//! # Telemetry
//!
//! Publishes the raw sensor readings of every tick so they can be watched from the
//! driver station while tuning thresholds.
//!
//! ```text
//! telemetry/
//! ├── mod.rs   - sink trait, batch type, null and recording sinks
//! └── mqtt.rs  - rumqttc publisher with a background network pump
//! ```
//!
//! Entries are queued with `put_*` during a tick and go out together on
//! [`TelemetrySink::flush`], so a reader never sees half a tick.

pub mod mqtt;

use serde::Serialize;

/// Errors reported by telemetry publishers
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to encode telemetry payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to queue telemetry message: {0}")]
    Publish(#[from] rumqttc::ClientError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    NumberArray(Vec<i64>),
    Number(f64),
}

/// Entries queued since the last flush, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryBatch {
    entries: Vec<(String, TelemetryValue)>,
}

impl TelemetryBatch {
    pub fn put(&mut self, name: &str, value: TelemetryValue) {
        // Last write within a tick wins
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name.to_string(), value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&TelemetryValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn take(&mut self) -> Vec<(String, TelemetryValue)> {
        std::mem::take(&mut self.entries)
    }
}

pub trait TelemetrySink {
    fn put_number_array(&mut self, name: &str, values: &[i64]);
    fn put_number(&mut self, name: &str, value: f64);
    /// Marks the end of a tick and sends everything queued since the last flush
    fn flush(&mut self) -> Result<(), TelemetryError>;
}

/// Sink used when telemetry is switched off
#[derive(Debug, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn put_number_array(&mut self, _name: &str, _values: &[i64]) {}
    fn put_number(&mut self, _name: &str, _value: f64) {}
    fn flush(&mut self) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Keeps every flushed batch in memory
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    pending: TelemetryBatch,
    pub flushed: std::rc::Rc<std::cell::RefCell<Vec<TelemetryBatch>>>,
}

#[cfg(test)]
impl TelemetrySink for RecordingTelemetry {
    fn put_number_array(&mut self, name: &str, values: &[i64]) {
        self.pending
            .put(name, TelemetryValue::NumberArray(values.to_vec()));
    }

    fn put_number(&mut self, name: &str, value: f64) {
        self.pending.put(name, TelemetryValue::Number(value));
    }

    fn flush(&mut self) -> Result<(), TelemetryError> {
        let batch = std::mem::take(&mut self.pending);
        self.flushed.borrow_mut().push(batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_keeps_last_value_per_name() {
        let mut batch = TelemetryBatch::default();
        batch.put("proximity1", TelemetryValue::Number(10.0));
        batch.put("rawcolor1", TelemetryValue::NumberArray(vec![1, 2, 3, 4]));
        batch.put("proximity1", TelemetryValue::Number(12.0));

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.get("proximity1"), Some(&TelemetryValue::Number(12.0)));
    }

    #[test]
    fn values_serialize_as_plain_json() {
        let array = serde_json::to_string(&TelemetryValue::NumberArray(vec![1, 2, 3, 4])).unwrap();
        let number = serde_json::to_string(&TelemetryValue::Number(2047.0)).unwrap();
        assert_eq!(array, "[1,2,3,4]");
        assert_eq!(number, "2047.0");
    }
}
