//! Color sensor subsystem
//!
//! Driver stack for the REV Color Sensor V3 (Broadcom APDS-9151) on the
//! Raspberry Pi I2C busses:
//!
//! 1. [`bus`] - register transactions over `rppal` I2C
//! 2. [`registers`] - register map and typed configuration values
//! 3. [`color`] - channel decoding, normalization and CIE conversion
//! 4. [`driver`] - statum bring-up states and register-level operations
//! 5. [`device`] - availability tracking used by the match loop
//!
//! # Architecture
//!
//! ```text
//! BusTransport ──► ColorSensorV3<Ready> ──► ColorSensorDevice ──► RawColorSample
//!  (rppal I2C)      (typed bring-up)        (Ready/Unavailable)
//! ```

pub mod bus;
pub mod color;
pub mod device;
pub mod driver;
pub mod registers;

pub use bus::{BusError, BusTransport, RppalBus};
pub use color::{CieColor, ColorReading, NormalizedColor, RawColorSample};
pub use device::ColorSensorDevice;

/// Errors reported by the color sensor driver
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// Transport failure that survived the retry
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// Something else answers on the color sensor address
    #[error("Unknown device at color sensor address (part id {found:#04x}, expected {expected:#04x})")]
    UnknownPartId { found: u8, expected: u8 },

    /// The device was taken out of service earlier in the run
    #[error("Color sensor '{0}' is unavailable")]
    Unavailable(String),
}
