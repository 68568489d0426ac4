//! Register-oriented bus access
//!
//! The color sensor speaks plain SMBus-style register transactions: single byte
//! reads and writes plus an auto-incrementing block read. [`BusTransport`] is the
//! seam between the driver and the hardware so the driver can be exercised against
//! an in-memory register map.

use rppal::i2c::I2c;
use tracing::{debug, info};

/// Errors raised by a single bus transaction
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bus device node could not be opened or addressed
    #[error("Failed to open I2C bus {bus} at address {address:#04x}: {reason}")]
    Open { bus: u8, address: u16, reason: String },

    /// NACK, timeout or short transfer on a register transaction
    #[error("Transaction on register {register:#04x} failed: {reason}")]
    Transaction { register: u8, reason: String },
}

/// Raw register primitives for one device on one bus handle
pub trait BusTransport {
    /// Reads a single byte from `register`
    fn read_byte(&mut self, register: u8) -> Result<u8, BusError>;

    /// Fills `buffer` with consecutive bytes starting at `register`
    fn read_block(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), BusError>;

    /// Writes a single byte to `register`
    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), BusError>;
}

/// Linux I2C transport backed by `rppal`
pub struct RppalBus {
    i2c: I2c,
    bus: u8,
    address: u16,
}

impl RppalBus {
    /// Opens `/dev/i2c-<bus>` and addresses the device at `address`
    pub fn open(bus: u8, address: u16) -> Result<Self, BusError> {
        info!("Opening I2C bus {} for device {:#04x}", bus, address);

        let mut i2c = I2c::with_bus(bus).map_err(|e| BusError::Open {
            bus,
            address,
            reason: e.to_string(),
        })?;
        i2c.set_slave_address(address)
            .map_err(|e| BusError::Open {
                bus,
                address,
                reason: e.to_string(),
            })?;

        debug!("I2C bus {} ready", bus);
        Ok(Self { i2c, bus, address })
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }

    pub fn address(&self) -> u16 {
        self.address
    }
}

impl BusTransport for RppalBus {
    fn read_byte(&mut self, register: u8) -> Result<u8, BusError> {
        self.i2c
            .smbus_read_byte(register)
            .map_err(|e| BusError::Transaction {
                register,
                reason: e.to_string(),
            })
    }

    fn read_block(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        // Repeated start: register pointer write, then the burst read
        self.i2c
            .write_read(&[register], buffer)
            .map_err(|e| BusError::Transaction {
                register,
                reason: e.to_string(),
            })
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        self.i2c
            .smbus_write_byte(register, value)
            .map_err(|e| BusError::Transaction {
                register,
                reason: e.to_string(),
            })
    }
}
