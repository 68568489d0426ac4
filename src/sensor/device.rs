//! Runtime handle for one color sensor
//!
//! Wraps the typed driver in a two-state slot: either the sensor is `Ready`, or
//! it has been taken out of service. A failed identification or a bus error that
//! survives the driver's retry moves the device to `Unavailable`, and from then on
//! every call short-circuits with [`SensorError::Unavailable`] without touching the
//! bus. Only an explicit [`ColorSensorDevice::reidentify`] brings it back.

use tracing::{error, info, warn};

use super::bus::{BusTransport, RppalBus};
use super::color::{CieColor, ColorReading, RawColorSample};
use super::driver::{ColorSensorV3, Ready};
use super::registers::DeviceConfig;
use super::SensorError;

enum Slot {
    Ready(ColorSensorV3<Ready>),
    Unavailable {
        fault: String,
        /// Kept when the bus itself opened fine, so the device can be re-identified
        bus: Option<Box<dyn BusTransport>>,
    },
}

pub struct ColorSensorDevice {
    name: String,
    slot: Slot,
    /// Configuration to restore after a detected reset or a re-identify
    config: Option<DeviceConfig>,
}

impl ColorSensorDevice {
    /// Opens the I2C bus and runs the full bring-up; never fails, but the
    /// resulting device may be unavailable
    pub fn open(name: impl Into<String>, bus_id: u8, address: u16) -> Self {
        let name = name.into();
        match RppalBus::open(bus_id, address) {
            Ok(bus) => {
                info!(
                    "Color sensor '{}' on I2C bus {} at {:#04x}",
                    name,
                    bus.bus(),
                    bus.address()
                );
                Self::bring_up(name, Box::new(bus))
            }
            Err(e) => {
                error!("Color sensor '{}' could not open its bus: {}", name, e);
                Self {
                    name,
                    slot: Slot::Unavailable {
                        fault: e.to_string(),
                        bus: None,
                    },
                    config: None,
                }
            }
        }
    }

    /// Identifies, initializes and clears the startup reset flag on `bus`
    pub fn bring_up(name: impl Into<String>, bus: Box<dyn BusTransport>) -> Self {
        let name = name.into();
        let slot = match ColorSensorV3::<Ready>::bring_up(bus, name.clone()) {
            Ok(sensor) => {
                info!("Color sensor '{}' ready", name);
                Slot::Ready(sensor)
            }
            Err(failure) => {
                error!(
                    "Color sensor '{}' unavailable for this run: {}",
                    name, failure.error
                );
                Slot::Unavailable {
                    fault: failure.error.to_string(),
                    bus: Some(failure.bus),
                }
            }
        };
        Self {
            name,
            slot,
            config: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_available(&self) -> bool {
        matches!(self.slot, Slot::Ready(_))
    }

    /// Why the device went out of service, if it did
    pub fn fault(&self) -> Option<&str> {
        match &self.slot {
            Slot::Ready(_) => None,
            Slot::Unavailable { fault, .. } => Some(fault),
        }
    }

    /// Writes `config` and remembers it for later re-initialization
    pub fn apply_config(&mut self, config: DeviceConfig) -> Result<(), SensorError> {
        self.config = Some(config);
        self.with_ready(|sensor| sensor.apply_config(&config))
    }

    /// Color channels plus proximity, one transaction per channel
    pub fn sample(&mut self) -> Result<RawColorSample, SensorError> {
        self.with_ready(|sensor| sensor.sample())
    }

    pub fn raw_color(&mut self) -> Result<RawColorSample, SensorError> {
        self.with_ready(|sensor| sensor.raw_color())
    }

    pub fn proximity(&mut self) -> Result<u16, SensorError> {
        self.with_ready(|sensor| sensor.proximity())
    }

    pub fn color(&mut self) -> Result<ColorReading, SensorError> {
        self.with_ready(|sensor| sensor.color())
    }

    pub fn cie_color(&mut self) -> Result<CieColor, SensorError> {
        self.with_ready(|sensor| sensor.cie_color())
    }

    /// Polls the power-on flag and restores the configuration when it is set.
    /// Returns whether a reset was detected.
    pub fn check_reset(&mut self) -> Result<bool, SensorError> {
        let config = self.config;
        self.with_ready(|sensor| {
            if !sensor.has_reset()? {
                return Ok(false);
            }
            sensor.reinitialize()?;
            if let Some(config) = config.as_ref() {
                sensor.apply_config(config)?;
            }
            Ok(true)
        })
    }

    /// Runs the bring-up again on an unavailable device that still owns its bus
    pub fn reidentify(&mut self) -> Result<(), SensorError> {
        let placeholder = Slot::Unavailable {
            fault: "re-identifying".to_string(),
            bus: None,
        };
        match std::mem::replace(&mut self.slot, placeholder) {
            Slot::Ready(sensor) => {
                self.slot = Slot::Ready(sensor);
                Ok(())
            }
            Slot::Unavailable {
                bus: Some(bus), ..
            } => {
                info!("Re-identifying color sensor '{}'", self.name);
                match ColorSensorV3::<Ready>::bring_up(bus, self.name.clone()) {
                    Ok(sensor) => {
                        self.slot = Slot::Ready(sensor);
                        if let Some(config) = self.config {
                            self.with_ready(|sensor| sensor.apply_config(&config))?;
                        }
                        info!("Color sensor '{}' back in service", self.name);
                        Ok(())
                    }
                    Err(failure) => {
                        self.slot = Slot::Unavailable {
                            fault: failure.error.to_string(),
                            bus: Some(failure.bus),
                        };
                        Err(failure.error)
                    }
                }
            }
            Slot::Unavailable { fault, bus: None } => {
                warn!(
                    "Color sensor '{}' has no bus handle to re-identify on",
                    self.name
                );
                self.slot = Slot::Unavailable { fault, bus: None };
                Err(SensorError::Unavailable(self.name.clone()))
            }
        }
    }

    fn with_ready<T>(
        &mut self,
        operation: impl FnOnce(&mut ColorSensorV3<Ready>) -> Result<T, SensorError>,
    ) -> Result<T, SensorError> {
        let Slot::Ready(sensor) = &mut self.slot else {
            return Err(SensorError::Unavailable(self.name.clone()));
        };
        match operation(sensor) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.take_out_of_service(&e);
                Err(e)
            }
        }
    }

    fn take_out_of_service(&mut self, cause: &SensorError) {
        error!(
            "Color sensor '{}' taken out of service: {}",
            self.name, cause
        );
        let unavailable = Slot::Unavailable {
            fault: cause.to_string(),
            bus: None,
        };
        if let Slot::Ready(sensor) = std::mem::replace(&mut self.slot, unavailable) {
            self.slot = Slot::Unavailable {
                fault: cause.to_string(),
                bus: Some(sensor.into_bus()),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::bus::fake::FakeBus;
    use crate::sensor::registers::{
        ColorMeasurement, ColorRate, ColorResolution, GainFactor, PART_ID, RESET_FLAG,
    };

    #[test]
    fn identification_failure_degrades_to_unavailable() {
        let bus = FakeBus::with_part_id(0x00);
        let mut device = ColorSensorDevice::bring_up("red", Box::new(bus.clone()));

        assert!(!device.is_available());
        let reads_after_bring_up = bus.state.borrow().reads.len();

        assert!(matches!(device.sample(), Err(SensorError::Unavailable(_))));
        assert!(matches!(device.color(), Err(SensorError::Unavailable(_))));
        assert_eq!(bus.state.borrow().reads.len(), reads_after_bring_up);
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn persistent_bus_failure_takes_device_out_of_service() {
        let bus = FakeBus::with_part_id(PART_ID);
        let mut device = ColorSensorDevice::bring_up("blue", Box::new(bus.clone()));
        assert!(device.is_available());

        bus.state.borrow_mut().dead = true;
        assert!(matches!(device.sample(), Err(SensorError::Bus(_))));
        assert!(!device.is_available());
        assert!(device.fault().is_some());

        // No more transactions once out of service
        assert!(matches!(device.proximity(), Err(SensorError::Unavailable(_))));
    }

    #[test]
    fn reidentify_restores_a_recovered_device() {
        let bus = FakeBus::with_part_id(PART_ID);
        let mut device = ColorSensorDevice::bring_up("blue", Box::new(bus.clone()));
        bus.state.borrow_mut().dead = true;
        let _ = device.sample();
        assert!(!device.is_available());

        bus.state.borrow_mut().dead = false;
        device.reidentify().unwrap();
        assert!(device.is_available());
        assert!(device.sample().is_ok());
    }

    #[test]
    fn detected_reset_reapplies_configuration() {
        let bus = FakeBus::with_part_id(PART_ID);
        let mut device = ColorSensorDevice::bring_up("red", Box::new(bus.clone()));
        let config = DeviceConfig {
            gain: GainFactor::Gain9x,
            ..DeviceConfig::default()
        };
        device.apply_config(config).unwrap();
        assert!(!device.check_reset().unwrap());

        bus.set(0x07, RESET_FLAG);
        bus.set(0x05, 0x00);
        assert!(device.check_reset().unwrap());
        assert_eq!(bus.state.borrow().registers[0x05], GainFactor::Gain9x as u8);
    }

    #[test]
    fn configuration_given_while_offline_is_written_on_reidentify() {
        let bus = FakeBus::with_part_id(0x00);
        let mut device = ColorSensorDevice::bring_up("red", Box::new(bus.clone()));
        let config = DeviceConfig {
            color: ColorMeasurement::new(ColorResolution::Bits16, ColorRate::Ms50),
            gain: GainFactor::Gain18x,
            ..DeviceConfig::default()
        };
        assert!(matches!(
            device.apply_config(config),
            Err(SensorError::Unavailable(_))
        ));
        assert!(bus.writes().is_empty());

        bus.set(0x06, PART_ID);
        device.reidentify().unwrap();

        assert!(device.is_available());
        let writes = bus.writes();
        assert!(writes.contains(&(0x04, config.color.bits())));
        assert!(writes.contains(&(0x05, GainFactor::Gain18x as u8)));
        assert_eq!(bus.state.borrow().registers[0x05], GainFactor::Gain18x as u8);
    }
}
