//! REV Color Sensor V3 driver with statum bring-up states
//!
//! The driver moves through its bring-up sequence as distinct types, so register
//! reads are only callable once identification, initialization and the startup
//! reset-flag read have all happened:
//!
//! ```text
//! Unidentified ──identify──► Identified ──initialize──► Configured ──clear_startup_reset──► Ready
//! ```
//!
//! Every transaction gets one bounded retry before the error is reported.

use statum::{machine, state};
use tracing::{debug, info, warn};

use super::bus::{BusError, BusTransport};
use super::color::{
    decode_color_channel, decode_proximity, CieColor, ColorReading, RawColorSample,
};
use super::registers::{
    ColorMeasurement, ColorRate, ColorResolution, DeviceConfig, GainFactor, LedCurrent,
    LedPulseFrequency, LedSetting, MainControl, ProximityMeasurement, ProximityRate,
    ProximityResolution, Register, DEFAULT_PROXIMITY_PULSES, PART_ID, RESET_FLAG,
};
use super::SensorError;

/// Attempts per transaction, the first try included
const TRANSACTION_ATTEMPTS: usize = 2;

#[state]
#[derive(Debug, Clone)]
pub enum SensorState {
    Unidentified, // Bus open, nothing known about the device
    Identified,   // Part ID confirmed
    Configured,   // Startup registers written
    Ready,        // Startup reset flag absorbed, reads allowed
}

#[machine]
pub struct ColorSensorV3<S: SensorState> {
    bus: Box<dyn BusTransport>,
    name: String,
}

/// A failed bring-up step; the bus is handed back so the device can be retried
pub struct BringupFailure {
    pub error: SensorError,
    pub bus: Box<dyn BusTransport>,
}

impl<S: SensorState> ColorSensorV3<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gives up the driver and returns the bus handle
    pub fn into_bus(self) -> Box<dyn BusTransport> {
        self.bus
    }

    fn fail(self, error: SensorError) -> BringupFailure {
        warn!("Color sensor '{}' bring-up failed: {}", self.name, error);
        BringupFailure {
            error,
            bus: self.bus,
        }
    }

    fn read_byte(&mut self, register: Register) -> Result<u8, SensorError> {
        let name = &self.name;
        let bus = &mut self.bus;
        with_retry(name, register, || bus.read_byte(register.addr()))
    }

    fn read_block<const N: usize>(&mut self, register: Register) -> Result<[u8; N], SensorError> {
        let name = &self.name;
        let bus = &mut self.bus;
        with_retry(name, register, || {
            let mut buffer = [0u8; N];
            bus.read_block(register.addr(), &mut buffer)?;
            Ok(buffer)
        })
    }

    fn write_byte(&mut self, register: Register, value: u8) -> Result<(), SensorError> {
        debug!(
            "{}: write {:#04x} -> {:?} ({:#04x})",
            self.name,
            value,
            register,
            register.addr()
        );
        let name = &self.name;
        let bus = &mut self.bus;
        with_retry(name, register, || bus.write_byte(register.addr(), value))
    }

    /// MAIN_CTRL enables, 11-bit/100 ms proximity and the default LED pulse count
    fn write_startup_registers(&mut self) -> Result<(), SensorError> {
        self.write_byte(Register::MainCtrl, MainControl::all_sensors().bits())?;
        self.write_byte(
            Register::ProximitySensorRate,
            ProximityMeasurement::new(ProximityResolution::Bits11, ProximityRate::Ms100).bits(),
        )?;
        self.write_byte(Register::ProximitySensorPulses, DEFAULT_PROXIMITY_PULSES)
    }

    fn read_reset_flag(&mut self) -> Result<bool, SensorError> {
        let status = self.read_byte(Register::MainStatus)?;
        Ok(status & RESET_FLAG != 0)
    }
}

impl ColorSensorV3<Unidentified> {
    pub fn create(bus: Box<dyn BusTransport>, name: impl Into<String>) -> Self {
        let name = name.into();
        debug!("Creating color sensor driver '{}'", name);
        Self::new(bus, name)
    }

    /// Checks the part-ID register against the APDS-9151 identifier
    pub fn identify(mut self) -> Result<ColorSensorV3<Identified>, BringupFailure> {
        let part_id = match self.read_byte(Register::PartId) {
            Ok(id) => id,
            Err(e) => return Err(self.fail(e)),
        };

        if part_id != PART_ID {
            return Err(self.fail(SensorError::UnknownPartId {
                found: part_id,
                expected: PART_ID,
            }));
        }

        info!("Color sensor '{}' identified (part id {:#04x})", self.name, part_id);
        Ok(self.transition())
    }
}

impl ColorSensorV3<Identified> {
    pub fn initialize(mut self) -> Result<ColorSensorV3<Configured>, BringupFailure> {
        if let Err(e) = self.write_startup_registers() {
            return Err(self.fail(e));
        }
        info!("Color sensor '{}' initialized", self.name);
        Ok(self.transition())
    }
}

impl ColorSensorV3<Configured> {
    /// Reads MAIN_STATUS once so the power-on flag set at startup is consumed;
    /// afterwards [`ColorSensorV3::has_reset`] only reports resets that happen later.
    pub fn clear_startup_reset(mut self) -> Result<ColorSensorV3<Ready>, BringupFailure> {
        match self.read_reset_flag() {
            Ok(flag) => {
                debug!("Color sensor '{}' startup reset flag: {}", self.name, flag);
                Ok(self.transition())
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

impl ColorSensorV3<Ready> {
    /// Full bring-up sequence from a freshly opened bus
    pub fn bring_up(
        bus: Box<dyn BusTransport>,
        name: impl Into<String>,
    ) -> Result<Self, BringupFailure> {
        ColorSensorV3::<Unidentified>::create(bus, name)
            .identify()?
            .initialize()?
            .clear_startup_reset()
    }

    /// Configures the IR LED used by the proximity sensor
    pub fn configure_proximity_sensor_led(
        &mut self,
        frequency: LedPulseFrequency,
        current: LedCurrent,
        pulses: u8,
    ) -> Result<(), SensorError> {
        self.write_byte(
            Register::ProximitySensorLed,
            LedSetting::new(frequency, current).bits(),
        )?;
        self.write_byte(Register::ProximitySensorPulses, pulses)
    }

    pub fn configure_proximity_sensor(
        &mut self,
        resolution: ProximityResolution,
        rate: ProximityRate,
    ) -> Result<(), SensorError> {
        self.write_byte(
            Register::ProximitySensorRate,
            ProximityMeasurement::new(resolution, rate).bits(),
        )
    }

    pub fn configure_color_sensor(
        &mut self,
        resolution: ColorResolution,
        rate: ColorRate,
        gain: GainFactor,
    ) -> Result<(), SensorError> {
        self.write_byte(
            Register::LightSensorMeasurementRate,
            ColorMeasurement::new(resolution, rate).bits(),
        )?;
        self.write_byte(Register::LightSensorGain, gain as u8)
    }

    /// Writes every register described by `config`
    pub fn apply_config(&mut self, config: &DeviceConfig) -> Result<(), SensorError> {
        info!("Applying device configuration to '{}': {:?}", self.name, config);
        self.write_byte(Register::MainCtrl, config.main_control.bits())?;
        self.write_byte(Register::ProximitySensorLed, config.led.bits())?;
        self.write_byte(Register::ProximitySensorPulses, config.proximity_pulses)?;
        self.write_byte(Register::ProximitySensorRate, config.proximity.bits())?;
        self.write_byte(Register::LightSensorMeasurementRate, config.color.bits())?;
        self.write_byte(Register::LightSensorGain, config.gain as u8)
    }

    pub fn red(&mut self) -> Result<u32, SensorError> {
        self.read_color_channel(Register::DataRed)
    }

    pub fn green(&mut self) -> Result<u32, SensorError> {
        self.read_color_channel(Register::DataGreen)
    }

    pub fn blue(&mut self) -> Result<u32, SensorError> {
        self.read_color_channel(Register::DataBlue)
    }

    pub fn ir(&mut self) -> Result<u32, SensorError> {
        self.read_color_channel(Register::DataInfrared)
    }

    /// Raw proximity ADC value (0-2047), largest when an object is close
    pub fn proximity(&mut self) -> Result<u16, SensorError> {
        let raw = self.read_block::<2>(Register::ProximityData)?;
        Ok(decode_proximity(raw))
    }

    /// Red, green, blue and IR channels; proximity is left at zero
    pub fn raw_color(&mut self) -> Result<RawColorSample, SensorError> {
        Ok(RawColorSample {
            red: self.red()?,
            green: self.green()?,
            blue: self.blue()?,
            ir: self.ir()?,
            proximity: 0,
        })
    }

    /// All four color channels plus proximity
    pub fn sample(&mut self) -> Result<RawColorSample, SensorError> {
        let mut sample = self.raw_color()?;
        sample.proximity = self.proximity()?;
        Ok(sample)
    }

    pub fn color(&mut self) -> Result<ColorReading, SensorError> {
        let red = self.red()?;
        let green = self.green()?;
        let blue = self.blue()?;
        Ok(ColorReading::from_rgb(red, green, blue))
    }

    pub fn cie_color(&mut self) -> Result<CieColor, SensorError> {
        Ok(self.raw_color()?.cie())
    }

    /// True when the part went through a power-up or brownout since the last check
    pub fn has_reset(&mut self) -> Result<bool, SensorError> {
        self.read_reset_flag()
    }

    /// Rewrites the startup registers after the part lost its configuration
    pub fn reinitialize(&mut self) -> Result<(), SensorError> {
        warn!("Color sensor '{}' reset detected, reinitializing", self.name);
        self.write_startup_registers()
    }

    fn read_color_channel(&mut self, register: Register) -> Result<u32, SensorError> {
        let raw = self.read_block::<3>(register)?;
        Ok(decode_color_channel(raw))
    }
}

fn with_retry<T>(
    name: &str,
    register: Register,
    mut transaction: impl FnMut() -> Result<T, BusError>,
) -> Result<T, SensorError> {
    let mut attempt = 1;
    loop {
        match transaction() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < TRANSACTION_ATTEMPTS => {
                warn!(
                    "{}: {:?} transaction failed (attempt {}), retrying: {}",
                    name, register, attempt, e
                );
                attempt += 1;
            }
            Err(e) => return Err(SensorError::Bus(e)),
        }
    }
}
