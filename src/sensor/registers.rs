//! APDS-9151 register map and bit-encoded configuration values
//!
//! Every configuration register packs two or more enumerations into a single
//! byte. The combined values are built through constructors that only accept the
//! matching pair of enumerations, so unrelated fields can never be OR-ed together.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Default 7-bit I2C address of the color sensor
pub const DEFAULT_ADDRESS: u16 = 0x52;

/// Expected content of the part-ID register
pub const PART_ID: u8 = 0xC2;

/// Power-on/brownout flag in MAIN_STATUS, cleared by reading the register
pub const RESET_FLAG: u8 = 0x20;

/// Proximity LED pulse count written during initialization
pub const DEFAULT_PROXIMITY_PULSES: u8 = 32;

/// Masks for the assembled little-endian channel values
pub const COLOR_CHANNEL_MASK: u32 = 0x03FFFF;
pub const PROXIMITY_MASK: u16 = 0x7FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    MainCtrl = 0x00,
    ProximitySensorLed = 0x01,
    ProximitySensorPulses = 0x02,
    ProximitySensorRate = 0x03,
    LightSensorMeasurementRate = 0x04,
    LightSensorGain = 0x05,
    PartId = 0x06,
    MainStatus = 0x07,
    ProximityData = 0x08,
    DataInfrared = 0x0A,
    DataGreen = 0x0D,
    DataBlue = 0x10,
    DataRed = 0x13,
}

impl Register {
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

bitflags! {
    /// MAIN_CTRL enable bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MainControl: u8 {
        /// Color channels active (otherwise ALS mode)
        const RGB_MODE = 0x04;
        const LIGHT_SENSOR_ENABLE = 0x02;
        const PROXIMITY_SENSOR_ENABLE = 0x01;
    }
}

impl MainControl {
    /// Everything the scoreboard needs: RGB, light sensor and proximity
    pub const fn all_sensors() -> Self {
        Self::RGB_MODE
            .union(Self::LIGHT_SENSOR_ENABLE)
            .union(Self::PROXIMITY_SENSOR_ENABLE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum GainFactor {
    Gain1x = 0x00,
    #[default]
    Gain3x = 0x01,
    Gain6x = 0x02,
    Gain9x = 0x03,
    Gain18x = 0x04,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LedCurrent {
    Pulse2mA = 0x00,
    Pulse5mA = 0x01,
    Pulse10mA = 0x02,
    Pulse25mA = 0x03,
    Pulse50mA = 0x04,
    Pulse75mA = 0x05,
    #[default]
    Pulse100mA = 0x06,
    Pulse125mA = 0x07,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LedPulseFrequency {
    #[default]
    Freq60kHz = 0x18,
    Freq70kHz = 0x40,
    Freq80kHz = 0x28,
    Freq90kHz = 0x30,
    Freq100kHz = 0x38,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProximityResolution {
    Bits8 = 0x00,
    Bits9 = 0x08,
    Bits10 = 0x10,
    Bits11 = 0x18,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProximityRate {
    Ms6 = 0x01,
    Ms12 = 0x02,
    Ms25 = 0x03,
    Ms50 = 0x04,
    Ms100 = 0x05,
    Ms200 = 0x06,
    Ms400 = 0x07,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ColorResolution {
    Bits20 = 0x00,
    Bits19 = 0x10,
    #[default]
    Bits18 = 0x20,
    Bits17 = 0x30,
    Bits16 = 0x40,
    Bits13 = 0x50,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ColorRate {
    Ms25 = 0,
    Ms50 = 1,
    #[default]
    Ms100 = 2,
    Ms200 = 3,
    Ms500 = 4,
    Ms1000 = 5,
    Ms2000 = 7,
}

/// PS_LED register: pulse frequency in bits 3..6, current in bits 0..2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedSetting(u8);

impl LedSetting {
    pub const fn new(frequency: LedPulseFrequency, current: LedCurrent) -> Self {
        Self(frequency as u8 | current as u8)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// PS_MEAS_RATE register: resolution in bits 3..4, rate in bits 0..2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityMeasurement(u8);

impl ProximityMeasurement {
    pub const fn new(resolution: ProximityResolution, rate: ProximityRate) -> Self {
        Self(resolution as u8 | rate as u8)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// LS_MEAS_RATE register: resolution in bits 4..6, rate in bits 0..2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMeasurement(u8);

impl ColorMeasurement {
    pub const fn new(resolution: ColorResolution, rate: ColorRate) -> Self {
        Self(resolution as u8 | rate as u8)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// Complete device configuration, one field per register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub main_control: MainControl,
    pub led: LedSetting,
    pub proximity_pulses: u8,
    pub proximity: ProximityMeasurement,
    pub color: ColorMeasurement,
    pub gain: GainFactor,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            main_control: MainControl::all_sensors(),
            led: LedSetting::new(LedPulseFrequency::default(), LedCurrent::default()),
            proximity_pulses: DEFAULT_PROXIMITY_PULSES,
            proximity: ProximityMeasurement::new(ProximityResolution::Bits11, ProximityRate::Ms100),
            color: ColorMeasurement::new(ColorResolution::default(), ColorRate::default()),
            gain: GainFactor::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_control_enables_all_three_sensors() {
        assert_eq!(MainControl::all_sensors().bits(), 0x07);
    }

    #[test]
    fn combined_registers_keep_fields_disjoint() {
        assert_eq!(
            LedSetting::new(LedPulseFrequency::Freq60kHz, LedCurrent::Pulse100mA).bits(),
            0x1E
        );
        assert_eq!(
            LedSetting::new(LedPulseFrequency::Freq70kHz, LedCurrent::Pulse125mA).bits(),
            0x47
        );
        assert_eq!(
            ProximityMeasurement::new(ProximityResolution::Bits11, ProximityRate::Ms100).bits(),
            0x1D
        );
        assert_eq!(
            ColorMeasurement::new(ColorResolution::Bits13, ColorRate::Ms2000).bits(),
            0x57
        );
    }

    #[test]
    fn default_config_matches_startup_sequence() {
        let config = DeviceConfig::default();
        assert_eq!(config.main_control, MainControl::all_sensors());
        assert_eq!(config.proximity.bits(), 0x1D);
        assert_eq!(config.proximity_pulses, 32);
    }
}
