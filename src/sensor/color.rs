//! Color sample types and the channel decoding / conversion math

use super::registers::{COLOR_CHANNEL_MASK, PROXIMITY_MASK};

/// Factory calibration transform from raw RGB to CIE XYZ, row-major
pub const CIE_MATRIX: [[f64; 3]; 3] = [
    [0.048112847, 0.289453437, -0.084950826],
    [-0.030754752, 0.339680186, -0.071569905],
    [-0.093947499, 0.072838494, 0.34024948],
];

/// One reading of every ADC channel
///
/// The channels come from separate bus transactions, so a sample taken while the
/// light changes may mix values from different instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawColorSample {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub ir: u32,
    pub proximity: u16,
}

impl RawColorSample {
    /// Channels in the order the telemetry array expects them
    pub fn channels(&self) -> [i64; 4] {
        [
            self.red as i64,
            self.green as i64,
            self.blue as i64,
            self.ir as i64,
        ]
    }

    pub fn normalized(&self) -> ColorReading {
        ColorReading::from_rgb(self.red, self.green, self.blue)
    }

    pub fn cie(&self) -> CieColor {
        CieColor::from_rgb(self.red, self.green, self.blue)
    }
}

/// RGB channels scaled by their sum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Result of normalizing a sample; [`ColorReading::NoSignal`] when no light reached the sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorReading {
    Color(NormalizedColor),
    NoSignal,
}

impl ColorReading {
    pub fn from_rgb(red: u32, green: u32, blue: u32) -> Self {
        let magnitude = red as f64 + green as f64 + blue as f64;
        if magnitude == 0.0 {
            return ColorReading::NoSignal;
        }
        ColorReading::Color(NormalizedColor {
            r: red as f64 / magnitude,
            g: green as f64 / magnitude,
            b: blue as f64 / magnitude,
        })
    }

    pub fn color(&self) -> Option<&NormalizedColor> {
        match self {
            ColorReading::Color(color) => Some(color),
            ColorReading::NoSignal => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CieColor {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CieColor {
    /// Applies [`CIE_MATRIX`] to the raw channels; IR does not take part
    pub fn from_rgb(red: u32, green: u32, blue: u32) -> Self {
        let rgb = [red as f64, green as f64, blue as f64];
        let row = |i: usize| -> f64 {
            CIE_MATRIX[i]
                .iter()
                .zip(rgb.iter())
                .map(|(c, v)| c * v)
                .sum()
        };
        Self {
            x: row(0),
            y: row(1),
            z: row(2),
        }
    }
}

/// Assembles a little-endian 3-byte channel and masks it to the ADC width
pub fn decode_color_channel(raw: [u8; 3]) -> u32 {
    (raw[0] as u32 | (raw[1] as u32) << 8 | (raw[2] as u32) << 16) & COLOR_CHANNEL_MASK
}

/// Assembles the little-endian 2-byte proximity value and masks it to 11 bits
pub fn decode_proximity(raw: [u8; 2]) -> u16 {
    (raw[0] as u16 | (raw[1] as u16) << 8) & PROXIMITY_MASK
}
