//! # Operator Settings
//!
//! Site-specific knobs that are not part of the FRC image's `frc.json`: loop timing,
//! which I2C bus each alliance's sensor sits on, the color measurement setup and
//! where telemetry goes.
//!
//! Stored as TOML in `~/.scoreboard/settings.toml`. A missing file is created with
//! the defaults on first start; a file that does not parse is reported and the
//! defaults are used for the run, leaving the file untouched for the operator to fix.
//! Every section and field is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::sensor::registers::{
    ColorMeasurement, ColorRate, ColorResolution, DeviceConfig, GainFactor, DEFAULT_ADDRESS,
};

const CONFIG_DIR: &str = ".scoreboard";
const SETTINGS_FILE: &str = "settings.toml";

/// Shortest allowed tick; also the minimum gap between sensor transactions
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub timing: TimingSettings,
    pub sensors: SensorSettings,
    pub telemetry: TelemetrySettings,
    pub display: DisplaySettings,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TimingSettings {
    pub tick_interval_ms: u64,
    /// Used instead of `tick_interval_ms` when running without hardware
    pub simulation_tick_interval_ms: u64,
    /// How often, in ticks, the sensors' power-on flag is polled
    pub reset_check_interval_ticks: u32,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 5,
            simulation_tick_interval_ms: 67,
            reset_check_interval_ticks: 200,
        }
    }
}

impl TimingSettings {
    pub fn tick_interval(&self, simulation: bool) -> Duration {
        let millis = if simulation {
            self.simulation_tick_interval_ms
        } else {
            self.tick_interval_ms
        };
        Duration::from_millis(millis).max(MIN_TICK_INTERVAL)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SensorSettings {
    pub red_bus: u8,
    pub blue_bus: u8,
    pub address: u16,
    pub color_resolution: ColorResolution,
    pub color_rate: ColorRate,
    pub gain: GainFactor,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            red_bus: 1,
            blue_bus: 0,
            address: DEFAULT_ADDRESS,
            color_resolution: ColorResolution::default(),
            color_rate: ColorRate::default(),
            gain: GainFactor::default(),
        }
    }
}

impl SensorSettings {
    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            color: ColorMeasurement::new(self.color_resolution, self.color_rate),
            gain: self.gain,
            ..DeviceConfig::default()
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub port: u16,
    pub topic_prefix: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 1883,
            topic_prefix: "colorsensor".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DisplaySettings {
    pub fullscreen: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { fullscreen: true }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        let mut path = get_home_dir();
        path.push(CONFIG_DIR);
        path.push(SETTINGS_FILE);
        path
    }

    /// Reads the settings at `path`, writing the defaults there first if the file
    /// does not exist yet
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if settings file exists: {}", e))?
        {
            info!("Creating default settings at {}", path.display());
            let settings = Settings::default();
            settings.save(path).await?;
            return Ok(settings);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read settings file: {}", e))?;

        match toml::from_str(&content) {
            Ok(settings) => {
                info!("Loaded settings from {}", path.display());
                Ok(settings)
            }
            Err(e) => {
                warn!(
                    "Failed to parse settings file {}, using defaults: {}",
                    path.display(),
                    e
                );
                Ok(Settings::default())
            }
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create settings directory: {}", e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize settings: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write settings file: {}", e))?;
        Ok(())
    }
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}
