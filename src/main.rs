pub mod config;
pub mod game;
pub mod sensor;
pub mod settings;
pub mod telemetry;
pub mod ui;

use crate::config::StartupConfig;
use crate::game::MatchController;
use crate::sensor::{ColorSensorDevice, SensorError};
use crate::settings::{SensorSettings, Settings};
use crate::telemetry::mqtt::{broker_host, MqttTelemetry, TelemetryStatus};
use crate::telemetry::{NullTelemetry, TelemetrySink};
use crate::ui::ScoreboardUI;
use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let simulation = simulation_enabled();
    if simulation {
        info!("SIMULATION=True: running without sensors");
    }

    let config_path = StartupConfig::path_from_args(std::env::args());
    let startup = match StartupConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) if simulation => {
            warn!("{}, continuing with defaults", e);
            StartupConfig::default()
        }
        Err(e) => return Err(eyre!("Failed to read startup configuration: {}", e)),
    };

    let settings = match Settings::load_or_create(&Settings::default_path()).await {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Operator settings unavailable, using defaults: {}", e);
            Settings::default()
        }
    };

    let (telemetry, telemetry_status) = setup_telemetry(&startup, &settings);

    let (red, blue) = if simulation {
        (None, None)
    } else {
        (
            Some(open_sensor("red", settings.sensors.red_bus, &settings.sensors)),
            Some(open_sensor("blue", settings.sensors.blue_bus, &settings.sensors)),
        )
    };

    let tick_interval = settings.timing.tick_interval(simulation);
    info!("Tick interval {:?}", tick_interval);
    let controller = MatchController::new(
        red,
        blue,
        telemetry,
        settings.timing.reset_check_interval_ticks,
        tick_interval,
    );

    info!("Starting scoreboard");
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport =
        egui::ViewportBuilder::default().with_fullscreen(settings.display.fullscreen);

    eframe::run_native(
        "Scoreboard",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(ScoreboardUI::new(
                cc,
                controller,
                tick_interval,
                telemetry_status,
            )))
        }),
    )
    .map_err(|e| eyre!("Scoreboard window failed: {}", e))?;

    info!("Scoreboard closed");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

/// Offline override: no sensors, slower ticks, startup config optional
fn simulation_enabled() -> bool {
    std::env::var("SIMULATION").is_ok_and(|value| value == "True")
}

fn setup_telemetry(
    startup: &StartupConfig,
    settings: &Settings,
) -> (
    Box<dyn TelemetrySink>,
    Option<watch::Receiver<TelemetryStatus>>,
) {
    if !settings.telemetry.enabled {
        info!("Telemetry disabled");
        return (Box::new(NullTelemetry), None);
    }
    let host = broker_host(startup.team, startup.network_mode);
    let telemetry = MqttTelemetry::connect(&host, &settings.telemetry);
    let status = telemetry.subscribe_status();
    (Box::new(telemetry), Some(status))
}

fn open_sensor(name: &str, bus: u8, settings: &SensorSettings) -> ColorSensorDevice {
    info!("Opening {} sensor on I2C bus {}", name, bus);
    let mut device = ColorSensorDevice::open(name, bus, settings.address);
    // Stored even when offline so a later re-identify restores it
    match device.apply_config(settings.device_config()) {
        Ok(()) => {}
        Err(SensorError::Unavailable(_)) => {
            warn!("{} sensor offline, configuration kept for re-identify", name)
        }
        Err(e) => error!("Failed to configure {} sensor: {}", name, e),
    }
    device
}
