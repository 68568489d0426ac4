//! Binds the pure match step to the sensors and the telemetry sink

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::score::Alliance;
use super::state::{tick, ControlEvent, MatchState, TickInput, TickOutput};
use crate::sensor::{ColorSensorDevice, RawColorSample};
use crate::telemetry::TelemetrySink;

/// Telemetry names used for each alliance's sensor
fn telemetry_names(alliance: Alliance) -> (&'static str, &'static str) {
    match alliance {
        Alliance::Red => ("rawcolor1", "proximity1"),
        Alliance::Blue => ("rawcolor2", "proximity2"),
    }
}

pub struct MatchController {
    state: Option<MatchState>,
    red: Option<ColorSensorDevice>,
    blue: Option<ColorSensorDevice>,
    telemetry: Box<dyn TelemetrySink>,
    reset_check_interval: u32,
    ticks_since_reset_check: u32,
    min_tick_interval: Duration,
    last_tick: Option<Instant>,
    /// Events that arrived before the next tick was due
    queued_events: Vec<ControlEvent>,
}

impl MatchController {
    /// `None` for a sensor runs that alliance without optical scoring
    pub fn new(
        red: Option<ColorSensorDevice>,
        blue: Option<ColorSensorDevice>,
        telemetry: Box<dyn TelemetrySink>,
        reset_check_interval: u32,
        min_tick_interval: Duration,
    ) -> Self {
        Self {
            state: Some(MatchState::new()),
            red,
            blue,
            telemetry,
            reset_check_interval,
            ticks_since_reset_check: 0,
            min_tick_interval,
            last_tick: None,
            queued_events: Vec::new(),
        }
    }

    pub fn state(&self) -> Option<&MatchState> {
        self.state.as_ref()
    }

    pub fn sensor(&self, alliance: Alliance) -> Option<&ColorSensorDevice> {
        match alliance {
            Alliance::Red => self.red.as_ref(),
            Alliance::Blue => self.blue.as_ref(),
        }
    }

    /// Ticks only when the minimum interval since the previous tick has passed.
    /// Otherwise `events` are held for the next tick and `None` is returned.
    pub fn tick_if_due(&mut self, now: Instant, events: &[ControlEvent]) -> Option<TickOutput> {
        if let Some(last) = self.last_tick {
            if now.saturating_duration_since(last) < self.min_tick_interval {
                self.queued_events.extend_from_slice(events);
                return None;
            }
        }
        let mut batch = std::mem::take(&mut self.queued_events);
        batch.extend_from_slice(events);
        Some(self.tick(now, &batch))
    }

    /// Runs one full tick and publishes its readings
    pub fn tick(&mut self, now: Instant, events: &[ControlEvent]) -> TickOutput {
        self.last_tick = Some(now);
        self.poll_sensor_resets();

        let state = self.state.take().unwrap_or_default();
        let red = &mut self.red;
        let blue = &mut self.blue;
        let telemetry = &mut self.telemetry;

        let (next, output) = tick(state, TickInput { now, events }, |alliance| {
            let device = match alliance {
                Alliance::Red => red.as_mut(),
                Alliance::Blue => blue.as_mut(),
            }?;
            let sample = read_sensor(device)?;
            let (color_name, proximity_name) = telemetry_names(alliance);
            telemetry.put_number_array(color_name, &sample.channels());
            telemetry.put_number(proximity_name, f64::from(sample.proximity));
            Some(sample)
        });
        self.state = Some(next);

        if let Err(e) = self.telemetry.flush() {
            warn!("Telemetry flush failed: {}", e);
        }
        output
    }

    /// Retries identification on sensors that dropped out earlier
    pub fn reidentify_sensors(&mut self) {
        for device in [self.red.as_mut(), self.blue.as_mut()].into_iter().flatten() {
            if device.is_available() {
                continue;
            }
            match device.reidentify() {
                Ok(()) => info!("Sensor '{}' re-identified", device.name()),
                Err(e) => warn!("Sensor '{}' still unavailable: {}", device.name(), e),
            }
        }
    }

    fn poll_sensor_resets(&mut self) {
        if self.reset_check_interval == 0 {
            return;
        }
        self.ticks_since_reset_check += 1;
        if self.ticks_since_reset_check < self.reset_check_interval {
            return;
        }
        self.ticks_since_reset_check = 0;

        for device in [self.red.as_mut(), self.blue.as_mut()].into_iter().flatten() {
            if !device.is_available() {
                continue;
            }
            match device.check_reset() {
                Ok(true) => warn!("Sensor '{}' lost power and was reconfigured", device.name()),
                Ok(false) => {}
                Err(e) => warn!("Reset check on '{}' failed: {}", device.name(), e),
            }
        }
    }
}

fn read_sensor(device: &mut ColorSensorDevice) -> Option<RawColorSample> {
    if !device.is_available() {
        return None;
    }
    match device.sample() {
        Ok(sample) => {
            debug!("{}: {:?}", device.name(), sample);
            Some(sample)
        }
        Err(e) => {
            warn!("Reading '{}' failed: {}", device.name(), e);
            None
        }
    }
}
