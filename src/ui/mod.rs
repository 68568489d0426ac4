//! # Scoreboard User Interface
//!
//! Full-screen egui window the audience watches. It is also the match loop: every
//! `update` call collects the scorekeeper's key presses, runs exactly one match tick
//! and paints the resulting snapshot, then asks egui for the next frame one tick
//! interval later.
//!
//! ```text
//! ui/
//! ├── common.rs      - labels, timer text, phase banner, layout scaling
//! ├── keymap.rs      - key → ControlEvent
//! └── scoreboard.rs  - painting
//! ```
//!
//! Two screens alternate: the phase banner, shown for a few frames when an
//! autonomous phase begins, and the score screen the rest of the time.

pub mod common;
pub mod keymap;
pub mod scoreboard;

use eframe::egui::{self, Event};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::game::{Alliance, ControlEvent, MatchController, MatchPhase, MatchSnapshot};
use crate::telemetry::mqtt::TelemetryStatus;

use self::common::{BannerFrame, Canvas, PhaseBanner, UiColors};

pub struct ScoreboardUI {
    controller: MatchController,
    tick_interval: Duration,
    banner: PhaseBanner,
    phase: MatchPhase,
    /// Last tick's result, repainted until the next tick is due
    shown: Option<(MatchSnapshot, Option<BannerFrame>)>,
    telemetry_status: Option<watch::Receiver<TelemetryStatus>>,
    closing: bool,
}

impl ScoreboardUI {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        controller: MatchController,
        tick_interval: Duration,
        telemetry_status: Option<watch::Receiver<TelemetryStatus>>,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);
        ScoreboardUI {
            controller,
            tick_interval,
            banner: PhaseBanner::default(),
            phase: MatchPhase::AwaitingStart,
            shown: None,
            telemetry_status,
            closing: false,
        }
    }

    fn collect_events(&self, ctx: &egui::Context) -> Vec<ControlEvent> {
        let running = self.phase.is_running();
        ctx.input(|input| {
            let mut events: Vec<ControlEvent> = input
                .events
                .iter()
                .filter_map(|event| match event {
                    Event::Key {
                        key,
                        pressed: true,
                        repeat: false,
                        ..
                    } => keymap::map_key(*key, running),
                    _ => None,
                })
                .collect();
            if input.viewport().close_requested() {
                events.push(ControlEvent::Quit);
            }
            events
        })
    }

    fn render(&self, ui: &egui::Ui) {
        let Some((snapshot, banner)) = &self.shown else {
            return;
        };
        let canvas = Canvas::fit(ui.max_rect());
        let painter = ui.painter();

        match banner {
            Some(frame) => scoreboard::draw_banner(painter, &canvas, frame),
            None => scoreboard::draw_scores(painter, &canvas, snapshot),
        }

        let sensors: Vec<(Alliance, Option<bool>)> = Alliance::ALL
            .iter()
            .map(|&alliance| {
                let available = self
                    .controller
                    .sensor(alliance)
                    .map(|sensor| sensor.is_available());
                (alliance, available)
            })
            .collect();
        let telemetry = self
            .telemetry_status
            .as_ref()
            .map(|status| status.borrow().clone());
        scoreboard::draw_status(painter, &canvas, &sensors, telemetry.as_ref());
    }
}

impl eframe::App for ScoreboardUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|input| input.key_pressed(egui::Key::F5)) {
            info!("Re-identifying offline sensors");
            self.controller.reidentify_sensors();
        }
        let events = self.collect_events(ctx);
        if !events.is_empty() {
            debug!("Control events: {:?}", events);
        }

        // Repaints faster than the tick interval only redraw the last tick
        let quit = match self.controller.tick_if_due(Instant::now(), &events) {
            Some(output) => {
                self.phase = output.snapshot.phase;
                if let Some(change) = output.phase_change {
                    debug!("Rendering phase {:?}", change.to);
                }
                let banner = self.banner.update(output.snapshot.phase);
                self.shown = Some((output.snapshot, banner));
                output.quit
            }
            None => false,
        };

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(UiColors::BACKGROUND))
            .show(ctx, |ui| self.render(ui));

        if quit && !self.closing {
            info!("Closing scoreboard");
            self.closing = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        ctx.request_repaint_after(self.tick_interval);
    }
}
