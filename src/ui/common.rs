//! # Scoreboard Presentation Helpers
//!
//! Everything the scoreboard shows that can be decided without a painter: the phase
//! label, the timer text, the endgame switch, the phase banner and where the winner
//! banner goes. The painter code in [`super::scoreboard`] only places what these
//! helpers return.
//!
//! Layout coordinates are given for a 1920x1080 screen and scaled by [`Canvas`].

use std::time::Duration;

use eframe::egui::{pos2, Color32, FontId, Pos2, Rect};

use crate::game::{Alliance, MatchOutcome, MatchPhase, MatchSnapshot};

/// Frames a phase banner is shown after entering Autonomous or AutoPause
pub const PHASE_BANNER_FRAMES: u32 = 25;

/// Remaining seconds at or below which the timer takes over the screen
pub const ENDGAME_SECONDS: i64 = 10;

pub const WINNER_TEXT: &str = "winner winner chicken dinner";

pub struct UiColors;

impl UiColors {
    pub const BACKGROUND: Color32 = Color32::BLACK;
    pub const TEXT: Color32 = Color32::WHITE;
    pub const RED: Color32 = Color32::from_rgb(255, 0, 0);
    pub const BLUE: Color32 = Color32::from_rgb(0, 0, 255);
    /// Red score while its blink is running
    pub const RED_FLASH: Color32 = Color32::from_rgb(255, 99, 71);
    /// Blue score while its blink is running
    pub const BLUE_FLASH: Color32 = Color32::from_rgb(30, 144, 255);
    pub const ACTIVE: Color32 = Color32::from_rgb(50, 200, 20);
    pub const INACTIVE: Color32 = Color32::from_rgb(200, 50, 20);
}

impl UiColors {
    pub fn alliance(alliance: Alliance) -> Color32 {
        match alliance {
            Alliance::Red => Self::RED,
            Alliance::Blue => Self::BLUE,
        }
    }

    pub fn alliance_flash(alliance: Alliance) -> Color32 {
        match alliance {
            Alliance::Red => Self::RED_FLASH,
            Alliance::Blue => Self::BLUE_FLASH,
        }
    }
}

/// Label under the timer
pub fn displayed_phase(phase: MatchPhase) -> &'static str {
    match phase {
        MatchPhase::AwaitingStart => "Controllers Down",
        MatchPhase::Autonomous => "Auto",
        MatchPhase::AutoPause => "Pick Up Your Controller!",
        MatchPhase::Teleop => "Drive Your Robot!",
        MatchPhase::Ended => "Controllers Down (Match Ended)!",
    }
}

fn rounded_seconds(remaining: Option<Duration>) -> i64 {
    remaining.map_or(0, |r| r.as_secs_f64().round() as i64)
}

/// Countdown text: rounded seconds, "0" outside a match, "Go!" when AutoPause runs out
pub fn timer_text(snapshot: &MatchSnapshot) -> String {
    if !snapshot.phase.is_running() {
        return "0".to_string();
    }
    let seconds = rounded_seconds(snapshot.remaining);
    if seconds == 0 && snapshot.phase == MatchPhase::AutoPause {
        return "Go!".to_string();
    }
    seconds.to_string()
}

/// Last seconds of a driver-controlled countdown, shown with an oversized timer.
/// AutoPause counts, so its "Go!" is drawn large too.
pub fn is_endgame(snapshot: &MatchSnapshot) -> bool {
    matches!(snapshot.phase, MatchPhase::AutoPause | MatchPhase::Teleop)
        && rounded_seconds(snapshot.remaining) <= ENDGAME_SECONDS
}

/// Which side the winner banner goes on; `None` until the match has ended
pub fn winner_side(snapshot: &MatchSnapshot) -> Option<Option<Alliance>> {
    match snapshot.outcome? {
        MatchOutcome::Winner(alliance) => Some(Some(alliance)),
        MatchOutcome::Tie => Some(None),
    }
}

/// One frame of the full-screen phase banner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerFrame {
    pub phase: MatchPhase,
    pub frames_left: u32,
}

impl BannerFrame {
    /// Text to draw this frame; `None` leaves the screen black
    pub fn text(&self) -> Option<&'static str> {
        let lit_threshold = if self.phase == MatchPhase::AutoPause { 2.0 } else { 1.0 };
        let lit = (self.frames_left as f32 / 4.0) % 4.0 >= lit_threshold;
        match (self.phase, lit) {
            (MatchPhase::Autonomous, true) => Some("Press Your Auto Button!"),
            (MatchPhase::AutoPause, true) => Some(displayed_phase(MatchPhase::AutoPause)),
            (MatchPhase::AutoPause, false) => Some("Do Not Drive!"),
            (phase, true) => Some(displayed_phase(phase)),
            (_, false) => None,
        }
    }
}

/// Takes over the screen for a few frames whenever a new autonomous phase begins
#[derive(Debug, Default)]
pub struct PhaseBanner {
    last_announced: Option<MatchPhase>,
    frames_left: u32,
}

impl PhaseBanner {
    /// Call once per match tick with the current phase
    pub fn update(&mut self, phase: MatchPhase) -> Option<BannerFrame> {
        if phase.is_autonomous() && self.last_announced != Some(phase) {
            self.last_announced = Some(phase);
            self.frames_left = PHASE_BANNER_FRAMES;
        }
        if self.frames_left == 0 {
            return None;
        }
        self.frames_left -= 1;
        Some(BannerFrame {
            phase: self.last_announced.unwrap_or(phase),
            frames_left: self.frames_left,
        })
    }
}

/// Maps 1920x1080 layout coordinates onto the actual window, letterboxed
#[derive(Debug, Clone, Copy)]
pub struct Canvas {
    origin: Pos2,
    scale: f32,
}

impl Canvas {
    pub const WIDTH: f32 = 1920.0;
    pub const HEIGHT: f32 = 1080.0;

    pub fn fit(rect: Rect) -> Self {
        let scale = (rect.width() / Self::WIDTH).min(rect.height() / Self::HEIGHT);
        let used = eframe::egui::vec2(Self::WIDTH * scale, Self::HEIGHT * scale);
        Self {
            origin: rect.center() - used / 2.0,
            scale,
        }
    }

    pub fn pos(&self, x: f32, y: f32) -> Pos2 {
        pos2(self.origin.x + x * self.scale, self.origin.y + y * self.scale)
    }

    pub fn len(&self, length: f32) -> f32 {
        length * self.scale
    }

    pub fn font(&self, size: f32) -> FontId {
        FontId::monospace(size * self.scale)
    }

    /// Horizontal center of an alliance's half; blue sits on the left
    pub fn alliance_x(alliance: Alliance) -> f32 {
        match alliance {
            Alliance::Blue => 640.0,
            Alliance::Red => Self::WIDTH - 640.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::AllianceScore;

    fn snapshot(phase: MatchPhase, remaining: Option<f64>) -> MatchSnapshot {
        MatchSnapshot {
            phase,
            remaining: remaining.map(Duration::from_secs_f64),
            paused: false,
            red: AllianceScore::default(),
            blue: AllianceScore::default(),
            red_sample: None,
            blue_sample: None,
            outcome: None,
        }
    }

    #[test]
    fn timer_rounds_and_announces_go() {
        assert_eq!(timer_text(&snapshot(MatchPhase::Teleop, Some(42.6))), "43");
        assert_eq!(timer_text(&snapshot(MatchPhase::AutoPause, Some(0.2))), "Go!");
        assert_eq!(timer_text(&snapshot(MatchPhase::Autonomous, Some(0.2))), "0");
        assert_eq!(timer_text(&snapshot(MatchPhase::Ended, None)), "0");
    }

    #[test]
    fn endgame_covers_last_seconds_of_teleop_and_auto_pause() {
        assert!(is_endgame(&snapshot(MatchPhase::Teleop, Some(10.4))));
        assert!(!is_endgame(&snapshot(MatchPhase::Teleop, Some(10.6))));
        assert!(is_endgame(&snapshot(MatchPhase::AutoPause, Some(3.0))));
        assert!(!is_endgame(&snapshot(MatchPhase::Autonomous, Some(3.0))));
        assert!(!is_endgame(&snapshot(MatchPhase::Ended, None)));
    }

    #[test]
    fn banner_runs_once_per_autonomous_phase() {
        let mut banner = PhaseBanner::default();
        assert_eq!(banner.update(MatchPhase::AwaitingStart), None);

        let shown = (0..40)
            .filter(|_| banner.update(MatchPhase::Autonomous).is_some())
            .count();
        assert_eq!(shown, PHASE_BANNER_FRAMES as usize);

        assert!(banner.update(MatchPhase::AutoPause).is_some());
        assert_eq!(banner.update(MatchPhase::Teleop).map(|f| f.phase), Some(MatchPhase::AutoPause));
    }

    #[test]
    fn auto_pause_banner_alternates_with_warning() {
        let lit = BannerFrame {
            phase: MatchPhase::AutoPause,
            frames_left: 12,
        };
        let dark = BannerFrame {
            phase: MatchPhase::AutoPause,
            frames_left: 4,
        };
        assert_eq!(lit.text(), Some("Pick Up Your Controller!"));
        assert_eq!(dark.text(), Some("Do Not Drive!"));

        let blank = BannerFrame {
            phase: MatchPhase::Autonomous,
            frames_left: 2,
        };
        assert_eq!(blank.text(), None);
    }

    #[test]
    fn winner_banner_side_follows_outcome() {
        let mut ended = snapshot(MatchPhase::Ended, None);
        assert_eq!(winner_side(&ended), None);
        ended.outcome = Some(MatchOutcome::Winner(Alliance::Blue));
        assert_eq!(winner_side(&ended), Some(Some(Alliance::Blue)));
        ended.outcome = Some(MatchOutcome::Tie);
        assert_eq!(winner_side(&ended), Some(None));
    }
}
