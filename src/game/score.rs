//! Debounced optical scoring and alliance score keeping

use std::fmt;
use tracing::{debug, info};

use super::clock::MatchPhase;
use crate::sensor::{ColorReading, NormalizedColor};

/// Frames a score indicator stays lit after the score went up
pub const SCORE_BLINK_FRAMES: u8 = 7;

/// Ticks of history the rising-edge detector looks back over
pub const DETECT_WINDOW: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alliance {
    Red,
    Blue,
}

impl Alliance {
    pub const ALL: [Alliance; 2] = [Alliance::Red, Alliance::Blue];

    /// Color ratio that counts as a scoring object in front of this alliance's sensor
    pub fn entry_triggered(self, color: &NormalizedColor) -> bool {
        match self {
            Alliance::Red => color.r > 0.45 && color.b < 0.30,
            Alliance::Blue => color.r < 0.40 && color.b > 0.40,
        }
    }

    /// Color ratio that re-arms the detector. Checks only the alliance's own channel,
    /// so there is a band where neither entry nor exit holds.
    pub fn exit_triggered(self, color: &NormalizedColor) -> bool {
        match self {
            Alliance::Red => color.r < 0.45,
            Alliance::Blue => color.b < 0.40,
        }
    }
}

impl fmt::Display for Alliance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Alliance::Red => write!(f, "red"),
            Alliance::Blue => write!(f, "blue"),
        }
    }
}

/// Fixed-length rolling window of detector states, newest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectWindow<const N: usize> {
    slots: [bool; N],
}

impl<const N: usize> Default for DetectWindow<N> {
    fn default() -> Self {
        Self { slots: [false; N] }
    }
}

impl<const N: usize> DetectWindow<N> {
    /// Records the newest state and drops the oldest
    pub fn push(&mut self, triggered: bool) {
        if N == 0 {
            return;
        }
        self.slots.rotate_right(1);
        self.slots[0] = triggered;
    }

    /// True when no slot recorded a trigger
    pub fn is_clear(&self) -> bool {
        self.slots.iter().all(|slot| !slot)
    }

    pub fn slots(&self) -> &[bool; N] {
        &self.slots
    }

    pub const fn len(&self) -> usize {
        N
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllianceScore {
    pub score: i32,
    /// Part of `score` earned during the autonomous phases
    pub auto_score: i32,
    pub penalties: i32,
    pub detect_history: DetectWindow<DETECT_WINDOW>,
    pub blink_frames: u8,
}

impl AllianceScore {
    /// Score after penalties, used to decide the winner
    pub fn net(&self) -> i32 {
        self.score - self.penalties
    }
}

/// Operator corrections, applied without debounce and without clamping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// ±1 on the score
    Score(Direction),
    /// ±2 on the auto score, mirrored on the score
    AutoScore(Direction),
    /// ±1 on the penalties
    Penalty(Direction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn sign(self) -> i32 {
        match self {
            Direction::Up => 1,
            Direction::Down => -1,
        }
    }
}

/// A scoring event fired by the optical detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEvent {
    pub alliance: Alliance,
    pub points: i32,
    pub autonomous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Winner(Alliance),
    Tie,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreController {
    red: AllianceScore,
    blue: AllianceScore,
}

impl ScoreController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alliance(&self, alliance: Alliance) -> &AllianceScore {
        match alliance {
            Alliance::Red => &self.red,
            Alliance::Blue => &self.blue,
        }
    }

    fn alliance_mut(&mut self, alliance: Alliance) -> &mut AllianceScore {
        match alliance {
            Alliance::Red => &mut self.red,
            Alliance::Blue => &mut self.blue,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Counts down the score indicators, once per tick
    pub fn advance_blink(&mut self) {
        for alliance in Alliance::ALL {
            let state = self.alliance_mut(alliance);
            state.blink_frames = state.blink_frames.saturating_sub(1);
        }
    }

    /// Feeds one tick's reading into the alliance's rising-edge detector
    pub fn evaluate(
        &mut self,
        alliance: Alliance,
        reading: &ColorReading,
        phase: MatchPhase,
    ) -> Option<ScoreEvent> {
        // No light, no trigger; the window is left as it was
        let color = reading.color()?;
        let state = self.alliance_mut(alliance);

        if alliance.entry_triggered(color) && state.detect_history.is_clear() {
            let autonomous = phase.is_autonomous();
            let points = if autonomous { 2 } else { 1 };
            state.score += points;
            if autonomous {
                state.auto_score += points;
            }
            state.detect_history.push(true);
            state.blink_frames = SCORE_BLINK_FRAMES;
            info!(
                "Scored {} for {} in {:?} (total {})",
                points, alliance, phase, state.score
            );
            return Some(ScoreEvent {
                alliance,
                points,
                autonomous,
            });
        }

        if alliance.exit_triggered(color) {
            state.detect_history.push(false);
        } else {
            debug!(
                "{} detector holding, history {:?}",
                alliance,
                state.detect_history.slots()
            );
        }
        None
    }

    pub fn adjust(&mut self, alliance: Alliance, adjustment: Adjustment) {
        let state = self.alliance_mut(alliance);
        match adjustment {
            Adjustment::Score(direction) => {
                state.score += direction.sign();
                if direction == Direction::Up {
                    state.blink_frames = SCORE_BLINK_FRAMES;
                }
            }
            Adjustment::AutoScore(direction) => {
                state.auto_score += 2 * direction.sign();
                state.score += 2 * direction.sign();
                if direction == Direction::Up {
                    state.blink_frames = SCORE_BLINK_FRAMES;
                }
            }
            Adjustment::Penalty(direction) => state.penalties += direction.sign(),
        }
        info!(
            "Manual {:?} for {}: score {}, auto {}, penalties {}",
            adjustment, alliance, state.score, state.auto_score, state.penalties
        );
    }

    /// Higher score after penalties wins; equal scores are a tie
    pub fn outcome(&self) -> MatchOutcome {
        outcome(&self.red, &self.blue)
    }
}

pub fn outcome(red: &AllianceScore, blue: &AllianceScore) -> MatchOutcome {
    match red.net().cmp(&blue.net()) {
        std::cmp::Ordering::Greater => MatchOutcome::Winner(Alliance::Red),
        std::cmp::Ordering::Less => MatchOutcome::Winner(Alliance::Blue),
        std::cmp::Ordering::Equal => MatchOutcome::Tie,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(r: f64, g: f64, b: f64) -> ColorReading {
        ColorReading::Color(NormalizedColor { r, g, b })
    }

    fn red_above() -> ColorReading {
        reading(0.6, 0.25, 0.15)
    }

    fn red_below() -> ColorReading {
        reading(0.3, 0.4, 0.3)
    }

    #[test]
    fn lingering_object_scores_once() {
        let mut scores = ScoreController::new();
        let sequence = [red_below(), red_above(), red_above(), red_below()];

        let fired: Vec<_> = sequence
            .iter()
            .map(|r| scores.evaluate(Alliance::Red, r, MatchPhase::Teleop))
            .collect();

        assert_eq!(fired.iter().filter(|e| e.is_some()).count(), 1);
        assert!(fired[1].is_some());
        assert_eq!(scores.alliance(Alliance::Red).score, 1);
    }

    #[test]
    fn detector_rearms_after_two_clear_ticks() {
        let mut scores = ScoreController::new();
        let phase = MatchPhase::Teleop;

        assert!(scores.evaluate(Alliance::Red, &red_above(), phase).is_some());
        assert!(scores.evaluate(Alliance::Red, &red_below(), phase).is_none());
        // Only one clear tick so far
        assert!(scores.evaluate(Alliance::Red, &red_above(), phase).is_none());
        assert!(scores.evaluate(Alliance::Red, &red_below(), phase).is_none());
        assert!(scores.evaluate(Alliance::Red, &red_below(), phase).is_none());
        assert!(scores.evaluate(Alliance::Red, &red_above(), phase).is_some());
        assert_eq!(scores.alliance(Alliance::Red).score, 2);
    }

    #[test]
    fn autonomous_scores_double_and_counts_towards_auto() {
        let mut scores = ScoreController::new();
        let blue = reading(0.2, 0.3, 0.5);

        let event = scores
            .evaluate(Alliance::Blue, &blue, MatchPhase::AutoPause)
            .unwrap();
        assert_eq!(event.points, 2);
        let state = scores.alliance(Alliance::Blue);
        assert_eq!((state.score, state.auto_score), (2, 2));
        assert_eq!(state.blink_frames, SCORE_BLINK_FRAMES);
    }

    #[test]
    fn thresholds_are_alliance_specific() {
        let mut scores = ScoreController::new();
        let blue = reading(0.2, 0.3, 0.5);
        assert!(scores.evaluate(Alliance::Red, &blue, MatchPhase::Teleop).is_none());
        assert!(scores
            .evaluate(Alliance::Blue, &red_above(), MatchPhase::Teleop)
            .is_none());
    }

    #[test]
    fn no_signal_never_triggers() {
        let mut scores = ScoreController::new();
        assert!(scores
            .evaluate(Alliance::Red, &ColorReading::NoSignal, MatchPhase::Teleop)
            .is_none());
        assert!(scores.alliance(Alliance::Red).detect_history.is_clear());
    }

    #[test]
    fn manual_adjustments_may_go_negative() {
        let mut scores = ScoreController::new();
        scores.adjust(Alliance::Red, Adjustment::Penalty(Direction::Down));
        scores.adjust(Alliance::Red, Adjustment::AutoScore(Direction::Down));
        scores.adjust(Alliance::Blue, Adjustment::Score(Direction::Up));

        let red = scores.alliance(Alliance::Red);
        assert_eq!((red.score, red.auto_score, red.penalties), (-2, -2, -1));
        assert_eq!(scores.alliance(Alliance::Blue).score, 1);
    }

    #[test]
    fn winner_is_decided_after_penalties() {
        let red = AllianceScore {
            score: 10,
            penalties: 1,
            ..Default::default()
        };
        let blue = AllianceScore {
            score: 8,
            ..Default::default()
        };
        assert_eq!(outcome(&red, &blue), MatchOutcome::Winner(Alliance::Red));
        assert_eq!(outcome(&blue, &red), MatchOutcome::Winner(Alliance::Blue));

        // Penalties can erase a lead entirely
        let penalized = AllianceScore {
            score: 10,
            penalties: 2,
            ..Default::default()
        };
        assert_eq!(outcome(&penalized, &blue), MatchOutcome::Tie);

        let tie = AllianceScore {
            score: 5,
            ..Default::default()
        };
        assert_eq!(outcome(&tie, &tie), MatchOutcome::Tie);
    }

    #[test]
    fn window_keeps_exactly_its_length() {
        let mut window = DetectWindow::<2>::default();
        window.push(true);
        window.push(false);
        window.push(false);
        assert_eq!(window.slots(), &[false, false]);
        assert_eq!(window.len(), 2);
        assert!(window.is_clear());
    }
}
