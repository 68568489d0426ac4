//! Owned match state and the per-tick step function
//!
//! ```text
//!            ┌────────── TickInput (now, events) ──────────┐
//!            ▼                                              │
//! MatchState ──► blink ──► events ──► deadline ──► reads ──► scoring ──► MatchSnapshot
//! ```
//!
//! [`tick`] consumes the state and hands back the next one. Sensor access is
//! injected as a sampler closure, so the whole step runs without hardware.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::clock::{MatchClock, MatchPhase, PhaseChange};
use super::score::{
    Adjustment, Alliance, AllianceScore, Direction, MatchOutcome, ScoreController, ScoreEvent,
};
use crate::sensor::{ColorReading, RawColorSample};

/// Operator commands, applied in order at the start of a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    StartFullMatch,
    StartTeleopOnly,
    TogglePauseResume,
    ResetMatch,
    AdjustScore(Alliance, Direction),
    AdjustAutoScore(Alliance, Direction),
    AdjustPenalty(Alliance, Direction),
    Quit,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchState {
    pub clock: MatchClock,
    pub scores: ScoreController,
}

impl MatchState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct TickInput<'a> {
    pub now: Instant,
    pub events: &'a [ControlEvent],
}

/// Everything one tick produced. Never mutated after it leaves [`tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    pub phase: MatchPhase,
    pub remaining: Option<Duration>,
    pub paused: bool,
    pub red: AllianceScore,
    pub blue: AllianceScore,
    pub red_sample: Option<RawColorSample>,
    pub blue_sample: Option<RawColorSample>,
    /// Only set once the match has ended
    pub outcome: Option<MatchOutcome>,
}

impl MatchSnapshot {
    pub fn alliance(&self, alliance: Alliance) -> &AllianceScore {
        match alliance {
            Alliance::Red => &self.red,
            Alliance::Blue => &self.blue,
        }
    }

    pub fn sample(&self, alliance: Alliance) -> Option<&RawColorSample> {
        match alliance {
            Alliance::Red => self.red_sample.as_ref(),
            Alliance::Blue => self.blue_sample.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub snapshot: MatchSnapshot,
    pub scored: Vec<ScoreEvent>,
    pub phase_change: Option<PhaseChange>,
    /// A match start or reset happened during this tick
    pub restarted: bool,
    pub quit: bool,
}

/// Runs one tick: blink countdown, control events, deadline rule, sensor reads,
/// scoring, and the outcome once the match has ended.
///
/// `sampler` returns `None` for an alliance whose sensor is missing or out of service.
pub fn tick<F>(mut state: MatchState, input: TickInput<'_>, mut sampler: F) -> (MatchState, TickOutput)
where
    F: FnMut(Alliance) -> Option<RawColorSample>,
{
    let now = input.now;
    let mut quit = false;
    let mut restarted = false;

    state.scores.advance_blink();

    for event in input.events {
        match *event {
            ControlEvent::StartFullMatch => {
                state.scores.reset();
                state.clock.start_full_match(now);
                restarted = true;
            }
            ControlEvent::StartTeleopOnly => {
                state.scores.reset();
                state.clock.start_teleop_only(now);
                restarted = true;
            }
            ControlEvent::TogglePauseResume => state.clock.toggle_pause(now),
            ControlEvent::ResetMatch => {
                state.scores.reset();
                state.clock.reset();
                restarted = true;
            }
            ControlEvent::AdjustScore(alliance, direction) => {
                state.scores.adjust(alliance, Adjustment::Score(direction))
            }
            ControlEvent::AdjustAutoScore(alliance, direction) => {
                state.scores.adjust(alliance, Adjustment::AutoScore(direction))
            }
            ControlEvent::AdjustPenalty(alliance, direction) => {
                state.scores.adjust(alliance, Adjustment::Penalty(direction))
            }
            ControlEvent::Quit => {
                info!("Quit requested");
                quit = true;
            }
        }
    }

    let phase_change = state.clock.update(now);
    let phase = state.clock.phase();

    let mut scored = Vec::new();
    let red_sample = sampler(Alliance::Red);
    let blue_sample = sampler(Alliance::Blue);
    for (alliance, sample) in [(Alliance::Red, red_sample), (Alliance::Blue, blue_sample)] {
        let Some(sample) = sample else {
            continue;
        };
        let reading = sample.normalized();
        if let ColorReading::NoSignal = reading {
            debug!("No light on the {} sensor", alliance);
        }
        if let Some(event) = state.scores.evaluate(alliance, &reading, phase) {
            scored.push(event);
        }
    }

    let outcome = (phase == MatchPhase::Ended).then(|| state.scores.outcome());

    let snapshot = MatchSnapshot {
        phase,
        remaining: state.clock.remaining(now),
        paused: state.clock.is_paused(),
        red: *state.scores.alliance(Alliance::Red),
        blue: *state.scores.alliance(Alliance::Blue),
        red_sample,
        blue_sample,
        outcome,
    };

    let output = TickOutput {
        snapshot,
        scored,
        phase_change,
        restarted,
        quit,
    };
    (state, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    fn no_sensors(_: Alliance) -> Option<RawColorSample> {
        None
    }

    fn red_ball() -> RawColorSample {
        RawColorSample {
            red: 600,
            green: 250,
            blue: 150,
            ir: 10,
            proximity: 300,
        }
    }

    fn run(
        state: MatchState,
        now: Instant,
        events: &[ControlEvent],
    ) -> (MatchState, TickOutput) {
        tick(state, TickInput { now, events }, no_sensors)
    }

    #[test]
    fn teleop_only_match_ends_after_135_seconds() {
        let t0 = Instant::now();
        let (mut state, _) = run(MatchState::new(), t0, &[ControlEvent::StartTeleopOnly]);

        for s in 1..=134 {
            let (next, output) = run(state, t0 + s * SECOND, &[]);
            state = next;
            assert_eq!(output.snapshot.phase, MatchPhase::Teleop);
        }

        let (mut state, output) = run(state, t0 + 135 * SECOND, &[]);
        assert_eq!(output.snapshot.phase, MatchPhase::Ended);
        assert_eq!(output.snapshot.outcome, Some(MatchOutcome::Tie));

        for s in 136..=140 {
            let (next, output) = run(state, t0 + s * SECOND, &[]);
            state = next;
            assert_eq!(output.snapshot.phase, MatchPhase::Ended);
        }
    }

    #[test]
    fn sensor_scores_double_during_autonomous() {
        let t0 = Instant::now();
        let (state, output) = tick(
            MatchState::new(),
            TickInput {
                now: t0,
                events: &[ControlEvent::StartFullMatch],
            },
            |alliance| (alliance == Alliance::Red).then(red_ball),
        );

        assert_eq!(output.scored.len(), 1);
        assert_eq!(output.snapshot.red.score, 2);
        assert_eq!(output.snapshot.red.auto_score, 2);
        assert_eq!(output.snapshot.red_sample, Some(red_ball()));
        assert_eq!(output.snapshot.blue_sample, None);
        assert_eq!(state.scores.alliance(Alliance::Blue).score, 0);
    }

    #[test]
    fn starting_a_match_clears_previous_scores() {
        let t0 = Instant::now();
        let (state, _) = run(
            MatchState::new(),
            t0,
            &[
                ControlEvent::AdjustScore(Alliance::Blue, Direction::Up),
                ControlEvent::AdjustPenalty(Alliance::Red, Direction::Up),
            ],
        );
        assert_eq!(state.scores.alliance(Alliance::Blue).score, 1);

        let (state, output) = run(state, t0 + SECOND, &[ControlEvent::StartFullMatch]);
        assert!(output.restarted);
        assert_eq!(output.snapshot.blue.score, 0);
        assert_eq!(output.snapshot.red.penalties, 0);
        assert_eq!(state.clock.phase(), MatchPhase::Autonomous);
    }

    #[test]
    fn score_blink_counts_down_once_per_tick() {
        let t0 = Instant::now();
        let (state, output) = run(
            MatchState::new(),
            t0,
            &[ControlEvent::AdjustScore(Alliance::Red, Direction::Up)],
        );
        assert_eq!(output.snapshot.red.blink_frames, 7);

        let (_, output) = run(state, t0 + SECOND, &[]);
        assert_eq!(output.snapshot.red.blink_frames, 6);
    }

    #[test]
    fn quit_is_reported_and_the_tick_completes() {
        let t0 = Instant::now();
        let (_, output) = run(
            MatchState::new(),
            t0,
            &[ControlEvent::StartFullMatch, ControlEvent::Quit],
        );
        assert!(output.quit);
        assert_eq!(output.snapshot.phase, MatchPhase::Autonomous);
    }

    #[test]
    fn paused_match_reports_frozen_remaining_time() {
        let t0 = Instant::now();
        let (state, _) = run(MatchState::new(), t0, &[ControlEvent::StartTeleopOnly]);
        let (state, output) = run(state, t0 + 5 * SECOND, &[ControlEvent::TogglePauseResume]);
        assert!(output.snapshot.paused);
        assert_eq!(output.snapshot.remaining, Some(130 * SECOND));

        let (_, output) = run(state, t0 + 65 * SECOND, &[]);
        assert_eq!(output.snapshot.remaining, Some(130 * SECOND));
    }
}
