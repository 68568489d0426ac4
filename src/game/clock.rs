//! Match phase countdown with pause/resume
//!
//! ```text
//! AwaitingStart ──full──► Autonomous (15s) ──► AutoPause (5s) ──► Teleop (135s) ──► Ended
//!       │                                                            ▲
//!       └───────────────────────teleop only──────────────────────────┘
//! ```
//!
//! All methods take the current time explicitly; nothing in here reads a clock.

use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPhase {
    #[default]
    AwaitingStart,
    Autonomous,
    AutoPause,
    Teleop,
    Ended,
}

impl MatchPhase {
    /// Length of a timed phase; `None` for the untimed ones
    pub const fn duration(self) -> Option<Duration> {
        match self {
            MatchPhase::Autonomous => Some(Duration::from_secs(15)),
            MatchPhase::AutoPause => Some(Duration::from_secs(5)),
            MatchPhase::Teleop => Some(Duration::from_secs(135)),
            MatchPhase::AwaitingStart | MatchPhase::Ended => None,
        }
    }

    /// Phase entered when this one's deadline passes
    pub const fn next(self) -> Option<MatchPhase> {
        match self {
            MatchPhase::Autonomous => Some(MatchPhase::AutoPause),
            MatchPhase::AutoPause => Some(MatchPhase::Teleop),
            MatchPhase::Teleop => Some(MatchPhase::Ended),
            MatchPhase::AwaitingStart | MatchPhase::Ended => None,
        }
    }

    /// Scoring during these phases counts double and towards the auto score
    pub const fn is_autonomous(self) -> bool {
        matches!(self, MatchPhase::Autonomous | MatchPhase::AutoPause)
    }

    pub const fn is_running(self) -> bool {
        matches!(
            self,
            MatchPhase::Autonomous | MatchPhase::AutoPause | MatchPhase::Teleop
        )
    }
}

/// A phase transition produced by the deadline rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: MatchPhase,
    pub to: MatchPhase,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchClock {
    phase: MatchPhase,
    deadline: Option<Instant>,
    paused: bool,
    paused_at: Option<Instant>,
    remaining_at_pause: Option<Duration>,
}

impl MatchClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn remaining_at_pause(&self) -> Option<Duration> {
        self.remaining_at_pause
    }

    /// Time left in the current phase, zero once the deadline has passed
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Starts a full match in Autonomous
    pub fn start_full_match(&mut self, now: Instant) {
        info!("Match started: Autonomous");
        self.enter(MatchPhase::Autonomous, now);
    }

    /// Starts directly in Teleop, skipping Autonomous and AutoPause
    pub fn start_teleop_only(&mut self, now: Instant) {
        info!("Match started: Teleop only");
        self.enter(MatchPhase::Teleop, now);
    }

    pub fn reset(&mut self) {
        info!("Match clock reset");
        *self = Self::default();
    }

    /// Pauses a running match or resumes a paused one. Ignored when no match runs.
    pub fn toggle_pause(&mut self, now: Instant) {
        if !self.phase.is_running() {
            debug!("Pause toggle ignored in {:?}", self.phase);
            return;
        }

        if self.paused {
            // Final extension up to the resume instant, then the deadline stays put
            self.extend_paused_deadline(now);
            self.paused = false;
            self.paused_at = None;
            self.remaining_at_pause = None;
            info!("Match resumed with {:?} remaining", self.remaining(now));
        } else {
            self.paused = true;
            self.paused_at = Some(now);
            self.remaining_at_pause = self.remaining(now);
            info!("Match paused with {:?} remaining", self.remaining_at_pause);
        }
    }

    /// Per-tick update: keeps the remaining time frozen while paused, otherwise
    /// applies the deadline rule
    pub fn update(&mut self, now: Instant) -> Option<PhaseChange> {
        if self.paused {
            self.extend_paused_deadline(now);
            return None;
        }

        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }

        let from = self.phase;
        let to = from.next()?;
        self.enter(to, now);
        info!("Phase change: {:?} -> {:?}", from, to);
        Some(PhaseChange { from, to })
    }

    fn enter(&mut self, phase: MatchPhase, now: Instant) {
        self.phase = phase;
        self.deadline = phase.duration().map(|duration| now + duration);
        self.paused = false;
        self.paused_at = None;
        self.remaining_at_pause = None;
    }

    fn extend_paused_deadline(&mut self, now: Instant) {
        if let (Some(paused_at), Some(remaining)) = (self.paused_at, self.remaining_at_pause) {
            let extended = paused_at + remaining + now.saturating_duration_since(paused_at);
            // Never move the deadline backwards
            if self.deadline.map_or(true, |deadline| extended > deadline) {
                self.deadline = Some(extended);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn autonomous_hands_over_to_auto_pause_at_deadline() {
        let t0 = Instant::now();
        let mut clock = MatchClock::new();
        clock.start_full_match(t0);

        assert_eq!(clock.update(t0 + 14 * SECOND), None);
        assert_eq!(clock.phase(), MatchPhase::Autonomous);

        let change = clock.update(t0 + 15 * SECOND);
        assert_eq!(
            change,
            Some(PhaseChange {
                from: MatchPhase::Autonomous,
                to: MatchPhase::AutoPause
            })
        );
        assert_eq!(clock.deadline(), Some(t0 + 20 * SECOND));
    }

    #[test]
    fn full_match_runs_through_every_phase() {
        let t0 = Instant::now();
        let mut clock = MatchClock::new();
        clock.start_full_match(t0);

        clock.update(t0 + 15 * SECOND);
        clock.update(t0 + 20 * SECOND);
        assert_eq!(clock.phase(), MatchPhase::Teleop);
        assert_eq!(clock.deadline(), Some(t0 + 155 * SECOND));

        clock.update(t0 + 155 * SECOND);
        assert_eq!(clock.phase(), MatchPhase::Ended);
        assert_eq!(clock.deadline(), None);
        assert_eq!(clock.update(t0 + 1000 * SECOND), None);
    }

    #[test]
    fn remaining_time_is_frozen_while_paused() {
        let t0 = Instant::now();
        let mut clock = MatchClock::new();
        clock.start_teleop_only(t0);

        let pause_at = t0 + 125 * SECOND;
        clock.update(pause_at);
        clock.toggle_pause(pause_at);
        assert_eq!(clock.remaining_at_pause(), Some(10 * SECOND));

        for s in 1..=100 {
            assert_eq!(clock.update(pause_at + s * SECOND), None);
        }
        assert_eq!(clock.phase(), MatchPhase::Teleop);

        let resume_at = pause_at + 100 * SECOND;
        clock.toggle_pause(resume_at);
        assert!(!clock.is_paused());
        assert_eq!(clock.remaining(resume_at), Some(10 * SECOND));
    }

    #[test]
    fn resume_without_intermediate_ticks_still_keeps_remaining_time() {
        let t0 = Instant::now();
        let mut clock = MatchClock::new();
        clock.start_full_match(t0);
        clock.toggle_pause(t0 + 5 * SECOND);
        clock.toggle_pause(t0 + 105 * SECOND);
        assert_eq!(clock.remaining(t0 + 105 * SECOND), Some(10 * SECOND));
        assert_eq!(clock.update(t0 + 114 * SECOND), None);
        assert!(clock.update(t0 + 115 * SECOND).is_some());
    }

    #[test]
    fn deadline_never_fires_while_paused() {
        let t0 = Instant::now();
        let mut clock = MatchClock::new();
        clock.start_full_match(t0);
        clock.toggle_pause(t0 + 14 * SECOND);

        assert_eq!(clock.update(t0 + 30 * SECOND), None);
        assert_eq!(clock.phase(), MatchPhase::Autonomous);
    }

    #[test]
    fn pause_is_ignored_outside_a_running_match() {
        let t0 = Instant::now();
        let mut clock = MatchClock::new();
        clock.toggle_pause(t0);
        assert!(!clock.is_paused());
    }

    #[test]
    fn reset_returns_to_awaiting_start() {
        let t0 = Instant::now();
        let mut clock = MatchClock::new();
        clock.start_full_match(t0);
        clock.toggle_pause(t0 + SECOND);
        clock.reset();
        assert_eq!(clock, MatchClock::new());
    }
}
