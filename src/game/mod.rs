//! Match logic
//!
//! Phase timing, optical scoring and the per-tick step that ties them to the sensors.
//!
//! ```text
//! game/
//! ├── clock.rs       - match phases, countdown, pause/resume
//! ├── score.rs       - debounced detection, manual adjustments, winner
//! ├── state.rs       - owned match state and the pure tick
//! └── controller.rs  - sensors and telemetry around the tick
//! ```

pub mod clock;
pub mod controller;
pub mod score;
pub mod state;

pub use clock::{MatchClock, MatchPhase, PhaseChange};
pub use controller::MatchController;
pub use score::{Alliance, AllianceScore, Direction, MatchOutcome, ScoreEvent};
pub use state::{ControlEvent, MatchSnapshot, MatchState, TickOutput};
