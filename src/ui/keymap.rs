//! Keyboard layout of the scorekeeper's table
//!
//! ```text
//! Space  start full match / pause / resume     B  teleop only     C  reset
//!          red   blue
//! score    T G   Y H     (+1 / -1)
//! auto     R F   U J     (+2 / -2, also on the score)
//! penalty  E D   I K     (+1 / -1)
//! Esc      quit
//! ```
//!
//! F5 (retry offline sensors) is handled by the window itself, it is not a match event.

use eframe::egui::Key;

use crate::game::{Alliance, ControlEvent, Direction};

/// Control event for a pressed key. `match_running` decides what Space does.
pub fn map_key(key: Key, match_running: bool) -> Option<ControlEvent> {
    use Alliance::{Blue, Red};
    use Direction::{Down, Up};

    let event = match key {
        Key::Escape => ControlEvent::Quit,
        Key::C => ControlEvent::ResetMatch,
        Key::B => ControlEvent::StartTeleopOnly,
        Key::Space if match_running => ControlEvent::TogglePauseResume,
        Key::Space => ControlEvent::StartFullMatch,

        Key::T => ControlEvent::AdjustScore(Red, Up),
        Key::G => ControlEvent::AdjustScore(Red, Down),
        Key::Y => ControlEvent::AdjustScore(Blue, Up),
        Key::H => ControlEvent::AdjustScore(Blue, Down),

        Key::R => ControlEvent::AdjustAutoScore(Red, Up),
        Key::F => ControlEvent::AdjustAutoScore(Red, Down),
        Key::U => ControlEvent::AdjustAutoScore(Blue, Up),
        Key::J => ControlEvent::AdjustAutoScore(Blue, Down),

        Key::E => ControlEvent::AdjustPenalty(Red, Up),
        Key::D => ControlEvent::AdjustPenalty(Red, Down),
        Key::I => ControlEvent::AdjustPenalty(Blue, Up),
        Key::K => ControlEvent::AdjustPenalty(Blue, Down),

        _ => return None,
    };
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_starts_or_pauses_depending_on_match_state() {
        assert_eq!(map_key(Key::Space, false), Some(ControlEvent::StartFullMatch));
        assert_eq!(
            map_key(Key::Space, true),
            Some(ControlEvent::TogglePauseResume)
        );
    }

    #[test]
    fn teleop_start_and_reset_ignore_match_state() {
        for running in [false, true] {
            assert_eq!(map_key(Key::B, running), Some(ControlEvent::StartTeleopOnly));
            assert_eq!(map_key(Key::C, running), Some(ControlEvent::ResetMatch));
        }
    }

    #[test]
    fn alliance_keys_mirror_each_other() {
        assert_eq!(
            map_key(Key::R, true),
            Some(ControlEvent::AdjustAutoScore(Alliance::Red, Direction::Up))
        );
        assert_eq!(
            map_key(Key::J, true),
            Some(ControlEvent::AdjustAutoScore(Alliance::Blue, Direction::Down))
        );
        assert_eq!(
            map_key(Key::K, false),
            Some(ControlEvent::AdjustPenalty(Alliance::Blue, Direction::Down))
        );
    }

    #[test]
    fn unmapped_keys_do_nothing() {
        assert_eq!(map_key(Key::A, true), None);
        assert_eq!(map_key(Key::Enter, false), None);
    }
}
