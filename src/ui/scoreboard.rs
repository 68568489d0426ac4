//! Painter-based scoreboard rendering

use eframe::egui::{Align2, Painter};

use super::common::{
    displayed_phase, is_endgame, timer_text, winner_side, BannerFrame, Canvas, UiColors,
    WINNER_TEXT,
};
use crate::game::{Alliance, MatchSnapshot};
use crate::telemetry::mqtt::{ConnectionState, TelemetryStatus};

const SCORE_FONT: f32 = 500.0;
const TIMER_FONT: f32 = 80.0;
const ENDGAME_FONT: f32 = 750.0;
const PHASE_FONT: f32 = 200.0;
const STATUS_FONT: f32 = 18.0;

pub fn draw_banner(painter: &Painter, canvas: &Canvas, frame: &BannerFrame) {
    if let Some(text) = frame.text() {
        painter.text(
            canvas.pos(Canvas::WIDTH / 2.0, 540.0),
            Align2::CENTER_CENTER,
            text,
            canvas.font(PHASE_FONT),
            UiColors::TEXT,
        );
    }
}

pub fn draw_scores(painter: &Painter, canvas: &Canvas, snapshot: &MatchSnapshot) {
    let center_x = Canvas::WIDTH / 2.0;
    let endgame = is_endgame(snapshot);
    let timer_font = if endgame { ENDGAME_FONT } else { TIMER_FONT };

    painter.text(
        canvas.pos(center_x, 800.0),
        Align2::CENTER_CENTER,
        timer_text(snapshot),
        canvas.font(timer_font),
        UiColors::TEXT,
    );

    if !endgame {
        painter.text(
            canvas.pos(center_x, 900.0),
            Align2::CENTER_CENTER,
            displayed_phase(snapshot.phase),
            canvas.font(TIMER_FONT),
            UiColors::TEXT,
        );
        if snapshot.paused {
            painter.text(
                canvas.pos(center_x, 1000.0),
                Align2::CENTER_CENTER,
                "Paused",
                canvas.font(TIMER_FONT),
                UiColors::TEXT,
            );
        }
    }

    for alliance in Alliance::ALL {
        draw_alliance(painter, canvas, snapshot, alliance);
    }

    if let Some(side) = winner_side(snapshot) {
        let (x, color) = match side {
            Some(alliance) => (Canvas::alliance_x(alliance), UiColors::alliance(alliance)),
            None => (center_x, UiColors::TEXT),
        };
        painter.text(
            canvas.pos(x, 100.0),
            Align2::CENTER_CENTER,
            WINNER_TEXT,
            canvas.font(TIMER_FONT),
            color,
        );
    }
}

fn draw_alliance(painter: &Painter, canvas: &Canvas, snapshot: &MatchSnapshot, alliance: Alliance) {
    let state = snapshot.alliance(alliance);
    let x = Canvas::alliance_x(alliance);

    painter.text(
        canvas.pos(x, 250.0),
        Align2::CENTER_CENTER,
        format!("Auto: {}", state.auto_score),
        canvas.font(TIMER_FONT),
        UiColors::alliance(alliance),
    );
    painter.text(
        canvas.pos(x, 350.0),
        Align2::CENTER_CENTER,
        format!("Penalty: {}", state.penalties),
        canvas.font(TIMER_FONT),
        UiColors::TEXT,
    );

    let score_color = if state.blink_frames > 0 {
        // Indicator dot on the outer side of the score
        let dot_x = match alliance {
            Alliance::Blue => x - 300.0,
            Alliance::Red => x + 300.0,
        };
        painter.circle_filled(
            canvas.pos(dot_x, 650.0),
            canvas.len(50.0),
            UiColors::alliance_flash(alliance),
        );
        UiColors::alliance_flash(alliance)
    } else {
        UiColors::alliance(alliance)
    };

    painter.text(
        canvas.pos(x, 540.0),
        Align2::CENTER_CENTER,
        state.score.to_string(),
        canvas.font(SCORE_FONT),
        score_color,
    );
}

/// Small status line for the operator: sensor availability and telemetry link
pub fn draw_status(
    painter: &Painter,
    canvas: &Canvas,
    sensors: &[(Alliance, Option<bool>)],
    telemetry: Option<&TelemetryStatus>,
) {
    let mut line = String::new();
    for (alliance, available) in sensors {
        let state = match available {
            Some(true) => "ok",
            Some(false) => "offline",
            None => "off",
        };
        line.push_str(&format!("{} sensor: {}   ", alliance, state));
    }

    let mut color = UiColors::ACTIVE;
    if let Some(status) = telemetry {
        line.push_str(&format!(
            "telemetry: {:?} ({} sent)",
            status.connection_state, status.messages_sent
        ));
        if status.connection_state != ConnectionState::Connected {
            color = UiColors::INACTIVE;
        }
    }
    if sensors.iter().any(|(_, available)| *available == Some(false)) {
        color = UiColors::INACTIVE;
    }

    painter.text(
        canvas.pos(10.0, Canvas::HEIGHT - 10.0),
        Align2::LEFT_BOTTOM,
        line,
        canvas.font(STATUS_FONT),
        color,
    );
}
