//! Presentation of timer state
//!
//! Pure output: everything here is computed from a [`Snapshot`] and a
//! wall-clock instant, nothing is stored. The actual drawing (DOM, TUI,
//! whatever hosts the overlay) sits behind these functions.

use std::time::Instant;

use crate::state::{Mode, Snapshot};

/// Half-period of the separator pulse
const SEPARATOR_PULSE_MS: u128 = 500;

/// Below this remaining time the seconds display carries a tenths digit.
/// Compared against raw milliseconds, strict less-than: at exactly 10s the
/// display is `00:10`.
const TENTHS_THRESHOLD_MS: u64 = 10_000;

/// Formatted clock digits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockDisplay {
    /// Zero-padded minutes, e.g. `"01"`
    pub minutes: String,
    /// Zero-padded seconds, with a tenths digit near expiry, e.g. `"09.4"`
    pub seconds: String,
}

/// Visual cue drawn around the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardCue {
    /// Overlay disabled, draw nothing
    Hidden,
    SteadyGreen,
    SteadyRed,
    /// Locked board in thinking mode; `bright` while the blocked flash is
    /// raised
    PulsingRed { bright: bool },
}

/// Render remaining time as `MM:SS[.s]`.
///
/// Tenths are truncated, not rounded, so the display never reads ahead of
/// the clock.
pub fn format_clock(remaining_ms: u64) -> ClockDisplay {
    let minutes = remaining_ms / 60_000;
    let within_minute_ms = remaining_ms % 60_000;

    let seconds = if remaining_ms < TENTHS_THRESHOLD_MS {
        let tenths = within_minute_ms / 100;
        format!("{:02}.{}", tenths / 10, tenths % 10)
    } else {
        format!("{:02}", within_minute_ms / 1_000)
    };

    ClockDisplay {
        minutes: format!("{:02}", minutes),
        seconds,
    }
}

/// Whether the `:` separator is in its visible half-period. Driven by
/// wall-clock time since the session epoch, independent of tick cadence.
pub fn separator_visible(now: Instant, epoch: Instant) -> bool {
    let elapsed = now.saturating_duration_since(epoch).as_millis();
    (elapsed / SEPARATOR_PULSE_MS) % 2 == 0
}

/// Board cue policy on `(mode, running)`
pub fn board_cue(snapshot: &Snapshot) -> BoardCue {
    if !snapshot.enabled {
        return BoardCue::Hidden;
    }

    match (snapshot.mode, snapshot.running) {
        (Mode::Thinking, true) => BoardCue::PulsingRed {
            bright: snapshot.blocked,
        },
        (Mode::Thinking, false) => BoardCue::SteadyGreen,
        (Mode::Blitz, true) => BoardCue::SteadyGreen,
        (Mode::Blitz, false) => BoardCue::SteadyRed,
    }
}

/// Mirror of the enable toggle
pub fn toggle_state(snapshot: &Snapshot) -> bool {
    snapshot.enabled
}

/// One-line text rendering for log-style surfaces (the demo harness)
pub fn render_text(snapshot: &Snapshot, now: Instant, epoch: Instant) -> String {
    let clock = format_clock(snapshot.remaining_ms);
    let separator = if separator_visible(now, epoch) { ':' } else { ' ' };
    let cue = match board_cue(snapshot) {
        BoardCue::Hidden => "off",
        BoardCue::SteadyGreen => "green",
        BoardCue::SteadyRed => "red",
        BoardCue::PulsingRed { bright: true } => "red!",
        BoardCue::PulsingRed { bright: false } => "red~",
    };
    format!("{}{}{} [{}]", clock.minutes, separator, clock.seconds, cue)
}
