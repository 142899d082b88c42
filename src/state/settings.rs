//! User-configurable timer settings

use serde::{Deserialize, Serialize};

/// Minimum accepted countdown duration. Candidate durations below this
/// floor are rejected and the prior value retained.
pub const MIN_DURATION_MS: u64 = 1_000;

/// Default countdown duration when no persisted state exists.
pub const DEFAULT_DURATION_MS: u64 = 60_000;

/// Timer behavior mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Board is locked while the clock runs; failure never advances state
    Thinking,
    /// Board stays unlocked, the clock runs through failed attempts, and
    /// expiry may trigger an automatic forfeit
    Blitz,
}

impl Mode {
    pub fn is_blitz(&self) -> bool {
        matches!(self, Mode::Blitz)
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self, Mode::Thinking)
    }
}

/// Full settings snapshot - mutated only through `PuzzleSession::commit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Master on/off switch
    pub enabled: bool,
    /// Thinking or Blitz
    pub mode: Mode,
    /// Whether expiry in Blitz mode triggers the forfeit action
    pub auto_fail: bool,
    /// Countdown length in milliseconds, always >= `MIN_DURATION_MS`
    pub duration_ms: u64,
}

impl Settings {
    /// Create settings with the stock defaults
    pub fn new() -> Self {
        Self {
            enabled: true,
            mode: Mode::Blitz,
            auto_fail: true,
            duration_ms: DEFAULT_DURATION_MS,
        }
    }

    /// Whether expiry should trigger the external forfeit action
    pub fn forfeits_on_expiry(&self) -> bool {
        self.mode.is_blitz() && self.auto_fail
    }

    /// Whether board interactions are intercepted while the clock runs
    pub fn locks_board(&self) -> bool {
        self.enabled && self.mode.is_thinking()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

/// A partial settings candidate, as assembled by the settings dialog or the
/// enable toggle. Unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub mode: Option<Mode>,
    pub auto_fail: Option<bool>,
    pub duration_ms: Option<u64>,
}

impl SettingsPatch {
    /// Patch that only flips the master switch (the toolbar toggle)
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    /// Apply this patch on top of `current`, returning the candidate
    /// snapshot. A candidate duration below the floor is discarded and the
    /// prior duration kept; every other field still applies.
    pub fn apply_to(&self, current: &Settings) -> Settings {
        let duration_ms = match self.duration_ms {
            Some(d) if d >= MIN_DURATION_MS => d,
            Some(d) => {
                tracing::warn!(
                    "Rejecting duration {}ms below {}ms floor, keeping {}ms",
                    d,
                    MIN_DURATION_MS,
                    current.duration_ms
                );
                current.duration_ms
            }
            None => current.duration_ms,
        };

        Settings {
            enabled: self.enabled.unwrap_or(current.enabled),
            mode: self.mode.unwrap_or(current.mode),
            auto_fail: self.auto_fail.unwrap_or(current.auto_fail),
            duration_ms,
        }
    }
}
