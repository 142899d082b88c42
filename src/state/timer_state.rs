//! Timer state structure and transitions
//!
//! `TimerState` is the countdown state machine proper. Every transition
//! takes an explicit `Instant` so callers (and tests) control the clock;
//! elapsed time is always measured as a wall-clock delta from the previous
//! tick rather than a fixed per-tick decrement, so scheduler jitter or a
//! long suspension never desynchronizes the display from real time.

use std::time::{Duration, Instant};

use super::Settings;

/// How long the blocked-interaction flash stays raised
pub const LOCK_FLASH_WINDOW: Duration = Duration::from_millis(100);

/// Countdown phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    /// Not counting; `remaining_ms` holds whatever the last reset or pause
    /// left behind
    Stopped,
    /// Counting down
    Running,
    /// Reached zero; terminal until the next reset
    Expired,
}

/// Result of processing one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick arrived while not running; nothing changed
    Idle,
    /// Time was deducted, countdown continues
    Ticked,
    /// This tick crossed zero: remaining clamped to 0, phase is now Expired
    Expired,
}

/// Countdown state for one puzzle session
#[derive(Debug, Clone)]
pub struct TimerState {
    /// Milliseconds left on the clock; clamped, never negative
    pub remaining_ms: u64,
    pub phase: TimerPhase,
    /// Wall-clock reference for the next delta computation
    last_tick_at: Option<Instant>,
    /// End of the momentary blocked-interaction flash, if one is active
    lock_flash_until: Option<Instant>,
}

impl TimerState {
    /// Create a stopped timer holding the configured duration
    pub fn new(settings: &Settings) -> Self {
        Self {
            remaining_ms: settings.duration_ms,
            phase: TimerPhase::Stopped,
            last_tick_at: None,
            lock_flash_until: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn is_expired(&self) -> bool {
        self.phase == TimerPhase::Expired
    }

    /// Reinitialize to a full clock, stopped. Safe from any phase,
    /// including before the timer ever started.
    pub fn reset(&mut self, settings: &Settings) {
        self.remaining_ms = settings.duration_ms;
        self.phase = TimerPhase::Stopped;
        self.last_tick_at = None;
        self.lock_flash_until = None;
    }

    /// Begin counting down from the current `remaining_ms`
    pub fn start_at(&mut self, now: Instant) {
        self.phase = TimerPhase::Running;
        self.last_tick_at = Some(now);
    }

    /// Stop counting without touching `remaining_ms` (success pauses, it
    /// does not clear)
    pub fn stop(&mut self) {
        self.phase = TimerPhase::Stopped;
        self.last_tick_at = None;
    }

    /// Deduct the wall-clock time elapsed since the previous tick.
    ///
    /// An arbitrarily large delta is accepted as-is: time spent suspended
    /// counts as real elapsed time. Crossing zero clamps `remaining_ms` to
    /// 0 and moves to `Expired`.
    pub fn tick_at(&mut self, now: Instant) -> TickOutcome {
        if self.phase != TimerPhase::Running {
            return TickOutcome::Idle;
        }

        let last = self.last_tick_at.unwrap_or(now);
        let delta_ms = now.saturating_duration_since(last).as_millis() as u64;
        self.last_tick_at = Some(now);

        if delta_ms >= self.remaining_ms {
            self.remaining_ms = 0;
            self.phase = TimerPhase::Expired;
            self.last_tick_at = None;
            return TickOutcome::Expired;
        }

        self.remaining_ms -= delta_ms;
        TickOutcome::Ticked
    }

    /// Raise the momentary blocked-interaction flash
    pub fn flash_lock_at(&mut self, now: Instant) {
        self.lock_flash_until = Some(now + LOCK_FLASH_WINDOW);
    }

    /// Whether the blocked-interaction flash is still raised at `now`
    pub fn blocked_at(&self, now: Instant) -> bool {
        match self.lock_flash_until {
            Some(until) => now < until,
            None => false,
        }
    }
}
