//! Per-page puzzle session state
//!
//! `PuzzleSession` owns the settings store and the timer state for exactly
//! one page session, plus the two notification channels: a broadcast of
//! committed settings changes and a watch channel carrying the latest
//! render snapshot for the presentation layer. There are no module-level
//! singletons; tests construct as many independent sessions as they like.

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::persistence::{PersistedSettings, SettingsBackend};

use super::{Mode, Settings, SettingsPatch, TickOutcome, TimerState};

/// What happened to an attempted board interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionOutcome {
    /// Suppressed; the blocked flash was raised and the action must not
    /// propagate to the underlying page
    Blocked,
    /// Passed through untouched
    Allowed,
}

/// State snapshot handed to the presentation layer after every tick and
/// every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub remaining_ms: u64,
    pub running: bool,
    pub expired: bool,
    pub mode: Mode,
    pub enabled: bool,
    pub blocked: bool,
}

/// Session state shared between the timer driver, the watcher and user
/// input callbacks
pub struct PuzzleSession {
    settings: Arc<Mutex<Settings>>,
    timer: Arc<Mutex<TimerState>>,
    backend: Arc<dyn SettingsBackend>,
    /// Committed settings changes, one notification per changing commit
    pub settings_changed_tx: broadcast::Sender<Settings>,
    /// Latest render snapshot
    snapshot_tx: watch::Sender<Snapshot>,
    /// Keep the receiver alive to prevent channel closure
    _snapshot_rx: watch::Receiver<Snapshot>,
    /// Last processed event tracking
    last_event: Mutex<Option<String>>,
    last_event_at: Mutex<Option<DateTime<Utc>>>,
    /// Session start, the wall-clock reference for the separator pulse
    epoch: Instant,
}

impl PuzzleSession {
    /// Create a session, loading settings from the backend. Retrieval
    /// problems are never fatal: absent or unreadable state falls back to
    /// defaults.
    pub fn new(backend: Arc<dyn SettingsBackend>) -> Self {
        let settings = Self::load_settings(backend.as_ref());
        let timer = TimerState::new(&settings);
        let epoch = Instant::now();

        let (settings_changed_tx, _) = broadcast::channel(16);
        let initial = Self::snapshot_at(&settings, &timer, epoch);
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        Self {
            settings: Arc::new(Mutex::new(settings)),
            timer: Arc::new(Mutex::new(timer)),
            backend,
            settings_changed_tx,
            snapshot_tx,
            _snapshot_rx: snapshot_rx,
            last_event: Mutex::new(None),
            last_event_at: Mutex::new(None),
            epoch,
        }
    }

    fn load_settings(backend: &dyn SettingsBackend) -> Settings {
        match backend.get() {
            Ok(Some(record)) => {
                if record.settings.duration_ms < super::settings::MIN_DURATION_MS {
                    warn!(
                        "Persisted duration {}ms below floor, using defaults",
                        record.settings.duration_ms
                    );
                    Settings::new()
                } else {
                    info!("Loaded persisted settings: {:?}", record.settings);
                    record.settings
                }
            }
            Ok(None) => {
                info!("No persisted settings, using defaults");
                Settings::new()
            }
            Err(e) => {
                warn!("Failed to load settings ({}), using defaults", e);
                Settings::new()
            }
        }
    }

    /// Wall-clock reference for presentation-side pulses
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    pub fn subscribe_settings(&self) -> broadcast::Receiver<Settings> {
        self.settings_changed_tx.subscribe()
    }

    pub fn snapshot_rx(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Get the current settings snapshot
    pub fn settings(&self) -> Result<Settings, String> {
        self.settings
            .lock()
            .map(|s| *s)
            .map_err(|e| format!("Failed to lock settings: {}", e))
    }

    /// Get the current timer state
    pub fn timer_state(&self) -> Result<TimerState, String> {
        self.timer
            .lock()
            .map(|t| t.clone())
            .map_err(|e| format!("Failed to lock timer state: {}", e))
    }

    /// Apply a settings candidate.
    ///
    /// Invalid candidate durations are discarded while the rest of the
    /// patch still applies. If the resulting snapshot differs from the
    /// current one, state is updated, persisted best-effort, and exactly
    /// one `settingsChanged` notification is published; an unchanged
    /// candidate publishes nothing.
    pub fn commit(&self, patch: SettingsPatch) -> Result<Option<Settings>, String> {
        let new_settings = {
            let mut settings = self
                .settings
                .lock()
                .map_err(|e| format!("Failed to lock settings: {}", e))?;

            let candidate = patch.apply_to(&settings);
            if candidate == *settings {
                debug!("Settings commit changed nothing, skipping notification");
                return Ok(None);
            }
            *settings = candidate;
            candidate
        };

        info!("Settings committed: {:?}", new_settings);
        self.record_event("settings-changed");

        // Best-effort persistence, the timer works without it
        if let Err(e) = self.backend.set(&PersistedSettings::now(new_settings)) {
            warn!("Failed to persist settings: {}", e);
        }

        if let Err(e) = self.settings_changed_tx.send(new_settings) {
            warn!("Failed to send settings change notification: {}", e);
        }

        Ok(Some(new_settings))
    }

    /// The toolbar enable toggle. Reset/restart behavior flows through the
    /// one `settingsChanged` rule in the driver.
    pub fn set_enabled(&self, enabled: bool) -> Result<Option<Settings>, String> {
        info!("Setting enabled to: {}", enabled);
        self.commit(SettingsPatch::enabled(enabled))
    }

    /// Reset the timer to a full, stopped clock. Safe from any state.
    pub fn reset_timer(&self, now: Instant) -> Result<(), String> {
        let settings = self.settings()?;
        self.with_timer(now, |timer| timer.reset(&settings))?;
        Ok(())
    }

    /// Start counting down. No-op while disabled; returns whether the
    /// timer is now running.
    pub fn start_timer(&self, now: Instant) -> Result<bool, String> {
        let settings = self.settings()?;
        if !settings.enabled {
            debug!("Start requested while disabled, ignoring");
            return Ok(false);
        }
        self.with_timer(now, |timer| timer.start_at(now))?;
        Ok(true)
    }

    /// Stop counting without clearing the remaining time
    pub fn stop_timer(&self, now: Instant) -> Result<(), String> {
        self.with_timer(now, |timer| timer.stop())?;
        Ok(())
    }

    /// Process one tick at `now`
    pub fn tick_timer(&self, now: Instant) -> Result<TickOutcome, String> {
        self.with_timer(now, |timer| timer.tick_at(now))
    }

    /// An attempted interaction with the board. Intercepted, with the
    /// momentary blocked flash raised, only while the clock runs in
    /// Thinking mode with the extension enabled.
    pub fn handle_board_interaction(&self, now: Instant) -> Result<InteractionOutcome, String> {
        let settings = self.settings()?;
        let outcome = self.with_timer(now, |timer| {
            if settings.locks_board() && timer.is_running() {
                timer.flash_lock_at(now);
                InteractionOutcome::Blocked
            } else {
                InteractionOutcome::Allowed
            }
        })?;

        if outcome == InteractionOutcome::Blocked {
            debug!("Board interaction blocked in thinking mode");
        }
        Ok(outcome)
    }

    /// Current snapshot without mutating anything
    pub fn snapshot(&self, now: Instant) -> Result<Snapshot, String> {
        let settings = self.settings()?;
        let timer = self.timer_state()?;
        Ok(Self::snapshot_at(&settings, &timer, now))
    }

    /// Record the last lifecycle event processed, for status logging
    pub fn record_event(&self, name: &str) {
        if let Ok(mut last) = self.last_event.lock() {
            *last = Some(name.to_string());
        }
        if let Ok(mut at) = self.last_event_at.lock() {
            *at = Some(Utc::now());
        }
    }

    /// Last processed event and when it arrived
    pub fn last_event(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let name = self.last_event.lock().ok().and_then(|e| e.clone());
        let at = self.last_event_at.lock().ok().and_then(|t| *t);
        (name, at)
    }

    /// Run `f` against the locked timer state, then publish a fresh
    /// snapshot. Every transition goes through here, so the presentation
    /// layer always observes a full prior-to-next state change.
    fn with_timer<R>(&self, now: Instant, f: impl FnOnce(&mut TimerState) -> R) -> Result<R, String> {
        let settings = self.settings()?;
        let (result, snapshot) = {
            let mut timer = self
                .timer
                .lock()
                .map_err(|e| format!("Failed to lock timer state: {}", e))?;
            let result = f(&mut timer);
            (result, Self::snapshot_at(&settings, &timer, now))
        };

        if let Err(e) = self.snapshot_tx.send(snapshot) {
            warn!("Failed to send render snapshot: {}", e);
        }
        Ok(result)
    }

    fn snapshot_at(settings: &Settings, timer: &TimerState, now: Instant) -> Snapshot {
        Snapshot {
            remaining_ms: timer.remaining_ms,
            running: timer.is_running(),
            expired: timer.is_expired(),
            mode: settings.mode,
            enabled: settings.enabled,
            blocked: timer.blocked_at(now),
        }
    }
}
