//! Puzzle timer driver task
//!
//! One task owns all timer transitions: lifecycle events from the watcher,
//! settings-change notifications, and the periodic tick are serialized
//! through `tokio::select!`, so no locking discipline beyond the session's
//! own mutexes is needed.
//!
//! The periodic tick source is a local of [`run_countdown`]; leaving that
//! loop drops it, and a restart builds a fresh one. At most one interval
//! exists per driver at any time - a leaked tick source would double the
//! countdown's effective rate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::host::{ForfeitAction, HostPage};
use crate::state::{PuzzleSession, Settings, TickOutcome};
use crate::watcher::LifecycleEvent;

/// Tick cadence while the countdown runs
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// What the driver should do after handling an event
enum NextStep {
    /// Wait for events with no tick source alive
    Idle,
    /// Enter (or re-enter) the countdown loop with a fresh tick source
    Run,
    /// Event sources are gone, the session is over
    Shutdown,
}

/// Wall-clock now, routed through the tokio clock so paused-time tests can
/// drive it
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Background task driving one `PuzzleSession`.
///
/// Begins with a reset-then-start, mirroring the first puzzle already being
/// on screen when the overlay loads, then reacts to events until the
/// lifecycle channel closes.
pub async fn puzzle_timer_task(
    session: Arc<PuzzleSession>,
    mut lifecycle_rx: mpsc::Receiver<LifecycleEvent>,
    host: Arc<dyn HostPage>,
    forfeit: Arc<dyn ForfeitAction>,
) {
    info!("Starting puzzle timer task");

    let mut settings_rx = session.subscribe_settings();

    let mut step = start_new_puzzle(&session, host.as_ref());
    loop {
        step = match step {
            NextStep::Run => {
                run_countdown(
                    &session,
                    &mut lifecycle_rx,
                    &mut settings_rx,
                    host.as_ref(),
                    forfeit.as_ref(),
                )
                .await
            }
            NextStep::Idle => {
                wait_while_stopped(&session, &mut lifecycle_rx, &mut settings_rx, host.as_ref())
                    .await
            }
            NextStep::Shutdown => break,
        };
    }

    info!("Puzzle timer task finished");
}

/// Countdown loop: owns the only tick source for its whole lifetime
async fn run_countdown(
    session: &PuzzleSession,
    lifecycle_rx: &mut mpsc::Receiver<LifecycleEvent>,
    settings_rx: &mut broadcast::Receiver<Settings>,
    host: &dyn HostPage,
    forfeit: &dyn ForfeitAction,
) -> NextStep {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match session.tick_timer(now()) {
                    Ok(TickOutcome::Ticked) => {}
                    Ok(TickOutcome::Idle) => {}
                    Ok(TickOutcome::Expired) => {
                        info!("Countdown expired");
                        run_expiry_actions(session, forfeit);
                        return NextStep::Idle;
                    }
                    Err(e) => {
                        error!("Failed to process tick: {}", e);
                        return NextStep::Idle;
                    }
                }
            }

            event = lifecycle_rx.recv() => {
                match event {
                    Some(event) => match handle_lifecycle_event(session, host, event) {
                        NextStep::Run => return NextStep::Run,
                        NextStep::Idle => {
                            if !session.timer_state().map(|t| t.is_running()).unwrap_or(false) {
                                return NextStep::Idle;
                            }
                            // no transition (e.g. failed attempt), keep ticking
                        }
                        NextStep::Shutdown => return NextStep::Shutdown,
                    },
                    None => return NextStep::Shutdown,
                }
            }

            changed = settings_rx.recv() => {
                match handle_settings_change(session, changed) {
                    NextStep::Idle => return NextStep::Idle,
                    NextStep::Run => return NextStep::Run,
                    NextStep::Shutdown => return NextStep::Shutdown,
                }
            }
        }
    }
}

/// Idle loop: no tick source exists while the timer is stopped or expired
async fn wait_while_stopped(
    session: &PuzzleSession,
    lifecycle_rx: &mut mpsc::Receiver<LifecycleEvent>,
    settings_rx: &mut broadcast::Receiver<Settings>,
    host: &dyn HostPage,
) -> NextStep {
    tokio::select! {
        event = lifecycle_rx.recv() => {
            match event {
                Some(event) => handle_lifecycle_event(session, host, event),
                None => NextStep::Shutdown,
            }
        }
        changed = settings_rx.recv() => {
            handle_settings_change(session, changed)
        }
    }
}

/// Dispatch one lifecycle event. Mode conditioning of event effects lives
/// here, never in the watcher.
fn handle_lifecycle_event(
    session: &PuzzleSession,
    host: &dyn HostPage,
    event: LifecycleEvent,
) -> NextStep {
    session.record_event(event.as_str());

    match event {
        LifecycleEvent::PuzzleStarted => start_new_puzzle(session, host),
        LifecycleEvent::PuzzleSucceeded => {
            // Success pauses the clock, it does not clear it
            if session.timer_state().map(|t| t.is_running()).unwrap_or(false) {
                info!("Puzzle solved, pausing countdown");
                if let Err(e) = session.stop_timer(now()) {
                    error!("Failed to stop timer: {}", e);
                }
            } else {
                debug!("Puzzle solved while timer already stopped, ignoring");
            }
            NextStep::Idle
        }
        LifecycleEvent::PuzzleFailed => {
            // Intentionally no transition: a failed attempt keeps the clock
            // running so the player retries under the same time pressure
            debug!("Failed attempt, keeping clock running");
            NextStep::Idle
        }
    }
}

/// Reset for a new puzzle, re-acquire the board, and start if enabled.
///
/// The board may be a brand new element each puzzle, so the handle is
/// looked up afresh every time; a missing board fails this operation
/// loudly and leaves the timer stopped on a full clock.
fn start_new_puzzle(session: &PuzzleSession, host: &dyn HostPage) -> NextStep {
    if let Err(e) = session.reset_timer(now()) {
        error!("Failed to reset timer: {}", e);
        return NextStep::Idle;
    }

    let board = match host.board() {
        Ok(board) => board,
        Err(e) => {
            error!("Cannot track new puzzle: {}", e);
            return NextStep::Idle;
        }
    };
    debug!("Acquired board element, generation {}", board.generation);

    match session.start_timer(now()) {
        Ok(true) => {
            info!("New puzzle, countdown started");
            NextStep::Run
        }
        Ok(false) => NextStep::Idle,
        Err(e) => {
            error!("Failed to start timer: {}", e);
            NextStep::Idle
        }
    }
}

/// A committed settings change always resets; the countdown restarts only
/// while enabled.
fn handle_settings_change(
    session: &PuzzleSession,
    changed: Result<Settings, broadcast::error::RecvError>,
) -> NextStep {
    let settings = match changed {
        Ok(settings) => settings,
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            // Settings snapshots are absolute, so only the latest matters;
            // resync from the session instead of replaying
            warn!("Settings notifications lagged by {}, resyncing", skipped);
            match session.settings() {
                Ok(settings) => settings,
                Err(e) => {
                    error!("Failed to read settings after lag: {}", e);
                    return NextStep::Idle;
                }
            }
        }
        Err(broadcast::error::RecvError::Closed) => return NextStep::Shutdown,
    };

    info!(
        "Settings changed (mode={:?}, duration={}ms, enabled={}), resetting",
        settings.mode, settings.duration_ms, settings.enabled
    );

    if let Err(e) = session.reset_timer(now()) {
        error!("Failed to reset timer: {}", e);
        return NextStep::Idle;
    }

    match session.start_timer(now()) {
        Ok(true) => NextStep::Run,
        Ok(false) => NextStep::Idle,
        Err(e) => {
            error!("Failed to restart timer: {}", e);
            NextStep::Idle
        }
    }
}

/// Expiry side effects: forfeit fires at most once per expiry, policed by
/// the fact that `TickOutcome::Expired` is returned only by the single
/// tick that crossed zero.
fn run_expiry_actions(session: &PuzzleSession, forfeit: &dyn ForfeitAction) {
    let settings = match session.settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to read settings at expiry: {}", e);
            return;
        }
    };

    if settings.forfeits_on_expiry() {
        info!("Blitz autofail: invoking forfeit action");
        if let Err(e) = forfeit.forfeit() {
            error!("Forfeit action failed: {}", e);
        }
    }
}
