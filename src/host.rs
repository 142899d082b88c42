//! Host page collaborators
//!
//! The page owning the board and the forfeit control is not ours; this
//! module defines the narrow seams the timer talks to it through, plus a
//! simulated page for the demo harness and tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::info;

use crate::error::HostPageError;

/// Handle to the board element currently in the page.
///
/// The host may rebuild the board wholesale between puzzles, so a handle is
/// only valid for one puzzle; the driver re-acquires it on every
/// puzzle-started event. `generation` distinguishes rebuilt elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardHandle {
    pub generation: u64,
}

/// The observed page: board lookup lives here, mutation batches arrive
/// separately over the watcher channel.
pub trait HostPage: Send + Sync {
    /// Find the board element. Must be called afresh after each
    /// puzzle-started event; a missing board is a descriptive failure, not
    /// a silent no-op.
    fn board(&self) -> Result<BoardHandle, HostPageError>;
}

/// The externally-defined "give up and reveal the solution" action,
/// invoked at most once per expiry.
pub trait ForfeitAction: Send + Sync {
    fn forfeit(&self) -> Result<(), HostPageError>;
}

/// Simulated host page for the demo harness and tests
#[derive(Default)]
pub struct SimulatedHostPage {
    board_present: AtomicBool,
    board_generation: AtomicU64,
}

impl SimulatedHostPage {
    pub fn new() -> Self {
        Self {
            board_present: AtomicBool::new(true),
            board_generation: AtomicU64::new(0),
        }
    }

    /// Simulate the host tearing the board down
    pub fn remove_board(&self) {
        self.board_present.store(false, Ordering::SeqCst);
    }

    /// Simulate the host constructing a brand new board element
    pub fn replace_board(&self) {
        self.board_present.store(true, Ordering::SeqCst);
        self.board_generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl HostPage for SimulatedHostPage {
    fn board(&self) -> Result<BoardHandle, HostPageError> {
        if !self.board_present.load(Ordering::SeqCst) {
            return Err(HostPageError::BoardMissing);
        }
        Ok(BoardHandle {
            generation: self.board_generation.load(Ordering::SeqCst),
        })
    }
}

/// Forfeit action that only logs - what the demo harness uses in place of
/// clicking the real reveal-solution control
#[derive(Default)]
pub struct LoggingForfeit;

impl ForfeitAction for LoggingForfeit {
    fn forfeit(&self) -> Result<(), HostPageError> {
        info!("Auto-forfeit: revealing solution");
        Ok(())
    }
}
