//! State management module
//!
//! Settings, the countdown state machine, and the per-page session that
//! ties them together.

pub mod session;
pub mod settings;
pub mod timer_state;

// Re-export main types
pub use session::{InteractionOutcome, PuzzleSession, Snapshot};
pub use settings::{Mode, Settings, SettingsPatch};
pub use timer_state::{TickOutcome, TimerPhase, TimerState};
