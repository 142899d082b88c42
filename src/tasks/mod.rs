//! Background tasks module
//!
//! The driver task that owns all timer transitions runs alongside the
//! lifecycle watcher for the whole page session.

pub mod puzzle_timer;

// Re-export main functions
pub use puzzle_timer::{puzzle_timer_task, TICK_INTERVAL};
