//! Puzzle Clock - an event-driven countdown overlay for sequential timed
//! puzzles
//!
//! The host page presents one puzzle after another and rebuilds its own
//! tree as it goes; this crate watches those structural changes, keeps a
//! per-session countdown with mode-dependent behavior (free-form thinking
//! vs. blitz with input lock and auto-forfeit), and hands render snapshots
//! to whatever presentation layer hosts the overlay.

pub mod config;
pub mod error;
pub mod host;
pub mod persistence;
pub mod presenter;
pub mod state;
pub mod tasks;
pub mod utils;
pub mod watcher;

// Re-export commonly used types
pub use config::Config;
pub use error::HostPageError;
pub use state::{Mode, PuzzleSession, Settings, SettingsPatch, Snapshot};
pub use tasks::puzzle_timer_task;
pub use utils::shutdown_signal;
pub use watcher::{lifecycle_watcher_task, LifecycleEvent, MutationBatch};
