//! Configuration and CLI argument handling for the demo harness

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use crate::persistence::{FileBackend, MemoryBackend, SettingsBackend};
use crate::state::{Mode, SettingsPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Thinking,
    Blitz,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Thinking => Mode::Thinking,
            ModeArg::Blitz => Mode::Blitz,
        }
    }
}

/// CLI argument parsing structure
#[derive(Parser)]
#[command(name = "puzzle-clock")]
#[command(about = "An event-driven countdown overlay for sequential timed puzzles")]
#[command(version = "1.0.0")]
pub struct Config {
    /// Countdown duration in seconds
    #[arg(short, long, default_value = "60")]
    pub duration: u64,

    /// Timer mode
    #[arg(short, long, value_enum, default_value = "blitz")]
    pub mode: ModeArg,

    /// Disable the automatic forfeit on expiry in blitz mode
    #[arg(long)]
    pub no_autofail: bool,

    /// Start with the overlay disabled
    #[arg(long)]
    pub disabled: bool,

    /// Settings file to load from and persist to (in-memory when omitted)
    #[arg(short, long)]
    pub settings_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Settings backend selected by the arguments
    pub fn backend(&self) -> Arc<dyn SettingsBackend> {
        match &self.settings_file {
            Some(path) => Arc::new(FileBackend::new(path.clone())),
            None => Arc::new(MemoryBackend::new()),
        }
    }

    /// Settings candidate assembled from the arguments, applied over
    /// whatever the backend held
    pub fn settings_patch(&self) -> SettingsPatch {
        SettingsPatch {
            enabled: Some(!self.disabled),
            mode: Some(self.mode.into()),
            auto_fail: Some(!self.no_autofail),
            duration_ms: Some(self.duration.saturating_mul(1_000)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Config {
        <Config as Parser>::try_parse_from(
            std::iter::once("puzzle-clock").chain(args.iter().copied()),
        )
        .unwrap()
    }

    #[test]
    fn defaults_mirror_the_stock_settings() {
        let patch = config(&[]).settings_patch();
        assert_eq!(patch.enabled, Some(true));
        assert_eq!(patch.mode, Some(Mode::Blitz));
        assert_eq!(patch.auto_fail, Some(true));
        assert_eq!(patch.duration_ms, Some(60_000));
    }

    #[test]
    fn flags_map_onto_the_patch() {
        let patch =
            config(&["-d", "34", "-m", "thinking", "--no-autofail", "--disabled"]).settings_patch();
        assert_eq!(patch.enabled, Some(false));
        assert_eq!(patch.mode, Some(Mode::Thinking));
        assert_eq!(patch.auto_fail, Some(false));
        assert_eq!(patch.duration_ms, Some(34_000));
    }
}
