//! Error types for host-page observation

use thiserror::Error;

/// Errors raised when the externally-owned page structure cannot be
/// observed or acted upon. These are descriptive on purpose: a missing
/// board or tools container means the host page changed incompatibly, not
/// that there is nothing to do.
#[derive(Debug, Error)]
pub enum HostPageError {
    #[error("board element not found on host page")]
    BoardMissing,

    #[error("puzzle tools container not found on host page")]
    ToolsContainerMissing,

    #[error("forfeit control not found on host page")]
    ForfeitControlMissing,
}
