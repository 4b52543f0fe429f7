// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use thiserror::Error;

/// Errors surfaced by the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A job was submitted before `start()` or after `stop()`.
    #[error("dispatcher is not running")]
    NotRunning,

    /// `start()` was called on a dispatcher that is running or already stopped.
    #[error("dispatcher has already been started")]
    AlreadyStarted,

    #[error("invalid dispatcher configuration: {0}")]
    InvalidConfig(String),

    /// The OS refused to spawn a worker or the dispatch thread.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T, E = DispatchError> = std::result::Result<T, E>;

impl DispatchError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, DispatchError::NotRunning)
    }
}
