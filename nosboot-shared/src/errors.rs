//! Error taxonomy for device bootstrap.
//!
//! Recoverable conditions (a slow boot, a stalled console) never show up here;
//! they are absorbed by the bootstrap loop. Everything in this enum ends the
//! current launch.

use thiserror::Error;

/// Result alias used across the workspace.
pub type NosbootResult<T> = Result<T, NosbootError>;

#[derive(Debug, Error)]
pub enum NosbootError {
    /// Invalid launch options.
    #[error("configuration error: {0}")]
    Config(String),

    /// Staging directory or artifact could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// The boot media image could not be produced.
    #[error("boot media build failed: {0}")]
    MediaBuild(String),

    /// Serial console channel failed (connect, EOF, write).
    #[error("console error: {0}")]
    Console(String),

    /// Hypervisor monitor channel failed or rejected a command.
    #[error("monitor error: {0}")]
    Monitor(String),

    /// Hypervisor process could not be spawned or controlled.
    #[error("engine error: {0}")]
    Engine(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
