//! Error types for the Prahari detector
//!
//! Every failure path in the engine either returns one of these variants or
//! emits exactly one `error` notification; nothing is silently swallowed.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrahariError {
    #[error("invalid port {0:?}: must be an integer in 1-65535")]
    InvalidPort(String),

    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("detector already started")]
    AlreadyStarted,

    #[error("detector not started")]
    NotStarted,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PrahariError {
    /// Port carried by a bind failure, if this is one.
    #[must_use]
    pub fn bind_port(&self) -> Option<u16> {
        match self {
            PrahariError::Bind { port, .. } => Some(*port),
            _ => None,
        }
    }
}

/// Result type alias for Prahari operations
pub type PrahariResult<T> = Result<T, PrahariError>;
