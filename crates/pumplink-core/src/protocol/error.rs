//! Protocol errors

use thiserror::Error;

/// Errors that can occur during a command/response transaction
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("No response within {0} ms")]
    Timeout(u64),

    #[error("Unexpected response: {0}")]
    Mismatch(String),

    #[error("Link error: {0}")]
    Link(String),

    #[error("Not connected to pump")]
    NotConnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Mismatch with a short description of what the parser expected.
    pub(crate) fn expected(what: impl std::fmt::Display) -> Self {
        ProtocolError::Mismatch(format!("expected {what}"))
    }
}
