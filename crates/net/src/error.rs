//! Hub error types

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection rejected: {0}")]
    Rejected(String),

    #[error("Not connected")]
    NotConnected,

    /// The hub ran the request and the attendance service refused it
    #[error("{0}")]
    Service(String),

    #[error("Server full")]
    ServerFull,
}

impl From<rollcall_core::Error> for Error {
    fn from(e: rollcall_core::Error) -> Self {
        Error::Service(e.to_string())
    }
}
