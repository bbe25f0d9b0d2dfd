use std::io;
use thiserror::Error;

/// Error type for linekv operations.
///
/// Malformed or unknown commands are not errors: they are answered
/// in-band with an `ERROR:` line and the session keeps going.
#[derive(Error, Debug)]
pub enum KvError {
    /// IO error from a socket or stream.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// An argument that cannot be expressed on the wire.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The server answered with an `ERROR:` line.
    #[error("Server error: {0}")]
    Server(String),

    /// The server answered with a line the client did not expect.
    #[error("Unexpected response: {0:?}")]
    UnexpectedResponse(String),

    /// Any other error, carried as a message.
    #[error("{0}")]
    StringError(String),
}

/// Result type alias for linekv operations.
pub type Result<T> = std::result::Result<T, KvError>;
