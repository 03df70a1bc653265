//! Error types for the multiplexing layer.

use crate::frame::StreamId;

/// Result type alias using [`SessionError`].
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by session and stream operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The codec engine rejected an operation or the received bytes.
    /// Errors returned from [`Session::write`](crate::Session::write) are
    /// fatal to the connection.
    #[error("codec engine error: {0}")]
    Engine(#[from] EngineError),

    /// The session has been torn down and no longer owns an engine.
    #[error("session has been torn down")]
    Closed,

    /// No stream with this id is registered.
    #[error("stream {0} not found")]
    StreamNotFound(StreamId),

    /// The stream is being destroyed and must not be re-entered.
    #[error("stream {0} is being destroyed")]
    StreamDestroyed(StreamId),

    /// The transport handed back a send buffer with no capacity.
    #[error("transport allocated an empty send buffer")]
    EmptySendBuffer,
}

/// An error reported by the codec engine.
///
/// Codes follow the engine's convention of negative library error numbers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    /// Invalid argument passed to an engine function
    pub const INVALID_ARGUMENT: i32 = -501;
    /// The peer violated the protocol
    pub const PROTOCOL: i32 = -505;
    /// Operation not valid in the current state
    pub const INVALID_STATE: i32 = -519;
    /// Engine allocation failed
    pub const NOMEM: i32 = -901;
    /// A callback reported a failure
    pub const CALLBACK_FAILURE: i32 = -902;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn callback_failure(cause: &CallbackError) -> Self {
        Self::new(Self::CALLBACK_FAILURE, cause.to_string())
    }

    /// Fatal errors leave the engine unusable for the rest of the connection.
    pub fn is_fatal(&self) -> bool {
        self.code <= -900
    }
}

/// Failure reported by a session callback back to the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    #[error("no stream registered for id {0}")]
    StreamNotFound(StreamId),
    #[error("stream {0} is being destroyed")]
    StreamDestroyed(StreamId),
}

/// Status delivered to a write completion callback when the write did not
/// go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    /// The stream was no longer writable when the write was issued.
    #[error("stream is not writable")]
    EndOfStream,
    /// The stream was destroyed before the queued bytes were consumed.
    #[error("write cancelled by stream teardown")]
    Cancelled,
}
