//! The boundary to the wire-level codec engine.
//!
//! The engine parses and generates frames and runs HPACK. This crate drives
//! it through [`CodecEngine`] and is driven back through [`EngineCallbacks`]:
//! every callback runs synchronously inside [`CodecEngine::mem_recv`] or
//! [`CodecEngine::mem_send`], never on its own schedule.
//!
//! Callback contract expected from an engine:
//! - a callback returning `Err` from `mem_recv` aborts processing and the
//!   engine reports [`EngineError::CALLBACK_FAILURE`];
//! - `on_data_source_read` returning `Err` resets that stream only;
//! - `on_select_padding` is only invoked when the [`CallbackSet`] the engine
//!   was built with installs it.

use bytes::Bytes;

use crate::error::{CallbackError, EngineError};
use crate::frame::{Frame, PrioritySpec, StreamId};
use crate::header::{HeaderField, HeaderList};
use crate::settings::SettingsEntry;

/// Which end of the connection this session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Which optional callbacks an engine should install.
///
/// The two variants are plain constants chosen once per session from the
/// padding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackSet {
    pub select_padding: bool,
}

impl CallbackSet {
    pub const STANDARD: CallbackSet = CallbackSet {
        select_padding: false,
    };
    pub const WITH_PADDING: CallbackSet = CallbackSet {
        select_padding: true,
    };
}

/// Answer to a data pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataRead {
    /// Nothing to send yet. The engine parks the data source until
    /// [`CodecEngine::resume_data`] is called for the stream.
    Deferred,
    /// `len` bytes were written to the front of the engine's buffer.
    Data {
        len: usize,
        /// No more data will follow on this stream.
        eof: bool,
        /// Trailers to submit after the final DATA frame. When present,
        /// the DATA frame must not carry END_STREAM; the trailers do.
        trailers: Option<HeaderList>,
    },
}

impl DataRead {
    /// Whether the DATA frame built from this read carries END_STREAM
    pub fn ends_stream(&self) -> bool {
        matches!(self, DataRead::Data { eof: true, trailers: None, .. })
    }
}

/// Commands the session issues to the codec engine.
pub trait CodecEngine: Sized {
    /// Engine-specific construction options.
    type Options: Default;

    /// Construct an engine for one connection.
    fn new(role: Role, callbacks: CallbackSet, options: Self::Options) -> Result<Self, EngineError>;

    /// Feed received bytes. Returns the number of bytes consumed.
    fn mem_recv(&mut self, data: &[u8], callbacks: &mut dyn EngineCallbacks) -> Result<usize, EngineError>;

    /// Serialize the next batch of pending frames. An empty slice means there
    /// is nothing left to send.
    fn mem_send(&mut self, callbacks: &mut dyn EngineCallbacks) -> Result<&[u8], EngineError>;

    fn submit_settings(&mut self, entries: &[SettingsEntry]) -> Result<(), EngineError>;

    /// Open a new client stream. With `with_data` the engine attaches a data
    /// source that pulls through [`EngineCallbacks::on_data_source_read`];
    /// without it the HEADERS frame ends the stream.
    fn submit_request(
        &mut self,
        priority: Option<&PrioritySpec>,
        headers: &[HeaderField],
        with_data: bool,
    ) -> Result<StreamId, EngineError>;

    fn submit_response(&mut self, stream_id: StreamId, headers: &[HeaderField], with_data: bool) -> Result<(), EngineError>;

    /// Send a HEADERS frame that neither opens a body nor ends the stream
    /// (informational responses).
    fn submit_headers(&mut self, stream_id: StreamId, headers: &[HeaderField]) -> Result<(), EngineError>;

    /// Returns the promised stream id.
    fn submit_push_promise(&mut self, stream_id: StreamId, headers: &[HeaderField]) -> Result<StreamId, EngineError>;

    fn submit_rst_stream(&mut self, stream_id: StreamId, code: u32) -> Result<(), EngineError>;

    fn submit_priority(&mut self, stream_id: StreamId, spec: &PrioritySpec) -> Result<(), EngineError>;

    /// Update the local priority tree without sending a PRIORITY frame.
    fn change_stream_priority(&mut self, stream_id: StreamId, spec: &PrioritySpec) -> Result<(), EngineError>;

    fn submit_shutdown_notice(&mut self) -> Result<(), EngineError>;

    /// Wake a deferred data source.
    fn resume_data(&mut self, stream_id: StreamId) -> Result<(), EngineError>;

    /// Current local receive window of a stream, if the engine knows it.
    fn stream_local_window_size(&self, stream_id: StreamId) -> Option<i32>;

    fn set_local_window_size(&mut self, stream_id: StreamId, size: i32) -> Result<(), EngineError>;

    /// Queue a GOAWAY and stop accepting new streams.
    fn terminate_session(&mut self, code: u32) -> Result<(), EngineError>;
}

/// The callback set the engine invokes while receiving or sending.
pub trait EngineCallbacks {
    /// A HEADERS or PUSH_PROMISE frame starts.
    fn on_begin_headers(&mut self, frame: &Frame) -> Result<(), CallbackError>;

    /// One decoded header field of the frame being received. The engine
    /// keeps its own reference; the session takes another.
    fn on_header(&mut self, frame: &Frame, name: Bytes, value: Bytes, flags: u8) -> Result<(), CallbackError>;

    /// A frame has been completely received.
    fn on_frame_recv(&mut self, frame: &Frame) -> Result<(), CallbackError>;

    /// A stream closed, by RST_STREAM or naturally.
    fn on_stream_close(&mut self, stream_id: StreamId, code: u32) -> Result<(), CallbackError>;

    /// Part of a DATA frame's payload. Called any number of times per frame.
    fn on_data_chunk_recv(&mut self, flags: u8, stream_id: StreamId, data: &[u8]) -> Result<(), CallbackError>;

    /// Padded payload length for an outgoing frame, at most `max_payload_len`.
    fn on_select_padding(&mut self, frame: &Frame, max_payload_len: usize) -> usize;

    /// The engine wants up to `buf.len()` bytes for a DATA frame.
    fn on_data_source_read(&mut self, stream_id: StreamId, buf: &mut [u8]) -> Result<DataRead, CallbackError>;
}
