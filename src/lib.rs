//! h2-mux: HTTP/2 session and stream multiplexing above a codec engine
//!
//! This crate sits between a wire-level HTTP/2 codec engine (framing, HPACK,
//! flow-control accounting) and an application binding. It keeps one
//! [`Session`] per connection with a registry of [`Stream`]s, turns engine
//! callbacks into host events, queues outbound body bytes per stream and
//! flushes serialized output to a [`Transport`].
//!
//! # Features
//!
//! - **Sans-I/O Design**: bytes go in through [`Session::write`] and come
//!   out through [`Transport::send`]; the event loop only drives ticks
//! - **Engine Agnostic**: any engine implementing [`CodecEngine`]
//! - **Write Queues**: per-stream FIFO of buffers with completion callbacks
//! - **Read Pausing**: [`StreamHandle::read_stop`] closes the receive window
//!   and [`StreamHandle::read_start`] restores it
//! - **Pooling**: streams, data chunks and header lists are recycled through
//!   bounded free lists
//!
//! # Quick Start
//!
//! ```rust
//! use bytes::{Bytes, BytesMut};
//! use h2_mux::{
//!     DataChunk, EventLoop, HeaderField, HeadersCategory, Role, Session, SessionConfig, SessionHandler, Stream,
//!     TickId, Transport,
//! };
//! # use h2_mux::{
//! #     flags, CallbackError, CallbackSet, CodecEngine, EngineCallbacks, EngineError, Frame, PrioritySpec,
//! #     SettingsEntry, StreamId,
//! # };
//! #
//! # // Reports every received buffer as a GET on stream 1 and never has output.
//! # struct ToyEngine;
//! #
//! # impl CodecEngine for ToyEngine {
//! #     type Options = ();
//! #     fn new(_: Role, _: CallbackSet, _: ()) -> Result<Self, EngineError> { Ok(ToyEngine) }
//! #     fn mem_recv(&mut self, data: &[u8], cb: &mut dyn EngineCallbacks) -> Result<usize, EngineError> {
//! #         let fail = |err: CallbackError| EngineError::callback_failure(&err);
//! #         let frame = Frame::headers(1, flags::END_HEADERS | flags::END_STREAM, HeadersCategory::Request);
//! #         cb.on_begin_headers(&frame).map_err(fail)?;
//! #         cb.on_header(&frame, Bytes::from_static(b":method"), Bytes::from_static(b"GET"), 0).map_err(fail)?;
//! #         cb.on_frame_recv(&frame).map_err(fail)?;
//! #         Ok(data.len())
//! #     }
//! #     fn mem_send(&mut self, _: &mut dyn EngineCallbacks) -> Result<&[u8], EngineError> { Ok(&[][..]) }
//! #     fn submit_settings(&mut self, _: &[SettingsEntry]) -> Result<(), EngineError> { Ok(()) }
//! #     fn submit_request(&mut self, _: Option<&PrioritySpec>, _: &[HeaderField], _: bool) -> Result<StreamId, EngineError> { Ok(1) }
//! #     fn submit_response(&mut self, _: StreamId, _: &[HeaderField], _: bool) -> Result<(), EngineError> { Ok(()) }
//! #     fn submit_headers(&mut self, _: StreamId, _: &[HeaderField]) -> Result<(), EngineError> { Ok(()) }
//! #     fn submit_push_promise(&mut self, _: StreamId, _: &[HeaderField]) -> Result<StreamId, EngineError> { Ok(2) }
//! #     fn submit_rst_stream(&mut self, _: StreamId, _: u32) -> Result<(), EngineError> { Ok(()) }
//! #     fn submit_priority(&mut self, _: StreamId, _: &PrioritySpec) -> Result<(), EngineError> { Ok(()) }
//! #     fn change_stream_priority(&mut self, _: StreamId, _: &PrioritySpec) -> Result<(), EngineError> { Ok(()) }
//! #     fn submit_shutdown_notice(&mut self) -> Result<(), EngineError> { Ok(()) }
//! #     fn resume_data(&mut self, _: StreamId) -> Result<(), EngineError> { Ok(()) }
//! #     fn stream_local_window_size(&self, _: StreamId) -> Option<i32> { None }
//! #     fn set_local_window_size(&mut self, _: StreamId, _: i32) -> Result<(), EngineError> { Ok(()) }
//! #     fn terminate_session(&mut self, _: u32) -> Result<(), EngineError> { Ok(()) }
//! # }
//!
//! #[derive(Default)]
//! struct Requests(Vec<(i32, Vec<HeaderField>)>);
//!
//! impl SessionHandler for Requests {
//!     fn on_headers(&mut self, stream: &Stream, headers: &[HeaderField], _: HeadersCategory, _: u8) {
//!         self.0.push((stream.id(), headers.to_vec()));
//!     }
//!
//!     fn on_data(&mut self, _: &Stream, _: &[DataChunk], _: u8) {}
//! }
//!
//! struct Socket;
//!
//! impl Transport for Socket {
//!     fn send(&mut self, _segment: BytesMut) {}
//! }
//!
//! struct Loop;
//!
//! impl EventLoop for Loop {
//!     fn start_tick(&mut self) -> TickId {
//!         TickId(1)
//!     }
//!
//!     fn close_tick(&mut self, _: TickId) {}
//! }
//!
//! let mut session = Session::<ToyEngine, _, _>::initialize(
//!     &mut Loop,
//!     Role::Server,
//!     SessionConfig::default(),
//!     (),
//!     Requests::default(),
//!     Socket,
//! )?;
//!
//! // Bytes read from the socket
//! session.write(&[b"request bytes".as_slice()])?;
//! assert_eq!(session.handler().0[0].0, 1);
//!
//! // Answer stream 1 with a body
//! if let Some(mut stream) = session.stream(1) {
//!     stream.submit_response(&[HeaderField::new(":status", "200")], false)?;
//!     stream.write(vec![Bytes::from_static(b"hello")], |status| println!("sent: {:?}", status))?;
//!     stream.shutdown()?;
//! }
//! session.tick()?;
//! # Ok::<(), h2_mux::SessionError>(())
//! ```
//!
//! # Architecture
//!
//! This crate is intentionally layered. It provides:
//! - Stream registry and lifecycle
//! - Inbound header and data accumulation
//! - Outbound write queues and send buffer segmentation
//!
//! It does NOT provide:
//! - Frame parsing or HPACK (the engine's job)
//! - Sockets or TLS (you provide the bytes)
//! - An event loop (you call [`Session::tick`])

pub mod config;
pub mod engine;
pub mod error;
mod flush;
pub mod frame;
pub mod header;
pub mod host;
pub mod pool;
pub mod session;
pub mod settings;
pub mod stream;

pub use config::{PaddingStrategy, SessionConfig, SEND_BUFFER_RECOMMENDED_SIZE};
pub use engine::{CallbackSet, CodecEngine, DataRead, EngineCallbacks, Role};
pub use error::{CallbackError, EngineError, Result, SessionError, WriteError};
pub use frame::{
    error_code, flags, frame_type, Frame, FrameHeader, FrameKind, HeadersCategory, PrioritySpec, StreamId,
};
pub use header::{HeaderField, HeaderList};
pub use host::{EventLoop, SessionHandler, TickId, Transport};
pub use pool::{Pool, Recycle, FREELIST_MAX};
pub use session::{PoolStats, Session};
pub use settings::{settings_id, Settings, SettingsEntry};
pub use stream::{stream_flags, DataChunk, Stream, StreamHandle, WriteCallback};
