//! Interfaces to the host side: event sink, transport and event loop.

use bytes::BytesMut;

use crate::frame::{HeadersCategory, StreamId};
use crate::header::{HeaderField, HeaderList};
use crate::stream::{DataChunk, Stream};

/// Events delivered to the application binding.
///
/// All methods are called synchronously from inside
/// [`Session::write`](crate::Session::write) or a flush.
pub trait SessionHandler {
    /// A complete header block for `stream`, fields in arrival order.
    fn on_headers(&mut self, stream: &Stream, headers: &[HeaderField], category: HeadersCategory, flags: u8);

    /// All chunks of one DATA frame, in arrival order. `flags` are the DATA
    /// frame's flags.
    fn on_data(&mut self, stream: &Stream, chunks: &[DataChunk], flags: u8);

    /// A non-ACK SETTINGS frame was received.
    fn on_settings(&mut self) {}

    fn on_priority(&mut self, _stream_id: StreamId, _parent: StreamId, _weight: i32, _exclusive: bool) {}

    /// `stream` closed with `code`. It is destroyed right after this returns.
    fn on_stream_close(&mut self, _stream: &Stream, _code: u32) {}

    /// Trailers to send once `stream`'s body is complete. Called at most once
    /// per stream.
    fn on_trailers(&mut self, _stream: &Stream) -> HeaderList {
        Vec::new()
    }

    /// The session finished tearing down.
    fn on_session_freed(&mut self) {}

    /// Padding bytes for an outgoing frame. Only consulted with
    /// [`PaddingStrategy::Callback`](crate::PaddingStrategy::Callback).
    fn get_padding(&mut self, _frame_len: usize, _max_payload_len: usize) -> usize {
        0
    }
}

/// Sink for serialized bytes.
pub trait Transport {
    /// A buffer to fill; its capacity bounds the segment.
    fn allocate_send_buffer(&mut self, recommended: usize) -> BytesMut {
        BytesMut::with_capacity(recommended)
    }

    /// Transmit a filled segment. May be empty.
    fn send(&mut self, buf: BytesMut);
}

/// Registration handle for the per-iteration flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickId(pub u64);

/// The event loop running the session.
///
/// While a tick is registered the loop calls
/// [`Session::tick`](crate::Session::tick) once per iteration. After
/// [`close_tick`](EventLoop::close_tick) it stops doing so and calls
/// [`Session::on_tick_closed`](crate::Session::on_tick_closed) exactly once,
/// on a later iteration.
pub trait EventLoop {
    fn start_tick(&mut self) -> TickId;
    fn close_tick(&mut self, id: TickId);
}
