//! The session: one HTTP/2 connection, its stream registry and the glue
//! between the codec engine, the host and the transport.
//!
//! A [`Session`] owns the engine and a [`SessionState`]. The state is what
//! the engine calls back into while it parses or serializes, so the two
//! live in separate fields and the engine can borrow the state mutably for
//! the duration of a call.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::mem;

use bytes::Bytes;

use crate::config::{PaddingStrategy, SessionConfig};
use crate::engine::{CallbackSet, CodecEngine, DataRead, EngineCallbacks, Role};
use crate::error::{CallbackError, Result, SessionError};
use crate::flush::{self, FlushDriver};
use crate::frame::{error_code, Frame, FrameKind, HeadersCategory, PrioritySpec, StreamId};
use crate::header::{HeaderField, HeaderList};
use crate::host::{EventLoop, SessionHandler, Transport};
use crate::pool::Pool;
use crate::settings::SettingsEntry;
use crate::stream::{stream_flags, DataChunk, Stream, StreamHandle};

/// Free-list occupancy, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub streams: usize,
    pub data_chunks: usize,
    pub header_lists: usize,
}

#[derive(Debug)]
struct Pools {
    streams: Pool<Box<Stream>>,
    chunks: Pool<DataChunk>,
    header_lists: Pool<HeaderList>,
}

impl Pools {
    fn new(capacity: usize) -> Self {
        Self {
            streams: Pool::new(capacity),
            chunks: Pool::new(capacity),
            header_lists: Pool::new(capacity),
        }
    }

    fn free_headers(&mut self, stream: &mut Stream) {
        let list = mem::take(&mut stream.current_headers);
        if list.capacity() > 0 {
            self.header_lists.release(list);
        }
    }

    /// Release everything a removed stream holds, then the stream itself.
    fn retire(&mut self, mut stream: Box<Stream>) {
        let id = stream.id;
        stream.flags |= stream_flags::DESTROYING;
        for chunk in stream.data_chunks.drain(..) {
            self.chunks.release(chunk);
        }
        self.free_headers(&mut stream);
        let cancelled = stream.cancel_writes();
        stream.flags |= stream_flags::DESTROYED;
        tracing::debug!("stream {}: destroyed, {} pending writes cancelled", id, cancelled);
        self.streams.release(stream);
    }
}

/// Everything the engine's callbacks touch: the host handler, the stream
/// registry and the pools.
pub(crate) struct SessionState<H> {
    pub(crate) handler: H,
    streams: HashMap<StreamId, Box<Stream>>,
    pools: Pools,
    padding: PaddingStrategy,
}

impl<H: SessionHandler> SessionState<H> {
    fn new(handler: H, config: &SessionConfig) -> Self {
        Self {
            handler,
            streams: HashMap::new(),
            pools: Pools::new(config.pool_capacity),
            padding: config.padding,
        }
    }

    /// Take a stream from the pool, reset it for `id` and register it.
    pub(crate) fn init_stream(&mut self, id: StreamId, category: HeadersCategory) -> &mut Stream {
        let mut stream = self.pools.streams.acquire();
        stream.reset_state(id, category);
        tracing::debug!("stream {}: registered ({:?})", id, category);
        self.add_stream(stream)
    }

    pub(crate) fn add_stream(&mut self, stream: Box<Stream>) -> &mut Stream {
        let id = stream.id;
        match self.streams.entry(id) {
            Entry::Occupied(mut slot) => {
                tracing::warn!("stream {}: replacing a registered stream", id);
                let old = slot.insert(stream);
                self.pools.retire(old);
                &mut **slot.into_mut()
            }
            Entry::Vacant(slot) => &mut **slot.insert(stream),
        }
    }

    pub(crate) fn remove_stream(&mut self, id: StreamId) -> Option<Box<Stream>> {
        self.streams.remove(&id)
    }

    pub(crate) fn destroy_stream(&mut self, id: StreamId) -> bool {
        match self.remove_stream(id) {
            Some(stream) => {
                self.pools.retire(stream);
                true
            }
            None => false,
        }
    }

    fn handle_data_frame(&mut self, frame: &Frame) {
        let id = frame.header.stream_id;
        let Some(stream) = self.streams.get_mut(&id) else {
            tracing::trace!("stream {}: DATA for unknown stream ignored", id);
            return;
        };
        self.handler.on_data(stream, stream.data_chunks(), frame.header.flags);
        for chunk in stream.data_chunks.drain(..) {
            self.pools.chunks.release(chunk);
        }
    }

    fn handle_headers_frame(&mut self, frame: &Frame) -> std::result::Result<(), CallbackError> {
        let id = frame.header_target();
        let stream = self.streams.get_mut(&id).ok_or(CallbackError::StreamNotFound(id))?;
        self.handler
            .on_headers(stream, stream.headers(), stream.headers_category(), frame.header.flags);
        self.pools.free_headers(stream);
        Ok(())
    }

    fn handle_priority_frame(&mut self, stream_id: StreamId, spec: &PrioritySpec) {
        if stream_id <= 0 {
            return;
        }
        self.handler
            .on_priority(stream_id, spec.stream_id, spec.weight, spec.exclusive);
    }
}

impl<H: SessionHandler> EngineCallbacks for SessionState<H> {
    fn on_begin_headers(&mut self, frame: &Frame) -> std::result::Result<(), CallbackError> {
        let id = frame.header_target();
        let category = frame.headers_category().unwrap_or_default();
        match self.streams.get_mut(&id) {
            Some(stream) => {
                if stream.is_destroying() {
                    return Err(CallbackError::StreamDestroyed(id));
                }
                stream.start_headers(category);
            }
            None => {
                self.init_stream(id, category);
            }
        }
        Ok(())
    }

    fn on_header(&mut self, frame: &Frame, name: Bytes, value: Bytes, _flags: u8) -> std::result::Result<(), CallbackError> {
        let id = frame.header_target();
        let stream = self.streams.get_mut(&id).ok_or(CallbackError::StreamNotFound(id))?;
        if stream.current_headers.capacity() == 0 {
            stream.current_headers = self.pools.header_lists.acquire();
        }
        stream.current_headers.push(HeaderField { name, value });
        Ok(())
    }

    fn on_frame_recv(&mut self, frame: &Frame) -> std::result::Result<(), CallbackError> {
        match &frame.kind {
            FrameKind::Data => self.handle_data_frame(frame),
            FrameKind::Headers { .. } | FrameKind::PushPromise { .. } => self.handle_headers_frame(frame)?,
            FrameKind::Priority(spec) => self.handle_priority_frame(frame.header.stream_id, spec),
            FrameKind::Settings => {
                if !frame.header.is_ack() {
                    self.handler.on_settings();
                }
            }
            FrameKind::Other => {}
        }
        Ok(())
    }

    fn on_stream_close(&mut self, stream_id: StreamId, code: u32) -> std::result::Result<(), CallbackError> {
        let Some(stream) = self.streams.get_mut(&stream_id) else {
            tracing::trace!("stream {}: close for unknown stream ignored", stream_id);
            return Ok(());
        };
        stream.close(code);
        tracing::debug!("stream {}: closed with code {}", stream_id, code);
        self.handler.on_stream_close(stream, code);
        self.destroy_stream(stream_id);
        Ok(())
    }

    fn on_data_chunk_recv(&mut self, _flags: u8, stream_id: StreamId, data: &[u8]) -> std::result::Result<(), CallbackError> {
        let Some(stream) = self.streams.get_mut(&stream_id) else {
            tracing::trace!("stream {}: {} bytes for unknown stream dropped", stream_id, data.len());
            return Ok(());
        };
        let mut chunk = self.pools.chunks.acquire();
        chunk.fill(data);
        stream.data_chunks.push(chunk);
        Ok(())
    }

    fn on_select_padding(&mut self, frame: &Frame, max_payload_len: usize) -> usize {
        let frame_len = frame.header.length;
        match self.padding {
            PaddingStrategy::None => frame_len,
            PaddingStrategy::Callback => {
                let padding = self.handler.get_padding(frame_len, max_payload_len);
                frame_len.saturating_add(padding).min(max_payload_len)
            }
        }
    }

    fn on_data_source_read(&mut self, stream_id: StreamId, buf: &mut [u8]) -> std::result::Result<DataRead, CallbackError> {
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(CallbackError::StreamNotFound(stream_id))?;
        if stream.is_destroying() {
            return Err(CallbackError::StreamDestroyed(stream_id));
        }

        let len = stream.drain_writes(buf);
        let pending = stream.queued_writes() > 0;
        if pending || stream.is_writable() {
            if len == 0 && !pending {
                tracing::trace!("stream {}: nothing queued, deferring", stream_id);
                return Ok(DataRead::Deferred);
            }
            return Ok(DataRead::Data {
                len,
                eof: false,
                trailers: None,
            });
        }

        // Shut and fully drained: end of data, reported once. A later pull
        // parks the source so no second END_STREAM is produced.
        if stream.flags & stream_flags::EOF != 0 {
            tracing::trace!("stream {}: end of data already reported", stream_id);
            return Ok(DataRead::Deferred);
        }
        stream.flags |= stream_flags::EOF;
        let fields = self.handler.on_trailers(stream);
        let trailers = (!fields.is_empty()).then_some(fields);
        tracing::trace!("stream {}: end of data after {} bytes", stream_id, len);
        Ok(DataRead::Data {
            len,
            eof: true,
            trailers,
        })
    }
}

/// One HTTP/2 connection.
///
/// `E` is the codec engine, `H` receives events and `T` carries outbound
/// bytes. Input arrives through [`write`](Self::write); output leaves
/// through the transport whenever the session flushes, which happens after
/// every `write`, on every [`tick`](Self::tick) and before a stream reset.
pub struct Session<E: CodecEngine, H: SessionHandler, T: Transport> {
    pub(crate) engine: Option<E>,
    pub(crate) state: SessionState<H>,
    transport: T,
    role: Role,
    config: SessionConfig,
    flush: FlushDriver,
}

impl<E: CodecEngine, H: SessionHandler, T: Transport> Session<E, H, T> {
    /// Construct the engine and register the per-iteration flush with
    /// `event_loop`. Engine construction errors are returned unchanged.
    pub fn initialize(
        event_loop: &mut dyn EventLoop,
        role: Role,
        config: SessionConfig,
        options: E::Options,
        handler: H,
        transport: T,
    ) -> Result<Self> {
        let callbacks = match config.padding {
            PaddingStrategy::None => CallbackSet::STANDARD,
            PaddingStrategy::Callback => CallbackSet::WITH_PADDING,
        };
        let engine = E::new(role, callbacks, options)?;
        let flush = FlushDriver::start(event_loop);
        tracing::debug!("session initialized as {:?}", role);
        Ok(Self {
            engine: Some(engine),
            state: SessionState::new(handler, &config),
            transport,
            role,
            config,
            flush,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn handler(&self) -> &H {
        &self.state.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.state.handler
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The engine, until the session is torn down
    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    /// Whether [`teardown`](Self::teardown) has run
    pub fn is_closed(&self) -> bool {
        self.engine.is_none()
    }

    pub fn stream_count(&self) -> usize {
        self.state.streams.len()
    }

    pub fn streams(&self) -> impl Iterator<Item = &Stream> {
        self.state.streams.values().map(|stream| &**stream)
    }

    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            streams: self.state.pools.streams.len(),
            data_chunks: self.state.pools.chunks.len(),
            header_lists: self.state.pools.header_lists.len(),
        }
    }

    /// Feed received bytes to the engine, then flush whatever it produced.
    ///
    /// Returns the number of bytes consumed. An engine error is fatal to
    /// the connection; the caller should tear the session down.
    pub fn write(&mut self, bufs: &[&[u8]]) -> Result<usize> {
        let engine = self.engine.as_mut().ok_or(SessionError::Closed)?;
        let mut total = 0;
        for buf in bufs {
            match engine.mem_recv(buf, &mut self.state) {
                Ok(consumed) => total += consumed,
                Err(err) => {
                    tracing::warn!("session: engine rejected input: {}", err);
                    return Err(err.into());
                }
            }
        }
        self.send_pending_data()?;
        Ok(total)
    }

    pub fn submit_settings(&mut self, entries: &[SettingsEntry]) -> Result<()> {
        let engine = self.engine.as_mut().ok_or(SessionError::Closed)?;
        engine.submit_settings(entries)?;
        Ok(())
    }

    /// Open a client stream and register it. With `empty_payload` the
    /// request ends with its HEADERS frame and the stream is shut at once.
    pub fn submit_request(
        &mut self,
        priority: Option<&PrioritySpec>,
        headers: &[HeaderField],
        empty_payload: bool,
    ) -> Result<StreamId> {
        let engine = self.engine.as_mut().ok_or(SessionError::Closed)?;
        let id = engine.submit_request(priority, headers, !empty_payload)?;
        let stream = self.state.init_stream(id, HeadersCategory::Response);
        if empty_payload {
            stream.shutdown();
        }
        Ok(id)
    }

    /// Announce a graceful shutdown to the peer.
    pub fn submit_shutdown_notice(&mut self) -> Result<()> {
        let engine = self.engine.as_mut().ok_or(SessionError::Closed)?;
        engine.submit_shutdown_notice()?;
        Ok(())
    }

    pub fn find_stream(&self, id: StreamId) -> Option<&Stream> {
        self.state.streams.get(&id).map(|stream| &**stream)
    }

    /// Mutable handle to a registered stream
    pub fn stream(&mut self, id: StreamId) -> Option<StreamHandle<'_, E, H, T>> {
        if self.state.streams.contains_key(&id) {
            Some(StreamHandle { session: self, id })
        } else {
            None
        }
    }

    /// Unregister and destroy a stream, cancelling its queued writes and
    /// returning its buffers to the pools. Returns false if no stream with
    /// this id is registered, so destroying twice is harmless.
    pub fn destroy_stream(&mut self, id: StreamId) -> bool {
        self.state.destroy_stream(id)
    }

    pub(crate) fn stream_parts(&mut self, id: StreamId) -> Result<(&mut E, &mut Stream)> {
        let engine = self.engine.as_mut().ok_or(SessionError::Closed)?;
        let stream = self
            .state
            .streams
            .get_mut(&id)
            .ok_or(SessionError::StreamNotFound(id))?;
        if stream.is_destroying() {
            return Err(SessionError::StreamDestroyed(id));
        }
        Ok((engine, &mut **stream))
    }

    /// Move everything the engine wants to send to the transport. Returns
    /// the number of bytes forwarded; a torn down session sends nothing.
    pub fn send_pending_data(&mut self) -> Result<usize> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(0);
        };
        flush::send_pending_data(engine, &mut self.state, &mut self.transport, self.config.send_buffer_size)
    }

    /// Per-iteration flush, called by the event loop while the tick is
    /// registered.
    pub fn tick(&mut self) -> Result<usize> {
        if !self.flush.is_active() {
            return Ok(0);
        }
        self.send_pending_data()
    }

    /// Called by the event loop once the tick closed by
    /// [`teardown`](Self::teardown) is gone. Notifies the handler that the
    /// session is freed.
    pub fn on_tick_closed(&mut self) {
        if self.flush.finish() {
            tracing::debug!("session freed");
            self.state.handler.on_session_freed();
        }
    }

    /// Stop the per-iteration flush, destroy every stream and terminate the
    /// engine. A final flush sends the GOAWAY the engine queued. The
    /// handler's `on_session_freed` follows later, from
    /// [`on_tick_closed`](Self::on_tick_closed).
    pub fn teardown(&mut self, event_loop: &mut dyn EventLoop) -> Result<()> {
        if self.engine.is_none() {
            return Err(SessionError::Closed);
        }
        self.flush.stop(event_loop);

        let ids: Vec<StreamId> = self.state.streams.keys().copied().collect();
        for id in ids {
            self.state.destroy_stream(id);
        }

        if let Some(engine) = self.engine.as_mut() {
            if let Err(err) = engine.terminate_session(error_code::NO_ERROR) {
                tracing::debug!("session: terminate failed: {}", err);
            }
        }
        if let Err(err) = self.send_pending_data() {
            tracing::debug!("session: final flush failed: {}", err);
        }
        self.engine = None;
        tracing::debug!("session torn down");
        Ok(())
    }
}
