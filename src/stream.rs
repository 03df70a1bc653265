//! Per-stream state: inbound accumulation, the outbound write queue and
//! flow-control flags.
//!
//! A [`Stream`] is owned by its session's registry. Host code reaches it
//! read-only through [`Session::find_stream`](crate::Session::find_stream)
//! or mutably through a [`StreamHandle`], which pairs the stream with the
//! engine so that commands can be forwarded with the stream's id.

use std::collections::VecDeque;
use std::fmt;
use std::ops::Deref;

use bytes::Bytes;

use crate::engine::CodecEngine;
use crate::error::{Result, WriteError};
use crate::frame::{HeadersCategory, PrioritySpec, StreamId};
use crate::header::{HeaderField, HeaderList};
use crate::host::{SessionHandler, Transport};
use crate::pool::Recycle;
use crate::session::Session;
use crate::settings::DEFAULT_INITIAL_WINDOW_SIZE;

/// Stream state flags. Not mutually exclusive.
pub mod stream_flags {
    pub const NONE: u8 = 0x0;
    /// Local side half-closed: no more writes are accepted
    pub const SHUT: u8 = 0x1;
    pub const READ_START: u8 = 0x2;
    pub const READ_PAUSED: u8 = 0x4;
    pub const CLOSED: u8 = 0x8;
    pub const DESTROYING: u8 = 0x10;
    pub const DESTROYED: u8 = 0x20;
    /// End of data has been reported to the engine
    pub const EOF: u8 = 0x40;
}

/// Completion for a queued write. Invoked exactly once.
pub type WriteCallback = Box<dyn FnOnce(std::result::Result<(), WriteError>)>;

/// One received DATA payload piece, recycled after delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataChunk(Vec<u8>);

impl DataChunk {
    pub(crate) fn fill(&mut self, data: &[u8]) {
        self.0.clear();
        self.0.extend_from_slice(data);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for DataChunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Recycle for DataChunk {
    /// Parked chunks hold no payload memory; only the node is reused.
    fn recycle(&mut self) {
        self.0 = Vec::new();
    }
}

/// A queued outbound write. Dropping it before it completes reports
/// [`WriteError::Cancelled`].
pub(crate) struct WriteRequest {
    bufs: Vec<Bytes>,
    completion: Option<WriteCallback>,
}

impl WriteRequest {
    fn new(bufs: Vec<Bytes>, completion: WriteCallback) -> Self {
        Self {
            bufs,
            completion: Some(completion),
        }
    }

    fn complete(mut self, status: std::result::Result<(), WriteError>) {
        if let Some(cb) = self.completion.take() {
            cb(status);
        }
    }
}

impl Drop for WriteRequest {
    fn drop(&mut self) {
        if let Some(cb) = self.completion.take() {
            cb(Err(WriteError::Cancelled));
        }
    }
}

impl fmt::Debug for WriteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteRequest")
            .field("bufs", &self.bufs.len())
            .field("pending", &self.completion.is_some())
            .finish()
    }
}

/// State for one HTTP/2 stream
#[derive(Debug)]
pub struct Stream {
    pub(crate) id: StreamId,
    pub(crate) flags: u8,
    pub(crate) code: u32,
    pub(crate) prev_local_window_size: i32,
    pub(crate) headers_category: HeadersCategory,
    pub(crate) current_headers: HeaderList,
    pub(crate) data_chunks: Vec<DataChunk>,
    pub(crate) write_queue: VecDeque<WriteRequest>,
    /// Buffer index within the head write request
    queue_head_index: usize,
    /// Byte offset within that buffer
    queue_head_offset: usize,
}

impl Default for Stream {
    fn default() -> Self {
        Self {
            id: 0,
            flags: stream_flags::NONE,
            code: crate::frame::error_code::NO_ERROR,
            prev_local_window_size: DEFAULT_INITIAL_WINDOW_SIZE as i32,
            headers_category: HeadersCategory::default(),
            current_headers: Vec::new(),
            data_chunks: Vec::new(),
            write_queue: VecDeque::new(),
            queue_head_index: 0,
            queue_head_offset: 0,
        }
    }
}

impl Recycle for Stream {
    fn recycle(&mut self) {
        self.reset_state(0, HeadersCategory::default());
    }
}

impl Stream {
    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Close code recorded when the stream closed
    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn headers_category(&self) -> HeadersCategory {
        self.headers_category
    }

    /// Header fields accumulated for the frame currently being received
    pub fn headers(&self) -> &[HeaderField] {
        &self.current_headers
    }

    /// DATA chunks received but not yet delivered
    pub fn data_chunks(&self) -> &[DataChunk] {
        &self.data_chunks
    }

    /// Window size captured by the last `read_stop`
    pub fn prev_local_window_size(&self) -> i32 {
        self.prev_local_window_size
    }

    pub fn queued_writes(&self) -> usize {
        self.write_queue.len()
    }

    /// Bytes queued for writing that the engine has not pulled yet
    pub fn queued_bytes(&self) -> usize {
        let mut total: usize = self
            .write_queue
            .iter()
            .flat_map(|req| req.bufs.iter())
            .map(Bytes::len)
            .sum();
        if let Some(head) = self.write_queue.front() {
            let consumed: usize = head.bufs[..self.queue_head_index].iter().map(Bytes::len).sum();
            total -= consumed + self.queue_head_offset;
        }
        total
    }

    pub fn is_writable(&self) -> bool {
        self.flags & stream_flags::SHUT == 0
    }

    pub fn is_reading(&self) -> bool {
        self.flags & stream_flags::READ_START != 0 && self.flags & stream_flags::READ_PAUSED == 0
    }

    pub fn is_paused(&self) -> bool {
        self.flags & stream_flags::READ_START != 0 && self.flags & stream_flags::READ_PAUSED != 0
    }

    pub fn is_closed(&self) -> bool {
        self.flags & stream_flags::CLOSED != 0
    }

    pub fn is_destroying(&self) -> bool {
        self.flags & stream_flags::DESTROYING != 0
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags & stream_flags::DESTROYED != 0
    }

    pub(crate) fn reset_state(&mut self, id: StreamId, category: HeadersCategory) {
        self.id = id;
        self.flags = stream_flags::NONE;
        self.code = crate::frame::error_code::NO_ERROR;
        self.prev_local_window_size = DEFAULT_INITIAL_WINDOW_SIZE as i32;
        self.headers_category = category;
        self.current_headers.clear();
        self.data_chunks.clear();
        self.write_queue.clear();
        self.queue_head_index = 0;
        self.queue_head_offset = 0;
    }

    /// Begin a new header block, e.g. trailers after the initial headers.
    pub(crate) fn start_headers(&mut self, category: HeadersCategory) {
        self.current_headers.clear();
        self.headers_category = category;
    }

    pub(crate) fn close(&mut self, code: u32) {
        self.flags |= stream_flags::CLOSED;
        self.code = code;
    }

    pub(crate) fn shutdown(&mut self) {
        self.flags |= stream_flags::SHUT;
    }

    fn mark_read_started(&mut self) {
        self.flags |= stream_flags::READ_START;
        self.flags &= !stream_flags::READ_PAUSED;
    }

    pub(crate) fn enqueue_write(&mut self, bufs: Vec<Bytes>, completion: WriteCallback) {
        self.write_queue.push_back(WriteRequest::new(bufs, completion));
    }

    /// Drop every queued write, reporting each as cancelled. Returns how
    /// many were pending.
    pub(crate) fn cancel_writes(&mut self) -> usize {
        let pending = self.write_queue.len();
        self.write_queue.clear();
        self.queue_head_index = 0;
        self.queue_head_offset = 0;
        pending
    }

    /// Copy queued bytes into `buf`, advancing the cursor. Requests that are
    /// fully copied complete with success, in queue order. Returns the number
    /// of bytes written.
    pub(crate) fn drain_writes(&mut self, buf: &mut [u8]) -> usize {
        let mut offset = 0;
        while let Some(head) = self.write_queue.front() {
            while self.queue_head_index < head.bufs.len() {
                if offset == buf.len() {
                    return offset;
                }
                let src = &head.bufs[self.queue_head_index][self.queue_head_offset..];
                let n = src.len().min(buf.len() - offset);
                buf[offset..offset + n].copy_from_slice(&src[..n]);
                offset += n;
                if n < src.len() {
                    self.queue_head_offset += n;
                } else {
                    self.queue_head_index += 1;
                    self.queue_head_offset = 0;
                }
            }
            self.queue_head_index = 0;
            self.queue_head_offset = 0;
            if let Some(done) = self.write_queue.pop_front() {
                done.complete(Ok(()));
            }
        }
        offset
    }
}

/// Mutable access to one registered stream together with its session.
pub struct StreamHandle<'s, E: CodecEngine, H: SessionHandler, T: Transport> {
    pub(crate) session: &'s mut Session<E, H, T>,
    pub(crate) id: StreamId,
}

impl<'s, E: CodecEngine, H: SessionHandler, T: Transport> StreamHandle<'s, E, H, T> {
    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn stream(&self) -> Option<&Stream> {
        self.session.find_stream(self.id)
    }

    fn parts(&mut self) -> Result<(&mut E, &mut Stream)> {
        self.session.stream_parts(self.id)
    }

    /// Send informational (1xx) headers.
    pub fn submit_info(&mut self, headers: &[HeaderField]) -> Result<()> {
        let id = self.id;
        let (engine, _) = self.parts()?;
        engine.submit_headers(id, headers)?;
        Ok(())
    }

    /// Send the response headers. A data source is attached only when a
    /// payload is expected and the stream is still writable; with
    /// `empty_payload` the stream stops being writable right away.
    pub fn submit_response(&mut self, headers: &[HeaderField], empty_payload: bool) -> Result<()> {
        let id = self.id;
        let (engine, stream) = self.parts()?;
        let with_data = !empty_payload && stream.is_writable();
        engine.submit_response(id, headers, with_data)?;
        if !with_data {
            stream.shutdown();
        }
        tracing::trace!("stream {}: response submitted (with_data={})", id, with_data);
        Ok(())
    }

    /// Promise a pushed stream and register it. Returns the promised id.
    pub fn submit_push_promise(&mut self, headers: &[HeaderField], empty_payload: bool) -> Result<StreamId> {
        let id = self.id;
        let (engine, _) = self.parts()?;
        let promised = engine.submit_push_promise(id, headers)?;
        let child = self.session.state.init_stream(promised, HeadersCategory::PushPromise);
        if empty_payload {
            child.shutdown();
        }
        tracing::debug!("stream {}: promised stream {}", id, promised);
        Ok(promised)
    }

    /// Reset the stream. Output already pending is flushed first so the RST
    /// does not overtake it.
    pub fn submit_rst_stream(&mut self, code: u32) -> Result<()> {
        let id = self.id;
        self.parts()?;
        self.session.send_pending_data()?;
        let (engine, _) = self.parts()?;
        engine.submit_rst_stream(id, code)?;
        Ok(())
    }

    /// Reprioritize the stream. `silent` only updates the local tree.
    pub fn submit_priority(&mut self, spec: &PrioritySpec, silent: bool) -> Result<()> {
        let id = self.id;
        let (engine, _) = self.parts()?;
        if silent {
            engine.change_stream_priority(id, spec)?;
        } else {
            engine.submit_priority(id, spec)?;
        }
        Ok(())
    }

    /// Queue `bufs` for sending. `completion` fires once every byte has been
    /// pulled by the engine, or immediately with
    /// [`WriteError::EndOfStream`] if the stream is no longer writable or
    /// no longer registered.
    pub fn write<F>(&mut self, bufs: Vec<Bytes>, completion: F) -> Result<()>
    where
        F: FnOnce(std::result::Result<(), WriteError>) + 'static,
    {
        let id = self.id;
        let (engine, stream) = match self.parts() {
            Ok(parts) => parts,
            Err(err) => {
                tracing::trace!("stream {}: write rejected: {}", id, err);
                completion(Err(WriteError::EndOfStream));
                return Err(err);
            }
        };
        if !stream.is_writable() {
            tracing::trace!("stream {}: write rejected, not writable", id);
            completion(Err(WriteError::EndOfStream));
            return Ok(());
        }
        stream.enqueue_write(bufs, Box::new(completion));
        if let Err(err) = engine.resume_data(id) {
            tracing::trace!("stream {}: resume_data: {}", id, err);
        }
        Ok(())
    }

    /// Half-close the local side. Queued writes still drain; the engine
    /// reports end of stream once they have.
    pub fn shutdown(&mut self) -> Result<()> {
        let id = self.id;
        let (engine, stream) = self.parts()?;
        if !stream.is_writable() {
            return Ok(());
        }
        stream.shutdown();
        if let Err(err) = engine.resume_data(id) {
            tracing::trace!("stream {}: resume_data: {}", id, err);
        }
        Ok(())
    }

    /// Start or resume reading. If reading was paused, the receive window
    /// captured by [`read_stop`](Self::read_stop) is restored.
    pub fn read_start(&mut self) -> Result<()> {
        let id = self.id;
        let (engine, stream) = self.parts()?;
        if stream.is_paused() {
            engine.set_local_window_size(id, stream.prev_local_window_size)?;
        }
        stream.mark_read_started();
        Ok(())
    }

    /// Pause reading by shrinking the receive window to zero. No effect
    /// unless the stream is currently reading.
    pub fn read_stop(&mut self) -> Result<()> {
        let id = self.id;
        let (engine, stream) = self.parts()?;
        if !stream.is_reading() {
            return Ok(());
        }
        let current = engine.stream_local_window_size(id).filter(|size| *size >= 0);
        engine.set_local_window_size(id, 0)?;
        if let Some(size) = current {
            stream.prev_local_window_size = size;
        }
        stream.flags |= stream_flags::READ_PAUSED;
        Ok(())
    }

    /// Destroy the stream. See [`Session::destroy_stream`].
    pub fn destroy(self) -> bool {
        self.session.destroy_stream(self.id)
    }
}
