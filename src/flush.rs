//! Outbound flush: moves serialized bytes from the engine to the transport.

use crate::engine::{CodecEngine, EngineCallbacks};
use crate::error::{Result, SessionError};
use crate::host::{EventLoop, TickId, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushState {
    /// Registered with the event loop, flushing once per tick
    Active(TickId),
    /// Tick closed, waiting for the loop's close notification
    Closing,
    Closed,
}

/// Per-tick flush registration of one session.
#[derive(Debug)]
pub(crate) struct FlushDriver {
    state: FlushState,
}

impl FlushDriver {
    pub(crate) fn start(event_loop: &mut dyn EventLoop) -> Self {
        Self {
            state: FlushState::Active(event_loop.start_tick()),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        matches!(self.state, FlushState::Active(_))
    }

    /// Close the tick. Returns false if it was not active.
    pub(crate) fn stop(&mut self, event_loop: &mut dyn EventLoop) -> bool {
        match self.state {
            FlushState::Active(id) => {
                event_loop.close_tick(id);
                self.state = FlushState::Closing;
                true
            }
            _ => false,
        }
    }

    /// Acknowledge the loop's close notification. Returns true exactly once.
    pub(crate) fn finish(&mut self) -> bool {
        if self.state == FlushState::Closing {
            self.state = FlushState::Closed;
            true
        } else {
            false
        }
    }
}

/// Pull everything the engine has to send and hand it to the transport in
/// segments of at most one send buffer each.
///
/// A single pull larger than the space left in the current buffer is split
/// across buffers. The last, partially filled buffer is always sent, even
/// when empty. Returns the number of bytes forwarded.
pub(crate) fn send_pending_data<E: CodecEngine, T: Transport>(
    engine: &mut E,
    callbacks: &mut dyn EngineCallbacks,
    transport: &mut T,
    buffer_size: usize,
) -> Result<usize> {
    let mut current = transport.allocate_send_buffer(buffer_size);
    let mut limit = current.capacity();
    if limit == 0 {
        return Err(SessionError::EmptySendBuffer);
    }
    let mut total = 0;

    loop {
        let mut data = engine.mem_send(callbacks)?;
        if data.is_empty() {
            break;
        }
        while !data.is_empty() {
            let remaining = limit - current.len();
            if data.len() <= remaining {
                current.extend_from_slice(data);
                total += data.len();
                break;
            }
            // Fill what fits, tear the buffer off and keep going.
            current.extend_from_slice(&data[..remaining]);
            total += remaining;
            data = &data[remaining..];
            transport.send(current);
            current = transport.allocate_send_buffer(buffer_size);
            limit = current.capacity();
            if limit == 0 {
                return Err(SessionError::EmptySendBuffer);
            }
        }
    }

    tracing::trace!("flushed {} bytes", total);
    transport.send(current);
    Ok(total)
}
