//! Session configuration.

use crate::pool::FREELIST_MAX;

/// Send buffer size requested from the transport for each flush segment.
pub const SEND_BUFFER_RECOMMENDED_SIZE: usize = 4096;

/// How frame padding is chosen for outgoing DATA and HEADERS frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingStrategy {
    /// The engine pads nothing and the padding callback is not installed.
    #[default]
    None,
    /// Ask [`SessionHandler::get_padding`](crate::SessionHandler::get_padding)
    /// for every frame.
    Callback,
}

/// Tunables for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub padding: PaddingStrategy,
    /// Size of each buffer requested from the transport during a flush.
    pub send_buffer_size: usize,
    /// Maximum number of recycled objects each pool retains.
    pub pool_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            padding: PaddingStrategy::None,
            send_buffer_size: SEND_BUFFER_RECOMMENDED_SIZE,
            pool_capacity: FREELIST_MAX,
        }
    }
}

impl SessionConfig {
    pub fn with_padding(mut self, padding: PaddingStrategy) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_send_buffer_size(mut self, size: usize) -> Self {
        self.send_buffer_size = size;
        self
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }
}
