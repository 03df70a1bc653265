//! HTTP/2 frame metadata as reported by the codec engine.
//!
//! The multiplexing layer never parses wire bytes itself. The engine hands it
//! a [`Frame`] describing the frame it is processing, and the session only
//! looks at the type, flags, stream ids and the few payload fields it needs
//! for dispatch (header category, promised stream, priority).
//!
//! Reference: RFC 7540 (HTTP/2)

/// Signed stream identifier as used by the codec engine.
pub type StreamId = i32;

/// HTTP/2 frame types (RFC 7540 Section 6)
#[allow(dead_code)]
pub mod frame_type {
    pub const DATA: u8 = 0x0;
    pub const HEADERS: u8 = 0x1;
    pub const PRIORITY: u8 = 0x2;
    pub const RST_STREAM: u8 = 0x3;
    pub const SETTINGS: u8 = 0x4;
    pub const PUSH_PROMISE: u8 = 0x5;
    pub const PING: u8 = 0x6;
    pub const GOAWAY: u8 = 0x7;
    pub const WINDOW_UPDATE: u8 = 0x8;
    pub const CONTINUATION: u8 = 0x9;
}

/// HTTP/2 frame flags
#[allow(dead_code)]
pub mod flags {
    pub const NONE: u8 = 0x0;
    pub const END_STREAM: u8 = 0x1;
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

/// HTTP/2 error codes (RFC 7540 Section 7)
#[allow(dead_code)]
pub mod error_code {
    pub const NO_ERROR: u32 = 0x0;
    pub const PROTOCOL_ERROR: u32 = 0x1;
    pub const INTERNAL_ERROR: u32 = 0x2;
    pub const FLOW_CONTROL_ERROR: u32 = 0x3;
    pub const SETTINGS_TIMEOUT: u32 = 0x4;
    pub const STREAM_CLOSED: u32 = 0x5;
    pub const FRAME_SIZE_ERROR: u32 = 0x6;
    pub const REFUSED_STREAM: u32 = 0x7;
    pub const CANCEL: u32 = 0x8;
    pub const COMPRESSION_ERROR: u32 = 0x9;
    pub const CONNECT_ERROR: u32 = 0xa;
    pub const ENHANCE_YOUR_CALM: u32 = 0xb;
    pub const INADEQUATE_SECURITY: u32 = 0xc;
    pub const HTTP_1_1_REQUIRED: u32 = 0xd;
}

/// Priority weight bounds (RFC 7540 Section 5.3.2)
pub const DEFAULT_WEIGHT: i32 = 16;
pub const MIN_WEIGHT: i32 = 1;
pub const MAX_WEIGHT: i32 = 256;

/// Category of the header block a stream is currently accumulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadersCategory {
    /// Initial headers of a request
    #[default]
    Request,
    /// Initial headers of a response (or a pushed response)
    Response,
    /// Request headers carried in a PUSH_PROMISE
    PushPromise,
    /// Any header block after the initial one
    Trailers,
}

/// Stream dependency and weight (RFC 7540 Section 5.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioritySpec {
    /// Stream this one depends on (0 for the root)
    pub stream_id: StreamId,
    pub weight: i32,
    pub exclusive: bool,
}

impl PrioritySpec {
    /// Build a priority spec, clamping the weight into `[1, 256]`.
    /// A negative weight selects the default of 16.
    pub fn new(parent: StreamId, weight: i32, exclusive: bool) -> Self {
        let weight = if weight < 0 { DEFAULT_WEIGHT } else { weight };
        Self {
            stream_id: parent,
            weight: weight.clamp(MIN_WEIGHT, MAX_WEIGHT),
            exclusive,
        }
    }
}

impl Default for PrioritySpec {
    fn default() -> Self {
        Self::new(0, DEFAULT_WEIGHT, false)
    }
}

/// The common 9-byte frame header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: usize,
    pub frame_type: u8,
    pub flags: u8,
    pub stream_id: StreamId,
}

impl FrameHeader {
    pub fn new(frame_type: u8, flags: u8, stream_id: StreamId, length: usize) -> Self {
        Self {
            length,
            frame_type,
            flags,
            stream_id,
        }
    }

    /// Check if END_STREAM flag is set
    pub fn is_end_stream(&self) -> bool {
        self.frame_type != frame_type::SETTINGS
            && self.frame_type != frame_type::PING
            && self.flags & flags::END_STREAM != 0
    }

    /// Check if the ACK flag is set on a SETTINGS or PING frame
    pub fn is_ack(&self) -> bool {
        (self.frame_type == frame_type::SETTINGS || self.frame_type == frame_type::PING)
            && self.flags & flags::ACK != 0
    }
}

/// Frame-type specific fields the session needs for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    Data,
    Headers { category: HeadersCategory },
    PushPromise { promised_stream_id: StreamId },
    Priority(PrioritySpec),
    Settings,
    Other,
}

/// A frame being received or emitted by the codec engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub kind: FrameKind,
}

impl Frame {
    pub fn data(stream_id: StreamId, flags: u8, length: usize) -> Self {
        Self {
            header: FrameHeader::new(frame_type::DATA, flags, stream_id, length),
            kind: FrameKind::Data,
        }
    }

    pub fn headers(stream_id: StreamId, flags: u8, category: HeadersCategory) -> Self {
        Self {
            header: FrameHeader::new(frame_type::HEADERS, flags, stream_id, 0),
            kind: FrameKind::Headers { category },
        }
    }

    pub fn push_promise(stream_id: StreamId, flags: u8, promised_stream_id: StreamId) -> Self {
        Self {
            header: FrameHeader::new(frame_type::PUSH_PROMISE, flags, stream_id, 0),
            kind: FrameKind::PushPromise { promised_stream_id },
        }
    }

    pub fn priority(stream_id: StreamId, spec: PrioritySpec) -> Self {
        Self {
            header: FrameHeader::new(frame_type::PRIORITY, flags::NONE, stream_id, 5),
            kind: FrameKind::Priority(spec),
        }
    }

    pub fn settings(flags: u8, length: usize) -> Self {
        Self {
            header: FrameHeader::new(frame_type::SETTINGS, flags, 0, length),
            kind: FrameKind::Settings,
        }
    }

    pub fn other(frame_type: u8, flags: u8, stream_id: StreamId, length: usize) -> Self {
        Self {
            header: FrameHeader::new(frame_type, flags, stream_id, length),
            kind: FrameKind::Other,
        }
    }

    /// Stream a header block belongs to: the promised stream for
    /// PUSH_PROMISE, the frame's own stream otherwise.
    pub fn header_target(&self) -> StreamId {
        match self.kind {
            FrameKind::PushPromise { promised_stream_id } => promised_stream_id,
            _ => self.header.stream_id,
        }
    }

    /// Header category carried by a HEADERS or PUSH_PROMISE frame
    pub fn headers_category(&self) -> Option<HeadersCategory> {
        match self.kind {
            FrameKind::Headers { category } => Some(category),
            FrameKind::PushPromise { .. } => Some(HeadersCategory::PushPromise),
            _ => None,
        }
    }
}
