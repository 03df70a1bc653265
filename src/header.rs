//! Header fields exchanged with the codec engine and the host.
//!
//! Names and values are `Bytes`, so handing a field to the host or keeping
//! it in a stream's accumulation list only bumps a reference count.

use bytes::Bytes;

/// A decoded HTTP/2 header field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderField {
    pub name: Bytes,
    pub value: Bytes,
}

impl HeaderField {
    pub fn new(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Name as text, replacing invalid UTF-8
    pub fn name_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Value as text, replacing invalid UTF-8
    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }

    /// Pseudo-header fields (`:method`, `:status`, ...) start with a colon
    pub fn is_pseudo(&self) -> bool {
        self.name.first() == Some(&b':')
    }
}

/// Ordered header sequence for one header block.
pub type HeaderList = Vec<HeaderField>;
