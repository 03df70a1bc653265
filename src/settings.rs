//! SETTINGS payload construction.

/// HTTP/2 SETTINGS identifiers (RFC 7540 Section 6.5.2)
#[allow(dead_code)]
pub mod settings_id {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4096;
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65535;
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16384;
pub const MIN_MAX_FRAME_SIZE: u32 = DEFAULT_MAX_FRAME_SIZE;
pub const MAX_MAX_FRAME_SIZE: u32 = 16_777_215;
pub const MAX_INITIAL_WINDOW_SIZE: u32 = 2_147_483_647;

/// One (identifier, value) pair of a SETTINGS frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsEntry {
    pub id: u16,
    pub value: u32,
}

impl SettingsEntry {
    pub fn new(id: u16, value: u32) -> Self {
        Self { id, value }
    }
}

/// Settings to announce to the peer. Unset fields are left out of the frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub header_table_size: Option<u32>,
    pub enable_push: Option<bool>,
    pub max_concurrent_streams: Option<u32>,
    pub initial_window_size: Option<u32>,
    pub max_frame_size: Option<u32>,
    pub max_header_list_size: Option<u32>,
}

impl Settings {
    /// The protocol defaults, spelled out explicitly.
    pub fn defaults() -> Self {
        Self {
            header_table_size: Some(DEFAULT_HEADER_TABLE_SIZE),
            enable_push: Some(true),
            initial_window_size: Some(DEFAULT_INITIAL_WINDOW_SIZE),
            max_frame_size: Some(DEFAULT_MAX_FRAME_SIZE),
            ..Self::default()
        }
    }

    /// Entries in identifier order, with out-of-range values clamped:
    /// the initial window to 2^31-1 and the max frame size to
    /// [16384, 16777215].
    pub fn entries(&self) -> Vec<SettingsEntry> {
        let mut entries = Vec::with_capacity(6);
        if let Some(v) = self.header_table_size {
            entries.push(SettingsEntry::new(settings_id::HEADER_TABLE_SIZE, v));
        }
        if let Some(v) = self.enable_push {
            entries.push(SettingsEntry::new(settings_id::ENABLE_PUSH, v as u32));
        }
        if let Some(v) = self.max_concurrent_streams {
            entries.push(SettingsEntry::new(settings_id::MAX_CONCURRENT_STREAMS, v));
        }
        if let Some(v) = self.initial_window_size {
            entries.push(SettingsEntry::new(
                settings_id::INITIAL_WINDOW_SIZE,
                v.min(MAX_INITIAL_WINDOW_SIZE),
            ));
        }
        if let Some(v) = self.max_frame_size {
            entries.push(SettingsEntry::new(
                settings_id::MAX_FRAME_SIZE,
                v.clamp(MIN_MAX_FRAME_SIZE, MAX_MAX_FRAME_SIZE),
            ));
        }
        if let Some(v) = self.max_header_list_size {
            entries.push(SettingsEntry::new(settings_id::MAX_HEADER_LIST_SIZE, v));
        }
        entries
    }
}
