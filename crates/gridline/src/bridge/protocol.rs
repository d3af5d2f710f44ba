/// Shared frame buffer layout.
/// Must stay in sync with the host's reader.
///
/// Layout (all values f32 / 4 bytes):
/// ```text
/// [Header: 16 floats]
/// [Ribbon vertices: max_vertices × 5 floats]   x, y, u, v, alpha
/// [Ribbon indices: max_indices × 1 float]      triangle list, all pieces
/// [Events: max_events × 4 floats]              kind, line, a, b
/// [Heads: max_heads × 6 floats]                line, x, y, angle, flip, state
/// [Overlay: max_overlay_vertices × 6 floats]   x, y, r, g, b, a
/// ```
///
/// Capacities are written into the header once at init; the host derives
/// section offsets from them. Line ids are plain numbers no larger than
/// `LineId::MAX_PACKED`, so the host reads them exactly.

use crate::api::board::BoardConfig;

pub const HEADER_FLOATS: usize = 16;

pub const HEADER_LOCK: usize = 0;
pub const HEADER_FRAME_COUNTER: usize = 1;
pub const HEADER_PROTOCOL_VERSION: usize = 2;
pub const HEADER_MAX_VERTICES: usize = 3;
pub const HEADER_VERTEX_COUNT: usize = 4;
pub const HEADER_MAX_INDICES: usize = 5;
pub const HEADER_INDEX_COUNT: usize = 6;
pub const HEADER_MAX_EVENTS: usize = 7;
pub const HEADER_EVENT_COUNT: usize = 8;
pub const HEADER_MAX_HEADS: usize = 9;
pub const HEADER_HEAD_COUNT: usize = 10;
pub const HEADER_MAX_OVERLAY_VERTICES: usize = 11;
pub const HEADER_OVERLAY_VERTEX_COUNT: usize = 12;
pub const HEADER_ACTIVE_LINES: usize = 13;
pub const HEADER_ERASE_MODE: usize = 14;
pub const HEADER_ACCEPTING_INPUT: usize = 15;

pub const PROTOCOL_VERSION: f32 = 1.0;

/// Floats per ribbon vertex (matches `RibbonVertex`).
pub const VERTEX_FLOATS: usize = 5;
/// Floats per event (matches `LineEvent`).
pub const EVENT_FLOATS: usize = 4;
/// Floats per head record.
pub const HEAD_FLOATS: usize = 6;
/// Floats per overlay vertex (matches `OverlayVertex`).
pub const OVERLAY_VERTEX_FLOATS: usize = 6;

/// Section sizes and offsets for a given set of capacities.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolLayout {
    pub max_vertices: usize,
    pub max_indices: usize,
    pub max_events: usize,
    pub max_heads: usize,
    pub max_overlay_vertices: usize,

    pub vertex_data_offset: usize,
    pub index_data_offset: usize,
    pub event_data_offset: usize,
    pub head_data_offset: usize,
    pub overlay_data_offset: usize,

    pub buffer_total_floats: usize,
    pub buffer_total_bytes: usize,
}

impl ProtocolLayout {
    pub fn new(
        max_vertices: usize,
        max_indices: usize,
        max_events: usize,
        max_heads: usize,
        max_overlay_vertices: usize,
    ) -> Self {
        let vertex_data_offset = HEADER_FLOATS;
        let index_data_offset = vertex_data_offset + max_vertices * VERTEX_FLOATS;
        let event_data_offset = index_data_offset + max_indices;
        let head_data_offset = event_data_offset + max_events * EVENT_FLOATS;
        let overlay_data_offset = head_data_offset + max_heads * HEAD_FLOATS;
        let buffer_total_floats = overlay_data_offset + max_overlay_vertices * OVERLAY_VERTEX_FLOATS;

        Self {
            max_vertices,
            max_indices,
            max_events,
            max_heads,
            max_overlay_vertices,
            vertex_data_offset,
            index_data_offset,
            event_data_offset,
            head_data_offset,
            overlay_data_offset,
            buffer_total_floats,
            buffer_total_bytes: buffer_total_floats * 4,
        }
    }

    pub fn from_config(config: &BoardConfig) -> Self {
        Self::new(
            config.max_vertices,
            config.max_indices,
            config.max_events,
            config.max_heads,
            config.max_overlay_vertices,
        )
    }

    /// A zeroed buffer with the capacities written into the header.
    pub fn allocate(&self) -> Vec<f32> {
        let mut buf = vec![0.0; self.buffer_total_floats];
        buf[HEADER_PROTOCOL_VERSION] = PROTOCOL_VERSION;
        buf[HEADER_MAX_VERTICES] = self.max_vertices as f32;
        buf[HEADER_MAX_INDICES] = self.max_indices as f32;
        buf[HEADER_MAX_EVENTS] = self.max_events as f32;
        buf[HEADER_MAX_HEADS] = self.max_heads as f32;
        buf[HEADER_MAX_OVERLAY_VERTICES] = self.max_overlay_vertices as f32;
        buf
    }
}
