use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Unique identifier for a line piece on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(pub u32);

impl LineId {
    /// Ids reach the host in `f32` slots, which hold every integer up to
    /// 2^24 exactly. The arena never hands out a larger id.
    pub const MAX_PACKED: u32 = 1 << 24;

    /// The id as written into the shared frame buffer.
    pub fn packed(self) -> f32 {
        debug_assert!(self.0 <= Self::MAX_PACKED);
        self.0 as f32
    }

    pub fn from_packed(v: f32) -> Self {
        Self(v as u32)
    }
}

/// Opaque identity of a published collision shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderId(pub u32);

/// Integer cell address on the puzzle grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<[i32; 2]> for GridCoord {
    fn from(v: [i32; 2]) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

impl From<(i32, i32)> for GridCoord {
    fn from(v: (i32, i32)) -> Self {
        Self { x: v.0, y: v.1 }
    }
}

/// Bitmask of collision layers. A shape is visible to a query when the
/// shape's layers intersect the query mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);
    /// Layer line hulls are published on by default.
    pub const LINES: Self = Self(1);
    /// Layer for static blockers (walls, locked cells).
    pub const OBSTACLES: Self = Self(1 << 1);

    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: LayerMask) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::LINES
    }
}

/// A line lifecycle event handed to the host as a flat record.
/// `kind` is one of the `LineEvent::*` constants and `line` the packed
/// piece id. `a` carries the moving offset for `BLOCKED`; `b` is reserved
/// and always 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct LineEvent {
    pub kind: f32,
    pub line: f32,
    pub a: f32,
    pub b: f32,
}

impl LineEvent {
    pub const FLOATS: usize = 4;

    pub const REGISTERED: f32 = 1.0;
    pub const UNREGISTERED: f32 = 2.0;
    pub const BLOCKED: f32 = 3.0;
    pub const STARTED: f32 = 4.0;

    pub fn new(kind: f32, line: LineId) -> Self {
        Self {
            kind,
            line: line.packed(),
            a: 0.0,
            b: 0.0,
        }
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.a = offset;
        self
    }

    pub fn line_id(&self) -> LineId {
        LineId::from_packed(self.line)
    }
}
