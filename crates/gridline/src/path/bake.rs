use glam::Vec2;

use super::arc_length::ArcLengthTable;
use super::corners::{CornerIndex, STRAIGHT_DOT};
use super::grid::CellMapper;
use crate::api::types::GridCoord;
use crate::geometry::vec2::quad_bezier;

/// Consecutive points closer than this are merged.
pub const DEDUP_EPSILON: f32 = 1e-6;
/// Largest corner radius, as a fraction of a cell.
pub const MAX_CORNER_RADIUS: f32 = 0.49;
/// Longest path, in cell steps, a bake will expand.
pub const MAX_PATH_CELLS: u64 = 1 << 16;

/// Output of a bake: the rounded centerline with its lookup tables.
#[derive(Debug, Clone)]
pub struct BakedPath {
    /// Turn cells the path was baked from.
    pub turns: Vec<GridCoord>,
    /// Every cell the path visits, in order.
    pub cells: Vec<GridCoord>,
    pub table: ArcLengthTable,
    pub corners: CornerIndex,
}

impl BakedPath {
    pub fn centerline(&self) -> &[Vec2] {
        self.table.points()
    }

    pub fn total_length(&self) -> f32 {
        self.table.total()
    }
}

/// Turns a sparse list of grid turn points into a rounded world-space centerline.
#[derive(Debug, Clone, Copy)]
pub struct PathBaker {
    /// Corner radius as a fraction of the cell size.
    corner_radius: f32,
    corner_segments: u32,
}

impl PathBaker {
    pub fn new(corner_radius: f32, corner_segments: u32) -> Self {
        Self {
            corner_radius: corner_radius.clamp(0.0, MAX_CORNER_RADIUS),
            corner_segments: corner_segments.max(2),
        }
    }

    pub fn corner_radius(&self) -> f32 {
        self.corner_radius
    }

    pub fn corner_segments(&self) -> u32 {
        self.corner_segments
    }

    /// Bake a path. Returns `None` when the turns do not describe at least
    /// two distinct points; such a piece stays inert.
    pub fn bake(&self, turns: &[GridCoord], grid: &dyn CellMapper) -> Option<BakedPath> {
        if turns.len() < 2 {
            log::warn!("path bake skipped: {} turn point(s)", turns.len());
            return None;
        }

        let Some(cells) = expand_cells(turns) else {
            log::warn!("path bake skipped: turns span more than {} cells", MAX_PATH_CELLS);
            return None;
        };
        let mut raw: Vec<Vec2> = cells.iter().map(|c| grid.cell_to_world(*c)).collect();
        dedup_points(&mut raw, DEDUP_EPSILON);
        if raw.len() < 2 {
            log::warn!("path bake skipped: turns collapse to a single point");
            return None;
        }

        let radius = self.corner_radius * grid.cell_size();
        let mut smoothed = round_corners(&raw, radius, self.corner_segments);
        dedup_points(&mut smoothed, DEDUP_EPSILON);
        if smoothed.len() < 2 {
            return None;
        }

        let table = ArcLengthTable::new(&smoothed);
        let corners = CornerIndex::build(&raw, &table);
        log::debug!(
            "baked path: {} cells, {} points, {} corners, length {:.3}",
            cells.len(),
            smoothed.len(),
            corners.len(),
            table.total()
        );

        Some(BakedPath {
            turns: turns.to_vec(),
            cells,
            table,
            corners,
        })
    }
}

impl Default for PathBaker {
    fn default() -> Self {
        Self::new(0.35, 10)
    }
}

/// Cell steps between two turns along the x-then-y route.
fn span(a: GridCoord, b: GridCoord) -> u64 {
    (i64::from(b.x) - i64::from(a.x)).unsigned_abs() + (i64::from(b.y) - i64::from(a.y)).unsigned_abs()
}

/// Insert every intermediate cell between consecutive turns, stepping the
/// x axis first and then y. `None` when the route is longer than
/// `MAX_PATH_CELLS`.
pub fn expand_cells(turns: &[GridCoord]) -> Option<Vec<GridCoord>> {
    let total = turns
        .windows(2)
        .fold(0u64, |acc, pair| acc.saturating_add(span(pair[0], pair[1])));
    if total > MAX_PATH_CELLS {
        return None;
    }

    let mut out = Vec::with_capacity(total as usize + 1);
    let Some(&first) = turns.first() else {
        return Some(out);
    };
    out.push(first);

    for pair in turns.windows(2) {
        let mut a = pair[0];
        let b = pair[1];
        let sx = b.x.cmp(&a.x) as i32;
        let sy = b.y.cmp(&a.y) as i32;
        while a != b {
            if a.x != b.x {
                a.x += sx;
            } else {
                a.y += sy;
            }
            if out.last() != Some(&a) {
                out.push(a);
            }
        }
    }
    Some(out)
}

/// Drop points that coincide (within `eps`) with their predecessor.
pub fn dedup_points(points: &mut Vec<Vec2>, eps: f32) {
    let eps_sq = eps * eps;
    points.dedup_by(|p, prev| (*p - *prev).length_squared() <= eps_sq);
}

/// Replace each interior turn with a quadratic Bézier arc trimmed back by
/// `radius` (at most 45% of either adjoining segment).
pub fn round_corners(raw: &[Vec2], radius: f32, segments: u32) -> Vec<Vec2> {
    let n = raw.len();
    let mut out = Vec::with_capacity(n * 3);
    let Some(&first) = raw.first() else {
        return out;
    };
    out.push(first);
    if n < 2 {
        return out;
    }

    for i in 1..n - 1 {
        let (a, b, c) = (raw[i - 1], raw[i], raw[i + 1]);
        let len1 = (b - a).length();
        let len2 = (c - b).length();
        if len1 < 1e-6 || len2 < 1e-6 {
            out.push(b);
            continue;
        }
        let d1 = (b - a) / len1;
        let d2 = (c - b) / len2;
        if d1.dot(d2) > STRAIGHT_DOT {
            out.push(b);
            continue;
        }

        let t = radius.min(0.45 * len1.min(len2));
        let p = b - d1 * t;
        let q = b + d2 * t;
        if out.last().map_or(true, |last| (*last - p).length_squared() > 1e-10) {
            out.push(p);
        }
        for s in 1..=segments {
            let u = s as f32 / segments as f32;
            out.push(quad_bezier(p, b, q, u));
        }
    }

    out.push(raw[n - 1]);
    out
}
