//! Arc-length parameterisation of a baked centerline.
//!
//! The table stores cumulative distance per point so position and heading
//! lookups by distance are a binary search plus one lerp. Distances past the
//! end continue along the last segment, which is what lets a ribbon slide off
//! its own path when it exits.

use glam::Vec2;

use crate::geometry::vec2::{closest_point_on_segment, lerp, lerp_f32, safe_normalize};

const MIN_SEGMENT: f32 = 1e-4;

#[derive(Debug, Clone, Default)]
pub struct ArcLengthTable {
    points: Vec<Vec2>,
    cumulative: Vec<f32>,
}

impl ArcLengthTable {
    pub fn new(points: &[Vec2]) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut acc = 0.0;
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                acc += (*p - points[i - 1]).length();
            }
            cumulative.push(acc);
        }
        Self {
            points: points.to_vec(),
            cumulative,
        }
    }

    /// Total length of the centerline.
    pub fn total(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn cumulative(&self) -> &[f32] {
        &self.cumulative
    }

    /// Index `hi` of the segment `(hi - 1, hi)` bracketing `dist`.
    /// Requires `0 < dist < total` and at least two points.
    fn bracket(&self, dist: f32) -> usize {
        let hi = self.cumulative.partition_point(|&c| c < dist);
        hi.clamp(1, self.cumulative.len() - 1)
    }

    fn last_direction(&self) -> Vec2 {
        let n = self.points.len();
        if n < 2 {
            return Vec2::X;
        }
        safe_normalize(self.points[n - 1] - self.points[n - 2], Vec2::X)
    }

    /// Point at arc length `dist`. Before the start this is the first point;
    /// past the end it extrapolates along the final segment.
    pub fn point_at(&self, dist: f32) -> Vec2 {
        let Some(&first) = self.points.first() else {
            return Vec2::ZERO;
        };
        if dist <= 0.0 || self.points.len() < 2 {
            return first;
        }
        let total = self.total();
        if dist >= total {
            let last = self.points[self.points.len() - 1];
            if total <= MIN_SEGMENT {
                return first;
            }
            return last + self.last_direction() * (dist - total);
        }
        let hi = self.bracket(dist);
        let lo = hi - 1;
        let seg = (self.cumulative[hi] - self.cumulative[lo]).max(MIN_SEGMENT);
        let t = ((dist - self.cumulative[lo]) / seg).clamp(0.0, 1.0);
        lerp(self.points[lo], self.points[hi], t)
    }

    /// Point at arc length, clamped to the baked span (no extrapolation).
    pub fn point_at_clamped(&self, dist: f32) -> Vec2 {
        self.point_at(dist.min(self.total()))
    }

    fn segment_direction(&self, dist: f32, fallback: Vec2) -> Vec2 {
        let n = self.points.len();
        if n < 2 {
            return fallback;
        }
        let total = self.total();
        let hi = if dist <= 0.0 {
            1
        } else if dist >= total {
            n - 1
        } else {
            self.bracket(dist)
        };
        safe_normalize(self.points[hi] - self.points[hi - 1], fallback)
    }

    /// Heading of the bracketing segment, clamped to the baked span.
    /// Used for rendering; degenerate input yields +X.
    pub fn tangent_at(&self, dist: f32) -> Vec2 {
        self.segment_direction(dist.clamp(0.0, self.total()), Vec2::X)
    }

    /// Heading at any distance, continuing the final segment's direction
    /// indefinitely past the end. Used by motion queries; degenerate input
    /// yields +Y.
    pub fn tangent_at_extended(&self, dist: f32) -> Vec2 {
        self.segment_direction(dist, Vec2::Y)
    }

    /// Arc length of the point on the centerline closest to `p`.
    pub fn project(&self, p: Vec2) -> f32 {
        let mut best_s = 0.0;
        let mut best_d2 = f32::MAX;
        for i in 0..self.points.len().saturating_sub(1) {
            let a = self.points[i];
            let b = self.points[i + 1];
            if (b - a).length_squared() < 1e-10 {
                continue;
            }
            let (q, t) = closest_point_on_segment(p, a, b);
            let d2 = (p - q).length_squared();
            if d2 < best_d2 {
                best_d2 = d2;
                best_s = lerp_f32(self.cumulative[i], self.cumulative[i + 1], t);
            }
        }
        best_s
    }
}
