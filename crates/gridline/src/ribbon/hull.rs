use glam::Vec2;

use super::frames::Frame;
use super::mesh::{cap_arc, CapParams};
use crate::geometry::aabb::Aabb;
use crate::geometry::vec2::cross;

/// Closed outline of a ribbon: cap arc, left edge forward, right edge back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionHull {
    points: Vec<Vec2>,
    cap_points: usize,
    edge_points: usize,
}

impl CollisionHull {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// An empty hull makes the piece non-interactive.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.cap_points = 0;
        self.edge_points = 0;
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.points)
    }

    /// Left edge points, tail to head.
    pub fn left_edge(&self) -> &[Vec2] {
        &self.points[self.cap_points..self.cap_points + self.edge_points]
    }

    /// Right edge points, head to tail.
    pub fn right_edge(&self) -> &[Vec2] {
        &self.points[self.cap_points + self.edge_points..]
    }

    /// Triangles covering the hull area, following the ribbon structure
    /// (cap fan, then one quad per edge step). Sliver triangles are dropped.
    pub fn triangles(&self) -> Vec<[Vec2; 3]> {
        let mut out = Vec::new();
        let left = self.left_edge();
        let right = self.right_edge();
        let m = left.len();
        if m == 0 || right.len() != m {
            return out;
        }
        let r = |j: usize| right[m - 1 - j];
        let cap = &self.points[..self.cap_points];

        let mut push = |a: Vec2, b: Vec2, c: Vec2| {
            if cross(b - a, c - a).abs() > 1e-9 {
                out.push([a, b, c]);
            }
        };
        for s in 1..cap.len().saturating_sub(1) {
            push(cap[0], cap[s], cap[s + 1]);
        }

        if let (Some(&first), Some(&last)) = (cap.first(), cap.last()) {
            push(last, left[0], r(0));
            push(last, r(0), first);
        }
        for j in 0..m - 1 {
            push(left[j], left[j + 1], r(j + 1));
            push(left[j], r(j + 1), r(j));
        }
        out
    }
}

/// Derives the collision outline from the same centerline and frames the
/// ribbon mesh is built from, so the hull matches what is drawn.
#[derive(Debug, Clone, Copy)]
pub struct CollisionHullBuilder {
    half_width: f32,
    cap: CapParams,
}

impl CollisionHullBuilder {
    pub fn new(width: f32) -> Self {
        Self {
            half_width: (width * 0.5).max(0.001),
            cap: CapParams::default(),
        }
    }

    pub fn with_cap(mut self, cap: CapParams) -> Self {
        self.cap = cap;
        self
    }

    pub fn build(&self, points: &[Vec2], frames: &[Frame], hull: &mut CollisionHull) {
        hull.clear();
        let n = points.len();
        if n < 2 || frames.len() != n {
            return;
        }

        let cap_segments = self.cap.effective_segments();
        // The cap arc already closes the tail, so both edges start one
        // sample in when it is present.
        let skip = if cap_segments > 0 { 1 } else { 0 };
        let cap_count = if cap_segments > 0 { cap_segments as usize + 1 } else { 0 };
        let edge = n - skip;
        if cap_count + edge * 2 < 3 {
            return;
        }

        hull.points.reserve(cap_count + edge * 2);
        if cap_segments > 0 {
            let radius = self.cap.radius(self.half_width);
            hull.points.extend(cap_arc(points[0], frames[0], radius, cap_segments));
        }
        for i in skip..n {
            hull.points.push(points[i] - frames[i].normal * self.half_width);
        }
        for i in (skip..n).rev() {
            hull.points.push(points[i] + frames[i].normal * self.half_width);
        }
        hull.cap_points = cap_count;
        hull.edge_points = edge;
    }
}
