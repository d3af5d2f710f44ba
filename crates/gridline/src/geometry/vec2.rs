//! Scalar and 2D vector helpers shared by the path and ribbon builders.
//!
//! Everything here is total: degenerate input (zero-length vectors, empty
//! ranges) falls back to a caller-chosen value instead of producing NaN.

use glam::Vec2;

/// Length below which a vector or segment is treated as degenerate.
pub const EPSILON: f32 = 1e-6;

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    (b - a).length()
}

/// 2D cross product (z component of the 3D cross product).
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Counter-clockwise perpendicular: `(-y, x)`.
#[inline]
pub fn perp(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Normalize `v`, or return `fallback` when `v` is too short to have a direction.
#[inline]
pub fn safe_normalize(v: Vec2, fallback: Vec2) -> Vec2 {
    let len = v.length();
    if len < EPSILON {
        fallback
    } else {
        v / len
    }
}

#[inline]
pub fn lerp(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}

#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Where `v` sits between `a` and `b`, clamped to `[0, 1]`.
/// Returns 0 when the range is empty.
pub fn inverse_lerp(a: f32, b: f32, v: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        0.0
    } else {
        clamp01((v - a) / (b - a))
    }
}

/// Quadratic Bézier through control point `b`.
#[inline]
pub fn quad_bezier(a: Vec2, b: Vec2, c: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    a * (u * u) + b * (2.0 * u * t) + c * (t * t)
}

/// Move `current` toward `target` by at most `max_delta`, never overshooting.
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let diff = target - current;
    if diff.abs() <= max_delta {
        target
    } else {
        current + diff.signum() * max_delta
    }
}

/// Closest point to `p` on segment `ab`, with its segment parameter in `[0, 1]`.
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> (Vec2, f32) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-10 {
        return (a, 0.0);
    }
    let t = clamp01((p - a).dot(ab) / len_sq);
    (a + ab * t, t)
}
