use glam::Vec2;

use crate::geometry::vec2::{perp, safe_normalize};

/// Tangent and side normal at one centerline sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tangent: Vec2,
    pub normal: Vec2,
}

/// Central-difference frames over a polyline, written into `out`.
///
/// Each normal is the tangent's perpendicular with its sign chosen to agree
/// with the previous sample's normal (the first is compared against +Y), so
/// the ribbon's sides never swap along its length.
pub fn compute_frames(points: &[Vec2], out: &mut Vec<Frame>) {
    out.clear();
    let n = points.len();
    if n < 2 {
        return;
    }
    let mut prev_normal = Vec2::Y;
    for i in 0..n {
        let d = if i == 0 {
            points[1] - points[0]
        } else if i == n - 1 {
            points[n - 1] - points[n - 2]
        } else {
            points[i + 1] - points[i - 1]
        };
        let tangent = safe_normalize(d, Vec2::X);
        let mut normal = perp(tangent);
        if normal.dot(prev_normal) < 0.0 {
            normal = -normal;
        }
        out.push(Frame { tangent, normal });
        prev_normal = normal;
    }
}
