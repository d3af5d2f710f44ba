use glam::Vec2;

use super::arc_length::ArcLengthTable;

/// Dot product above which two unit directions count as the same heading.
pub const STRAIGHT_DOT: f32 = 0.999;

/// Arc-length positions of the genuine turns of a path, measured on the
/// smoothed centerline. Sorted ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CornerIndex {
    positions: Vec<f32>,
}

/// Whether `b` is a real change of direction between `a` and `c`.
pub fn is_turn(a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = b - a;
    let d2 = c - b;
    if d1.length_squared() < 1e-10 || d2.length_squared() < 1e-10 {
        return false;
    }
    d1.normalize().dot(d2.normalize()) < STRAIGHT_DOT
}

impl CornerIndex {
    /// Record every interior turn of the raw (pre-rounding) polyline by
    /// projecting it onto the smoothed centerline behind `table`.
    pub fn build(raw: &[Vec2], table: &ArcLengthTable) -> Self {
        let mut positions = Vec::new();
        for w in raw.windows(3) {
            if is_turn(w[0], w[1], w[2]) {
                positions.push(table.project(w[1]));
            }
        }
        Self::from_positions(positions)
    }

    pub fn from_positions(mut positions: Vec<f32>) -> Self {
        positions.sort_by(|a, b| a.total_cmp(b));
        Self { positions }
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Distance from arc length `s` to the closest recorded corner.
    pub fn nearest_distance(&self, s: f32) -> Option<f32> {
        if self.positions.is_empty() {
            return None;
        }
        let i = self.positions.partition_point(|&c| c < s);
        let mut best = f32::MAX;
        if i < self.positions.len() {
            best = best.min((self.positions[i] - s).abs());
        }
        if i > 0 {
            best = best.min((s - self.positions[i - 1]).abs());
        }
        Some(best)
    }

    /// Damping weight in `[0, 1]`: 1 on a corner, falling off with the given
    /// curve exponent to 0 at `radius` away from every corner.
    pub fn protection_weight(&self, s: f32, radius: f32, curve: f32) -> f32 {
        if radius <= 1e-6 {
            return 0.0;
        }
        match self.nearest_distance(s) {
            Some(best) if best < radius => (1.0 - best / radius).powf(curve.max(0.05)),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_detection() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(0.0, 1.0);
        assert!(!is_turn(a, b, Vec2::new(0.0, 2.0)));
        assert!(is_turn(a, b, Vec2::new(1.0, 1.0)));
        assert!(!is_turn(a, a, b));
    }

    #[test]
    fn corners_projected_onto_centerline() {
        let raw = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(2.0, 2.0),
        ];
        let table = ArcLengthTable::new(&raw);
        let corners = CornerIndex::build(&raw, &table);
        assert_eq!(corners.positions(), &[2.0]);
    }

    #[test]
    fn nearest_distance_uses_both_neighbours() {
        let c = CornerIndex::from_positions(vec![5.0, 1.0, 3.0]);
        assert_eq!(c.positions(), &[1.0, 3.0, 5.0]);
        let d = c.nearest_distance(2.2).unwrap();
        assert!((d - 0.8).abs() < 1e-5);
        assert_eq!(c.nearest_distance(-1.0), Some(2.0));
        assert_eq!(c.nearest_distance(9.0), Some(4.0));
        assert_eq!(CornerIndex::default().nearest_distance(1.0), None);
    }

    #[test]
    fn protection_falls_off_with_distance() {
        let c = CornerIndex::from_positions(vec![2.0]);
        assert_eq!(c.protection_weight(2.0, 1.0, 1.0), 1.0);
        assert!((c.protection_weight(2.5, 1.0, 1.0) - 0.5).abs() < 1e-6);
        assert_eq!(c.protection_weight(3.0, 1.0, 1.0), 0.0);
        assert_eq!(c.protection_weight(2.0, 0.0, 1.0), 0.0);
        let near = c.protection_weight(2.1, 1.0, 0.35);
        let far = c.protection_weight(2.8, 1.0, 0.35);
        assert!(near > far && far > 0.0);
    }
}
