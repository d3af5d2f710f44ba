use glam::Vec2;

use crate::api::types::{ColliderId, LayerMask, LineId};
use crate::path::arc_length::ArcLengthTable;
use crate::ribbon::hull::CollisionHull;

/// One shape touched by a sweep query.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub collider: ColliderId,
    /// Owning pieces, nearest first. Empty for static obstacles.
    pub ancestry: Vec<LineId>,
    /// Travelled distance at first contact.
    pub distance: f32,
}

impl Hit {
    /// Whether this hit is the querying piece itself.
    pub fn is_own(&self, owner: LineId, own_collider: Option<ColliderId>) -> bool {
        Some(self.collider) == own_collider || self.ancestry.contains(&owner)
    }
}

/// Sweep queries against published obstruction shapes.
pub trait ObstructionQuery {
    /// Every shape on `mask` touched by a circle of `radius` moving from
    /// `origin` along unit `direction` for up to `max_distance`, nearest first.
    fn circle_cast(
        &self,
        origin: Vec2,
        radius: f32,
        direction: Vec2,
        mask: LayerMask,
        max_distance: f32,
    ) -> Vec<Hit>;
}

/// Storage for published piece hulls. The board writes hulls here at the
/// end of a tick and reads them through `ObstructionQuery` on the next.
pub trait ObstructionWorld: ObstructionQuery {
    /// Publish (or replace) a piece's hull. Returns the collider identity,
    /// which stays stable across republishing. An empty hull withdraws the
    /// piece and returns `None`.
    fn publish(&mut self, owner: LineId, hull: &CollisionHull, layers: LayerMask) -> Option<ColliderId>;
    /// Drop a piece's hull. The piece stops blocking and cannot be picked.
    fn withdraw(&mut self, owner: LineId);
    /// Add a static blocker that belongs to no piece.
    fn insert_obstacle(&mut self, polygon: &[Vec2], layers: LayerMask) -> Option<ColliderId>;
    /// The topmost piece whose hull contains `point`.
    fn pick(&self, point: Vec2) -> Option<LineId>;
    /// Drop every shape, pieces and obstacles alike.
    fn clear(&mut self);
    /// Finish a batch of publish/withdraw calls before queries run.
    fn commit(&mut self) {}
}

/// Short forward sweep from a ribbon's leading edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockProbe {
    /// Sweep length in world units.
    pub probe_distance: f32,
    pub radius: f32,
    pub mask: LayerMask,
}

impl BlockProbe {
    /// `probe_ahead` is in cells; `radius_mul` scales the ribbon width.
    pub fn new(cell_size: f32, probe_ahead: f32, line_width: f32, radius_mul: f32) -> Self {
        Self {
            probe_distance: probe_ahead.max(0.01) * cell_size,
            radius: (line_width * radius_mul).max(0.01),
            mask: LayerMask::ALL,
        }
    }

    pub fn with_mask(mut self, mask: LayerMask) -> Self {
        self.mask = mask;
        self
    }

    /// Would advancing the piece from offset `from` to `to` run into
    /// something other than itself?
    pub fn is_blocked_step<Q: ObstructionQuery + ?Sized>(
        &self,
        table: &ArcLengthTable,
        from: f32,
        to: f32,
        owner: LineId,
        own_collider: Option<ColliderId>,
        world: &Q,
    ) -> bool {
        if table.len() < 2 {
            return false;
        }
        let total = table.total();
        let p0 = table.point_at(total + from);
        let p1 = table.point_at(total + to);
        let delta = p1 - p0;
        let dist = delta.length();
        if dist < 1e-6 {
            return false;
        }
        let dir = delta / dist;

        world
            .circle_cast(p0, self.radius, dir, self.mask, self.probe_distance)
            .iter()
            .any(|hit| !hit.is_own(owner, own_collider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reports a fixed list of hits for any query.
    struct Scripted(Vec<Hit>);

    impl ObstructionQuery for Scripted {
        fn circle_cast(&self, _: Vec2, _: f32, _: Vec2, _: LayerMask, _: f32) -> Vec<Hit> {
            self.0.clone()
        }
    }

    fn table() -> ArcLengthTable {
        ArcLengthTable::new(&[Vec2::ZERO, Vec2::new(0.0, 3.0)])
    }

    fn hit(collider: u32, ancestry: &[u32]) -> Hit {
        Hit {
            collider: ColliderId(collider),
            ancestry: ancestry.iter().map(|&i| LineId(i)).collect(),
            distance: 0.1,
        }
    }

    #[test]
    fn probe_dimensions_follow_cells_and_width() {
        let probe = BlockProbe::new(2.0, 0.35, 0.18, 0.75);
        assert!((probe.probe_distance - 0.7).abs() < 1e-6);
        assert!((probe.radius - 0.135).abs() < 1e-6);
        let tiny = BlockProbe::new(1.0, 0.0, 0.0, 0.0);
        assert_eq!(tiny.probe_distance, 0.01);
        assert_eq!(tiny.radius, 0.01);
    }

    #[test]
    fn own_hull_and_children_never_block() {
        let probe = BlockProbe::new(1.0, 0.35, 0.18, 0.75);
        let me = LineId(1);
        let world = Scripted(vec![hit(10, &[1]), hit(11, &[4, 1])]);
        assert!(!probe.is_blocked_step(&table(), 0.0, 0.1, me, Some(ColliderId(10)), &world));

        let own_collider_only = Scripted(vec![hit(10, &[])]);
        assert!(!probe.is_blocked_step(&table(), 0.0, 0.1, me, Some(ColliderId(10)), &own_collider_only));
    }

    #[test]
    fn other_pieces_and_obstacles_block() {
        let probe = BlockProbe::new(1.0, 0.35, 0.18, 0.75);
        let me = LineId(1);
        let world = Scripted(vec![hit(10, &[1]), hit(12, &[2])]);
        assert!(probe.is_blocked_step(&table(), 0.0, 0.1, me, Some(ColliderId(10)), &world));
        let wall = Scripted(vec![hit(99, &[])]);
        assert!(probe.is_blocked_step(&table(), 0.0, 0.1, me, None, &wall));
    }

    #[test]
    fn zero_length_step_is_never_blocked() {
        let probe = BlockProbe::new(1.0, 0.35, 0.18, 0.75);
        let wall = Scripted(vec![hit(99, &[])]);
        assert!(!probe.is_blocked_step(&table(), 0.5, 0.5, LineId(1), None, &wall));
        let empty = ArcLengthTable::new(&[]);
        assert!(!probe.is_blocked_step(&empty, 0.0, 1.0, LineId(1), None, &wall));
    }
}
