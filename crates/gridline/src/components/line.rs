use glam::Vec2;

use crate::api::listener::ListenerHandle;
use crate::api::types::{ColliderId, GridCoord, LayerMask, LineId};
use crate::assets::config::LineConfig;
use crate::geometry::aabb::Aabb;
use crate::motion::controller::{MotionController, MotionEnv, MotionState};
use crate::motion::probe::{BlockProbe, ObstructionQuery, ObstructionWorld};
use crate::path::arc_length::ArcLengthTable;
use crate::path::bake::BakedPath;
use crate::path::grid::CellMapper;
use crate::ribbon::frames::{compute_frames, Frame};
use crate::ribbon::hull::{CollisionHull, CollisionHullBuilder};
use crate::ribbon::mesh::{RibbonMesh, RibbonMeshBuilder};
use crate::ribbon::wave::{WaveDisplacement, MAX_OFFSET_CELLS};

/// Result of tapping a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    Started,
    /// The piece could not move; the tap was reported as a block.
    Blocked,
    /// The piece is busy or does not react to taps.
    Ignored,
    /// Erase mode removed the piece.
    Erased,
}

/// Placement of the head marker at the leading edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    pub position: Vec2,
    /// Cardinal heading of the last turn segment.
    pub forward: Vec2,
    pub side: Vec2,
    /// Rotation in degrees.
    pub angle: f32,
    /// Mirror horizontally instead of rotating by 180 degrees.
    pub flip_x: bool,
}

/// One movable ribbon piece: baked path, wave, mesh, hull and motion.
pub struct LinePiece {
    id: LineId,
    config: LineConfig,
    turns: Vec<GridCoord>,
    cell_size: f32,
    layers: LayerMask,
    path: Option<BakedPath>,
    wave: WaveDisplacement,
    frames: Vec<Frame>,
    mesh: RibbonMesh,
    hull: CollisionHull,
    mesh_builder: RibbonMeshBuilder,
    hull_builder: CollisionHullBuilder,
    probe: BlockProbe,
    motion: MotionController,
    collider: Option<ColliderId>,
    dirty: bool,
    hull_dirty: bool,
    head_forward: Vec2,
    head_side: Vec2,
}

impl LinePiece {
    /// Bake the piece's path and register it with `listener`. A piece whose
    /// turns do not form a path stays inert and is never registered.
    pub fn new(
        id: LineId,
        turns: &[GridCoord],
        config: &LineConfig,
        grid: &dyn CellMapper,
        probe_mask: LayerMask,
        listener: ListenerHandle,
    ) -> Self {
        let config = config.sanitized();
        let cs = grid.cell_size();
        let path = config.baker().bake(turns, grid);
        let total = path.as_ref().map(|p| p.total_length());
        let width = config.width_world(cs);
        let (head_forward, head_side) = head_axes(turns);

        Self {
            id,
            turns: turns.to_vec(),
            cell_size: cs,
            layers: LayerMask::LINES,
            path,
            wave: WaveDisplacement::new(config.wave_params()),
            frames: Vec::new(),
            mesh: RibbonMesh::new(),
            hull: CollisionHull::new(),
            mesh_builder: RibbonMeshBuilder::new(width)
                .with_cap(config.cap_params())
                .with_fade(config.fade_params(cs)),
            hull_builder: CollisionHullBuilder::new(width).with_cap(config.cap_params()),
            probe: config.probe(cs, probe_mask),
            motion: MotionController::new(id, total, config.motion_params(cs), listener),
            collider: None,
            dirty: true,
            hull_dirty: true,
            head_forward,
            head_side,
            config,
        }
    }

    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self.hull_dirty = true;
        self
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    pub fn turns(&self) -> &[GridCoord] {
        &self.turns
    }

    pub fn path(&self) -> Option<&BakedPath> {
        self.path.as_ref()
    }

    pub fn mesh(&self) -> &RibbonMesh {
        &self.mesh
    }

    pub fn hull(&self) -> &CollisionHull {
        &self.hull
    }

    /// Displaced centerline from the last rebuild.
    pub fn displaced(&self) -> &[Vec2] {
        self.wave.displaced()
    }

    pub fn motion(&self) -> &MotionController {
        &self.motion
    }

    pub fn state(&self) -> MotionState {
        self.motion.state()
    }

    pub fn offset(&self) -> f32 {
        self.motion.offset()
    }

    pub fn collider(&self) -> Option<ColliderId> {
        self.collider
    }

    pub fn is_inert(&self) -> bool {
        self.path.is_none()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_finished(&self) -> bool {
        self.motion.is_finished()
    }

    /// Wave phase this piece draws with.
    pub fn phase(&self, uniform_phase: f32) -> f32 {
        if self.config.uniform_wave {
            uniform_phase
        } else {
            self.config.phase
        }
    }

    /// Recompute wave, mesh and hull for the current offset.
    pub fn rebuild(&mut self, wave_origin: Vec2, uniform_phase: f32) {
        self.dirty = false;
        self.hull_dirty = true;
        let phase = self.phase(uniform_phase);
        let Some(path) = self.path.as_ref() else {
            self.mesh.clear();
            self.hull.clear();
            return;
        };
        let points = self.wave.compute(
            path,
            self.cell_size,
            wave_origin,
            self.motion.offset(),
            phase,
        );
        compute_frames(points, &mut self.frames);
        self.mesh_builder.build(points, &self.frames, &mut self.mesh);
        self.hull_builder.build(points, &self.frames, &mut self.hull);
    }

    /// Advance motion one tick against the hulls published last tick.
    /// Returns whether the piece moved.
    pub fn step<Q: ObstructionQuery + ?Sized>(
        &mut self,
        dt: f32,
        world: &Q,
        bounds: Option<Aabb>,
    ) -> bool {
        let mut env = LineEnv {
            table: self.path.as_ref().map(|p| &p.table),
            probe: &self.probe,
            owner: self.id,
            collider: self.collider,
            world,
            bounds,
            margin: self.mesh_builder.half_width() * self.config.start_cap_radius_mul.max(1.0)
                + MAX_OFFSET_CELLS * self.cell_size,
        };
        let moved = self.motion.step(dt, &mut env);
        if moved {
            self.dirty = true;
        }
        moved
    }

    /// React to a tap on this piece.
    pub fn tap<Q: ObstructionQuery + ?Sized>(&mut self, world: &Q) -> TapOutcome {
        if !self.config.move_on_tap || self.motion.state() != MotionState::Idle {
            return TapOutcome::Ignored;
        }
        let can_move = match self.path.as_ref() {
            None => false,
            Some(path) if self.config.block_check => {
                let from = self.motion.offset();
                !self.probe.is_blocked_step(
                    &path.table,
                    from,
                    from + self.probe.probe_distance,
                    self.id,
                    self.collider,
                    world,
                )
            }
            Some(_) => true,
        };
        if !can_move {
            self.motion.report_blocked_tap();
            return TapOutcome::Blocked;
        }
        if self.motion.start_move() {
            self.hull_dirty = true;
            TapOutcome::Started
        } else {
            TapOutcome::Ignored
        }
    }

    /// Publish or withdraw the hull so the world matches the motion state.
    pub fn sync_hull(&mut self, world: &mut dyn ObstructionWorld) {
        if self.motion.hull_enabled() {
            if self.hull_dirty || self.collider.is_none() {
                self.collider = world.publish(self.id, &self.hull, self.layers);
            }
        } else if self.collider.take().is_some() {
            world.withdraw(self.id);
        }
        self.hull_dirty = false;
    }

    /// Drive the piece out immediately and release its hull.
    pub fn erase(&mut self, world: &mut dyn ObstructionWorld) {
        self.motion.force_exit();
        if self.collider.take().is_some() {
            world.withdraw(self.id);
        }
    }

    /// Leading-edge marker pose along the undisplaced path.
    pub fn head_pose(&self) -> Option<HeadPose> {
        let path = self.path.as_ref()?;
        let cs = self.cell_size;
        let cfg = &self.config;
        let mut position = path.table.point_at(path.total_length() + self.motion.offset());
        position += self.head_forward * (cfg.head_forward_offset * cs);
        position += self.head_side * ((cfg.head_side_offset + cfg.head_down_along_line) * cs);
        position.y += cfg.head_y_offset_world;

        let f = self.head_forward;
        let (angle, flip_x) = if !cfg.rotate_head {
            (0.0, false)
        } else if cfg.flip_head_when_left && f.x.abs() > f.y.abs() {
            (cfg.head_angle_offset, (f.x < -0.001) != cfg.head_faces_left)
        } else {
            let mut angle = f.y.atan2(f.x).to_degrees();
            if cfg.head_faces_left {
                angle += 180.0;
            }
            (angle + cfg.head_angle_offset, false)
        };

        Some(HeadPose {
            position,
            forward: self.head_forward,
            side: self.head_side,
            angle,
            flip_x,
        })
    }

    /// Centerline plus a straight extension past the head, for hint overlays.
    pub fn preview_path(&self) -> Option<Vec<Vec2>> {
        let path = self.path.as_ref()?;
        let mut points = path.centerline().to_vec();
        let extension = self.config.preview_extension * self.cell_size;
        if extension > 1e-4 {
            points.push(path.table.point_at(path.total_length() + extension));
        }
        Some(points)
    }
}

/// Cardinal axes of the last turn segment, cached so the head never
/// picks up wave jitter.
fn head_axes(turns: &[GridCoord]) -> (Vec2, Vec2) {
    let [.., a, b] = turns else {
        return (Vec2::X, Vec2::Y);
    };
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    if dx == 0 && dy == 0 {
        return (Vec2::X, Vec2::Y);
    }
    let forward = if dx.abs() >= dy.abs() {
        if dx >= 0 { Vec2::X } else { Vec2::NEG_X }
    } else if dy >= 0 {
        Vec2::Y
    } else {
        Vec2::NEG_Y
    };
    let side = if forward.y.abs() > 0.5 { Vec2::X } else { Vec2::Y };
    (forward, side)
}

/// Bounds of the ribbon window `[offset, total + offset]`, grown by `margin`.
fn window_bounds(table: &ArcLengthTable, offset: f32, margin: f32) -> Option<Aabb> {
    let end = table.total() + offset;
    let mut points = vec![table.point_at(offset), table.point_at(end)];
    points.extend(
        table
            .points()
            .iter()
            .zip(table.cumulative())
            .filter(|&(_, &s)| s > offset && s < end)
            .map(|(p, _)| *p),
    );
    Aabb::from_points(&points).map(|b| b.expanded(margin))
}

struct LineEnv<'a, Q: ?Sized> {
    table: Option<&'a ArcLengthTable>,
    probe: &'a BlockProbe,
    owner: LineId,
    collider: Option<ColliderId>,
    world: &'a Q,
    bounds: Option<Aabb>,
    margin: f32,
}

impl<Q: ObstructionQuery + ?Sized> MotionEnv for LineEnv<'_, Q> {
    fn is_blocked(&mut self, from: f32, to: f32) -> bool {
        self.table.is_some_and(|table| {
            self.probe
                .is_blocked_step(table, from, to, self.owner, self.collider, self.world)
        })
    }

    fn has_left_bounds(&mut self, offset: f32) -> Option<bool> {
        let bounds = self.bounds?;
        let window = window_bounds(self.table?, offset, self.margin)?;
        Some(!window.intersects(&bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::listener::EventQueue;
    use crate::api::types::LineEvent;
    #[cfg(feature = "physics")]
    use crate::core::physics::RapierObstructions;
    use crate::path::grid::GridLayout;

    fn cells(turns: &[(i32, i32)]) -> Vec<GridCoord> {
        turns.iter().copied().map(GridCoord::from).collect()
    }

    fn piece(id: u32, turns: &[(i32, i32)], config: &LineConfig) -> (LinePiece, std::rc::Rc<std::cell::RefCell<EventQueue>>) {
        let q = EventQueue::shared();
        let grid = GridLayout::new(8, 8, 1.0);
        let mut p = LinePiece::new(LineId(id), &cells(turns), config, &grid, LayerMask::ALL, q.clone());
        p.rebuild(grid.cell_to_world(GridCoord::new(0, 0)), 0.0);
        (p, q)
    }

    #[test]
    fn rebuild_produces_matching_mesh_and_hull() {
        let (p, q) = piece(1, &[(0, 0), (0, 3), (3, 3)], &LineConfig::default());
        assert!(!p.is_inert());
        assert!(!p.mesh().is_empty());
        assert!(p.hull().len() >= 3);
        assert!(!p.is_dirty());
        assert_eq!(q.borrow().count(LineEvent::REGISTERED), 1);
    }

    #[test]
    fn single_cell_piece_is_inert() {
        let (mut p, q) = piece(1, &[(2, 2)], &LineConfig::default());
        assert!(p.is_inert());
        assert!(p.mesh().is_empty());
        assert!(p.hull().is_empty());
        assert!(q.borrow().events().is_empty());
        assert!(p.head_pose().is_none());
    }

    #[cfg(feature = "physics")]
    #[test]
    fn tapping_inert_piece_reports_blocked() {
        let (mut p, q) = piece(1, &[(2, 2)], &LineConfig::default());
        assert_eq!(p.tap(&RapierObstructions::new()), TapOutcome::Blocked);
        assert_eq!(q.borrow().count(LineEvent::BLOCKED), 1);
    }

    #[cfg(feature = "physics")]
    #[test]
    fn tap_starts_move_and_ignores_repeats() {
        let (mut p, _q) = piece(1, &[(0, 0), (0, 3)], &LineConfig::default());
        let world = RapierObstructions::new();
        assert_eq!(p.tap(&world), TapOutcome::Started);
        assert_eq!(p.tap(&world), TapOutcome::Ignored);
        assert_eq!(p.state(), MotionState::Moving);
    }

    #[cfg(feature = "physics")]
    #[test]
    fn tap_blocked_by_obstacle_ahead() {
        let (mut a, q) = piece(1, &[(0, 0), (0, 3)], &LineConfig::default());
        let mut world = RapierObstructions::new();
        a.sync_hull(&mut world);
        let wall = [
            Vec2::new(0.0, 3.7),
            Vec2::new(1.0, 3.7),
            Vec2::new(1.0, 4.0),
            Vec2::new(0.0, 4.0),
        ];
        world.insert_obstacle(&wall, LayerMask::OBSTACLES).unwrap();
        world.commit();
        assert_eq!(a.tap(&world), TapOutcome::Blocked);
        assert_eq!(a.state(), MotionState::Idle);
        assert_eq!(q.borrow().count(LineEvent::BLOCKED), 1);
    }

    #[cfg(feature = "physics")]
    #[test]
    fn own_hull_does_not_block() {
        let (mut a, _q) = piece(1, &[(0, 0), (0, 3)], &LineConfig::default());
        let mut world = RapierObstructions::new();
        a.sync_hull(&mut world);
        world.commit();
        assert!(a.collider().is_some());
        assert_eq!(a.tap(&world), TapOutcome::Started);
        assert!(a.step(1.0 / 60.0, &world, None));
        assert_eq!(a.state(), MotionState::Moving);
        assert!(a.is_dirty());
    }

    #[cfg(feature = "physics")]
    #[test]
    fn erase_withdraws_hull_immediately() {
        let (mut a, q) = piece(1, &[(0, 0), (0, 3)], &LineConfig::default());
        let mut world = RapierObstructions::new();
        a.sync_hull(&mut world);
        assert_eq!(world.len(), 1);
        a.erase(&mut world);
        assert!(world.is_empty());
        assert!(a.is_finished());
        assert_eq!(q.borrow().count(LineEvent::UNREGISTERED), 1);
    }

    #[test]
    fn head_pose_uses_cardinal_axes() {
        let cfg = LineConfig {
            head_down_along_line: 0.0,
            head_y_offset_world: 0.0,
            ..Default::default()
        };
        let (up, _) = piece(1, &[(0, 0), (0, 3)], &cfg);
        let pose = up.head_pose().unwrap();
        assert_eq!(pose.forward, Vec2::Y);
        assert_eq!(pose.side, Vec2::X);
        assert!((pose.position - Vec2::new(0.5, 3.5)).length() < 1e-5);
        assert!((pose.angle - 90.0).abs() < 1e-4);
        assert!(!pose.flip_x);

        let (left, _) = piece(2, &[(4, 0), (1, 0)], &cfg);
        let pose = left.head_pose().unwrap();
        assert_eq!(pose.forward, Vec2::NEG_X);
        assert!(pose.flip_x);
        assert_eq!(pose.angle, 0.0);
    }

    #[test]
    fn preview_extends_past_the_head() {
        let cfg = LineConfig {
            preview_extension: 2.0,
            ..Default::default()
        };
        let (p, _) = piece(1, &[(0, 0), (0, 3)], &cfg);
        let preview = p.preview_path().unwrap();
        let last = *preview.last().unwrap();
        assert!((last - Vec2::new(0.5, 5.5)).length() < 1e-5);
        assert_eq!(preview.len(), p.path().unwrap().centerline().len() + 1);
    }

    #[test]
    fn window_bounds_follow_offset() {
        let table = ArcLengthTable::new(&[Vec2::ZERO, Vec2::new(0.0, 2.0)]);
        let b = window_bounds(&table, 1.0, 0.0).unwrap();
        assert!((b.min.y - 1.0).abs() < 1e-6);
        assert!((b.max.y - 3.0).abs() < 1e-6);
    }

    #[test]
    fn per_piece_phase_when_not_uniform() {
        let cfg = LineConfig {
            uniform_wave: false,
            phase: 1.5,
            ..Default::default()
        };
        let (p, _) = piece(1, &[(0, 0), (0, 3)], &cfg);
        assert_eq!(p.phase(0.25), 1.5);
        let (u, _) = piece(2, &[(0, 0), (0, 3)], &LineConfig::default());
        assert_eq!(u.phase(0.25), 0.25);
    }
}
