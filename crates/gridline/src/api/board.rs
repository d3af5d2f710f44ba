use std::cell::{Ref, RefCell};
use std::f32::consts::TAU;
use std::rc::Rc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::listener::{EventQueue, ListenerHandle};
use crate::api::types::{ColliderId, GridCoord, LayerMask, LineEvent, LineId};
use crate::assets::config::LineConfig;
use crate::assets::level::LevelDesc;
use crate::components::line::{HeadPose, LinePiece, TapOutcome};
use crate::core::arena::LineArena;
#[cfg(feature = "physics")]
use crate::core::physics::RapierObstructions;
use crate::geometry::aabb::Aabb;
use crate::input::queue::InputEvent;
use crate::motion::probe::ObstructionWorld;
use crate::path::grid::{CellMapper, GridLayout};
use crate::ribbon::mesh::RibbonVertex;
#[cfg(feature = "vectors")]
use crate::systems::overlay::{OverlayColor, OverlayState};

/// Board settings, provided by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Fixed timestep in seconds (default: 1/60).
    pub fixed_dt: f32,
    /// Play area as `[min_x, min_y, max_x, max_y]`. Pieces that move forever
    /// exit once they have left it; without it they use their overrun.
    pub world_bounds: Option<[f32; 4]>,
    /// Layers a piece's probe looks at.
    pub probe_mask: LayerMask,
    /// Layers piece hulls are published on.
    pub line_layers: LayerMask,
    /// Layers static obstacles are published on.
    pub obstacle_layers: LayerMask,
    /// Shared wave phase advance in radians per second.
    pub wave_speed: f32,
    pub preview_width: f32,
    /// Head marker size in cells; 0 hides the markers.
    pub head_marker_size: f32,
    pub debug_hulls: bool,
    pub max_vertices: usize,
    pub max_indices: usize,
    pub max_events: usize,
    pub max_heads: usize,
    pub max_overlay_vertices: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            world_bounds: None,
            probe_mask: LayerMask::ALL,
            line_layers: LayerMask::LINES,
            obstacle_layers: LayerMask::OBSTACLES,
            wave_speed: 0.0,
            preview_width: 0.08,
            head_marker_size: 0.0,
            debug_hulls: false,
            max_vertices: 32768,
            max_indices: 98304,
            max_events: 64,
            max_heads: 128,
            max_overlay_vertices: 16384,
        }
    }
}

impl BoardConfig {
    pub fn bounds(&self) -> Option<Aabb> {
        self.world_bounds
            .map(|[x0, y0, x1, y1]| Aabb::new(Vec2::new(x0, y0), Vec2::new(x1, y1)))
    }
}

/// A grid of ribbon pieces driven by a two-phase tick.
///
/// Phase one steps every piece's motion against the hulls published at the
/// end of the previous tick. Phase two rebuilds the geometry of every piece
/// that changed and publishes the new hulls. Blocking decisions therefore
/// see hulls that are at most one tick old, and never a half-built one.
pub struct Board {
    config: BoardConfig,
    grid: GridLayout,
    pieces: LineArena,
    world: Box<dyn ObstructionWorld>,
    events: Rc<RefCell<EventQueue>>,
    uniform_phase: f32,
    erase_mode: bool,
    accepting_input: bool,
    show_preview: bool,
    hint: Option<LineId>,
    #[cfg(feature = "vectors")]
    overlay: OverlayState,
}

impl Board {
    /// Board backed by rapier's query pipeline.
    #[cfg(feature = "physics")]
    pub fn new(config: BoardConfig, grid: GridLayout) -> Self {
        Self::with_world(config, grid, Box::new(RapierObstructions::new()))
    }

    /// Board backed by a custom obstruction world.
    pub fn with_world(config: BoardConfig, grid: GridLayout, world: Box<dyn ObstructionWorld>) -> Self {
        Self {
            #[cfg(feature = "vectors")]
            overlay: OverlayState::new(grid.cell_size * 0.01),
            config,
            grid,
            pieces: LineArena::new(),
            world,
            events: EventQueue::shared(),
            uniform_phase: 0.0,
            erase_mode: false,
            accepting_input: true,
            show_preview: false,
            hint: None,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridLayout {
        &self.grid
    }

    pub fn pieces(&self) -> impl Iterator<Item = &LinePiece> {
        self.pieces.iter()
    }

    pub fn piece(&self, id: LineId) -> Option<&LinePiece> {
        self.pieces.get(id)
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn events(&self) -> Ref<'_, EventQueue> {
        self.events.borrow()
    }

    /// Take the events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<LineEvent> {
        self.events.borrow_mut().drain()
    }

    /// Registered pieces still on the board. Zero means the board is clear.
    pub fn active_lines(&self) -> u32 {
        self.events.borrow().active_lines()
    }

    fn listener(&self) -> ListenerHandle {
        self.events.clone()
    }

    fn wave_origin(&self) -> Vec2 {
        self.grid.cell_to_world(GridCoord::new(0, 0))
    }

    /// Place a piece and publish its hull right away so it can be tapped
    /// before the first tick.
    pub fn spawn_line(&mut self, turns: &[GridCoord], config: &LineConfig) -> LineId {
        let id = self.pieces.alloc_id();
        let mut piece = LinePiece::new(
            id,
            turns,
            config,
            &self.grid,
            self.config.probe_mask,
            self.listener(),
        )
        .with_layers(self.config.line_layers);
        piece.rebuild(self.wave_origin(), self.uniform_phase);
        piece.sync_hull(self.world.as_mut());
        self.world.commit();
        log::debug!(
            "spawned line {:?}: {} turns, length {:.3}",
            id,
            turns.len(),
            piece.path().map_or(0.0, |p| p.total_length())
        );
        self.pieces.insert(piece);
        id
    }

    pub fn add_obstacle(&mut self, polygon: &[Vec2]) -> Option<ColliderId> {
        let id = self.world.insert_obstacle(polygon, self.config.obstacle_layers);
        self.world.commit();
        id
    }

    /// Replace the board contents with a level. A level whose line settings
    /// do not resolve leaves the board untouched.
    pub fn load_level(&mut self, level: &LevelDesc) -> Result<Vec<LineId>, serde_json::Error> {
        let configs = level.line_configs()?;
        self.clear();
        self.grid = level.layout();
        #[cfg(feature = "vectors")]
        {
            self.overlay = OverlayState::new(self.grid.cell_size * 0.01);
        }
        for polygon in &level.obstacles {
            let points: Vec<Vec2> = polygon.iter().copied().map(Vec2::from).collect();
            if self.add_obstacle(&points).is_none() {
                log::warn!("level {:?}: skipping degenerate obstacle", level.name);
            }
        }
        let ids: Vec<LineId> = level
            .lines
            .iter()
            .zip(&configs)
            .map(|(line, config)| self.spawn_line(&line.turn_cells(), config))
            .collect();
        log::info!(
            "loaded level {:?}: {}x{} grid, {} lines, {} obstacles",
            level.name,
            self.grid.width,
            self.grid.height,
            ids.len(),
            level.obstacles.len()
        );
        Ok(ids)
    }

    pub fn load_level_json(&mut self, json: &str) -> Result<Vec<LineId>, serde_json::Error> {
        let level = LevelDesc::from_json(json)?;
        self.load_level(&level)
    }

    /// Remove every piece and obstacle. Live pieces are unregistered.
    pub fn clear(&mut self) {
        for piece in self.pieces.iter_mut() {
            piece.erase(self.world.as_mut());
        }
        self.pieces.clear();
        self.world.clear();
        self.world.commit();
        self.hint = None;
    }

    /// Run one simulation tick.
    pub fn tick(&mut self, dt: f32) {
        if self.config.wave_speed != 0.0 {
            self.set_uniform_phase(self.uniform_phase + self.config.wave_speed * dt);
        }

        let bounds = self.config.bounds();
        for piece in self.pieces.iter_mut() {
            piece.step(dt, self.world.as_ref(), bounds);
        }

        let origin = self.wave_origin();
        for piece in self.pieces.iter_mut() {
            if piece.is_dirty() {
                piece.rebuild(origin, self.uniform_phase);
            }
            piece.sync_hull(self.world.as_mut());
        }
        self.world.commit();

        for id in self.pieces.sweep_finished() {
            log::debug!("removed line {:?}", id);
            if self.hint == Some(id) {
                self.hint = None;
            }
        }

        #[cfg(feature = "vectors")]
        self.rebuild_overlay();
    }

    /// Tap at a world point. Returns the piece hit and what it did.
    pub fn pointer_down(&mut self, point: Vec2) -> Option<(LineId, TapOutcome)> {
        if !self.accepting_input {
            return None;
        }
        let id = self.world.pick(point)?;
        if self.erase_mode {
            return self.erase(id).then_some((id, TapOutcome::Erased));
        }
        let world = self.world.as_ref();
        let outcome = self.pieces.get_mut(id)?.tap(world);
        log::debug!("tap on line {:?}: {:?}", id, outcome);
        Some((id, outcome))
    }

    /// Drive a piece out and drop it immediately.
    pub fn erase(&mut self, id: LineId) -> bool {
        let Some(mut piece) = self.pieces.remove(id) else {
            return false;
        };
        piece.erase(self.world.as_mut());
        self.world.commit();
        if self.hint == Some(id) {
            self.hint = None;
        }
        true
    }

    /// Erase every piece, keeping obstacles.
    pub fn reset(&mut self) {
        for id in self.pieces.ids() {
            self.erase(id);
        }
    }

    pub fn apply_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerDown { x, y } => {
                self.pointer_down(Vec2::new(x, y));
            }
            InputEvent::SetEraseMode { on } => self.set_erase_mode(on),
            InputEvent::SetAcceptingInput { on } => self.set_accepting_input(on),
            InputEvent::SetPreview { on } => self.set_preview(on),
            InputEvent::Hint { line } => self.set_hint(Some(LineId(line))),
            InputEvent::Reset => self.reset(),
        }
    }

    pub fn erase_mode(&self) -> bool {
        self.erase_mode
    }

    pub fn set_erase_mode(&mut self, on: bool) {
        self.erase_mode = on;
    }

    pub fn accepting_input(&self) -> bool {
        self.accepting_input
    }

    /// Pause or resume tap handling.
    pub fn set_accepting_input(&mut self, on: bool) {
        self.accepting_input = on;
    }

    pub fn set_preview(&mut self, on: bool) {
        self.show_preview = on;
    }

    /// Highlight a piece's path. Unknown ids clear the hint.
    pub fn set_hint(&mut self, line: Option<LineId>) {
        self.hint = line.filter(|&id| self.pieces.get(id).is_some());
    }

    pub fn hint(&self) -> Option<LineId> {
        self.hint
    }

    pub fn uniform_phase(&self) -> f32 {
        self.uniform_phase
    }

    /// Set the shared wave phase; pieces following it redraw next tick.
    pub fn set_uniform_phase(&mut self, phase: f32) {
        self.uniform_phase = phase.rem_euclid(TAU);
        for piece in self.pieces.iter_mut() {
            if piece.config().uniform_wave {
                piece.mark_dirty();
            }
        }
    }

    pub fn preview_path(&self, id: LineId) -> Option<Vec<Vec2>> {
        self.pieces.get(id)?.preview_path()
    }

    pub fn head_poses(&self) -> Vec<(LineId, HeadPose)> {
        self.pieces
            .iter()
            .filter_map(|p| p.head_pose().map(|pose| (p.id(), pose)))
            .collect()
    }

    /// Append every ribbon into one vertex/index batch, in spawn order.
    pub fn collect_ribbons(&self, vertices: &mut Vec<RibbonVertex>, indices: &mut Vec<u32>) {
        vertices.clear();
        indices.clear();
        for piece in self.pieces.iter() {
            let mesh = piece.mesh();
            let base = vertices.len() as u32;
            vertices.extend_from_slice(mesh.vertices());
            indices.extend(mesh.indices().iter().map(|&i| base + i));
        }
    }

    #[cfg(feature = "vectors")]
    pub fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    #[cfg(feature = "vectors")]
    fn rebuild_overlay(&mut self) {
        let overlay = &mut self.overlay;
        overlay.clear();
        let width = self.config.preview_width;
        for piece in self.pieces.iter() {
            let hinted = self.hint == Some(piece.id());
            if self.show_preview || hinted {
                if let Some(path) = piece.preview_path() {
                    let color = if hinted { OverlayColor::HINT } else { OverlayColor::PREVIEW };
                    overlay.stroke_polyline(&path, width, color);
                }
            }
            if self.config.debug_hulls {
                overlay.stroke_polygon(piece.hull().points(), width * 0.5, OverlayColor::HULL);
            }
            if self.config.head_marker_size > 0.0 {
                if let Some(pose) = piece.head_pose() {
                    let size = self.config.head_marker_size * self.grid.cell_size;
                    overlay.head_marker(&pose, size, OverlayColor::HEAD);
                }
            }
        }
    }
}

#[cfg(all(test, feature = "physics"))]
mod tests {
    use super::*;
    use crate::motion::controller::MotionState;

    fn cells(turns: &[(i32, i32)]) -> Vec<GridCoord> {
        turns.iter().copied().map(GridCoord::from).collect()
    }

    fn board() -> Board {
        Board::new(BoardConfig::default(), GridLayout::new(8, 8, 1.0))
    }

    fn straight_config() -> LineConfig {
        LineConfig {
            amplitude: 0.0,
            move_forever: false,
            overrun: 0.0,
            speed: 4.0,
            ..Default::default()
        }
    }

    #[test]
    fn straight_piece_exits_exactly_once() {
        let mut board = board();
        let id = board.spawn_line(&cells(&[(0, 0), (0, 3)]), &straight_config());
        let length = board.piece(id).unwrap().path().unwrap().total_length();
        assert!((length - 3.0).abs() < 1e-5);
        assert_eq!(board.active_lines(), 1);

        let (hit, outcome) = board.pointer_down(Vec2::new(0.5, 1.5)).unwrap();
        assert_eq!((hit, outcome), (id, TapOutcome::Started));

        // 3 cells at 4 cells/s, in exact binary steps.
        for _ in 0..6 {
            board.tick(0.125);
        }
        assert!(board.piece(id).is_none());
        for _ in 0..4 {
            board.tick(0.125);
        }
        assert_eq!(board.events().count(LineEvent::UNREGISTERED), 1);
        assert_eq!(board.active_lines(), 0);
    }

    #[test]
    fn moving_piece_blocks_on_neighbour_and_returns() {
        let mut board = board();
        let cfg = LineConfig {
            amplitude: 0.0,
            return_speed: 4.0,
            ..Default::default()
        };
        let mover = board.spawn_line(&cells(&[(1, 0), (1, 2)]), &cfg);
        let wall = board.spawn_line(&cells(&[(0, 3), (4, 3)]), &cfg);
        assert_eq!(board.pointer_down(Vec2::new(1.5, 1.5)), Some((mover, TapOutcome::Started)));

        let mut peak = 0.0f32;
        let mut returning = false;
        let mut last = f32::MAX;
        for _ in 0..240 {
            board.tick(1.0 / 60.0);
            let piece = board.piece(mover).unwrap();
            match piece.state() {
                MotionState::Returning => {
                    if returning {
                        assert!(piece.offset() <= last);
                    }
                    returning = true;
                    last = piece.offset();
                }
                MotionState::Idle if returning => break,
                _ => {}
            }
            assert!(piece.offset() >= 0.0);
            peak = peak.max(piece.offset());
        }

        let piece = board.piece(mover).unwrap();
        assert!(returning);
        assert_eq!(piece.state(), MotionState::Idle);
        assert_eq!(piece.offset(), 0.0);
        assert!(peak > 0.0 && peak < 1.0, "peak {}", peak);
        assert_eq!(board.events().count(LineEvent::BLOCKED), 1);
        assert_eq!(board.piece(wall).unwrap().state(), MotionState::Idle);
        assert_eq!(board.active_lines(), 2);
    }

    #[test]
    fn second_tap_while_moving_is_ignored() {
        let mut board = board();
        let id = board.spawn_line(&cells(&[(0, 0), (0, 3)]), &straight_config());
        board.pointer_down(Vec2::new(0.5, 1.5));
        board.tick(0.125);
        let offset = board.piece(id).unwrap().offset();
        let again = board.pointer_down(Vec2::new(0.5, 2.0));
        assert!(matches!(again, Some((_, TapOutcome::Ignored)) | None));
        assert_eq!(board.piece(id).unwrap().offset(), offset);
        assert_eq!(board.events().count(LineEvent::STARTED), 1);
        assert_eq!(board.events().count(LineEvent::REGISTERED), 1);
    }

    #[test]
    fn erase_mode_removes_piece_immediately() {
        let mut board = board();
        let id = board.spawn_line(&cells(&[(0, 0), (0, 3)]), &straight_config());
        board.set_erase_mode(true);
        assert_eq!(board.pointer_down(Vec2::new(0.5, 1.5)), Some((id, TapOutcome::Erased)));
        assert!(board.piece(id).is_none());
        assert_eq!(board.active_lines(), 0);
        assert_eq!(board.pointer_down(Vec2::new(0.5, 1.5)), None);
    }

    #[test]
    fn paused_board_ignores_taps() {
        let mut board = board();
        board.spawn_line(&cells(&[(0, 0), (0, 3)]), &straight_config());
        board.apply_input(InputEvent::SetAcceptingInput { on: false });
        assert_eq!(board.pointer_down(Vec2::new(0.5, 1.5)), None);
        assert!(board.events().count(LineEvent::STARTED) == 0);
    }

    #[test]
    fn move_forever_piece_exits_off_screen() {
        let config = BoardConfig {
            world_bounds: Some([0.0, 0.0, 8.0, 8.0]),
            ..Default::default()
        };
        let mut board = Board::new(config, GridLayout::new(8, 8, 1.0));
        let cfg = LineConfig {
            speed: 12.0,
            overrun: 0.0,
            ..Default::default()
        };
        let id = board.spawn_line(&cells(&[(3, 5), (3, 7)]), &cfg);
        board.pointer_down(Vec2::new(3.5, 6.0));
        // 0.2 cells per tick; the tail clears the top edge near offset 3.
        for _ in 0..10 {
            board.tick(1.0 / 60.0);
        }
        assert!(board.piece(id).is_some());
        for _ in 0..60 {
            board.tick(1.0 / 60.0);
        }
        assert!(board.piece(id).is_none());
        assert_eq!(board.active_lines(), 0);
    }

    #[test]
    fn destroy_delay_keeps_exited_piece_visible() {
        let mut board = board();
        let cfg = LineConfig {
            destroy_after_move: true,
            destroy_delay: 0.5,
            ..straight_config()
        };
        let id = board.spawn_line(&cells(&[(0, 0), (0, 3)]), &cfg);
        board.pointer_down(Vec2::new(0.5, 1.5));
        for _ in 0..6 {
            board.tick(0.125);
        }
        let piece = board.piece(id).unwrap();
        assert_eq!(piece.state(), MotionState::Exited);
        assert!(piece.collider().is_none());
        assert_eq!(board.pointer_down(Vec2::new(0.5, 4.0)), None);
        for _ in 0..4 {
            board.tick(0.125);
        }
        assert!(board.piece(id).is_none());
    }

    #[test]
    fn level_json_loads_and_reports_errors() {
        let mut board = board();
        let ids = board
            .load_level_json(
                r#"{
                    "grid": { "width": 4, "height": 4 },
                    "lines": [ { "turns": [[0, 0], [0, 2]] }, { "turns": [[2, 0], [2, 2], [3, 2]] } ],
                    "obstacles": [ [[3.0, 3.0], [4.0, 3.0], [4.0, 4.0]] ]
                }"#,
            )
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(board.active_lines(), 2);
        assert_eq!(board.grid().width, 4);
        assert!(board.load_level_json("{").is_err());
        assert_eq!(board.piece_count(), 2);
        let mistyped = r#"{
            "grid": { "width": 2, "height": 2 },
            "lines": [ { "turns": [[0, 0], [0, 1]], "config": { "speed": "fast" } } ]
        }"#;
        assert!(board.load_level_json(mistyped).is_err());
        assert_eq!(board.piece_count(), 2);
        assert_eq!(board.grid().width, 4);

        board.load_level_json(r#"{ "grid": { "width": 2, "height": 2 } }"#).unwrap();
        assert_eq!(board.piece_count(), 0);
        assert_eq!(board.active_lines(), 0);
    }

    #[test]
    fn level_obstacle_blocks_tap_through_query_pipeline() {
        let mut board = board();
        let ids = board
            .load_level_json(
                r#"{
                    "grid": { "width": 4, "height": 4 },
                    "lines": [ { "turns": [[0, 0], [0, 2]] } ],
                    "obstacles": [ [[0.0, 2.7], [1.0, 2.7], [1.0, 3.0], [0.0, 3.0]] ]
                }"#,
            )
            .unwrap();
        assert_eq!(board.pointer_down(Vec2::new(0.5, 1.0)), Some((ids[0], TapOutcome::Blocked)));
        assert_eq!(board.piece(ids[0]).unwrap().state(), MotionState::Idle);
        assert_eq!(board.events().count(LineEvent::BLOCKED), 1);
        // Obstacles are never picked.
        assert_eq!(board.pointer_down(Vec2::new(0.5, 2.9)), None);
    }

    #[test]
    fn uniform_phase_marks_followers_dirty() {
        let mut board = board();
        let follower = board.spawn_line(&cells(&[(0, 0), (0, 3)]), &LineConfig::default());
        let own = LineConfig {
            uniform_wave: false,
            ..Default::default()
        };
        let loner = board.spawn_line(&cells(&[(2, 0), (2, 3)]), &own);
        board.set_uniform_phase(1.0 + TAU);
        assert!((board.uniform_phase() - 1.0).abs() < 1e-5);
        assert!(board.piece(follower).unwrap().is_dirty());
        assert!(!board.piece(loner).unwrap().is_dirty());
    }

    #[test]
    fn ribbons_batch_with_offset_indices() {
        let mut board = board();
        board.spawn_line(&cells(&[(0, 0), (0, 3)]), &LineConfig::default());
        board.spawn_line(&cells(&[(2, 0), (2, 3)]), &LineConfig::default());
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        board.collect_ribbons(&mut vertices, &mut indices);
        let first = board.pieces().next().unwrap().mesh();
        assert_eq!(indices.len(), first.index_count() * 2);
        assert_eq!(indices[first.index_count()], first.indices()[0] + first.vertex_count() as u32);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[cfg(feature = "vectors")]
    #[test]
    fn preview_and_hint_overlay() {
        let mut board = board();
        let id = board.spawn_line(&cells(&[(0, 0), (0, 3)]), &LineConfig::default());
        board.tick(1.0 / 60.0);
        assert_eq!(board.overlay().vertex_count(), 0);
        board.set_hint(Some(id));
        board.tick(1.0 / 60.0);
        assert!(board.overlay().vertex_count() > 0);
        board.set_hint(Some(LineId(99)));
        assert_eq!(board.hint(), None);
    }
}
