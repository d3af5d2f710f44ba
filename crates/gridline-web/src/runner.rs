use gridline::bridge::protocol::*;
use gridline::{
    Board, BoardConfig, FixedTimestep, GridLayout, InputEvent, InputQueue, LineEvent,
    MotionState, ProtocolLayout, RibbonVertex,
};

/// Drives a `Board` from the browser and packs each frame into one flat
/// buffer the host reads through a `SharedArrayBuffer` view.
///
/// The `export_board!` macro keeps one in a `thread_local!` and exports
/// free functions around it.
pub struct BoardRunner {
    board: Board,
    input: InputQueue,
    timestep: FixedTimestep,
    layout: ProtocolLayout,
    buffer: Vec<f32>,
    events: Vec<LineEvent>,
    vertices: Vec<RibbonVertex>,
    indices: Vec<u32>,
    frame: u32,
}

fn state_code(state: MotionState) -> f32 {
    match state {
        MotionState::Idle => 0.0,
        MotionState::Moving => 1.0,
        MotionState::Blocked => 2.0,
        MotionState::Returning => 3.0,
        MotionState::Exited => 4.0,
    }
}

impl BoardRunner {
    pub fn new(config: BoardConfig, grid: GridLayout) -> Self {
        let timestep = FixedTimestep::new(config.fixed_dt);
        let layout = ProtocolLayout::from_config(&config);
        let buffer = layout.allocate();
        Self {
            board: Board::new(config, grid),
            input: InputQueue::new(),
            timestep,
            layout,
            buffer,
            events: Vec::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
            frame: 0,
        }
    }

    /// Runner configured from a JSON `BoardConfig`; falls back to defaults
    /// when the JSON does not parse.
    pub fn from_config_json(json: &str) -> Self {
        let config = match serde_json::from_str::<BoardConfig>(json) {
            Ok(config) => config,
            Err(e) => {
                log::error!("invalid board config, using defaults: {}", e);
                BoardConfig::default()
            }
        };
        Self::new(config, GridLayout::default())
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Load a level; returns the number of pieces placed, or -1 on a parse error.
    pub fn load_level(&mut self, json: &str) -> i32 {
        match self.board.load_level_json(json) {
            Ok(ids) => {
                self.timestep.reset();
                self.events = self.board.drain_events();
                self.pack();
                ids.len() as i32
            }
            Err(e) => {
                log::error!("level rejected: {}", e);
                -1
            }
        }
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    pub fn push_raw_input(&mut self, kind: u32, a: f32, b: f32) {
        self.input.push_raw(kind, a, b);
    }

    /// Apply queued input, run the fixed steps this frame owes, then pack.
    pub fn tick(&mut self, dt: f32) {
        self.events.clear();
        for event in self.input.drain() {
            self.board.apply_input(event);
        }
        // Taps and erases emit events outside the tick.
        self.events.extend(self.board.drain_events());

        let steps = self.timestep.accumulate(dt);
        let fixed = self.timestep.dt();
        for _ in 0..steps {
            self.board.tick(fixed);
            self.events.extend(self.board.drain_events());
        }

        self.pack();
    }

    fn pack(&mut self) {
        let layout = &self.layout;
        let buf = &mut self.buffer;
        buf[HEADER_LOCK] = 1.0;

        self.board.collect_ribbons(&mut self.vertices, &mut self.indices);
        let vertex_count = self.vertices.len().min(layout.max_vertices);
        if vertex_count < self.vertices.len() {
            log::warn!(
                "ribbon vertices truncated: {} of {}",
                vertex_count,
                self.vertices.len()
            );
        }
        let vertex_floats: &[f32] = bytemuck::cast_slice(&self.vertices[..vertex_count]);
        buf[layout.vertex_data_offset..layout.vertex_data_offset + vertex_floats.len()]
            .copy_from_slice(vertex_floats);

        let mut index_count = 0;
        for tri in self.indices.chunks_exact(3) {
            if index_count + 3 > layout.max_indices {
                break;
            }
            if tri.iter().any(|&i| i as usize >= vertex_count) {
                continue;
            }
            for &i in tri {
                buf[layout.index_data_offset + index_count] = i as f32;
                index_count += 1;
            }
        }

        let event_count = self.events.len().min(layout.max_events);
        let event_floats: &[f32] = bytemuck::cast_slice(&self.events[..event_count]);
        buf[layout.event_data_offset..layout.event_data_offset + event_floats.len()]
            .copy_from_slice(event_floats);

        let mut head_count = 0;
        for (id, pose) in self.board.head_poses().into_iter().take(layout.max_heads) {
            let state = self.board.piece(id).map_or(0.0, |p| state_code(p.state()));
            let at = layout.head_data_offset + head_count * HEAD_FLOATS;
            buf[at..at + HEAD_FLOATS].copy_from_slice(&[
                id.packed(),
                pose.position.x,
                pose.position.y,
                pose.angle,
                if pose.flip_x { 1.0 } else { 0.0 },
                state,
            ]);
            head_count += 1;
        }

        let overlay_count = self.pack_overlay();

        self.frame = self.frame.wrapping_add(1);
        let buf = &mut self.buffer;
        buf[HEADER_FRAME_COUNTER] = self.frame as f32;
        buf[HEADER_VERTEX_COUNT] = vertex_count as f32;
        buf[HEADER_INDEX_COUNT] = index_count as f32;
        buf[HEADER_EVENT_COUNT] = event_count as f32;
        buf[HEADER_HEAD_COUNT] = head_count as f32;
        buf[HEADER_OVERLAY_VERTEX_COUNT] = overlay_count as f32;
        buf[HEADER_ACTIVE_LINES] = self.board.active_lines() as f32;
        buf[HEADER_ERASE_MODE] = if self.board.erase_mode() { 1.0 } else { 0.0 };
        buf[HEADER_ACCEPTING_INPUT] = if self.board.accepting_input() { 1.0 } else { 0.0 };
        buf[HEADER_LOCK] = 0.0;
    }

    #[cfg(feature = "vectors")]
    fn pack_overlay(&mut self) -> usize {
        let layout = &self.layout;
        let overlay = self.board.overlay();
        // Keep whole triangles.
        let count = overlay.vertex_count().min(layout.max_overlay_vertices) / 3 * 3;
        let floats = &overlay.buffer()[..count * OVERLAY_VERTEX_FLOATS];
        self.buffer[layout.overlay_data_offset..layout.overlay_data_offset + floats.len()]
            .copy_from_slice(floats);
        count
    }

    #[cfg(not(feature = "vectors"))]
    fn pack_overlay(&mut self) -> usize {
        0
    }

    // ---- Accessors for SharedArrayBuffer reads ----

    pub fn buffer_ptr(&self) -> *const f32 {
        self.buffer.as_ptr()
    }

    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    pub fn buffer_total_floats(&self) -> u32 {
        self.layout.buffer_total_floats as u32
    }

    pub fn layout(&self) -> &ProtocolLayout {
        &self.layout
    }

    pub fn vertex_count(&self) -> u32 {
        self.buffer[HEADER_VERTEX_COUNT] as u32
    }

    pub fn index_count(&self) -> u32 {
        self.buffer[HEADER_INDEX_COUNT] as u32
    }

    pub fn event_count(&self) -> u32 {
        self.buffer[HEADER_EVENT_COUNT] as u32
    }

    pub fn head_count(&self) -> u32 {
        self.buffer[HEADER_HEAD_COUNT] as u32
    }

    pub fn overlay_vertex_count(&self) -> u32 {
        self.buffer[HEADER_OVERLAY_VERTEX_COUNT] as u32
    }

    pub fn active_lines(&self) -> u32 {
        self.board.active_lines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVEL: &str = r#"{
        "grid": { "width": 6, "height": 6 },
        "defaults": { "amplitude": 0.0, "move_forever": false, "overrun": 0.0, "speed": 4.0 },
        "lines": [ { "turns": [[0, 0], [0, 3]] }, { "turns": [[2, 0], [2, 2], [4, 2]] } ]
    }"#;

    fn runner() -> BoardRunner {
        let mut r = BoardRunner::new(BoardConfig::default(), GridLayout::default());
        assert_eq!(r.load_level(LEVEL), 2);
        r
    }

    #[test]
    fn frame_header_reflects_board() {
        let mut r = runner();
        r.tick(1.0 / 60.0);
        let buf = r.buffer();
        assert_eq!(buf[HEADER_LOCK], 0.0);
        assert_eq!(buf[HEADER_PROTOCOL_VERSION], PROTOCOL_VERSION);
        assert_eq!(buf[HEADER_ACTIVE_LINES], 2.0);
        assert_eq!(buf[HEADER_ACCEPTING_INPUT], 1.0);
        assert!(r.vertex_count() > 0);
        assert_eq!(r.index_count() % 3, 0);
        assert_eq!(r.head_count(), 2);
    }

    #[test]
    fn tap_packs_started_event() {
        let mut r = runner();
        r.push_input(InputEvent::PointerDown { x: 0.5, y: 1.5 });
        r.tick(1.0 / 60.0);
        assert_eq!(r.event_count(), 1);
        let at = r.layout().event_data_offset;
        assert_eq!(r.buffer()[at], LineEvent::STARTED);
    }

    #[test]
    fn bad_level_is_rejected() {
        let mut r = runner();
        assert_eq!(r.load_level("not json"), -1);
        assert_eq!(r.active_lines(), 2);
    }

    #[test]
    fn raw_reset_clears_board() {
        let mut r = runner();
        r.push_raw_input(6, 0.0, 0.0);
        r.tick(1.0 / 60.0);
        assert_eq!(r.buffer()[HEADER_ACTIVE_LINES], 0.0);
        assert_eq!(r.event_count(), 2);
        assert_eq!(r.vertex_count(), 0);
    }
}
