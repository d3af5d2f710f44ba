/// Fixed timestep accumulator for the board simulation.
/// Motion is distance/speed driven, so every tick must see the same dt.
pub struct FixedTimestep {
    dt: f32,
    accumulator: f32,
    /// Most ticks one frame may run; the backlog beyond that is dropped.
    max_steps: u32,
}

impl FixedTimestep {
    pub fn new(dt: f32) -> Self {
        Self {
            dt: dt.max(1e-4),
            accumulator: 0.0,
            max_steps: 8,
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Add frame time. Returns how many fixed ticks to run now.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        if !frame_dt.is_finite() || frame_dt <= 0.0 {
            return 0;
        }
        self.accumulator = (self.accumulator + frame_dt).min(self.dt * self.max_steps as f32);
        let steps = (self.accumulator / self.dt) as u32;
        self.accumulator -= steps as f32 * self.dt;
        steps
    }

    /// Fraction of a tick left over, for interpolated drawing.
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.dt).clamp(0.0, 1.0)
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Forget leftover time, e.g. after a level load or a long pause.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
