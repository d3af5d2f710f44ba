use serde::{Deserialize, Serialize};

use crate::api::types::LayerMask;
use crate::motion::controller::MotionParams;
use crate::motion::probe::BlockProbe;
use crate::path::bake::{PathBaker, MAX_CORNER_RADIUS};
use crate::ribbon::mesh::{CapParams, FadeParams};
use crate::ribbon::wave::{WaveParams, MAX_AMPLITUDE_CELLS};

/// Tunables of one ribbon piece. Lengths are in cells, speeds in cells per
/// second, times in seconds and angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub line_width: f32,

    pub round_start_cap: bool,
    pub start_cap_segments: u32,
    pub start_cap_radius_mul: f32,

    pub start_fade: bool,
    pub fade_start_length: f32,
    pub fade_start_alpha: f32,
    pub fade_curve: f32,

    pub amplitude: f32,
    pub wavelength: f32,
    /// Own phase in radians, used when `uniform_wave` is off.
    pub phase: f32,
    /// Follow the board's shared phase instead of `phase`.
    pub uniform_wave: bool,

    pub samples_per_cell: u32,
    pub corner_radius: f32,
    pub corner_segments: u32,
    pub corner_protect: f32,
    pub corner_protect_curve: f32,
    pub wave_smooth_iterations: u32,
    pub corner_amp_mul: f32,
    pub corner_sharpness: f32,

    pub move_on_tap: bool,
    pub speed: f32,
    pub move_forever: bool,
    pub overrun: f32,

    pub destroy_after_move: bool,
    pub destroy_delay: f32,

    pub block_check: bool,
    pub probe_ahead: f32,
    pub probe_radius_mul: f32,

    pub return_to_start_on_block: bool,
    pub return_speed: f32,
    pub return_stop_epsilon: f32,

    pub head_forward_offset: f32,
    pub head_side_offset: f32,
    pub head_down_along_line: f32,
    /// Vertical nudge in world units.
    pub head_y_offset_world: f32,
    pub rotate_head: bool,
    pub head_angle_offset: f32,
    pub flip_head_when_left: bool,
    pub head_faces_left: bool,

    pub preview_extension: f32,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            line_width: 0.18,
            round_start_cap: true,
            start_cap_segments: 10,
            start_cap_radius_mul: 1.0,
            start_fade: true,
            fade_start_length: 1.2,
            fade_start_alpha: 0.15,
            fade_curve: 1.6,
            amplitude: 0.22,
            wavelength: 2.2,
            phase: 0.0,
            uniform_wave: true,
            samples_per_cell: 18,
            corner_radius: 0.35,
            corner_segments: 10,
            corner_protect: 1.05,
            corner_protect_curve: 0.35,
            wave_smooth_iterations: 2,
            corner_amp_mul: 0.25,
            corner_sharpness: 2.0,
            move_on_tap: true,
            speed: 6.0,
            move_forever: true,
            overrun: 6.0,
            destroy_after_move: false,
            destroy_delay: 2.0,
            block_check: true,
            probe_ahead: 0.35,
            probe_radius_mul: 0.75,
            return_to_start_on_block: true,
            return_speed: 12.0,
            return_stop_epsilon: 0.02,
            head_forward_offset: 0.0,
            head_side_offset: 0.0,
            head_down_along_line: 0.25,
            head_y_offset_world: -0.2,
            rotate_head: true,
            head_angle_offset: 0.0,
            flip_head_when_left: true,
            head_faces_left: false,
            preview_extension: 6.0,
        }
    }
}

impl LineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Copy with every field pulled into its supported range.
    pub fn sanitized(&self) -> Self {
        let c = self;
        Self {
            line_width: c.line_width.clamp(0.02, 1.0),
            start_cap_segments: c.start_cap_segments.clamp(2, 24),
            start_cap_radius_mul: c.start_cap_radius_mul.clamp(0.2, 2.0),
            fade_start_length: c.fade_start_length.clamp(0.0, 5.0),
            fade_start_alpha: c.fade_start_alpha.clamp(0.0, 1.0),
            fade_curve: c.fade_curve.clamp(0.2, 4.0),
            amplitude: c.amplitude.clamp(0.0, MAX_AMPLITUDE_CELLS),
            wavelength: c.wavelength.clamp(0.5, 6.0),
            phase: if c.phase.is_finite() { c.phase } else { 0.0 },
            samples_per_cell: c.samples_per_cell.clamp(6, 80),
            corner_radius: c.corner_radius.clamp(0.0, MAX_CORNER_RADIUS),
            corner_segments: c.corner_segments.clamp(2, 16),
            corner_protect: c.corner_protect.clamp(0.0, 2.5),
            corner_protect_curve: c.corner_protect_curve.clamp(0.05, 1.0),
            wave_smooth_iterations: c.wave_smooth_iterations.min(6),
            corner_amp_mul: c.corner_amp_mul.clamp(0.0, 1.0),
            corner_sharpness: c.corner_sharpness.clamp(0.5, 6.0),
            speed: c.speed.clamp(0.1, 20.0),
            overrun: c.overrun.clamp(0.0, 50.0),
            destroy_delay: c.destroy_delay.clamp(0.1, 10.0),
            probe_ahead: c.probe_ahead.clamp(0.05, 2.0),
            probe_radius_mul: c.probe_radius_mul.clamp(0.2, 1.5),
            return_speed: c.return_speed.clamp(2.0, 30.0),
            return_stop_epsilon: c.return_stop_epsilon.clamp(0.01, 0.5),
            preview_extension: c.preview_extension.max(0.0),
            ..c.clone()
        }
    }

    pub fn baker(&self) -> PathBaker {
        PathBaker::new(self.corner_radius, self.corner_segments)
    }

    pub fn wave_params(&self) -> WaveParams {
        WaveParams {
            amplitude: self.amplitude,
            wavelength: self.wavelength,
            samples_per_cell: self.samples_per_cell as f32,
            corner_protect: self.corner_protect,
            protect_curve: self.corner_protect_curve,
            corner_amp_mul: self.corner_amp_mul,
            corner_sharpness: self.corner_sharpness,
            smooth_iterations: self.wave_smooth_iterations,
        }
    }

    pub fn cap_params(&self) -> CapParams {
        CapParams {
            enabled: self.round_start_cap,
            segments: self.start_cap_segments,
            radius_mul: self.start_cap_radius_mul,
        }
    }

    pub fn fade_params(&self, cell_size: f32) -> FadeParams {
        FadeParams {
            enabled: self.start_fade,
            length: self.fade_start_length * cell_size,
            start_alpha: self.fade_start_alpha,
            curve: self.fade_curve,
        }
    }

    /// Motion settings converted to world units.
    pub fn motion_params(&self, cell_size: f32) -> MotionParams {
        MotionParams {
            speed: self.speed * cell_size,
            move_forever: self.move_forever,
            overrun: self.overrun * cell_size,
            block_check: self.block_check,
            return_to_start_on_block: self.return_to_start_on_block,
            return_speed: self.return_speed.max(0.01) * cell_size,
            return_epsilon: self.return_stop_epsilon.max(1e-4) * cell_size,
            destroy_after_move: self.destroy_after_move,
            destroy_delay: self.destroy_delay,
        }
    }

    pub fn probe(&self, cell_size: f32, mask: LayerMask) -> BlockProbe {
        BlockProbe::new(
            cell_size,
            self.probe_ahead,
            self.line_width * cell_size,
            self.probe_radius_mul,
        )
        .with_mask(mask)
    }

    pub fn width_world(&self, cell_size: f32) -> f32 {
        self.line_width * cell_size
    }
}
