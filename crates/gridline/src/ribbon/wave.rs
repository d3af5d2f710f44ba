//! Lateral wave deformation of a sliding centerline window.
//!
//! Samples are spaced uniformly over the path length and shifted by the
//! piece's moving offset. Each sample is pushed sideways by a sine whose
//! phase comes from the world coordinate along the grid axis the sample is
//! travelling on, so every piece on the same row or column waves in step.
//! Near corners the amplitude is pulled down toward a multiplier, and a small
//! box filter removes the kinks that per-sample weighting introduces.

use std::f32::consts::TAU;

use glam::Vec2;

use super::frames::{compute_frames, Frame};
use crate::geometry::vec2::{clamp01, lerp_f32};
use crate::path::bake::BakedPath;

/// Largest lateral offset, as a fraction of a cell.
pub const MAX_OFFSET_CELLS: f32 = 0.35;
/// Largest configurable amplitude, as a fraction of a cell.
pub const MAX_AMPLITUDE_CELLS: f32 = 0.45;

/// Wave tunables. Lengths are in cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    pub amplitude: f32,
    pub wavelength: f32,
    pub samples_per_cell: f32,
    /// Arc-length radius around a corner where damping applies.
    pub corner_protect: f32,
    pub protect_curve: f32,
    /// Fraction of the full amplitude kept on a corner.
    pub corner_amp_mul: f32,
    pub corner_sharpness: f32,
    pub smooth_iterations: u32,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            amplitude: 0.22,
            wavelength: 2.2,
            samples_per_cell: 18.0,
            corner_protect: 1.05,
            protect_curve: 0.35,
            corner_amp_mul: 0.25,
            corner_sharpness: 2.0,
            smooth_iterations: 2,
        }
    }
}

/// Number of samples for a path of `total` world length.
pub fn sample_count(total: f32, cell_size: f32, samples_per_cell: f32) -> usize {
    let cells = total / cell_size.max(1e-4);
    ((cells * samples_per_cell).ceil() as usize).max(2)
}

/// Damping from the bend between a sample's neighbours: 0 when they point the
/// same way, 1 at a right angle or sharper.
pub fn curvature_weight(t_prev: Vec2, t_next: Vec2, sharpness: f32) -> f32 {
    let d = t_prev.dot(t_next).clamp(-1.0, 1.0);
    clamp01(1.0 - d).powf(sharpness.max(0.01))
}

/// Amplitude after corner damping with weight `w` in `[0, 1]`.
pub fn damped_amplitude(full: f32, corner_mul: f32, w: f32) -> f32 {
    lerp_f32(full, full * corner_mul, clamp01(w))
}

/// 3-tap `[1 2 1] / 4` filter applied `iterations` times, endpoints held.
pub fn smooth_1d(values: &mut [f32], iterations: u32, scratch: &mut Vec<f32>) {
    let n = values.len();
    if n < 3 {
        return;
    }
    for _ in 0..iterations {
        scratch.clear();
        scratch.extend_from_slice(values);
        for i in 1..n - 1 {
            values[i] = (scratch[i - 1] + scratch[i] * 2.0 + scratch[i + 1]) * 0.25;
        }
    }
}

/// Whether a tangent runs along the grid's Y axis (ties go vertical).
#[inline]
pub fn is_vertical(tangent: Vec2) -> bool {
    tangent.y.abs() >= tangent.x.abs()
}

/// Per-frame wave evaluator. Holds its sample buffers so repeated rebuilds
/// do not allocate once the sample count settles.
#[derive(Debug, Clone, Default)]
pub struct WaveDisplacement {
    params: WaveParams,
    centers: Vec<Vec2>,
    frames: Vec<Frame>,
    amplitudes: Vec<f32>,
    offsets: Vec<f32>,
    displaced: Vec<Vec2>,
    scratch: Vec<f32>,
}

impl WaveDisplacement {
    pub fn new(params: WaveParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn params(&self) -> &WaveParams {
        &self.params
    }

    pub fn set_params(&mut self, params: WaveParams) {
        self.params = params;
    }

    /// Sample the window `[offset, total + offset]` of `path` and displace it.
    ///
    /// `wave_origin` anchors the phase coordinate (the centre of cell (0, 0)),
    /// `phase` is the piece's current wave phase in radians.
    pub fn compute(
        &mut self,
        path: &BakedPath,
        cell_size: f32,
        wave_origin: Vec2,
        moving_offset: f32,
        phase: f32,
    ) -> &[Vec2] {
        let p = self.params;
        let cs = cell_size.max(1e-4);
        let total = path.total_length();
        let n = sample_count(total, cs, p.samples_per_cell);

        let amp = p.amplitude.clamp(0.0, MAX_AMPLITUDE_CELLS) * cs;
        let wavelength = (p.wavelength * cs).max(1e-4);
        let max_offset = MAX_OFFSET_CELLS * cs;
        let protect = p.corner_protect.max(0.0) * cs;
        let k = TAU / wavelength;

        self.centers.clear();
        for i in 0..n {
            let s = sample_distance(i, n, total) + moving_offset;
            self.centers.push(path.table.point_at(s));
        }
        compute_frames(&self.centers, &mut self.frames);

        self.amplitudes.clear();
        self.offsets.clear();
        for i in 0..n {
            let s = sample_distance(i, n, total) + moving_offset;
            let protect_w = path.corners.protection_weight(s, protect, p.protect_curve);
            let bend_w = if i > 0 && i < n - 1 {
                curvature_weight(
                    self.frames[i - 1].tangent,
                    self.frames[i + 1].tangent,
                    p.corner_sharpness,
                )
            } else {
                0.0
            };
            let amp_used = damped_amplitude(amp, p.corner_amp_mul, protect_w.max(bend_w));

            let c = self.centers[i];
            let coord = if is_vertical(self.frames[i].tangent) {
                c.y - wave_origin.y
            } else {
                c.x - wave_origin.x
            };
            let w = ((k * coord + phase).sin() * amp_used).clamp(-max_offset, max_offset);
            self.amplitudes.push(amp_used);
            self.offsets.push(w);
        }

        smooth_1d(&mut self.offsets, p.smooth_iterations, &mut self.scratch);

        self.displaced.clear();
        for i in 0..n {
            let axis = if is_vertical(self.frames[i].tangent) {
                Vec2::X
            } else {
                Vec2::Y
            };
            self.displaced.push(self.centers[i] + axis * self.offsets[i]);
        }
        &self.displaced
    }

    /// Undisplaced sample positions from the last `compute`.
    pub fn centers(&self) -> &[Vec2] {
        &self.centers
    }

    /// Lateral offsets from the last `compute`, after smoothing.
    pub fn offsets(&self) -> &[f32] {
        &self.offsets
    }

    /// Corner-damped amplitude per sample from the last `compute`.
    pub fn amplitudes(&self) -> &[f32] {
        &self.amplitudes
    }

    /// Displaced sample positions from the last `compute`.
    pub fn displaced(&self) -> &[Vec2] {
        &self.displaced
    }
}

fn sample_distance(i: usize, n: usize, total: f32) -> f32 {
    if n < 2 {
        0.0
    } else {
        i as f32 / (n - 1) as f32 * total
    }
}
