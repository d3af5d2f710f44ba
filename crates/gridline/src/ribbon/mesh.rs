use std::f32::consts::FRAC_PI_2;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::frames::Frame;
use crate::geometry::aabb::Aabb;
use crate::geometry::vec2::{clamp01, lerp_f32};

/// Per-vertex ribbon data handed to the renderer.
/// 5 floats = 20 bytes per vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct RibbonVertex {
    pub x: f32,
    pub y: f32,
    /// Fraction of the ribbon length at this vertex.
    pub u: f32,
    /// 0 on the left edge, 1 on the right edge, 0.5 on the cap.
    pub v: f32,
    pub alpha: f32,
}

impl RibbonVertex {
    pub const FLOATS: usize = 5;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Rounded start cap settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapParams {
    pub enabled: bool,
    pub segments: u32,
    /// Cap radius relative to the ribbon half-width.
    pub radius_mul: f32,
}

impl CapParams {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Segment count actually used, 0 when the cap is off.
    pub fn effective_segments(&self) -> u32 {
        if self.enabled {
            self.segments.max(2)
        } else {
            0
        }
    }

    pub fn radius(&self, half_width: f32) -> f32 {
        half_width * self.radius_mul.max(0.01)
    }
}

impl Default for CapParams {
    fn default() -> Self {
        Self {
            enabled: true,
            segments: 10,
            radius_mul: 1.0,
        }
    }
}

/// Tail fade-in: alpha ramps from `start_alpha` at the tail to 1 over
/// `length` world units, shaped by `curve`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeParams {
    pub enabled: bool,
    pub length: f32,
    pub start_alpha: f32,
    pub curve: f32,
}

impl FadeParams {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn alpha_at(&self, dist: f32) -> f32 {
        if !self.enabled || self.length <= 1e-4 {
            return 1.0;
        }
        let x = clamp01(dist / self.length).powf(self.curve.max(0.01));
        lerp_f32(self.start_alpha, 1.0, x)
    }

    fn tail_alpha(&self) -> f32 {
        if self.enabled {
            self.start_alpha
        } else {
            1.0
        }
    }
}

impl Default for FadeParams {
    fn default() -> Self {
        Self {
            enabled: true,
            length: 1.2,
            start_alpha: 0.15,
            curve: 1.6,
        }
    }
}

/// Semicircle behind the tail, from `+normal` round to `-normal`.
pub(crate) fn cap_arc(center: Vec2, frame: Frame, radius: f32, segments: u32) -> impl Iterator<Item = Vec2> {
    (0..=segments).map(move |s| {
        let a = lerp_f32(FRAC_PI_2, -FRAC_PI_2, s as f32 / segments as f32);
        center + (-frame.tangent * a.cos() + frame.normal * a.sin()) * radius
    })
}

/// Triangulated ribbon. Buffers are cleared and refilled on every build so
/// their allocations carry over between frames.
#[derive(Debug, Clone, Default)]
pub struct RibbonMesh {
    vertices: Vec<RibbonVertex>,
    indices: Vec<u32>,
    cumulative: Vec<f32>,
}

impl RibbonMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertices(&self) -> &[RibbonVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.cumulative.clear();
    }

    /// Vertex data as a flat float slice.
    pub fn vertex_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn bounds(&self) -> Option<Aabb> {
        let mut it = self.vertices.iter().map(|v| v.position());
        let first = it.next()?;
        let (min, max) = it.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Aabb::new(min, max))
    }
}

/// Builds a constant-width quad strip with an optional rounded start cap.
#[derive(Debug, Clone, Copy)]
pub struct RibbonMeshBuilder {
    half_width: f32,
    cap: CapParams,
    fade: FadeParams,
}

impl RibbonMeshBuilder {
    pub fn new(width: f32) -> Self {
        Self {
            half_width: (width * 0.5).max(0.001),
            cap: CapParams::default(),
            fade: FadeParams::default(),
        }
    }

    pub fn with_cap(mut self, cap: CapParams) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_fade(mut self, fade: FadeParams) -> Self {
        self.fade = fade;
        self
    }

    pub fn half_width(&self) -> f32 {
        self.half_width
    }

    pub fn cap(&self) -> &CapParams {
        &self.cap
    }

    /// Rebuild `mesh` from displaced centerline points and their frames.
    /// Fewer than two points (or mismatched frames) leaves the mesh empty.
    pub fn build(&self, points: &[Vec2], frames: &[Frame], mesh: &mut RibbonMesh) {
        let n = points.len();
        mesh.clear();
        if n < 2 || frames.len() != n {
            return;
        }

        let cap_segments = self.cap.effective_segments();
        let cap_vertices = if cap_segments > 0 { cap_segments as usize + 2 } else { 0 };
        mesh.vertices.reserve(n * 2 + cap_vertices);
        mesh.indices.reserve((n - 1) * 6 + cap_segments as usize * 3);

        let mut total = 0.0;
        mesh.cumulative.push(0.0);
        for w in points.windows(2) {
            total += (w[1] - w[0]).length();
            mesh.cumulative.push(total);
        }
        let inv_total = if total > 1e-6 { 1.0 / total } else { 0.0 };

        for i in 0..n {
            let c = points[i];
            let nrm = frames[i].normal * self.half_width;
            let dist = mesh.cumulative[i];
            let u = dist * inv_total;
            let alpha = self.fade.alpha_at(dist);
            let left = c - nrm;
            let right = c + nrm;
            mesh.vertices.push(RibbonVertex { x: left.x, y: left.y, u, v: 0.0, alpha });
            mesh.vertices.push(RibbonVertex { x: right.x, y: right.y, u, v: 1.0, alpha });
        }

        for i in 0..(n - 1) as u32 {
            let a = i * 2;
            let (b, c, d) = (a + 1, a + 2, a + 3);
            mesh.indices.extend_from_slice(&[a, c, b, b, c, d]);
        }

        if cap_segments > 0 {
            let base = mesh.vertices.len() as u32;
            let alpha = self.fade.tail_alpha();
            let c0 = points[0];
            mesh.vertices.push(RibbonVertex { x: c0.x, y: c0.y, u: 0.0, v: 0.5, alpha });
            let radius = self.cap.radius(self.half_width);
            for p in cap_arc(c0, frames[0], radius, cap_segments) {
                mesh.vertices.push(RibbonVertex { x: p.x, y: p.y, u: 0.0, v: 0.5, alpha });
            }
            for s in 0..cap_segments {
                mesh.indices.extend_from_slice(&[base, base + 1 + s, base + 2 + s]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ribbon::frames::compute_frames;

    fn straight(n: usize) -> (Vec<Vec2>, Vec<Frame>) {
        let pts: Vec<Vec2> = (0..n).map(|i| Vec2::new(0.0, i as f32 * 0.5)).collect();
        let mut frames = Vec::new();
        compute_frames(&pts, &mut frames);
        (pts, frames)
    }

    #[test]
    fn ribbon_vertex_is_20_bytes() {
        assert_eq!(std::mem::size_of::<RibbonVertex>(), RibbonVertex::STRIDE_BYTES);
    }

    #[test]
    fn strip_counts_without_cap() {
        let (pts, frames) = straight(7);
        let mut mesh = RibbonMesh::new();
        RibbonMeshBuilder::new(0.2)
            .with_cap(CapParams::disabled())
            .build(&pts, &frames, &mut mesh);
        assert_eq!(mesh.vertex_count(), 14);
        assert_eq!(mesh.index_count(), 36);
        assert!(mesh.indices().iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn cap_adds_fan() {
        let (pts, frames) = straight(7);
        let mut mesh = RibbonMesh::new();
        let k = 6;
        RibbonMeshBuilder::new(0.2)
            .with_cap(CapParams { enabled: true, segments: k, radius_mul: 1.0 })
            .build(&pts, &frames, &mut mesh);
        assert_eq!(mesh.vertex_count(), 14 + 1 + (k as usize + 1));
        assert_eq!(mesh.index_count(), 36 + 3 * k as usize);

        // Arc points sit on the cap circle behind the tail.
        let c0 = pts[0];
        for v in &mesh.vertices()[15..] {
            assert!(((v.position() - c0).length() - 0.1).abs() < 1e-5);
            assert!(v.y <= c0.y + 1e-6);
        }
    }

    #[test]
    fn edges_at_half_width_with_uvs() {
        let (pts, frames) = straight(3);
        let mut mesh = RibbonMesh::new();
        RibbonMeshBuilder::new(0.4)
            .with_cap(CapParams::disabled())
            .build(&pts, &frames, &mut mesh);
        let v = mesh.vertices();
        assert!((v[0].position() - Vec2::new(0.2, 0.0)).length() < 1e-6);
        assert!((v[1].position() - Vec2::new(-0.2, 0.0)).length() < 1e-6);
        assert_eq!((v[0].u, v[0].v), (0.0, 0.0));
        assert_eq!((v[5].u, v[5].v), (1.0, 1.0));
        assert!((v[2].u - 0.5).abs() < 1e-6);
    }

    #[test]
    fn fade_ramps_alpha_from_the_tail() {
        let (pts, frames) = straight(9);
        let mut mesh = RibbonMesh::new();
        RibbonMeshBuilder::new(0.2)
            .with_cap(CapParams::disabled())
            .with_fade(FadeParams { enabled: true, length: 2.0, start_alpha: 0.2, curve: 1.6 })
            .build(&pts, &frames, &mut mesh);
        let alphas: Vec<f32> = mesh.vertices().iter().step_by(2).map(|v| v.alpha).collect();
        assert!((alphas[0] - 0.2).abs() < 1e-6);
        assert!(alphas.windows(2).all(|w| w[1] >= w[0]));
        assert!((alphas.last().unwrap() - 1.0).abs() < 1e-6);
        // Curve exponent > 1 keeps the ramp below linear halfway through.
        assert!(alphas[2] < 0.6);
    }

    #[test]
    fn degenerate_input_clears_mesh() {
        let (pts, frames) = straight(4);
        let mut mesh = RibbonMesh::new();
        let builder = RibbonMeshBuilder::new(0.2);
        builder.build(&pts, &frames, &mut mesh);
        assert!(!mesh.is_empty());
        builder.build(&pts[..1], &frames[..1], &mut mesh);
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.index_count(), 0);
        assert!(mesh.bounds().is_none());
    }

    #[test]
    fn rebuild_reuses_allocation() {
        let (pts, frames) = straight(20);
        let mut mesh = RibbonMesh::new();
        let builder = RibbonMeshBuilder::new(0.2);
        builder.build(&pts, &frames, &mut mesh);
        let ptr = mesh.vertices().as_ptr();
        builder.build(&pts, &frames, &mut mesh);
        assert_eq!(ptr, mesh.vertices().as_ptr());
    }
}
