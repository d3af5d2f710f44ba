//! Lyon-based overlay tessellation.
//!
//! Preview and hint paths, head markers and debug hull outlines are drawn as
//! thin vector shapes on top of (or under) the ribbons. Everything is
//! tessellated on the CPU into a flat triangle-list buffer of
//! `OverlayVertex` records, rebuilt each frame the overlay is visible.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use lyon::math::point;
use lyon::path::{Path, Winding};
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, FillVertexConstructor,
    LineCap, LineJoin, StrokeOptions, StrokeTessellator, StrokeVertex,
    StrokeVertexConstructor, VertexBuffers,
};

use crate::components::line::HeadPose;
use crate::geometry::vec2::perp;

/// Per-vertex data for overlay shapes: x, y, r, g, b, a.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct OverlayVertex {
    pub x: f32,
    pub y: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl OverlayVertex {
    pub const FLOATS: usize = 6;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;
}

/// RGBA colour, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl OverlayColor {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Soft grey used for "show all paths".
    pub const PREVIEW: Self = Self::new(0.9, 0.9, 0.9, 0.8);
    /// Green used for the hinted piece.
    pub const HINT: Self = Self::new(0.2, 0.9, 0.25, 0.95);
    pub const HULL: Self = Self::new(1.0, 0.3, 0.2, 0.9);
    pub const HEAD: Self = Self::new(1.0, 1.0, 1.0, 1.0);
}

impl Default for OverlayColor {
    fn default() -> Self {
        Self::PREVIEW
    }
}

struct Ctor {
    color: OverlayColor,
}

impl Ctor {
    fn vertex(&self, p: lyon::math::Point) -> OverlayVertex {
        OverlayVertex {
            x: p.x,
            y: p.y,
            r: self.color.r,
            g: self.color.g,
            b: self.color.b,
            a: self.color.a,
        }
    }
}

impl FillVertexConstructor<OverlayVertex> for Ctor {
    fn new_vertex(&mut self, vertex: FillVertex) -> OverlayVertex {
        self.vertex(vertex.position())
    }
}

impl StrokeVertexConstructor<OverlayVertex> for Ctor {
    fn new_vertex(&mut self, vertex: StrokeVertex) -> OverlayVertex {
        self.vertex(vertex.position())
    }
}

fn polyline(points: &[Vec2], closed: bool) -> Path {
    let mut builder = Path::builder();
    builder.begin(point(points[0].x, points[0].y));
    for p in &points[1..] {
        builder.line_to(point(p.x, p.y));
    }
    builder.end(closed);
    builder.build()
}

/// Overlay tessellator and its output buffer.
pub struct OverlayState {
    fill_tess: FillTessellator,
    stroke_tess: StrokeTessellator,
    geometry: VertexBuffers<OverlayVertex, u32>,
    buffer: Vec<f32>,
    /// Flattening tolerance in world units.
    tolerance: f32,
}

impl OverlayState {
    /// `tolerance` should be a small fraction of a cell.
    pub fn new(tolerance: f32) -> Self {
        Self {
            fill_tess: FillTessellator::new(),
            stroke_tess: StrokeTessellator::new(),
            geometry: VertexBuffers::new(),
            buffer: Vec::with_capacity(4096 * OverlayVertex::FLOATS),
            tolerance: tolerance.max(1e-4),
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn vertex_count(&self) -> usize {
        self.buffer.len() / OverlayVertex::FLOATS
    }

    /// Flat triangle list, `OverlayVertex::FLOATS` per vertex.
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    fn flush_geometry(&mut self) {
        for &idx in &self.geometry.indices {
            let v = self.geometry.vertices[idx as usize];
            self.buffer.extend_from_slice(bytemuck::cast_slice(&[v]));
        }
        self.geometry.vertices.clear();
        self.geometry.indices.clear();
    }

    pub fn fill_path(&mut self, path: &Path, color: OverlayColor) {
        let result = self.fill_tess.tessellate_path(
            path,
            &FillOptions::tolerance(self.tolerance),
            &mut BuffersBuilder::new(&mut self.geometry, Ctor { color }),
        );
        match result {
            Ok(()) => self.flush_geometry(),
            Err(e) => {
                log::warn!("overlay fill failed: {:?}", e);
                self.geometry.vertices.clear();
                self.geometry.indices.clear();
            }
        }
    }

    pub fn stroke_path(&mut self, path: &Path, width: f32, color: OverlayColor) {
        let options = StrokeOptions::tolerance(self.tolerance)
            .with_line_width(width)
            .with_line_join(LineJoin::Round)
            .with_line_cap(LineCap::Round);
        let result = self.stroke_tess.tessellate_path(
            path,
            &options,
            &mut BuffersBuilder::new(&mut self.geometry, Ctor { color }),
        );
        match result {
            Ok(()) => self.flush_geometry(),
            Err(e) => {
                log::warn!("overlay stroke failed: {:?}", e);
                self.geometry.vertices.clear();
                self.geometry.indices.clear();
            }
        }
    }

    pub fn fill_polygon(&mut self, points: &[Vec2], color: OverlayColor) {
        if points.len() < 3 {
            return;
        }
        self.fill_path(&polyline(points, true), color);
    }

    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: OverlayColor) {
        if radius <= 0.0 {
            return;
        }
        let mut builder = Path::builder();
        builder.add_circle(point(center.x, center.y), radius, Winding::Positive);
        self.fill_path(&builder.build(), color);
    }

    /// Open polyline with round joins and caps.
    pub fn stroke_polyline(&mut self, points: &[Vec2], width: f32, color: OverlayColor) {
        if points.len() < 2 || width <= 0.0 {
            return;
        }
        self.stroke_path(&polyline(points, false), width, color);
    }

    pub fn stroke_polygon(&mut self, points: &[Vec2], width: f32, color: OverlayColor) {
        if points.len() < 3 || width <= 0.0 {
            return;
        }
        self.stroke_path(&polyline(points, true), width, color);
    }

    /// Dot at the head with a small arrow along its cardinal heading.
    pub fn head_marker(&mut self, pose: &HeadPose, size: f32, color: OverlayColor) {
        if size <= 0.0 {
            return;
        }
        self.fill_circle(pose.position, size * 0.5, color);
        let tip = pose.position + pose.forward * size;
        let side = perp(pose.forward) * (size * 0.35);
        let base = pose.position + pose.forward * (size * 0.45);
        self.fill_polygon(&[base - side, tip, base + side], color);
    }
}

impl Default for OverlayState {
    fn default() -> Self {
        Self::new(0.01)
    }
}
