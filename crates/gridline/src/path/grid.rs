use glam::Vec2;

use crate::api::types::GridCoord;
use crate::geometry::aabb::Aabb;

/// Maps grid cells to world space.
pub trait CellMapper {
    /// World-space centre of a cell.
    fn cell_to_world(&self, cell: GridCoord) -> Vec2;
    /// Side length of one cell in world units.
    fn cell_size(&self) -> f32;
}

/// Rectangular grid with square cells, `origin` at the corner of cell (0, 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub width: i32,
    pub height: i32,
    pub cell_size: f32,
    pub origin: Vec2,
}

impl GridLayout {
    pub fn new(width: i32, height: i32, cell_size: f32) -> Self {
        Self {
            width,
            height,
            cell_size: cell_size.max(1e-4),
            origin: Vec2::ZERO,
        }
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    pub fn is_inside(&self, cell: GridCoord) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Cell containing a world point (may be outside the grid).
    pub fn world_to_cell(&self, p: Vec2) -> GridCoord {
        let local = (p - self.origin) / self.cell_size;
        GridCoord::new(local.x.floor() as i32, local.y.floor() as i32)
    }

    /// World rectangle covered by the grid.
    pub fn bounds(&self) -> Aabb {
        let size = Vec2::new(self.width as f32, self.height as f32) * self.cell_size;
        Aabb::new(self.origin, self.origin + size)
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new(8, 8, 1.0)
    }
}

impl CellMapper for GridLayout {
    fn cell_to_world(&self, cell: GridCoord) -> Vec2 {
        self.origin + (Vec2::new(cell.x as f32, cell.y as f32) + Vec2::splat(0.5)) * self.cell_size
    }

    fn cell_size(&self) -> f32 {
        self.cell_size
    }
}
