pub mod grid;
pub mod arc_length;
pub mod corners;
pub mod bake;
