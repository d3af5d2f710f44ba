pub mod vec2;
pub mod aabb;
