pub mod frames;
pub mod wave;
pub mod mesh;
pub mod hull;
