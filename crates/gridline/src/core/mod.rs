pub mod arena;
pub mod time;
#[cfg(feature = "physics")]
pub mod physics;
