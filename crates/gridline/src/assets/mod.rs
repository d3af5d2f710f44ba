pub mod config;
pub mod level;
