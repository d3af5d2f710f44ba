pub mod types;
pub mod listener;
pub mod board;
