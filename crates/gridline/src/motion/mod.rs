pub mod probe;
pub mod controller;
