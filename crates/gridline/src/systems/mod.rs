#[cfg(feature = "vectors")]
pub mod overlay;
