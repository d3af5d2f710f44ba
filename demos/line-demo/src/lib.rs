use wasm_bindgen::prelude::*;

#[cfg(feature = "vectors")]
gridline_web::export_board!("line-demo", vectors);
#[cfg(not(feature = "vectors"))]
gridline_web::export_board!("line-demo");

const INTRO: &str = include_str!("../levels/intro.json");

/// Load the bundled first level. Returns the number of pieces.
#[wasm_bindgen]
pub fn demo_load_intro() -> i32 {
    with_runner(|r| r.load_level(INTRO))
}
