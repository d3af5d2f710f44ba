pub mod runner;

pub use runner::BoardRunner;

/// Generate all `#[wasm_bindgen]` exports for a board.
///
/// Expands to:
/// - `thread_local!` storage for the BoardRunner
/// - `with_runner()` helper function
/// - All wasm-bindgen exports (board_init, board_tick, input setters, buffer accessors)
///
/// # Usage
///
/// ```ignore
/// use wasm_bindgen::prelude::*;
///
/// gridline_web::export_board!("my-puzzle");
/// ```
///
/// The calling crate needs `wasm-bindgen`, `log`, `console_log` and
/// `console_error_panic_hook` as dependencies.
///
/// # Arguments
///
/// - `$board_name`: A string literal used in the initialization log message
#[macro_export]
macro_rules! export_board {
    ($board_name:literal) => {
        use std::cell::RefCell;

        thread_local! {
            static RUNNER: RefCell<Option<$crate::BoardRunner>> = RefCell::new(None);
        }

        fn with_runner<R>(f: impl FnOnce(&mut $crate::BoardRunner) -> R) -> R {
            RUNNER.with(|cell| {
                let mut borrow = cell.borrow_mut();
                let runner = borrow.as_mut().expect("Board not initialized. Call board_init() first.");
                f(runner)
            })
        }

        /// `config_json` is a `BoardConfig`; pass `"{}"` for defaults.
        #[wasm_bindgen]
        pub fn board_init(config_json: &str) {
            console_error_panic_hook::set_once();
            let _ = console_log::init_with_level(log::Level::Info);

            let runner = $crate::BoardRunner::from_config_json(config_json);
            RUNNER.with(|cell| {
                *cell.borrow_mut() = Some(runner);
            });
            log::info!("{}: initialized", $board_name);
        }

        #[wasm_bindgen]
        pub fn board_load_level(json: &str) -> i32 {
            with_runner(|r| r.load_level(json))
        }

        #[wasm_bindgen]
        pub fn board_tick(dt: f32) {
            with_runner(|r| r.tick(dt));
        }

        #[wasm_bindgen]
        pub fn board_pointer_down(x: f32, y: f32) {
            with_runner(|r| r.push_input($crate::gridline::InputEvent::PointerDown { x, y }));
        }

        #[wasm_bindgen]
        pub fn board_set_erase_mode(on: bool) {
            with_runner(|r| r.push_input($crate::gridline::InputEvent::SetEraseMode { on }));
        }

        #[wasm_bindgen]
        pub fn board_set_accepting_input(on: bool) {
            with_runner(|r| r.push_input($crate::gridline::InputEvent::SetAcceptingInput { on }));
        }

        #[wasm_bindgen]
        pub fn board_set_preview(on: bool) {
            with_runner(|r| r.push_input($crate::gridline::InputEvent::SetPreview { on }));
        }

        #[wasm_bindgen]
        pub fn board_hint(line: u32) {
            with_runner(|r| r.push_input($crate::gridline::InputEvent::Hint { line }));
        }

        #[wasm_bindgen]
        pub fn board_reset() {
            with_runner(|r| r.push_input($crate::gridline::InputEvent::Reset));
        }

        #[wasm_bindgen]
        pub fn board_raw_input(kind: u32, a: f32, b: f32) {
            with_runner(|r| r.push_raw_input(kind, a, b));
        }

        // ---- Data accessors ----

        #[wasm_bindgen]
        pub fn get_buffer_ptr() -> *const f32 {
            with_runner(|r| r.buffer_ptr())
        }

        #[wasm_bindgen]
        pub fn get_buffer_total_floats() -> u32 {
            with_runner(|r| r.buffer_total_floats())
        }

        #[wasm_bindgen]
        pub fn get_vertex_count() -> u32 {
            with_runner(|r| r.vertex_count())
        }

        #[wasm_bindgen]
        pub fn get_index_count() -> u32 {
            with_runner(|r| r.index_count())
        }

        #[wasm_bindgen]
        pub fn get_event_count() -> u32 {
            with_runner(|r| r.event_count())
        }

        #[wasm_bindgen]
        pub fn get_head_count() -> u32 {
            with_runner(|r| r.head_count())
        }

        #[wasm_bindgen]
        pub fn get_active_lines() -> u32 {
            with_runner(|r| r.active_lines())
        }

        // ---- Capacity accessors ----

        #[wasm_bindgen]
        pub fn get_max_vertices() -> u32 {
            with_runner(|r| r.layout().max_vertices as u32)
        }

        #[wasm_bindgen]
        pub fn get_max_indices() -> u32 {
            with_runner(|r| r.layout().max_indices as u32)
        }

        #[wasm_bindgen]
        pub fn get_max_events() -> u32 {
            with_runner(|r| r.layout().max_events as u32)
        }

        #[wasm_bindgen]
        pub fn get_max_heads() -> u32 {
            with_runner(|r| r.layout().max_heads as u32)
        }
    };

    // Variant with vectors feature
    ($board_name:literal, vectors) => {
        $crate::export_board!($board_name);

        // ---- Overlay accessors (only when vectors feature is enabled) ----

        #[wasm_bindgen]
        pub fn get_overlay_vertex_count() -> u32 {
            with_runner(|r| r.overlay_vertex_count())
        }

        #[wasm_bindgen]
        pub fn get_max_overlay_vertices() -> u32 {
            with_runner(|r| r.layout().max_overlay_vertices as u32)
        }
    };
}

#[doc(hidden)]
pub use gridline;
