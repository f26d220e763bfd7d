//! ollama-chat Web Frontend
//!
//! Leptos-based WASM frontend: chat list, model picker and a streamed
//! conversation view.

mod app;
mod pages;
mod components;
mod api;
mod stream;

pub use app::App;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    leptos::mount::mount_to_body(App);
}
