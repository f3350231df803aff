use wasm_bindgen::prelude::*;

pub mod utils;
pub mod toon;
pub mod gradient;
pub mod structure;
pub mod assembler;
pub mod composer;
pub mod bridge;
pub mod overlay;
mod renderer;


#[wasm_bindgen(start)]
pub fn dummy_main() {
}


#[wasm_bindgen]
pub async fn run() {
    utils::set_panic_hook();
    renderer::main().await;
}
