//! Memotile core crate.
//!
//! A canvas memory game for the browser: a fixed manifest of tile images is
//! preloaded up front, then a 20 Hz fixed-timestep loop drives deck updates
//! while rendering follows the browser's paint cadence. The pure pieces
//! (timestep math, batch loading, deck rules) also compile and test on the
//! host.

use wasm_bindgen::prelude::*;

pub mod game;
pub mod preload;
pub mod timestep;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

// -----------------------------------------------------------------------------
// Tile image manifest
// Order matters: the deck refers to faces by index into this list, and the
// preload batch keeps its slots in the same order.
// -----------------------------------------------------------------------------

pub const TILE_IMAGES: &[&str] = &[
    "assets/tiles/anchor.png",
    "assets/tiles/bell.png",
    "assets/tiles/cherry.png",
    "assets/tiles/clover.png",
    "assets/tiles/crown.png",
    "assets/tiles/diamond.png",
    "assets/tiles/feather.png",
    "assets/tiles/key.png",
    "assets/tiles/lantern.png",
    "assets/tiles/moon.png",
    "assets/tiles/shell.png",
    "assets/tiles/star.png",
];

// -----------------------------------------------------------------------------
// Entrypoints
// -----------------------------------------------------------------------------

/// Starts (or restarts) the game with the default 4x4 pairs layout.
#[wasm_bindgen]
pub fn start_game() -> Result<(), JsValue> {
    game::start(game::deck::DeckConfig::default())
}

/// Starts with a layout parsed from JSON, e.g.
/// `{"cols":6,"rows":4,"match_size":3}`.
#[cfg(feature = "serde_json")]
#[wasm_bindgen]
pub fn start_game_with_config(json: &str) -> Result<(), JsValue> {
    let config: game::deck::DeckConfig = serde_json::from_str(json)
        .map_err(|e| JsValue::from_str(&format!("bad deck config: {e}")))?;
    game::start(config)
}

/// Cancels the running frame loop. Best effort: at most one already-queued
/// frame may still run after this returns.
#[wasm_bindgen]
pub fn stop_game() {
    game::stop();
}
