//! Pixel Portfolio FX core crate.
//!
//! Decorative effects for the portfolio page: a pulsing pixel-field canvas,
//! a bounded pool of drifting particles, pointer/scroll micro-interactions and
//! a one-way frame-rate governor. The page calls `start_effects()` (or
//! `start_effects_with_config(json)`) once the DOM is ready and keeps the
//! returned handle to `destroy()` it later.
//!
//! The effect logic (pixel generation, particle arena, governor, timing) is
//! plain Rust behind small traits so it runs under `cargo test` on the host;
//! the web-sys halves live next to it in each module.

use wasm_bindgen::prelude::*;

pub mod app;
pub mod clock;
pub mod config;
pub mod dom;
pub mod effects;
pub mod error;
pub mod governor;
pub mod particles;
pub mod pixels;
pub mod rng;
pub mod style;

pub use app::PortfolioEffects;
pub use config::EffectsConfig;
pub use error::EffectsError;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    // A second init (e.g. hot reload) only fails because a logger exists.
    let _ = console_log::init_with_level(log::Level::Info);
}

// -----------------------------------------------------------------------------
// Entrypoints
// -----------------------------------------------------------------------------

#[wasm_bindgen]
pub fn start_effects() -> Result<PortfolioEffects, JsValue> {
    Ok(app::start(EffectsConfig::default())?)
}

/// Same as `start_effects` with a partial JSON config; unknown keys are ignored.
#[cfg(feature = "serde_json")]
#[wasm_bindgen]
pub fn start_effects_with_config(json: &str) -> Result<PortfolioEffects, JsValue> {
    let cfg = EffectsConfig::from_json(json)?;
    Ok(app::start(cfg)?)
}
