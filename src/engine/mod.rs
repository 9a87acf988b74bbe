//! The image engine seam.
//!
//! | Operation | Provided by |
//! |---|---|
//! | **Decode / encode** | [`RustEngine`] (`image` crate codecs) |
//! | **Crop** | [`PixelStore::extract`] |
//! | **Composite** | [`composite::composite`] with a [`CompositeOperator`] |
//! | **Capabilities** | [`Engine::can_decode`] / [`Engine::can_encode`] |
//!
//! The module is split into:
//! - **Pixels**: the quantum [`PixelStore`] the engine owns
//! - **Composite**: blend operators on quantum pixels
//! - **Backend**: [`Engine`] trait + [`EngineError`]
//! - **Rust engine**: the production [`Engine`]

pub mod backend;
pub mod composite;
pub mod pixels;
pub mod rust_engine;

pub use backend::{Decoded, Engine, EngineError};
pub use composite::CompositeOperator;
pub use pixels::{Colorspace, Pixel, PixelStore, Region};
pub use rust_engine::RustEngine;

use std::sync::{Arc, LazyLock};

static DEFAULT_ENGINE: LazyLock<Arc<dyn Engine>> = LazyLock::new(|| Arc::new(RustEngine::new()));

/// The process-wide engine used by images that were not given one explicitly.
pub fn default_engine() -> Arc<dyn Engine> {
    Arc::clone(&DEFAULT_ENGINE)
}
