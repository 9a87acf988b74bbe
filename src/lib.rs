//! # magick-bind
//!
//! Value types and a resource handle over a quantum-depth image engine, with
//! every image operation available both blocking and non-blocking.
//!
//! ```no_run
//! use magick_bind::{Color, CompositeOperator, Geometry, Image};
//!
//! # fn main() -> magick_bind::Result<()> {
//! let mut im = Image::open("wizard.png")?;
//! let tint = Image::from_color(im.size(), &Color::rgba(0, 65535, 0, 32768));
//! im.composite(&tint, Geometry::new(0, 0), CompositeOperator::Multiply)?;
//!
//! // Same operation, off the calling thread.
//! im.crop_async("10x8+1+8".parse()?).wait()?;
//! im.write_async("out.png").wait()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! caller → Geometry / Color → Image op ─┬─ sync:  calling thread ─┐
//!                                       └─ async: worker pool  ───┴→ Engine
//!                                                                     │
//!        raw buffers ⇄ marshal (quantum scaling + layout) ⇄ PixelStore
//!        engine failures → MagickError (translated once)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`quantum`] | Scaling between the six external numeric domains and 16-bit quanta |
//! | [`layout`] | Named channel layouts (`"RGBA"`, `"Gray"`, `"CMYK"`, ...) |
//! | [`marshal`] | Import/export of raw pixel buffers, validated before any write |
//! | [`geometry`] | `Geometry` value type (`"WxH+X+Y"`) |
//! | [`color`] | `Color` value type (names, hex, `rgb()`, `cmyk()`) |
//! | [`coder`] | Format registry query (`CoderInfo`, `coder_info_list`) |
//! | [`image`] | `Image` resource handle with sync and `_async` entry points |
//! | [`pool`] | Bounded worker pool and `Deferred` results |
//! | [`engine`] | Engine seam: decode/encode/crop/composite over a `PixelStore` |
//! | [`error`] | Closed error taxonomy with stable message substrings |
//! | [`config`] | `magick.toml` loading, merging and validation |
//!
//! # Design Decisions
//!
//! ## Deep Copies Only
//!
//! `Image::clone` duplicates the pixel store. There is no copy-on-write and
//! no way for two `Image` values to alias one store, so a crop or pixel
//! write on one image can never show through another.
//!
//! ## One Closure, Two Paths
//!
//! Every operation body is a single closure over the image state. The sync
//! entry point runs it on the calling thread; the async one moves it onto the
//! pool. Errors are translated from [`engine::EngineError`] before that
//! closure returns, so both paths observe the same [`MagickError`].
//!
//! ## Fixed 16-bit Quantum
//!
//! The engine stores every channel as a `u16`. `u8` and `u16` buffers
//! survive an import/export round trip exactly; `u32`, `u64` and the float
//! domains are rounded to the nearest quantum.

pub mod coder;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod image;
pub mod layout;
pub mod marshal;
pub mod pool;
pub mod quantum;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use coder::{CoderInfo, coder_info_list};
pub use color::{Color, PixelType};
pub use engine::CompositeOperator;
pub use error::{ErrorKind, MagickError, Result};
pub use geometry::Geometry;
pub use image::Image;
pub use layout::{ChannelRole, Layout};
pub use marshal::PixelData;
pub use pool::Deferred;
pub use quantum::{NumericDomain, QUANTUM_MAX, Quantum, QuantumDomain};
