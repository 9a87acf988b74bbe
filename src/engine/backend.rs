//! Engine trait and shared types.
//!
//! The [`Engine`] trait is the narrow interface through which the binding
//! reaches the image engine: decode, encode, crop, composite, and format
//! capability queries. Everything above it (marshalling, the resource
//! handle, the dual sync/async core) is engine-agnostic.
//!
//! The production implementation is
//! [`RustEngine`](super::rust_engine::RustEngine), built on the `image` crate.

use super::composite::{self, CompositeOperator};
use super::pixels::{PixelStore, Region};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure raised inside the engine. Translated to
/// [`MagickError`](crate::MagickError) at the binding boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },
    #[error("unknown image format: {0}")]
    UnknownFormat(String),
}

/// Result of a decode: the pixels plus the format code they were read as.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub pixels: PixelStore,
    pub format: String,
}

/// Interface to the image engine.
///
/// `decode`/`encode` and the capability queries must be provided; crop and
/// composite default to the pure pixel-store implementations.
pub trait Engine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Read and decode the file at `path`.
    ///
    /// `format` forces a format code instead of sniffing the file.
    fn decode(&self, path: &Path, format: Option<&str>) -> Result<Decoded, EngineError>;

    /// Encode `pixels` as `format` and write them to `path`.
    fn encode(&self, pixels: &PixelStore, format: &str, path: &Path) -> Result<(), EngineError>;

    fn can_decode(&self, format: &str) -> bool;

    fn can_encode(&self, format: &str) -> bool;

    /// Copy of `region` as a new store.
    fn crop(&self, pixels: &PixelStore, region: Region) -> PixelStore {
        pixels.extract(region)
    }

    /// Blend `src` into `dst` at (`x`, `y`), clipping to `dst`.
    fn composite(
        &self,
        dst: &mut PixelStore,
        src: &PixelStore,
        x: i64,
        y: i64,
        op: CompositeOperator,
    ) -> usize {
        composite::composite(dst, src, x, y, op)
    }
}
