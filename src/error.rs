//! Closed error taxonomy for every binding operation.
//!
//! Engine failures ([`EngineError`]) are translated exactly once, by the
//! `From` impl below, before they reach the execution core. The synchronous
//! and asynchronous entry points therefore observe the same [`MagickError`]
//! value: same kind, same message.
//!
//! Callers match on [`MagickError::kind`] or on a few stable message
//! substrings:
//!
//! | Kind | Stable substring |
//! |---|---|
//! | [`ErrorKind::Io`] | `unable to open image` |
//! | [`ErrorKind::PixelCountMismatch`] | `does not match the number of pixels` |

use crate::engine::EngineError;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MagickError {
    #[error("unable to open image '{path}': {reason}")]
    Io { path: String, reason: String },
    #[error("no decode delegate for this image format '{0}'")]
    UnsupportedFormat(String),
    #[error("unrecognized pixel map '{0}'")]
    UnsupportedLayout(String),
    #[error(
        "buffer of {actual} elements does not match the number of pixels \
         ({expected} elements expected)"
    )]
    PixelCountMismatch { expected: usize, actual: usize },
    #[error("geometry does not contain image: {0}")]
    Bounds(String),
    #[error("invalid argument: {0}")]
    InvalidValue(String),
}

/// Pattern-matchable tag for a [`MagickError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    UnsupportedFormat,
    UnsupportedLayout,
    PixelCountMismatch,
    Bounds,
    InvalidValue,
}

impl MagickError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MagickError::Io { .. } => ErrorKind::Io,
            MagickError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            MagickError::UnsupportedLayout(_) => ErrorKind::UnsupportedLayout,
            MagickError::PixelCountMismatch { .. } => ErrorKind::PixelCountMismatch,
            MagickError::Bounds(_) => ErrorKind::Bounds,
            MagickError::InvalidValue(_) => ErrorKind::InvalidValue,
        }
    }

    pub(crate) fn io(path: &Path, reason: impl ToString) -> Self {
        MagickError::Io {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<EngineError> for MagickError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Io { path, source } => MagickError::io(&path, source),
            EngineError::Decode { path, reason } => MagickError::io(&path, reason),
            EngineError::Encode { path, reason } => MagickError::io(&path, reason),
            EngineError::UnknownFormat(code) => MagickError::UnsupportedFormat(code),
        }
    }
}

/// Result type for binding operations.
pub type Result<T> = std::result::Result<T, MagickError>;
