//! Copying between external numeric buffers and engine pixel storage.
//!
//! The converters are generic over [`QuantumDomain`] and monomorphised once
//! per numeric domain. [`PixelData`] is the tagged union used where the
//! domain is only known at runtime (the async entry points and the CLI); it
//! dispatches into the generic code exactly once, at the call boundary.
//!
//! Validation always completes before anything is written:
//!
//! 1. buffer length must equal `width * height * layout.channels()`
//!    ([`MagickError::PixelCountMismatch`])
//! 2. an export rectangle must lie inside the source ([`MagickError::Bounds`])
//! 3. zero-sized extents are rejected ([`MagickError::InvalidValue`])
//!
//! Import never edits an existing store; it builds a fresh one that the
//! caller swaps in.

use crate::engine::{Colorspace, Pixel, PixelStore};
use crate::error::{MagickError, Result};
use crate::layout::{ChannelRole, Layout};
use crate::quantum::{NumericDomain, Quantum, QuantumDomain};
use rayon::prelude::*;
use std::any::Any;
use tracing::trace;

/// An owned external pixel buffer in one of the six numeric domains.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! dispatch {
    ($data:expr, $buf:ident => $body:expr) => {
        match $data {
            PixelData::U8($buf) => $body,
            PixelData::U16($buf) => $body,
            PixelData::U32($buf) => $body,
            PixelData::U64($buf) => $body,
            PixelData::F32($buf) => $body,
            PixelData::F64($buf) => $body,
        }
    };
}

macro_rules! impl_from_vec {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<Vec<$t>> for PixelData {
                fn from(v: Vec<$t>) -> Self {
                    PixelData::$variant(v)
                }
            }
        )*
    };
}

impl_from_vec!(u8 => U8, u16 => U16, u32 => U32, u64 => U64, f32 => F32, f64 => F64);

impl PixelData {
    /// A zero-filled buffer of `len` elements.
    pub fn zeroed(domain: NumericDomain, len: usize) -> Self {
        match domain {
            NumericDomain::U8 => PixelData::U8(vec![0; len]),
            NumericDomain::U16 => PixelData::U16(vec![0; len]),
            NumericDomain::U32 => PixelData::U32(vec![0; len]),
            NumericDomain::U64 => PixelData::U64(vec![0; len]),
            NumericDomain::F32 => PixelData::F32(vec![0.0; len]),
            NumericDomain::F64 => PixelData::F64(vec![0.0; len]),
        }
    }

    pub fn domain(&self) -> NumericDomain {
        match self {
            PixelData::U8(_) => NumericDomain::U8,
            PixelData::U16(_) => NumericDomain::U16,
            PixelData::U32(_) => NumericDomain::U32,
            PixelData::U64(_) => NumericDomain::U64,
            PixelData::F32(_) => NumericDomain::F32,
            PixelData::F64(_) => NumericDomain::F64,
        }
    }

    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the elements if this buffer holds domain `T`.
    pub fn as_slice<T: QuantumDomain>(&self) -> Option<&[T]> {
        dispatch!(self, v => (v as &dyn Any).downcast_ref::<Vec<T>>().map(Vec::as_slice))
    }

    /// Take the elements if this buffer holds domain `T`.
    pub fn into_vec<T: QuantumDomain>(self) -> Option<Vec<T>> {
        dispatch!(self, v => (Box::new(v) as Box<dyn Any>).downcast::<Vec<T>>().ok().map(|b| *b))
    }
}

/// Element count a `width` x `height` buffer in `layout` must have.
pub fn expected_len(width: u32, height: u32, layout: Layout) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(layout.channels()))
        .ok_or_else(|| MagickError::InvalidValue(format!("{width}x{height} pixel buffer is too large")))
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(MagickError::PixelCountMismatch { expected, actual });
    }
    Ok(())
}

fn check_nonzero(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(MagickError::InvalidValue(format!(
            "pixel extent {width}x{height} is empty"
        )));
    }
    Ok(())
}

fn colorspace_for(layout: Layout) -> Colorspace {
    if layout.is_cmyk() {
        Colorspace::Cmyk
    } else if layout.is_gray() {
        Colorspace::Gray
    } else {
        Colorspace::Srgb
    }
}

fn pixel_from<T: QuantumDomain>(chunk: &[T], roles: &[ChannelRole]) -> Pixel {
    let mut px = Pixel::default();
    for (&v, role) in chunk.iter().zip(roles) {
        let q = v.to_quantum();
        match role {
            ChannelRole::Red | ChannelRole::Cyan => px.red = q,
            ChannelRole::Green | ChannelRole::Magenta => px.green = q,
            ChannelRole::Blue | ChannelRole::Yellow => px.blue = q,
            ChannelRole::Black => px.black = q,
            ChannelRole::Alpha => px.alpha = q,
            ChannelRole::Gray => {
                px.red = q;
                px.green = q;
                px.blue = q;
            }
            ChannelRole::Padding => {}
        }
    }
    px
}

fn channel(px: Pixel, colorspace: Colorspace, role: ChannelRole) -> Quantum {
    match role {
        ChannelRole::Alpha => px.alpha,
        ChannelRole::Padding => 0,
        ChannelRole::Gray => match colorspace {
            Colorspace::Gray => px.red,
            Colorspace::Cmyk => px.cmyk_to_rgb().luma(),
            Colorspace::Srgb => px.luma(),
        },
        ChannelRole::Red | ChannelRole::Green | ChannelRole::Blue => {
            let rgb = if colorspace == Colorspace::Cmyk {
                px.cmyk_to_rgb()
            } else {
                px
            };
            match role {
                ChannelRole::Red => rgb.red,
                ChannelRole::Green => rgb.green,
                _ => rgb.blue,
            }
        }
        ChannelRole::Cyan | ChannelRole::Magenta | ChannelRole::Yellow | ChannelRole::Black => {
            let cmyk = if colorspace == Colorspace::Cmyk {
                px
            } else {
                px.rgb_to_cmyk()
            };
            match role {
                ChannelRole::Cyan => cmyk.red,
                ChannelRole::Magenta => cmyk.green,
                ChannelRole::Yellow => cmyk.blue,
                _ => cmyk.black,
            }
        }
    }
}

/// Build a `width` x `height` store from `buffer`, interpreted through `layout`.
///
/// The store's alpha trait and colorspace follow the layout.
pub fn import_pixels<T: QuantumDomain>(width: u32, height: u32, layout: Layout, buffer: &[T]) -> Result<PixelStore> {
    check_len(expected_len(width, height, layout)?, buffer.len())?;
    check_nonzero(width, height)?;
    trace!(width, height, layout = %layout, domain = %T::DOMAIN, "importing pixels");

    let roles = layout.roles();
    let pixels: Vec<Pixel> = buffer
        .par_chunks_exact(layout.channels())
        .map(|chunk| pixel_from(chunk, roles))
        .collect();

    let mut store = PixelStore::from_pixels(width, height, pixels, layout.has_alpha())
        .ok_or_else(|| MagickError::InvalidValue("pixel count changed during import".into()))?;
    store.set_colorspace(colorspace_for(layout));
    Ok(store)
}

/// Copy the `width` x `height` rectangle at (`x`, `y`) of `store` into `buffer`.
///
/// `buffer` is untouched unless the call succeeds.
pub fn export_pixels<T: QuantumDomain>(
    store: &PixelStore,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    layout: Layout,
    buffer: &mut [T],
) -> Result<()> {
    check_len(expected_len(width, height, layout)?, buffer.len())?;
    if u64::from(x) + u64::from(width) > u64::from(store.width())
        || u64::from(y) + u64::from(height) > u64::from(store.height())
    {
        return Err(MagickError::Bounds(format!(
            "{width}x{height}+{x}+{y} exceeds {}x{}",
            store.width(),
            store.height()
        )));
    }
    check_nonzero(width, height)?;
    trace!(x, y, width, height, layout = %layout, domain = %T::DOMAIN, "exporting pixels");

    let roles = layout.roles();
    let colorspace = store.colorspace();
    let stride = layout.channels();
    let (x, w) = (x as usize, width as usize);
    buffer
        .par_chunks_exact_mut(w * stride)
        .enumerate()
        .for_each(|(row, out)| {
            let src = &store.row(y + row as u32)[x..x + w];
            for (px, slot) in src.iter().zip(out.chunks_exact_mut(stride)) {
                for (v, &role) in slot.iter_mut().zip(roles) {
                    *v = T::from_quantum(channel(*px, colorspace, role));
                }
            }
        });
    Ok(())
}

/// [`import_pixels`] for a runtime-tagged buffer.
pub fn import_data(width: u32, height: u32, layout: Layout, data: &PixelData) -> Result<PixelStore> {
    dispatch!(data, v => import_pixels(width, height, layout, v))
}

/// [`export_pixels`] into a runtime-tagged buffer.
pub fn export_data(
    store: &PixelStore,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    layout: Layout,
    data: &mut PixelData,
) -> Result<()> {
    dispatch!(data, v => export_pixels(store, x, y, width, height, layout, v))
}
