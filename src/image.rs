//! `Image`: the resource handle and its dual sync/async operations.
//!
//! ## Ownership
//!
//! An `Image` owns its pixel store exclusively. `Clone` is a deep copy, so
//! cropping or painting one image is never visible through another.
//!
//! ## Execution
//!
//! Each operation is written once, as a closure over the image state, and
//! run two ways:
//!
//! | Entry point | Where it runs | Outcome |
//! |---|---|---|
//! | `op(..)` | calling thread | `Result<T>` |
//! | `op_async(..)` | [worker pool](crate::pool) | [`Deferred<T>`] |
//!
//! Both paths execute the same closure, so results and errors are identical.
//! The state sits behind a lock that each operation holds while it touches
//! the state. Pixel buffer conversion runs outside it, on a private copy or
//! before the swap. The order between async tasks on one image is only fixed
//! when the caller chains them with [`Deferred::then`].
//!
//! Sync mutators take `&mut self`, so the borrow checker rules out a
//! concurrent caller. Async mutators take `&self`: the queued task keeps its
//! own handle on the state after the call returns, so no borrow could cover
//! it anyway. Exclusion on that path comes from the internal lock alone.
//!
//! ## Formats
//!
//! `read` records the decoded format. `write` picks the output format from,
//! in order: a `FMT:` path prefix, the path extension, [`Image::set_magick`],
//! then `[output] default_format` from the [config](crate::config).

use crate::coder;
use crate::color::{Color, PixelType};
use crate::config;
use crate::engine::{Colorspace, CompositeOperator, Engine, PixelStore, Region, default_engine};
use crate::error::{MagickError, Result};
use crate::geometry::Geometry;
use crate::layout::Layout;
use crate::marshal::{self, PixelData};
use crate::pool::{self, Deferred};
use crate::quantum::{QUANTUM_MAX, QuantumDomain};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct ImageState {
    pixels: PixelStore,
    magick: Option<String>,
}

type Shared = Arc<RwLock<ImageState>>;

// Every operation validates before it mutates, so a poisoned lock still guards consistent state.
fn read_lock(state: &Shared) -> RwLockReadGuard<'_, ImageState> {
    state.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock(state: &Shared) -> RwLockWriteGuard<'_, ImageState> {
    state.write().unwrap_or_else(|e| e.into_inner())
}

pub struct Image {
    engine: Arc<dyn Engine>,
    state: Shared,
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep copy: the new image gets its own pixel store.
impl Clone for Image {
    fn clone(&self) -> Self {
        let state = read_lock(&self.state).clone();
        Self {
            engine: Arc::clone(&self.engine),
            state: Arc::new(RwLock::new(state)),
        }
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = read_lock(&self.state);
        f.debug_struct("Image")
            .field("engine", &self.engine.name())
            .field("width", &state.pixels.width())
            .field("height", &state.pixels.height())
            .field("magick", &state.magick)
            .finish()
    }
}

impl Image {
    /// An empty (0x0) image on the default engine.
    pub fn new() -> Self {
        Self::with_engine(default_engine())
    }

    /// An empty image on an explicit engine.
    pub fn with_engine(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            state: Arc::new(RwLock::new(ImageState::default())),
        }
    }

    /// Read an image file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut image = Self::new();
        image.read(path)?;
        Ok(image)
    }

    /// A `size` image with every pixel set to `color`.
    ///
    /// An invalid color fills opaque black. A translucent color enables the
    /// alpha channel; a CMYK color makes a CMYK image.
    pub fn from_color(size: Geometry, color: &Color) -> Self {
        let image = Self::new();
        {
            let mut state = write_lock(&image.state);
            let alpha = color.is_valid() && color.pixel_type().has_alpha();
            state.pixels = PixelStore::filled(size.width(), size.height(), color.to_pixel(), alpha);
            if color.is_valid() && color.pixel_type().is_cmyk() {
                state.pixels.set_colorspace(Colorspace::Cmyk);
            }
        }
        image
    }

    /// An image imported from a raw buffer.
    pub fn from_pixels<T: QuantumDomain>(width: u32, height: u32, layout: &str, buffer: &[T]) -> Result<Self> {
        let mut image = Self::new();
        image.read_pixels(width, height, layout, buffer)?;
        Ok(image)
    }

    /// Another handle on the same state, for moving into pool tasks.
    fn share(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            state: Arc::clone(&self.state),
        }
    }

    // The state lock must never be held across a marshal call. Marshalling
    // forks onto the pool, and a worker waiting on its fork may pick up
    // another queued task for this same image.
    fn run<T>(&self, op: impl FnOnce(&mut ImageState, &dyn Engine) -> Result<T>) -> Result<T> {
        let mut state = write_lock(&self.state);
        op(&mut state, self.engine.as_ref())
    }

    fn run_async<T, F>(&self, op: F) -> Deferred<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ImageState, &dyn Engine) -> Result<T> + Send + 'static,
    {
        let image = self.share();
        pool::submit(move || image.run(op))
    }

    fn snapshot(&self) -> PixelStore {
        read_lock(&self.state).pixels.clone()
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.state).pixels.is_empty()
    }

    /// Current format identifier, if any.
    pub fn magick(&self) -> Option<String> {
        read_lock(&self.state).magick.clone()
    }

    pub fn size(&self) -> Geometry {
        self.run(size_op()).unwrap_or_default()
    }

    pub fn size_async(&self) -> Deferred<Geometry> {
        self.run_async(size_op())
    }

    /// Replace the image with the decoded contents of `path`.
    ///
    /// A `FMT:` prefix forces the decoder instead of sniffing the file.
    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.run(read_op(path.as_ref().to_path_buf()))
    }

    pub fn read_async(&self, path: impl AsRef<Path>) -> Deferred<()> {
        self.run_async(read_op(path.as_ref().to_path_buf()))
    }

    /// Replace the image with a `width` x `height` raw buffer in `layout`.
    pub fn read_pixels<T: QuantumDomain>(&mut self, width: u32, height: u32, layout: &str, buffer: &[T]) -> Result<()> {
        let layout = Layout::resolve(layout)?;
        let pixels = marshal::import_pixels(width, height, layout, buffer)?;
        self.run(replace_pixels_op(pixels))
    }

    pub fn read_pixels_async(&self, width: u32, height: u32, layout: &str, data: PixelData) -> Deferred<()> {
        let layout = layout.to_string();
        let image = self.share();
        pool::submit(move || {
            let layout = Layout::resolve(&layout)?;
            let pixels = marshal::import_data(width, height, layout, &data)?;
            image.run(replace_pixels_op(pixels))
        })
    }

    /// Encode the image to `path`. See the [module docs](self) for format selection.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        self.run(write_op(path.as_ref().to_path_buf()))
    }

    pub fn write_async(&self, path: impl AsRef<Path>) -> Deferred<()> {
        self.run_async(write_op(path.as_ref().to_path_buf()))
    }

    /// Export the `width` x `height` rectangle at (`x`, `y`) into `buffer`.
    pub fn write_pixels<T: QuantumDomain>(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        layout: &str,
        buffer: &mut [T],
    ) -> Result<()> {
        let layout = Layout::resolve(layout)?;
        marshal::export_pixels(&self.snapshot(), x, y, width, height, layout, buffer)
    }

    /// Export into an owned buffer, which comes back filled.
    ///
    /// The buffer is consumed: on rejection it is dropped along with the
    /// task, and only the error comes back.
    pub fn write_pixels_async(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        layout: &str,
        mut data: PixelData,
    ) -> Deferred<PixelData> {
        let layout = layout.to_string();
        let image = self.share();
        pool::submit(move || {
            let layout = Layout::resolve(&layout)?;
            marshal::export_data(&image.snapshot(), x, y, width, height, layout, &mut data)?;
            Ok(data)
        })
    }

    /// Keep only the part of the image inside `geometry`.
    ///
    /// The region is clipped to the image. A zero width or height extends to
    /// the edge. A region that misses the image entirely is a bounds error.
    pub fn crop(&mut self, geometry: Geometry) -> Result<()> {
        self.run(crop_op(geometry))
    }

    pub fn crop_async(&self, geometry: Geometry) -> Deferred<()> {
        self.run_async(crop_op(geometry))
    }

    /// Blend `other` into this image with its corner at `offset`.
    ///
    /// Only the offset of `offset` is used. Parts of `other` that fall outside
    /// this image are clipped.
    pub fn composite(&mut self, other: &Image, offset: Geometry, op: CompositeOperator) -> Result<()> {
        let source = other.snapshot();
        self.run(composite_op(source, offset, op))
    }

    pub fn composite_async(&self, other: &Image, offset: Geometry, op: CompositeOperator) -> Deferred<()> {
        let source = other.share();
        let image = self.share();
        // Snapshot on the worker, before taking our own lock.
        pool::submit(move || image.run(composite_op(source.snapshot(), offset, op)))
    }

    /// Set the format used by the next `write`. No pixels are touched.
    pub fn set_magick(&mut self, code: &str) -> Result<()> {
        self.run(magick_op(code.to_string()))
    }

    pub fn set_magick_async(&self, code: &str) -> Deferred<()> {
        self.run_async(magick_op(code.to_string()))
    }

    /// Snapshot of the pixel at (`x`, `y`).
    pub fn pixel_color(&self, x: u32, y: u32) -> Result<Color> {
        self.run(pixel_color_op(x, y))
    }

    pub fn pixel_color_async(&self, x: u32, y: u32) -> Deferred<Color> {
        self.run_async(pixel_color_op(x, y))
    }

    /// Overwrite the pixel at (`x`, `y`).
    pub fn set_pixel_color(&mut self, x: u32, y: u32, color: &Color) -> Result<()> {
        self.run(set_pixel_color_op(x, y, *color))
    }

    pub fn set_pixel_color_async(&self, x: u32, y: u32, color: &Color) -> Deferred<()> {
        self.run_async(set_pixel_color_op(x, y, *color))
    }
}

fn size_op() -> impl FnOnce(&mut ImageState, &dyn Engine) -> Result<Geometry> + Send + 'static {
    |state, _| Ok(Geometry::new(state.pixels.width(), state.pixels.height()))
}

fn replace_pixels_op(pixels: PixelStore) -> impl FnOnce(&mut ImageState, &dyn Engine) -> Result<()> + Send + 'static {
    move |state, _| {
        state.pixels = pixels;
        Ok(())
    }
}

/// Split a `FMT:path` prefix. The prefix must name a registered format, so
/// drive letters and URLs fall through untouched.
fn split_format(path: &Path) -> (Option<&'static str>, PathBuf) {
    let prefixed = path
        .to_str()
        .and_then(|s| s.split_once(':'))
        .filter(|(prefix, _)| prefix.len() > 1)
        .and_then(|(prefix, rest)| coder::lookup(prefix).map(|e| (e.name, rest)));
    match prefixed {
        Some((code, rest)) => (Some(code), PathBuf::from(rest)),
        None => (None, path.to_path_buf()),
    }
}

fn read_op(path: PathBuf) -> impl FnOnce(&mut ImageState, &dyn Engine) -> Result<()> + Send + 'static {
    move |state, engine| {
        let (forced, file) = split_format(&path);
        let decoded = engine.decode(&file, forced)?;
        debug!(path = %file.display(), format = %decoded.format, "read");
        state.pixels = decoded.pixels;
        state.magick = Some(decoded.format);
        Ok(())
    }
}

fn output_format(prefix: Option<&'static str>, file: &Path, magick: Option<&str>) -> Result<String> {
    if let Some(code) = prefix {
        return Ok(code.to_string());
    }
    let by_extension = file
        .extension()
        .and_then(|e| e.to_str())
        .and_then(coder::lookup)
        .map(|e| e.name.to_string());
    by_extension
        .or_else(|| magick.map(str::to_string))
        .or_else(|| config::active().output.default_format.clone())
        .map(|code| code.to_ascii_uppercase())
        .ok_or_else(|| MagickError::UnsupportedFormat(file.display().to_string()))
}

fn write_op(path: PathBuf) -> impl FnOnce(&mut ImageState, &dyn Engine) -> Result<()> + Send + 'static {
    move |state, engine| {
        let (prefix, file) = split_format(&path);
        let format = output_format(prefix, &file, state.magick.as_deref())?;
        if !engine.can_encode(&format) {
            return Err(MagickError::UnsupportedFormat(format));
        }
        if state.pixels.is_empty() {
            return Err(MagickError::InvalidValue("no pixels to write".into()));
        }
        engine.encode(&state.pixels, &format, &file)?;
        debug!(path = %file.display(), format = %format, "write");
        Ok(())
    }
}

/// Intersect `geometry` with a `width` x `height` image.
fn crop_region(geometry: Geometry, width: u32, height: u32) -> Result<Region> {
    if !geometry.is_valid() {
        return Err(MagickError::InvalidValue(format!("invalid crop geometry '{geometry}'")));
    }
    let w = if geometry.width() == 0 { width } else { geometry.width() };
    let h = if geometry.height() == 0 { height } else { geometry.height() };
    let x0 = geometry.x().max(0);
    let y0 = geometry.y().max(0);
    let x1 = geometry.x().saturating_add(i64::from(w)).min(i64::from(width));
    let y1 = geometry.y().saturating_add(i64::from(h)).min(i64::from(height));
    if x0 >= x1 || y0 >= y1 {
        return Err(MagickError::Bounds(format!("{geometry} lies outside {width}x{height}")));
    }
    Ok(Region {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}

fn crop_op(geometry: Geometry) -> impl FnOnce(&mut ImageState, &dyn Engine) -> Result<()> + Send + 'static {
    move |state, engine| {
        let region = crop_region(geometry, state.pixels.width(), state.pixels.height())?;
        state.pixels = engine.crop(&state.pixels, region);
        debug!(width = region.width, height = region.height, "crop");
        Ok(())
    }
}

fn composite_op(
    source: PixelStore,
    offset: Geometry,
    op: CompositeOperator,
) -> impl FnOnce(&mut ImageState, &dyn Engine) -> Result<()> + Send + 'static {
    move |state, engine| {
        engine.composite(&mut state.pixels, &source, offset.x(), offset.y(), op);
        Ok(())
    }
}

fn magick_op(code: String) -> impl FnOnce(&mut ImageState, &dyn Engine) -> Result<()> + Send + 'static {
    move |state, _| {
        let entry = coder::lookup(&code).ok_or(MagickError::UnsupportedFormat(code))?;
        state.magick = Some(entry.name.to_string());
        Ok(())
    }
}

fn out_of_bounds(x: u32, y: u32, pixels: &PixelStore) -> MagickError {
    MagickError::Bounds(format!(
        "pixel ({x}, {y}) is outside {}x{}",
        pixels.width(),
        pixels.height()
    ))
}

fn pixel_color_op(x: u32, y: u32) -> impl FnOnce(&mut ImageState, &dyn Engine) -> Result<Color> + Send + 'static {
    move |state, _| {
        let px = state.pixels.get(x, y).ok_or_else(|| out_of_bounds(x, y, &state.pixels))?;
        let pixel_type = match (state.pixels.colorspace(), state.pixels.has_alpha()) {
            (Colorspace::Cmyk, true) => PixelType::Cmyka,
            (Colorspace::Cmyk, false) => PixelType::Cmyk,
            (_, true) => PixelType::Rgba,
            (_, false) => PixelType::Rgb,
        };
        Ok(Color::from_pixel(px, pixel_type))
    }
}

fn set_pixel_color_op(x: u32, y: u32, color: Color) -> impl FnOnce(&mut ImageState, &dyn Engine) -> Result<()> + Send + 'static {
    move |state, _| {
        if !color.is_valid() {
            return Err(MagickError::InvalidValue("cannot paint with an invalid color".into()));
        }
        let pixels = &mut state.pixels;
        if !pixels.contains(x, y) {
            return Err(out_of_bounds(x, y, pixels));
        }
        let mut px = color.to_pixel();
        match (pixels.colorspace(), color.pixel_type().is_cmyk()) {
            (Colorspace::Cmyk, false) => px = px.rgb_to_cmyk(),
            (Colorspace::Cmyk, true) => {}
            (_, true) => px = px.cmyk_to_rgb(),
            (Colorspace::Gray, false) => {
                if px.red != px.green || px.green != px.blue {
                    pixels.set_colorspace(Colorspace::Srgb);
                }
            }
            (Colorspace::Srgb, false) => {}
        }
        if px.alpha < QUANTUM_MAX && !pixels.has_alpha() {
            pixels.set_alpha(true);
        }
        pixels.set(x, y, px);
        Ok(())
    }
}
