//! Pure Rust engine built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode | `image::ImageReader` (format sniffed, or forced by code) |
//! | Encode | `image::DynamicImage::save_with_format` |
//! | Crop / composite | pixel-store defaults from [`Engine`] |
//!
//! Decoded images are widened to 16-bit RGBA before they enter the quantum
//! store. On encode the store is narrowed to whatever sample type the target
//! format accepts: 16-bit for PNG/TIFF/farbfeld, float for EXR/HDR, 8-bit
//! everywhere else.

use super::backend::{Decoded, Engine, EngineError};
use super::pixels::{Colorspace, Pixel, PixelStore};
use crate::quantum::{QuantumDomain, unit};
use image::{DynamicImage, ImageBuffer, ImageFormat, ImageReader};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const SNIFF_LEN: usize = 32;

/// Format codes the engine maps onto `image` codecs. Several codes share a
/// codec (`JPG` and `JPEG`, the `PNG` bit-depth variants, the PNM family).
const FORMAT_CODES: &[(&str, ImageFormat)] = &[
    ("PNG", ImageFormat::Png),
    ("PNG8", ImageFormat::Png),
    ("PNG24", ImageFormat::Png),
    ("PNG32", ImageFormat::Png),
    ("PNG48", ImageFormat::Png),
    ("PNG64", ImageFormat::Png),
    ("JPEG", ImageFormat::Jpeg),
    ("JPG", ImageFormat::Jpeg),
    ("GIF", ImageFormat::Gif),
    ("GIF87", ImageFormat::Gif),
    ("WEBP", ImageFormat::WebP),
    ("TIFF", ImageFormat::Tiff),
    ("TIF", ImageFormat::Tiff),
    ("BMP", ImageFormat::Bmp),
    ("BMP3", ImageFormat::Bmp),
    ("DIB", ImageFormat::Bmp),
    ("ICO", ImageFormat::Ico),
    ("ICON", ImageFormat::Ico),
    ("PNM", ImageFormat::Pnm),
    ("PPM", ImageFormat::Pnm),
    ("PGM", ImageFormat::Pnm),
    ("PBM", ImageFormat::Pnm),
    ("PAM", ImageFormat::Pnm),
    ("TGA", ImageFormat::Tga),
    ("QOI", ImageFormat::Qoi),
    ("HDR", ImageFormat::Hdr),
    ("EXR", ImageFormat::OpenExr),
    ("FARBFELD", ImageFormat::Farbfeld),
    ("AVIF", ImageFormat::Avif),
];

fn image_format(code: &str) -> Option<ImageFormat> {
    FORMAT_CODES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, f)| *f)
}

/// Canonical code reported after a decode.
fn format_code(format: ImageFormat) -> String {
    FORMAT_CODES
        .iter()
        .find(|(_, f)| *f == format)
        .map(|(c, _)| c.to_string())
        .unwrap_or_else(|| format!("{format:?}").to_uppercase())
}

/// Engine backed by the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustEngine;

impl RustEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn io_or(path: &Path, err: image::ImageError, wrap: impl FnOnce(String) -> EngineError) -> EngineError {
    match err {
        image::ImageError::IoError(source) => EngineError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => wrap(other.to_string()),
    }
}

/// Format named by the file's leading magic bytes, if any.
fn sniff(path: &Path) -> Result<Option<ImageFormat>, EngineError> {
    let io = |source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut head = Vec::with_capacity(SNIFF_LEN);
    File::open(path)
        .and_then(|f| f.take(SNIFF_LEN as u64).read_to_end(&mut head))
        .map_err(io)?;
    Ok(image::guess_format(&head).ok())
}

fn to_store(img: &DynamicImage) -> PixelStore {
    let color = img.color();
    let rgba = img.to_rgba16();
    let pixels = rgba
        .pixels()
        .map(|p| Pixel {
            red: p[0],
            green: p[1],
            blue: p[2],
            black: 0,
            alpha: p[3],
        })
        .collect();
    // The buffer came from `img` itself, so the count always matches.
    let mut store = PixelStore::from_pixels(img.width(), img.height(), pixels, color.has_alpha())
        .unwrap_or_default();
    if !color.has_color() {
        store.set_colorspace(Colorspace::Gray);
    }
    store
}

/// Pixel as RGB slots regardless of the store's colorspace.
fn rgb_of(store: &PixelStore, px: Pixel) -> Pixel {
    match store.colorspace() {
        Colorspace::Cmyk => px.cmyk_to_rgb(),
        _ => px,
    }
}

fn buffer_of<P, T>(store: &PixelStore, channels: usize, conv: impl Fn(Pixel) -> [T; 4]) -> Option<ImageBuffer<P, Vec<T>>>
where
    P: image::Pixel<Subpixel = T>,
    T: image::Primitive,
{
    let mut raw = Vec::with_capacity(store.pixels().len() * channels);
    for px in store.pixels() {
        raw.extend_from_slice(&conv(rgb_of(store, *px))[..channels]);
    }
    ImageBuffer::from_raw(store.width(), store.height(), raw)
}

/// Narrow the quantum store to a `DynamicImage` the target codec accepts.
fn to_dynamic(store: &PixelStore, format: ImageFormat) -> Option<DynamicImage> {
    let alpha = store.has_alpha();
    let gray = store.colorspace() == Colorspace::Gray;

    let q16 = |p: Pixel| [p.red, p.green, p.blue, p.alpha];
    let q8 = |p: Pixel| {
        [
            u8::from_quantum(p.red),
            u8::from_quantum(p.green),
            u8::from_quantum(p.blue),
            u8::from_quantum(p.alpha),
        ]
    };
    let qf = |p: Pixel| [unit(p.red) as f32, unit(p.green) as f32, unit(p.blue) as f32, unit(p.alpha) as f32];
    let l16 = |p: Pixel| [p.red, p.alpha, 0, 0];
    let l8 = |p: Pixel| [u8::from_quantum(p.red), u8::from_quantum(p.alpha), 0, 0];

    let img = match format {
        ImageFormat::Png | ImageFormat::Tiff => match (gray, alpha) {
            (true, false) => DynamicImage::ImageLuma16(buffer_of(store, 1, l16)?),
            (true, true) if format == ImageFormat::Png => {
                DynamicImage::ImageLumaA16(buffer_of(store, 2, l16)?)
            }
            (_, false) => DynamicImage::ImageRgb16(buffer_of(store, 3, q16)?),
            (_, true) => DynamicImage::ImageRgba16(buffer_of(store, 4, q16)?),
        },
        ImageFormat::Farbfeld => DynamicImage::ImageRgba16(buffer_of(store, 4, q16)?),
        ImageFormat::OpenExr if alpha => DynamicImage::ImageRgba32F(buffer_of(store, 4, qf)?),
        ImageFormat::OpenExr | ImageFormat::Hdr => DynamicImage::ImageRgb32F(buffer_of(store, 3, qf)?),
        ImageFormat::Jpeg if gray => DynamicImage::ImageLuma8(buffer_of(store, 1, l8)?),
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(buffer_of(store, 3, q8)?),
        ImageFormat::Pnm if gray && !alpha => DynamicImage::ImageLuma8(buffer_of(store, 1, l8)?),
        _ if alpha => DynamicImage::ImageRgba8(buffer_of(store, 4, q8)?),
        _ => DynamicImage::ImageRgb8(buffer_of(store, 3, q8)?),
    };
    Some(img)
}

impl Engine for RustEngine {
    fn name(&self) -> &'static str {
        "image-rs"
    }

    /// A file whose signature matches no codec, and that fails to decode
    /// under its extension's codec, is an unknown format rather than a
    /// corrupt file.
    fn decode(&self, path: &Path, format: Option<&str>) -> Result<Decoded, EngineError> {
        let mut reader = ImageReader::open(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let signature_matched = match format {
            Some(code) => {
                let forced = image_format(code)
                    .filter(|_| self.can_decode(code))
                    .ok_or_else(|| EngineError::UnknownFormat(code.to_string()))?;
                reader.set_format(forced);
                true
            }
            // Without a signature match the extension hint set by `open` stays.
            None => match sniff(path)? {
                Some(found) => {
                    reader.set_format(found);
                    true
                }
                None => false,
            },
        };
        let unknown = || EngineError::UnknownFormat(path.display().to_string());
        let detected = reader.format().ok_or_else(unknown)?;
        let img = reader.decode().map_err(|e| match e {
            image::ImageError::Unsupported(_) => EngineError::UnknownFormat(format_code(detected)),
            image::ImageError::Decoding(_) if !signature_matched => unknown(),
            other => io_or(path, other, |reason| EngineError::Decode {
                path: path.to_path_buf(),
                reason,
            }),
        })?;

        debug!(path = %path.display(), width = img.width(), height = img.height(), "decoded");
        Ok(Decoded {
            pixels: to_store(&img),
            format: format_code(detected),
        })
    }

    fn encode(&self, pixels: &PixelStore, format: &str, path: &Path) -> Result<(), EngineError> {
        let target = image_format(format)
            .filter(|f| f.writing_enabled())
            .ok_or_else(|| EngineError::UnknownFormat(format.to_string()))?;
        let img = to_dynamic(pixels, target).ok_or_else(|| EngineError::Encode {
            path: path.to_path_buf(),
            reason: "pixel buffer does not match image extent".into(),
        })?;
        img.save_with_format(path, target).map_err(|e| {
            io_or(path, e, |reason| EngineError::Encode {
                path: path.to_path_buf(),
                reason,
            })
        })?;
        debug!(path = %path.display(), format, "encoded");
        Ok(())
    }

    /// AVIF is excluded: the `"avif"` feature only enables the encoder, yet
    /// `ImageFormat::reading_enabled()` reports `true` for it.
    fn can_decode(&self, format: &str) -> bool {
        image_format(format).is_some_and(|f| f != ImageFormat::Avif && f.reading_enabled())
    }

    fn can_encode(&self, format: &str) -> bool {
        image_format(format).is_some_and(|f| f.writing_enabled())
    }
}
