//! Format registry query interface.
//!
//! The registry is a static, alphabetically ordered table of format
//! descriptors. Whether a format is readable or writable is not stored here:
//! it is asked of the engine, so the flags always match what `read` and
//! `write` can actually do.

use crate::engine::{Engine, default_engine};
use crate::error::{MagickError, Result};
use serde::Serialize;

/// Static part of a registry entry.
#[derive(Debug)]
pub(crate) struct CoderEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
    pub multi_frame: bool,
    pub multithreaded_write: bool,
}

const fn entry(
    name: &'static str,
    description: &'static str,
    mime_type: &'static str,
    multi_frame: bool,
    multithreaded_write: bool,
) -> CoderEntry {
    CoderEntry {
        name,
        description,
        mime_type,
        multi_frame,
        multithreaded_write,
    }
}

const REGISTRY: &[CoderEntry] = &[
    entry("APNG", "Animated Portable Network Graphics", "image/apng", true, false),
    entry("AVIF", "AV1 Image File Format", "image/avif", false, true),
    entry("BMP", "Microsoft Windows bitmap image", "image/bmp", false, true),
    entry("BMP3", "Microsoft Windows bitmap image (V3)", "image/bmp", false, true),
    entry("CIN", "Cineon Image File", "image/x-cineon", false, true),
    entry("CMYK", "Raw cyan, magenta, yellow, and black samples", "", false, true),
    entry("CUR", "Microsoft icon", "image/x-icon", true, true),
    entry("DDS", "Microsoft DirectDraw Surface", "image/vnd-ms.dds", false, true),
    entry("DIB", "Microsoft Windows 3.X Packed Device-Independent Bitmap", "image/bmp", false, true),
    entry("DPX", "SMPTE 268M-2003 (DPX 2.0)", "image/dpx", false, true),
    entry("EPS", "Encapsulated PostScript", "application/postscript", false, false),
    entry("EXR", "High Dynamic-range (HDR)", "image/x-exr", false, true),
    entry("FARBFELD", "Farbfeld", "image/x-farbfeld", false, true),
    entry("FAX", "Group 3 FAX", "image/g3fax", false, true),
    entry("FITS", "Flexible Image Transport System", "image/fits", true, true),
    entry("GIF", "CompuServe graphics interchange format", "image/gif", true, true),
    entry("GIF87", "CompuServe graphics interchange format (version 87a)", "image/gif", false, true),
    entry("GRAY", "Raw gray samples", "", true, true),
    entry("HDR", "Radiance RGBE image format", "image/vnd.radiance", false, true),
    entry("HEIC", "High Efficiency Image Format", "image/heic", false, true),
    entry("HTML", "Hypertext Markup Language and a client-side image map", "text/html", false, true),
    entry("ICO", "Microsoft icon", "image/x-icon", true, true),
    entry("ICON", "Microsoft icon", "image/x-icon", true, true),
    entry("INFO", "The image format and characteristics", "text/plain", true, true),
    entry("JNG", "JPEG Network Graphics", "image/x-jng", false, true),
    entry("JP2", "JPEG-2000 File Format Syntax", "image/jp2", false, true),
    entry("JPEG", "Joint Photographic Experts Group JFIF format", "image/jpeg", false, true),
    entry("JPG", "Joint Photographic Experts Group JFIF format", "image/jpeg", false, true),
    entry("JXL", "JPEG XL (ISO/IEC 18181)", "image/jxl", false, true),
    entry("MIFF", "Magick Image File Format", "image/miff", true, true),
    entry("MNG", "Multiple-image Network Graphics", "video/x-mng", true, true),
    entry("MPC", "Magick Pixel Cache image format", "", true, true),
    entry("PAM", "Common 2-dimensional bitmap format", "image/x-portable-anymap", true, true),
    entry("PBM", "Portable bitmap format (black and white)", "image/x-portable-bitmap", true, true),
    entry("PCX", "ZSoft IBM PC Paintbrush", "image/x-pcx", false, true),
    entry("PDF", "Portable Document Format", "application/pdf", true, false),
    entry("PFM", "Portable float format", "image/x-portable-floatmap", true, true),
    entry("PGM", "Portable graymap format (gray scale)", "image/x-portable-graymap", true, true),
    entry("PICT", "Apple Macintosh QuickDraw/PICT", "image/x-pict", false, true),
    entry("PNG", "Portable Network Graphics", "image/png", false, true),
    entry("PNG24", "opaque or binary transparent 24-bit RGB", "image/png", false, true),
    entry("PNG32", "opaque or transparent 32-bit RGBA", "image/png", false, true),
    entry("PNG48", "opaque or binary transparent 48-bit RGB", "image/png", false, true),
    entry("PNG64", "opaque or transparent 64-bit RGBA", "image/png", false, true),
    entry("PNG8", "8-bit indexed with optional binary transparency", "image/png", false, true),
    entry("PNM", "Portable anymap", "image/x-portable-anymap", true, true),
    entry("PPM", "Portable pixmap format (color)", "image/x-portable-pixmap", true, true),
    entry("PS", "PostScript", "application/postscript", true, false),
    entry("PSD", "Adobe Photoshop bitmap", "image/vnd.adobe.photoshop", true, true),
    entry("QOI", "Quite OK image format", "image/qoi", false, true),
    entry("RGB", "Raw red, green, and blue samples", "", true, true),
    entry("RGBA", "Raw red, green, blue, and alpha samples", "", true, true),
    entry("SGI", "Irix RGB image", "image/sgi", true, true),
    entry("SUN", "SUN Rasterfile", "image/x-sun-raster", true, true),
    entry("SVG", "Scalable Vector Graphics", "image/svg+xml", false, false),
    entry("TGA", "Truevision Targa image", "image/x-tga", false, true),
    entry("TIF", "Tagged Image File Format", "image/tiff", true, true),
    entry("TIFF", "Tagged Image File Format", "image/tiff", true, true),
    entry("TXT", "Text", "text/plain", true, true),
    entry("WBMP", "Wireless Bitmap (level 0) image", "image/vnd.wap.wbmp", false, true),
    entry("WEBP", "WebP Image Format", "image/webp", true, true),
    entry("XBM", "X Windows system bitmap (black and white)", "image/x-xbitmap", false, true),
    entry("XCF", "GIMP image", "image/x-xcf", true, true),
    entry("XPM", "X Windows system pixmap (color)", "image/x-xpixmap", false, true),
    entry("YUV", "CCIR 601 4:1:1 or 4:2:2", "", true, true),
];

/// Case-insensitive registry lookup.
pub(crate) fn lookup(name: &str) -> Option<&'static CoderEntry> {
    REGISTRY.iter().find(|e| e.name.eq_ignore_ascii_case(name))
}

/// Description of one registered image format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoderInfo {
    name: &'static str,
    description: &'static str,
    mime_type: &'static str,
    readable: bool,
    writable: bool,
    multi_frame: bool,
    multithreaded_write: bool,
}

impl CoderInfo {
    /// Look up `name` (case-insensitive) in the registry.
    pub fn new(name: &str) -> Result<Self> {
        let engine = default_engine();
        Self::with_engine(name, engine.as_ref())
    }

    pub(crate) fn with_engine(name: &str, engine: &dyn Engine) -> Result<Self> {
        lookup(name)
            .map(|e| Self::describe(e, engine))
            .ok_or_else(|| MagickError::UnsupportedFormat(name.to_string()))
    }

    fn describe(entry: &'static CoderEntry, engine: &dyn Engine) -> Self {
        Self {
            name: entry.name,
            description: entry.description,
            mime_type: entry.mime_type,
            readable: engine.can_decode(entry.name),
            writable: engine.can_encode(entry.name),
            multi_frame: entry.multi_frame,
            multithreaded_write: entry.multithreaded_write,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn description(&self) -> &str {
        self.description
    }

    /// Empty for raw sample formats that have no registered MIME type.
    pub fn mime_type(&self) -> &str {
        self.mime_type
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_multi_frame(&self) -> bool {
        self.multi_frame
    }

    pub fn can_write_multithreaded(&self) -> bool {
        self.multithreaded_write
    }
}

/// Every registered format, alphabetically by name.
pub fn coder_info_list() -> Vec<CoderInfo> {
    let engine = default_engine();
    REGISTRY
        .iter()
        .map(|e| CoderInfo::describe(e, engine.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn gif_descriptor() {
        let info = CoderInfo::new("GIF").unwrap();
        assert!(info.is_readable());
        assert!(info.is_writable());
        assert!(info.is_multi_frame());
        assert!(info.can_write_multithreaded());
        assert_eq!(info.description(), "CompuServe graphics interchange format");
        assert_eq!(info.mime_type(), "image/gif");
        assert_eq!(info.name(), "GIF");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(CoderInfo::new("png").unwrap().name(), "PNG");
    }

    #[test]
    fn unknown_format() {
        let err = CoderInfo::new("NOPE").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn list_has_at_least_fifty_named_entries() {
        let list = coder_info_list();
        assert!(list.len() >= 50);
        assert!(list.iter().all(|c| !c.name().is_empty()));
    }

    #[test]
    fn registry_is_sorted_and_unique() {
        let names: Vec<&str> = REGISTRY.iter().map(|e| e.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn capabilities_follow_the_engine() {
        assert!(!CoderInfo::new("PDF").unwrap().is_readable());
        assert!(!CoderInfo::new("SVG").unwrap().is_writable());
        assert!(CoderInfo::new("PNG").unwrap().is_writable());
    }
}
