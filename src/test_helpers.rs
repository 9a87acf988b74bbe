//! Shared test utilities.
//!
//! Fixtures are generated on the fly with the `image` crate; nothing binary
//! is checked in.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let im = Image::open(tmp.path().join(WIZARD)).unwrap();
//! assert_quanta(&im.pixel_color(10, 10).unwrap(), [65535, 65535, 65535, 65535]);
//! ```

use crate::color::Color;
use image::{ImageEncoder, RgbaImage};
use std::path::Path;
use tempfile::TempDir;

/// File name of the generated 80x106 RGBA fixture.
pub const WIZARD: &str = "wizard.png";

// =========================================================================
// Fixture setup
// =========================================================================

/// Write an RGBA PNG whose pixel (x, y) is `(x, y, 255, 255)` except for an
/// opaque white pixel at (10, 10).
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        if (x, y) == (10, 10) {
            image::Rgba([255, 255, 255, 255])
        } else {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 255, 255])
        }
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::png::PngEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
}

/// A temp directory holding [`WIZARD`].
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    create_test_png(&tmp.path().join(WIZARD), 80, 106);
    tmp
}

// =========================================================================
// Assertions
// =========================================================================

/// Assert `[red, green, blue, alpha]` quanta of a color.
pub fn assert_quanta(color: &Color, expected: [u16; 4]) {
    let actual = [
        color.quantum_red(),
        color.quantum_green(),
        color.quantum_blue(),
        color.quantum_alpha(),
    ];
    assert_eq!(actual, expected, "quanta of {color} (r, g, b, a)");
}
