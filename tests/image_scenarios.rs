//! End-to-end scenarios through the public API with the default engine.
//!
//! Fixtures are written into a temp dir per test; nothing is checked in.
//!
//! Run with: cargo test --test image_scenarios

use magick_bind::{
    CoderInfo, Color, CompositeOperator, ErrorKind, Geometry, Image, PixelType, QUANTUM_MAX,
    coder_info_list,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const WIZARD_W: u32 = 80;
const WIZARD_H: u32 = 106;

/// An 80x106 RGBA PNG with a gradient in red/green and a solid blue channel.
fn wizard(dir: &Path) -> PathBuf {
    let path = dir.join("wizard.png");
    let img = image::RgbaImage::from_fn(WIZARD_W, WIZARD_H, |x, y| image::Rgba([x as u8, y as u8, 255, 255]));
    img.save(&path).unwrap();
    path
}

// =========================================================================
// Size and format
// =========================================================================

#[test]
fn reads_size_sync_and_async() {
    let tmp = TempDir::new().unwrap();
    let path = wizard(tmp.path());

    let im = Image::open(&path).unwrap();
    assert_eq!(im.size().width(), WIZARD_W);
    assert_eq!(im.size().height(), WIZARD_H);

    let im2 = Image::new();
    im2.read_async(&path).wait().unwrap();
    let size = im2.size_async().wait().unwrap();
    assert_eq!((size.width(), size.height()), (WIZARD_W, WIZARD_H));
}

#[test]
fn magick_change_reencodes_as_jpeg() {
    let tmp = TempDir::new().unwrap();
    let mut im = Image::open(wizard(tmp.path())).unwrap();
    assert_eq!(im.magick().as_deref(), Some("PNG"));

    im.set_magick("JPEG").unwrap();
    let out = tmp.path().join("wizard.out");
    im.write(&out).unwrap();

    let back = Image::open(&out).unwrap();
    assert_eq!(back.magick().as_deref(), Some("JPEG"));
    assert_eq!(back.size(), im.size());
}

#[test]
fn magick_change_async() {
    let tmp = TempDir::new().unwrap();
    let im = Image::new();
    im.read_async(wizard(tmp.path())).wait().unwrap();
    im.set_magick_async("GIF").wait().unwrap();
    let out = tmp.path().join("anim.bin");
    im.write_async(&out).wait().unwrap();
    assert_eq!(Image::open(&out).unwrap().magick().as_deref(), Some("GIF"));
}

// =========================================================================
// Pixels
// =========================================================================

#[test]
fn set_red_pixel_on_black() {
    let mut im = Image::from_color(Geometry::new(20, 20), &"black".into());
    im.set_pixel_color(10, 10, &Color::named("red")).unwrap();

    let px = im.pixel_color(10, 10).unwrap();
    assert_eq!(px.pixel_type(), PixelType::Rgb);
    assert_eq!(
        [px.quantum_red(), px.quantum_green(), px.quantum_blue(), px.quantum_alpha(), px.quantum_black()],
        [QUANTUM_MAX, 0, 0, QUANTUM_MAX, 0]
    );
    // Neighbours untouched.
    assert_eq!(im.pixel_color(9, 10).unwrap().quantum_red(), 0);
}

#[test]
fn u16_buffer_round_trip_and_mismatch() {
    let buf = vec![u16::MAX; 15 * 20 * 4];
    let mut im = Image::from_pixels(15, 20, "RGBA", &buf).unwrap();
    assert_eq!(im.size(), Geometry::new(15, 20));
    let px = im.pixel_color(14, 19).unwrap();
    assert_eq!(px.pixel_type(), PixelType::Rgba);
    assert_eq!(px.quantum_alpha(), QUANTUM_MAX);

    let mut out = vec![0u16; 15 * 20 * 4];
    im.write_pixels(0, 0, 15, 20, "RGBA", &mut out).unwrap();
    assert_eq!(out, buf);

    // A 15x20 buffer passed off as 20x20.
    let err = im.read_pixels(20, 20, "RGBA", &buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PixelCountMismatch);
    assert!(err.to_string().contains("does not match the number of pixels"));
    assert_eq!(im.size(), Geometry::new(15, 20));
}

#[test]
fn multiply_composite_halves_red_and_blue() {
    let mut white = Image::from_color(Geometry::new(20, 20), &Color::named("white"));
    let green = Image::from_color(white.size(), &Color::rgba(0, QUANTUM_MAX, 0, 32_768));
    white.composite(&green, Geometry::new(0, 0), CompositeOperator::Multiply).unwrap();

    let px = white.pixel_color(10, 10).unwrap();
    let near = |q: u16| (i32::from(q) - 32_767).abs() <= 1;
    assert!(near(px.quantum_red()), "red {}", px.quantum_red());
    assert!(near(px.quantum_blue()), "blue {}", px.quantum_blue());
    assert_eq!(px.quantum_green(), QUANTUM_MAX);
    assert_eq!(px.quantum_alpha(), QUANTUM_MAX);
}

#[test]
fn multiply_composite_async_matches_sync() {
    let mut sync = Image::from_color(Geometry::new(8, 8), &Color::named("white"));
    let async_im = sync.clone();
    let overlay = Image::from_color(Geometry::new(8, 8), &Color::rgba(0, QUANTUM_MAX, 0, 32_768));

    sync.composite(&overlay, Geometry::new(0, 0), CompositeOperator::Multiply).unwrap();
    async_im
        .composite_async(&overlay, Geometry::new(0, 0), CompositeOperator::Multiply)
        .wait()
        .unwrap();
    assert_eq!(sync.pixel_color(3, 3).unwrap(), async_im.pixel_color(3, 3).unwrap());
}

// =========================================================================
// Crop and copies
// =========================================================================

#[test]
fn crop_write_read_round_trip() {
    let tmp = TempDir::new().unwrap();
    let mut im = Image::open(wizard(tmp.path())).unwrap();
    im.crop("10x8+1+8".parse().unwrap()).unwrap();
    let out = tmp.path().join("cropped.png");
    im.write(&out).unwrap();

    let back = Image::open(&out).unwrap();
    assert_eq!(back.size(), Geometry::new(10, 8));
    // Top-left of the crop was (1, 8) in the source gradient.
    let px = back.pixel_color(0, 0).unwrap();
    assert_eq!(px.quantum_red(), 257);
    assert_eq!(px.quantum_green(), 8 * 257);
}

#[test]
fn crop_write_read_round_trip_async() {
    let tmp = TempDir::new().unwrap();
    let im = Image::new();
    im.read_async(wizard(tmp.path())).wait().unwrap();
    im.crop_async("10x8+1+8".parse().unwrap()).wait().unwrap();
    let out = tmp.path().join("cropped.png");
    im.write_async(&out).wait().unwrap();

    let back = Image::new();
    back.read_async(&out).wait().unwrap();
    assert_eq!(back.size_async().wait().unwrap(), Geometry::new(10, 8));
}

#[test]
fn copies_are_independent() {
    let tmp = TempDir::new().unwrap();
    let original = Image::open(wizard(tmp.path())).unwrap();
    let mut copy = original.clone();
    copy.crop(Geometry::with_offset(10, 8, 1, 8)).unwrap();
    copy.set_pixel_color(0, 0, &Color::named("red")).unwrap();

    assert_eq!(original.size(), Geometry::new(WIZARD_W, WIZARD_H));
    assert_eq!(copy.size(), Geometry::new(10, 8));
    assert_eq!(original.pixel_color(1, 8).unwrap().quantum_blue(), QUANTUM_MAX);
}

// =========================================================================
// Errors
// =========================================================================

#[test]
fn missing_file_is_io_error_both_ways() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nonexistent.png");

    let mut im = Image::new();
    let sync_err = im.read(&missing).unwrap_err();
    assert_eq!(sync_err.kind(), ErrorKind::Io);
    assert!(sync_err.to_string().contains("unable to open image"));

    let async_err = im.read_async(&missing).wait().unwrap_err();
    assert_eq!(async_err, sync_err);
    assert!(im.is_empty());
}

#[test]
fn unknown_layout_and_bad_geometry() {
    let mut im = Image::new();
    let err = im.read_pixels(1, 1, "XYZ", &[0u8; 3]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedLayout);

    let err = "10x".parse::<Geometry>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
}

#[test]
fn unknown_write_format_is_unsupported() {
    let tmp = TempDir::new().unwrap();
    let im = Image::from_color(Geometry::new(2, 2), &Color::named("white"));
    let err = im.write(tmp.path().join("out.nothing")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

// =========================================================================
// Coder registry
// =========================================================================

#[test]
fn gif_coder_info() {
    let info = CoderInfo::new("GIF").unwrap();
    assert_eq!(info.name(), "GIF");
    assert_eq!(info.description(), "CompuServe graphics interchange format");
    assert!(info.is_readable());
    assert!(info.is_writable());
    assert!(info.is_multi_frame());
    assert!(info.can_write_multithreaded());

    let err = CoderInfo::new("NOT-A-FORMAT").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

#[test]
fn coder_list_is_large_and_sorted() {
    let list = coder_info_list();
    assert!(list.len() >= 50, "only {} coders", list.len());
    assert!(list.windows(2).all(|w| w[0].name() < w[1].name()));
    assert!(list.iter().any(|c| c.name() == "PNG"));
}

#[test]
fn unrecognised_content_is_unsupported_format_both_ways() {
    let tmp = TempDir::new().unwrap();
    let notes = tmp.path().join("notes.png");
    std::fs::write(&notes, "not an image\n").unwrap();

    let mut im = Image::new();
    let sync_err = im.read(&notes).unwrap_err();
    assert_eq!(sync_err.kind(), ErrorKind::UnsupportedFormat);
    assert!(sync_err.to_string().contains("no decode delegate"));
    assert_eq!(im.read_async(&notes).wait().unwrap_err(), sync_err);

    let png = wizard(tmp.path());
    let forced = format!("avif:{}", png.display());
    let err = im.read(&forced).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    assert_eq!(im.read_async(&forced).wait().unwrap_err(), err);
}

// =========================================================================
// Sync and async agree
// =========================================================================

#[test]
fn set_pixel_color_parity() {
    let mut sync = Image::from_color(Geometry::new(6, 6), &Color::named("black"));
    let pending = sync.clone();
    let paint = Color::rgba(QUANTUM_MAX, 0, QUANTUM_MAX, 1000);

    sync.set_pixel_color(2, 3, &paint).unwrap();
    pending.set_pixel_color_async(2, 3, &paint).wait().unwrap();
    assert_eq!(sync.pixel_color(2, 3).unwrap(), pending.pixel_color_async(2, 3).wait().unwrap());
    assert_eq!(sync.pixel_color(0, 0).unwrap(), pending.pixel_color(0, 0).unwrap());

    let sync_err = sync.set_pixel_color(6, 0, &paint).unwrap_err();
    assert_eq!(pending.set_pixel_color_async(6, 0, &paint).wait().unwrap_err(), sync_err);

    let invalid = Color::default();
    let sync_err = sync.set_pixel_color(0, 0, &invalid).unwrap_err();
    assert_eq!(pending.set_pixel_color_async(0, 0, &invalid).wait().unwrap_err(), sync_err);
}

#[test]
fn set_magick_parity() {
    let mut sync = Image::from_color(Geometry::new(2, 2), &Color::named("white"));
    let pending = sync.clone();

    sync.set_magick("tiff").unwrap();
    pending.set_magick_async("tiff").wait().unwrap();
    assert_eq!(sync.magick(), pending.magick());
    assert_eq!(sync.magick().as_deref(), Some("TIFF"));

    let sync_err = sync.set_magick("NOT-A-FORMAT").unwrap_err();
    let async_err = pending.set_magick_async("NOT-A-FORMAT").wait().unwrap_err();
    assert_eq!(sync_err, async_err);
    assert_eq!(sync_err.kind(), ErrorKind::UnsupportedFormat);
    assert_eq!(pending.magick().as_deref(), Some("TIFF"));
}

#[test]
fn write_parity() {
    let tmp = TempDir::new().unwrap();
    let im = Image::open(wizard(tmp.path())).unwrap();

    let (a, b) = (tmp.path().join("sync.png"), tmp.path().join("async.png"));
    im.write(&a).unwrap();
    im.write_async(&b).wait().unwrap();
    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());

    let nowhere = tmp.path().join("out.nothing");
    assert_eq!(im.write(&nowhere).unwrap_err(), im.write_async(&nowhere).wait().unwrap_err());

    let missing_dir = tmp.path().join("no/such/dir/out.png");
    let sync_err = im.write(&missing_dir).unwrap_err();
    assert_eq!(sync_err.kind(), ErrorKind::Io);
    assert_eq!(im.write_async(&missing_dir).wait().unwrap_err(), sync_err);

    let empty = Image::new();
    let out = tmp.path().join("empty.png");
    assert_eq!(empty.write(&out).unwrap_err(), empty.write_async(&out).wait().unwrap_err());
}

#[test]
fn read_pixels_mismatch_parity() {
    let mut sync = Image::from_color(Geometry::new(3, 3), &Color::named("red"));
    let pending = sync.clone();
    let buf = vec![0u8; 15 * 20 * 4];

    let sync_err = sync.read_pixels(20, 20, "RGBA", &buf).unwrap_err();
    let async_err = pending
        .read_pixels_async(20, 20, "RGBA", magick_bind::PixelData::from(buf))
        .wait()
        .unwrap_err();
    assert_eq!(sync_err, async_err);
    assert_eq!(sync.pixel_color(1, 1).unwrap(), pending.pixel_color(1, 1).unwrap());
}
