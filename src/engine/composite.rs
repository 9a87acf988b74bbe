//! Compositing operators.
//!
//! Porter-Duff operators and separable blend modes, evaluated in
//! premultiplied form on normalized channels:
//!
//! ```text
//! blend modes:  Dca' = f(Sc, Dc)·Sa·Da + Sca·(1 - Da) + Dca·(1 - Sa)
//!               Da'  = Sa + Da - Sa·Da
//! ```
//!
//! The black slot is treated like any other color slot, so CMYK stores
//! composite channel-for-channel.

use super::pixels::{Pixel, PixelStore};
use crate::error::MagickError;
use crate::quantum::{Quantum, scale_unit, unit};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Blend function used by [`composite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompositeOperator {
    #[default]
    Over,
    /// Replace destination with source, alpha included.
    Copy,
    Clear,
    /// Keep the destination.
    Dst,
    In,
    Out,
    Atop,
    Xor,
    Plus,
    Minus,
    Multiply,
    Screen,
    Darken,
    Lighten,
    Difference,
    Overlay,
}

const NAMES: &[(&str, CompositeOperator)] = &[
    ("over", CompositeOperator::Over),
    ("copy", CompositeOperator::Copy),
    ("src", CompositeOperator::Copy),
    ("clear", CompositeOperator::Clear),
    ("dst", CompositeOperator::Dst),
    ("in", CompositeOperator::In),
    ("out", CompositeOperator::Out),
    ("atop", CompositeOperator::Atop),
    ("xor", CompositeOperator::Xor),
    ("plus", CompositeOperator::Plus),
    ("minus", CompositeOperator::Minus),
    ("multiply", CompositeOperator::Multiply),
    ("screen", CompositeOperator::Screen),
    ("darken", CompositeOperator::Darken),
    ("lighten", CompositeOperator::Lighten),
    ("difference", CompositeOperator::Difference),
    ("overlay", CompositeOperator::Overlay),
];

impl CompositeOperator {
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(name, _)| *name)
            .unwrap_or("over")
    }

    /// Operators whose result alpha can drop below the destination's.
    fn alters_alpha(self) -> bool {
        matches!(
            self,
            CompositeOperator::Copy
                | CompositeOperator::Clear
                | CompositeOperator::In
                | CompositeOperator::Out
                | CompositeOperator::Xor
        )
    }

    fn blend(self, sc: f64, dc: f64) -> Option<f64> {
        let v = match self {
            CompositeOperator::Multiply => sc * dc,
            CompositeOperator::Screen => sc + dc - sc * dc,
            CompositeOperator::Darken => sc.min(dc),
            CompositeOperator::Lighten => sc.max(dc),
            CompositeOperator::Difference => (sc - dc).abs(),
            CompositeOperator::Overlay => {
                if dc < 0.5 {
                    2.0 * sc * dc
                } else {
                    1.0 - 2.0 * (1.0 - sc) * (1.0 - dc)
                }
            }
            _ => return None,
        };
        Some(v)
    }

    fn alpha(self, sa: f64, da: f64) -> f64 {
        match self {
            CompositeOperator::Clear => 0.0,
            CompositeOperator::Copy => sa,
            CompositeOperator::Dst | CompositeOperator::Atop => da,
            CompositeOperator::In => sa * da,
            CompositeOperator::Out => sa * (1.0 - da),
            CompositeOperator::Xor => sa + da - 2.0 * sa * da,
            CompositeOperator::Plus => (sa + da).min(1.0),
            _ => sa + da - sa * da,
        }
    }

    /// Premultiplied result for one color slot.
    fn channel(self, sc: f64, sa: f64, dc: f64, da: f64) -> f64 {
        let (sca, dca) = (sc * sa, dc * da);
        if let Some(f) = self.blend(sc, dc) {
            return f * sa * da + sca * (1.0 - da) + dca * (1.0 - sa);
        }
        match self {
            CompositeOperator::Clear => 0.0,
            CompositeOperator::Copy => sca,
            CompositeOperator::Dst => dca,
            CompositeOperator::In => sca * da,
            CompositeOperator::Out => sca * (1.0 - da),
            CompositeOperator::Atop => sca * da + dca * (1.0 - sa),
            CompositeOperator::Xor => sca * (1.0 - da) + dca * (1.0 - sa),
            CompositeOperator::Plus => sca + dca,
            CompositeOperator::Minus => (dca - sca).max(0.0),
            _ => sca + dca * (1.0 - sa),
        }
    }

    /// Composite one source pixel onto one destination pixel.
    pub fn apply(self, src: Pixel, src_alpha: bool, dst: Pixel, dst_alpha: bool) -> Pixel {
        let sa = if src_alpha { unit(src.alpha) } else { 1.0 };
        let da = if dst_alpha { unit(dst.alpha) } else { 1.0 };
        let out_a = self.alpha(sa, da);

        let slot = |s: Quantum, d: Quantum| -> Quantum {
            if out_a <= f64::EPSILON {
                return 0;
            }
            scale_unit(self.channel(unit(s), sa, unit(d), da) / out_a)
        };

        Pixel {
            red: slot(src.red, dst.red),
            green: slot(src.green, dst.green),
            blue: slot(src.blue, dst.blue),
            black: slot(src.black, dst.black),
            alpha: scale_unit(out_a),
        }
    }
}

impl FromStr for CompositeOperator {
    type Err = MagickError;

    /// Accepts bare names (`"Multiply"`) and ImageMagick constant names
    /// (`"MultiplyCompositeOp"`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let bare = lower.strip_suffix("compositeop").unwrap_or(&lower);
        NAMES
            .iter()
            .find(|(name, _)| *name == bare)
            .map(|(_, op)| *op)
            .ok_or_else(|| MagickError::InvalidValue(format!("unknown composite operator '{s}'")))
    }
}

impl fmt::Display for CompositeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Blend `src` into `dst` with its top-left corner at (`x`, `y`).
///
/// Offsets may be negative or past the edge; only the overlapping rectangle
/// is touched. Returns the number of destination pixels written.
pub fn composite(dst: &mut PixelStore, src: &PixelStore, x: i64, y: i64, op: CompositeOperator) -> usize {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = x.saturating_add(i64::from(src.width())).min(i64::from(dst.width()));
    let y1 = y.saturating_add(i64::from(src.height())).min(i64::from(dst.height()));
    if x0 >= x1 || y0 >= y1 {
        warn!(x, y, op = %op, "composite source lies outside the destination");
        return 0;
    }

    if !dst.has_alpha() && src.has_alpha() && op.alters_alpha() {
        dst.set_alpha(true);
    }
    let (src_alpha, dst_alpha) = (src.has_alpha(), dst.has_alpha());
    let dst_width = dst.width() as usize;
    let pixels = dst.pixels_mut();

    for dy in y0..y1 {
        let src_row = src.row((dy - y) as u32);
        for dx in x0..x1 {
            let s = src_row[(dx - x) as usize];
            let i = dy as usize * dst_width + dx as usize;
            let mut out = op.apply(s, src_alpha, pixels[i], dst_alpha);
            if !dst_alpha {
                out.alpha = crate::quantum::QUANTUM_MAX;
            }
            pixels[i] = out;
        }
    }

    let written = ((x1 - x0) * (y1 - y0)) as usize;
    debug!(op = %op, written, "composite");
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantum::QUANTUM_MAX;

    const WHITE: Pixel = Pixel::opaque(QUANTUM_MAX, QUANTUM_MAX, QUANTUM_MAX);

    fn half_green() -> Pixel {
        Pixel {
            red: 0,
            green: QUANTUM_MAX,
            blue: 0,
            black: 0,
            alpha: 32_768,
        }
    }

    #[test]
    fn multiply_half_alpha_green_over_white() {
        let out = CompositeOperator::Multiply.apply(half_green(), true, WHITE, true);
        assert!((i32::from(out.red) - 32_767).abs() <= 1, "red {}", out.red);
        assert!((i32::from(out.blue) - 32_767).abs() <= 1, "blue {}", out.blue);
        assert_eq!(out.green, QUANTUM_MAX);
        assert_eq!(out.alpha, QUANTUM_MAX);
    }

    #[test]
    fn over_opaque_source_replaces() {
        let red = Pixel::opaque(QUANTUM_MAX, 0, 0);
        let out = CompositeOperator::Over.apply(red, true, WHITE, true);
        assert_eq!(out, red);
    }

    #[test]
    fn dst_keeps_destination() {
        let out = CompositeOperator::Dst.apply(half_green(), true, WHITE, true);
        assert_eq!(out, WHITE);
    }

    #[test]
    fn clear_yields_transparent_black() {
        let out = CompositeOperator::Clear.apply(half_green(), true, WHITE, true);
        assert_eq!(out.alpha, 0);
        assert_eq!(out.red, 0);
    }

    #[test]
    fn plus_saturates() {
        let grey = Pixel::opaque(40_000, 40_000, 40_000);
        let out = CompositeOperator::Plus.apply(grey, true, grey, true);
        assert_eq!(out.red, QUANTUM_MAX);
    }

    #[test]
    fn difference_of_equal_colors_is_black() {
        let out = CompositeOperator::Difference.apply(WHITE, false, WHITE, false);
        assert_eq!((out.red, out.green, out.blue), (0, 0, 0));
    }

    #[test]
    fn parses_names_and_constants() {
        assert_eq!("Multiply".parse::<CompositeOperator>().unwrap(), CompositeOperator::Multiply);
        assert_eq!(
            "MultiplyCompositeOp".parse::<CompositeOperator>().unwrap(),
            CompositeOperator::Multiply
        );
        assert_eq!("src".parse::<CompositeOperator>().unwrap(), CompositeOperator::Copy);
        assert!("Bogus".parse::<CompositeOperator>().is_err());
    }

    #[test]
    fn composite_clips_negative_offsets() {
        let mut dst = PixelStore::filled(4, 4, WHITE, false);
        let src = PixelStore::filled(3, 3, Pixel::opaque(0, 0, 0), false);
        let written = composite(&mut dst, &src, -2, -2, CompositeOperator::Over);
        assert_eq!(written, 1);
        assert_eq!(dst.get(0, 0), Some(Pixel::opaque(0, 0, 0)));
        assert_eq!(dst.get(1, 1), Some(WHITE));
    }

    #[test]
    fn composite_outside_is_noop() {
        let mut dst = PixelStore::filled(4, 4, WHITE, false);
        let before = dst.clone();
        let src = PixelStore::filled(2, 2, Pixel::opaque(0, 0, 0), false);
        assert_eq!(composite(&mut dst, &src, 10, 0, CompositeOperator::Over), 0);
        assert_eq!(dst, before);
    }

    #[test]
    fn extreme_offsets_are_noops() {
        let mut dst = PixelStore::filled(4, 4, WHITE, false);
        let before = dst.clone();
        let src = PixelStore::filled(2, 2, Pixel::opaque(0, 0, 0), false);
        for (x, y) in [(i64::MAX, 0), (0, i64::MAX), (i64::MIN, 0), (i64::MAX, i64::MIN)] {
            assert_eq!(composite(&mut dst, &src, x, y, CompositeOperator::Over), 0, "({x}, {y})");
        }
        assert_eq!(dst, before);
    }

    #[test]
    fn alpha_altering_operator_enables_destination_alpha() {
        let mut dst = PixelStore::filled(2, 2, WHITE, false);
        let src = PixelStore::filled(2, 2, half_green(), true);
        composite(&mut dst, &src, 0, 0, CompositeOperator::Copy);
        assert!(dst.has_alpha());
        assert_eq!(dst.get(0, 0).unwrap().alpha, 32_768);
    }

    #[test]
    fn name_round_trips_through_parse() {
        for (_, op) in NAMES {
            assert_eq!(op.name().parse::<CompositeOperator>().unwrap(), *op);
        }
    }
}
