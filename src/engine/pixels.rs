//! Quantum pixel storage owned by the engine.
//!
//! Every pixel carries five quantum slots (red, green, blue, black, alpha)
//! regardless of colorspace. In [`Colorspace::Cmyk`] the first three slots
//! hold cyan, magenta and yellow; in [`Colorspace::Gray`] all three hold the
//! same luma. While the alpha channel is disabled every alpha slot is
//! [`QUANTUM_MAX`], so readers never see stale transparency.

use crate::quantum::{QUANTUM_MAX, Quantum, scale_unit, unit};

/// One pixel in engine units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    pub red: Quantum,
    pub green: Quantum,
    pub blue: Quantum,
    pub black: Quantum,
    pub alpha: Quantum,
}

impl Pixel {
    pub const fn opaque(red: Quantum, green: Quantum, blue: Quantum) -> Self {
        Self {
            red,
            green,
            blue,
            black: 0,
            alpha: QUANTUM_MAX,
        }
    }

    /// Rec. 709 luma of the color slots.
    pub fn luma(&self) -> Quantum {
        let l = 0.212_656 * unit(self.red) + 0.715_158 * unit(self.green) + 0.072_186 * unit(self.blue);
        scale_unit(l)
    }

    /// Convert a CMYK-encoded pixel to RGB slots (`r = (1 - c)(1 - k)`).
    pub fn cmyk_to_rgb(&self) -> Pixel {
        let k = 1.0 - unit(self.black);
        let conv = |c: Quantum| scale_unit((1.0 - unit(c)) * k);
        Pixel {
            red: conv(self.red),
            green: conv(self.green),
            blue: conv(self.blue),
            black: 0,
            alpha: self.alpha,
        }
    }

    /// Naive RGB to CMYK (`k = 1 - max(r, g, b)`).
    pub fn rgb_to_cmyk(&self) -> Pixel {
        let (r, g, b) = (unit(self.red), unit(self.green), unit(self.blue));
        let k = 1.0 - r.max(g).max(b);
        if k >= 1.0 {
            return Pixel {
                red: 0,
                green: 0,
                blue: 0,
                black: QUANTUM_MAX,
                alpha: self.alpha,
            };
        }
        let conv = |c: f64| scale_unit((1.0 - c - k) / (1.0 - k));
        Pixel {
            red: conv(r),
            green: conv(g),
            blue: conv(b),
            black: scale_unit(k),
            alpha: self.alpha,
        }
    }
}

impl Default for Pixel {
    fn default() -> Self {
        Pixel::opaque(0, 0, 0)
    }
}

/// Interpretation of the color slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colorspace {
    #[default]
    Srgb,
    Gray,
    Cmyk,
}

/// An axis-aligned rectangle already known to lie inside a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Row-major pixel grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PixelStore {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
    alpha: bool,
    colorspace: Colorspace,
}

impl PixelStore {
    /// A `width` x `height` store with every pixel set to `fill`.
    ///
    /// Enabling `alpha` keeps the fill's alpha; otherwise alpha is forced opaque.
    pub fn filled(width: u32, height: u32, fill: Pixel, alpha: bool) -> Self {
        let fill = if alpha {
            fill
        } else {
            Pixel {
                alpha: QUANTUM_MAX,
                ..fill
            }
        };
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
            alpha,
            colorspace: Colorspace::Srgb,
        }
    }

    /// Build a store from row-major pixels. Returns `None` if the count is wrong.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Pixel>, alpha: bool) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        let mut store = Self {
            width,
            height,
            pixels,
            alpha: true,
            colorspace: Colorspace::Srgb,
        };
        store.set_alpha(alpha);
        Some(store)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha
    }

    /// Toggle the alpha channel. Disabling it resets every pixel to opaque.
    pub fn set_alpha(&mut self, enabled: bool) {
        if !enabled {
            for px in &mut self.pixels {
                px.alpha = QUANTUM_MAX;
            }
        }
        self.alpha = enabled;
    }

    pub fn colorspace(&self) -> Colorspace {
        self.colorspace
    }

    pub fn set_colorspace(&mut self, colorspace: Colorspace) {
        self.colorspace = colorspace;
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// True if `region` lies entirely inside the store.
    pub fn contains_region(&self, region: Region) -> bool {
        u64::from(region.x) + u64::from(region.width) <= u64::from(self.width)
            && u64::from(region.y) + u64::from(region.height) <= u64::from(self.height)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Pixel> {
        self.contains(x, y).then(|| self.pixels[self.index(x, y)])
    }

    /// Overwrite one pixel; returns `false` when out of bounds.
    pub fn set(&mut self, x: u32, y: u32, px: Pixel) -> bool {
        if !self.contains(x, y) {
            return false;
        }
        let i = self.index(x, y);
        self.pixels[i] = if self.alpha {
            px
        } else {
            Pixel {
                alpha: QUANTUM_MAX,
                ..px
            }
        };
        true
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    /// Pixels of row `y`.
    pub fn row(&self, y: u32) -> &[Pixel] {
        let start = self.index(0, y);
        &self.pixels[start..start + self.width as usize]
    }

    /// Copy of `region`, which must satisfy [`contains_region`](Self::contains_region).
    pub fn extract(&self, region: Region) -> PixelStore {
        let mut pixels = Vec::with_capacity(region.width as usize * region.height as usize);
        for y in region.y..region.y + region.height {
            let row = self.row(y);
            pixels.extend_from_slice(&row[region.x as usize..(region.x + region.width) as usize]);
        }
        PixelStore {
            width: region.width,
            height: region.height,
            pixels,
            alpha: self.alpha,
            colorspace: self.colorspace,
        }
    }
}
