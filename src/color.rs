//! `Color`: one pixel value in quantum units, tagged with the channels that
//! carry meaning.
//!
//! Accepted text forms:
//!
//! | Form | Example | Pixel type |
//! |---|---|---|
//! | name (case-insensitive) | `"red"`, `"DarkOrange"`, `"none"` | RGB (RGBA for `none`/`transparent`) |
//! | 3/6/12-digit hex | `"#f00"`, `"#ff0000"`, `"#ffff00000000"` | RGB |
//! | 4/8/16-digit hex | `"#f008"`, `"#ff000080"` | RGBA |
//! | functional | `"rgb(255,0,0)"`, `"rgb(100%,0%,0%)"`, `"rgba(255,0,0,0.5)"` | RGB / RGBA |
//! | CMYK | `"cmyk(0,255,255,0)"`, `"cmyka(0,0,0,0,1)"` | CMYK / CMYKA |
//!
//! A color that failed to parse is still a value: [`Color::is_valid`] is
//! `false` and every quantum accessor returns zero.

use crate::engine::Pixel;
use crate::error::MagickError;
use crate::quantum::{QUANTUM_MAX, Quantum, QuantumDomain, scale_unit};
use std::fmt;
use std::str::FromStr;

/// Which channels of a [`Color`] are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelType {
    #[default]
    Rgb,
    Rgba,
    Cmyk,
    Cmyka,
}

impl PixelType {
    pub fn has_alpha(self) -> bool {
        matches!(self, PixelType::Rgba | PixelType::Cmyka)
    }

    pub fn is_cmyk(self) -> bool {
        matches!(self, PixelType::Cmyk | PixelType::Cmyka)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    red: Quantum,
    green: Quantum,
    blue: Quantum,
    black: Quantum,
    alpha: Quantum,
    pixel_type: PixelType,
    valid: bool,
}

/// The invalid color: all channels zero, RGB, `is_valid() == false`.
impl Default for Color {
    fn default() -> Self {
        Self {
            red: 0,
            green: 0,
            blue: 0,
            black: 0,
            alpha: QUANTUM_MAX,
            pixel_type: PixelType::Rgb,
            valid: false,
        }
    }
}

impl Color {
    pub fn rgb(red: Quantum, green: Quantum, blue: Quantum) -> Self {
        Self {
            red,
            green,
            blue,
            valid: true,
            ..Self::default()
        }
    }

    pub fn rgba(red: Quantum, green: Quantum, blue: Quantum, alpha: Quantum) -> Self {
        Self {
            alpha,
            pixel_type: PixelType::Rgba,
            ..Self::rgb(red, green, blue)
        }
    }

    pub fn cmyk(cyan: Quantum, magenta: Quantum, yellow: Quantum, black: Quantum) -> Self {
        Self {
            black,
            pixel_type: PixelType::Cmyk,
            ..Self::rgb(cyan, magenta, yellow)
        }
    }

    pub fn cmyka(cyan: Quantum, magenta: Quantum, yellow: Quantum, black: Quantum, alpha: Quantum) -> Self {
        Self {
            black,
            alpha,
            pixel_type: PixelType::Cmyka,
            ..Self::rgb(cyan, magenta, yellow)
        }
    }

    /// Lenient constructor: an unknown name yields an invalid color.
    pub fn named(text: &str) -> Self {
        text.parse().unwrap_or_default()
    }

    pub(crate) fn from_pixel(px: Pixel, pixel_type: PixelType) -> Self {
        Self {
            red: px.red,
            green: px.green,
            blue: px.blue,
            black: if pixel_type.is_cmyk() { px.black } else { 0 },
            alpha: px.alpha,
            pixel_type,
            valid: true,
        }
    }

    pub(crate) fn to_pixel(self) -> Pixel {
        Pixel {
            red: self.quantum_red(),
            green: self.quantum_green(),
            blue: self.quantum_blue(),
            black: self.quantum_black(),
            alpha: if self.valid { self.alpha } else { QUANTUM_MAX },
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    fn gated(&self, q: Quantum) -> Quantum {
        if self.valid { q } else { 0 }
    }

    pub fn quantum_red(&self) -> Quantum {
        self.gated(self.red)
    }

    pub fn quantum_green(&self) -> Quantum {
        self.gated(self.green)
    }

    pub fn quantum_blue(&self) -> Quantum {
        self.gated(self.blue)
    }

    pub fn quantum_black(&self) -> Quantum {
        self.gated(self.black)
    }

    pub fn quantum_alpha(&self) -> Quantum {
        self.gated(self.alpha)
    }

    /// True when the color is not fully opaque.
    pub fn is_translucent(&self) -> bool {
        self.valid && self.alpha < QUANTUM_MAX
    }
}

const NAMED: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("lime", [0, 255, 0]),
    ("green", [0, 128, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("aqua", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("fuchsia", [255, 0, 255]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("silver", [192, 192, 192]),
    ("lightgray", [211, 211, 211]),
    ("darkgray", [169, 169, 169]),
    ("maroon", [128, 0, 0]),
    ("olive", [128, 128, 0]),
    ("navy", [0, 0, 128]),
    ("purple", [128, 0, 128]),
    ("teal", [0, 128, 128]),
    ("orange", [255, 165, 0]),
    ("darkorange", [255, 140, 0]),
    ("gold", [255, 215, 0]),
    ("pink", [255, 192, 203]),
    ("hotpink", [255, 105, 180]),
    ("brown", [165, 42, 42]),
    ("chocolate", [210, 105, 30]),
    ("tan", [210, 180, 140]),
    ("beige", [245, 245, 220]),
    ("ivory", [255, 255, 240]),
    ("khaki", [240, 230, 140]),
    ("violet", [238, 130, 238]),
    ("indigo", [75, 0, 130]),
    ("orchid", [218, 112, 214]),
    ("salmon", [250, 128, 114]),
    ("coral", [255, 127, 80]),
    ("tomato", [255, 99, 71]),
    ("crimson", [220, 20, 60]),
    ("skyblue", [135, 206, 235]),
    ("steelblue", [70, 130, 180]),
    ("royalblue", [65, 105, 225]),
    ("forestgreen", [34, 139, 34]),
    ("seagreen", [46, 139, 87]),
    ("turquoise", [64, 224, 208]),
    ("wheat", [245, 222, 179]),
    ("snow", [255, 250, 250]),
];

fn invalid(text: &str) -> MagickError {
    MagickError::InvalidValue(format!("unrecognized color '{text}'"))
}

fn parse_hex(digits: &str, text: &str) -> Result<Color, MagickError> {
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid(text));
    }
    let (width, count) = match digits.len() {
        3 => (1, 3),
        4 => (1, 4),
        6 => (2, 3),
        8 => (2, 4),
        12 => (4, 3),
        16 => (4, 4),
        _ => return Err(invalid(text)),
    };
    let mut q = [QUANTUM_MAX; 4];
    for (i, slot) in q.iter_mut().enumerate().take(count) {
        let part = &digits[i * width..(i + 1) * width];
        let v = u16::from_str_radix(part, 16).map_err(|_| invalid(text))?;
        *slot = match width {
            1 => v * 17 * 257,
            2 => v * 257,
            _ => v,
        };
    }
    Ok(if count == 4 {
        Color::rgba(q[0], q[1], q[2], q[3])
    } else {
        Color::rgb(q[0], q[1], q[2])
    })
}

/// One `rgb()`/`cmyk()` component: `0..=255` or a percentage.
fn component(part: &str, text: &str) -> Result<Quantum, MagickError> {
    let part = part.trim();
    if let Some(pct) = part.strip_suffix('%') {
        let v: f64 = pct.trim().parse().map_err(|_| invalid(text))?;
        return Ok(scale_unit(v / 100.0));
    }
    let v: f64 = part.parse().map_err(|_| invalid(text))?;
    if !(0.0..=255.0).contains(&v) {
        return Err(invalid(text));
    }
    Ok(scale_unit(v / 255.0))
}

/// An alpha component: `0.0..=1.0` or a percentage.
fn alpha_component(part: &str, text: &str) -> Result<Quantum, MagickError> {
    let part = part.trim();
    if let Some(pct) = part.strip_suffix('%') {
        let v: f64 = pct.trim().parse().map_err(|_| invalid(text))?;
        return Ok(scale_unit(v / 100.0));
    }
    let v: f64 = part.parse().map_err(|_| invalid(text))?;
    Ok(v.to_quantum())
}

fn parse_functional(name: &str, args: &str, text: &str) -> Result<Color, MagickError> {
    let parts: Vec<&str> = args.split(',').collect();
    let c = |i: usize| component(parts[i], text);
    match (name, parts.len()) {
        ("rgb", 3) => Ok(Color::rgb(c(0)?, c(1)?, c(2)?)),
        ("rgba", 4) => Ok(Color::rgba(c(0)?, c(1)?, c(2)?, alpha_component(parts[3], text)?)),
        ("cmyk", 4) => Ok(Color::cmyk(c(0)?, c(1)?, c(2)?, c(3)?)),
        ("cmyka", 5) => Ok(Color::cmyka(c(0)?, c(1)?, c(2)?, c(3)?, alpha_component(parts[4], text)?)),
        _ => Err(invalid(text)),
    }
}

impl FromStr for Color {
    type Err = MagickError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let s: String = text.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_ascii_lowercase();

        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex, text);
        }
        if let Some((name, rest)) = s.split_once('(') {
            let args = rest.strip_suffix(')').ok_or_else(|| invalid(text))?;
            return parse_functional(name, args, text);
        }
        if s == "none" || s == "transparent" {
            return Ok(Color::rgba(0, 0, 0, 0));
        }
        NAMED
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, [r, g, b])| Color::rgb(r.to_quantum(), g.to_quantum(), b.to_quantum()))
            .ok_or_else(|| invalid(text))
    }
}

impl From<&str> for Color {
    fn from(text: &str) -> Self {
        Color::named(text)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            return f.write_str("invalid");
        }
        match self.pixel_type {
            PixelType::Rgb => write!(f, "#{:04X}{:04X}{:04X}", self.red, self.green, self.blue),
            PixelType::Rgba => write!(
                f,
                "#{:04X}{:04X}{:04X}{:04X}",
                self.red, self.green, self.blue, self.alpha
            ),
            PixelType::Cmyk => write!(f, "cmyk({},{},{},{})", self.red, self.green, self.blue, self.black),
            PixelType::Cmyka => write!(
                f,
                "cmyka({},{},{},{},{})",
                self.red, self.green, self.blue, self.black, self.alpha
            ),
        }
    }
}
