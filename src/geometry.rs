//! `Geometry`: a size plus an optional offset.
//!
//! Parsed from `"WxH"`, `"WxH+X+Y"` (offsets may be negative: `"WxH-X-Y"`)
//! or a bare `"W"` meaning a `W`x`W` square. `Geometry` is `Copy`; every copy
//! is independent.
//!
//! Two parse paths exist:
//! - [`FromStr`] is strict and returns [`MagickError::InvalidValue`].
//! - `From<&str>` never fails; bad input yields a geometry whose
//!   [`is_valid`](Geometry::is_valid) is `false`.

use crate::error::MagickError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Geometry {
    width: u32,
    height: u32,
    x: i64,
    y: i64,
    valid: bool,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_offset(width, height, 0, 0)
    }

    pub fn with_offset(width: u32, height: u32, x: i64, y: i64) -> Self {
        Self {
            width,
            height,
            x,
            y,
            valid: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn x(&self) -> i64 {
        self.x
    }

    pub fn y(&self) -> i64 {
        self.y
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height;
    }

    pub fn set_x(&mut self, x: i64) {
        self.x = x;
    }

    pub fn set_y(&mut self, y: i64) {
        self.y = y;
    }

    /// False only for a geometry produced from unparseable text (or `default()`).
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

fn parse_dim(s: &str, text: &str) -> Result<u32, MagickError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(text));
    }
    s.parse().map_err(|_| invalid(text))
}

fn invalid(text: &str) -> MagickError {
    MagickError::InvalidValue(format!("invalid geometry '{text}'"))
}

/// Split `"+3-4"` into the two signed offsets.
fn parse_offsets(s: &str, text: &str) -> Result<(i64, i64), MagickError> {
    let second = s[1..].find(['+', '-']).map(|i| i + 1).ok_or_else(|| invalid(text))?;
    let (xs, ys) = s.split_at(second);
    let signed = |part: &str| -> Result<i64, MagickError> {
        let (sign, digits) = part.split_at(1);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(text));
        }
        let v: i64 = digits.parse().map_err(|_| invalid(text))?;
        Ok(if sign == "-" { -v } else { v })
    };
    Ok((signed(xs)?, signed(ys)?))
}

impl FromStr for Geometry {
    type Err = MagickError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let s = text.trim();
        let (size, offsets) = match s.find(['+', '-']) {
            Some(i) => s.split_at(i),
            None => (s, ""),
        };
        let (width, height) = match size.split_once(['x', 'X']) {
            Some((w, h)) => (parse_dim(w, text)?, parse_dim(h, text)?),
            None => {
                let w = parse_dim(size, text)?;
                (w, w)
            }
        };
        let (x, y) = if offsets.is_empty() {
            (0, 0)
        } else {
            parse_offsets(offsets, text)?
        };
        Ok(Geometry::with_offset(width, height, x, y))
    }
}

impl From<&str> for Geometry {
    fn from(text: &str) -> Self {
        text.parse().unwrap_or_default()
    }
}

impl From<(u32, u32)> for Geometry {
    fn from((width, height): (u32, u32)) -> Self {
        Geometry::new(width, height)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}{:+}{:+}", self.width, self.height, self.x, self.y)
    }
}
