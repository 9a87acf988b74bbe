//! Named pixel layouts for external buffers.
//!
//! A layout is a case-sensitive token (`"RGB"`, `"RGBA"`, `"Gray"`, ...) that
//! fixes the order of channel roles inside one pixel and therefore the buffer
//! stride. The table is static; there is no runtime registration.

use crate::error::MagickError;
use std::fmt;
use std::str::FromStr;

/// Meaning of one element within an external pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Red,
    Green,
    Blue,
    Alpha,
    /// Luma; imported into all three color slots.
    Gray,
    Cyan,
    Magenta,
    Yellow,
    Black,
    /// Ignored on import, written as zero on export.
    Padding,
}

/// A resolved channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    name: &'static str,
    roles: &'static [ChannelRole],
}

use ChannelRole::*;

const LAYOUTS: &[Layout] = &[
    Layout::define("RGB", &[Red, Green, Blue]),
    Layout::define("RGBA", &[Red, Green, Blue, Alpha]),
    Layout::define("RGBP", &[Red, Green, Blue, Padding]),
    Layout::define("BGR", &[Blue, Green, Red]),
    Layout::define("BGRA", &[Blue, Green, Red, Alpha]),
    Layout::define("BGRP", &[Blue, Green, Red, Padding]),
    Layout::define("ARGB", &[Alpha, Red, Green, Blue]),
    Layout::define("ABGR", &[Alpha, Blue, Green, Red]),
    Layout::define("Gray", &[Gray]),
    Layout::define("GrayA", &[Gray, Alpha]),
    Layout::define("CMYK", &[Cyan, Magenta, Yellow, Black]),
    Layout::define("CMYKA", &[Cyan, Magenta, Yellow, Black, Alpha]),
];

impl Layout {
    const fn define(name: &'static str, roles: &'static [ChannelRole]) -> Self {
        Self { name, roles }
    }

    /// Look up a layout by its exact name.
    pub fn resolve(name: &str) -> Result<Self, MagickError> {
        LAYOUTS
            .iter()
            .find(|l| l.name == name)
            .copied()
            .ok_or_else(|| MagickError::UnsupportedLayout(name.to_string()))
    }

    /// Every known layout, in table order.
    pub fn all() -> &'static [Layout] {
        LAYOUTS
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn roles(&self) -> &'static [ChannelRole] {
        self.roles
    }

    /// Elements per pixel.
    pub fn channels(&self) -> usize {
        self.roles.len()
    }

    pub fn has_alpha(&self) -> bool {
        self.roles.contains(&Alpha)
    }

    pub fn is_gray(&self) -> bool {
        self.roles.contains(&Gray)
    }

    pub fn is_cmyk(&self) -> bool {
        self.roles.contains(&Black)
    }
}

impl FromStr for Layout {
    type Err = MagickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::resolve(s)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
