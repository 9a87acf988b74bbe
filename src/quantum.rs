//! Quantum scaling between external numeric domains and the engine's
//! fixed 16-bit channel range.
//!
//! Every channel value the engine stores is a [`Quantum`] in `0..=QUANTUM_MAX`.
//! External buffers may use any of six numeric domains:
//!
//! | Domain | External range | To quantum | From quantum | Round-trip |
//! |---|---|---|---|---|
//! | `u8` | `0..=255` | `v * 257` | `(q + 128) / 257` | exact |
//! | `u16` | `0..=65535` | identity | identity | exact |
//! | `u32` | `0..=2^32-1` | `round(v / 65537)` | `q * 65537` | lossy |
//! | `u64` | `0..=2^64-1` | `round(v / 281479271743489)` | `q * 281479271743489` | lossy |
//! | `f32` | `0.0..=1.0` | `round(clamp(v) * 65535)` | `q / 65535` | lossy |
//! | `f64` | `0.0..=1.0` | `round(clamp(v) * 65535)` | `q / 65535` | lossy |
//!
//! The integer factors are exact: `2^32-1 = 65535 * 65537` and
//! `2^64-1 = 65535 * 65537 * 4294967297`, so the domain maximum always maps to
//! `QUANTUM_MAX` and back to the domain maximum.
//!
//! Domains wider than 16 bits lose precision on import. That loss is part of
//! the contract: only `u8` and `u16` values survive an import/export cycle
//! bit-for-bit. Float inputs outside `[0, 1]` (and NaN) are clamped.

use serde::Serialize;
use std::fmt;

/// One channel intensity in engine units.
pub type Quantum = u16;

/// Largest quantum value (fully saturated channel / fully opaque alpha).
pub const QUANTUM_MAX: Quantum = u16::MAX;

const U32_FACTOR: u64 = 65_537;
const U64_FACTOR: u128 = 281_479_271_743_489;

/// Discriminant for the external numeric domain of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NumericDomain {
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl NumericDomain {
    pub const ALL: [NumericDomain; 6] = [
        NumericDomain::U8,
        NumericDomain::U16,
        NumericDomain::U32,
        NumericDomain::U64,
        NumericDomain::F32,
        NumericDomain::F64,
    ];

    /// Size of one element in bytes.
    pub fn element_size(self) -> usize {
        match self {
            NumericDomain::U8 => 1,
            NumericDomain::U16 => 2,
            NumericDomain::U32 | NumericDomain::F32 => 4,
            NumericDomain::U64 | NumericDomain::F64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, NumericDomain::F32 | NumericDomain::F64)
    }

    /// True when converting through the quantum range can lose information.
    pub fn is_lossy(self) -> bool {
        !matches!(self, NumericDomain::U8 | NumericDomain::U16)
    }
}

impl fmt::Display for NumericDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NumericDomain::U8 => "u8",
            NumericDomain::U16 => "u16",
            NumericDomain::U32 => "u32",
            NumericDomain::U64 => "u64",
            NumericDomain::F32 => "f32",
            NumericDomain::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// A numeric element type that can be marshalled to and from quantum units.
///
/// Implemented for exactly the six supported domains; the marshaller is
/// generic over this trait and monomorphised once per domain.
pub trait QuantumDomain: Copy + Default + Send + Sync + 'static {
    const DOMAIN: NumericDomain;
    /// Value that maps to [`QUANTUM_MAX`].
    const MAX: Self;

    fn to_quantum(self) -> Quantum;
    fn from_quantum(q: Quantum) -> Self;
}

impl QuantumDomain for u8 {
    const DOMAIN: NumericDomain = NumericDomain::U8;
    const MAX: Self = u8::MAX;

    #[inline]
    fn to_quantum(self) -> Quantum {
        Quantum::from(self) * 257
    }

    #[inline]
    fn from_quantum(q: Quantum) -> Self {
        ((u32::from(q) + 128) / 257) as u8
    }
}

impl QuantumDomain for u16 {
    const DOMAIN: NumericDomain = NumericDomain::U16;
    const MAX: Self = u16::MAX;

    #[inline]
    fn to_quantum(self) -> Quantum {
        self
    }

    #[inline]
    fn from_quantum(q: Quantum) -> Self {
        q
    }
}

impl QuantumDomain for u32 {
    const DOMAIN: NumericDomain = NumericDomain::U32;
    const MAX: Self = u32::MAX;

    #[inline]
    fn to_quantum(self) -> Quantum {
        ((u64::from(self) + U32_FACTOR / 2) / U32_FACTOR) as Quantum
    }

    #[inline]
    fn from_quantum(q: Quantum) -> Self {
        (u64::from(q) * U32_FACTOR) as u32
    }
}

impl QuantumDomain for u64 {
    const DOMAIN: NumericDomain = NumericDomain::U64;
    const MAX: Self = u64::MAX;

    #[inline]
    fn to_quantum(self) -> Quantum {
        ((u128::from(self) + U64_FACTOR / 2) / U64_FACTOR) as Quantum
    }

    #[inline]
    fn from_quantum(q: Quantum) -> Self {
        (u128::from(q) * U64_FACTOR) as u64
    }
}

impl QuantumDomain for f32 {
    const DOMAIN: NumericDomain = NumericDomain::F32;
    const MAX: Self = 1.0;

    #[inline]
    fn to_quantum(self) -> Quantum {
        f64::from(self).to_quantum()
    }

    #[inline]
    fn from_quantum(q: Quantum) -> Self {
        (f64::from(q) / f64::from(QUANTUM_MAX)) as f32
    }
}

impl QuantumDomain for f64 {
    const DOMAIN: NumericDomain = NumericDomain::F64;
    const MAX: Self = 1.0;

    #[inline]
    fn to_quantum(self) -> Quantum {
        // clamp passes NaN through
        let v = if self.is_nan() { 0.0 } else { self.clamp(0.0, 1.0) };
        (v * f64::from(QUANTUM_MAX)).round() as Quantum
    }

    #[inline]
    fn from_quantum(q: Quantum) -> Self {
        f64::from(q) / f64::from(QUANTUM_MAX)
    }
}

/// Scale a normalized `[0, 1]` value to quantum units.
pub(crate) fn scale_unit(v: f64) -> Quantum {
    v.to_quantum()
}

/// Quantum value as a normalized `[0, 1]` float.
pub(crate) fn unit(q: Quantum) -> f64 {
    f64::from_quantum(q)
}
