//! Axis labels, axis swaps and per-axis sign flips.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// Plain `[x, y, z]` triple used for every channel.
pub type Vec3 = [f64; 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Axis swap for one channel.
///
/// Written as three letters naming, for each output slot in x/y/z order, the
/// source axis it reads from: `"XZY"` keeps x and exchanges y with z, `"YZX"`
/// emits `[y, z, x]`. Only true permutations are representable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AxisPermutation([Axis; 3]);

impl AxisPermutation {
    pub const IDENTITY: Self = Self([Axis::X, Axis::Y, Axis::Z]);

    /// Build from explicit source axes, rejecting any repeated axis.
    pub fn new(sources: [Axis; 3]) -> Result<Self, ExportError> {
        let mut seen = [false; 3];
        for axis in sources {
            if std::mem::replace(&mut seen[axis.index()], true) {
                return Err(ExportError::config(
                    "axisSwap",
                    format!("axis {} appears more than once", axis.label().to_uppercase()),
                ));
            }
        }
        Ok(Self(sources))
    }

    pub fn parse(text: &str) -> Result<Self, ExportError> {
        let letters: Vec<char> = text.trim().chars().collect();
        if letters.len() != 3 {
            return Err(ExportError::config(
                "axisSwap",
                format!("'{text}' must name exactly three axes"),
            ));
        }
        let mut sources = [Axis::X; 3];
        for (slot, c) in letters.into_iter().enumerate() {
            sources[slot] = Axis::from_char(c).ok_or_else(|| {
                ExportError::config("axisSwap", format!("'{c}' in '{text}' is not X, Y or Z"))
            })?;
        }
        Self::new(sources)
    }

    /// Source axis feeding `output`.
    #[inline]
    pub fn source_of(&self, output: Axis) -> Axis {
        self.0[output.index()]
    }

    #[inline]
    pub fn apply(&self, v: Vec3) -> Vec3 {
        [v[self.0[0].index()], v[self.0[1].index()], v[self.0[2].index()]]
    }

    /// Permutation undoing `self`.
    pub fn inverse(&self) -> Self {
        let mut sources = [Axis::X; 3];
        for output in Axis::ALL {
            sources[self.source_of(output).index()] = output;
        }
        Self(sources)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for AxisPermutation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for AxisPermutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.0 {
            f.write_str(&axis.label().to_uppercase())?;
        }
        Ok(())
    }
}

impl FromStr for AxisPermutation {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AxisPermutation {
    type Error = ExportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AxisPermutation> for String {
    fn from(value: AxisPermutation) -> Self {
        value.to_string()
    }
}

/// Per-axis sign flips, applied after the channel's axis swap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[bool; 3]", into = "[bool; 3]")]
pub struct AxisInvert([bool; 3]);

impl AxisInvert {
    pub const NONE: Self = Self([false; 3]);

    pub fn new(x: bool, y: bool, z: bool) -> Self {
        Self([x, y, z])
    }

    #[inline]
    pub fn is_set(&self, axis: Axis) -> bool {
        self.0[axis.index()]
    }

    #[inline]
    pub fn apply(&self, v: Vec3) -> Vec3 {
        let flip = |i: usize| if self.0[i] { -v[i] } else { v[i] };
        [flip(0), flip(1), flip(2)]
    }
}

impl From<[bool; 3]> for AxisInvert {
    fn from(value: [bool; 3]) -> Self {
        Self(value)
    }
}

impl From<AxisInvert> for [bool; 3] {
    fn from(value: AxisInvert) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_SWAPS: [&str; 6] = ["XYZ", "XZY", "YXZ", "YZX", "ZXY", "ZYX"];

    #[test]
    fn swap_reads_named_source_axes() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(AxisPermutation::parse("XZY").unwrap().apply(v), [1.0, 3.0, 2.0]);
        assert_eq!(AxisPermutation::parse("YZX").unwrap().apply(v), [2.0, 3.0, 1.0]);
        assert_eq!(AxisPermutation::parse("zxy").unwrap().apply(v), [3.0, 1.0, 2.0]);
    }

    #[test]
    fn every_swap_is_undone_by_its_inverse() {
        let v = [0.25, -7.5, 12.0];
        for text in ALL_SWAPS {
            let p: AxisPermutation = text.parse().unwrap();
            assert_eq!(p.inverse().apply(p.apply(v)), v, "swap {text}");
            assert_eq!(p.apply(p.inverse().apply(v)), v, "swap {text}");
        }
    }

    #[test]
    fn non_bijective_swaps_are_rejected() {
        for bad in ["XXY", "XY", "XYZW", "ABC", ""] {
            let err = AxisPermutation::parse(bad).unwrap_err();
            assert_eq!(err.category(), "config", "input {bad:?}");
        }
    }

    #[test]
    fn double_inversion_restores_values() {
        let v = [1.5, -2.0, 0.5];
        let inv = AxisInvert::new(true, false, true);
        assert_eq!(inv.apply(v), [-1.5, -2.0, -0.5]);
        assert_eq!(inv.apply(inv.apply(v)), v);
    }

    #[test]
    fn swap_round_trips_through_serde_as_string() {
        let p = AxisPermutation::parse("ZYX").unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"ZYX\"");
        let bad: Result<AxisPermutation, _> = serde_json::from_str("\"XXZ\"");
        assert!(bad.is_err());
    }
}
