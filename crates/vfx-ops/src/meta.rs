//! Metadata shared by every op: bit depths, direction and descriptive fields.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Nominal bit depth of an op's input or output.
///
/// Pixels are always processed as normalized `f32`; the tag records what
/// the surrounding file format declared and must chain across a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BitDepth {
    /// 8-bit integer.
    #[serde(rename = "8i")]
    UInt8,
    /// 10-bit integer.
    #[serde(rename = "10i")]
    UInt10,
    /// 12-bit integer.
    #[serde(rename = "12i")]
    UInt12,
    /// 16-bit integer.
    #[serde(rename = "16i")]
    UInt16,
    /// 16-bit half float.
    #[serde(rename = "16f")]
    F16,
    /// 32-bit float.
    #[default]
    #[serde(rename = "32f")]
    F32,
}

impl BitDepth {
    /// Short tag used in cache-IDs.
    pub fn as_str(&self) -> &'static str {
        match self {
            BitDepth::UInt8 => "8i",
            BitDepth::UInt10 => "10i",
            BitDepth::UInt12 => "12i",
            BitDepth::UInt16 => "16i",
            BitDepth::F16 => "16f",
            BitDepth::F32 => "32f",
        }
    }

    /// True for the float depths.
    pub fn is_float(&self) -> bool {
        matches!(self, BitDepth::F16 | BitDepth::F32)
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction an op is applied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// As specified.
    #[default]
    Forward,
    /// The mathematical inverse.
    Inverse,
}

impl Direction {
    /// The opposite direction.
    pub fn inverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Inverse,
            Direction::Inverse => Direction::Forward,
        }
    }

    /// Combines two directions: inverse of inverse is forward.
    pub fn combine(self, other: Direction) -> Self {
        if self == other { Direction::Forward } else { Direction::Inverse }
    }

    /// Lowercase name used in cache-IDs and shader comments.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Inverse => "inverse",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields common to every op payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpMeta {
    /// Identifier from the source file, if any.
    pub id: String,
    /// Human-readable name.
    pub name: Option<String>,
    /// Free-form descriptions.
    pub descriptions: Vec<String>,
    /// Declared input depth.
    pub input_bit_depth: BitDepth,
    /// Declared output depth.
    pub output_bit_depth: BitDepth,
}

impl OpMeta {
    /// Metadata with both depths set to `depth`.
    pub fn with_depths(input: BitDepth, output: BitDepth) -> Self {
        Self { input_bit_depth: input, output_bit_depth: output, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_algebra() {
        assert_eq!(Direction::Forward.inverse(), Direction::Inverse);
        assert_eq!(Direction::Inverse.combine(Direction::Inverse), Direction::Forward);
        assert_eq!(Direction::Forward.combine(Direction::Inverse), Direction::Inverse);
    }

    #[test]
    fn test_bit_depth_tags() {
        assert_eq!(BitDepth::UInt10.to_string(), "10i");
        assert_eq!(BitDepth::default(), BitDepth::F32);
        assert!(BitDepth::F16.is_float());
        assert!(!BitDepth::UInt16.is_float());
    }
}
