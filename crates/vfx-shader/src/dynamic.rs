//! Dynamic property kinds.
//!
//! A dynamic property is a parameter that can change after a processor is
//! built. The shader creator only records which kinds were bound; the value
//! slots live with the op pipeline and are read through uniform getters.

use std::fmt;

/// Dynamic property types that can be adjusted at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DynamicPropertyType {
    /// Four-curve RGB grading.
    GradingRgbCurve,
    /// Eight-curve hue grading.
    GradingHueCurve,
}

impl DynamicPropertyType {
    /// Short tag used in uniform names.
    pub fn tag(&self) -> &'static str {
        match self {
            DynamicPropertyType::GradingRgbCurve => "grading_rgbcurve",
            DynamicPropertyType::GradingHueCurve => "grading_huecurve",
        }
    }
}

impl fmt::Display for DynamicPropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
