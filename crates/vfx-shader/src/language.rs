//! Target shading languages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Target shader language.
///
/// The serialized names are the stable identifiers embedders put in their
/// configuration (`GLSL_4_0`, `MSL_2_0`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderLanguage {
    /// GLSL 1.20 (OpenGL 2.1)
    #[serde(rename = "GLSL_1_2")]
    Glsl12,
    /// GLSL 1.30 (OpenGL 3.0)
    #[serde(rename = "GLSL_1_3")]
    Glsl13,
    /// GLSL 4.00 (OpenGL 4.0)
    #[default]
    #[serde(rename = "GLSL_4_0")]
    Glsl40,
    /// GLSL ES 1.00 (WebGL 1)
    #[serde(rename = "GLSL_ES_1_0")]
    GlslEs10,
    /// GLSL ES 3.00 (WebGL 2)
    #[serde(rename = "GLSL_ES_3_0")]
    GlslEs30,
    /// Nvidia Cg
    #[serde(rename = "CG")]
    Cg,
    /// HLSL, DirectX 11
    #[serde(rename = "HLSL_DX11")]
    HlslDx11,
    /// Metal Shading Language 2.0
    #[serde(rename = "MSL_2_0")]
    Msl20,
    /// Open Shading Language 1
    #[serde(rename = "OSL_1")]
    Osl1,
}

impl ShaderLanguage {
    /// All supported languages.
    pub const ALL: [ShaderLanguage; 9] = [
        ShaderLanguage::Glsl12,
        ShaderLanguage::Glsl13,
        ShaderLanguage::Glsl40,
        ShaderLanguage::GlslEs10,
        ShaderLanguage::GlslEs30,
        ShaderLanguage::Cg,
        ShaderLanguage::HlslDx11,
        ShaderLanguage::Msl20,
        ShaderLanguage::Osl1,
    ];

    /// Stable identifier, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShaderLanguage::Glsl12 => "GLSL_1_2",
            ShaderLanguage::Glsl13 => "GLSL_1_3",
            ShaderLanguage::Glsl40 => "GLSL_4_0",
            ShaderLanguage::GlslEs10 => "GLSL_ES_1_0",
            ShaderLanguage::GlslEs30 => "GLSL_ES_3_0",
            ShaderLanguage::Cg => "CG",
            ShaderLanguage::HlslDx11 => "HLSL_DX11",
            ShaderLanguage::Msl20 => "MSL_2_0",
            ShaderLanguage::Osl1 => "OSL_1",
        }
    }

    /// Returns true for desktop and ES GLSL variants.
    pub fn is_glsl(&self) -> bool {
        matches!(
            self,
            ShaderLanguage::Glsl12
                | ShaderLanguage::Glsl13
                | ShaderLanguage::Glsl40
                | ShaderLanguage::GlslEs10
                | ShaderLanguage::GlslEs30
        )
    }

    /// Returns true for OpenGL ES variants.
    pub fn is_glsl_es(&self) -> bool {
        matches!(self, ShaderLanguage::GlslEs10 | ShaderLanguage::GlslEs30)
    }

    /// Languages whose texture sampling uses the generic `texture()` call.
    pub(crate) fn has_generic_texture_call(&self) -> bool {
        matches!(self, ShaderLanguage::Glsl40 | ShaderLanguage::GlslEs30)
    }
}

impl fmt::Display for ShaderLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_yaml() {
        for lang in ShaderLanguage::ALL {
            let yaml = serde_yaml::to_string(&lang).unwrap();
            assert_eq!(yaml.trim(), lang.as_str());
            let back: ShaderLanguage = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(back, lang);
        }
    }

    #[test]
    fn test_families() {
        assert!(ShaderLanguage::GlslEs10.is_glsl());
        assert!(ShaderLanguage::GlslEs10.is_glsl_es());
        assert!(!ShaderLanguage::HlslDx11.is_glsl());
        assert!(!ShaderLanguage::Glsl40.is_glsl_es());
    }
}
