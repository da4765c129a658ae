//! Shader description: what the embedder asks the creator to produce.

use serde::{Deserialize, Serialize};

use crate::{ShaderLanguage, ShaderResult};

/// Configuration of one shader assembly.
///
/// Loads from YAML; omitted fields take their defaults:
///
/// ```rust
/// use vfx_shader::{ShaderDesc, ShaderLanguage};
///
/// let desc = ShaderDesc::from_yaml("language: MSL_2_0\nclass_name: Grade\n").unwrap();
/// assert_eq!(desc.language, ShaderLanguage::Msl20);
/// assert_eq!(desc.class_name, "Grade");
/// assert_eq!(desc.function_name, "OCIODisplay");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderDesc {
    /// Target language.
    pub language: ShaderLanguage,
    /// Name of the emitted function.
    pub function_name: String,
    /// Name of the pixel variable the body mutates.
    pub pixel_name: String,
    /// Prefix of every texture and uniform name.
    pub resource_prefix: String,
    /// Struct (MSL) or shader (OSL) name used by the class wrapper.
    pub class_name: String,
    /// Largest texture width the embedder can upload.
    pub texture_max_width: usize,
    /// When false, 1D LUTs always use 2D textures.
    pub allow_texture_1d: bool,
}

impl Default for ShaderDesc {
    fn default() -> Self {
        Self {
            language: ShaderLanguage::default(),
            function_name: "OCIODisplay".to_string(),
            pixel_name: "outColor".to_string(),
            resource_prefix: "ocio".to_string(),
            class_name: "OCIOColorTransform".to_string(),
            texture_max_width: 4096,
            allow_texture_1d: true,
        }
    }
}

impl ShaderDesc {
    /// Default description for `language`.
    pub fn new(language: ShaderLanguage) -> Self {
        Self { language, ..Self::default() }
    }

    /// Parses a description from YAML.
    pub fn from_yaml(yaml: &str) -> ShaderResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Sets the function name.
    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = name.into();
        self
    }

    /// Sets the pixel variable name.
    pub fn with_pixel_name(mut self, name: impl Into<String>) -> Self {
        self.pixel_name = name.into();
        self
    }

    /// Sets the resource prefix.
    pub fn with_resource_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.resource_prefix = prefix.into();
        self
    }

    /// Sets the wrapper class name.
    pub fn with_class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = name.into();
        self
    }

    /// Sets the maximum texture width.
    pub fn with_texture_max_width(mut self, width: usize) -> Self {
        self.texture_max_width = width;
        self
    }

    /// Enables or disables 1D textures.
    pub fn with_texture_1d(mut self, allow: bool) -> Self {
        self.allow_texture_1d = allow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let d = ShaderDesc::default();
        assert_eq!(d.language, ShaderLanguage::Glsl40);
        assert_eq!(d.pixel_name, "outColor");
        assert_eq!(d.resource_prefix, "ocio");
        assert_eq!(d.class_name, "OCIOColorTransform");
        assert_eq!(d.texture_max_width, 4096);
        assert!(d.allow_texture_1d);
    }

    #[test]
    fn test_yaml_full() {
        let yaml = "language: HLSL_DX11\nfunction_name: Grade\npixel_name: px\n\
                    resource_prefix: my\ntexture_max_width: 512\nallow_texture_1d: false\n";
        let d = ShaderDesc::from_yaml(yaml).unwrap();
        assert_eq!(d.language, ShaderLanguage::HlslDx11);
        assert_eq!(d.function_name, "Grade");
        assert_eq!(d.pixel_name, "px");
        assert_eq!(d.resource_prefix, "my");
        assert_eq!(d.texture_max_width, 512);
        assert!(!d.allow_texture_1d);
    }

    #[test]
    fn test_yaml_rejects_unknown_language() {
        assert!(ShaderDesc::from_yaml("language: GLSL_9_9\n").is_err());
    }
}
