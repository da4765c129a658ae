//! Error types for the op pipeline.

use thiserror::Error;
use vfx_shader::{ShaderError, ShaderLanguage};

/// Error type for op validation, evaluation and shader emission.
#[derive(Error, Debug)]
pub enum OpsError {
    /// An op payload violates one of its invariants.
    #[error("{op}: {message}")]
    Validation {
        /// Type tag of the offending op.
        op: String,
        /// What is wrong, with the offending value.
        message: String,
    },

    /// The target shader language lacks a construct the op needs.
    #[error("{op}: {language}: {message}")]
    UnsupportedLanguage {
        /// Type tag of the op being emitted.
        op: String,
        /// Target language.
        language: ShaderLanguage,
        /// What is missing.
        message: String,
    },

    /// A numeric argument is out of its documented range.
    #[error("out of range: {0}")]
    Range(String),

    /// Calls made in the wrong lifecycle or assembly state.
    #[error("shader assembly: {0}")]
    ShaderAssembly(String),
}

/// Result type for op operations.
pub type OpsResult<T> = Result<T, OpsError>;

impl OpsError {
    /// Validation error for op `op`.
    pub fn validation(op: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { op: op.into(), message: message.into() }
    }

    /// Tags a language error with the op being emitted.
    pub fn in_op(self, tag: &str) -> Self {
        match self {
            Self::UnsupportedLanguage { language, message, .. } => {
                Self::UnsupportedLanguage { op: tag.to_string(), language, message }
            }
            other => other,
        }
    }
}

impl From<ShaderError> for OpsError {
    fn from(e: ShaderError) -> Self {
        match e {
            ShaderError::UnsupportedLanguage { language, message } => {
                Self::UnsupportedLanguage { op: "shader".to_string(), language, message }
            }
            ShaderError::Range(msg) => Self::Range(msg),
            ShaderError::Assembly(msg) => Self::ShaderAssembly(msg),
            ShaderError::Config(e) => Self::validation("ShaderDesc", e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_errors_map_onto_kinds() {
        let e: OpsError = ShaderError::Range("width 9000".into()).into();
        assert!(matches!(e, OpsError::Range(_)));

        let e: OpsError = ShaderError::Assembly("closed".into()).into();
        assert!(matches!(e, OpsError::ShaderAssembly(_)));
    }

    #[test]
    fn test_language_error_carries_op() {
        let e = OpsError::UnsupportedLanguage {
            op: "shader".into(),
            language: ShaderLanguage::Osl1,
            message: "textures are not supported".into(),
        }
        .in_op("Lut3DOp");
        let text = e.to_string();
        assert!(text.starts_with("Lut3DOp: OSL_1:"), "{text}");
    }
}
