//! Error types for shader text generation.

use thiserror::Error;

use crate::ShaderLanguage;

/// Result type for shader generation.
pub type ShaderResult<T> = Result<T, ShaderError>;

/// Errors raised while building shader text.
#[derive(Error, Debug)]
pub enum ShaderError {
    /// The target language lacks a construct the emitter needs.
    #[error("{language}: {message}")]
    UnsupportedLanguage {
        /// Target language.
        language: ShaderLanguage,
        /// What is missing.
        message: String,
    },

    /// A numeric argument is out of its documented range.
    #[error("out of range: {0}")]
    Range(String),

    /// Calls made in the wrong assembly state.
    #[error("shader assembly: {0}")]
    Assembly(String),

    /// Shader description could not be parsed.
    #[error("shader description: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl ShaderError {
    pub(crate) fn unsupported(language: ShaderLanguage, message: impl Into<String>) -> Self {
        Self::UnsupportedLanguage { language, message: message.into() }
    }
}
