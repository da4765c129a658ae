//! # vfx-shader
//!
//! Shader source generation for color transforms.
//!
//! This crate is the language-aware half of GPU color processing: it knows
//! how each target spells types, literals, intrinsics, textures and
//! uniforms, and how a finished program must be wrapped. It knows nothing
//! about color ops; `vfx-ops` drives it.
//!
//! - [`ShaderLanguage`] - the supported targets (GLSL 1.2 to 4.0, GLSL ES, Cg, HLSL, Metal, OSL)
//! - [`ShaderText`] / [`Syntax`] - indented text stream and per-target vocabulary
//! - [`ShaderCreator`] - accumulates code, textures and uniforms; assembles the program
//! - [`wrap_shader`] - per-target class wrapper (Metal struct, OSL shader block)
//! - [`ShaderDesc`] - serde-loadable assembly settings
//!
//! # Example
//!
//! ```rust
//! use vfx_shader::{ShaderCreator, ShaderDesc, ShaderLanguage};
//!
//! let mut creator = ShaderCreator::new(ShaderDesc::new(ShaderLanguage::Glsl40));
//! creator.begin().unwrap();
//! creator.add_to_function_code("  outColor.rgb = outColor.rgb * 2.0;\n").unwrap();
//! let text = creator.finalize().unwrap();
//! assert!(text.contains("vec4 OCIODisplay(vec4 inPixel)"));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod creator;
mod desc;
mod dynamic;
mod error;
mod language;
mod text;
mod wrapper;

pub use creator::{
    AssemblyState, GpuTexture, GpuUniform, ShaderCreator, TextureChannel, TextureDimension,
    TextureFilter, UniformGetter, UniformValue,
};
pub use desc::ShaderDesc;
pub use dynamic::DynamicPropertyType;
pub use error::{ShaderError, ShaderResult};
pub use language::ShaderLanguage;
pub use text::{LineScope, ShaderText, Syntax, sampler_name};
pub use wrapper::{ShaderParts, wrap_shader};
