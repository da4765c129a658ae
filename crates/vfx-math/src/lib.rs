//! # vfx-math
//!
//! Numeric utilities shared by the color op pipeline and the shader emitter.
//!
//! - Float hygiene: clamped pow, NaN/Inf sanitizing, `FLT_MIN` guards
//! - Half-float encoding for half-domain LUTs (backed by the [`half`] crate)
//! - Literal formatting for shader source and cache-IDs
//! - 4x4 double matrices with an offset vector ([`Mat4d`], backed by [`glam::DMat4`])
//!
//! # Usage
//!
//! ```rust
//! use vfx_math::{float_literal, half_bits, Mat4d};
//!
//! assert_eq!(float_literal(1.0), "1.0");
//! assert_eq!(half_bits(1.0), 0x3C00);
//! assert!(Mat4d::IDENTITY.is_identity());
//! ```
//!
//! # Used By
//!
//! - `vfx-shader` - literal formatting, sanitizing texture data
//! - `vfx-ops` - CPU evaluators, cache-IDs, matrix composition

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod float;
mod half_float;
mod literal;
mod mat4;

pub use float::*;
pub use half_float::*;
pub use literal::*;
pub use mat4::*;
