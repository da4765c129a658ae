//! # vfx-ops
//!
//! Color transform ops for VFX color pipelines: the op data model, the
//! optimizer, CPU evaluators and GPU shader emission.
//!
//! # Modules
//!
//! - [`data`] - op payloads ([`data::OpData`], one struct per kind)
//! - [`op`] - [`Op`] lifecycle (finalize, cache-ID, evaluation)
//! - [`optimizer`] - identity removal, inverse cancellation, combining
//! - [`pipeline`] - [`OpPipeline`] with shared dynamic slots
//! - [`cpu`] - in-place RGBA renderers
//! - [`curve`] - B-spline grading curves
//! - [`dynamic`] - updatable slots behind dynamic properties
//! - [`hsy`] - HSY and HSV color models
//! - [`allocation`] - shaping ops placed in front of LUTs
//!
//! # Example
//!
//! ```rust
//! use vfx_ops::OpPipeline;
//! use vfx_ops::data::{ExponentData, LogData};
//! use vfx_ops::optimizer::FinalizeFlags;
//! use vfx_shader::{ShaderDesc, ShaderLanguage};
//!
//! let mut pipeline = OpPipeline::new();
//! pipeline.push(ExponentData::uniform(2.2)).push(LogData::log(2.0));
//! pipeline.finalize(&FinalizeFlags::default()).unwrap();
//!
//! let mut px = [0.18_f32, 0.18, 0.18, 1.0];
//! pipeline.cpu_processor().unwrap().apply_rgba(&mut px).unwrap();
//!
//! let shader = pipeline.gpu_shader(ShaderDesc::new(ShaderLanguage::Glsl40)).unwrap();
//! assert!(shader.shader_text().unwrap().contains("log2("));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod gpu;

pub mod allocation;
pub mod cache_id;
pub mod cpu;
pub mod curve;
pub mod data;
pub mod dynamic;
pub mod hsy;
pub mod meta;
pub mod op;
pub mod optimizer;
pub mod pipeline;

pub use data::{DynamicHueCurve, DynamicRgbCurve};
pub use error::{OpsError, OpsResult};
pub use op::Op;
pub use pipeline::OpPipeline;
