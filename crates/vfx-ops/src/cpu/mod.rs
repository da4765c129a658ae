//! CPU evaluators.
//!
//! Every op kind has a renderer that works in place on tightly packed RGBA
//! `f32` pixels. Renderers precompute what they can when built (single
//! precision coefficients, decoded LUT tables, inverse grids) so the apply
//! loops stay branch-light. [`CpuOp`] is the closed set of renderers and
//! [`CpuProcessor`] chains them.
//!
//! ```rust
//! use vfx_ops::cpu::CpuProcessor;
//! use vfx_ops::data::ExponentData;
//! use vfx_ops::{OpPipeline, optimizer::FinalizeFlags};
//!
//! let mut pipeline = OpPipeline::new();
//! pipeline.push(ExponentData::uniform(2.0));
//! pipeline.finalize(&FinalizeFlags::default()).unwrap();
//! let cpu: CpuProcessor = pipeline.cpu_processor().unwrap();
//!
//! let mut px = [0.5, 0.5, 0.5, 1.0];
//! cpu.apply_rgba(&mut px).unwrap();
//! assert_eq!(px, [0.25, 0.25, 0.25, 1.0]);
//! ```

mod cdl;
mod curves;
mod fixed_function;
mod log;
mod lut1d;
mod lut3d;
mod matrix;
mod range;

pub use cdl::CdlRenderer;
pub use curves::{HueCurveRenderer, RgbCurveRenderer};
pub use fixed_function::FixedFunctionRenderer;
pub use log::LogRenderer;
pub use lut1d::{Lut1DInverseRenderer, Lut1DRenderer};
pub use lut3d::Lut3DRenderer;
pub use matrix::MatrixRenderer;
pub use range::RangeRenderer;

use tracing::trace;
use vfx_math::pow_clamped;

use crate::data::{OpData, Payload};
use crate::meta::Direction;
use crate::optimizer::{FinalizeFlags, LutInverseStyle};
use crate::{OpsError, OpsResult};

/// Per-channel `max(0, x)^e` on all four channels.
#[derive(Debug, Clone)]
pub struct ExponentRenderer {
    exponents: [f32; 4],
}

impl ExponentRenderer {
    fn apply(&self, pixels: &mut [f32]) {
        let e = self.exponents;
        for px in pixels.chunks_exact_mut(4) {
            px[0] = pow_clamped(px[0], e[0]);
            px[1] = pow_clamped(px[1], e[1]);
            px[2] = pow_clamped(px[2], e[2]);
            px[3] = pow_clamped(px[3], e[3]);
        }
    }
}

// ============================================================================
// CpuOp
// ============================================================================

/// Renderer of one op.
#[derive(Debug, Clone)]
pub enum CpuOp {
    /// Matrix with offset.
    Matrix(MatrixRenderer),
    /// Exponent.
    Exponent(ExponentRenderer),
    /// Log and anti-log.
    Log(LogRenderer),
    /// Range.
    Range(RangeRenderer),
    /// Forward 1D LUT, and inverse 1D LUTs baked to a half-domain table.
    Lut1D(Lut1DRenderer),
    /// Inverse 1D LUT by exact search.
    Lut1DInverse(Lut1DInverseRenderer),
    /// 3D LUT; inverse LUTs are baked to a forward grid.
    Lut3D(Lut3DRenderer),
    /// ASC CDL.
    Cdl(CdlRenderer),
    /// Fixed function.
    FixedFunction(FixedFunctionRenderer),
    /// Grading RGB curves.
    RgbCurve(RgbCurveRenderer),
    /// Grading hue curves.
    HueCurve(HueCurveRenderer),
}

impl CpuOp {
    /// Builds the renderer of a validated payload.
    pub fn build(data: &OpData, flags: &FinalizeFlags) -> OpsResult<CpuOp> {
        let op = match &data.payload {
            Payload::Matrix(d) => CpuOp::Matrix(MatrixRenderer::new(d)?),
            Payload::Exponent(d) => {
                let e = d.effective();
                CpuOp::Exponent(ExponentRenderer { exponents: e.map(|v| v as f32) })
            }
            Payload::Log(d) => CpuOp::Log(LogRenderer::new(d)),
            Payload::Range(d) => CpuOp::Range(RangeRenderer::new(d)),
            Payload::Lut1D(d) => match d.direction {
                Direction::Forward => CpuOp::Lut1D(Lut1DRenderer::new(d)),
                Direction::Inverse => match flags.lut_inverse {
                    LutInverseStyle::Exact => {
                        CpuOp::Lut1DInverse(Lut1DInverseRenderer::new(d))
                    }
                    LutInverseStyle::Fast => {
                        CpuOp::Lut1D(Lut1DRenderer::new(&d.bake_fast_inverse()))
                    }
                },
            },
            Payload::Lut3D(d) => CpuOp::Lut3D(Lut3DRenderer::new(d, flags.lut_inverse)),
            Payload::Cdl(d) => CpuOp::Cdl(CdlRenderer::new(d)),
            Payload::FixedFunction(d) => CpuOp::FixedFunction(FixedFunctionRenderer::new(d)),
            Payload::GradingRgbCurve(d) => CpuOp::RgbCurve(RgbCurveRenderer::new(d)?),
            Payload::GradingHueCurve(d) => CpuOp::HueCurve(HueCurveRenderer::new(d)?),
        };
        Ok(op)
    }

    /// Applies the op in place to RGBA pixels.
    ///
    /// A trailing partial pixel is left untouched.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        match self {
            CpuOp::Matrix(r) => r.apply(pixels),
            CpuOp::Exponent(r) => r.apply(pixels),
            CpuOp::Log(r) => r.apply(pixels),
            CpuOp::Range(r) => r.apply(pixels),
            CpuOp::Lut1D(r) => r.apply(pixels),
            CpuOp::Lut1DInverse(r) => r.apply(pixels),
            CpuOp::Lut3D(r) => r.apply(pixels),
            CpuOp::Cdl(r) => r.apply(pixels),
            CpuOp::FixedFunction(r) => r.apply(pixels),
            CpuOp::RgbCurve(r) => r.apply(pixels),
            CpuOp::HueCurve(r) => r.apply(pixels),
        }
    }

    /// Applies the op from `src` into `dst`.
    pub fn apply(&self, src: &[f32], dst: &mut [f32]) -> OpsResult<()> {
        check_buffers(src, dst)?;
        dst.copy_from_slice(src);
        self.apply_rgba(dst);
        Ok(())
    }
}

fn check_rgba(len: usize) -> OpsResult<()> {
    if len % 4 != 0 {
        return Err(OpsError::Range(format!("buffer of {len} floats is not whole RGBA pixels")));
    }
    Ok(())
}

fn check_buffers(src: &[f32], dst: &[f32]) -> OpsResult<()> {
    if src.len() != dst.len() {
        return Err(OpsError::Range(format!(
            "input holds {} floats, output holds {}",
            src.len(),
            dst.len()
        )));
    }
    check_rgba(src.len())
}

// ============================================================================
// Processor
// ============================================================================

/// Chain of renderers built from a finalized pipeline.
#[derive(Debug, Clone, Default)]
pub struct CpuProcessor {
    ops: Vec<CpuOp>,
}

impl CpuProcessor {
    /// Processor running `ops` in order.
    pub fn new(ops: Vec<CpuOp>) -> Self {
        trace!(ops = ops.len(), "cpu::processor");
        Self { ops }
    }

    /// Renderers in order.
    pub fn ops(&self) -> &[CpuOp] {
        &self.ops
    }

    /// True when the processor has no renderer.
    pub fn is_no_op(&self) -> bool {
        self.ops.is_empty()
    }

    /// Applies every renderer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) -> OpsResult<()> {
        check_rgba(pixels.len())?;
        for op in &self.ops {
            op.apply_rgba(pixels);
        }
        Ok(())
    }

    /// Applies every renderer from `src` into `dst`.
    pub fn apply(&self, src: &[f32], dst: &mut [f32]) -> OpsResult<()> {
        check_buffers(src, dst)?;
        dst.copy_from_slice(src);
        for op in &self.ops {
            op.apply_rgba(dst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ExponentData;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 1e-6;

    fn exponent(e: [f64; 4]) -> CpuOp {
        CpuOp::build(&OpData::new(ExponentData::new(e)), &FinalizeFlags::default()).unwrap()
    }

    #[test]
    fn test_exponent_round_trip() {
        let src = [0.1, 0.3, 0.9, 0.5];
        let fwd = exponent([1.2, 1.3, 1.4, 1.5]);
        let mut px = [0.0; 4];
        fwd.apply(&src, &mut px).unwrap();
        let expected = [0.063096, 0.209054, 0.862858, 0.353553];
        for c in 0..4 {
            assert_abs_diff_eq!(px[c], expected[c], epsilon = 1e-6);
        }

        let inv = CpuOp::build(
            &OpData::new(ExponentData::new([1.2, 1.3, 1.4, 1.5]).inverse()),
            &FinalizeFlags::default(),
        )
        .unwrap();
        inv.apply_rgba(&mut px);
        for c in 0..4 {
            assert_abs_diff_eq!(px[c], src[c], epsilon = EPSILON);
        }
    }

    #[test]
    fn test_exponent_limits() {
        let op = exponent([0.0, 2.0, -2.0, 1.5]);
        let mut px = [2.0; 4];
        op.apply_rgba(&mut px);
        assert_abs_diff_eq!(px[0], 1.0);
        assert_abs_diff_eq!(px[1], 4.0);
        assert_abs_diff_eq!(px[2], 0.25);
        assert_abs_diff_eq!(px[3], 2.828427, epsilon = EPSILON);

        let mut px = [-2.0, -2.0, 1.0, -2.0];
        op.apply_rgba(&mut px);
        assert_eq!(px, [1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_buffer_checks() {
        let op = exponent([2.0; 4]);
        let mut dst = [0.0; 8];
        assert!(matches!(op.apply(&[0.5; 4], &mut dst), Err(OpsError::Range(_))));
        let cpu = CpuProcessor::new(vec![op]);
        assert!(cpu.apply_rgba(&mut [0.5; 6]).is_err());
        let mut px = [0.5; 8];
        cpu.apply_rgba(&mut px).unwrap();
        assert_eq!(px, [0.25; 8]);
    }

    #[test]
    fn test_processor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CpuProcessor>();
    }
}
