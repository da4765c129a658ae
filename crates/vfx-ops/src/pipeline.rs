//! Op pipeline: an ordered op list with its dynamic slots.
//!
//! ```rust
//! use vfx_ops::OpPipeline;
//! use vfx_ops::data::{ExponentData, MatrixData};
//! use vfx_ops::optimizer::{FinalizeFlags, OptimizationFlags};
//!
//! let mut pipeline = OpPipeline::new();
//! pipeline.push(MatrixData::scale([2.0, 2.0, 2.0, 1.0]));
//! pipeline.push(MatrixData::scale([0.5, 0.5, 0.5, 1.0]));
//! pipeline.push(ExponentData::uniform(1.0));
//! pipeline.optimize(&OptimizationFlags::all()).unwrap();
//! pipeline.finalize(&FinalizeFlags::default()).unwrap();
//! assert!(pipeline.is_empty());
//! ```

use sha2::{Digest, Sha256};
use tracing::{debug, trace};
use vfx_shader::{ShaderCreator, ShaderDesc};

use crate::cpu::CpuProcessor;
use crate::data::{OpData, Payload};
use crate::dynamic::DynamicRegistry;
use crate::op::{Op, OpState};
use crate::optimizer::{self, FinalizeFlags, OptimizationFlags};
use crate::{OpsError, OpsResult};

/// Cache-ID of a pipeline without ops.
pub const EMPTY_CACHE_ID: &str = "<NOOP>";

/// Ordered list of ops evaluated front to back.
#[derive(Debug, Clone, Default)]
pub struct OpPipeline {
    ops: Vec<Op>,
    registry: DynamicRegistry,
    cache_id: Option<String>,
}

impl From<Vec<Op>> for OpPipeline {
    fn from(ops: Vec<Op>) -> Self {
        Self { ops, ..Self::default() }
    }
}

impl OpPipeline {
    /// Empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an unfinalized op built from `data`.
    pub fn push(&mut self, data: impl Into<OpData>) -> &mut Self {
        self.push_op(Op::new(data))
    }

    /// Appends `op`.
    pub fn push_op(&mut self, op: Op) -> &mut Self {
        self.ops.push(op);
        self.cache_id = None;
        self
    }

    /// Ops in evaluation order.
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Mutable op list; the pipeline must be finalized again.
    pub fn ops_mut(&mut self) -> &mut Vec<Op> {
        self.cache_id = None;
        &mut self.ops
    }

    /// Number of ops.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when there is no op.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// True when every op is a no-op.
    pub fn is_no_op(&self) -> bool {
        self.ops.iter().all(Op::is_no_op)
    }

    /// Dynamic slots bound by the last finalize.
    pub fn registry(&self) -> &DynamicRegistry {
        &self.registry
    }

    /// Cache-ID recorded by the last finalize.
    pub fn cache_id(&self) -> Option<&str> {
        self.cache_id.as_deref()
    }

    /// True when the pipeline and each of its ops are finalized.
    pub fn is_finalized(&self) -> bool {
        self.cache_id.is_some() && self.ops.iter().all(|op| op.state() == OpState::Finalized)
    }

    /// Runs the optimizer over the op list.
    pub fn optimize(&mut self, flags: &OptimizationFlags) -> OpsResult<()> {
        optimizer::optimize(&mut self.ops, flags)?;
        self.cache_id = None;
        Ok(())
    }

    /// Validates the bit-depth chain, finalizes every op, shares dynamic
    /// slots and records the pipeline cache-ID.
    pub fn finalize(&mut self, flags: &FinalizeFlags) -> OpsResult<()> {
        trace!(ops = self.ops.len(), lut_inverse = flags.lut_inverse.as_str(), "pipeline::finalize");
        self.check_bit_depths()?;
        for op in &mut self.ops {
            op.finalize(flags)?;
        }
        self.share_dynamic_slots();

        let id = self.compute_cache_id();
        debug!(ops = self.ops.len(), cache_id = %id, "Finalized pipeline");
        self.cache_id = Some(id);
        Ok(())
    }

    fn check_bit_depths(&self) -> OpsResult<()> {
        for pair in self.ops.windows(2) {
            let out = pair[0].data().meta.output_bit_depth;
            let input = pair[1].data().meta.input_bit_depth;
            if out != input {
                return Err(OpsError::validation(
                    pair[1].info(),
                    format!(
                        "input bit depth {input} does not match output bit depth {out} of {}",
                        pair[0].info()
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Ops of the same dynamic type end up on the first op's slot.
    fn share_dynamic_slots(&mut self) {
        for op in &mut self.ops {
            match op.payload_mut_keep_state() {
                Payload::GradingRgbCurve(d) if d.dynamic => {
                    if let Some(slot) = d.slot.take() {
                        d.slot = Some(self.registry.bind_rgb_curve(slot));
                    }
                }
                Payload::GradingHueCurve(d) if d.dynamic => {
                    if let Some(slot) = d.slot.take() {
                        d.slot = Some(self.registry.bind_hue_curve(slot));
                    }
                }
                _ => {}
            }
        }
    }

    fn compute_cache_id(&self) -> String {
        if self.ops.is_empty() {
            return EMPTY_CACHE_ID.to_string();
        }
        let mut hasher = Sha256::new();
        for op in &self.ops {
            hasher.update(op.cache_id().unwrap_or_default().as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    fn ensure_finalized(&self) -> OpsResult<()> {
        if self.cache_id.is_none() {
            return Err(OpsError::ShaderAssembly(
                "the pipeline must be finalized before evaluation".to_string(),
            ));
        }
        Ok(())
    }

    /// CPU processor running every op.
    pub fn cpu_processor(&self) -> OpsResult<CpuProcessor> {
        self.ensure_finalized()?;
        let ops = self.ops.iter().map(Op::cpu_op).collect::<OpsResult<Vec<_>>>()?;
        Ok(CpuProcessor::new(ops))
    }

    /// Appends the code of every op to an open `creator`.
    pub fn extract_gpu_shader_info(&self, creator: &mut ShaderCreator) -> OpsResult<()> {
        self.ensure_finalized()?;
        trace!(ops = self.ops.len(), language = %creator.language(), "pipeline::extract_gpu_shader_info");
        for op in &self.ops {
            op.extract_gpu_shader_info(creator)?;
        }
        Ok(())
    }

    /// Emits a complete shader for `desc`, returning the filled creator.
    pub fn gpu_shader(&self, desc: ShaderDesc) -> OpsResult<ShaderCreator> {
        let mut creator = ShaderCreator::new(desc);
        creator.begin()?;
        self.extract_gpu_shader_info(&mut creator)?;
        creator.finalize()?;
        Ok(creator)
    }

    /// Pipeline undoing this one: inverted ops in reverse order, unfinalized.
    pub fn inverse(&self) -> OpPipeline {
        self.ops.iter().rev().map(Op::inverse).collect::<Vec<_>>().into()
    }
}
