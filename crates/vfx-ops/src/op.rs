//! Op: one elementary color transform stage with its lifecycle.
//!
//! ```text
//! Unfinalized --finalize()--> Finalized --cpu_op()/extract_gpu_shader_info()--> ...
//!      ^                           |
//!      +------- data_mut() --------+
//! ```
//!
//! Finalizing validates the payload, binds a dynamic slot for dynamic
//! curves and records the cache-ID. Mutable access to the payload drops the
//! op back to `Unfinalized`.

use tracing::trace;
use vfx_shader::ShaderCreator;

use crate::cpu::CpuOp;
use crate::data::{OpData, Payload};
use crate::optimizer::FinalizeFlags;
use crate::{DynamicHueCurve, DynamicRgbCurve, OpsError, OpsResult, gpu};

/// Lifecycle state of an [`Op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    /// Payload may have changed since the last finalize.
    Unfinalized,
    /// Validated; cache-ID recorded.
    Finalized,
}

/// A color transform stage owning its payload.
#[derive(Debug, Clone)]
pub struct Op {
    data: OpData,
    state: OpState,
    flags: FinalizeFlags,
}

impl From<OpData> for Op {
    fn from(data: OpData) -> Self {
        Op::new(data)
    }
}

impl Op {
    /// Unfinalized op owning `data`.
    pub fn new(data: impl Into<OpData>) -> Self {
        Self { data: data.into(), state: OpState::Unfinalized, flags: FinalizeFlags::default() }
    }

    /// Payload.
    pub fn data(&self) -> &OpData {
        &self.data
    }

    /// Mutable payload; the op must be finalized again.
    pub fn data_mut(&mut self) -> &mut OpData {
        self.state = OpState::Unfinalized;
        self.data.set_cache_id(None);
        &mut self.data
    }

    /// Lifecycle state.
    pub fn state(&self) -> OpState {
        self.state
    }

    /// Stable type tag.
    pub fn info(&self) -> &'static str {
        self.data.kind().tag()
    }

    /// Cache-ID, once finalized.
    pub fn cache_id(&self) -> Option<&str> {
        self.data.cache_id()
    }

    /// True when the op leaves every pixel unchanged.
    pub fn is_identity(&self) -> bool {
        self.data.is_identity()
    }

    /// Identity with matching bit depths; safe to drop from a list.
    pub fn is_no_op(&self) -> bool {
        self.is_identity() && self.data.meta.input_bit_depth == self.data.meta.output_bit_depth
    }

    /// True when both ops have the same kind.
    pub fn is_same_type(&self, other: &Op) -> bool {
        self.data.kind() == other.data.kind()
    }

    /// True when `other` undoes `self`.
    pub fn is_inverse(&self, other: &Op) -> bool {
        self.data.is_inverse_of(&other.data)
    }

    /// True when `combine_with` merges the pair.
    pub fn can_combine_with(&self, other: &Op) -> bool {
        self.data.can_combine_with(&other.data)
    }

    /// Pushes the ops replacing `self` followed by `other` onto `out`.
    pub fn combine_with(&self, out: &mut Vec<OpData>, other: &Op) -> OpsResult<()> {
        if !self.can_combine_with(other) {
            return Err(OpsError::validation(
                self.info(),
                format!("cannot combine with {}", other.info()),
            ));
        }
        let combined = self.data.combine_with(&other.data)?;
        if !(combined.is_identity()
            && combined.meta.input_bit_depth == combined.meta.output_bit_depth)
        {
            out.push(combined);
        }
        Ok(())
    }

    /// Inverse op, unfinalized.
    pub fn inverse(&self) -> Op {
        Op::new(self.data.inverse())
    }

    /// Validates the payload and records the cache-ID.
    ///
    /// Idempotent while the payload is unchanged and `flags` are the same.
    pub fn finalize(&mut self, flags: &FinalizeFlags) -> OpsResult<()> {
        if self.state == OpState::Finalized && self.flags == *flags {
            return Ok(());
        }
        trace!(op = self.info(), "op::finalize");
        self.data.validate()?;
        self.bind_dynamic_slot()?;
        let id = self.data.compute_cache_id(flags);
        self.data.set_cache_id(Some(id));
        self.flags = *flags;
        self.state = OpState::Finalized;
        Ok(())
    }

    fn bind_dynamic_slot(&mut self) -> OpsResult<()> {
        match &mut self.data.payload {
            Payload::GradingRgbCurve(d) if d.dynamic && d.slot.is_none() => {
                d.slot = Some(DynamicRgbCurve::new(d.curves.clone())?);
            }
            Payload::GradingHueCurve(d) if d.dynamic && d.slot.is_none() => {
                d.slot = Some(DynamicHueCurve::new(d.curves.clone())?);
            }
            _ => {}
        }
        Ok(())
    }

    /// Payload access that keeps the finalized state, for swapping in a
    /// shared dynamic slot.
    pub(crate) fn payload_mut_keep_state(&mut self) -> &mut Payload {
        &mut self.data.payload
    }

    fn ensure_finalized(&self) -> OpsResult<()> {
        match self.state {
            OpState::Finalized => Ok(()),
            OpState::Unfinalized => Err(OpsError::ShaderAssembly(format!(
                "{} must be finalized before evaluation",
                self.info()
            ))),
        }
    }

    /// CPU renderer for the finalized op.
    pub fn cpu_op(&self) -> OpsResult<CpuOp> {
        self.ensure_finalized()?;
        CpuOp::build(&self.data, &self.flags)
    }

    /// Appends the op's shader code, textures and uniforms to `creator`.
    pub fn extract_gpu_shader_info(&self, creator: &mut ShaderCreator) -> OpsResult<()> {
        self.ensure_finalized()?;
        gpu::extract(&self.data, &self.flags, creator).map_err(|e| e.in_op(self.info()))?;
        if let Some(id) = self.data.cache_id() {
            creator.add_op_cache_id(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ExponentData, MatrixData, RgbCurveData, GradingStyle};
    use crate::meta::BitDepth;

    #[test]
    fn test_finalize_is_idempotent() {
        let mut op = Op::new(ExponentData::new([1.2, 1.3, 1.4, 1.5]));
        assert_eq!(op.state(), OpState::Unfinalized);
        op.finalize(&FinalizeFlags::default()).unwrap();
        let first = op.cache_id().unwrap().to_string();
        op.finalize(&FinalizeFlags::default()).unwrap();
        assert_eq!(op.cache_id().unwrap(), first);
        assert_eq!(op.state(), OpState::Finalized);
    }

    #[test]
    fn test_mutation_resets_state() {
        let mut op = Op::new(ExponentData::uniform(2.0));
        op.finalize(&FinalizeFlags::default()).unwrap();
        op.data_mut().meta.name = Some("gamma".into());
        assert_eq!(op.state(), OpState::Unfinalized);
        assert!(op.cache_id().is_none());
        assert!(op.cpu_op().is_err());
    }

    #[test]
    fn test_invalid_payload_fails_finalize() {
        let mut op = Op::new(ExponentData::new([0.0, 1.0, 1.0, 1.0]).inverse());
        let err = op.finalize(&FinalizeFlags::default()).unwrap_err();
        assert!(err.to_string().starts_with("ExponentOp"), "{err}");
        assert_eq!(op.state(), OpState::Unfinalized);
    }

    #[test]
    fn test_no_op_needs_matching_depths() {
        let op = Op::new(OpData::new(MatrixData::scale([1.0; 4])).with_depths(BitDepth::UInt8, BitDepth::F32));
        assert!(op.is_identity());
        assert!(!op.is_no_op());
        assert!(Op::new(MatrixData::scale([1.0; 4])).is_no_op());
    }

    #[test]
    fn test_dynamic_curve_gets_slot() {
        let mut op = Op::new(RgbCurveData::identity(GradingStyle::Log).with_dynamic(true));
        op.finalize(&FinalizeFlags::default()).unwrap();
        match &op.data().payload {
            Payload::GradingRgbCurve(d) => assert!(d.slot.is_some()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_combine_drops_identity_result() {
        let a = Op::new(MatrixData::scale([2.0; 4]));
        let b = Op::new(MatrixData::scale([0.5; 4]));
        let mut out = Vec::new();
        a.combine_with(&mut out, &b).unwrap();
        assert!(out.is_empty());
    }
}
