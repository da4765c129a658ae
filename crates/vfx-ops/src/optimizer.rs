//! Op list optimizer and finalize settings.
//!
//! [`optimize`] rewrites an op list in place, repeating its passes until a
//! full sweep changes nothing:
//!
//! - identity removal (no-ops only, so bit depths keep chaining)
//! - adjacent inverse cancellation, leaving a clamp where the pair clamps
//! - adjacent matrix, exponent, range and same-style CDL combining
//!
//! Ops are never reordered.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::OpsResult;
use crate::data::{OpData, OpKind};
use crate::op::Op;

// ============================================================================
// Flags
// ============================================================================

/// How inverse LUTs are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LutInverseStyle {
    /// Search the forward table for every pixel (1D) or bake a dense
    /// inverse grid (3D).
    #[default]
    Exact,
    /// Bake a half-domain table (1D) or a coarse inverse grid (3D).
    Fast,
}

impl LutInverseStyle {
    /// Name used in cache-IDs.
    pub fn as_str(&self) -> &'static str {
        match self {
            LutInverseStyle::Exact => "exact",
            LutInverseStyle::Fast => "fast",
        }
    }
}

/// Passes run by [`optimize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationFlags {
    /// Remove ops that change nothing.
    pub remove_identities: bool,
    /// Remove adjacent op/inverse pairs.
    pub cancel_inverses: bool,
    /// Compose adjacent matrices.
    pub compose_matrices: bool,
    /// Multiply adjacent exponents.
    pub compose_exponents: bool,
    /// Intersect adjacent ranges.
    pub combine_ranges: bool,
    /// Collapse adjacent CDLs of the same style.
    pub combine_cdls: bool,
}

impl Default for OptimizationFlags {
    fn default() -> Self {
        Self::all()
    }
}

impl OptimizationFlags {
    /// Every pass.
    pub fn all() -> Self {
        Self {
            remove_identities: true,
            cancel_inverses: true,
            compose_matrices: true,
            compose_exponents: true,
            combine_ranges: true,
            combine_cdls: true,
        }
    }

    /// No pass; the list is left as is.
    pub fn none() -> Self {
        Self {
            remove_identities: false,
            cancel_inverses: false,
            compose_matrices: false,
            compose_exponents: false,
            combine_ranges: false,
            combine_cdls: false,
        }
    }

    fn combines(&self, kind: OpKind) -> bool {
        match kind {
            OpKind::Matrix => self.compose_matrices,
            OpKind::Exponent => self.compose_exponents,
            OpKind::Range => self.combine_ranges,
            OpKind::Cdl => self.combine_cdls,
            _ => false,
        }
    }
}

/// Settings applied when ops are finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizeFlags {
    /// Evaluation of inverse 1D and 3D LUTs.
    pub lut_inverse: LutInverseStyle,
}

impl FinalizeFlags {
    /// Flags with the given inverse LUT style.
    pub fn with_lut_inverse(style: LutInverseStyle) -> Self {
        Self { lut_inverse: style }
    }
}

// ============================================================================
// Passes
// ============================================================================

/// Optimizes `ops` in place.
///
/// The result evaluates like the input (up to float rounding). Finalized
/// state is kept on untouched ops; replacement ops come back unfinalized.
pub fn optimize(ops: &mut Vec<Op>, flags: &OptimizationFlags) -> OpsResult<()> {
    let before = ops.len();
    trace!(ops = before, "optimizer::optimize");

    let mut passes = 0;
    loop {
        passes += 1;
        let mut changed = false;
        if flags.remove_identities {
            changed |= remove_no_ops(ops);
        }
        if flags.cancel_inverses {
            changed |= cancel_inverse_pairs(ops);
        }
        changed |= combine_adjacent(ops, flags)?;
        if !changed {
            break;
        }
    }

    debug!(before, after = ops.len(), passes, "Optimized pipeline");
    Ok(())
}

fn remove_no_ops(ops: &mut Vec<Op>) -> bool {
    let before = ops.len();
    ops.retain(|op| !op.is_no_op());
    ops.len() != before
}

fn cancel_inverse_pairs(ops: &mut Vec<Op>) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i + 1 < ops.len() {
        if ops[i].is_inverse(&ops[i + 1]) {
            let replacement = ops[i].data().identity_replacement();
            trace!(op = ops[i].info(), "optimizer::cancel_pair");
            ops.drain(i..i + 2);
            if let Some(data) = replacement {
                ops.insert(i, Op::new(data));
                i += 1;
            }
            changed = true;
        } else {
            i += 1;
        }
    }
    changed
}

fn combine_adjacent(ops: &mut Vec<Op>, flags: &OptimizationFlags) -> OpsResult<bool> {
    let mut changed = false;
    let mut i = 0;
    while i + 1 < ops.len() {
        let (a, b) = (&ops[i], &ops[i + 1]);
        if a.is_same_type(b) && flags.combines(a.data().kind()) && a.can_combine_with(b) {
            let mut out: Vec<OpData> = Vec::with_capacity(1);
            a.combine_with(&mut out, b)?;
            let replacement: Vec<Op> = out.into_iter().map(Op::new).collect();
            ops.splice(i..i + 2, replacement);
            changed = true;
        } else {
            i += 1;
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        CdlData, CdlStyle, ExponentData, LogData, Lut1DData, MatrixData, Payload, RangeData,
    };

    fn ops(list: Vec<OpData>) -> Vec<Op> {
        list.into_iter().map(Op::new).collect()
    }

    #[test]
    fn test_flags_default_to_everything() {
        let flags = OptimizationFlags::default();
        assert!(flags.remove_identities && flags.cancel_inverses && flags.combine_cdls);
        let yaml = "compose_matrices: false\n";
        let parsed: OptimizationFlags = serde_yaml::from_str(yaml).unwrap();
        assert!(!parsed.compose_matrices);
        assert!(parsed.combine_ranges);
        assert_eq!(FinalizeFlags::default().lut_inverse, LutInverseStyle::Exact);
    }

    #[test]
    fn test_removes_identities_and_inverse_pairs() {
        let log = OpData::new(LogData::log(2.0));
        let mut list = ops(vec![
            OpData::new(MatrixData::scale([1.0; 4])),
            OpData::new(LogData::anti_log(2.0)),
            log,
        ]);
        optimize(&mut list, &OptimizationFlags::default()).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_lut_pair_leaves_clamp() {
        let lut = OpData::new(Lut1DData::from_fn(32, |x| [x.powf(2.2); 3]));
        let mut list = ops(vec![lut.clone(), lut.inverse()]);
        optimize(&mut list, &OptimizationFlags::default()).unwrap();
        assert_eq!(list.len(), 1);
        assert!(matches!(list[0].data().payload, Payload::Range(_)));
    }

    #[test]
    fn test_combines_runs() {
        let mut list = ops(vec![
            OpData::new(ExponentData::uniform(2.0)),
            OpData::new(ExponentData::uniform(1.5)),
            OpData::new(ExponentData::uniform(0.5)),
            OpData::new(RangeData::rgb(0.0, 1.0, 0.0, 2.0)),
            OpData::new(RangeData::rgb(0.0, 2.0, 0.0, 1.0)),
        ]);
        optimize(&mut list, &OptimizationFlags::default()).unwrap();
        assert_eq!(list.len(), 2);
        match &list[0].data().payload {
            Payload::Exponent(e) => assert_eq!(e.exponents, [1.5; 4]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cdl_styles_must_match() {
        let a = CdlData { power: [2.0; 3], ..CdlData::default() };
        let b = a.clone().with_style(CdlStyle::NoClampFwd);
        let mut list = ops(vec![OpData::new(a.clone()), OpData::new(b)]);
        optimize(&mut list, &OptimizationFlags::default()).unwrap();
        assert_eq!(list.len(), 2);

        let mut list = ops(vec![OpData::new(a.clone()), OpData::new(a)]);
        optimize(&mut list, &OptimizationFlags::default()).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_disabled_passes_leave_list() {
        let mut list = ops(vec![
            OpData::new(MatrixData::scale([2.0; 4])),
            OpData::new(MatrixData::scale([0.5; 4])),
        ]);
        optimize(&mut list, &OptimizationFlags::none()).unwrap();
        assert_eq!(list.len(), 2);
    }
}
