//! Allocation: shaping ops placed in front of a LUT.
//!
//! An allocation spreads the expected input range over `[0, 1]` so a LUT
//! samples it evenly:
//!
//! - `Uniform`: `[min, max]` fitted to `[0, 1]` (default `[0, 1]`)
//! - `Lg2`: `log2(x + offset)`, then `[min, max]` stops fitted to `[0, 1]`
//!   (default `[-10, 6]`, offset 0)
//!
//! The variables are given as `[]`, `[min, max]` or, for `Lg2`,
//! `[min, max, offset]`.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::data::{LogData, MatrixData, OpData, RangeData};
use crate::{OpsError, OpsResult};

/// Allocation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Allocation {
    /// Linear fit.
    #[default]
    Uniform,
    /// Log2 followed by a linear fit.
    Lg2,
}

impl Allocation {
    /// Default `[min, max]` of the fitted range.
    pub fn default_range(&self) -> [f64; 2] {
        match self {
            Allocation::Uniform => [0.0, 1.0],
            Allocation::Lg2 => [-10.0, 6.0],
        }
    }
}

/// Builds the forward shaping ops for `allocation`.
///
/// `Uniform` gives `[Range fit]`; `Lg2` gives `[Log2, Range fit]`, preceded
/// by an offset matrix when the offset is non-zero. The fit is unclamped
/// and leaves alpha alone.
pub fn allocation_ops(allocation: Allocation, vars: &[f64]) -> OpsResult<Vec<OpData>> {
    trace!(?allocation, vars = vars.len(), "allocation::allocation_ops");
    let max_vars = match allocation {
        Allocation::Uniform => 2,
        Allocation::Lg2 => 3,
    };
    if vars.len() == 1 || vars.len() > max_vars {
        return Err(OpsError::validation(
            "Allocation",
            format!("{allocation:?} takes 0, 2 or {max_vars} variables, got {}", vars.len()),
        ));
    }
    let [min, max] = match vars {
        [min, max, ..] => [*min, *max],
        _ => allocation.default_range(),
    };
    if !(min < max) {
        return Err(OpsError::validation(
            "Allocation",
            format!("range minimum {min} must be below the maximum {max}"),
        ));
    }

    let mut ops = Vec::with_capacity(3);
    if allocation == Allocation::Lg2 {
        let offset = vars.get(2).copied().unwrap_or(0.0);
        if offset != 0.0 {
            ops.push(OpData::new(MatrixData::offset([offset, offset, offset, 0.0])));
        }
        ops.push(OpData::new(LogData::log(2.0)));
    }
    ops.push(OpData::new(RangeData::rgb(min, max, 0.0, 1.0).with_no_clamp(true)));
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpPipeline;
    use crate::data::Payload;
    use crate::optimizer::FinalizeFlags;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 2e-5;

    fn run(ops: Vec<OpData>, px: [f32; 4]) -> [f32; 4] {
        let mut pipeline = OpPipeline::new();
        for op in ops {
            pipeline.push(op);
        }
        pipeline.finalize(&FinalizeFlags::default()).unwrap();
        let mut px = px;
        pipeline.cpu_processor().unwrap().apply_rgba(&mut px).unwrap();
        px
    }

    #[test]
    fn test_op_lists() {
        let ops = allocation_ops(Allocation::Uniform, &[]).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0].payload, Payload::Range(_)));

        let ops = allocation_ops(Allocation::Lg2, &[]).unwrap();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0].payload, Payload::Log(_)));
        assert!(matches!(ops[1].payload, Payload::Range(_)));

        let ops = allocation_ops(Allocation::Lg2, &[-8.0, 8.0, 0.01]).unwrap();
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0].payload, Payload::Matrix(_)));
    }

    #[test]
    fn test_bad_variables() {
        assert!(allocation_ops(Allocation::Uniform, &[1.0]).is_err());
        assert!(allocation_ops(Allocation::Uniform, &[0.0, 1.0, 0.5]).is_err());
        assert!(allocation_ops(Allocation::Lg2, &[6.0, -10.0]).is_err());
    }

    #[test]
    fn test_lg2_fit_stage() {
        let ops = allocation_ops(Allocation::Lg2, &[]).unwrap();
        let fit = ops.last().cloned().unwrap();
        let out = run(vec![fit], [0.16, 0.2, 0.3, 0.4]);
        let expected = [0.635, 0.6375, 0.64375, 0.4];
        for (o, e) in out.iter().zip(expected) {
            assert_abs_diff_eq!(*o, e, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_lg2_maps_stops() {
        let out = run(allocation_ops(Allocation::Lg2, &[]).unwrap(), [1.0, 2.0_f32.powi(-10), 64.0, 0.5]);
        assert_abs_diff_eq!(out[0], 10.0 / 16.0, epsilon = EPSILON);
        assert_abs_diff_eq!(out[1], 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(out[2], 1.0, epsilon = EPSILON);
        assert_abs_diff_eq!(out[3], 0.5, epsilon = EPSILON);
    }

    #[test]
    fn test_uniform_custom_range() {
        let out = run(allocation_ops(Allocation::Uniform, &[-0.5, 1.5]).unwrap(), [0.5, -0.5, 2.5, 1.0]);
        assert_abs_diff_eq!(out[0], 0.5, epsilon = EPSILON);
        assert_abs_diff_eq!(out[1], 0.0, epsilon = EPSILON);
        // Unclamped fit.
        assert_abs_diff_eq!(out[2], 1.5, epsilon = EPSILON);
    }
}
