//! End-to-end scenarios through the public pipeline API.

use approx::assert_abs_diff_eq;
use vfx_ops::allocation::{Allocation, allocation_ops};
use vfx_ops::data::{ExponentData, FixedFunctionData, LogData, LogParams, OpData, RangeData};
use vfx_ops::optimizer::FinalizeFlags;
use vfx_ops::{Op, OpPipeline};

fn run(pipeline: &mut OpPipeline, px: [f32; 4]) -> [f32; 4] {
    pipeline.finalize(&FinalizeFlags::default()).unwrap();
    let mut out = px;
    pipeline.cpu_processor().unwrap().apply_rgba(&mut out).unwrap();
    out
}

fn run_ops(ops: Vec<OpData>, px: [f32; 4]) -> [f32; 4] {
    let mut pipeline = OpPipeline::new();
    for op in ops {
        pipeline.push(op);
    }
    run(&mut pipeline, px)
}

fn assert_pixel(actual: [f32; 4], expected: [f32; 4], epsilon: f32) {
    for (a, e) in actual.iter().zip(expected) {
        assert_abs_diff_eq!(*a, e, epsilon = epsilon);
    }
}

#[test]
fn test_exponent_round_trip() {
    let src = [0.1, 0.3, 0.9, 0.5];
    let fwd = OpData::new(ExponentData::new([1.2, 1.3, 1.4, 1.5]));
    let out = run_ops(vec![fwd.clone()], src);
    assert_pixel(out, [0.063096, 0.209054, 0.862858, 0.353553], 1e-6);

    let inv = Op::new(fwd).inverse().data().clone();
    let back = run_ops(vec![inv], out);
    assert_pixel(back, src, 1e-6);
}

#[test]
fn test_exponent_limits() {
    let e = ExponentData::new([0.0, 2.0, -2.0, 1.5]);
    let out = run_ops(vec![OpData::new(e.clone())], [2.0, 2.0, 2.0, 2.0]);
    assert_pixel(out, [1.0, 4.0, 0.25, 2.828427], 1e-5);

    let out = run_ops(vec![OpData::new(e)], [-2.0, -2.0, 1.0, -2.0]);
    assert_pixel(out, [1.0, 0.0, 1.0, 0.0], 1e-6);
}

#[test]
fn test_log_lin_to_log_base_10() {
    let log = LogData::affine(10.0, LogParams::affine(0.18, 1.0, 2.0, 0.1));
    let out = run_ops(vec![OpData::new(log)], [0.01, 0.1, 1.0, 1.0]);
    assert_pixel(out, [0.834253, 0.905882, 1.057999, 1.0], 1e-3);
}

#[test]
fn test_allocation_lg2_fit() {
    // The fit stage of the default Lg2 allocation maps [-10, 6] onto [0, 1].
    let ops = allocation_ops(Allocation::Lg2, &[]).unwrap();
    let fit = ops.last().cloned().unwrap();
    let out = run_ops(vec![fit], [0.16, 0.2, 0.3, 0.4]);
    assert_pixel(out, [0.635, 0.6375, 0.64375, 0.4], 2e-5);
}

#[test]
fn test_rec2100_surround_round_trip() {
    let ops = || {
        vec![
            OpData::new(FixedFunctionData::rec2100_surround(2.0)),
            OpData::new(FixedFunctionData::rec2100_surround(0.5)),
        ]
    };
    for px in [[0.3, 0.5, 0.1, 1.0], [0.02, 0.01, 0.9, 0.5], [1.5, 2.0, 0.75, 1.0]] {
        let out = run_ops(ops(), px);
        assert_pixel(out, px, 1e-5);
    }
}

#[test]
fn test_clamp() {
    let clamp = RangeData::clamp(
        [f64::NEG_INFINITY, 0.1, f64::NEG_INFINITY, 0.1],
        [f64::INFINITY, 0.9, f64::INFINITY, 0.9],
    );
    let out = run_ops(vec![OpData::new(clamp)], [-1.0, -1.0, 1.0, 1.0]);
    assert_pixel(out, [-1.0, 0.1, 1.0, 0.9], 0.0);
}
