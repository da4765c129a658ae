//! Op payloads.
//!
//! [`OpData`] pairs the metadata common to every op with a [`Payload`], the
//! closed set of op kinds. Payloads are plain values: they validate
//! themselves, know their identity and inverse, combine with a neighbour of
//! the same kind when a closed form exists, and write their part of the
//! cache-ID. Evaluation lives in [`crate::cpu`] and [`crate::gpu`].

mod cdl;
mod exponent;
mod fixed_function;
mod hue_curve;
mod log;
mod lut1d;
mod lut3d;
mod matrix;
mod range;
mod rgb_curve;

use std::fmt;

pub use cdl::{CDL_LUMA_WEIGHTS, CdlData, CdlRenderParams, CdlStyle};
pub use exponent::ExponentData;
pub(crate) use fixed_function::{
    AP1_LUMA, DARK_TO_DIM_GAMMA, DIM_TO_DARK_GAMMA, GLOW_03, GLOW_10, Glow, HUE_BSPLINE_M, REC2100_LUMA,
    REC2100_MIN_LUM, RED_MOD_03, RED_MOD_10, RedMod,
};
pub use fixed_function::{FixedFunctionData, FixedFunctionStyle, REC2100_GAMMA_RANGE};
pub use hue_curve::{DynamicHueCurve, HUE_CURVE_KINDS, HueCurveData, HueCurves, curve_index};
pub use log::{CameraSegment, LogData, LogParams, LogStyle};
pub use lut1d::{HueAdjust, InverseLut1D, Lut1DData, Lut1DInterpolation};
pub use lut3d::{FAST_INVERSE_GRID_SIZE, INVERSE_GRID_SIZE, Lut3DData, Lut3DInterpolation};
pub use matrix::MatrixData;
pub use range::{RangeAffine, RangeChannel, RangeData};
pub use rgb_curve::{DynamicRgbCurve, GradingStyle, RgbCurveData, RgbCurves};

use crate::cache_id::CacheIdBuilder;
use crate::meta::{BitDepth, Direction, OpMeta};
use crate::optimizer::FinalizeFlags;
use crate::{OpsError, OpsResult};

// ============================================================================
// Kinds
// ============================================================================

/// Op kind; its tag is the stable name used in cache-IDs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Matrix with offset.
    Matrix,
    /// Per-channel exponent.
    Exponent,
    /// Log, anti-log, affine and camera log.
    Log,
    /// Range remap and clamp.
    Range,
    /// 1D LUT.
    Lut1D,
    /// 3D LUT.
    Lut3D,
    /// ASC CDL.
    Cdl,
    /// Fixed function.
    FixedFunction,
    /// Grading RGB curves.
    GradingRgbCurve,
    /// Grading hue curves.
    GradingHueCurve,
}

impl OpKind {
    /// Stable type tag.
    pub fn tag(&self) -> &'static str {
        match self {
            OpKind::Matrix => "MatrixOffsetOp",
            OpKind::Exponent => "ExponentOp",
            OpKind::Log => "LogOp",
            OpKind::Range => "RangeOp",
            OpKind::Lut1D => "Lut1DOp",
            OpKind::Lut3D => "Lut3DOp",
            OpKind::Cdl => "CDLOp",
            OpKind::FixedFunction => "FixedFunctionOp",
            OpKind::GradingRgbCurve => "GradingRGBCurveOp",
            OpKind::GradingHueCurve => "GradingHueCurveOp",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Matrix with offset.
    Matrix(MatrixData),
    /// Per-channel exponent.
    Exponent(ExponentData),
    /// Log.
    Log(LogData),
    /// Range.
    Range(RangeData),
    /// 1D LUT.
    Lut1D(Lut1DData),
    /// 3D LUT.
    Lut3D(Lut3DData),
    /// ASC CDL.
    Cdl(CdlData),
    /// Fixed function.
    FixedFunction(FixedFunctionData),
    /// Grading RGB curves.
    GradingRgbCurve(RgbCurveData),
    /// Grading hue curves.
    GradingHueCurve(HueCurveData),
}

macro_rules! payload_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Payload {
                fn from(d: $ty) -> Self {
                    Payload::$variant(d)
                }
            }

            impl From<$ty> for OpData {
                fn from(d: $ty) -> Self {
                    OpData::new(d)
                }
            }
        )*
    };
}

payload_from!(
    Matrix(MatrixData),
    Exponent(ExponentData),
    Log(LogData),
    Range(RangeData),
    Lut1D(Lut1DData),
    Lut3D(Lut3DData),
    Cdl(CdlData),
    FixedFunction(FixedFunctionData),
    GradingRgbCurve(RgbCurveData),
    GradingHueCurve(HueCurveData),
);

impl Payload {
    /// Kind of the payload.
    pub fn kind(&self) -> OpKind {
        match self {
            Payload::Matrix(_) => OpKind::Matrix,
            Payload::Exponent(_) => OpKind::Exponent,
            Payload::Log(_) => OpKind::Log,
            Payload::Range(_) => OpKind::Range,
            Payload::Lut1D(_) => OpKind::Lut1D,
            Payload::Lut3D(_) => OpKind::Lut3D,
            Payload::Cdl(_) => OpKind::Cdl,
            Payload::FixedFunction(_) => OpKind::FixedFunction,
            Payload::GradingRgbCurve(_) => OpKind::GradingRgbCurve,
            Payload::GradingHueCurve(_) => OpKind::GradingHueCurve,
        }
    }

    /// Direction the payload is applied in.
    pub fn direction(&self) -> Direction {
        match self {
            Payload::Matrix(d) => d.direction,
            Payload::Exponent(d) => d.direction,
            Payload::Log(d) => d.direction,
            Payload::Range(d) => d.direction,
            Payload::Lut1D(d) => d.direction,
            Payload::Lut3D(d) => d.direction,
            Payload::Cdl(d) => d.direction(),
            Payload::FixedFunction(d) => d.direction(),
            Payload::GradingRgbCurve(d) => d.direction,
            Payload::GradingHueCurve(d) => d.direction,
        }
    }

    fn validate(&self, tag: &str) -> OpsResult<()> {
        match self {
            Payload::Matrix(d) => d.validate(tag),
            Payload::Exponent(d) => d.validate(tag),
            Payload::Log(d) => d.validate(tag),
            Payload::Range(d) => d.validate(tag),
            Payload::Lut1D(d) => d.validate(tag),
            Payload::Lut3D(d) => d.validate(tag),
            Payload::Cdl(d) => d.validate(tag),
            Payload::FixedFunction(d) => d.validate(tag),
            Payload::GradingRgbCurve(d) => d.validate(tag),
            Payload::GradingHueCurve(d) => d.validate(tag),
        }
    }

    fn is_identity(&self) -> bool {
        match self {
            Payload::Matrix(d) => d.is_identity(),
            Payload::Exponent(d) => d.is_identity(),
            Payload::Log(d) => d.is_identity(),
            Payload::Range(d) => d.is_identity(),
            Payload::Lut1D(d) => d.is_identity(),
            Payload::Lut3D(d) => d.is_identity(),
            Payload::Cdl(d) => d.is_identity(),
            Payload::FixedFunction(d) => d.is_identity(),
            Payload::GradingRgbCurve(d) => d.is_identity(),
            Payload::GradingHueCurve(d) => d.is_identity(),
        }
    }

    fn inverse(&self) -> Payload {
        match self {
            Payload::Matrix(d) => d.inverse().into(),
            Payload::Exponent(d) => d.inverse().into(),
            Payload::Log(d) => d.inverse().into(),
            Payload::Range(d) => d.inverse().into(),
            Payload::Lut1D(d) => d.inverse().into(),
            Payload::Lut3D(d) => d.inverse().into(),
            Payload::Cdl(d) => d.inverse().into(),
            Payload::FixedFunction(d) => d.inverse().into(),
            Payload::GradingRgbCurve(d) => d.inverse().into(),
            Payload::GradingHueCurve(d) => d.inverse().into(),
        }
    }

    fn is_dynamic(&self) -> bool {
        match self {
            Payload::GradingRgbCurve(d) => d.dynamic,
            Payload::GradingHueCurve(d) => d.dynamic,
            _ => false,
        }
    }
}

// ============================================================================
// OpData
// ============================================================================

/// An op payload with its metadata and, once finalized, its cache-ID.
#[derive(Debug, Clone, PartialEq)]
pub struct OpData {
    /// Common metadata.
    pub meta: OpMeta,
    /// Kind-specific payload.
    pub payload: Payload,
    cache_id: Option<String>,
}

impl OpData {
    /// Payload with default metadata (32f in and out).
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self { meta: OpMeta::default(), payload: payload.into(), cache_id: None }
    }

    /// Replaces the metadata.
    pub fn with_meta(mut self, meta: OpMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Sets the input and output bit depths.
    pub fn with_depths(mut self, input: BitDepth, output: BitDepth) -> Self {
        self.meta.input_bit_depth = input;
        self.meta.output_bit_depth = output;
        self
    }

    /// Kind of the payload.
    pub fn kind(&self) -> OpKind {
        self.payload.kind()
    }

    /// Direction of the payload.
    pub fn direction(&self) -> Direction {
        self.payload.direction()
    }

    /// Checks the payload invariants.
    pub fn validate(&self) -> OpsResult<()> {
        self.payload.validate(self.kind().tag())
    }

    /// True when the op leaves every pixel unchanged.
    pub fn is_identity(&self) -> bool {
        self.payload.is_identity()
    }

    /// True for curve ops bound to a dynamic property.
    pub fn is_dynamic(&self) -> bool {
        self.payload.is_dynamic()
    }

    /// Inverse op; the bit depths swap.
    pub fn inverse(&self) -> OpData {
        let mut meta = self.meta.clone();
        std::mem::swap(&mut meta.input_bit_depth, &mut meta.output_bit_depth);
        OpData { meta, payload: self.payload.inverse(), cache_id: None }
    }

    /// True when `self` followed by `other` is the identity on the domain
    /// of `self`.
    ///
    /// Matrices and exponents are composed; other kinds must hold the same
    /// payload in opposite directions. Ranges are combined instead, and
    /// dynamic ops may change, so neither is ever an inverse pair.
    pub fn is_inverse_of(&self, other: &OpData) -> bool {
        if self.kind() != other.kind() || self.is_dynamic() || other.is_dynamic() {
            return false;
        }
        match (&self.payload, &other.payload) {
            (Payload::Matrix(a), Payload::Matrix(b)) => a.is_inverse_of(b),
            (Payload::Exponent(a), Payload::Exponent(b)) => a.is_inverse_of(b),
            (Payload::FixedFunction(a), Payload::FixedFunction(b)) => a.is_inverse_of(b),
            (Payload::Range(_), Payload::Range(_)) => false,
            (a, b) => a.direction() != b.direction() && a.inverse() == *b,
        }
    }

    /// Op standing in for a removed inverse pair starting with `self`.
    ///
    /// The pair still clamps what the forward op clamps: LUTs and the
    /// clamping CDL to `[0, 1]`, logs below the zero of their argument.
    /// `None` when nothing needs to stand in.
    pub fn identity_replacement(&self) -> Option<OpData> {
        let forward = if self.direction() == Direction::Forward { self.payload.clone() } else { self.payload.inverse() };
        let range = match &forward {
            Payload::Lut1D(d) if !d.input_half_domain => Some(RangeData::clamp([0.0, 0.0, 0.0, f64::NEG_INFINITY], [1.0, 1.0, 1.0, f64::INFINITY])),
            Payload::Lut3D(_) => Some(RangeData::clamp([0.0, 0.0, 0.0, f64::NEG_INFINITY], [1.0, 1.0, 1.0, f64::INFINITY])),
            Payload::Cdl(d) if d.style.is_clamping() => {
                Some(RangeData::clamp([0.0, 0.0, 0.0, f64::NEG_INFINITY], [1.0, 1.0, 1.0, f64::INFINITY]))
            }
            Payload::Log(d) if d.style() != LogStyle::Camera && self.direction() == Direction::Forward => {
                let mut channels = [RangeChannel::EMPTY; 4];
                for (c, p) in d.params.iter().enumerate() {
                    if p.lin_slope > 0.0 {
                        let lo = -p.lin_offset / p.lin_slope;
                        channels[c] = RangeChannel { min_in: Some(lo), min_out: Some(lo), ..RangeChannel::EMPTY };
                    }
                }
                Some(RangeData::from_channels(channels))
            }
            _ => None,
        };
        let mut meta = self.meta.clone();
        meta.output_bit_depth = meta.input_bit_depth;
        range.map(|r| OpData::new(r).with_meta(meta))
    }

    /// True when `combine_with` can merge `self` and `other` into one op.
    pub fn can_combine_with(&self, other: &OpData) -> bool {
        if self.is_dynamic() || other.is_dynamic() {
            return false;
        }
        match (&self.payload, &other.payload) {
            (Payload::Matrix(_), Payload::Matrix(_)) => true,
            (Payload::Exponent(_), Payload::Exponent(_)) => true,
            (Payload::Range(a), Payload::Range(b)) => a.combine(b).is_some(),
            (Payload::Cdl(a), Payload::Cdl(b)) => a.combine(b).is_some(),
            _ => false,
        }
    }

    /// Single op equivalent to `self` then `other`.
    pub fn combine_with(&self, other: &OpData) -> OpsResult<OpData> {
        let payload: Payload = match (&self.payload, &other.payload) {
            (Payload::Matrix(a), Payload::Matrix(b)) => a.compose(b)?.into(),
            (Payload::Exponent(a), Payload::Exponent(b)) => a.combine(b).into(),
            (Payload::Range(a), Payload::Range(b)) => a.combine(b).map(Payload::from).ok_or_else(|| self.not_combinable(other))?,
            (Payload::Cdl(a), Payload::Cdl(b)) => a.combine(b).map(Payload::from).ok_or_else(|| self.not_combinable(other))?,
            _ => return Err(self.not_combinable(other)),
        };
        let mut meta = self.meta.clone();
        meta.output_bit_depth = other.meta.output_bit_depth;
        meta.descriptions.extend(other.meta.descriptions.iter().cloned());
        Ok(OpData { meta, payload, cache_id: None })
    }

    fn not_combinable(&self, other: &OpData) -> OpsError {
        OpsError::validation(self.kind().tag(), format!("cannot combine with {}", other.kind().tag()))
    }

    /// Computes the cache-ID text.
    pub fn compute_cache_id(&self, flags: &FinalizeFlags) -> String {
        let b = CacheIdBuilder::new(self.kind().tag(), &self.meta, self.direction());
        let b = match &self.payload {
            Payload::Matrix(d) => d.write_cache_id(b),
            Payload::Exponent(d) => d.write_cache_id(b),
            Payload::Log(d) => d.write_cache_id(b),
            Payload::Range(d) => d.write_cache_id(b),
            Payload::Lut1D(d) => d.write_cache_id(b, flags.lut_inverse),
            Payload::Lut3D(d) => d.write_cache_id(b, flags.lut_inverse),
            Payload::Cdl(d) => d.write_cache_id(b),
            Payload::FixedFunction(d) => d.write_cache_id(b),
            Payload::GradingRgbCurve(d) => d.write_cache_id(b),
            Payload::GradingHueCurve(d) => d.write_cache_id(b),
        };
        b.finish()
    }

    /// Cache-ID computed at finalize.
    pub fn cache_id(&self) -> Option<&str> {
        self.cache_id.as_deref()
    }

    pub(crate) fn set_cache_id(&mut self, id: Option<String>) {
        self.cache_id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(OpData::new(ExponentData::uniform(2.0)).kind().tag(), "ExponentOp");
        assert_eq!(OpKind::Cdl.to_string(), "CDLOp");
        assert_eq!(OpKind::GradingRgbCurve.tag(), "GradingRGBCurveOp");
    }

    #[test]
    fn test_inverse_swaps_depths() {
        let op = OpData::new(LogData::log(2.0)).with_depths(BitDepth::UInt10, BitDepth::F32);
        let inv = op.inverse();
        assert_eq!(inv.meta.input_bit_depth, BitDepth::F32);
        assert_eq!(inv.meta.output_bit_depth, BitDepth::UInt10);
        assert_eq!(inv.direction(), Direction::Inverse);
        assert!(op.is_inverse_of(&inv));
    }

    #[test]
    fn test_lut_pair_is_replaced_by_clamp() {
        let lut = OpData::new(Lut1DData::from_fn(16, |x| [x * x, x, x]));
        assert!(lut.is_inverse_of(&lut.inverse()));
        let clamp = lut.identity_replacement().unwrap();
        match clamp.payload {
            Payload::Range(r) => assert_eq!(r.channels[0], RangeChannel::clamp(0.0, 1.0)),
            other => panic!("unexpected {other:?}"),
        }
        let antilog = OpData::new(LogData::anti_log(10.0));
        assert!(antilog.identity_replacement().is_none());
    }

    #[test]
    fn test_cache_id_changes_with_payload() {
        let flags = FinalizeFlags::default();
        let a = OpData::new(ExponentData::uniform(2.0));
        let b = OpData::new(ExponentData::uniform(2.0));
        let c = OpData::new(ExponentData::uniform(2.5));
        assert_eq!(a.compute_cache_id(&flags), b.compute_cache_id(&flags));
        assert_ne!(a.compute_cache_id(&flags), c.compute_cache_id(&flags));
        assert!(a.compute_cache_id(&flags).starts_with("ExponentOp 32f 32f forward"));
    }

    #[test]
    fn test_combine_keeps_outer_depths() {
        let a = OpData::new(MatrixData::scale([2.0; 4])).with_depths(BitDepth::UInt8, BitDepth::F32);
        let b = OpData::new(MatrixData::offset([0.1; 4])).with_depths(BitDepth::F32, BitDepth::UInt16);
        assert!(a.can_combine_with(&b));
        let c = a.combine_with(&b).unwrap();
        assert_eq!(c.meta.input_bit_depth, BitDepth::UInt8);
        assert_eq!(c.meta.output_bit_depth, BitDepth::UInt16);
        assert!(!a.can_combine_with(&OpData::new(LogData::log(2.0))));
    }
}
