//! Log transforms: pure log, affine log and camera log.
//!
//! Forward (lin to log), per channel:
//!
//! ```text
//! out = log_slope * log(lin_slope * in + lin_offset) / log(base) + log_offset
//! ```
//!
//! A camera log adds a linear segment below `lin_break`. Its slope is
//! `linear_slope` (or, when unset, the derivative of the log segment at the
//! break) and its offset is derived so both segments meet at the break.

use crate::cache_id::CacheIdBuilder;
use crate::meta::Direction;
use crate::{OpsError, OpsResult};

/// Per-channel log parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogParams {
    /// Multiplier of the log term.
    pub log_slope: f64,
    /// Added after the log.
    pub log_offset: f64,
    /// Multiplier of the linear input.
    pub lin_slope: f64,
    /// Added to the scaled linear input.
    pub lin_offset: f64,
    /// Break point of the camera linear segment, in linear space.
    pub lin_break: Option<f64>,
    /// Slope of the camera linear segment.
    pub linear_slope: Option<f64>,
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            log_slope: 1.0,
            log_offset: 0.0,
            lin_slope: 1.0,
            lin_offset: 0.0,
            lin_break: None,
            linear_slope: None,
        }
    }
}

impl LogParams {
    /// Affine parameters without a linear segment.
    pub fn affine(log_slope: f64, log_offset: f64, lin_slope: f64, lin_offset: f64) -> Self {
        Self { log_slope, log_offset, lin_slope, lin_offset, ..Self::default() }
    }

    /// Adds a camera linear segment below `lin_break`.
    pub fn with_break(mut self, lin_break: f64, linear_slope: Option<f64>) -> Self {
        self.lin_break = Some(lin_break);
        self.linear_slope = linear_slope;
        self
    }

    fn is_simple(&self) -> bool {
        *self == Self::default()
    }
}

/// Resolved camera segment: below `lin_break` the output is
/// `slope * x + offset`; `log_break` is the output at the break.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSegment {
    /// Break in linear space.
    pub lin_break: f64,
    /// Break in log space.
    pub log_break: f64,
    /// Slope of the linear segment.
    pub slope: f64,
    /// Offset of the linear segment.
    pub offset: f64,
}

/// Evaluation style, from the most to the least specialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    /// `log2(x)` / `2^x`.
    Log2,
    /// `log10(x)` / `10^x`.
    Log10,
    /// `log(x) / log(base)` / `base^x`.
    LogBase,
    /// Affine parameters per channel.
    Affine,
    /// Affine with a linear segment.
    Camera,
}

/// Log payload.
#[derive(Debug, Clone, PartialEq)]
pub struct LogData {
    /// Log base.
    pub base: f64,
    /// RGB parameters; alpha is never touched.
    pub params: [LogParams; 3],
    /// Forward is lin to log.
    pub direction: Direction,
}

impl LogData {
    /// Pure log in `base`.
    pub fn log(base: f64) -> Self {
        Self { base, params: [LogParams::default(); 3], direction: Direction::Forward }
    }

    /// Pure anti-log in `base`.
    pub fn anti_log(base: f64) -> Self {
        Self::log(base).with_direction(Direction::Inverse)
    }

    /// Affine log with the same parameters on RGB.
    pub fn affine(base: f64, params: LogParams) -> Self {
        Self { base, params: [params; 3], direction: Direction::Forward }
    }

    /// Affine or camera log with per-channel parameters.
    pub fn per_channel(base: f64, params: [LogParams; 3]) -> Self {
        Self { base, params, direction: Direction::Forward }
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Evaluation style.
    pub fn style(&self) -> LogStyle {
        if self.params.iter().any(|p| p.lin_break.is_some()) {
            LogStyle::Camera
        } else if !self.params.iter().all(LogParams::is_simple) {
            LogStyle::Affine
        } else if self.base == 2.0 {
            LogStyle::Log2
        } else if self.base == 10.0 {
            LogStyle::Log10
        } else {
            LogStyle::LogBase
        }
    }

    /// Checks the base, the slopes needed by the inverse and the camera
    /// break.
    pub fn validate(&self, tag: &str) -> OpsResult<()> {
        if !(self.base.is_finite() && self.base > 0.0 && self.base != 1.0) {
            return Err(OpsError::validation(tag, format!("invalid log base {}", self.base)));
        }
        let is_camera = self.style() == LogStyle::Camera;
        for (ch, p) in self.params.iter().enumerate() {
            if self.direction == Direction::Inverse && (p.log_slope == 0.0 || p.lin_slope == 0.0) {
                return Err(OpsError::validation(
                    tag,
                    format!(
                        "channel {ch}: log side slope {} and lin side slope {} must be non-zero",
                        p.log_slope, p.lin_slope
                    ),
                ));
            }
            if is_camera {
                let Some(brk) = p.lin_break else {
                    return Err(OpsError::validation(
                        tag,
                        format!("channel {ch}: camera log needs a linear break on every channel"),
                    ));
                };
                if p.lin_slope * brk + p.lin_offset <= 0.0 {
                    return Err(OpsError::validation(
                        tag,
                        format!("channel {ch}: log argument at the break {brk} must be positive"),
                    ));
                }
                if p.linear_slope == Some(0.0) && self.direction == Direction::Inverse {
                    return Err(OpsError::validation(
                        tag,
                        format!("channel {ch}: linear slope must be non-zero"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Resolves the camera segment of channel `ch`.
    pub fn camera_segment(&self, ch: usize) -> Option<CameraSegment> {
        let p = &self.params[ch];
        let lin_break = p.lin_break?;
        let ln_base = self.base.ln();
        let arg = p.lin_slope * lin_break + p.lin_offset;
        let log_break = p.log_slope * arg.ln() / ln_base + p.log_offset;
        let slope = p.linear_slope.unwrap_or(p.log_slope * p.lin_slope / (arg * ln_base));
        Some(CameraSegment { lin_break, log_break, slope, offset: log_break - slope * lin_break })
    }

    /// Never an identity.
    pub fn is_identity(&self) -> bool {
        false
    }

    /// Same payload applied in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self { direction: self.direction.inverse(), ..self.clone() }
    }

    pub(crate) fn write_cache_id(&self, mut b: CacheIdBuilder) -> CacheIdBuilder {
        b = b.word("base").double(self.base);
        for p in &self.params {
            b = b
                .doubles(&[p.log_slope, p.log_offset, p.lin_slope, p.lin_offset])
                .opt_double(p.lin_break)
                .opt_double(p.linear_slope);
        }
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_style_detection() {
        assert_eq!(LogData::log(2.0).style(), LogStyle::Log2);
        assert_eq!(LogData::anti_log(10.0).style(), LogStyle::Log10);
        assert_eq!(LogData::log(3.0).style(), LogStyle::LogBase);
        let p = LogParams::affine(0.18, 1.0, 2.0, 0.1);
        assert_eq!(LogData::affine(10.0, p).style(), LogStyle::Affine);
        assert_eq!(LogData::affine(10.0, p.with_break(0.1, None)).style(), LogStyle::Camera);
    }

    #[test]
    fn test_inverse_needs_slopes() {
        let p = LogParams::affine(0.0, 1.0, 2.0, 0.1);
        let log = LogData::affine(10.0, p);
        assert!(log.validate("LogOp").is_ok());
        assert!(log.inverse().validate("LogOp").is_err());
        assert!(LogData::log(1.0).validate("LogOp").is_err());
    }

    #[test]
    fn test_camera_segment_is_continuous() {
        let p = LogParams::affine(0.25, 0.6, 5.5, 0.05).with_break(0.01, None);
        let log = LogData::affine(2.0, p);
        let seg = log.camera_segment(0).unwrap();
        let at_break = 0.25 * (5.5 * 0.01_f64 + 0.05).log2() + 0.6;
        assert_abs_diff_eq!(seg.slope * 0.01 + seg.offset, at_break, epsilon = 1e-12);
        // The derived slope matches the log derivative at the break.
        let h: f64 = 1e-7;
        let above = 0.25 * (5.5 * (0.01 + h) + 0.05).log2() + 0.6;
        assert_abs_diff_eq!((above - at_break) / h, seg.slope, epsilon = 1e-4);
    }
}
