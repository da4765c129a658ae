//! Log and anti-log renderer.
//!
//! Arguments of `log` are clamped to `f32::MIN_POSITIVE` so black maps to a
//! large negative value instead of `-inf`. Alpha is never touched.

use crate::data::{LogData, LogStyle};
use crate::meta::Direction;

const LOG2_10: f32 = std::f32::consts::LOG2_10;
const LOG10_2: f32 = std::f32::consts::LOG10_2;
const MIN_VALUE: f32 = f32::MIN_POSITIVE;

/// Affine log parameters with `1 / log2(base)` folded into the slope.
#[derive(Debug, Clone, Copy)]
struct Affine {
    k_log: f32,
    kb: f32,
    m: f32,
    b: f32,
}

impl Affine {
    #[inline]
    fn lin_to_log(&self, x: f32) -> f32 {
        (self.m * x + self.b).max(MIN_VALUE).log2() * self.k_log + self.kb
    }

    #[inline]
    fn log_to_lin(&self, y: f32) -> f32 {
        (((y - self.kb) / self.k_log).exp2() - self.b) / self.m
    }
}

#[derive(Debug, Clone, Copy)]
struct Camera {
    affine: Affine,
    lin_break: f32,
    log_break: f32,
    slope: f32,
    offset: f32,
}

impl Camera {
    #[inline]
    fn lin_to_log(&self, x: f32) -> f32 {
        if x <= self.lin_break { self.slope * x + self.offset } else { self.affine.lin_to_log(x) }
    }

    #[inline]
    fn log_to_lin(&self, y: f32) -> f32 {
        if y <= self.log_break { (y - self.offset) / self.slope } else { self.affine.log_to_lin(y) }
    }
}

#[derive(Debug, Clone)]
enum Kind {
    Log2,
    Log10,
    LogBase { log2_base: f32 },
    Affine([Affine; 3]),
    Camera([Camera; 3]),
}

/// Renderer of a log op.
#[derive(Debug, Clone)]
pub struct LogRenderer {
    kind: Kind,
    forward: bool,
}

impl LogRenderer {
    pub(crate) fn new(data: &LogData) -> Self {
        let log2_base = data.base.log2();
        let affine = |ch: usize| {
            let p = &data.params[ch];
            Affine {
                k_log: (p.log_slope / log2_base) as f32,
                kb: p.log_offset as f32,
                m: p.lin_slope as f32,
                b: p.lin_offset as f32,
            }
        };
        let kind = match data.style() {
            LogStyle::Log2 => Kind::Log2,
            LogStyle::Log10 => Kind::Log10,
            LogStyle::LogBase => Kind::LogBase { log2_base: log2_base as f32 },
            LogStyle::Affine => Kind::Affine(std::array::from_fn(affine)),
            LogStyle::Camera => Kind::Camera(std::array::from_fn(|ch| {
                let a = affine(ch);
                match data.camera_segment(ch) {
                    Some(seg) => Camera {
                        affine: a,
                        lin_break: seg.lin_break as f32,
                        log_break: seg.log_break as f32,
                        slope: seg.slope as f32,
                        offset: seg.offset as f32,
                    },
                    // Validation rejects camera logs with a missing break;
                    // the log segment then covers the whole domain.
                    None => Camera {
                        affine: a,
                        lin_break: f32::NEG_INFINITY,
                        log_break: f32::NEG_INFINITY,
                        slope: 1.0,
                        offset: 0.0,
                    },
                }
            })),
        };
        Self { kind, forward: data.direction == Direction::Forward }
    }

    pub(crate) fn apply(&self, pixels: &mut [f32]) {
        match (&self.kind, self.forward) {
            (Kind::Log2, true) => map_rgb(pixels, |x, _| x.max(MIN_VALUE).log2()),
            (Kind::Log2, false) => map_rgb(pixels, |x, _| x.exp2()),
            (Kind::Log10, true) => map_rgb(pixels, |x, _| x.max(MIN_VALUE).log2() * LOG10_2),
            (Kind::Log10, false) => map_rgb(pixels, |x, _| (x * LOG2_10).exp2()),
            (Kind::LogBase { log2_base }, true) => {
                let k = 1.0 / log2_base;
                map_rgb(pixels, |x, _| x.max(MIN_VALUE).log2() * k)
            }
            (Kind::LogBase { log2_base }, false) => {
                let k = *log2_base;
                map_rgb(pixels, |x, _| (x * k).exp2())
            }
            (Kind::Affine(p), true) => map_rgb(pixels, |x, c| p[c].lin_to_log(x)),
            (Kind::Affine(p), false) => map_rgb(pixels, |x, c| p[c].log_to_lin(x)),
            (Kind::Camera(p), true) => map_rgb(pixels, |x, c| p[c].lin_to_log(x)),
            (Kind::Camera(p), false) => map_rgb(pixels, |x, c| p[c].log_to_lin(x)),
        }
    }
}

#[inline]
fn map_rgb(pixels: &mut [f32], f: impl Fn(f32, usize) -> f32) {
    for px in pixels.chunks_exact_mut(4) {
        px[0] = f(px[0], 0);
        px[1] = f(px[1], 1);
        px[2] = f(px[2], 2);
    }
}
