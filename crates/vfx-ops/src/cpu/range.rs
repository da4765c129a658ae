//! Range renderer.
//!
//! Each channel computes `clamp(scale * x + offset, lo, hi)`. Channels with
//! no bounds pass through; the 4-bit mask of such channels (bit `i` for
//! channel `i`) selects one of sixteen monomorphized loops so the inner
//! loop carries no per-channel branch.

use crate::data::RangeData;

#[derive(Debug, Clone, Copy)]
struct Channel {
    scale: f32,
    offset: f32,
    lo: f32,
    hi: f32,
}

impl Channel {
    #[inline]
    fn eval<const CLAMP: bool>(&self, x: f32) -> f32 {
        let y = self.scale * x + self.offset;
        if CLAMP { y.max(self.lo).min(self.hi) } else { y }
    }
}

/// Renderer of a range op, resolved to the forward direction.
#[derive(Debug, Clone)]
pub struct RangeRenderer {
    channels: [Channel; 4],
    empty_mask: u8,
    clamp: bool,
}

impl RangeRenderer {
    pub(crate) fn new(data: &RangeData) -> Self {
        let effective = data.effective_channels();
        let channels = effective.map(|c| {
            let a = c.affine();
            Channel { scale: a.scale as f32, offset: a.offset as f32, lo: a.lo as f32, hi: a.hi as f32 }
        });
        let empty_mask = effective
            .iter()
            .enumerate()
            .fold(0u8, |m, (i, c)| if c.is_empty() { m | (1 << i) } else { m });
        Self { channels, empty_mask, clamp: !data.no_clamp }
    }

    pub(crate) fn apply(&self, pixels: &mut [f32]) {
        if self.clamp {
            self.dispatch::<true>(pixels);
        } else {
            self.dispatch::<false>(pixels);
        }
    }

    fn dispatch<const CLAMP: bool>(&self, pixels: &mut [f32]) {
        match self.empty_mask {
            0b0000 => self.run::<CLAMP, false, false, false, false>(pixels),
            0b0001 => self.run::<CLAMP, true, false, false, false>(pixels),
            0b0010 => self.run::<CLAMP, false, true, false, false>(pixels),
            0b0011 => self.run::<CLAMP, true, true, false, false>(pixels),
            0b0100 => self.run::<CLAMP, false, false, true, false>(pixels),
            0b0101 => self.run::<CLAMP, true, false, true, false>(pixels),
            0b0110 => self.run::<CLAMP, false, true, true, false>(pixels),
            0b0111 => self.run::<CLAMP, true, true, true, false>(pixels),
            0b1000 => self.run::<CLAMP, false, false, false, true>(pixels),
            0b1001 => self.run::<CLAMP, true, false, false, true>(pixels),
            0b1010 => self.run::<CLAMP, false, true, false, true>(pixels),
            0b1011 => self.run::<CLAMP, true, true, false, true>(pixels),
            0b1100 => self.run::<CLAMP, false, false, true, true>(pixels),
            0b1101 => self.run::<CLAMP, true, false, true, true>(pixels),
            0b1110 => self.run::<CLAMP, false, true, true, true>(pixels),
            _ => {}
        }
    }

    fn run<const CLAMP: bool, const SKIP_R: bool, const SKIP_G: bool, const SKIP_B: bool, const SKIP_A: bool>(
        &self,
        pixels: &mut [f32],
    ) {
        let [r, g, b, a] = self.channels;
        for px in pixels.chunks_exact_mut(4) {
            if !SKIP_R {
                px[0] = r.eval::<CLAMP>(px[0]);
            }
            if !SKIP_G {
                px[1] = g.eval::<CLAMP>(px[1]);
            }
            if !SKIP_B {
                px[2] = b.eval::<CLAMP>(px[2]);
            }
            if !SKIP_A {
                px[3] = a.eval::<CLAMP>(px[3]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RangeChannel;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_clamp_with_unbounded_channels() {
        let range = RangeData::clamp(
            [f64::NEG_INFINITY, 0.1, f64::NEG_INFINITY, 0.1],
            [f64::INFINITY, 0.9, f64::INFINITY, 0.9],
        );
        let r = RangeRenderer::new(&range);
        assert_eq!(r.empty_mask, 0b0101);
        let mut px = [-1.0, -1.0, 1.0, 1.0];
        r.apply(&mut px);
        assert_eq!(px, [-1.0, 0.1, 1.0, 0.9]);
    }

    #[test]
    fn test_every_mask_matches_reference() {
        let bounded = RangeChannel::new(0.0, 2.0, 0.25, 1.25);
        for mask in 0u8..16 {
            let channels: [RangeChannel; 4] = std::array::from_fn(|i| {
                if mask & (1 << i) != 0 { RangeChannel::EMPTY } else { bounded }
            });
            let r = RangeRenderer::new(&RangeData::from_channels(channels));
            assert_eq!(r.empty_mask, mask);
            let src = [-1.0, 0.5, 1.0, 3.0];
            let mut px = src;
            r.apply(&mut px);
            for c in 0..4 {
                let expected = if mask & (1 << c) != 0 { src[c] } else { (src[c] * 0.5 + 0.25).clamp(0.25, 1.25) };
                assert_abs_diff_eq!(px[c], expected, epsilon = EPSILON);
            }
        }
    }

    #[test]
    fn test_no_clamp_and_inverse() {
        let range = RangeData::rgb(0.0, 1.0, 0.5, 1.5);
        let open = RangeRenderer::new(&range.clone().with_no_clamp(true));
        let mut px = [2.0, -1.0, 0.0, 0.7];
        open.apply(&mut px);
        assert_eq!(px, [2.5, -0.5, 0.5, 0.7]);

        let inv = RangeRenderer::new(&range.inverse());
        let mut px = [1.0, 1.5, 2.0, 0.7];
        inv.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.5, epsilon = EPSILON);
        assert_abs_diff_eq!(px[1], 1.0, epsilon = EPSILON);
        assert_abs_diff_eq!(px[2], 1.0, epsilon = EPSILON);
        assert_abs_diff_eq!(px[3], 0.7);
    }
}
