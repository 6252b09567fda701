//! PCG hash random stream keyed by pixel and frame.
//!
//! The whole generator state is one `u32` owned by the caller. Seeding is a
//! pure function of `(x, y, frame)` so any pixel of any frame can be replayed
//! bit-for-bit, which is what progressive accumulation relies on.
//!
//! The step is PCG-RXS-M-XS 32/32 (O'Neill, "PCG: A Family of Simple Fast
//! Space-Efficient Statistically Good Algorithms for Random Number Generation").

/// LCG multiplier of the PCG step.
pub const PCG_MULTIPLIER: u32 = 747_796_405;
/// LCG increment of the PCG step.
pub const PCG_INCREMENT: u32 = 2_891_336_453;
/// Output permutation multiplier.
const RXS_M_XS_MULTIPLIER: u32 = 277_803_737;

/// Prime stride between frames, keeps consecutive frames of one pixel far apart
/// in seed space.
pub const FRAME_PRIME: u32 = 982_451_653;

/// 2^-24, maps the top 24 bits of a word onto `[0, 1)`.
const INV_2_POW_24: f32 = 1.0 / 16_777_216.0;

/// Build the seed for pixel `(x, y)` of a `width`×`height` image at `frame`.
///
/// `height` does not take part in the mix; it is accepted so the signature
/// names the full image extent.
#[inline]
pub fn seed(width: u32, _height: u32, x: u32, y: u32, frame: u32) -> u32 {
    let pixel_index = y.wrapping_mul(width).wrapping_add(x);
    pixel_index.wrapping_add(frame.wrapping_mul(FRAME_PRIME))
}

/// Advance `state` and return the permuted 32-bit output.
#[inline]
pub fn next_u32(state: &mut u32) -> u32 {
    *state = state.wrapping_mul(PCG_MULTIPLIER).wrapping_add(PCG_INCREMENT);
    let s = *state;
    let word = ((s >> ((s >> 28) + 4)) ^ s).wrapping_mul(RXS_M_XS_MULTIPLIER);
    (word >> 22) ^ word
}

/// Advance `state` and return a float in `[0, 1)`.
///
/// Only the top 24 bits are used so the result is exactly representable and
/// never rounds up to `1.0`.
#[inline]
pub fn next_f32(state: &mut u32) -> f32 {
    (next_u32(state) >> 8) as f32 * INV_2_POW_24
}

/// Convenience wrapper owning the state.
///
/// Copying a `PixelRng` forks the stream: both copies produce the same draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRng {
    state: u32,
}

impl PixelRng {
    /// Stream for pixel `(x, y)` at `frame`.
    #[inline]
    pub fn new(width: u32, height: u32, x: u32, y: u32, frame: u32) -> Self {
        Self { state: seed(width, height, x, y, frame) }
    }

    /// Stream starting from a raw state.
    #[inline]
    pub fn from_state(state: u32) -> Self {
        Self { state }
    }

    /// Current raw state.
    #[inline]
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Mutable access to the raw state, for APIs taking `&mut u32`.
    #[inline]
    pub fn state_mut(&mut self) -> &mut u32 {
        &mut self.state
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        next_u32(&mut self.state)
    }

    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        next_f32(&mut self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_pure() {
        assert_eq!(seed(640, 480, 10, 20, 3), seed(640, 480, 10, 20, 3));
        assert_eq!(seed(640, 480, 10, 20, 0), 20 * 640 + 10);
    }

    #[test]
    fn test_seed_separates_frames() {
        let a = seed(640, 480, 10, 20, 1);
        let b = seed(640, 480, 10, 20, 2);
        assert_eq!(b.wrapping_sub(a), FRAME_PRIME);
    }

    #[test]
    fn test_stream_reproducible() {
        let mut a = seed(64, 64, 5, 7, 9);
        let mut b = a;
        for _ in 0..100 {
            assert_eq!(next_f32(&mut a).to_bits(), next_f32(&mut b).to_bits());
        }
    }

    #[test]
    fn test_unit_interval() {
        let mut state = 0u32;
        for _ in 0..100_000 {
            let v = next_f32(&mut state);
            assert!((0.0..1.0).contains(&v), "{v} out of [0, 1)");
        }
    }

    #[test]
    fn test_mean_near_half() {
        let mut rng = PixelRng::new(256, 256, 17, 33, 1);
        let n = 200_000;
        let sum: f64 = (0..n).map(|_| rng.next_f32() as f64).sum();
        let mean = sum / n as f64;
        assert!((mean - 0.5).abs() < 0.01, "mean = {mean}");
    }

    #[test]
    fn test_wrapper_matches_free_functions() {
        let mut raw = seed(32, 32, 1, 2, 3);
        let mut rng = PixelRng::new(32, 32, 1, 2, 3);
        assert_eq!(rng.state(), raw);
        for _ in 0..16 {
            assert_eq!(rng.next_u32(), next_u32(&mut raw));
        }
        *rng.state_mut() = 42;
        assert_eq!(PixelRng::from_state(42), rng);
    }
}
