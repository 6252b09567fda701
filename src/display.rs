//! HDR to 8-bit display conversion.
//!
//! Pipeline per pixel: average the accumulated sum, scale by exposure (manual
//! or auto), ACES filmic tonemap, gamma 2.2, truncate to 8 bits.
//!
//! ```text
//! sum / frames → × exposure → ACES → ^(1/2.2) → RGBA8
//! ```
//!
//! The buffer is lazy: accumulation marks it dirty and the next read
//! recomputes it.

use rayon::prelude::*;

use crate::accum::AccumulationBuffer;
use crate::settings::RenderSettings;
use crate::util::{Vec3, luminance};

/// Display gamma.
pub const GAMMA: f32 = 2.2;

/// Pixels with luminance outside `(MIN, MAX)` are ignored by auto exposure.
pub const AUTO_EXPOSURE_MIN_LUMINANCE: f32 = 0.001;
pub const AUTO_EXPOSURE_MAX_LUMINANCE: f32 = 10.0;

/// Opaque black, shown before the first pass.
pub const BLACK: [u8; 4] = [0, 0, 0, 255];

/// ACES filmic curve (Narkowicz fit), clamped to `[0, 1]`. Negative input maps to 0.
#[inline]
pub fn aces_tonemap(x: f32) -> f32 {
    let x = x.max(0.0);
    let num = x * (2.51 * x + 0.03);
    let den = x * (2.43 * x + 0.59) + 0.14;
    (num / den).clamp(0.0, 1.0)
}

#[inline]
pub fn aces_tonemap_rgb(c: Vec3) -> Vec3 {
    Vec3::new(aces_tonemap(c.x), aces_tonemap(c.y), aces_tonemap(c.z))
}

#[inline]
pub fn gamma_correct(c: f32) -> f32 {
    c.powf(1.0 / GAMMA)
}

/// Exposure that maps the mean luminance of `pixels` onto `target`.
///
/// Only pixels in the luminance window count. With none left the exposure is 1.
pub fn auto_exposure(pixels: impl IntoIterator<Item = Vec3>, target: f32) -> f32 {
    let (sum, count) = pixels
        .into_iter()
        .map(luminance)
        .filter(|&l| l > AUTO_EXPOSURE_MIN_LUMINANCE && l < AUTO_EXPOSURE_MAX_LUMINANCE)
        .fold((0.0f64, 0usize), |(s, n), l| (s + l as f64, n + 1));
    if count == 0 {
        return 1.0;
    }
    let avg = (sum / count as f64) as f32;
    (target / (avg + 1e-3)).clamp(0.1, 10.0)
}

/// Quantize a display-referred color to RGBA8 with full alpha.
#[inline]
pub fn pack_rgba8(c: Vec3) -> [u8; 4] {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u8;
    [q(c.x), q(c.y), q(c.z), 255]
}

/// Logical `0xRRGGBBAA` word of a pixel.
#[inline]
pub fn rgba_to_u32(px: [u8; 4]) -> u32 {
    u32::from_be_bytes(px)
}

/// Full conversion of one averaged linear color.
#[inline]
pub fn to_display(linear: Vec3, exposure: f32) -> [u8; 4] {
    let mapped = aces_tonemap_rgb(linear * exposure);
    pack_rgba8(Vec3::new(
        gamma_correct(mapped.x),
        gamma_correct(mapped.y),
        gamma_correct(mapped.z),
    ))
}

/// 8-bit RGBA image derived from an accumulation buffer.
#[derive(Debug, Clone)]
pub struct DisplayBuffer {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
    dirty: bool,
    exposure: f32,
}

impl DisplayBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![BLACK; width as usize * height as usize],
            dirty: true,
            exposure: 1.0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width as usize * height as usize, BLACK);
        self.dirty = true;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Exposure used by the last conversion.
    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    /// Recompute from `accum` if dirty.
    pub fn update(&mut self, accum: &AccumulationBuffer, settings: &RenderSettings) {
        if !self.dirty {
            return;
        }
        self.convert(accum, settings);
        self.dirty = false;
    }

    #[tracing::instrument(skip_all, fields(width = self.width, height = self.height, frames = accum.frame_count()))]
    fn convert(&mut self, accum: &AccumulationBuffer, settings: &RenderSettings) {
        assert_eq!(
            (accum.width(), accum.height()),
            (self.width, self.height),
            "display and accumulation buffers disagree on size"
        );

        if accum.frame_count() == 0 {
            self.pixels.fill(BLACK);
            self.exposure = settings.exposure();
            return;
        }

        self.exposure = if settings.auto_exposure() {
            auto_exposure(accum.averages().map(|c| c.truncate()), settings.target_luminance())
        } else {
            settings.exposure()
        };

        let inv = 1.0 / accum.frame_count() as f32;
        let exposure = self.exposure;
        self.pixels
            .par_iter_mut()
            .zip(accum.sums().par_iter())
            .for_each(|(px, sum)| *px = to_display(sum.truncate() * inv, exposure));
    }

    /// Pixels as `[r, g, b, a]`, row-major, top row first.
    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    /// Raw bytes in R, G, B, A order.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Pixel as logical `0xRRGGBBAA`.
    pub fn pixel_u32(&self, x: u32, y: u32) -> u32 {
        rgba_to_u32(self.pixel(x, y))
    }

    /// Copy into an `image` buffer for encoding.
    pub fn to_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_raw(self.width, self.height, self.as_bytes().to_vec())
            .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Vec4;

    #[test]
    fn test_tonemap_bounds() {
        assert_eq!(aces_tonemap(0.0), 0.0);
        for x in [-0.01, -0.1, -1.0, -5.0, -1e6] {
            assert_eq!(aces_tonemap(x), 0.0, "{x}");
        }
        let big = aces_tonemap(1e6);
        assert!(big <= 1.0 && big > 0.99);
        let mut prev = 0.0;
        for i in 1..100 {
            let v = aces_tonemap(i as f32 * 0.1);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn test_pack_order() {
        let px = pack_rgba8(Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(px, [255, 127, 0, 255]);
        assert_eq!(rgba_to_u32(px), 0xFF7F00FF);
        assert_eq!(pack_rgba8(Vec3::new(2.0, -1.0, 0.999)), [255, 0, 254, 255]);
    }

    #[test]
    fn test_auto_exposure() {
        assert_eq!(auto_exposure(std::iter::empty::<Vec3>(), 0.18), 1.0);
        // Only out-of-window pixels
        assert_eq!(auto_exposure([Vec3::ZERO, Vec3::splat(50.0)], 0.18), 1.0);

        let e = auto_exposure([Vec3::splat(0.5), Vec3::splat(0.5), Vec3::splat(100.0)], 0.18);
        assert!((e - 0.18 / 0.501).abs() < 1e-4);

        assert_eq!(auto_exposure([Vec3::splat(0.002)], 0.18), 10.0);
        assert_eq!(auto_exposure([Vec3::splat(9.0)], 0.18), 0.1);
    }

    #[test]
    fn test_zero_frames_is_black() {
        let accum = AccumulationBuffer::new(3, 2);
        let mut display = DisplayBuffer::new(3, 2);
        display.update(&accum, &RenderSettings::default());
        assert!(display.pixels().iter().all(|p| *p == BLACK));
        assert_eq!(display.pixel_u32(2, 1), 0x0000_00FF);
    }

    #[test]
    fn test_lazy_update() {
        let mut accum = AccumulationBuffer::new(2, 2);
        let settings = RenderSettings::default();
        let mut display = DisplayBuffer::new(2, 2);

        accum.accumulate(|_, _| Vec4::new(1.0, 1.0, 1.0, 1.0));
        display.update(&accum, &settings);
        let lit = display.pixel(0, 0);
        assert_ne!(lit, BLACK);
        assert!(!display.is_dirty());

        // Not dirty: a reset alone does not change what is shown
        accum.reset();
        display.update(&accum, &settings);
        assert_eq!(display.pixel(0, 0), lit);

        display.mark_dirty();
        display.update(&accum, &settings);
        assert_eq!(display.pixel(0, 0), BLACK);
    }

    #[test]
    fn test_known_value() {
        // 1.0 through ACES is ~0.8038, gamma → ~0.9056, × 255 → 230
        let px = to_display(Vec3::ONE, 1.0);
        assert_eq!(px, [230, 230, 230, 255]);
    }

    #[test]
    fn test_bytes_are_rgba() {
        let mut accum = AccumulationBuffer::new(1, 1);
        accum.accumulate(|_, _| Vec4::new(100.0, 0.0, 0.0, 1.0));
        let mut display = DisplayBuffer::new(1, 1);
        display.update(&accum, &RenderSettings::default());
        assert_eq!(display.as_bytes(), &[255, 0, 0, 255]);
        assert_eq!(display.to_image().get_pixel(0, 0).0, [255, 0, 0, 255]);
    }
}
