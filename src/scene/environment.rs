//! Sky radiance: procedural gradient or equirectangular HDR environment map.

use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::path::Path;

use crate::util::{Error, Result, Vec3};

/// Radiance arriving from infinity along a direction.
pub trait Sky: Send + Sync {
    /// `direction` is expected to be normalized.
    fn sample(&self, direction: Vec3) -> Vec3;
}

/// Vertical white-to-blue gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientSky {
    pub horizon: Vec3,
    pub zenith: Vec3,
}

impl GradientSky {
    pub const SKY_BLUE: Vec3 = Vec3::new(0.5, 0.7, 1.0);
}

impl Default for GradientSky {
    fn default() -> Self {
        Self { horizon: Vec3::ONE, zenith: Self::SKY_BLUE }
    }
}

impl Sky for GradientSky {
    #[inline]
    fn sample(&self, direction: Vec3) -> Vec3 {
        let t = 0.5 * (direction.y + 1.0);
        self.horizon.lerp(self.zenith, t)
    }
}

/// Equirectangular environment map held in linear RGB f32.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    width: u32,
    height: u32,
    texels: Vec<Vec3>,
}

impl EnvironmentMap {
    /// Wrap raw interleaved RGB floats, row-major, top row first.
    pub fn from_rgb_f32(width: u32, height: u32, data: &[f32]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidEnvironment(format!("empty image {width}x{height}")));
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(Error::InvalidEnvironment(format!(
                "expected {expected} floats for {width}x{height}, got {}",
                data.len()
            )));
        }
        let texels = data
            .chunks_exact(3)
            .map(|px| Vec3::new(px[0], px[1], px[2]))
            .collect();
        Ok(Self { width, height, texels })
    }

    /// Load HDR/EXR (or any LDR format the `image` crate decodes).
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        use image::ImageReader;

        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        let rgb = img.to_rgb32f();
        let (width, height) = rgb.dimensions();
        let env = Self::from_rgb_f32(width, height, rgb.as_raw())?;
        tracing::info!(width, height, "loaded environment map");
        Ok(env)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel at integer coordinates, row 0 at the top.
    pub fn texel(&self, x: u32, y: u32) -> Vec3 {
        self.texels[y as usize * self.width as usize + x as usize]
    }

    /// Map a direction to `(u, v)` in `[0, 1]²`. `v = 0` is straight up.
    pub fn direction_to_uv(direction: Vec3) -> (f32, f32) {
        let theta = direction.z.atan2(direction.x) - FRAC_PI_2;
        let phi = direction.y.clamp(-1.0, 1.0).asin();
        let u = 1.0 - (theta + PI) / TAU;
        let v = 1.0 - (phi + FRAC_PI_2) / PI;
        (u.clamp(0.0, 1.0), v.clamp(0.0, 1.0))
    }
}

impl Sky for EnvironmentMap {
    fn sample(&self, direction: Vec3) -> Vec3 {
        let (u, v) = Self::direction_to_uv(direction);
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        self.texel(x, y)
    }
}
