//! Pinhole camera producing primary rays.

use serde::{Deserialize, Serialize};

use crate::util::{Error, Ray, Result, Vec2, Vec3};

/// Pinhole camera.
///
/// The default sits at the origin looking down `+Z` with `+Y` up and a 90°
/// vertical field of view, so the image plane spans `[-aspect, aspect] × [-1, 1]`
/// at distance 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub position: Vec3,
    /// Viewing direction, need not be normalized.
    pub forward: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
            up: Vec3::Y,
            fov_y: 90.0,
        }
    }
}

impl Camera {
    /// Camera at `position` looking at `target`.
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        Self {
            position,
            forward: target - position,
            up,
            ..Self::default()
        }
    }

    /// Check that the camera yields finite rays.
    pub fn validate(&self) -> Result<()> {
        let invalid = |what: &str| Err(Error::InvalidCamera(what.to_string()));
        if !self.position.is_finite() {
            return invalid("position is not finite");
        }
        if !self.forward.is_finite() || self.forward.length_squared() <= f32::EPSILON {
            return invalid("forward must be a finite non-zero vector");
        }
        if !self.up.is_finite() || self.up.length_squared() <= f32::EPSILON {
            return invalid("up must be a finite non-zero vector");
        }
        if !(self.fov_y > 0.0 && self.fov_y < 180.0) {
            return invalid("vertical field of view must be in (0, 180) degrees");
        }
        Ok(())
    }

    /// Orthonormal `(right, up, forward)` frame.
    ///
    /// When `up` is parallel to the view direction another world axis stands in.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = self.forward.normalize();
        let mut up = self.up.normalize();
        if forward.dot(up).abs() > 0.999 {
            up = if forward.z.abs() < 0.999 { Vec3::Z } else { Vec3::X };
        }
        let right = up.cross(forward).normalize();
        let up = forward.cross(right);
        (right, up, forward)
    }

    /// Normalized device coordinates of pixel `(x, y)`: `[-1, 1]²`, `+y` up,
    /// x scaled by the aspect ratio.
    #[inline]
    pub fn ndc(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
        let uv = Vec2::new(x as f32 / width as f32, 1.0 - y as f32 / height as f32);
        let mut uv = uv * 2.0 - Vec2::ONE;
        uv.x *= width as f32 / height as f32;
        uv
    }

    /// Primary ray through the corner of pixel `(x, y)`.
    #[inline]
    pub fn generate_ray(&self, x: u32, y: u32, width: u32, height: u32) -> Ray {
        let (right, up, forward) = self.basis();
        let uv = Self::ndc(x, y, width, height) * (self.fov_y.to_radians() * 0.5).tan();
        let dir = (right * uv.x + up * uv.y + forward).normalize();
        Ray::new(self.position, dir)
    }
}
