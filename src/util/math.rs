//! Math type re-exports and ray helpers.
//!
//! Vectors come from `glam`; everything is single precision.

pub use glam::{Vec2, Vec3, Vec4};

/// A ray with an origin and a direction.
///
/// Intersection code assumes `direction` is normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    #[inline]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Point at distance `t` along the ray.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }
}

/// Rec. 601 luma weights, used for auto exposure.
pub const LUMA_WEIGHTS: Vec3 = Vec3::new(0.299, 0.587, 0.114);

/// Perceived luminance of a linear RGB color.
#[inline]
pub fn luminance(rgb: Vec3) -> f32 {
    rgb.dot(LUMA_WEIGHTS)
}

/// Build an orthonormal `(tangent, bitangent)` pair around a unit `normal`.
///
/// Picks +Z as helper axis unless the normal is (nearly) parallel to it.
#[inline]
pub fn orthonormal_basis(normal: Vec3) -> (Vec3, Vec3) {
    let up = if normal.z.abs() < 0.999 { Vec3::Z } else { Vec3::X };
    let tangent = up.cross(normal).normalize();
    let bitangent = normal.cross(tangent);
    (tangent, bitangent)
}
