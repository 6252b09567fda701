//! Ray/scene intersection result.

use crate::scene::{MaterialId, SphereId};
use crate::util::{Ray, Vec2, Vec3};

/// Nearest intersection along a ray.
///
/// Raw intersection fills `t`, the ids and `geometric_normal` only.
/// `position`, `normal` and `uv` hold garbage until
/// [`calculate_surface_properties`](Self::calculate_surface_properties) ran.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Ray parameter of the hit, [`HitRecord::NO_HIT`] on a miss.
    pub t: f32,
    pub sphere: SphereId,
    pub material: MaterialId,
    /// Unnormalized surface normal (`P - C` for spheres).
    pub geometric_normal: Vec3,
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl HitRecord {
    /// Sentinel distance of a miss.
    pub const NO_HIT: f32 = -1.0;

    /// A record that reports no hit.
    pub const fn miss() -> Self {
        Self {
            t: Self::NO_HIT,
            sphere: SphereId::new(u32::MAX),
            material: MaterialId::DEFAULT,
            geometric_normal: Vec3::ZERO,
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            uv: Vec2::ZERO,
        }
    }

    /// Raw hit as produced by an accelerator.
    pub const fn new(t: f32, sphere: SphereId, material: MaterialId, geometric_normal: Vec3) -> Self {
        Self {
            t,
            sphere,
            material,
            geometric_normal,
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            uv: Vec2::ZERO,
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.t > 0.0
    }

    /// Fill world position, unit normal and uv from the ray that produced this hit.
    #[inline]
    pub fn calculate_surface_properties(&mut self, ray: &Ray) {
        self.position = ray.at(self.t);
        self.normal = self.geometric_normal.normalize();
        self.uv = Vec2::ZERO;
    }
}

impl Default for HitRecord {
    fn default() -> Self {
        Self::miss()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_is_not_hit() {
        assert!(!HitRecord::miss().is_hit());
        assert!(!HitRecord::default().is_hit());
        let grazing = HitRecord::new(0.0, SphereId::new(0), MaterialId::DEFAULT, Vec3::Y);
        assert!(!grazing.is_hit());
    }

    #[test]
    fn test_surface_properties() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let mut hit = HitRecord::new(4.0, SphereId::new(0), MaterialId::DEFAULT, Vec3::new(0.0, 0.0, -2.0));
        assert!(hit.is_hit());
        hit.calculate_surface_properties(&ray);
        assert_eq!(hit.position, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(hit.normal, Vec3::NEG_Z);
        assert_eq!(hit.uv, Vec2::ZERO);
    }
}
