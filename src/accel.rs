//! Acceleration structures: nearest-hit ray queries against committed geometry.
//!
//! The tracer only talks to the [`Accelerator`] trait. Geometry is snapshotted
//! from the [`Scene`] by `build`, made queryable by `commit`, and rebuilt from
//! scratch whenever the scene reports changes.
//!
//! ## Usage
//! ```
//! use lumina::accel::{Accelerator, BruteForce};
//! use lumina::scene::{MaterialId, Scene};
//! use lumina::{Ray, Vec3};
//!
//! let mut scene = Scene::new();
//! scene.add_sphere(Vec3::ZERO, 1.0, MaterialId::DEFAULT).unwrap();
//! let mut accel = BruteForce::build(&scene).unwrap();
//! accel.commit();
//! let hit = accel.intersect(&Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z), 1e-4, f32::INFINITY);
//! assert!((hit.t - 4.0).abs() < 1e-4);
//! ```

use crate::hit::HitRecord;
use crate::scene::{MaterialId, Scene, SphereId};
use crate::util::{Ray, Result, Vec3};

/// Nearest-hit query capability over a scene snapshot.
pub trait Accelerator: Sized + Send + Sync {
    /// Snapshot the scene's geometry. Fails only if the backend cannot be created.
    fn build(scene: &Scene) -> Result<Self>;

    /// Finish construction. Queries are only valid afterwards.
    fn commit(&mut self);

    fn is_committed(&self) -> bool;

    /// Nearest hit with `t` in `(t_near, t_far)`, or [`HitRecord::miss`].
    ///
    /// `ray.direction` must be normalized. Panics if not committed.
    fn intersect(&self, ray: &Ray, t_near: f32, t_far: f32) -> HitRecord;

    /// Number of primitives in the snapshot.
    fn primitive_count(&self) -> usize;
}

/// Linear scan over all spheres, stored as structure of arrays.
#[derive(Debug, Clone, Default)]
pub struct BruteForce {
    centers: Vec<Vec3>,
    radii_sq: Vec<f32>,
    ids: Vec<SphereId>,
    materials: Vec<MaterialId>,
    committed: bool,
}

impl Accelerator for BruteForce {
    #[tracing::instrument(skip_all, fields(sphere_count = scene.sphere_count()))]
    fn build(scene: &Scene) -> Result<Self> {
        let n = scene.sphere_count();
        let mut accel = Self {
            centers: Vec::with_capacity(n),
            radii_sq: Vec::with_capacity(n),
            ids: Vec::with_capacity(n),
            materials: Vec::with_capacity(n),
            committed: false,
        };
        for (id, sphere) in scene.spheres() {
            accel.centers.push(sphere.center);
            accel.radii_sq.push(sphere.radius * sphere.radius);
            accel.ids.push(id);
            accel.materials.push(sphere.material);
        }
        tracing::debug!(primitives = accel.ids.len(), "built brute-force accelerator");
        Ok(accel)
    }

    fn commit(&mut self) {
        self.committed = true;
    }

    fn is_committed(&self) -> bool {
        self.committed
    }

    #[inline]
    fn intersect(&self, ray: &Ray, t_near: f32, t_far: f32) -> HitRecord {
        assert!(self.committed, "intersect on uncommitted accelerator");

        let mut best_t = t_far;
        let mut best = None;
        for (i, (&center, &r2)) in self.centers.iter().zip(&self.radii_sq).enumerate() {
            if let Some(t) = intersect_sphere(ray, center, r2, t_near) {
                if t < best_t {
                    best_t = t;
                    best = Some(i);
                }
            }
        }

        match best {
            Some(i) => {
                let normal = ray.at(best_t) - self.centers[i];
                HitRecord::new(best_t, self.ids[i], self.materials[i], normal)
            }
            None => HitRecord::miss(),
        }
    }

    fn primitive_count(&self) -> usize {
        self.ids.len()
    }
}

/// Smallest root of the ray/sphere quadratic above `t_near`.
///
/// Direction is assumed normalized (`a = 1`). An origin inside the sphere
/// yields the exit point.
#[inline]
pub fn intersect_sphere(ray: &Ray, center: Vec3, radius_sq: f32, t_near: f32) -> Option<f32> {
    let l = ray.origin - center;
    let b = 2.0 * l.dot(ray.direction);
    let c = l.dot(l) - radius_sq;
    let disc = b * b - 4.0 * c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t0 = (-b - sq) * 0.5;
    let t1 = (-b + sq) * 0.5;
    if t0 > t_near {
        Some(t0)
    } else if t1 > t_near {
        Some(t1)
    } else {
        None
    }
}
