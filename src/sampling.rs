//! Random streams and direction sampling.
//!
//! The stream itself lives in the `pcg-hash` crate; this module adds the
//! geometric sampling the integrator needs.

use std::f32::consts::TAU;

pub use pcg_hash::{PixelRng, next_f32, seed};

use crate::util::{Vec3, orthonormal_basis};

/// Map two uniform draws to a cosine-weighted direction around `+Z`.
///
/// `cos θ = √u1`, `φ = 2π·u2`, so the density is `cos θ / π`.
#[inline]
pub fn cosine_hemisphere_local(u1: f32, u2: f32) -> Vec3 {
    let cos_theta = u1.sqrt();
    let sin_theta = (1.0 - u1).sqrt();
    let (sin_phi, cos_phi) = (TAU * u2).sin_cos();
    Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta)
}

/// Cosine-weighted unit direction in the hemisphere of the unit `normal`.
#[inline]
pub fn cosine_hemisphere(normal: Vec3, u1: f32, u2: f32) -> Vec3 {
    let local = cosine_hemisphere_local(u1, u2);
    let (tangent, bitangent) = orthonormal_basis(normal);
    (tangent * local.x + bitangent * local.y + normal * local.z).normalize()
}

/// Draw a cosine-weighted direction using two values from `rng`.
#[inline]
pub fn sample_cosine_hemisphere(normal: Vec3, rng: &mut PixelRng) -> Vec3 {
    let u1 = rng.next_f32();
    let u2 = rng.next_f32();
    cosine_hemisphere(normal, u1, u2)
}
