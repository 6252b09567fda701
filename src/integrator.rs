//! Iterative path integrator.
//!
//! Each path starts at the camera, bounces diffusely off spheres and picks up
//! sky radiance when it escapes. Directions are cosine-sampled, so the cosine
//! term and the pdf cancel and every bounce just scales throughput by albedo.
//! Past the Russian roulette depth a path survives with probability
//! `min(max(throughput), 1)` and is reweighted by its inverse.

use crate::accel::Accelerator;
use crate::camera::Camera;
use crate::hit::HitRecord;
use crate::sampling::{PixelRng, sample_cosine_hemisphere};
use crate::scene::{GradientSky, Material, Scene, Sky};
use crate::settings::RenderSettings;
use crate::util::{Ray, Vec3, Vec4};

/// Minimum hit distance and offset of bounce origins along the normal.
pub const RAY_EPSILON: f32 = 1e-4;

/// Albedo used for every surface when no shader is attached.
pub const FALLBACK_ALBEDO: f32 = 0.7;

/// Upper bound on shader albedo so no bounce carries full energy.
pub const MAX_SHADER_ALBEDO: f32 = 0.999;

/// What a shader gets to see at a hit point.
#[derive(Debug, Clone, Copy)]
pub struct ShadingContext {
    pub position: Vec3,
    /// Unit surface normal.
    pub normal: Vec3,
    pub material: Material,
}

/// Programmable surface response.
pub trait Shader: Send + Sync {
    /// Diffuse reflectance at the hit. Values are clamped to `[0, 0.999]`.
    fn evaluate(&self, ctx: &ShadingContext) -> Vec3;
}

/// Returns the material's albedo unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlbedoShader;

impl Shader for AlbedoShader {
    fn evaluate(&self, ctx: &ShadingContext) -> Vec3 {
        ctx.material.albedo
    }
}

/// Path tracing kernel bound to one committed scene snapshot.
pub struct Integrator<'a, A: Accelerator> {
    accel: &'a A,
    scene: &'a Scene,
    shader: Option<&'a dyn Shader>,
    max_bounces: u32,
    rr_depth: u32,
    gradient: GradientSky,
}

impl<'a, A: Accelerator> Integrator<'a, A> {
    pub fn new(accel: &'a A, scene: &'a Scene, settings: &RenderSettings) -> Self {
        Self {
            accel,
            scene,
            shader: None,
            max_bounces: settings.max_bounces(),
            rr_depth: settings.russian_roulette_depth(),
            gradient: GradientSky::default(),
        }
    }

    /// Attach a shader; surfaces use its output instead of the fixed albedo.
    pub fn with_shader(mut self, shader: Option<&'a dyn Shader>) -> Self {
        self.shader = shader;
        self
    }

    /// Nearest hit along `ray` beyond [`RAY_EPSILON`].
    #[inline]
    pub fn intersect(&self, ray: &Ray) -> HitRecord {
        self.accel.intersect(ray, RAY_EPSILON, f32::INFINITY)
    }

    /// Environment map if the scene has one, gradient otherwise.
    #[inline]
    pub fn sky(&self, direction: Vec3) -> Vec3 {
        match self.scene.environment() {
            Some(env) => env.sample(direction),
            None => self.gradient.sample(direction),
        }
    }

    /// Radiance along `ray`, alpha always 1.
    pub fn trace(&self, ray: Ray, rng: &mut PixelRng) -> Vec4 {
        let mut ray = ray;
        let mut radiance = Vec3::ZERO;
        let mut throughput = Vec3::ONE;
        let mut bounce = 0;

        while bounce < self.max_bounces {
            let mut hit = self.intersect(&ray);
            if !hit.is_hit() {
                radiance += throughput * self.sky(ray.direction);
                break;
            }
            hit.calculate_surface_properties(&ray);

            if self.scene.debug_normals() {
                return (hit.normal * 0.5 + 0.5).extend(1.0);
            }

            throughput *= self.albedo(&hit);
            bounce += 1;

            if bounce > self.rr_depth {
                let survive = throughput.max_element().min(1.0);
                if survive <= 0.0 || rng.next_f32() > survive {
                    break;
                }
                throughput /= survive;
            }

            let direction = sample_cosine_hemisphere(hit.normal, rng);
            ray = Ray::new(hit.position + hit.normal * RAY_EPSILON, direction);
        }

        radiance.extend(1.0)
    }

    /// Trace the primary ray of pixel `(x, y)` for the given frame index.
    #[inline]
    pub fn trace_pixel(&self, camera: &Camera, x: u32, y: u32, width: u32, height: u32, frame: u32) -> Vec4 {
        let mut rng = PixelRng::new(width, height, x, y, frame);
        self.trace(camera.generate_ray(x, y, width, height), &mut rng)
    }

    fn albedo(&self, hit: &HitRecord) -> Vec3 {
        match self.shader {
            Some(shader) => {
                let material = self.scene.material(hit.material).copied().unwrap_or_default();
                let ctx = ShadingContext {
                    position: hit.position,
                    normal: hit.normal,
                    material,
                };
                shader
                    .evaluate(&ctx)
                    .clamp(Vec3::ZERO, Vec3::splat(MAX_SHADER_ALBEDO))
            }
            None => Vec3::splat(FALLBACK_ALBEDO),
        }
    }
}
