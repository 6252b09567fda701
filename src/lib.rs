//! # Lumina
//!
//! Interactive progressive Monte Carlo path tracer for sphere scenes.
//!
//! Each call to [`PathTracer::render`] adds one full-image pass to a
//! floating-point accumulation buffer; the display image is the running mean,
//! tonemapped (ACES) and gamma corrected to RGBA8 on demand. Changing the scene
//! or the settings restarts accumulation.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math types, color helpers
//! - [`scene`] - Spheres, materials, hierarchy, sky
//! - [`camera`] - Pinhole camera
//! - [`settings`] - Render settings with change tracking
//! - [`sampling`] - Per-pixel random streams, hemisphere sampling
//! - [`hit`] - Intersection records
//! - [`accel`] - Acceleration structure trait and brute-force backend
//! - [`integrator`] - Path tracing kernel and shader hook
//! - [`accum`] - Accumulation buffer
//! - [`display`] - HDR to RGBA8 conversion
//! - [`tracer`] - Orchestrator and backends
//! - [`progressive`] - Background render worker
//!
//! ## Example
//!
//! ```
//! use lumina::prelude::*;
//!
//! let mut scene = Scene::new();
//! scene.add_sphere(Vec3::new(0.0, 0.0, 3.0), 1.0, MaterialId::DEFAULT)?;
//!
//! let mut settings = RenderSettings::default();
//! settings.set_resolution(32, 32)?;
//! settings.set_samples_per_pixel(4);
//!
//! let mut tracer = create_path_tracer(Backend::Cpu);
//! tracer.set_scene(scene);
//! tracer.set_settings(settings);
//! while !tracer.render()?.is_converged() {}
//!
//! let rgba: &[u8] = tracer.display().as_bytes();
//! assert_eq!(rgba.len(), 32 * 32 * 4);
//! # Ok::<(), lumina::Error>(())
//! ```

pub mod util;
pub mod scene;
pub mod camera;
pub mod settings;
pub mod sampling;
pub mod hit;
pub mod accel;
pub mod integrator;
pub mod accum;
pub mod display;
pub mod tracer;
pub mod progressive;

// Re-export commonly used types
pub use util::{Error, Ray, Result, Vec3, Vec4};
pub use settings::RenderSettings;
pub use tracer::{Backend, CpuPathTracer, FrameStatus, PathTracer, create_path_tracer};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Ray, Result, Vec3, Vec4};
    pub use crate::scene::{EnvironmentMap, Material, MaterialId, Scene, Sky, SphereId};
    pub use crate::camera::Camera;
    pub use crate::settings::RenderSettings;
    pub use crate::integrator::{AlbedoShader, Shader, ShadingContext};
    pub use crate::tracer::{Backend, CpuPathTracer, FrameStatus, PathTracer, create_path_tracer};
    pub use crate::progressive::ProgressiveRenderer;
}
