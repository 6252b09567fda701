//! Render orchestration: dirty-flag handling, pass scheduling and backends.
//!
//! ## Frame lifecycle
//! ```text
//! scene.has_changes  → reset accumulation, accelerator rebuilt before next pass
//! settings.is_dirty  → resize (new resolution) or reset, clear flag
//! pass               → trace every pixel with frame = frame_count + 1
//! display()          → lazy HDR → RGBA8 conversion
//! ```
//!
//! Edits are applied by `render`, `display`, `accumulation` and `sync`, so a
//! read right after an edit already sees the reset buffers.
//!
//! ## Usage
//! ```
//! use lumina::scene::{MaterialId, Scene};
//! use lumina::tracer::{Backend, CpuPathTracer, FrameStatus, PathTracer};
//! use lumina::{RenderSettings, Vec3};
//!
//! let mut scene = Scene::new();
//! scene.add_sphere(Vec3::new(0.0, 0.0, 3.0), 1.0, MaterialId::DEFAULT).unwrap();
//! let mut settings = RenderSettings::default();
//! settings.set_resolution(16, 16).unwrap();
//! settings.set_samples_per_pixel(2);
//!
//! let mut tracer: CpuPathTracer = CpuPathTracer::new(Backend::Cpu);
//! tracer.set_scene(scene);
//! tracer.set_settings(settings);
//! while let FrameStatus::Rendered { .. } = tracer.render().unwrap() {}
//! assert_eq!(tracer.frame_count(), 2);
//! assert_eq!(tracer.display().as_bytes().len(), 16 * 16 * 4);
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::accel::{Accelerator, BruteForce};
use crate::accum::AccumulationBuffer;
use crate::display::DisplayBuffer;
use crate::integrator::{Integrator, Shader};
use crate::scene::Scene;
use crate::settings::RenderSettings;
use crate::util::{Error, Result, Vec4};

/// How pixel work is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    /// Scanlines in parallel on the rayon pool.
    #[default]
    Cpu,
    /// Scanlines in order on the calling thread.
    CpuSerial,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Cpu, Backend::CpuSerial];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Cpu => "cpu",
            Backend::CpuSerial => "cpu-serial",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" | "parallel" => Ok(Backend::Cpu),
            "cpu-serial" | "serial" => Ok(Backend::CpuSerial),
            _ => Err(Error::UnknownBackend(s.to_string())),
        }
    }
}

/// Outcome of one [`PathTracer::render`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// At least one pass was added; `frame_count` passes are now accumulated.
    Rendered { frame_count: u32 },
    /// The sample budget was already met; nothing was traced.
    Converged { frame_count: u32 },
}

impl FrameStatus {
    pub fn frame_count(self) -> u32 {
        match self {
            FrameStatus::Rendered { frame_count } | FrameStatus::Converged { frame_count } => frame_count,
        }
    }

    pub fn is_converged(self) -> bool {
        matches!(self, FrameStatus::Converged { .. })
    }
}

/// Progressive renderer interface.
pub trait PathTracer: Send {
    fn backend(&self) -> Backend;

    /// React to pending changes, then trace.
    ///
    /// Progressive settings trace one pass per call until `samples_per_pixel`
    /// passes are accumulated. Otherwise the whole budget is traced at once.
    fn render(&mut self) -> Result<FrameStatus>;

    /// Current image, converted on demand.
    fn display(&mut self) -> &DisplayBuffer;

    /// Accumulated sums, with pending edits applied first.
    fn accumulation(&mut self) -> &AccumulationBuffer;

    /// Apply pending scene and settings edits to the buffers without tracing.
    fn sync(&mut self);

    /// Whether an edit has not reached the buffers yet.
    fn has_pending_changes(&self) -> bool {
        self.settings().is_dirty() || self.scene().has_changes()
    }

    /// Passes accumulated since the last reset. A pending edit counts as a reset.
    fn frame_count(&self) -> u32;

    fn is_converged(&self) -> bool {
        self.frame_count() >= self.settings().samples_per_pixel()
    }

    /// Replace the scene. The next frame rebuilds and restarts accumulation.
    fn set_scene(&mut self, scene: Scene);

    fn scene(&self) -> &Scene;

    /// Edit the scene in place. Mutations mark it changed.
    fn scene_mut(&mut self) -> &mut Scene;

    /// Replace the settings. The next frame restarts accumulation.
    fn set_settings(&mut self, settings: RenderSettings);

    fn settings(&self) -> &RenderSettings;

    /// Edit settings in place. Changing setters mark them dirty.
    fn settings_mut(&mut self) -> &mut RenderSettings;

    /// Attach a surface shader. Restarts accumulation.
    fn set_shader(&mut self, shader: Option<Arc<dyn Shader>>);

    /// Discard accumulated samples.
    fn reset(&mut self);
}

/// Create a tracer with the default accelerator for `backend`.
pub fn create_path_tracer(backend: Backend) -> Box<dyn PathTracer> {
    Box::new(CpuPathTracer::<BruteForce>::new(backend))
}

/// CPU path tracer over any [`Accelerator`].
pub struct CpuPathTracer<A: Accelerator = BruteForce> {
    backend: Backend,
    scene: Scene,
    settings: RenderSettings,
    accel: Option<A>,
    /// Scene edits seen by `sync` that the accelerator does not reflect yet.
    accel_stale: bool,
    shader: Option<Arc<dyn Shader>>,
    accum: AccumulationBuffer,
    display: DisplayBuffer,
}

impl<A: Accelerator> CpuPathTracer<A> {
    pub fn new(backend: Backend) -> Self {
        let settings = RenderSettings::default();
        let (w, h) = settings.resolution();
        Self {
            backend,
            scene: Scene::new(),
            settings,
            accel: None,
            accel_stale: true,
            shader: None,
            accum: AccumulationBuffer::new(w, h),
            display: DisplayBuffer::new(w, h),
        }
    }

    /// Apply pending changes and make sure the accelerator matches the scene.
    ///
    /// Called by `render`; exposed so callers can sync state without tracing.
    pub fn prepare_frame(&mut self) -> Result<()> {
        self.apply_changes();
        if self.accel_stale || self.accel.is_none() {
            let mut accel = A::build(&self.scene)?;
            accel.commit();
            self.accel = Some(accel);
            self.accel_stale = false;
        }
        Ok(())
    }

    /// Reset or resize the buffers for pending edits. The accelerator is
    /// rebuilt lazily by the next frame.
    fn apply_changes(&mut self) {
        if self.scene.has_changes() {
            self.accel_stale = true;
            self.invalidate();
            self.scene.mark_changes_processed();
            tracing::debug!(spheres = self.scene.sphere_count(), "scene changed, accumulation reset");
        }

        if self.settings.is_dirty() {
            let (w, h) = self.settings.resolution();
            if (w, h) != (self.accum.width(), self.accum.height()) {
                self.accum.resize(w, h);
                self.display.resize(w, h);
                tracing::info!(width = w, height = h, "resized render buffers");
            } else {
                self.invalidate();
                tracing::debug!("settings changed, accumulation reset");
            }
            self.settings.clear_dirty();
        }
    }

    /// Radiance of one primary sample, for the current state.
    pub fn trace_pixel(&mut self, x: u32, y: u32, frame: u32) -> Result<Vec4> {
        self.prepare_frame()?;
        let (w, h) = self.settings.resolution();
        let accel = self.committed_accel();
        let integrator = Integrator::new(accel, &self.scene, &self.settings).with_shader(self.shader.as_deref());
        Ok(integrator.trace_pixel(self.settings.camera(), x, y, w, h, frame))
    }

    fn committed_accel(&self) -> &A {
        match &self.accel {
            Some(accel) => accel,
            None => panic!("accelerator missing after prepare_frame"),
        }
    }

    fn invalidate(&mut self) {
        self.accum.reset();
        self.display.mark_dirty();
    }

    #[tracing::instrument(skip_all, fields(frame = self.accum.frame_count() + 1, backend = %self.backend))]
    fn render_pass(&mut self) {
        let Self { backend, scene, settings, accel, shader, accum, display, accel_stale: _ } = self;
        let Some(accel) = accel.as_ref() else {
            panic!("render pass without accelerator");
        };

        let (w, h) = settings.resolution();
        let frame = accum.frame_count() + 1;
        let camera = *settings.camera();
        let integrator = Integrator::new(accel, scene, settings).with_shader(shader.as_deref());
        let shade = |x: u32, y: u32| integrator.trace_pixel(&camera, x, y, w, h, frame);

        match backend {
            Backend::Cpu => accum.accumulate_par(shade),
            Backend::CpuSerial => accum.accumulate(shade),
        }
        display.mark_dirty();
    }
}

impl<A: Accelerator> PathTracer for CpuPathTracer<A> {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn render(&mut self) -> Result<FrameStatus> {
        self.prepare_frame()?;

        let spp = self.settings.samples_per_pixel();
        if self.accum.frame_count() >= spp {
            return Ok(FrameStatus::Converged { frame_count: self.accum.frame_count() });
        }

        if self.settings.progressive() {
            self.render_pass();
        } else {
            let _span = tracing::info_span!("final_render", spp).entered();
            while self.accum.frame_count() < spp {
                self.render_pass();
            }
        }

        let frame_count = self.accum.frame_count();
        if frame_count == spp {
            tracing::debug!(frame_count, "sample budget reached");
        }
        Ok(FrameStatus::Rendered { frame_count })
    }

    fn display(&mut self) -> &DisplayBuffer {
        self.apply_changes();
        self.display.update(&self.accum, &self.settings);
        &self.display
    }

    fn accumulation(&mut self) -> &AccumulationBuffer {
        self.apply_changes();
        &self.accum
    }

    fn sync(&mut self) {
        self.apply_changes();
    }

    fn frame_count(&self) -> u32 {
        if self.has_pending_changes() {
            0
        } else {
            self.accum.frame_count()
        }
    }

    fn set_scene(&mut self, scene: Scene) {
        self.scene = scene;
        self.scene.mark_changed();
    }

    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    fn set_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
        self.settings.mark_dirty();
    }

    fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    fn set_shader(&mut self, shader: Option<Arc<dyn Shader>>) {
        self.shader = shader;
        self.invalidate();
    }

    fn reset(&mut self) {
        self.invalidate();
    }
}
