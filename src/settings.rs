//! Render settings with change tracking.
//!
//! Every setter that actually changes a value raises the dirty flag. The tracer
//! is the only consumer: it resets accumulation (or resizes) and clears the
//! flag in the same step.
//!
//! Settings persist as JSON. Missing keys fall back to defaults, and loaded
//! settings always start dirty.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::util::{Error, Result};

/// Knobs of the progressive renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    width: u32,
    height: u32,
    samples_per_pixel: u32,
    max_bounces: u32,
    russian_roulette_depth: u32,
    exposure: f32,
    auto_exposure: bool,
    target_luminance: f32,
    progressive: bool,
    camera: Camera,

    #[serde(skip, default = "dirty_on_load")]
    dirty: bool,
}

fn dirty_on_load() -> bool {
    true
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            samples_per_pixel: 64,
            max_bounces: 8,
            russian_roulette_depth: 3,
            exposure: 1.0,
            auto_exposure: false,
            target_luminance: 0.18,
            progressive: true,
            camera: Camera::default(),
            dirty: true,
        }
    }
}

/// Assign and report whether the value changed.
#[inline]
fn update<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

impl RenderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let settings = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), "loaded render settings");
        Ok(settings)
    }

    /// Write settings as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        if settings.width == 0 || settings.height == 0 {
            return Err(Error::InvalidResolution {
                width: settings.width,
                height: settings.height,
            });
        }
        settings.camera.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ---- getters ----

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn samples_per_pixel(&self) -> u32 {
        self.samples_per_pixel
    }

    pub fn max_bounces(&self) -> u32 {
        self.max_bounces
    }

    /// Bounce count after which Russian roulette may terminate paths.
    pub fn russian_roulette_depth(&self) -> u32 {
        self.russian_roulette_depth
    }

    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    pub fn auto_exposure(&self) -> bool {
        self.auto_exposure
    }

    pub fn target_luminance(&self) -> f32 {
        self.target_luminance
    }

    pub fn progressive(&self) -> bool {
        self.progressive
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ---- setters ----

    /// Set image size. Zero in either dimension is rejected.
    pub fn set_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidResolution { width, height });
        }
        let changed = update(&mut self.width, width) | update(&mut self.height, height);
        self.dirty |= changed;
        Ok(())
    }

    pub fn set_samples_per_pixel(&mut self, spp: u32) {
        self.dirty |= update(&mut self.samples_per_pixel, spp);
    }

    pub fn set_max_bounces(&mut self, bounces: u32) {
        self.dirty |= update(&mut self.max_bounces, bounces);
    }

    pub fn set_russian_roulette_depth(&mut self, depth: u32) {
        self.dirty |= update(&mut self.russian_roulette_depth, depth);
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.dirty |= update(&mut self.exposure, exposure);
    }

    /// Toggle auto exposure and set the luminance it steers towards.
    pub fn set_auto_exposure(&mut self, enabled: bool, target_luminance: f32) {
        let changed =
            update(&mut self.auto_exposure, enabled) | update(&mut self.target_luminance, target_luminance);
        self.dirty |= changed;
    }

    pub fn set_progressive(&mut self, progressive: bool) {
        self.dirty |= update(&mut self.progressive, progressive);
    }

    /// Replace the camera. Degenerate cameras are rejected.
    pub fn set_camera(&mut self, camera: Camera) -> Result<()> {
        camera.validate()?;
        self.dirty |= update(&mut self.camera, camera);
        Ok(())
    }

    /// Force the next frame to restart accumulation.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Vec3;

    fn clean() -> RenderSettings {
        let mut s = RenderSettings::default();
        s.clear_dirty();
        s
    }

    #[test]
    fn test_defaults() {
        let s = RenderSettings::default();
        assert!(s.is_dirty());
        assert_eq!(s.resolution(), (512, 512));
        assert_eq!(s.samples_per_pixel(), 64);
        assert_eq!(s.max_bounces(), 8);
        assert_eq!(s.russian_roulette_depth(), 3);
        assert_eq!(s.exposure(), 1.0);
        assert!(!s.auto_exposure());
        assert_eq!(s.target_luminance(), 0.18);
        assert!(s.progressive());
    }

    #[test]
    fn test_equal_values_stay_clean() {
        let mut s = clean();
        s.set_resolution(512, 512).unwrap();
        s.set_samples_per_pixel(64);
        s.set_max_bounces(8);
        s.set_russian_roulette_depth(3);
        s.set_exposure(1.0);
        s.set_auto_exposure(false, 0.18);
        s.set_progressive(true);
        s.set_camera(Camera::default()).unwrap();
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_each_setter_marks_dirty() {
        let setters: [fn(&mut RenderSettings); 10] = [
            |s: &mut RenderSettings| s.set_resolution(640, 512).unwrap(),
            |s: &mut RenderSettings| s.set_samples_per_pixel(1),
            |s: &mut RenderSettings| s.set_max_bounces(2),
            |s: &mut RenderSettings| s.set_russian_roulette_depth(0),
            |s: &mut RenderSettings| s.set_exposure(2.0),
            |s: &mut RenderSettings| s.set_auto_exposure(true, 0.18),
            |s: &mut RenderSettings| s.set_auto_exposure(false, 0.5),
            |s: &mut RenderSettings| s.set_progressive(false),
            |s: &mut RenderSettings| s.set_camera(Camera::look_at(Vec3::NEG_Z, Vec3::ZERO, Vec3::Y)).unwrap(),
            |s: &mut RenderSettings| s.mark_dirty(),
        ];
        for set in setters {
            let mut s = clean();
            set(&mut s);
            assert!(s.is_dirty());
        }
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let mut s = clean();
        assert!(matches!(s.set_resolution(0, 10), Err(Error::InvalidResolution { .. })));
        assert_eq!(s.resolution(), (512, 512));
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_degenerate_camera_rejected() {
        let mut s = clean();
        let bad = Camera { fov_y: 180.0, ..Camera::default() };
        assert!(matches!(s.set_camera(bad), Err(Error::InvalidCamera(_))));
        assert!(s.set_camera(Camera::look_at(Vec3::ONE, Vec3::ONE, Vec3::Y)).is_err());
        assert_eq!(s.camera(), &Camera::default());
        assert!(!s.is_dirty());

        assert!(matches!(
            RenderSettings::from_json(r#"{ "camera": { "forward": [0.0, 0.0, 0.0] } }"#),
            Err(Error::InvalidCamera(_))
        ));
        assert!(RenderSettings::from_json(r#"{ "camera": { "fov_y": 0.0 } }"#).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut s = clean();
        s.set_resolution(320, 240).unwrap();
        s.set_auto_exposure(true, 0.25);
        s.save(&path).unwrap();

        let loaded = RenderSettings::load(&path).unwrap();
        assert!(loaded.is_dirty());
        assert_eq!(loaded.resolution(), (320, 240));
        assert!(loaded.auto_exposure());
        assert_eq!(loaded.target_luminance(), 0.25);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s = RenderSettings::from_json(r#"{ "samples_per_pixel": 4 }"#).unwrap();
        assert_eq!(s.samples_per_pixel(), 4);
        assert_eq!(s.max_bounces(), 8);
        assert_eq!(s.camera(), &Camera::default());
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            RenderSettings::load("/no/such/settings.json"),
            Err(Error::FileNotFound(_))
        ));
        assert!(matches!(RenderSettings::from_json("{ nope"), Err(Error::Json(_))));
        assert!(matches!(
            RenderSettings::from_json(r#"{ "width": 0 }"#),
            Err(Error::InvalidResolution { .. })
        ));
    }
}
