//! Scene description: spheres, materials, hierarchy and sky.
//!
//! Spheres live in an arena indexed by [`SphereId`]. Removing a sphere leaves
//! an empty slot behind so other ids stay valid. Every change that affects
//! rendering sets `has_changes`; the tracer clears it after rebuilding its
//! acceleration structure.
//!
//! ```
//! use lumina::scene::{Material, Scene};
//! use lumina::Vec3;
//!
//! let mut scene = Scene::new();
//! let red = scene.materials_mut().get_or_create(Material::new(Vec3::new(0.9, 0.1, 0.1)));
//! let ball = scene.add_sphere(Vec3::ZERO, 1.0, red).unwrap();
//! assert_eq!(scene.sphere(ball).unwrap().radius, 1.0);
//! ```

mod environment;
mod material;
mod sphere;

pub use environment::{EnvironmentMap, GradientSky, Sky};
pub use material::{DEFAULT_ALBEDO, Material, MaterialId, MaterialLibrary};
pub use sphere::{Sphere, SphereId};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::util::{Error, Result, Vec3};

/// Mutable scene graph consumed by the path tracer.
#[derive(Debug, Clone)]
pub struct Scene {
    spheres: Vec<Option<Sphere>>,
    live: usize,
    materials: MaterialLibrary,
    environment: Option<Arc<EnvironmentMap>>,
    debug_normals: bool,
    parents: BTreeMap<SphereId, SphereId>,
    has_changes: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene. New scenes report changes so the first frame builds geometry.
    pub fn new() -> Self {
        Self {
            spheres: Vec::new(),
            live: 0,
            materials: MaterialLibrary::new(),
            environment: None,
            debug_normals: false,
            parents: BTreeMap::new(),
            has_changes: true,
        }
    }

    // ---- spheres ----

    /// Add a sphere and return its id.
    pub fn add_sphere(&mut self, center: Vec3, radius: f32, material: MaterialId) -> Result<SphereId> {
        let sphere = Sphere::new(center, radius, material);
        sphere.validate()?;
        self.check_material(material)?;

        let id = SphereId::new(self.spheres.len() as u32);
        self.spheres.push(Some(sphere));
        self.live += 1;
        self.has_changes = true;
        tracing::debug!(%id, ?center, radius, "added sphere");
        Ok(id)
    }

    /// Replace center, radius and material of an existing sphere.
    pub fn update_sphere(&mut self, id: SphereId, center: Vec3, radius: f32, material: MaterialId) -> Result<()> {
        let sphere = Sphere::new(center, radius, material);
        sphere.validate()?;
        self.check_material(material)?;

        let slot = self.slot_mut(id)?;
        *slot = sphere;
        self.has_changes = true;
        Ok(())
    }

    /// Remove a sphere. Its children are orphaned; the id is never handed out again.
    pub fn remove_sphere(&mut self, id: SphereId) -> Result<Sphere> {
        let removed = self
            .spheres
            .get_mut(id.index() as usize)
            .and_then(Option::take)
            .ok_or(Error::SphereNotFound(id))?;
        self.live -= 1;
        self.parents.remove(&id);
        self.parents.retain(|_, parent| *parent != id);
        self.has_changes = true;
        tracing::debug!(%id, "removed sphere");
        Ok(removed)
    }

    pub fn sphere(&self, id: SphereId) -> Option<&Sphere> {
        self.spheres.get(id.index() as usize).and_then(Option::as_ref)
    }

    pub fn contains(&self, id: SphereId) -> bool {
        self.sphere(id).is_some()
    }

    /// Live spheres in id order.
    pub fn spheres(&self) -> impl Iterator<Item = (SphereId, &Sphere)> {
        self.spheres
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (SphereId::new(i as u32), s)))
    }

    /// Number of live spheres.
    pub fn sphere_count(&self) -> usize {
        self.live
    }

    /// Remove every sphere and all hierarchy links. Materials are kept.
    pub fn clear(&mut self) {
        // Keep the slots so ids stay unique for the lifetime of the scene
        self.spheres.iter_mut().for_each(|s| *s = None);
        self.live = 0;
        self.parents.clear();
        self.has_changes = true;
    }

    fn slot_mut(&mut self, id: SphereId) -> Result<&mut Sphere> {
        self.spheres
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
            .ok_or(Error::SphereNotFound(id))
    }

    fn check_material(&self, material: MaterialId) -> Result<()> {
        if self.materials.contains(material) {
            Ok(())
        } else {
            Err(Error::MaterialNotFound(material))
        }
    }

    // ---- materials ----

    pub fn materials(&self) -> &MaterialLibrary {
        &self.materials
    }

    /// Mutable library access. Marks the scene changed since `clear` can
    /// orphan material ids still held by spheres.
    pub fn materials_mut(&mut self) -> &mut MaterialLibrary {
        self.has_changes = true;
        &mut self.materials
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    // ---- hierarchy ----

    /// Make `parent` the parent of `child`.
    pub fn set_parent(&mut self, child: SphereId, parent: SphereId) -> Result<()> {
        for id in [child, parent] {
            if !self.contains(id) {
                return Err(Error::SphereNotFound(id));
            }
        }
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(Error::HierarchyCycle { child, parent });
            }
            cursor = self.parents.get(&node).copied();
        }
        self.parents.insert(child, parent);
        Ok(())
    }

    /// Detach `child` from its parent. Returns the former parent.
    pub fn clear_parent(&mut self, child: SphereId) -> Result<Option<SphereId>> {
        if !self.contains(child) {
            return Err(Error::SphereNotFound(child));
        }
        Ok(self.parents.remove(&child))
    }

    pub fn parent(&self, id: SphereId) -> Option<SphereId> {
        self.parents.get(&id).copied()
    }

    /// Direct children of `id`, in id order.
    pub fn children(&self, id: SphereId) -> Vec<SphereId> {
        self.parents
            .iter()
            .filter(|(_, p)| **p == id)
            .map(|(c, _)| *c)
            .collect()
    }

    // ---- environment / debug ----

    pub fn environment(&self) -> Option<&Arc<EnvironmentMap>> {
        self.environment.as_ref()
    }

    /// Attach or detach the environment map. `None` falls back to the gradient sky.
    pub fn set_environment(&mut self, env: Option<Arc<EnvironmentMap>>) {
        self.environment = env;
        self.has_changes = true;
    }

    pub fn debug_normals(&self) -> bool {
        self.debug_normals
    }

    pub fn set_debug_normals(&mut self, enabled: bool) {
        if self.debug_normals != enabled {
            self.debug_normals = enabled;
            self.has_changes = true;
        }
    }

    // ---- change tracking ----

    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    /// Force the next frame to rebuild and restart accumulation.
    pub fn mark_changed(&mut self) {
        self.has_changes = true;
    }

    pub(crate) fn mark_changes_processed(&mut self) {
        self.has_changes = false;
    }
}
