//! Diffuse materials and the per-scene material library.
//!
//! Materials are plain albedo colors addressed by [`MaterialId`]. The library
//! deduplicates identical descriptors so repeated `get_or_create` calls with the
//! same color hand back the same id.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::Vec3;

/// Albedo every new scene starts with in slot 0.
pub const DEFAULT_ALBEDO: f32 = 0.8;

/// Index of a material in a [`MaterialLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(u32);

impl MaterialId {
    /// The material every scene is created with.
    pub const DEFAULT: Self = Self(0);

    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "material#{}", self.0)
    }
}

/// Diffuse material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Linear RGB reflectance.
    pub albedo: Vec3,
}

impl Material {
    pub const fn new(albedo: Vec3) -> Self {
        Self { albedo }
    }

    /// Gray material with the same reflectance in every channel.
    pub const fn gray(value: f32) -> Self {
        Self { albedo: Vec3::splat(value) }
    }

    /// Bit pattern used as dedup key; `-0.0` and `0.0` are distinct, NaNs compare by payload.
    fn key(&self) -> [u32; 3] {
        self.albedo.to_array().map(f32::to_bits)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::gray(DEFAULT_ALBEDO)
    }
}

/// Owns all materials of a scene.
#[derive(Debug, Clone)]
pub struct MaterialLibrary {
    materials: Vec<Material>,
    by_key: HashMap<[u32; 3], MaterialId>,
    named: BTreeMap<String, MaterialId>,
}

impl Default for MaterialLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialLibrary {
    /// Library containing only the default material.
    pub fn new() -> Self {
        let mut lib = Self {
            materials: Vec::new(),
            by_key: HashMap::new(),
            named: BTreeMap::new(),
        };
        lib.get_or_create(Material::default());
        lib
    }

    /// Return the id of an identical material, adding it if missing.
    pub fn get_or_create(&mut self, material: Material) -> MaterialId {
        let key = material.key();
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(material);
        self.by_key.insert(key, id);
        id
    }

    /// Register `material` under `name`, replacing any previous binding of the name.
    pub fn register_named(&mut self, name: impl Into<String>, material: Material) -> MaterialId {
        let id = self.get_or_create(material);
        self.named.insert(name.into(), id);
        id
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    pub fn contains(&self, id: MaterialId) -> bool {
        (id.0 as usize) < self.materials.len()
    }

    pub fn named(&self, name: &str) -> Option<MaterialId> {
        self.named.get(name).copied()
    }

    pub fn has_named(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Drop the name binding. The material itself stays addressable by id.
    pub fn remove_named(&mut self, name: &str) -> Option<MaterialId> {
        self.named.remove(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.named.keys().map(String::as_str).collect()
    }

    /// Number of materials, including the default.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Never true; the default material is always present.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Remove everything but the default material.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId(i as u32), m))
    }
}
