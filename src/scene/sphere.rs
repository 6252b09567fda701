//! Sphere primitive and its stable identity.

use std::fmt;

use crate::util::{Error, Result, Vec3};

use super::MaterialId;

/// Stable identity of a sphere within its scene.
///
/// Ids are handed out in increasing order and never reused, so a stale id
/// can only ever miss, never alias a newer sphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SphereId(u32);

impl SphereId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SphereId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sphere#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub material: MaterialId,
}

impl Sphere {
    pub const fn new(center: Vec3, radius: f32, material: MaterialId) -> Self {
        Self { center, radius, material }
    }

    /// Check geometry: finite center, finite positive radius.
    pub fn validate(&self) -> Result<()> {
        if self.center.is_finite() && self.radius.is_finite() && self.radius > 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidSphere {
                center: self.center.to_array(),
                radius: self.radius,
            })
        }
    }
}
