//! World-space bounding volume of a scene object

use geomaker_core::{Aabb, SceneObject};
use glam::Vec3;

use crate::error::{GeometryError, GeometryResult};

/// World axis-aligned box plus the radius of its corner sphere
///
/// `sphere_radius` is the distance from the center to the farthest box
/// corner, not a tight bounding sphere of the vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    pub min: Vec3,
    pub max: Vec3,
    pub center: Vec3,
    pub dimensions: Vec3,
    pub sphere_radius: f32,
}

impl BoundingVolume {
    /// Derive the volume from a world-space box
    pub fn from_aabb(aabb: Aabb) -> Self {
        let center = aabb.center();
        let sphere_radius = aabb
            .corners()
            .iter()
            .map(|corner| corner.distance(center))
            .fold(0.0f32, f32::max);
        Self {
            min: aabb.min,
            max: aabb.max,
            center,
            dimensions: aabb.size(),
            sphere_radius,
        }
    }

    /// Bounding volume of a mesh object in world space
    ///
    /// The eight corners of the model-space box are transformed and
    /// re-boxed, matching how the host reports world bounds.
    pub fn compute(object: &SceneObject) -> GeometryResult<Self> {
        let mesh = object.mesh().ok_or_else(|| {
            GeometryError::InvalidInput(format!("'{}' is not a mesh object", object.name))
        })?;
        if mesh.is_empty() {
            return Err(GeometryError::InvalidInput(format!(
                "'{}' has no vertices",
                object.name
            )));
        }

        let world = mesh.local_bounds().transform(object.transform.matrix());
        Ok(Self::from_aabb(world))
    }

    /// The box as an `Aabb`
    pub fn aabb(&self) -> Aabb {
        Aabb::new(self.min, self.max)
    }
}
