//! # Geomaker Core
//!
//! Data model shared by the geomaker crates.
//!
//! This crate provides the host-side view of an asset scene:
//! - **Math**: Axis-aligned boxes and glam re-exports
//! - **Mesh**: Polygon meshes with vertex groups, materials and float layers
//! - **Scene**: Objects, transforms, collections and the interaction mode
//! - **Classification**: Exporter metadata attached to generated objects

pub mod classification;
pub mod math;
pub mod mesh;
pub mod scene;

pub use classification::Classification;
pub use math::Aabb;
pub use mesh::{Face, Material, Mesh, MeshError, VertexGroup};
pub use scene::{
    Collection, InteractionMode, ObjectData, ObjectId, Scene, SceneError, SceneObject,
    SceneResult, Transform,
};

/// Exporter vertex-normal ceiling, the hard polygon limit of a single LOD
pub const MAX_EXPORT_POLYGONS: usize = 32_768;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_scene_round_trip_through_json() {
        let mut scene = Scene::new();
        let id = scene.add_mesh_object("Box", Mesh::unit_cube(), Transform::from_position(Vec3::X));
        scene.move_object_to_collection(id, "Geometry").unwrap();

        let json = serde_json::to_string(&scene).unwrap();
        let back: Scene = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scene);
    }
}
