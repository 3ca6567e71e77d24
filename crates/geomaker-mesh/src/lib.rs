//! # Geomaker Mesh
//!
//! Mesh-processing operations the geometry generators delegate to.
//!
//! ## Operations
//! - Uniform subdivision
//! - Triangulation with beauty or fixed splitting
//! - Edge-collapse decimation
//! - Merge-by-distance welding
//! - Shrink-wrap projection onto a target surface
//!
//! Generators only see the [`MeshProcessor`] trait; [`BasicMeshProcessor`]
//! is the reference implementation.

mod decimate;
mod project;
mod subdivide;
mod triangulate;
mod weld;

use geomaker_core::{Mesh, MeshError};
use glam::Mat4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mesh operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshOpError {
    #[error("Invalid mesh: {0}")]
    InvalidMesh(#[from] MeshError),

    #[error("Invalid parameter for {op}: {reason}")]
    InvalidParameter { op: &'static str, reason: String },

    #[error("Projection target has no faces")]
    EmptyTarget,

    #[error("Object transform is not invertible")]
    DegenerateTransform,
}

/// Result type for mesh operations
pub type MeshOpResult<T> = Result<T, MeshOpError>;

/// How quads are split into triangles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuadPolicy {
    /// Split along the diagonal giving the better shaped triangles
    #[default]
    Beauty,
    /// Always split along the first-to-third corner diagonal
    Fixed,
}

/// How polygons with more than four corners are split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NgonPolicy {
    /// Ear clipping favouring well shaped triangles
    #[default]
    Beauty,
    /// Fan from the first corner
    Fan,
}

/// Decimation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecimateMode {
    /// Shortest-edge-first edge collapse
    #[default]
    Collapse,
}

/// Where projected vertices end up relative to the target surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionMode {
    /// Offset along the surface normal on the side the vertex came from
    OnSurface,
    /// Always offset outward along the surface normal
    #[default]
    OutsideSurface,
}

/// Surface to project onto, with its model-to-world matrix
#[derive(Debug, Clone, Copy)]
pub struct SurfaceTarget<'a> {
    /// Target geometry in its model space
    pub mesh: &'a Mesh,
    /// Target model-to-world matrix
    pub to_world: Mat4,
}

/// Mesh-processing collaborator used by the generators
pub trait MeshProcessor {
    /// Split every face `levels` times
    fn subdivide(&self, mesh: &mut Mesh, levels: u32) -> MeshOpResult<()>;

    /// Replace all polygons with triangles
    fn triangulate(&self, mesh: &mut Mesh, quads: QuadPolicy, ngons: NgonPolicy)
    -> MeshOpResult<()>;

    /// Reduce the face count to roughly `ratio` of the input
    fn decimate(&self, mesh: &mut Mesh, ratio: f32, mode: DecimateMode) -> MeshOpResult<()>;

    /// Weld vertices closer than `threshold`, returns the number removed
    fn merge_close_vertices(&self, mesh: &mut Mesh, threshold: f32) -> MeshOpResult<usize>;

    /// Move vertices onto the closest point of `target` plus `offset`
    fn project_onto_surface(
        &self,
        mesh: &mut Mesh,
        mesh_to_world: Mat4,
        target: SurfaceTarget<'_>,
        offset: f32,
        mode: ProjectionMode,
    ) -> MeshOpResult<()>;
}

/// Reference mesh processor
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicMeshProcessor;

impl BasicMeshProcessor {
    /// Create a new processor
    pub fn new() -> Self {
        Self
    }
}

impl MeshProcessor for BasicMeshProcessor {
    fn subdivide(&self, mesh: &mut Mesh, levels: u32) -> MeshOpResult<()> {
        mesh.validate()?;
        let before = mesh.face_count();
        subdivide::subdivide(mesh, levels);
        log::debug!("Subdivide x{}: {} -> {} faces", levels, before, mesh.face_count());
        Ok(())
    }

    fn triangulate(
        &self,
        mesh: &mut Mesh,
        quads: QuadPolicy,
        ngons: NgonPolicy,
    ) -> MeshOpResult<()> {
        mesh.validate()?;
        triangulate::triangulate(mesh, quads, ngons);
        log::debug!("Triangulate: {} triangles", mesh.face_count());
        Ok(())
    }

    fn decimate(&self, mesh: &mut Mesh, ratio: f32, mode: DecimateMode) -> MeshOpResult<()> {
        if !(ratio > 0.0 && ratio.is_finite()) {
            return Err(MeshOpError::InvalidParameter {
                op: "decimate",
                reason: format!("ratio must be in (0, 1], got {ratio}"),
            });
        }
        mesh.validate()?;
        if ratio >= 1.0 {
            return Ok(());
        }

        let before = mesh.face_count();
        match mode {
            DecimateMode::Collapse => decimate::collapse(mesh, ratio),
        }
        log::debug!("Decimate {:.2}: {} -> {} faces", ratio, before, mesh.face_count());
        Ok(())
    }

    fn merge_close_vertices(&self, mesh: &mut Mesh, threshold: f32) -> MeshOpResult<usize> {
        if threshold.is_nan() {
            return Err(MeshOpError::InvalidParameter {
                op: "merge_close_vertices",
                reason: "threshold is NaN".into(),
            });
        }
        mesh.validate()?;
        let removed = weld::merge_by_distance(mesh, threshold);
        log::debug!("Merge by distance {}: removed {} vertices", threshold, removed);
        Ok(removed)
    }

    fn project_onto_surface(
        &self,
        mesh: &mut Mesh,
        mesh_to_world: Mat4,
        target: SurfaceTarget<'_>,
        offset: f32,
        mode: ProjectionMode,
    ) -> MeshOpResult<()> {
        mesh.validate()?;
        target.mesh.validate()?;
        project::shrinkwrap(mesh, mesh_to_world, target, offset, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_geometry_pipeline() {
        let processor = BasicMeshProcessor::new();
        let target = Mesh::unit_cube();
        let mut shell = Mesh::unit_cube();

        processor.subdivide(&mut shell, 1).unwrap();
        processor
            .triangulate(&mut shell, QuadPolicy::Beauty, NgonPolicy::Beauty)
            .unwrap();
        processor
            .project_onto_surface(
                &mut shell,
                Mat4::IDENTITY,
                SurfaceTarget {
                    mesh: &target,
                    to_world: Mat4::IDENTITY,
                },
                0.02,
                ProjectionMode::OutsideSurface,
            )
            .unwrap();

        assert_eq!(shell.face_count(), 48);
        for p in &shell.positions {
            let extent = p.abs().max_element();
            assert!(extent >= 0.5 - 1e-5 && extent <= 0.52 + 1e-5);
        }
    }

    #[test]
    fn test_decimate_rejects_bad_ratio() {
        let processor = BasicMeshProcessor::new();
        let mut cube = Mesh::unit_cube();
        for ratio in [0.0, -0.5, f32::NAN] {
            assert!(matches!(
                processor.decimate(&mut cube, ratio, DecimateMode::Collapse),
                Err(MeshOpError::InvalidParameter { op: "decimate", .. })
            ));
        }
        processor.decimate(&mut cube, 1.5, DecimateMode::Collapse).unwrap();
        assert_eq!(cube, Mesh::unit_cube());
    }

    #[test]
    fn test_invalid_mesh_reported() {
        let processor = BasicMeshProcessor::new();
        let mut broken = Mesh::from_polygons(vec![glam::Vec3::ZERO], &[[0u32, 1, 2]]);
        assert!(matches!(
            processor.subdivide(&mut broken, 1),
            Err(MeshOpError::InvalidMesh(MeshError::VertexOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_merge_nan_threshold() {
        let processor = BasicMeshProcessor::new();
        let mut cube = Mesh::unit_cube();
        assert!(processor.merge_close_vertices(&mut cube, f32::NAN).is_err());
        assert_eq!(processor.merge_close_vertices(&mut cube, 0.0).unwrap(), 0);
    }
}
