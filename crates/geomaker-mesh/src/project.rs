//! Shrink-wrap projection onto a target surface
//!
//! The target is triangulated in world space into a parry `TriMesh`, whose
//! BVH answers the closest-point queries.

use geomaker_core::Mesh;
use glam::{Mat4, Vec3};
use parry3d::math::Point;
use parry3d::query::PointQuery;
use parry3d::shape::FeatureId;
use parry3d::shape::TriMesh;

use crate::{MeshOpError, MeshOpResult, ProjectionMode, SurfaceTarget};

/// World-space target with one unit normal per triangle
struct Surface {
    shape: TriMesh,
    normals: Vec<Vec3>,
}

fn to_point(v: Vec3) -> Point<f32> {
    Point::new(v.x, v.y, v.z)
}

impl Surface {
    fn build(target: &SurfaceTarget<'_>) -> MeshOpResult<Self> {
        let world = target.mesh.transformed_positions(target.to_world);
        let mut indices: Vec<[u32; 3]> = Vec::with_capacity(target.mesh.triangle_count());
        let mut normals = Vec::with_capacity(indices.capacity());

        for face in &target.mesh.faces {
            let first = face.vertices[0];
            for pair in face.vertices[1..].windows(2) {
                let [a, b, c] = [first, pair[0], pair[1]].map(|v| world[v as usize]);
                let normal = (b - a).cross(c - a);
                if normal.length_squared() > f32::EPSILON * f32::EPSILON {
                    indices.push([first, pair[0], pair[1]]);
                    normals.push(normal.normalize());
                }
            }
        }
        if indices.is_empty() {
            return Err(MeshOpError::EmptyTarget);
        }

        let vertices = world.into_iter().map(to_point).collect();
        let shape = TriMesh::new(vertices, indices).map_err(|e| MeshOpError::InvalidParameter {
            op: "project_onto_surface",
            reason: format!("{e:?}"),
        })?;
        Ok(Self { shape, normals })
    }

    /// Closest surface point to `world` and the normal of the triangle it lies on
    fn closest(&self, world: Vec3) -> (Vec3, Vec3) {
        let (projection, feature) = self.shape.project_local_point_and_get_feature(&to_point(world));
        let hit = Vec3::new(projection.point.x, projection.point.y, projection.point.z);
        let normal = match feature {
            FeatureId::Face(triangle) => self.normals.get(triangle as usize).copied(),
            _ => None,
        }
        .unwrap_or_else(|| (world - hit).normalize_or_zero());
        (hit, normal)
    }
}

/// Move every vertex onto the closest point of `target`, offset along the hit normal
pub(crate) fn shrinkwrap(
    mesh: &mut Mesh,
    mesh_to_world: Mat4,
    target: SurfaceTarget<'_>,
    offset: f32,
    mode: ProjectionMode,
) -> MeshOpResult<()> {
    let surface = Surface::build(&target)?;
    let world_to_mesh = mesh_to_world.inverse();
    if mesh_to_world.determinant() == 0.0 || !world_to_mesh.is_finite() {
        return Err(MeshOpError::DegenerateTransform);
    }

    for position in &mut mesh.positions {
        let world = mesh_to_world.transform_point3(*position);
        let (hit, normal) = surface.closest(world);

        let direction = match mode {
            ProjectionMode::OutsideSurface => normal,
            ProjectionMode::OnSurface => {
                if (world - hit).dot(normal) < 0.0 {
                    -normal
                } else {
                    normal
                }
            }
        };
        *position = world_to_mesh.transform_point3(hit + direction * offset);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomaker_core::math::approx_eq;

    fn identity_target(mesh: &Mesh) -> SurfaceTarget<'_> {
        SurfaceTarget {
            mesh,
            to_world: Mat4::IDENTITY,
        }
    }

    #[test]
    fn test_outside_offset_on_cube() {
        let cube = Mesh::unit_cube();
        let mut points = Mesh::from_polygons(
            vec![Vec3::new(0.1, 0.2, 2.0), Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, -0.05, 0.1)],
            &[[0u32, 1, 2]],
        );

        shrinkwrap(
            &mut points,
            Mat4::IDENTITY,
            identity_target(&cube),
            0.02,
            ProjectionMode::OutsideSurface,
        )
        .unwrap();

        assert!(approx_eq(points.positions[0], Vec3::new(0.1, 0.2, 0.52), 1e-5));
        assert!(approx_eq(points.positions[1], Vec3::new(0.52, 0.0, 0.0), 1e-5));
        // Inside point: nearest face is +Z at distance 0.4, pushed outward
        assert!(approx_eq(points.positions[2], Vec3::new(0.0, -0.05, 0.52), 1e-5));
    }

    #[test]
    fn test_on_surface_keeps_side() {
        let cube = Mesh::unit_cube();
        let mut points = Mesh::from_polygons(
            vec![Vec3::new(0.0, 0.0, 0.4), Vec3::X * 2.0, Vec3::Y * 2.0],
            &[[0u32, 1, 2]],
        );
        shrinkwrap(
            &mut points,
            Mat4::IDENTITY,
            identity_target(&cube),
            0.05,
            ProjectionMode::OnSurface,
        )
        .unwrap();
        assert!(approx_eq(points.positions[0], Vec3::new(0.0, 0.0, 0.45), 1e-5));
        assert!(approx_eq(points.positions[1], Vec3::new(0.55, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_respects_transforms() {
        let cube = Mesh::unit_cube();
        let target = SurfaceTarget {
            mesh: &cube,
            to_world: Mat4::from_scale(Vec3::splat(2.0)),
        };
        let mut points = Mesh::from_polygons(
            vec![Vec3::new(0.0, 0.0, 5.0), Vec3::X, Vec3::Y],
            &[[0u32, 1, 2]],
        );
        let to_world = Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0));
        shrinkwrap(&mut points, to_world, target, 0.0, ProjectionMode::OutsideSurface).unwrap();
        // World z = 1.0 on the scaled cube, local z = 0.0
        assert!(approx_eq(points.positions[0], Vec3::ZERO, 1e-5));
    }

    #[test]
    fn test_flat_target_uses_face_normal() {
        // Quad in the z = 0 plane facing +z
        let plate = Mesh::from_polygons(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            &[[0u32, 1, 2, 3]],
        );
        let mut points = Mesh::from_polygons(
            vec![Vec3::new(0.2, 0.3, 0.5), Vec3::new(-0.4, 0.1, -0.5), Vec3::new(3.0, 0.0, 0.0)],
            &[[0u32, 1, 2]],
        );
        shrinkwrap(
            &mut points,
            Mat4::IDENTITY,
            identity_target(&plate),
            0.02,
            ProjectionMode::OutsideSurface,
        )
        .unwrap();

        assert!(approx_eq(points.positions[0], Vec3::new(0.2, 0.3, 0.02), 1e-5));
        assert!(approx_eq(points.positions[1], Vec3::new(-0.4, 0.1, 0.02), 1e-5));
        assert!(approx_eq(points.positions[2], Vec3::new(1.0, 0.0, 0.02), 1e-5));
    }

    #[test]
    fn test_empty_target_rejected() {
        let empty = Mesh::new();
        let mut points = Mesh::unit_cube();
        let result = shrinkwrap(
            &mut points,
            Mat4::IDENTITY,
            identity_target(&empty),
            0.0,
            ProjectionMode::OutsideSurface,
        );
        assert!(matches!(result, Err(MeshOpError::EmptyTarget)));
    }

    #[test]
    fn test_degenerate_transform_rejected() {
        let cube = Mesh::unit_cube();
        let mut points = Mesh::unit_cube();
        let result = shrinkwrap(
            &mut points,
            Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0)),
            identity_target(&cube),
            0.0,
            ProjectionMode::OutsideSurface,
        );
        assert!(matches!(result, Err(MeshOpError::DegenerateTransform)));
    }
}
