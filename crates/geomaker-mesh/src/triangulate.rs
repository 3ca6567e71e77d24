//! Polygon triangulation
//!
//! Quads are split along one of their two diagonals and larger polygons
//! are ear-clipped. The beauty policies pick, at every step, the split
//! whose worst triangle has the largest minimum angle.

use geomaker_core::{Face, Mesh};
use glam::Vec3;
use smallvec::SmallVec;

use crate::{NgonPolicy, QuadPolicy};

/// Replace every polygon with triangles in place
pub(crate) fn triangulate(mesh: &mut Mesh, quad_policy: QuadPolicy, ngon_policy: NgonPolicy) {
    let faces = std::mem::take(&mut mesh.faces);
    let mut triangles = Vec::with_capacity(faces.iter().map(|f| f.len() - 2).sum());

    for face in faces {
        match face.len() {
            3 => triangles.push(face),
            4 => {
                for corners in split_quad(&mesh.positions, &face.vertices, quad_policy) {
                    triangles.push(Face::new(corners).with_material(face.material));
                }
            }
            _ => {
                for corners in split_ngon(&mesh.positions, &face.vertices, ngon_policy) {
                    triangles.push(Face::new(corners).with_material(face.material));
                }
            }
        }
    }

    mesh.faces = triangles;
}

/// Smallest interior angle of a triangle in radians
pub(crate) fn min_angle(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    let angle = |p: Vec3, q: Vec3, r: Vec3| {
        let u = (q - p).normalize_or_zero();
        let v = (r - p).normalize_or_zero();
        u.dot(v).clamp(-1.0, 1.0).acos()
    };
    angle(a, b, c).min(angle(b, c, a)).min(angle(c, a, b))
}

fn split_quad(positions: &[Vec3], quad: &[u32], policy: QuadPolicy) -> [[u32; 3]; 2] {
    let [v0, v1, v2, v3] = [quad[0], quad[1], quad[2], quad[3]];
    let along_02 = [[v0, v1, v2], [v0, v2, v3]];
    let along_13 = [[v1, v2, v3], [v1, v3, v0]];

    match policy {
        QuadPolicy::Fixed => along_02,
        QuadPolicy::Beauty => {
            let quality = |tris: &[[u32; 3]; 2]| {
                tris.iter()
                    .map(|t| {
                        min_angle(
                            positions[t[0] as usize],
                            positions[t[1] as usize],
                            positions[t[2] as usize],
                        )
                    })
                    .fold(f32::INFINITY, f32::min)
            };
            if quality(&along_13) > quality(&along_02) + 1e-6 {
                along_13
            } else {
                along_02
            }
        }
    }
}

fn split_ngon(positions: &[Vec3], polygon: &[u32], policy: NgonPolicy) -> Vec<[u32; 3]> {
    match policy {
        NgonPolicy::Fan => fan(polygon),
        NgonPolicy::Beauty => ear_clip(positions, polygon),
    }
}

fn fan(polygon: &[u32]) -> Vec<[u32; 3]> {
    (1..polygon.len() - 1)
        .map(|i| [polygon[0], polygon[i], polygon[i + 1]])
        .collect()
}

fn ear_clip(positions: &[Vec3], polygon: &[u32]) -> Vec<[u32; 3]> {
    let position = |v: u32| positions[v as usize];

    let mut normal = Vec3::ZERO;
    for i in 0..polygon.len() {
        let current = position(polygon[i]);
        let next = position(polygon[(i + 1) % polygon.len()]);
        normal += current.cross(next);
    }
    let normal = normal.normalize_or_zero();

    let mut remaining: SmallVec<[u32; 8]> = polygon.iter().copied().collect();
    let mut triangles = Vec::with_capacity(polygon.len() - 2);

    while remaining.len() > 3 {
        let n = remaining.len();
        let mut best: Option<(usize, f32)> = None;

        for i in 0..n {
            let prev = remaining[(i + n - 1) % n];
            let cur = remaining[i];
            let next = remaining[(i + 1) % n];
            let (a, b, c) = (position(prev), position(cur), position(next));

            let convex = (b - a).cross(c - b).dot(normal) > 0.0;
            if !convex {
                continue;
            }
            let blocked = remaining.iter().any(|&other| {
                other != prev
                    && other != cur
                    && other != next
                    && point_in_triangle(position(other), a, b, c, normal)
            });
            if blocked {
                continue;
            }

            let quality = min_angle(a, b, c);
            if best.is_none_or(|(_, q)| quality > q) {
                best = Some((i, quality));
            }
        }

        // Degenerate outline, finish with a fan
        let Some((ear, _)) = best else {
            triangles.extend(fan(&remaining));
            return triangles;
        };

        let n = remaining.len();
        triangles.push([remaining[(ear + n - 1) % n], remaining[ear], remaining[(ear + 1) % n]]);
        remaining.remove(ear);
    }

    triangles.push([remaining[0], remaining[1], remaining[2]]);
    triangles
}

fn point_in_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3, normal: Vec3) -> bool {
    let side = |from: Vec3, to: Vec3| (to - from).cross(p - from).dot(normal);
    side(a, b) >= 0.0 && side(b, c) >= 0.0 && side(c, a) >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_to_triangles() {
        let mut cube = Mesh::unit_cube();
        triangulate(&mut cube, QuadPolicy::Beauty, NgonPolicy::Beauty);
        assert_eq!(cube.face_count(), 12);
        assert!(cube.is_triangulated());
        assert!(cube.validate().is_ok());
    }

    #[test]
    fn test_beauty_picks_short_diagonal() {
        // Rhombus: long diagonal 0-2, short diagonal 1-3
        let positions = vec![
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 0.5, 0.0),
        ];
        let mut mesh = Mesh::from_polygons(positions, &[[0u32, 1, 2, 3]]);
        triangulate(&mut mesh, QuadPolicy::Beauty, NgonPolicy::Beauty);
        for face in &mesh.faces {
            assert!(face.vertices.contains(&1) && face.vertices.contains(&3));
        }

        let mut fixed = Mesh::from_polygons(mesh.positions.clone(), &[[0u32, 1, 2, 3]]);
        triangulate(&mut fixed, QuadPolicy::Fixed, NgonPolicy::Fan);
        for face in &fixed.faces {
            assert!(face.vertices.contains(&0) && face.vertices.contains(&2));
        }
    }

    #[test]
    fn test_hexagon_ear_clipping() {
        let positions: Vec<Vec3> = (0..6)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 6.0;
                Vec3::new(angle.cos(), angle.sin(), 0.0)
            })
            .collect();
        let mut mesh = Mesh::from_polygons(positions, &[[0u32, 1, 2, 3, 4, 5]]);
        triangulate(&mut mesh, QuadPolicy::Beauty, NgonPolicy::Beauty);
        assert_eq!(mesh.face_count(), 4);
        for face in &mesh.faces {
            assert!(mesh.face_normal(face).z > 0.99);
        }
    }

    #[test]
    fn test_concave_polygon() {
        // L-shape, the reflex corner at vertex 3 must not produce an outside triangle
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ];
        let mut mesh = Mesh::from_polygons(positions, &[[0u32, 1, 2, 3, 4, 5]]);
        triangulate(&mut mesh, QuadPolicy::Beauty, NgonPolicy::Beauty);
        assert_eq!(mesh.face_count(), 4);
        let area: f32 = mesh.faces.iter().map(|f| mesh.face_normal_area(f).z * 0.5).sum();
        assert!((area - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_materials_kept() {
        let mut cube = Mesh::unit_cube();
        cube.faces[2].material = 1;
        triangulate(&mut cube, QuadPolicy::Beauty, NgonPolicy::Beauty);
        assert_eq!(cube.faces.iter().filter(|f| f.material == 1).count(), 2);
    }
}
