//! Uniform midpoint subdivision
//!
//! One level splits every triangle into four triangles and every other
//! polygon into one quad per corner around a face-center vertex, so a
//! closed quad mesh grows by exactly 4x per level.

use ahash::AHashMap;
use geomaker_core::{Face, Mesh};
use glam::Vec3;

/// Apply `levels` subdivision passes in place
pub(crate) fn subdivide(mesh: &mut Mesh, levels: u32) {
    for _ in 0..levels {
        subdivide_once(mesh);
    }
}

fn subdivide_once(mesh: &mut Mesh) {
    let faces = std::mem::take(&mut mesh.faces);
    let mut edge_midpoints: AHashMap<(u32, u32), u32> = AHashMap::new();
    let mut new_faces = Vec::with_capacity(faces.len() * 4);

    for face in &faces {
        let n = face.len();
        let midpoints: Vec<u32> = face
            .edges()
            .map(|(a, b)| midpoint(mesh, &mut edge_midpoints, a, b))
            .collect();

        if n == 3 {
            let [a, b, c] = [face.vertices[0], face.vertices[1], face.vertices[2]];
            let [ab, bc, ca] = [midpoints[0], midpoints[1], midpoints[2]];
            for corners in [[a, ab, ca], [ab, b, bc], [ca, bc, c], [ab, bc, ca]] {
                new_faces.push(Face::new(corners).with_material(face.material));
            }
        } else {
            let center_position = face
                .vertices
                .iter()
                .map(|&v| mesh.positions[v as usize])
                .sum::<Vec3>()
                / n as f32;
            let center = mesh.push_blended_vertex(center_position, &face.vertices);
            for i in 0..n {
                let previous = midpoints[(i + n - 1) % n];
                new_faces.push(
                    Face::new([face.vertices[i], midpoints[i], center, previous])
                        .with_material(face.material),
                );
            }
        }
    }

    mesh.faces = new_faces;
}

fn midpoint(mesh: &mut Mesh, cache: &mut AHashMap<(u32, u32), u32>, a: u32, b: u32) -> u32 {
    let key = if a < b { (a, b) } else { (b, a) };
    if let Some(&index) = cache.get(&key) {
        return index;
    }
    let position = (mesh.positions[a as usize] + mesh.positions[b as usize]) * 0.5;
    let index = mesh.push_blended_vertex(position, &[a, b]);
    cache.insert(key, index);
    index
}
