//! Mesh data model
//!
//! Polygon mesh as the host editing environment exposes it:
//! - Vertex positions in model space
//! - Polygon faces with a material slot each
//! - Named vertex groups (selections)
//! - Named per-vertex float layers
//! - Material list

use glam::{Mat4, Vec3};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::math::Aabb;

/// Mesh validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("Face {face} has {count} vertices, at least 3 required")]
    DegenerateFace { face: usize, count: usize },

    #[error("Face {face} references vertex {vertex} but mesh has {vertex_count} vertices")]
    VertexOutOfRange { face: usize, vertex: u32, vertex_count: usize },

    #[error("Face {face} uses material slot {slot} but mesh has {material_count} materials")]
    MaterialOutOfRange { face: usize, slot: u32, material_count: usize },

    #[error("Vertex group '{group}' references vertex {vertex} out of range")]
    GroupOutOfRange { group: String, vertex: u32 },

    #[error("Float layer '{layer}' has {len} values for {vertex_count} vertices")]
    LayerLength { layer: String, len: usize, vertex_count: usize },
}

/// A polygon referencing mesh vertices in winding order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    /// Vertex indices, counter-clockwise seen from outside
    pub vertices: SmallVec<[u32; 4]>,
    /// Material slot
    #[serde(default)]
    pub material: u32,
}

impl Face {
    /// Create a face using material slot 0
    pub fn new(vertices: impl IntoIterator<Item = u32>) -> Self {
        Self {
            vertices: vertices.into_iter().collect(),
            material: 0,
        }
    }

    /// Triangle shorthand
    pub fn triangle(a: u32, b: u32, c: u32) -> Self {
        Self::new([a, b, c])
    }

    /// Set the material slot
    pub fn with_material(mut self, material: u32) -> Self {
        self.material = material;
        self
    }

    /// Number of corners
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Faces always have corners once validated
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Whether this face is a triangle
    pub fn is_triangle(&self) -> bool {
        self.vertices.len() == 3
    }

    /// Directed edges in winding order
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

/// Named selection of vertices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexGroup {
    /// Group name
    pub name: String,
    /// Member vertex indices, sorted and unique
    members: Vec<u32>,
}

impl VertexGroup {
    /// Create an empty group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Create a group from member indices
    pub fn with_members(name: impl Into<String>, members: impl IntoIterator<Item = u32>) -> Self {
        let mut members: Vec<u32> = members.into_iter().collect();
        members.sort_unstable();
        members.dedup();
        Self {
            name: name.into(),
            members,
        }
    }

    /// Add a vertex to the group
    pub fn add(&mut self, vertex: u32) {
        if let Err(position) = self.members.binary_search(&vertex) {
            self.members.insert(position, vertex);
        }
    }

    /// Check membership
    pub fn contains(&self, vertex: u32) -> bool {
        self.members.binary_search(&vertex).is_ok()
    }

    /// Member indices in ascending order
    pub fn members(&self) -> &[u32] {
        &self.members
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Material slot content with exporter properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    /// Material name
    pub name: String,
    /// Exporter texture path
    #[serde(default)]
    pub texture: String,
    /// Exporter material definition path
    #[serde(default)]
    pub rvmat: String,
    /// Exporter procedural color string
    #[serde(default)]
    pub color: String,
}

impl Material {
    /// Create a material with no exporter properties
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            texture: String::new(),
            rvmat: String::new(),
            color: String::new(),
        }
    }
}

/// Polygon mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Vertex positions in model space
    pub positions: Vec<Vec3>,
    /// Polygons
    pub faces: Vec<Face>,
    /// Named vertex groups
    #[serde(default)]
    pub vertex_groups: Vec<VertexGroup>,
    /// Material slots
    #[serde(default)]
    pub materials: Vec<Material>,
    /// Per-vertex float layers, one value per vertex
    #[serde(default)]
    pub float_layers: IndexMap<String, Vec<f32>>,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from positions and polygon index lists
    pub fn from_polygons<P: AsRef<[u32]>>(positions: Vec<Vec3>, polygons: &[P]) -> Self {
        Self {
            positions,
            faces: polygons.iter().map(|p| Face::new(p.as_ref().iter().copied())).collect(),
            ..Self::default()
        }
    }

    /// Axis-aligned cube with edge length 1 centered at the origin, six quads
    pub fn unit_cube() -> Self {
        let positions = vec![
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ];
        let quads: [[u32; 4]; 6] = [
            [0, 3, 2, 1], // -Z
            [4, 5, 6, 7], // +Z
            [0, 1, 5, 4], // -Y
            [2, 3, 7, 6], // +Y
            [1, 2, 6, 5], // +X
            [0, 4, 7, 3], // -X
        ];
        Self::from_polygons(positions, &quads)
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of polygons
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of triangles after fan-splitting every polygon
    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|f| f.len().saturating_sub(2)).sum()
    }

    /// Whether every face is a triangle
    pub fn is_triangulated(&self) -> bool {
        self.faces.iter().all(Face::is_triangle)
    }

    /// Whether the mesh has no geometry
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Bounds in model space
    pub fn local_bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }

    /// Positions transformed by a matrix
    pub fn transformed_positions(&self, matrix: Mat4) -> Vec<Vec3> {
        self.positions.iter().map(|p| matrix.transform_point3(*p)).collect()
    }

    /// Unnormalized polygon normal (Newell's method), length is twice the area
    pub fn face_normal_area(&self, face: &Face) -> Vec3 {
        let mut normal = Vec3::ZERO;
        for (a, b) in face.edges() {
            let current = self.positions[a as usize];
            let next = self.positions[b as usize];
            normal.x += (current.y - next.y) * (current.z + next.z);
            normal.y += (current.z - next.z) * (current.x + next.x);
            normal.z += (current.x - next.x) * (current.y + next.y);
        }
        normal
    }

    /// Unit polygon normal, zero for degenerate faces
    pub fn face_normal(&self, face: &Face) -> Vec3 {
        self.face_normal_area(face).normalize_or_zero()
    }

    /// Append a vertex, extending every float layer with `0.0`
    pub fn push_vertex(&mut self, position: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        for values in self.float_layers.values_mut() {
            values.push(0.0);
        }
        index
    }

    /// Append a vertex whose attributes blend `sources`
    ///
    /// Float layers take the mean of the sources; the new vertex joins a
    /// group only when every source vertex is a member.
    pub fn push_blended_vertex(&mut self, position: Vec3, sources: &[u32]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        for values in self.float_layers.values_mut() {
            let sum: f32 = sources.iter().map(|&s| values[s as usize]).sum();
            let mean = if sources.is_empty() { 0.0 } else { sum / sources.len() as f32 };
            values.push(mean);
        }
        for group in &mut self.vertex_groups {
            if !sources.is_empty() && sources.iter().all(|&s| group.contains(s)) {
                group.add(index);
            }
        }
        index
    }

    /// Rebuild vertex storage through an old-to-new index map
    ///
    /// `remap[old]` is the new index of every old vertex and `positions`
    /// the new vertex positions. Faces are rewritten with repeated corners
    /// removed, faces left with fewer than three corners are dropped,
    /// group membership carries over from any merged vertex and float
    /// layers are averaged over merged vertices.
    pub fn remap_vertices(&mut self, remap: &[u32], positions: Vec<Vec3>) {
        let new_count = positions.len();

        for face in &mut self.faces {
            let mut rewritten: SmallVec<[u32; 4]> = SmallVec::new();
            for &v in &face.vertices {
                let mapped = remap[v as usize];
                if rewritten.last() != Some(&mapped) {
                    rewritten.push(mapped);
                }
            }
            while rewritten.len() > 1 && rewritten.first() == rewritten.last() {
                rewritten.pop();
            }
            face.vertices = rewritten;
        }
        self.faces.retain(|f| {
            let mut unique: SmallVec<[u32; 4]> = f.vertices.clone();
            unique.sort_unstable();
            unique.dedup();
            unique.len() >= 3
        });

        for group in &mut self.vertex_groups {
            let mut members: Vec<u32> = group.members.iter().map(|&v| remap[v as usize]).collect();
            members.sort_unstable();
            members.dedup();
            group.members = members;
        }

        for values in self.float_layers.values_mut() {
            let mut sums = vec![0.0f32; new_count];
            let mut counts = vec![0u32; new_count];
            for (old, &new) in remap.iter().enumerate() {
                sums[new as usize] += values[old];
                counts[new as usize] += 1;
            }
            *values = sums
                .into_iter()
                .zip(counts)
                .map(|(sum, count)| if count == 0 { 0.0 } else { sum / count as f32 })
                .collect();
        }

        self.positions = positions;
    }

    /// Find a vertex group by name
    pub fn vertex_group(&self, name: &str) -> Option<&VertexGroup> {
        self.vertex_groups.iter().find(|g| g.name == name)
    }

    /// Whether a vertex group with this name exists
    pub fn has_vertex_group(&self, name: &str) -> bool {
        self.vertex_group(name).is_some()
    }

    /// Get a vertex group by name, creating it empty if missing
    pub fn ensure_vertex_group(&mut self, name: &str) -> &mut VertexGroup {
        let index = match self.vertex_groups.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                self.vertex_groups.push(VertexGroup::new(name));
                self.vertex_groups.len() - 1
            }
        };
        &mut self.vertex_groups[index]
    }

    /// Create or overwrite a float layer with a constant value
    pub fn set_float_layer(&mut self, name: &str, value: f32) {
        self.float_layers
            .insert(name.to_string(), vec![value; self.positions.len()]);
    }

    /// Whether every corner of the face belongs to the group
    pub fn face_in_group(&self, face: &Face, group: &VertexGroup) -> bool {
        face.vertices.iter().all(|&v| group.contains(v))
    }

    /// Check index consistency
    pub fn validate(&self) -> Result<(), MeshError> {
        let vertex_count = self.positions.len();
        for (i, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(MeshError::DegenerateFace { face: i, count: face.len() });
            }
            if let Some(&vertex) = face.vertices.iter().find(|&&v| v as usize >= vertex_count) {
                return Err(MeshError::VertexOutOfRange { face: i, vertex, vertex_count });
            }
            if !self.materials.is_empty() && face.material as usize >= self.materials.len() {
                return Err(MeshError::MaterialOutOfRange {
                    face: i,
                    slot: face.material,
                    material_count: self.materials.len(),
                });
            }
        }
        for group in &self.vertex_groups {
            if let Some(&vertex) = group.members().iter().find(|&&v| v as usize >= vertex_count) {
                return Err(MeshError::GroupOutOfRange { group: group.name.clone(), vertex });
            }
        }
        for (layer, values) in &self.float_layers {
            if values.len() != vertex_count {
                return Err(MeshError::LayerLength {
                    layer: layer.clone(),
                    len: values.len(),
                    vertex_count,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_cube() {
        let cube = Mesh::unit_cube();
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.face_count(), 6);
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.validate().is_ok());

        let bounds = cube.local_bounds();
        assert_eq!(bounds.min, Vec3::splat(-0.5));
        assert_eq!(bounds.max, Vec3::splat(0.5));
    }

    #[test]
    fn test_unit_cube_normals_point_outward() {
        let cube = Mesh::unit_cube();
        for face in &cube.faces {
            let centroid = face
                .vertices
                .iter()
                .map(|&v| cube.positions[v as usize])
                .sum::<Vec3>()
                / face.len() as f32;
            assert!(cube.face_normal(face).dot(centroid) > 0.0);
        }
    }

    #[test]
    fn test_vertex_group_sorted_unique() {
        let mut group = VertexGroup::with_members("grip", [5, 1, 3, 1]);
        assert_eq!(group.members(), &[1, 3, 5]);
        group.add(2);
        group.add(3);
        assert_eq!(group.members(), &[1, 2, 3, 5]);
        assert!(group.contains(2));
        assert!(!group.contains(4));
    }

    #[test]
    fn test_push_blended_vertex() {
        let mut mesh = Mesh::unit_cube();
        mesh.set_float_layer("FHQWeights", 1.0);
        mesh.vertex_groups.push(VertexGroup::with_members("bottom", [0, 1, 2, 3]));

        let inside = mesh.push_blended_vertex(Vec3::new(0.0, -0.5, -0.5), &[0, 1]);
        let across = mesh.push_blended_vertex(Vec3::ZERO, &[0, 6]);

        assert_eq!(mesh.float_layers["FHQWeights"][inside as usize], 1.0);
        assert!(mesh.vertex_group("bottom").unwrap().contains(inside));
        assert!(!mesh.vertex_group("bottom").unwrap().contains(across));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_remap_vertices_drops_degenerate_faces() {
        let positions = vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::new(0.0, 0.0, 0.0001),
        ];
        let mut mesh = Mesh::from_polygons(positions, &[[0u32, 1, 2], [3, 1, 2], [0, 3, 1]]);
        mesh.vertex_groups.push(VertexGroup::with_members("tip", [3]));

        // Merge vertex 3 into vertex 0
        mesh.remap_vertices(&[0, 1, 2, 0], vec![Vec3::ZERO, Vec3::X, Vec3::Y]);

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertex_group("tip").unwrap().members(), &[0]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mesh = Mesh::from_polygons(vec![Vec3::ZERO, Vec3::X, Vec3::Y], &[[0u32, 1, 7]]);
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::VertexOutOfRange { vertex: 7, .. })
        ));
    }

    #[test]
    fn test_mesh_json_shape() {
        let mesh = Mesh::from_polygons(vec![Vec3::ZERO, Vec3::X, Vec3::Y], &[[0u32, 1, 2]]);
        let json = serde_json::to_string(&mesh).unwrap();
        let back: Mesh = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mesh);
    }
}
