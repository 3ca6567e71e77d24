//! Edge-collapse decimation
//!
//! Greedy shortest-edge-first collapse on a triangulated copy of the
//! mesh. Each collapse merges the edge endpoints at the edge midpoint
//! (or onto the outline for edges touching an open boundary) and is
//! rejected when it would break the manifold (link condition), pinch
//! two boundaries together or flip a neighbouring triangle.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use geomaker_core::{Face, Mesh};
use glam::Vec3;
use smallvec::SmallVec;

use crate::triangulate::triangulate;
use crate::{NgonPolicy, QuadPolicy};

/// Collapse edges until at most `ratio` of the input face count remains
///
/// The face count never grows: if the triangulated result cannot get
/// below the input polygon count the mesh is left untouched.
pub(crate) fn collapse(mesh: &mut Mesh, ratio: f32) {
    let source_faces = mesh.face_count();
    let target = (source_faces as f32 * ratio).floor() as usize;
    if target >= source_faces {
        return;
    }

    let mut work = mesh.clone();
    triangulate(&mut work, QuadPolicy::Beauty, NgonPolicy::Beauty);

    let mut state = CollapseState::new(&work);
    state.run(target);
    let (faces, remap, positions) = state.finish();
    work.faces = faces;
    work.remap_vertices(&remap, positions);

    if work.face_count() > source_faces {
        log::debug!(
            "Collapse left {} triangles for {} polygons, keeping input",
            work.face_count(),
            source_faces
        );
        return;
    }
    *mesh = work;
}

/// Heap entry: squared length bits (monotonic for non-negative floats), endpoints
type EdgeEntry = Reverse<(u32, u32, u32)>;

struct CollapseState {
    positions: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    materials: Vec<u32>,
    triangle_alive: Vec<bool>,
    vertex_alive: Vec<bool>,
    vertex_triangles: Vec<Vec<usize>>,
    merged_into: Vec<u32>,
    alive_count: usize,
    heap: BinaryHeap<EdgeEntry>,
}

impl CollapseState {
    fn new(mesh: &Mesh) -> Self {
        let vertex_count = mesh.vertex_count();
        let triangles: Vec<[u32; 3]> = mesh
            .faces
            .iter()
            .map(|f| [f.vertices[0], f.vertices[1], f.vertices[2]])
            .collect();
        let materials = mesh.faces.iter().map(|f| f.material).collect();

        let mut vertex_triangles = vec![Vec::new(); vertex_count];
        for (t, tri) in triangles.iter().enumerate() {
            for &v in tri {
                vertex_triangles[v as usize].push(t);
            }
        }

        let mut state = Self {
            positions: mesh.positions.clone(),
            triangle_alive: vec![true; triangles.len()],
            alive_count: triangles.len(),
            triangles,
            materials,
            vertex_alive: vec![true; vertex_count],
            vertex_triangles,
            merged_into: (0..vertex_count as u32).collect(),
            heap: BinaryHeap::new(),
        };

        let mut seen = AHashSet::new();
        for t in 0..state.triangles.len() {
            let tri = state.triangles[t];
            for i in 0..3 {
                let (a, b) = (tri[i], tri[(i + 1) % 3]);
                if seen.insert((a.min(b), a.max(b))) {
                    state.push_edge(a, b);
                }
            }
        }
        state
    }

    fn edge_bits(&self, a: u32, b: u32) -> u32 {
        (self.positions[a as usize] - self.positions[b as usize])
            .length_squared()
            .to_bits()
    }

    fn push_edge(&mut self, a: u32, b: u32) {
        let (a, b) = (a.min(b), a.max(b));
        self.heap.push(Reverse((self.edge_bits(a, b), a, b)));
    }

    fn alive_triangles(&self, v: u32) -> impl Iterator<Item = usize> + '_ {
        self.vertex_triangles[v as usize]
            .iter()
            .copied()
            .filter(|&t| self.triangle_alive[t])
    }

    fn shared_triangles(&self, a: u32, b: u32) -> SmallVec<[usize; 2]> {
        self.alive_triangles(a)
            .filter(|&t| self.triangles[t].contains(&b))
            .collect()
    }

    fn neighbors(&self, v: u32) -> AHashSet<u32> {
        self.alive_triangles(v)
            .flat_map(|t| self.triangles[t])
            .filter(|&other| other != v)
            .collect()
    }

    fn is_boundary(&self, v: u32) -> bool {
        let mut edge_use: AHashMap<u32, u32> = AHashMap::new();
        for t in self.alive_triangles(v) {
            for &other in &self.triangles[t] {
                if other != v {
                    *edge_use.entry(other).or_default() += 1;
                }
            }
        }
        edge_use.values().any(|&count| count == 1)
    }

    fn run(&mut self, target: usize) {
        while self.alive_count > target {
            let Some(Reverse((bits, a, b))) = self.heap.pop() else {
                break;
            };
            if !self.vertex_alive[a as usize] || !self.vertex_alive[b as usize] {
                continue;
            }
            let shared = self.shared_triangles(a, b);
            if shared.is_empty() {
                continue;
            }
            let current = self.edge_bits(a, b);
            if current != bits {
                self.heap.push(Reverse((current, a, b)));
                continue;
            }

            let target_position = self.placement(a, b, shared.len());
            if self.can_collapse(a, b, &shared, target_position) {
                self.apply_collapse(a, b, &shared, target_position);
            }
        }
    }

    /// Midpoint, or the boundary endpoint when an interior edge touches the outline
    fn placement(&self, a: u32, b: u32, shared: usize) -> Vec3 {
        let (pa, pb) = (self.positions[a as usize], self.positions[b as usize]);
        if shared == 2 {
            match (self.is_boundary(a), self.is_boundary(b)) {
                (true, false) => return pa,
                (false, true) => return pb,
                _ => {}
            }
        }
        (pa + pb) * 0.5
    }

    fn can_collapse(&self, a: u32, b: u32, shared: &[usize], target: Vec3) -> bool {
        if shared.len() > 2 || self.alive_count <= shared.len() + 2 {
            return false;
        }

        let neighbors_a = self.neighbors(a);
        let common = self
            .neighbors(b)
            .into_iter()
            .filter(|v| neighbors_a.contains(v))
            .count();
        if common != shared.len() {
            return false;
        }

        if shared.len() == 2 && self.is_boundary(a) && self.is_boundary(b) {
            return false;
        }

        for v in [a, b] {
            for t in self.alive_triangles(v) {
                if shared.contains(&t) {
                    continue;
                }
                let corners = self.triangles[t].map(|c| self.positions[c as usize]);
                let moved = self.triangles[t].map(|c| {
                    if c == a || c == b {
                        target
                    } else {
                        self.positions[c as usize]
                    }
                });
                let before = (corners[1] - corners[0]).cross(corners[2] - corners[0]);
                let after = (moved[1] - moved[0]).cross(moved[2] - moved[0]);
                if after.length_squared() <= before.length_squared() * 1e-12
                    || before.dot(after) <= 0.0
                {
                    return false;
                }
            }
        }
        true
    }

    fn apply_collapse(&mut self, a: u32, b: u32, shared: &[usize], target: Vec3) {
        self.positions[a as usize] = target;
        for &t in shared {
            self.triangle_alive[t] = false;
            self.alive_count -= 1;
        }

        let moved = std::mem::take(&mut self.vertex_triangles[b as usize]);
        for t in moved {
            if !self.triangle_alive[t] {
                continue;
            }
            for corner in &mut self.triangles[t] {
                if *corner == b {
                    *corner = a;
                }
            }
            self.vertex_triangles[a as usize].push(t);
        }
        self.vertex_alive[b as usize] = false;
        self.merged_into[b as usize] = a;

        let alive = &self.triangle_alive;
        self.vertex_triangles[a as usize].retain(|&t| alive[t]);

        for neighbor in self.neighbors(a) {
            self.push_edge(a, neighbor);
        }
    }

    fn root(&self, mut v: u32) -> u32 {
        while self.merged_into[v as usize] != v {
            v = self.merged_into[v as usize];
        }
        v
    }

    /// Surviving triangles (old indices), old-to-new remap and new positions
    fn finish(self) -> (Vec<Face>, Vec<u32>, Vec<Vec3>) {
        let mut new_index = vec![u32::MAX; self.positions.len()];
        let mut positions = Vec::new();
        for (v, alive) in self.vertex_alive.iter().enumerate() {
            if *alive {
                new_index[v] = positions.len() as u32;
                positions.push(self.positions[v]);
            }
        }

        let remap = (0..self.positions.len() as u32)
            .map(|v| new_index[self.root(v) as usize])
            .collect();

        let faces = self
            .triangles
            .iter()
            .zip(&self.materials)
            .zip(&self.triangle_alive)
            .filter(|(_, alive)| **alive)
            .map(|((tri, &material), _)| Face::new(*tri).with_material(material))
            .collect();

        (faces, remap, positions)
    }
}
