//! Merge-by-distance vertex welding

use ahash::AHashMap;
use geomaker_core::Mesh;
use glam::Vec3;

type Cell = (i64, i64, i64);

fn cell_of(p: Vec3, size: f32) -> Cell {
    let c = (p / size).floor();
    (c.x as i64, c.y as i64, c.z as i64)
}

/// Weld vertices closer than `threshold`, returning how many were removed
///
/// The first vertex of a cluster (in index order) survives and keeps its
/// position. Faces that collapse below three distinct corners are dropped.
pub(crate) fn merge_by_distance(mesh: &mut Mesh, threshold: f32) -> usize {
    if threshold <= 0.0 || mesh.positions.is_empty() {
        return 0;
    }

    let threshold2 = threshold * threshold;
    let mut grid: AHashMap<Cell, Vec<u32>> = AHashMap::new();
    let mut representative: Vec<u32> = Vec::with_capacity(mesh.positions.len());

    for (index, &p) in mesh.positions.iter().enumerate() {
        let (cx, cy, cz) = cell_of(p, threshold);
        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    if let Some(&kept) = bucket
                        .iter()
                        .find(|&&kept| mesh.positions[kept as usize].distance_squared(p) <= threshold2)
                    {
                        found = Some(kept);
                        break 'search;
                    }
                }
            }
        }

        match found {
            Some(kept) => representative.push(kept),
            None => {
                representative.push(index as u32);
                grid.entry((cx, cy, cz)).or_default().push(index as u32);
            }
        }
    }

    let mut new_index = vec![u32::MAX; mesh.positions.len()];
    let mut positions = Vec::new();
    for (index, &rep) in representative.iter().enumerate() {
        if rep == index as u32 {
            new_index[index] = positions.len() as u32;
            positions.push(mesh.positions[index]);
        }
    }
    let removed = mesh.positions.len() - positions.len();
    if removed == 0 {
        return 0;
    }

    let remap: Vec<u32> = representative.iter().map(|&rep| new_index[rep as usize]).collect();
    mesh.remap_vertices(&remap, positions);
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welds_near_duplicates() {
        // Two triangles sharing an edge through duplicated vertices
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0005, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0004, 0.0),
        ];
        let mut mesh = Mesh::from_polygons(positions, &[[0u32, 1, 2], [3, 4, 5]]);

        let removed = merge_by_distance(&mut mesh, 0.001);

        assert_eq!(removed, 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.positions[1], Vec3::new(1.0, 0.0, 0.0));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_collapsed_faces_dropped() {
        let positions = vec![
            Vec3::ZERO,
            Vec3::new(0.0001, 0.0, 0.0),
            Vec3::new(0.0, 0.0001, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(5.0, 1.0, 0.0),
        ];
        let mut mesh = Mesh::from_polygons(positions, &[[0u32, 1, 2], [0, 3, 4]]);
        merge_by_distance(&mut mesh, 0.01);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_non_positive_threshold_is_noop() {
        let mut cube = Mesh::unit_cube();
        assert_eq!(merge_by_distance(&mut cube, 0.0), 0);
        assert_eq!(merge_by_distance(&mut cube, -1.0), 0);
        assert_eq!(cube, Mesh::unit_cube());
    }

    #[test]
    fn test_neighbouring_cells_are_searched() {
        // Straddles a cell boundary at x = 0.01
        let positions = vec![
            Vec3::new(0.0099, 0.0, 0.0),
            Vec3::new(0.0101, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let mut mesh = Mesh::from_polygons(positions, &[[0u32, 2, 3], [1, 2, 3]]);
        assert_eq!(merge_by_distance(&mut mesh, 0.01), 1);
    }
}
