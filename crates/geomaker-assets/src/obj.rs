//! Wavefront OBJ import
//!
//! Reads positions and polygons. `o` starts a new object, `g` names the
//! vertex groups following faces belong to and `usemtl` picks the material
//! slot. Normals, texture coordinates and material libraries are ignored.

use std::io::BufRead;

use ahash::AHashMap;
use geomaker_core::{Face, Material, Mesh, VertexGroup};
use glam::Vec3;

use crate::{AssetError, AssetResult, ImportSettings};

/// One object read from an OBJ stream
#[derive(Debug, Clone, PartialEq)]
pub struct ObjObject {
    pub name: String,
    pub mesh: Mesh,
}

#[derive(Default)]
struct PendingObject {
    name: String,
    /// Faces with file-global vertex indices
    faces: Vec<Face>,
    materials: Vec<String>,
    material_slots: AHashMap<String, u32>,
    /// Group name -> file-global vertex indices
    groups: Vec<(String, Vec<u32>)>,
}

impl PendingObject {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn material_slot(&mut self, name: &str) -> u32 {
        if let Some(&slot) = self.material_slots.get(name) {
            return slot;
        }
        let slot = self.materials.len() as u32;
        self.materials.push(name.to_string());
        self.material_slots.insert(name.to_string(), slot);
        slot
    }

    fn group_members(&mut self, name: &str) -> &mut Vec<u32> {
        let index = match self.groups.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.groups.push((name.to_string(), Vec::new()));
                self.groups.len() - 1
            }
        };
        &mut self.groups[index].1
    }

    /// Compact to the vertices this object references
    fn finish(self, positions: &[Vec3]) -> ObjObject {
        let mut local: AHashMap<u32, u32> = AHashMap::new();
        let mut mesh = Mesh::new();

        for face in &self.faces {
            let vertices = face.vertices.iter().map(|&global| {
                *local.entry(global).or_insert_with(|| {
                    mesh.positions.push(positions[global as usize]);
                    (mesh.positions.len() - 1) as u32
                })
            });
            let face = Face::new(vertices.collect::<Vec<_>>()).with_material(face.material);
            mesh.faces.push(face);
        }

        mesh.materials = self.materials.into_iter().map(Material::new).collect();
        mesh.vertex_groups = self
            .groups
            .into_iter()
            .map(|(name, members)| {
                VertexGroup::with_members(name, members.into_iter().filter_map(|g| local.get(&g).copied()))
            })
            .collect();

        ObjObject {
            name: self.name,
            mesh,
        }
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> AssetError {
    AssetError::ImportFailed(format!("line {line}: {}", message.into()))
}

/// Resolve a 1-based or negative (relative) OBJ index
fn resolve_index(token: &str, vertex_count: usize, line: usize) -> AssetResult<u32> {
    let position = token.split('/').next().unwrap_or_default();
    let index: i64 = position
        .parse()
        .map_err(|_| parse_error(line, format!("invalid vertex index '{token}'")))?;
    let resolved = match index {
        0 => return Err(parse_error(line, "vertex index 0")),
        i if i > 0 => i - 1,
        i => vertex_count as i64 + i,
    };
    if resolved < 0 || resolved as usize >= vertex_count {
        return Err(parse_error(
            line,
            format!("vertex index {index} out of range ({vertex_count} vertices)"),
        ));
    }
    Ok(resolved as u32)
}

/// Read every object in an OBJ stream
///
/// Faces before the first `o` go into an object named `default_name`.
/// Objects without faces are dropped.
pub fn read_obj<R: BufRead>(
    reader: R,
    default_name: &str,
    settings: &ImportSettings,
) -> AssetResult<Vec<ObjObject>> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut finished: Vec<PendingObject> = Vec::new();
    let mut current = PendingObject::named(default_name.to_string());
    let mut active_groups: Vec<String> = Vec::new();
    let mut active_material: Option<u32> = None;

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = number + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword {
            "v" => {
                let coords: Vec<f32> = parts
                    .take(3)
                    .map(|p| p.parse::<f32>())
                    .collect::<Result<_, _>>()
                    .map_err(|_| parse_error(line_number, "invalid vertex coordinate"))?;
                let [x, y, z] = coords[..] else {
                    return Err(parse_error(line_number, "vertex needs three coordinates"));
                };
                positions.push(Vec3::new(x, y, z) * settings.scale);
            }
            "f" => {
                let vertices = parts
                    .map(|token| resolve_index(token, positions.len(), line_number))
                    .collect::<AssetResult<Vec<u32>>>()?;
                if vertices.len() < 3 {
                    return Err(parse_error(line_number, "face needs at least three vertices"));
                }
                for group in &active_groups {
                    current.group_members(group).extend(&vertices);
                }
                let material = active_material.unwrap_or(0);
                current.faces.push(Face::new(vertices).with_material(material));
            }
            "o" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                let next = PendingObject::named(if name.is_empty() {
                    default_name.to_string()
                } else {
                    name
                });
                finished.push(std::mem::replace(&mut current, next));
                active_groups.clear();
                active_material = None;
            }
            "g" => {
                active_groups = parts.filter(|&g| g != "default").map(String::from).collect();
            }
            "usemtl" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                active_material = Some(current.material_slot(&name));
            }
            "vn" | "vt" | "vp" | "s" | "mtllib" | "l" => {}
            other => log::debug!("Skipping OBJ keyword '{}' on line {}", other, line_number),
        }
    }
    finished.push(current);

    let objects: Vec<ObjObject> = finished
        .into_iter()
        .filter(|o| !o.faces.is_empty())
        .map(|o| o.finish(&positions))
        .collect();
    log::info!(
        "Read {} vertices into {} OBJ objects",
        positions.len(),
        objects.len()
    );
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE: &str = "\
# cube
o Crate
v -0.5 -0.5 -0.5
v 0.5 -0.5 -0.5
v 0.5 0.5 -0.5
v -0.5 0.5 -0.5
v -0.5 -0.5 0.5
v 0.5 -0.5 0.5
v 0.5 0.5 0.5
v -0.5 0.5 0.5
vn 0 0 1
g body
usemtl wood
f 1/1/1 4/2/1 3/3/1 2/4/1
f 5 6 7 8
f 1 2 6 5
f 3 4 8 7
g lid
usemtl metal
f 2 3 7 6
f -8 -4 -1 -5
";

    fn read(text: &str) -> Vec<ObjObject> {
        read_obj(text.as_bytes(), "Imported", &ImportSettings::default()).unwrap()
    }

    #[test]
    fn test_cube() {
        let objects = read(CUBE);
        assert_eq!(objects.len(), 1);
        let crate_object = &objects[0];
        assert_eq!(crate_object.name, "Crate");

        let mesh = &crate_object.mesh;
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 6);
        assert!(mesh.validate().is_ok());
        let names: Vec<&str> = mesh.materials.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["wood", "metal"]);
        assert_eq!(mesh.faces[5].material, 1);
        assert_eq!(mesh.vertex_group("body").unwrap().len(), 8);
        assert_eq!(mesh.vertex_group("lid").unwrap().len(), 8);
        // Negative indices resolve against the vertices read so far
        assert_eq!(mesh.faces[5].vertices.as_slice(), &[0, 4, 7, 1]);
    }

    #[test]
    fn test_multiple_objects_compacted() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o Second
v 5 5 5
v 6 5 5
v 5 6 5
f 4 5 6
";
        let objects = read(text);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name, "Imported");
        assert_eq!(objects[1].name, "Second");
        assert_eq!(objects[1].mesh.vertex_count(), 3);
        assert_eq!(objects[1].mesh.positions[0], Vec3::splat(5.0));
        assert_eq!(objects[1].mesh.faces[0].vertices.as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn test_scale_applied() {
        let settings = ImportSettings {
            scale: 2.0,
            ..ImportSettings::default()
        };
        let objects = read_obj("v 1 2 3\nv 0 0 0\nv 1 0 0\nf 1 2 3\n".as_bytes(), "s", &settings).unwrap();
        assert_eq!(objects[0].mesh.positions[0], Vec3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn test_errors_name_the_line() {
        let err = read_obj("v 0 0 0\nf 1 2 9\n".as_bytes(), "x", &ImportSettings::default())
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));

        assert!(read_obj("v 0 zero 0\n".as_bytes(), "x", &ImportSettings::default()).is_err());
        assert!(read_obj("v 0 0 0\nv 1 1 1\nf 1 2\n".as_bytes(), "x", &ImportSettings::default()).is_err());
        assert!(read_obj("v 0 0 0\nf 0 1 1\n".as_bytes(), "x", &ImportSettings::default()).is_err());
    }
}
