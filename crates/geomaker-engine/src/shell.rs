//! Collision and visibility shells
//!
//! Box proxies for the geometry LODs, the tessellated fire geometry that
//! hugs the source surface, and the view-pilot copy of the source.

use geomaker_core::{
    InteractionMode, Material, Mesh, ObjectData, ObjectId, Scene, SceneError, SceneObject,
    Transform,
};
use geomaker_mesh::{MeshProcessor, NgonPolicy, QuadPolicy, SurfaceTarget};
use glam::Vec3;

use crate::bounds::BoundingVolume;
use crate::config::{GeneratorConfig, MaterialConfig};
use crate::error::{BudgetWarning, GenerationReport, GeometryError, GeometryResult};
use crate::tagger::{GeometryClass, TagTable, apply_tags};

/// Valid fire geometry quality range
pub const FIRE_QUALITY_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

/// Name given to finished fire geometry
pub const FIRE_GEOMETRY_OBJECT_NAME: &str = "Component01";

/// Smallest box extent along any axis; flat sources keep an invertible shell transform
pub const MIN_SHELL_EXTENT: f32 = 1e-3;

/// Triangles produced by fire geometry at `quality`: 2 * 6 * 4^quality
pub fn fire_geometry_face_count(quality: u32) -> usize {
    4usize
        .checked_pow(quality)
        .and_then(|quads| quads.checked_mul(12))
        .unwrap_or(usize::MAX)
}

fn source_object(scene: &Scene, source: ObjectId) -> GeometryResult<&SceneObject> {
    let object = scene.object(source).ok_or(SceneError::ObjectNotFound(source))?;
    if object.mesh().is_none() {
        return Err(GeometryError::InvalidInput(format!(
            "'{}' is not a mesh object",
            object.name
        )));
    }
    Ok(object)
}

/// Material carrying the configured exporter properties
pub(crate) fn exporter_material(name: String, materials: &MaterialConfig) -> Material {
    Material {
        texture: materials.texture.clone(),
        rvmat: materials.rvmat.clone(),
        ..Material::new(name)
    }
}

/// Unit-cube proxy scaled to the source's world box
///
/// Only the box classes (geometry, view geometry, fire geometry) are
/// accepted. The object is named after and moved to its class collection.
pub fn build_box_shell(
    scene: &mut Scene,
    source: ObjectId,
    class: GeometryClass,
    config: &GeneratorConfig,
) -> GeometryResult<ObjectId> {
    if !matches!(
        class,
        GeometryClass::Geometry | GeometryClass::ViewGeometry | GeometryClass::FireGeometry
    ) {
        return Err(GeometryError::InvalidInput(format!(
            "{class:?} is not built from a box"
        )));
    }
    let bv = BoundingVolume::compute(source_object(scene, source)?)?;
    scene.set_mode(InteractionMode::Object);

    let mut mesh = Mesh::unit_cube();
    let group = mesh.ensure_vertex_group(&config.shell.component_group);
    for v in 0..8 {
        group.add(v);
    }
    mesh.set_float_layer(&config.shell.weight_layer, 1.0);

    let collection = class.collection_name();
    let extent = bv.dimensions.max(Vec3::splat(MIN_SHELL_EXTENT));
    let transform = Transform::from_position_scale(bv.center, extent);
    let id = scene.add_mesh_object(&collection, mesh, transform);

    let mut tags = TagTable::for_class(class).with_mass(0.0).with_weight(1.0);
    if class == GeometryClass::Geometry {
        tags = tags.with_named("autocenter", "0");
    }
    apply_tags(scene, id, &tags)?;
    scene.move_object_to_collection(id, &collection)?;

    log::info!(
        "Created {} box at {:?} with dimensions {:?}",
        collection,
        bv.center,
        bv.dimensions
    );
    Ok(id)
}

/// Box shell subdivided, triangulated and shrink-wrapped onto the source
///
/// Fails with a precondition error in edit mode before touching the
/// scene. A collaborator failure after the box exists leaves the partial
/// object in place and names it in the error.
pub fn build_fire_geometry(
    scene: &mut Scene,
    source: ObjectId,
    processor: &dyn MeshProcessor,
    config: &GeneratorConfig,
) -> GeometryResult<GenerationReport> {
    if scene.mode() == InteractionMode::Edit {
        return Err(GeometryError::Precondition(
            "Please exit Edit mode before creating fire geometry".into(),
        ));
    }
    let target = source_object(scene, source)?;
    let target_mesh = target.mesh().cloned().unwrap_or_default();
    let target_to_world = target.transform.matrix();

    let requested = config.shell.fire_quality;
    let quality = requested.clamp(*FIRE_QUALITY_RANGE.start(), *FIRE_QUALITY_RANGE.end());
    if quality != requested {
        log::debug!("Fire geometry quality {} clamped to {}", requested, quality);
    }

    let mut report = GenerationReport::default();
    let expected = fire_geometry_face_count(quality);
    if expected > config.budget.max_polygons {
        report.warn(BudgetWarning::PolygonBudgetExceeded {
            object: GeometryClass::FireGeometry.collection_name().into_owned(),
            polygons: expected,
            limit: config.budget.max_polygons,
        });
    }

    let id = build_box_shell(scene, source, GeometryClass::FireGeometry, config)?;
    let shell = scene.object_mut(id).ok_or(SceneError::ObjectNotFound(id))?;
    let shell_to_world = shell.transform.matrix();
    let ObjectData::Mesh(mesh) = &mut shell.data else {
        return Err(SceneError::ObjectNotFound(id).into());
    };

    log::info!("Applying {} subdivision levels...", quality);
    let result = processor
        .subdivide(mesh, quality)
        .and_then(|()| processor.triangulate(mesh, QuadPolicy::Beauty, NgonPolicy::Beauty))
        .and_then(|()| {
            processor.project_onto_surface(
                mesh,
                shell_to_world,
                SurfaceTarget {
                    mesh: &target_mesh,
                    to_world: target_to_world,
                },
                config.shell.fire_offset,
                config.shell.projection,
            )
        });
    let (vertices, triangles) = (mesh.vertex_count(), mesh.face_count());

    if let Err(source) = result {
        return Err(GeometryError::PartiallyBuilt {
            object: shell.name.clone(),
            source,
        });
    }

    let name = scene.rename_object(id, FIRE_GEOMETRY_OBJECT_NAME)?;
    log::info!(
        "Fire geometry '{}' created with {} vertices and {} triangles",
        name,
        vertices,
        triangles
    );
    report.created.push(id);
    Ok(report)
}

/// Copy of the source with one material per vertex group
///
/// Faces whose corners all belong to a group take that group's
/// `default_<group>` material (later groups win); the rest fall back to
/// `combined_<object>`.
pub fn build_view_pilot(
    scene: &mut Scene,
    source: ObjectId,
    config: &GeneratorConfig,
) -> GeometryResult<ObjectId> {
    let mass = source_object(scene, source)?.mass();
    scene.set_mode(InteractionMode::Object);

    let class = GeometryClass::ViewPilot;
    let collection = class.collection_name();
    let id = scene.duplicate_object(source, &collection)?;
    let pilot = scene.object_mut(id).ok_or(SceneError::ObjectNotFound(id))?;
    let name = pilot.name.clone();
    if let Some(mesh) = pilot.mesh_mut() {
        assign_group_materials(mesh, &name, &config.materials);
    }

    let tags = TagTable::for_class(class).with_mass(mass).with_weight(1.0);
    apply_tags(scene, id, &tags)?;
    scene.move_object_to_collection(id, &collection)?;

    log::info!("Created view pilot '{}'", name);
    Ok(id)
}

/// Replace the mesh's materials with one per vertex group
pub fn assign_group_materials(mesh: &mut Mesh, object_name: &str, materials: &MaterialConfig) {
    let mut slots: Vec<Material> = Vec::with_capacity(mesh.vertex_groups.len() + 1);
    let mut assignment: Vec<Option<u32>> = vec![None; mesh.face_count()];

    for (slot, group) in mesh.vertex_groups.iter().enumerate() {
        slots.push(exporter_material(format!("default_{}", group.name), materials));
        for (face_index, face) in mesh.faces.iter().enumerate() {
            if mesh.face_in_group(face, group) {
                assignment[face_index] = Some(slot as u32);
            }
        }
    }

    let fallback = slots.len() as u32;
    if assignment.iter().any(Option::is_none) {
        slots.push(exporter_material(format!("combined_{object_name}"), materials));
    }

    for (face, slot) in mesh.faces.iter_mut().zip(assignment) {
        face.material = slot.unwrap_or(fallback);
    }
    mesh.materials = slots;
}
