//! Visual LOD chain
//!
//! LOD `i` is a copy of the source named `"<i>"` in collection `"<i>"`.
//! LOD 1 keeps the full mesh; higher indices are simplified further with
//! every step, so face counts never grow along the chain. Each LOD gets
//! its own copies of the materials, and the lowest levels share a single
//! combined material.

use geomaker_core::{InteractionMode, Mesh, ObjectData, ObjectId, Scene, SceneError};
use geomaker_mesh::{DecimateMode, MeshProcessor};
use serde::{Deserialize, Serialize};

use crate::config::{BudgetConfig, GeneratorConfig, LodConfig, MaterialConfig};
use crate::error::{BudgetWarning, GenerationReport, GeometryError, GeometryResult};
use crate::shell::exporter_material;
use crate::tagger::{GeometryClass, TagTable, apply_tags};

/// Highest LOD index
pub const MAX_LOD_INDEX: u8 = 6;

/// Base weld distance of the merge policy, scaled by `(i - 1)`
pub const MERGE_BASE_THRESHOLD: f32 = 0.00212;

/// How LODs past the first are simplified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LodPolicy {
    /// `(i - 1)` collapse passes
    #[default]
    Collapse,
    /// One weld pass with a distance growing with the index
    MergeByDistance,
}

/// Simplification applied to reach one LOD from the source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Simplification {
    None,
    Decimate { passes: u32, ratio: f32 },
    Merge { threshold: f32 },
}

/// One planned LOD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodSpec {
    pub index: u8,
    pub view_distance: f32,
    pub simplification: Simplification,
}

impl LodSpec {
    /// Plan LOD `index` under `config`
    pub fn new(index: u8, config: &LodConfig) -> Self {
        let view_distance = config
            .view_distances
            .get(usize::from(index).saturating_sub(1))
            .copied()
            .unwrap_or(f32::from(index));
        let steps = u32::from(index.saturating_sub(1));
        let simplification = if steps == 0 {
            Simplification::None
        } else {
            match config.policy {
                LodPolicy::Collapse => Simplification::Decimate {
                    passes: steps,
                    ratio: config.decimate_ratio,
                },
                LodPolicy::MergeByDistance => Simplification::Merge {
                    threshold: MERGE_BASE_THRESHOLD * steps as f32 * config.merge_threshold_scale,
                },
            }
        };
        Self {
            index,
            view_distance,
            simplification,
        }
    }
}

/// Enabled LODs in ascending order without duplicates
pub fn plan_lod_chain(config: &LodConfig) -> GeometryResult<Vec<LodSpec>> {
    let mut levels = config.levels.clone();
    levels.sort_unstable();
    levels.dedup();
    if let Some(&bad) = levels.iter().find(|&&l| l == 0 || l > MAX_LOD_INDEX) {
        return Err(GeometryError::InvalidInput(format!(
            "LOD index {bad} is outside 1..={MAX_LOD_INDEX}"
        )));
    }
    Ok(levels.into_iter().map(|i| LodSpec::new(i, config)).collect())
}

/// Generate every enabled LOD of `source`
///
/// Collapse passes accumulate from one LOD to the next. The merge policy
/// welds a fresh copy of the source once at each index's threshold and
/// keeps the previous LOD when that pass leaves more faces, so face
/// counts never increase with the index.
pub fn generate_lod_chain(
    scene: &mut Scene,
    source: ObjectId,
    processor: &dyn MeshProcessor,
    config: &GeneratorConfig,
) -> GeometryResult<GenerationReport> {
    let specs = plan_lod_chain(&config.lod)?;
    let source_object = scene.object(source).ok_or(SceneError::ObjectNotFound(source))?;
    let source_mesh = source_object.mesh().cloned().ok_or_else(|| {
        GeometryError::InvalidInput(format!("'{}' is not a mesh object", source_object.name))
    })?;
    let mut working = source_mesh.clone();
    let mass = source_object.mass();
    let mut report = GenerationReport::default();
    if specs.is_empty() {
        report.note = Some("No LOD levels enabled".into());
        return Ok(report);
    }
    scene.set_mode(InteractionMode::Object);

    log::info!("Original mesh has {} polygons", working.face_count());
    let lowest = specs.last().map(|s| s.index);
    let mut passes_done = 0;

    for spec in &specs {
        match spec.simplification {
            Simplification::None => {}
            Simplification::Decimate { passes, ratio } => {
                while passes_done < passes {
                    processor.decimate(&mut working, ratio, DecimateMode::Collapse)?;
                    passes_done += 1;
                    log::info!(
                        "LOD {} - Iteration {}: {} polygons",
                        spec.index,
                        passes_done,
                        working.face_count()
                    );
                }
            }
            Simplification::Merge { threshold } => {
                let mut merged = source_mesh.clone();
                let removed = processor.merge_close_vertices(&mut merged, threshold)?;
                log::info!(
                    "LOD {} - merged {} vertices at {}: {} polygons",
                    spec.index,
                    removed,
                    threshold,
                    merged.face_count()
                );
                if merged.face_count() <= working.face_count() {
                    working = merged;
                } else {
                    log::debug!(
                        "LOD {} keeps the previous level's {} polygons",
                        spec.index,
                        working.face_count()
                    );
                }
            }
        }

        let id = add_lod_object(scene, source, spec, &working, mass, config)?;
        let object = scene.object(id).ok_or(SceneError::ObjectNotFound(id))?;
        if let Some(mesh) = object.mesh() {
            log::info!("Created LOD {} with {} polygons", spec.index, mesh.face_count());
            let warnings = validate_lod(mesh, &object.name, lowest == Some(spec.index), &config.budget);
            for warning in warnings {
                report.warn(warning);
            }
        }
        report.created.push(id);
    }

    Ok(report)
}

fn add_lod_object(
    scene: &mut Scene,
    source: ObjectId,
    spec: &LodSpec,
    working: &Mesh,
    mass: f32,
    config: &GeneratorConfig,
) -> GeometryResult<ObjectId> {
    let class = GeometryClass::Lod(spec.index);
    let collection = class.collection_name();
    let id = scene.duplicate_object(source, &collection)?;
    let object = scene.object_mut(id).ok_or(SceneError::ObjectNotFound(id))?;

    let mut mesh = working.clone();
    if spec.index >= config.lod.combine_materials_from {
        combine_materials(&mut mesh, &object.name, &config.materials);
    } else {
        copy_materials(&mut mesh, spec.index, &config.materials);
    }
    object.data = ObjectData::Mesh(mesh);

    let mut tags = TagTable::for_class(class)
        .with_lod_distance(spec.view_distance)
        .with_mass(mass)
        .with_weight(1.0);
    if spec.index == 1 {
        tags = tags.with_named("forcenotalpha", "1");
    }
    apply_tags(scene, id, &tags)?;
    scene.move_object_to_collection(id, &collection)?;
    Ok(id)
}

/// Rename every material to `LOD<i>_<name>` with exporter properties
fn copy_materials(mesh: &mut Mesh, index: u8, materials: &MaterialConfig) {
    for material in &mut mesh.materials {
        let copy = exporter_material(format!("LOD{}_{}", index, material.name), materials);
        *material = copy;
    }
}

/// Collapse all materials into one `combined_<object>` slot
fn combine_materials(mesh: &mut Mesh, object_name: &str, materials: &MaterialConfig) {
    mesh.materials = vec![exporter_material(format!("combined_{object_name}"), materials)];
    for face in &mut mesh.faces {
        face.material = 0;
    }
}

/// Advisory budget checks for one LOD mesh
pub fn validate_lod(
    mesh: &Mesh,
    name: &str,
    is_lowest: bool,
    budget: &BudgetConfig,
) -> Vec<BudgetWarning> {
    let mut warnings = Vec::new();
    let polygons = mesh.face_count();
    if polygons > budget.max_polygons {
        warnings.push(BudgetWarning::PolygonBudgetExceeded {
            object: name.to_string(),
            polygons,
            limit: budget.max_polygons,
        });
    }
    if is_lowest && polygons < budget.min_lowest_lod_polygons {
        warnings.push(BudgetWarning::PolygonBudgetUnderrun {
            object: name.to_string(),
            polygons,
            minimum: budget.min_lowest_lod_polygons,
        });
    }
    if is_lowest && mesh.materials.len() > budget.max_lowest_lod_materials {
        warnings.push(BudgetWarning::MaterialBudgetExceeded {
            object: name.to_string(),
            materials: mesh.materials.len(),
            limit: budget.max_lowest_lod_materials,
        });
    }
    warnings
}
