//! Memory points
//!
//! Named reference points the exporter reads from a vertex-only mesh.
//! Each point is a vertex group holding one or more vertices. Points are
//! either derived from the source's bounding volume or taken from a fixed
//! model-local catalog (weapon mechanics), and a point whose name already
//! exists on the memory object is never added twice.

use bitflags::bitflags;
use geomaker_core::{Mesh, ObjectId, Scene, SceneError, Transform};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::bounds::BoundingVolume;
use crate::error::{GeometryError, GeometryResult};
use crate::tagger::{GeometryClass, TagTable, apply_tags};

/// Name of the points object and of its collection
pub const MEMORY_OBJECT_NAME: &str = "Memory";

bitflags! {
    /// Memory point categories
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PointCategories: u8 {
        /// boundingbox_max, boundingbox_min, invview
        const DEFAULT = 1 << 0;
        /// ce_radius
        const RADIUS = 1 << 1;
        /// ce_center
        const CENTER = 1 << 2;
        /// konec hlavne, usti hlavne
        const BULLET_TRAVEL = 1 << 3;
        /// bolt_axis
        const BOLT_AXIS = 1 << 4;
        /// nabojnicestart, nabojniceend
        const BULLET_EJECT = 1 << 5;
        /// eye
        const EYE_ADS = 1 << 6;
    }
}

impl Default for PointCategories {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Position derived from the bounding volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsAnchor {
    /// (max.x, min.y, max.z)
    BoxMax,
    /// (min.x, max.y, min.z)
    BoxMin,
    /// In front of the object at 1.75 radii below min.y
    InView,
    /// One radius along -X from the center
    Radius,
    Center,
}

impl BoundsAnchor {
    /// World position for a bounding volume
    pub fn resolve(self, bv: &BoundingVolume) -> Vec3 {
        let r = bv.sphere_radius;
        match self {
            // The exporter expects the x/z of one corner with the y of the other
            Self::BoxMax => Vec3::new(bv.max.x, bv.min.y, bv.max.z),
            Self::BoxMin => Vec3::new(bv.min.x, bv.max.y, bv.min.z),
            Self::InView => Vec3::new(bv.center.x, bv.min.y - r * 1.75, bv.center.z),
            Self::Radius => Vec3::new(bv.center.x - r, bv.center.y, bv.center.z),
            Self::Center => bv.center,
        }
    }
}

/// Where a catalog point comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointAnchor {
    /// Derived from the source's bounding volume
    Bounds(BoundsAnchor),
    /// Fixed position in model space
    ModelLocal([f32; 3]),
}

impl PointAnchor {
    pub fn resolve(self, bv: &BoundingVolume) -> Vec3 {
        match self {
            Self::Bounds(anchor) => anchor.resolve(bv),
            Self::ModelLocal(position) => Vec3::from_array(position),
        }
    }
}

/// One named point of the catalog
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    pub category: PointCategories,
    pub name: &'static str,
    pub anchors: &'static [PointAnchor],
}

use BoundsAnchor::*;
use PointAnchor::{Bounds, ModelLocal};

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        category: PointCategories::DEFAULT,
        name: "boundingbox_max",
        anchors: &[Bounds(BoxMax)],
    },
    CatalogEntry {
        category: PointCategories::DEFAULT,
        name: "boundingbox_min",
        anchors: &[Bounds(BoxMin)],
    },
    CatalogEntry {
        category: PointCategories::DEFAULT,
        name: "invview",
        anchors: &[Bounds(InView)],
    },
    CatalogEntry {
        category: PointCategories::RADIUS,
        name: "ce_radius",
        anchors: &[Bounds(Radius)],
    },
    CatalogEntry {
        category: PointCategories::CENTER,
        name: "ce_center",
        anchors: &[Bounds(Center)],
    },
    CatalogEntry {
        category: PointCategories::BULLET_TRAVEL,
        name: "konec hlavne",
        anchors: &[ModelLocal([-0.214730, -0.001864, 0.113638])],
    },
    CatalogEntry {
        category: PointCategories::BULLET_TRAVEL,
        name: "usti hlavne",
        anchors: &[ModelLocal([-0.725986, -0.001864, 0.113638])],
    },
    CatalogEntry {
        category: PointCategories::BOLT_AXIS,
        name: "bolt_axis",
        anchors: &[
            ModelLocal([-0.027365, 0.000002, 0.129440]),
            ModelLocal([0.156166, 0.000002, 0.129440]),
        ],
    },
    CatalogEntry {
        category: PointCategories::BULLET_EJECT,
        name: "nabojnicestart",
        anchors: &[ModelLocal([-0.110412, -0.024278, 0.144729])],
    },
    CatalogEntry {
        category: PointCategories::BULLET_EJECT,
        name: "nabojniceend",
        anchors: &[ModelLocal([-0.110412, -0.068180, 0.145269])],
    },
    CatalogEntry {
        category: PointCategories::EYE_ADS,
        name: "eye",
        anchors: &[ModelLocal([0.219703, -0.001609, 0.185810])],
    },
];

/// The fixed point catalog in placement order
pub fn catalog() -> &'static [CatalogEntry] {
    CATALOG
}

/// A resolved point group
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPoint {
    pub name: &'static str,
    pub positions: SmallVec<[Vec3; 2]>,
}

/// Resolve every enabled catalog point whose name `exists` rejects
pub fn plan_points(
    bv: &BoundingVolume,
    categories: PointCategories,
    exists: impl Fn(&str) -> bool,
) -> Vec<NamedPoint> {
    CATALOG
        .iter()
        .filter(|entry| categories.intersects(entry.category) && !exists(entry.name))
        .map(|entry| NamedPoint {
            name: entry.name,
            positions: entry.anchors.iter().map(|a| a.resolve(bv)).collect(),
        })
        .collect()
}

/// Result of a placement call
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    /// Every requested point was already present, nothing changed
    NoNewPoints,
    /// Points were written
    Placed {
        object: ObjectId,
        /// A new memory object was created
        created: bool,
        names: Vec<&'static str>,
    },
}

/// First mesh object in the memory collection whose name starts with "Memory"
pub fn find_memory_object(scene: &Scene) -> Option<ObjectId> {
    let collection = scene.collection(MEMORY_OBJECT_NAME)?;
    collection.objects.iter().copied().find(|&id| {
        scene
            .object(id)
            .is_some_and(|o| o.name.starts_with(MEMORY_OBJECT_NAME) && o.mesh().is_some())
    })
}

/// Add the enabled memory points for `source`
///
/// Points go into the existing memory object when there is one, otherwise
/// into a new `Memory` object in the `Memory` collection. The source is
/// only read.
pub fn place_memory_points(
    scene: &mut Scene,
    source: ObjectId,
    categories: PointCategories,
) -> GeometryResult<PlacementOutcome> {
    let source_object = scene.object(source).ok_or(SceneError::ObjectNotFound(source))?;
    let bv = BoundingVolume::compute(source_object)?;

    let existing = find_memory_object(scene);
    let existing_mesh = existing
        .and_then(|id| scene.object(id))
        .and_then(|o| o.mesh());
    let points = plan_points(&bv, categories, |name| {
        existing_mesh.is_some_and(|m| m.has_vertex_group(name))
    });

    if points.is_empty() {
        log::info!("No new memory points to add");
        return Ok(PlacementOutcome::NoNewPoints);
    }
    let names: Vec<&'static str> = points.iter().map(|p| p.name).collect();

    let (object, created) = match existing {
        Some(id) => {
            let mesh = scene
                .object_mut(id)
                .and_then(|o| o.mesh_mut())
                .ok_or_else(|| GeometryError::InvalidInput("memory object lost its mesh".into()))?;
            write_points(mesh, &points);
            (id, false)
        }
        None => {
            let mut mesh = Mesh::new();
            write_points(&mut mesh, &points);
            let id = scene.add_mesh_object(MEMORY_OBJECT_NAME, mesh, Transform::IDENTITY);
            apply_tags(scene, id, &TagTable::for_class(GeometryClass::Memory))?;
            scene.move_object_to_collection(id, MEMORY_OBJECT_NAME)?;
            (id, true)
        }
    };

    log::info!("Placed memory points: {}", names.join(", "));
    Ok(PlacementOutcome::Placed {
        object,
        created,
        names,
    })
}

fn write_points(mesh: &mut Mesh, points: &[NamedPoint]) {
    for point in points {
        let indices: SmallVec<[u32; 2]> =
            point.positions.iter().map(|&p| mesh.push_vertex(p)).collect();
        let group = mesh.ensure_vertex_group(point.name);
        for index in indices {
            group.add(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_unit_box(scene: &mut Scene) -> ObjectId {
        scene.add_mesh_object(
            "Source",
            Mesh::unit_cube(),
            Transform::from_position_scale(Vec3::ZERO, Vec3::splat(2.0)),
        )
    }

    fn point(scene: &Scene, object: ObjectId, name: &str) -> Vec<Vec3> {
        let mesh = scene.object(object).unwrap().mesh().unwrap();
        mesh.vertex_group(name)
            .unwrap()
            .members()
            .iter()
            .map(|&v| mesh.positions[v as usize])
            .collect()
    }

    #[test]
    fn test_default_points_on_box() {
        let mut scene = Scene::new();
        let source = two_unit_box(&mut scene);

        let outcome = place_memory_points(&mut scene, source, PointCategories::DEFAULT).unwrap();
        let PlacementOutcome::Placed { object, created, names } = outcome else {
            panic!("expected points to be placed");
        };

        assert!(created);
        assert_eq!(names, vec!["boundingbox_max", "boundingbox_min", "invview"]);
        assert_eq!(point(&scene, object, "boundingbox_max"), vec![Vec3::new(1.0, -1.0, 1.0)]);
        assert_eq!(point(&scene, object, "boundingbox_min"), vec![Vec3::new(-1.0, 1.0, -1.0)]);
        let invview = point(&scene, object, "invview")[0];
        assert!((invview - Vec3::new(0.0, -1.0 - 1.75 * 3.0f32.sqrt(), 0.0)).length() < 1e-5);

        let memory = scene.object(object).unwrap();
        assert_eq!(memory.name, "Memory");
        assert_eq!(scene.collections_of(object), vec!["Memory"]);
        assert_eq!(memory.classification.as_ref().unwrap().lod, "1.000e+15");
        assert!(memory.classification.as_ref().unwrap().exportable);
    }

    #[test]
    fn test_radius_and_center() {
        let mut scene = Scene::new();
        let source = two_unit_box(&mut scene);
        let categories = PointCategories::RADIUS | PointCategories::CENTER;

        let PlacementOutcome::Placed { object, .. } =
            place_memory_points(&mut scene, source, categories).unwrap()
        else {
            panic!("expected points to be placed");
        };

        let radius = point(&scene, object, "ce_radius")[0];
        assert!((radius - Vec3::new(-(3.0f32.sqrt()), 0.0, 0.0)).length() < 1e-5);
        assert_eq!(point(&scene, object, "ce_center"), vec![Vec3::ZERO]);
    }

    #[test]
    fn test_bolt_axis_is_one_group_of_two() {
        let bv = BoundingVolume::from_aabb(geomaker_core::Aabb::unit());
        let points = plan_points(&bv, PointCategories::BOLT_AXIS, |_| false);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name, "bolt_axis");
        assert_eq!(points[0].positions.len(), 2);
        assert_eq!(points[0].positions[1], Vec3::new(0.156166, 0.000002, 0.129440));
    }

    #[test]
    fn test_model_local_points_ignore_bounds() {
        let small = BoundingVolume::from_aabb(geomaker_core::Aabb::unit());
        let large = BoundingVolume::from_aabb(geomaker_core::Aabb::new(
            Vec3::splat(-50.0),
            Vec3::splat(80.0),
        ));
        let categories = PointCategories::BULLET_TRAVEL
            | PointCategories::BULLET_EJECT
            | PointCategories::EYE_ADS;
        assert_eq!(
            plan_points(&small, categories, |_| false),
            plan_points(&large, categories, |_| false)
        );
    }

    #[test]
    fn test_placement_is_idempotent() {
        let mut scene = Scene::new();
        let source = two_unit_box(&mut scene);
        let all = PointCategories::all();

        place_memory_points(&mut scene, source, all).unwrap();
        let snapshot = scene.clone();

        let outcome = place_memory_points(&mut scene, source, all).unwrap();
        assert_eq!(outcome, PlacementOutcome::NoNewPoints);
        assert_eq!(scene, snapshot);
    }

    #[test]
    fn test_appends_to_existing_memory_object() {
        let mut scene = Scene::new();
        let source = two_unit_box(&mut scene);

        let PlacementOutcome::Placed { object: first, .. } =
            place_memory_points(&mut scene, source, PointCategories::DEFAULT).unwrap()
        else {
            panic!("expected points to be placed");
        };
        let PlacementOutcome::Placed { object, created, names } = place_memory_points(
            &mut scene,
            source,
            PointCategories::DEFAULT | PointCategories::EYE_ADS,
        )
        .unwrap() else {
            panic!("expected points to be placed");
        };

        assert_eq!(object, first);
        assert!(!created);
        assert_eq!(names, vec!["eye"]);
        let mesh = scene.object(object).unwrap().mesh().unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.vertex_groups.len(), 4);
        assert_eq!(scene.object_count(), 2);
    }

    #[test]
    fn test_source_untouched() {
        let mut scene = Scene::new();
        let source = two_unit_box(&mut scene);
        let before = scene.object(source).unwrap().clone();
        place_memory_points(&mut scene, source, PointCategories::all()).unwrap();
        assert_eq!(scene.object(source).unwrap(), &before);
    }

    #[test]
    fn test_without_classification() {
        let mut scene = Scene::without_classification();
        let source = two_unit_box(&mut scene);
        let outcome = place_memory_points(&mut scene, source, PointCategories::DEFAULT).unwrap();
        assert!(matches!(outcome, PlacementOutcome::Placed { created: true, .. }));
    }
}
