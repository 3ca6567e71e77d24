//! Exporter classification tagging

use std::borrow::Cow;

use geomaker_core::{ObjectId, Scene, SceneError};

use crate::error::GeometryResult;

/// Kind of derived object, each with its own exporter tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryClass {
    Geometry,
    ViewGeometry,
    FireGeometry,
    Memory,
    ViewPilot,
    /// Visual LOD with its 1-based index
    Lod(u8),
}

impl GeometryClass {
    /// Collection the generated object is moved to
    pub fn collection_name(&self) -> Cow<'static, str> {
        match self {
            Self::Geometry => Cow::Borrowed("Geometry"),
            Self::ViewGeometry => Cow::Borrowed("View Geometry"),
            Self::FireGeometry => Cow::Borrowed("Fire Geometry"),
            Self::Memory => Cow::Borrowed("Memory"),
            Self::ViewPilot => Cow::Borrowed("View Pilot"),
            Self::Lod(index) => Cow::Owned(index.to_string()),
        }
    }

    /// Exporter LOD discriminator
    pub fn lod_tag(&self) -> &'static str {
        match self {
            Self::Geometry => "1.000e+13",
            Self::ViewGeometry => "6.000e+15",
            Self::FireGeometry => "7.000e+15",
            Self::Memory => "1.000e+15",
            Self::ViewPilot => "1.100e+3",
            Self::Lod(_) => "-1.0",
        }
    }
}

/// Values written onto an object's classification
///
/// `None` fields leave the current value alone.
#[derive(Debug, Clone, PartialEq)]
pub struct TagTable {
    pub exportable: bool,
    pub lod: String,
    pub lod_distance: Option<f32>,
    pub mass: Option<f32>,
    pub weight: Option<f32>,
    pub named: Vec<(String, String)>,
}

impl TagTable {
    /// Exportable object tagged with the class discriminator
    pub fn for_class(class: GeometryClass) -> Self {
        Self {
            exportable: true,
            lod: class.lod_tag().to_string(),
            lod_distance: None,
            mass: None,
            weight: None,
            named: Vec::new(),
        }
    }

    pub fn with_lod_distance(mut self, distance: f32) -> Self {
        self.lod_distance = Some(distance);
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Add a named property
    pub fn with_named(mut self, name: &str, value: &str) -> Self {
        self.named.push((name.to_string(), value.to_string()));
        self
    }
}

/// Write `tags` onto the object's classification
///
/// Returns `false` when the object carries no classification store; the
/// call is then a no-op. Applying the same table twice changes nothing.
pub fn apply_tags(scene: &mut Scene, id: ObjectId, tags: &TagTable) -> GeometryResult<bool> {
    let object = scene.object_mut(id).ok_or(SceneError::ObjectNotFound(id))?;
    let Some(classification) = object.classification.as_mut() else {
        log::debug!("'{}' has no classification support, skipping tags", object.name);
        return Ok(false);
    };

    classification.exportable = tags.exportable;
    classification.lod.clone_from(&tags.lod);
    if let Some(distance) = tags.lod_distance {
        classification.lod_distance = distance;
    }
    if let Some(mass) = tags.mass {
        classification.mass = mass;
    }
    if let Some(weight) = tags.weight {
        classification.weight = weight;
    }
    for (name, value) in &tags.named {
        classification.set_named_prop(name, value);
    }

    log::debug!("Tagged '{}' as lod {}", object.name, tags.lod);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomaker_core::{Mesh, Transform};

    #[test]
    fn test_class_tags() {
        assert_eq!(GeometryClass::Geometry.lod_tag(), "1.000e+13");
        assert_eq!(GeometryClass::FireGeometry.lod_tag(), "7.000e+15");
        assert_eq!(GeometryClass::Lod(3).lod_tag(), "-1.0");
        assert_eq!(GeometryClass::ViewPilot.collection_name(), "View Pilot");
        assert_eq!(GeometryClass::Lod(3).collection_name(), "3");
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut scene = Scene::new();
        let id = scene.add_mesh_object("Geometry", Mesh::unit_cube(), Transform::IDENTITY);
        let tags = TagTable::for_class(GeometryClass::Geometry)
            .with_mass(0.0)
            .with_weight(1.0)
            .with_named("autocenter", "0");

        assert!(apply_tags(&mut scene, id, &tags).unwrap());
        let first = scene.object(id).unwrap().classification.clone();
        assert!(apply_tags(&mut scene, id, &tags).unwrap());
        assert_eq!(scene.object(id).unwrap().classification, first);

        let classification = first.unwrap();
        assert!(classification.exportable);
        assert_eq!(classification.lod, "1.000e+13");
        assert_eq!(classification.weight, 1.0);
        assert_eq!(classification.named_prop("autocenter"), Some("0"));
        assert_eq!(classification.named_props.len(), 1);
    }

    #[test]
    fn test_unset_fields_kept() {
        let mut scene = Scene::new();
        let id = scene.add_mesh_object("Source", Mesh::unit_cube(), Transform::IDENTITY);
        scene.object_mut(id).unwrap().classification.as_mut().unwrap().mass = 12.5;

        apply_tags(&mut scene, id, &TagTable::for_class(GeometryClass::ViewPilot)).unwrap();

        assert_eq!(scene.object(id).unwrap().mass(), 12.5);
    }

    #[test]
    fn test_missing_classification_is_noop() {
        let mut scene = Scene::without_classification();
        let id = scene.add_mesh_object("Geometry", Mesh::unit_cube(), Transform::IDENTITY);
        let tags = TagTable::for_class(GeometryClass::Geometry);
        assert!(!apply_tags(&mut scene, id, &tags).unwrap());
        assert!(scene.object(id).unwrap().classification.is_none());
    }
}
