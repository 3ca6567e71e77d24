//! Scene store
//!
//! Flat object store with named collections, the host-side view the
//! generators work against:
//! - Objects with transforms and unique names
//! - Collections created on demand
//! - Interaction mode of the editing session
//! - Optional exporter classification per object

use std::fmt;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classification::Classification;
use crate::mesh::Mesh;

/// Scene errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Transform of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position
    pub position: Vec3,
    /// Rotation
    pub rotation: Quat,
    /// Scale
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a new transform with the given position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Create a new transform with position and scale
    pub fn from_position_scale(position: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale,
        }
    }

    /// Create a new transform from all components
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Model-to-world matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Stable object identifier within one scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Object payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectData {
    /// Polygon mesh
    Mesh(Mesh),
    /// Transform-only object (camera rig, locator, ...)
    Empty,
}

/// Object in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Identifier
    pub id: ObjectId,
    /// Unique name
    pub name: String,
    /// Model-to-world transform
    pub transform: Transform,
    /// Payload
    pub data: ObjectData,
    /// Exporter metadata, absent when the scene has no exporter support
    #[serde(default)]
    pub classification: Option<Classification>,
}

impl SceneObject {
    /// Mesh payload, if any
    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            ObjectData::Empty => None,
        }
    }

    /// Mutable mesh payload, if any
    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            ObjectData::Empty => None,
        }
    }

    /// Mass recorded in the classification, zero without one
    pub fn mass(&self) -> f32 {
        self.classification.as_ref().map_or(0.0, |c| c.mass)
    }
}

/// Named group of objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Collection name
    pub name: String,
    /// Linked objects
    pub objects: Vec<ObjectId>,
}

impl Collection {
    /// Create an empty collection
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
        }
    }

    /// Whether an object is linked here
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains(&id)
    }
}

/// Editing mode of the host session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractionMode {
    /// Object mode, geometry is settled
    #[default]
    Object,
    /// Interactive mesh editing
    Edit,
}

/// Scene containing objects and collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// All objects
    objects: Vec<SceneObject>,
    /// Collections in creation order
    collections: Vec<Collection>,
    /// Next identifier to hand out
    next_id: u32,
    /// Objects receive classification metadata
    supports_classification: bool,
    /// Current interaction mode
    #[serde(default)]
    mode: InteractionMode,
}

impl Scene {
    /// Create an empty scene with exporter classification support
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            collections: Vec::new(),
            next_id: 0,
            supports_classification: true,
            mode: InteractionMode::Object,
        }
    }

    /// Create an empty scene whose objects carry no classification
    pub fn without_classification() -> Self {
        Self {
            supports_classification: false,
            ..Self::new()
        }
    }

    /// Whether new objects get a classification store
    pub fn supports_classification(&self) -> bool {
        self.supports_classification
    }

    /// Current interaction mode
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Switch interaction mode
    pub fn set_mode(&mut self, mode: InteractionMode) {
        if self.mode != mode {
            log::debug!("Interaction mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Name not used by any object: `base`, then `base.001`, `base.002`, ...
    pub fn unique_name(&self, base: &str) -> String {
        if self.find_by_name(base).is_none() {
            return base.to_string();
        }
        (1u32..)
            .map(|n| format!("{base}.{n:03}"))
            .find(|candidate| self.find_by_name(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Add an object, returns its identifier
    ///
    /// The name is made unique; the object is not linked to any collection.
    pub fn add_object(&mut self, name: &str, data: ObjectData, transform: Transform) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        let name = self.unique_name(name);
        let classification = self.supports_classification.then(Classification::default);
        self.objects.push(SceneObject {
            id,
            name,
            transform,
            data,
            classification,
        });
        id
    }

    /// Add a mesh object
    pub fn add_mesh_object(&mut self, name: &str, mesh: Mesh, transform: Transform) -> ObjectId {
        self.add_object(name, ObjectData::Mesh(mesh), transform)
    }

    /// Copy an object's transform, data and classification under a new name
    pub fn duplicate_object(&mut self, id: ObjectId, name: &str) -> SceneResult<ObjectId> {
        let source = self.object(id).ok_or(SceneError::ObjectNotFound(id))?;
        let data = source.data.clone();
        let transform = source.transform;
        let classification = source.classification.clone();

        let copy = self.add_object(name, data, transform);
        if let Some(object) = self.object_mut(copy) {
            if object.classification.is_some() {
                object.classification = classification;
            }
        }
        Ok(copy)
    }

    /// Rename an object, returns the unique name it received
    pub fn rename_object(&mut self, id: ObjectId, name: &str) -> SceneResult<String> {
        let current = self.object(id).ok_or(SceneError::ObjectNotFound(id))?;
        if current.name == name {
            return Ok(current.name.clone());
        }
        let unique = self.unique_name(name);
        if let Some(object) = self.object_mut(id) {
            object.name = unique.clone();
        }
        Ok(unique)
    }

    /// Get an object by id
    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Get a mutable object by id
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Find an object by exact name
    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects.iter().find(|o| o.name == name).map(|o| o.id)
    }

    /// All objects in creation order
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    /// Number of objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Get a collection by name
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// All collections in creation order
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Get a collection, creating it when missing
    pub fn get_or_create_collection(&mut self, name: &str) -> &mut Collection {
        let index = match self.collections.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                log::debug!("Creating collection '{}'", name);
                self.collections.push(Collection::new(name));
                self.collections.len() - 1
            }
        };
        &mut self.collections[index]
    }

    /// Unlink an object from every collection and link it to `collection`
    pub fn move_object_to_collection(&mut self, id: ObjectId, collection: &str) -> SceneResult<()> {
        if self.object(id).is_none() {
            return Err(SceneError::ObjectNotFound(id));
        }
        for existing in &mut self.collections {
            existing.objects.retain(|&o| o != id);
        }
        self.get_or_create_collection(collection).objects.push(id);
        Ok(())
    }

    /// Names of the collections an object is linked to
    pub fn collections_of(&self, id: ObjectId) -> Vec<&str> {
        self.collections
            .iter()
            .filter(|c| c.contains(id))
            .map(|c| c.name.as_str())
            .collect()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
