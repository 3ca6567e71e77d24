//! # Geomaker Assets
//!
//! Getting scenes in and out of the generators.
//!
//! ## Features
//! - Wavefront OBJ import into a scene
//! - JSON scene documents, the working format of the command line tool

pub mod obj;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use geomaker_core::{ObjectId, Scene, Transform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use obj::{ObjObject, read_obj};

/// Asset errors
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Import failed: {0}")]
    ImportFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for AssetError {
    fn from(err: serde_json::Error) -> Self {
        AssetError::SerializationError(err.to_string())
    }
}

/// Result type for asset operations
pub type AssetResult<T> = Result<T, AssetError>;

/// Mesh import settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Uniform scale applied to imported positions
    pub scale: f32,
    /// Create the scene with exporter classification available
    pub classification: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            classification: true,
        }
    }
}

/// Scene file formats understood by [`load_scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneFormat {
    Json,
    Obj,
}

impl SceneFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> AssetResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(Self::Json),
            "obj" => Ok(Self::Obj),
            _ => Err(AssetError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Add every object of an OBJ file to `scene`, returning the new ids
pub fn import_obj(
    scene: &mut Scene,
    path: &Path,
    settings: &ImportSettings,
) -> AssetResult<Vec<ObjectId>> {
    let file = File::open(path)?;
    let default_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Imported");

    let objects = read_obj(BufReader::new(file), default_name, settings)?;
    if objects.is_empty() {
        return Err(AssetError::ImportFailed(format!(
            "{} contains no faces",
            path.display()
        )));
    }

    let ids = objects
        .into_iter()
        .map(|object| scene.add_mesh_object(&object.name, object.mesh, Transform::IDENTITY))
        .collect();
    log::info!("Imported {}", path.display());
    Ok(ids)
}

/// Parse a JSON scene document
pub fn scene_from_json(json: &str) -> AssetResult<Scene> {
    let scene: Scene = serde_json::from_str(json)?;
    for object in scene.objects() {
        if let Some(mesh) = object.mesh() {
            mesh.validate().map_err(|e| {
                AssetError::ImportFailed(format!("object '{}': {}", object.name, e))
            })?;
        }
    }
    Ok(scene)
}

/// Serialize a scene to pretty JSON
pub fn scene_to_json(scene: &Scene) -> AssetResult<String> {
    Ok(serde_json::to_string_pretty(scene)?)
}

/// Load a scene from a JSON document or an OBJ file
pub fn load_scene(path: &Path, settings: &ImportSettings) -> AssetResult<Scene> {
    match SceneFormat::from_path(path)? {
        SceneFormat::Json => {
            log::debug!("Loading scene {}", path.display());
            let json = std::fs::read_to_string(path)?;
            scene_from_json(&json)
        }
        SceneFormat::Obj => {
            let mut scene = if settings.classification {
                Scene::new()
            } else {
                Scene::without_classification()
            };
            import_obj(&mut scene, path, settings)?;
            Ok(scene)
        }
    }
}

/// Write a scene as a JSON document
pub fn save_scene(scene: &Scene, path: &Path) -> AssetResult<()> {
    if SceneFormat::from_path(path)? != SceneFormat::Json {
        return Err(AssetError::UnsupportedFormat(format!(
            "{} (scenes are saved as .json)",
            path.display()
        )));
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, scene)?;
    writer.flush()?;
    log::info!("Saved {} objects to {}", scene.object_count(), path.display());
    Ok(())
}
