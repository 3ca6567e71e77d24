//! # Geomaker Engine
//!
//! Derived-geometry generators for game-content meshes.
//!
//! ## Generators
//! - Bounding volume of a source object in world space
//! - Memory points relative to the bounding volume or at fixed model positions
//! - Box collision shells and surface-conforming fire geometry
//! - View pilot copy with per-group materials
//! - LOD chains with decreasing detail
//!
//! Mesh processing is delegated to a [`geomaker_mesh::MeshProcessor`];
//! every generated object is tagged for the exporter when the scene
//! supports classification.

pub mod bounds;
pub mod config;
pub mod error;
pub mod lod;
pub mod memory;
pub mod session;
pub mod shell;
pub mod tagger;

pub use bounds::BoundingVolume;
pub use config::{
    BudgetConfig, ConfigError, GeneratorConfig, LodConfig, MaterialConfig, MemoryConfig,
    ShellConfig,
};
pub use error::{BudgetWarning, GenerationReport, GeometryError, GeometryResult};
pub use lod::{LodPolicy, LodSpec, Simplification, generate_lod_chain, plan_lod_chain};
pub use memory::{NamedPoint, PlacementOutcome, PointCategories, place_memory_points};
pub use session::Session;
pub use shell::{build_box_shell, build_fire_geometry, build_view_pilot, fire_geometry_face_count};
pub use tagger::{GeometryClass, TagTable, apply_tags};
