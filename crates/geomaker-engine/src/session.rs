//! Command surface
//!
//! A session holds the scene, the object picked as generation source and
//! the configuration, and exposes one command per generator. Every command
//! fails with `InvalidInput` and leaves the scene alone when no source is
//! selected.

use geomaker_core::{ObjectId, Scene};
use geomaker_mesh::{BasicMeshProcessor, MeshProcessor};

use crate::config::GeneratorConfig;
use crate::error::{GenerationReport, GeometryError, GeometryResult};
use crate::lod::generate_lod_chain;
use crate::memory::{PlacementOutcome, place_memory_points};
use crate::shell::{build_box_shell, build_fire_geometry, build_view_pilot};
use crate::tagger::GeometryClass;

/// Generator session
pub struct Session<P: MeshProcessor = BasicMeshProcessor> {
    scene: Scene,
    selected: Option<ObjectId>,
    config: GeneratorConfig,
    processor: P,
}

impl Session {
    /// Session over `scene` using the reference mesh processor
    pub fn new(scene: Scene) -> Self {
        Self::with_processor(scene, BasicMeshProcessor::new())
    }
}

impl<P: MeshProcessor> Session<P> {
    /// Session with a custom mesh processor
    pub fn with_processor(scene: Scene, processor: P) -> Self {
        Self {
            scene,
            selected: None,
            config: GeneratorConfig::default(),
            processor,
        }
    }

    /// Replace the configuration after validating it
    pub fn set_config(&mut self, config: GeneratorConfig) -> GeometryResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GeneratorConfig {
        &mut self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Consume the session, returning the scene
    pub fn into_scene(self) -> Scene {
        self.scene
    }

    /// Pick the generation source
    pub fn select(&mut self, id: ObjectId) -> GeometryResult<()> {
        if self.scene.object(id).is_none() {
            return Err(GeometryError::InvalidInput(format!("No object {id} in scene")));
        }
        self.selected = Some(id);
        Ok(())
    }

    /// Pick the generation source by name
    pub fn select_by_name(&mut self, name: &str) -> GeometryResult<ObjectId> {
        let id = self
            .scene
            .find_by_name(name)
            .ok_or_else(|| GeometryError::InvalidInput(format!("No object named '{name}'")))?;
        self.selected = Some(id);
        Ok(id)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<ObjectId> {
        self.selected
    }

    fn source(&self) -> GeometryResult<ObjectId> {
        self.selected
            .ok_or_else(|| GeometryError::InvalidInput("Please select an object first".into()))
    }

    /// Box collision geometry with `autocenter=0`
    pub fn create_geometry(&mut self) -> GeometryResult<GenerationReport> {
        let source = self.source()?;
        let id = build_box_shell(&mut self.scene, source, GeometryClass::Geometry, &self.config)?;
        Ok(GenerationReport::created(id))
    }

    /// Box view geometry
    pub fn create_view_geometry(&mut self) -> GeometryResult<GenerationReport> {
        let source = self.source()?;
        let id =
            build_box_shell(&mut self.scene, source, GeometryClass::ViewGeometry, &self.config)?;
        Ok(GenerationReport::created(id))
    }

    /// Tessellated fire geometry conformed to the source
    pub fn create_fire_geometry(&mut self) -> GeometryResult<GenerationReport> {
        let source = self.source()?;
        build_fire_geometry(&mut self.scene, source, &self.processor, &self.config)
    }

    /// View pilot copy with per-group materials
    pub fn create_view_pilot(&mut self) -> GeometryResult<GenerationReport> {
        let source = self.source()?;
        let id = build_view_pilot(&mut self.scene, source, &self.config)?;
        Ok(GenerationReport::created(id))
    }

    /// Memory points for the enabled categories
    pub fn create_memory_points(&mut self) -> GeometryResult<GenerationReport> {
        let source = self.source()?;
        let categories = self.config.memory.categories;
        let outcome = place_memory_points(&mut self.scene, source, categories)?;
        Ok(match outcome {
            PlacementOutcome::NoNewPoints => GenerationReport {
                note: Some("No new memory points to add".into()),
                ..GenerationReport::default()
            },
            PlacementOutcome::Placed { object, created: true, .. } => {
                GenerationReport::created(object)
            }
            PlacementOutcome::Placed { object, created: false, .. } => GenerationReport {
                modified: vec![object],
                ..GenerationReport::default()
            },
        })
    }

    /// LOD chain for the enabled levels
    pub fn create_lods(&mut self) -> GeometryResult<GenerationReport> {
        let source = self.source()?;
        generate_lod_chain(&mut self.scene, source, &self.processor, &self.config)
    }

    /// Every generator in turn, stopping at the first error
    pub fn create_all(&mut self) -> GeometryResult<GenerationReport> {
        self.source()?;
        let mut report = GenerationReport::default();
        report.merge(self.create_geometry()?);
        report.merge(self.create_view_geometry()?);
        report.merge(self.create_fire_geometry()?);
        report.merge(self.create_view_pilot()?);
        report.merge(self.create_memory_points()?);
        report.merge(self.create_lods()?);
        Ok(report)
    }
}
