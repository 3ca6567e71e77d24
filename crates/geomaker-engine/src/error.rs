//! Errors, budget warnings and generator reports

use std::fmt;

use geomaker_core::{ObjectId, SceneError};
use geomaker_mesh::MeshOpError;
use thiserror::Error;

use crate::config::ConfigError;

/// Generator errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Mesh operation failed: {0}")]
    Collaborator(#[from] MeshOpError),

    #[error("Mesh operation failed, '{object}' left partially built: {source}")]
    PartiallyBuilt {
        object: String,
        #[source]
        source: MeshOpError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Result type for generator operations
pub type GeometryResult<T> = Result<T, GeometryError>;

/// Advisory budget findings, never fatal
#[derive(Debug, Clone, PartialEq)]
pub enum BudgetWarning {
    /// More polygons than the exporter can take
    PolygonBudgetExceeded {
        object: String,
        polygons: usize,
        limit: usize,
    },
    /// Lowest LOD below the recommended polygon floor
    PolygonBudgetUnderrun {
        object: String,
        polygons: usize,
        minimum: usize,
    },
    /// Lowest LOD with too many material sections
    MaterialBudgetExceeded {
        object: String,
        materials: usize,
        limit: usize,
    },
}

impl fmt::Display for BudgetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PolygonBudgetExceeded { object, polygons, limit } => write!(
                f,
                "'{object}' has {polygons} polygons, which exceeds the recommended maximum of {limit}"
            ),
            Self::PolygonBudgetUnderrun { object, polygons, minimum } => write!(
                f,
                "Lowest LOD '{object}' has {polygons} polygons, recommended minimum is {minimum}"
            ),
            Self::MaterialBudgetExceeded { object, materials, limit } => write!(
                f,
                "Lowest LOD '{object}' has {materials} materials, recommended maximum is {limit}"
            ),
        }
    }
}

/// What a generator did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    /// Objects added to the scene
    pub created: Vec<ObjectId>,
    /// Existing objects that were changed
    pub modified: Vec<ObjectId>,
    /// Budget findings
    pub warnings: Vec<BudgetWarning>,
    /// User-facing note, e.g. when there was nothing to do
    pub note: Option<String>,
}

impl GenerationReport {
    /// Report with a single created object
    pub fn created(id: ObjectId) -> Self {
        Self {
            created: vec![id],
            ..Self::default()
        }
    }

    /// Record a warning and log it
    pub fn warn(&mut self, warning: BudgetWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: GenerationReport) {
        self.created.extend(other.created);
        self.modified.extend(other.modified);
        self.warnings.extend(other.warnings);
        if other.note.is_some() {
            self.note = other.note;
        }
    }

    /// Whether the generator changed nothing
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_messages() {
        let warning = BudgetWarning::PolygonBudgetExceeded {
            object: "Fire Geometry".into(),
            polygons: 49_152,
            limit: 32_768,
        };
        assert_eq!(
            warning.to_string(),
            "'Fire Geometry' has 49152 polygons, which exceeds the recommended maximum of 32768"
        );
    }

    #[test]
    fn test_report_merge() {
        let mut report = GenerationReport::created(ObjectId(1));
        let mut other = GenerationReport::created(ObjectId(2));
        other.warn(BudgetWarning::MaterialBudgetExceeded {
            object: "4".into(),
            materials: 3,
            limit: 2,
        });
        report.merge(other);
        assert_eq!(report.created, vec![ObjectId(1), ObjectId(2)]);
        assert_eq!(report.warnings.len(), 1);
        assert!(!report.is_noop());
        assert!(GenerationReport::default().is_noop());
    }

    #[test]
    fn test_collaborator_conversion() {
        let err: GeometryError = MeshOpError::EmptyTarget.into();
        assert!(matches!(err, GeometryError::Collaborator(MeshOpError::EmptyTarget)));
    }
}
