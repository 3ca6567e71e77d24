//! Exporter classification metadata
//!
//! Per-object properties consumed by the model exporter. The engine only
//! writes them; their meaning belongs to the exporter.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Classification attached to a scene object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Object takes part in export
    pub exportable: bool,
    /// Level-of-detail discriminator, kept as the exporter's string form
    pub lod: String,
    /// View distance for visual LODs
    pub lod_distance: f32,
    /// Object mass
    pub mass: f32,
    /// Mass weight factor
    pub weight: f32,
    /// Named properties in insertion order
    #[serde(default)]
    pub named_props: IndexMap<String, String>,
}

impl Classification {
    /// Set or overwrite a named property, returns whether anything changed
    pub fn set_named_prop(&mut self, name: &str, value: &str) -> bool {
        match self.named_props.get(name) {
            Some(existing) if existing == value => false,
            _ => {
                self.named_props.insert(name.to_string(), value.to_string());
                true
            }
        }
    }

    /// Look up a named property
    pub fn named_prop(&self, name: &str) -> Option<&str> {
        self.named_props.get(name).map(String::as_str)
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            exportable: false,
            lod: String::from("-1.0"),
            lod_distance: 0.0,
            mass: 0.0,
            weight: 0.0,
            named_props: IndexMap::new(),
        }
    }
}
