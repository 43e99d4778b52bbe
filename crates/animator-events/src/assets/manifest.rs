use serde::{Deserialize, Serialize};

use crate::api::error::EventResult;
use crate::api::listener::ListenerConfig;
use crate::components::definition::EventDefinition;

/// Event manifest describing the trigger points for one animated object.
/// Loaded from a JSON file at runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventManifest {
    /// Listener configuration.
    #[serde(default)]
    pub config: ListenerConfig,
    /// Event definitions, in registration order.
    #[serde(default)]
    pub events: Vec<EventDefinition>,
}

impl EventManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize back to pretty JSON, e.g. for authoring tools.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check every event against registration invariants.
    pub fn validate(&self) -> EventResult<()> {
        for (i, event) in self.events.iter().enumerate() {
            if let Err(e) = event.validate() {
                log::warn!("manifest event #{} is invalid: {}", i, e);
                return Err(e.into());
            }
        }
        Ok(())
    }
}
