pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod bridge;
pub mod assets;

// Re-export key types at crate root for convenience
pub use api::error::{DefinitionError, EventError, EventResult};
pub use api::listener::{EventSink, Listener, ListenerConfig};
pub use api::types::{CallbackId, DefinitionId, FirePhase, FiredEvent, PollReport, StateHash};
pub use assets::manifest::EventManifest;
pub use components::definition::{EventDefinition, FireMode, StateMatcher};
pub use components::layer::{LayerPlaybackSnapshot, PlaybackSource};
pub use crate::core::hash::hash_name;
pub use crate::core::time::LoopPosition;
pub use systems::index::{EventIndex, IndexEntry};
pub use systems::tracker::{CounterScope, LayerState, PlaybackTracker};
pub use bridge::protocol::{FIRED_EVENT_WORDS, LAYER_SNAPSHOT_WORDS, PROTOCOL_VERSION};
