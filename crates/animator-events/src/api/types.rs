use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Hashed state or tag identifier, as reported by the animation host.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[derive(Pod, Zeroable, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateHash(pub i32);

/// Handle returned when a definition is registered with a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId(pub u32);

/// Opaque callback handle carried by a definition.
/// The numeric value maps to host-defined behaviour; the listener never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(pub u32);

/// Which side of a state transition produced a fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FirePhase {
    /// Fired while the state was current.
    Enter = 0,
    /// Fired for the state being left on a transition.
    Exit = 1,
}

/// A definition that fired during a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredEvent {
    pub definition: DefinitionId,
    pub callback: CallbackId,
    pub layer: usize,
    /// Bucket the definition was found under (state or tag hash).
    pub identifier: StateHash,
    pub phase: FirePhase,
}

/// Outcome of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollReport {
    /// Number of layers evaluated.
    pub layers: usize,
    /// Number of callbacks delivered.
    pub fired: usize,
}
