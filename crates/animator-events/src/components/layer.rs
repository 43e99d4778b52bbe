use bytemuck::{Pod, Zeroable};

use crate::api::types::StateHash;
use crate::core::hash::hash_name;
use crate::core::time::LoopPosition;

/// Playback state of one animation layer, captured once per frame.
///
/// Four 32-bit words with no padding, so hosts can write snapshots straight
/// into linear memory (see `bridge::protocol`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LayerPlaybackSnapshot {
    /// Hash of the current state's name.
    pub state_hash: StateHash,
    /// Hash of the current state's tag.
    pub tag_hash: StateHash,
    /// Loops completed plus progress in the current loop.
    pub normalized_time: f32,
    /// Length of one loop of the state, in seconds.
    pub length: f32,
}

impl LayerPlaybackSnapshot {
    pub fn new(state_hash: StateHash, tag_hash: StateHash, normalized_time: f32, length: f32) -> Self {
        Self {
            state_hash,
            tag_hash,
            normalized_time,
            length,
        }
    }

    /// Build a snapshot from human-readable names, hashing them the same way
    /// definition matchers are hashed.
    pub fn named(state: &str, tag: &str, normalized_time: f32, length: f32) -> Self {
        Self::new(hash_name(state), hash_name(tag), normalized_time, length)
    }

    /// Split normalized time into loop count and in-loop progress.
    pub fn loop_position(&self) -> LoopPosition {
        LoopPosition::from_normalized(self.normalized_time)
    }

    /// Identifier buckets to consult for this snapshot: the state hash, then
    /// the tag hash when it differs.
    pub fn identifiers(&self) -> impl Iterator<Item = StateHash> {
        let tag = (self.tag_hash != self.state_hash).then_some(self.tag_hash);
        std::iter::once(self.state_hash).chain(tag)
    }
}

/// Capability interface over the host animation engine.
///
/// Implemented by whatever owns the animation graph. The listener only ever
/// reads from it.
pub trait PlaybackSource {
    /// Number of layers currently evaluated by the host.
    fn layer_count(&self) -> usize;

    /// Snapshot of the state playing on `layer`. Only called for `layer < layer_count()`.
    fn current_state(&self, layer: usize) -> LayerPlaybackSnapshot;
}

impl PlaybackSource for Vec<LayerPlaybackSnapshot> {
    fn layer_count(&self) -> usize {
        self.len()
    }

    fn current_state(&self, layer: usize) -> LayerPlaybackSnapshot {
        self[layer]
    }
}
