//! Per-frame reconciliation of layer playback state against the event index.
//!
//! Each layer remembers last frame's snapshot and a set of loop counters. A
//! counter holds the number of fires so far for an identifier, so a definition
//! may fire when the counter is not ahead of the current loop. A frame that
//! skips whole loops leaves the counter behind; the missed loops are then
//! caught up one fire per frame.
//!
//! Entering a new state clears every counter on that layer, not only the
//! counters of the state being left. Hosts observe this: a definition on a
//! tag shared by consecutive states fires again in the next state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::api::types::{DefinitionId, FirePhase, FiredEvent, StateHash};
use crate::components::definition::{EventDefinition, FireMode};
use crate::components::layer::LayerPlaybackSnapshot;
use crate::core::time::{wrap_offset, LoopPosition};
use crate::systems::index::{EventIndex, IndexEntry};

/// How loop counters are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterScope {
    /// One counter per identifier, shared by every definition in its bucket.
    /// The first definition to fire in a loop uses up that loop for the others.
    #[default]
    PerState,
    /// One counter per identifier and definition.
    PerDefinition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CounterKey {
    identifier: StateHash,
    definition: Option<DefinitionId>,
}

impl CounterScope {
    fn key(self, identifier: StateHash, definition: DefinitionId) -> CounterKey {
        CounterKey {
            identifier,
            definition: match self {
                CounterScope::PerState => None,
                CounterScope::PerDefinition => Some(definition),
            },
        }
    }
}

/// Tracking state for a single animation layer.
#[derive(Debug, Clone, Default)]
pub struct LayerState {
    previous: Option<LayerPlaybackSnapshot>,
    counters: HashMap<CounterKey, u32>,
}

impl LayerState {
    /// Snapshot stored at the end of the last update, if any.
    pub fn previous(&self) -> Option<&LayerPlaybackSnapshot> {
        self.previous.as_ref()
    }

    /// Number of live counters.
    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }

    fn count(&self, key: CounterKey) -> u32 {
        self.counters.get(&key).copied().unwrap_or(0)
    }

    fn clear(&mut self) {
        self.previous = None;
        self.counters.clear();
    }
}

/// Decides which definitions fire, one layer at a time.
#[derive(Debug, Clone, Default)]
pub struct PlaybackTracker {
    layers: Vec<LayerState>,
    scope: CounterScope,
}

impl PlaybackTracker {
    pub fn new(scope: CounterScope) -> Self {
        Self {
            layers: Vec::new(),
            scope,
        }
    }

    pub fn with_layers(scope: CounterScope, layer_count: usize) -> Self {
        let mut tracker = Self::new(scope);
        tracker.resize(layer_count);
        tracker
    }

    pub fn scope(&self) -> CounterScope {
        self.scope
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, layer: usize) -> Option<&LayerState> {
        self.layers.get(layer)
    }

    /// Grow or shrink per-layer storage. New layers start with no history.
    pub fn resize(&mut self, layer_count: usize) {
        if layer_count != self.layers.len() {
            log::debug!(
                "tracked layers resized: {} -> {}",
                self.layers.len(),
                layer_count
            );
            self.layers.resize_with(layer_count, LayerState::default);
        }
    }

    /// Forget every snapshot and counter. Layer storage is kept.
    pub fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
    }

    /// Current counter value for `definition` under `identifier` on `layer`.
    pub fn invocation_count(
        &self,
        layer: usize,
        identifier: StateHash,
        definition: DefinitionId,
    ) -> u32 {
        self.layers
            .get(layer)
            .map_or(0, |l| l.count(self.scope.key(identifier, definition)))
    }

    /// Reconcile one layer against this frame's snapshot.
    ///
    /// Fired definitions are appended to `fired` in evaluation order: exit
    /// fires for the state being left, then enter fires for the current state.
    /// Returns how many were appended.
    pub fn update_layer(
        &mut self,
        layer: usize,
        current: LayerPlaybackSnapshot,
        index: &EventIndex,
        fired: &mut Vec<FiredEvent>,
    ) -> usize {
        if layer >= self.layers.len() {
            self.resize(layer + 1);
        }
        let scope = self.scope;
        let state = &mut self.layers[layer];
        let before = fired.len();

        let is_new_state = state
            .previous
            .map_or(true, |prev| prev.state_hash != current.state_hash);

        if is_new_state {
            if let Some(prev) = state.previous {
                log::debug!(
                    "layer {}: state {:?} -> {:?}",
                    layer,
                    prev.state_hash,
                    current.state_hash
                );
                let pos = prev.loop_position();
                for identifier in prev.identifiers() {
                    for entry in index.lookup_for_layer(identifier, layer) {
                        let key = scope.key(identifier, entry.id);
                        let count = state.count(key);
                        if exit_eligible(entry.definition.mode, count, pos.loop_count) {
                            state.counters.insert(key, count.saturating_add(1));
                            fired.push(fire(entry, layer, identifier, FirePhase::Exit));
                        }
                    }
                }
            }
            state.counters.clear();
        }

        let pos = current.loop_position();
        for identifier in current.identifiers() {
            for entry in index.lookup_for_layer(identifier, layer) {
                let key = scope.key(identifier, entry.id);
                let count = state.count(key);
                if enter_eligible(&entry.definition, count, pos, current.length) {
                    state.counters.insert(key, count.saturating_add(1));
                    fired.push(fire(entry, layer, identifier, FirePhase::Enter));
                }
            }
        }

        state.previous = Some(current);
        fired.len() - before
    }
}

fn fire(entry: &IndexEntry, layer: usize, identifier: StateHash, phase: FirePhase) -> FiredEvent {
    log::trace!(
        "layer {}: {:?} fired {:?} (callback {:?}) under {:?}",
        layer,
        phase,
        entry.id,
        entry.definition.callback,
        identifier
    );
    FiredEvent {
        definition: entry.id,
        callback: entry.definition.callback,
        layer,
        identifier,
        phase,
    }
}

/// A state being left fires anything not yet serviced in its final loop,
/// regardless of the trigger offset.
fn exit_eligible(mode: FireMode, count: u32, loop_count: u32) -> bool {
    if mode == FireMode::Once && count > 0 {
        return false;
    }
    count <= loop_count
}

/// Fires once the trigger point of the current loop has been passed, or
/// immediately while the counter lags behind the current loop (a skipped
/// sample).
fn enter_eligible(
    definition: &EventDefinition,
    count: u32,
    pos: LoopPosition,
    length: f32,
) -> bool {
    if definition.mode == FireMode::Once && count > 0 {
        return false;
    }
    if count > pos.loop_count {
        return false;
    }

    let normalized = definition.use_normalized_time;
    let offset = wrap_offset(definition.time_offset, normalized, length);
    pos.position(normalized, length) > offset || pos.loop_count > count
}
