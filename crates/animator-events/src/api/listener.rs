use std::convert::Infallible;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::api::error::{EventError, EventResult};
use crate::api::types::{DefinitionId, FiredEvent, PollReport};
use crate::assets::manifest::EventManifest;
use crate::components::definition::EventDefinition;
use crate::components::layer::{LayerPlaybackSnapshot, PlaybackSource};
use crate::systems::index::EventIndex;
use crate::systems::tracker::{CounterScope, PlaybackTracker};

/// Configuration for a listener, provided by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// How loop counters are keyed (default: per state).
    pub counter_scope: CounterScope,
    /// Layer storage reserved up front (default: 1). Grows on demand.
    pub initial_layers: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            counter_scope: CounterScope::PerState,
            initial_layers: 1,
        }
    }
}

impl ListenerConfig {
    /// Parse a config from a JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Receives fired events during a poll.
///
/// An error returned here aborts the poll and is handed back to the caller
/// unchanged. Events already decided for the current layer but not yet
/// delivered are dropped; their counters have already advanced.
pub trait EventSink {
    type Error;

    fn deliver(&mut self, event: &FiredEvent) -> Result<(), Self::Error>;
}

impl<F, E> EventSink for F
where
    F: FnMut(&FiredEvent) -> Result<(), E>,
{
    type Error = E;

    fn deliver(&mut self, event: &FiredEvent) -> Result<(), E> {
        self(event)
    }
}

/// Watches one animated object and raises callbacks as its playback crosses
/// registered trigger points.
///
/// Call [`Listener::poll`] once per frame from the thread that owns the host
/// animation state. Definition changes happen between polls: the sink is
/// borrowed separately from the listener, so callbacks cannot mutate it
/// mid-poll. Queue such changes and apply them after `poll` returns.
pub struct Listener<S> {
    source: Option<S>,
    definitions: Vec<(DefinitionId, Rc<EventDefinition>)>,
    index: EventIndex,
    tracker: PlaybackTracker,
    config: ListenerConfig,
    next_id: u32,
    /// Per-layer scratch buffer, reused across frames.
    fired: Vec<FiredEvent>,
}

impl<S: PlaybackSource> Listener<S> {
    /// Create an unbound listener with no definitions.
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            source: None,
            definitions: Vec::new(),
            index: EventIndex::new(),
            tracker: PlaybackTracker::with_layers(config.counter_scope, config.initial_layers),
            config,
            next_id: 0,
            fired: Vec::with_capacity(8),
        }
    }

    /// Create a listener bound to `source`.
    pub fn with_source(source: S, config: ListenerConfig) -> Self {
        let mut listener = Self::new(config);
        listener.source = Some(source);
        listener
    }

    /// Create a listener from a parsed manifest: its config and all its events.
    pub fn from_manifest(manifest: &EventManifest) -> EventResult<Self> {
        let mut listener = Self::new(manifest.config.clone());
        listener.load_manifest(manifest)?;
        Ok(listener)
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    // -- Source binding --

    /// Bind a playback source. Tracking history from any previous source is
    /// discarded. Returns the previously bound source.
    pub fn bind(&mut self, source: S) -> Option<S> {
        let previous = self.source.replace(source);
        if previous.is_some() {
            self.tracker.reset();
        }
        previous
    }

    /// Detach the playback source. Polling becomes a no-op.
    pub fn unbind(&mut self) -> Option<S> {
        self.tracker.reset();
        self.source.take()
    }

    pub fn is_bound(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> EventResult<&S> {
        self.source.as_ref().ok_or(EventError::MissingBinding)
    }

    pub fn source_mut(&mut self) -> EventResult<&mut S> {
        self.source.as_mut().ok_or(EventError::MissingBinding)
    }

    /// Layer count reported by the bound source.
    pub fn layer_count(&self) -> EventResult<usize> {
        Ok(self.source()?.layer_count())
    }

    /// Snapshot of `layer` from the bound source.
    pub fn current_snapshot(&self, layer: usize) -> EventResult<LayerPlaybackSnapshot> {
        let source = self.source()?;
        let count = source.layer_count();
        if layer >= count {
            return Err(EventError::LayerOutOfRange { layer, count });
        }
        Ok(source.current_state(layer))
    }

    // -- Definitions --

    /// Validate and register a definition. Rebuilds the index.
    pub fn add_definition(&mut self, definition: EventDefinition) -> EventResult<DefinitionId> {
        definition.validate()?;
        let id = self.push_definition(definition);
        self.rebuild_index();
        Ok(id)
    }

    /// Register several definitions with a single index rebuild.
    /// Nothing is registered if any of them is invalid.
    pub fn add_definitions<I>(&mut self, definitions: I) -> EventResult<Vec<DefinitionId>>
    where
        I: IntoIterator<Item = EventDefinition>,
    {
        let definitions: Vec<_> = definitions.into_iter().collect();
        for (i, definition) in definitions.iter().enumerate() {
            if let Err(e) = definition.validate() {
                log::warn!("rejected event definition #{}: {}", i, e);
                return Err(e.into());
            }
        }
        let ids = definitions
            .into_iter()
            .map(|d| self.push_definition(d))
            .collect();
        self.rebuild_index();
        Ok(ids)
    }

    /// Register every event of a manifest. The manifest's config is not applied.
    pub fn load_manifest(&mut self, manifest: &EventManifest) -> EventResult<Vec<DefinitionId>> {
        self.add_definitions(manifest.events.iter().cloned())
    }

    /// Unregister a definition. Rebuilds the index.
    pub fn remove_definition(&mut self, id: DefinitionId) -> EventResult<Rc<EventDefinition>> {
        let pos = self
            .definitions
            .iter()
            .position(|(d, _)| *d == id)
            .ok_or(EventError::UnknownDefinition(id))?;
        let (_, definition) = self.definitions.remove(pos);
        log::debug!("removed event definition {:?}", id);
        self.rebuild_index();
        Ok(definition)
    }

    /// Unregister every definition. Tracking history is kept.
    pub fn clear_definitions(&mut self) {
        self.definitions.clear();
        self.rebuild_index();
    }

    pub fn definition(&self, id: DefinitionId) -> Option<&EventDefinition> {
        self.definitions
            .iter()
            .find(|(d, _)| *d == id)
            .map(|(_, def)| def.as_ref())
    }

    /// Registered definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = (DefinitionId, &EventDefinition)> {
        self.definitions.iter().map(|(id, def)| (*id, def.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn index(&self) -> &EventIndex {
        &self.index
    }

    pub fn tracker(&self) -> &PlaybackTracker {
        &self.tracker
    }

    fn push_definition(&mut self, definition: EventDefinition) -> DefinitionId {
        let id = DefinitionId(self.next_id);
        self.next_id += 1;
        log::debug!("registered event definition {:?} ({:?})", id, definition.callback);
        self.definitions.push((id, Rc::new(definition)));
        id
    }

    fn rebuild_index(&mut self) {
        self.index
            .rebuild(self.definitions.iter().map(|(id, def)| (*id, def)));
    }

    // -- Per-frame --

    /// Forget all counters and previous snapshots. Definitions are kept.
    /// Use when the tracked object is re-enabled or otherwise restarted.
    pub fn reset(&mut self) {
        log::debug!("listener reset");
        self.tracker.reset();
    }

    /// Poll the bound source and deliver fired events to `sink`.
    /// Does nothing when no source is bound.
    pub fn poll<K: EventSink>(&mut self, sink: &mut K) -> Result<PollReport, K::Error> {
        let Some(source) = self.source.take() else {
            log::trace!("poll skipped: no playback source bound");
            return Ok(PollReport::default());
        };
        let result = self.poll_layers(
            source.layer_count(),
            |layer| source.current_state(layer),
            sink,
        );
        self.source = Some(source);
        result
    }

    /// Poll the bound source and return every fired event.
    pub fn poll_collect(&mut self) -> Vec<FiredEvent> {
        let mut out = Vec::new();
        let mut sink = |event: &FiredEvent| -> Result<(), Infallible> {
            out.push(*event);
            Ok(())
        };
        if let Err(never) = self.poll(&mut sink) {
            match never {}
        }
        out
    }

    /// Evaluate `layer_count` layers, fetching each snapshot from `provider`.
    ///
    /// Layer storage follows `layer_count`: layers beyond it are dropped and
    /// new layers start without history.
    pub fn poll_layers<P, K>(
        &mut self,
        layer_count: usize,
        mut provider: P,
        sink: &mut K,
    ) -> Result<PollReport, K::Error>
    where
        P: FnMut(usize) -> LayerPlaybackSnapshot,
        K: EventSink,
    {
        self.tracker.resize(layer_count);

        let mut report = PollReport {
            layers: layer_count,
            fired: 0,
        };
        for layer in 0..layer_count {
            let snapshot = provider(layer);
            self.fired.clear();
            self.tracker
                .update_layer(layer, snapshot, &self.index, &mut self.fired);
            for event in &self.fired {
                sink.deliver(event)?;
                report.fired += 1;
            }
        }
        Ok(report)
    }
}

impl<S: PlaybackSource> Default for Listener<S> {
    fn default() -> Self {
        Self::new(ListenerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{CallbackId, FirePhase};
    use crate::core::hash::hash_name;

    /// Scripted animation host: one snapshot per layer, edited between frames.
    #[derive(Default)]
    struct FakeAnimator {
        layers: Vec<LayerPlaybackSnapshot>,
    }

    impl FakeAnimator {
        fn play(&mut self, layer: usize, state: &str, tag: &str, t: f32, length: f32) {
            if self.layers.len() <= layer {
                self.layers.resize(layer + 1, LayerPlaybackSnapshot::default());
            }
            self.layers[layer] = LayerPlaybackSnapshot::named(state, tag, t, length);
        }
    }

    impl PlaybackSource for FakeAnimator {
        fn layer_count(&self) -> usize {
            self.layers.len()
        }

        fn current_state(&self, layer: usize) -> LayerPlaybackSnapshot {
            self.layers[layer]
        }
    }

    fn callbacks(events: &[FiredEvent]) -> Vec<u32> {
        events.iter().map(|e| e.callback.0).collect()
    }

    fn bound() -> Listener<FakeAnimator> {
        Listener::with_source(FakeAnimator::default(), ListenerConfig::default())
    }

    #[test]
    fn idle_scenario_through_listener() {
        let mut listener = bound();
        listener
            .add_definition(EventDefinition::new(CallbackId(1)).on_tag("Idle").at_seconds(1.0))
            .unwrap();

        let mut fired = Vec::new();
        for t in [0.0, 0.3, 0.6, 0.8, 1.1, 1.6] {
            listener.source_mut().unwrap().play(0, "A", "Idle", t, 2.0);
            fired.push(callbacks(&listener.poll_collect()));
        }
        let empty: Vec<u32> = Vec::new();
        assert_eq!(
            fired,
            vec![empty.clone(), empty.clone(), vec![1], empty.clone(), empty, vec![1]]
        );
    }

    #[test]
    fn unbound_poll_is_a_no_op() {
        let mut listener: Listener<FakeAnimator> = Listener::default();
        listener
            .add_definition(EventDefinition::new(CallbackId(1)).on_tag("Idle"))
            .unwrap();
        assert!(listener.poll_collect().is_empty());
    }

    #[test]
    fn unbound_queries_fail_fast() {
        let listener: Listener<FakeAnimator> = Listener::default();
        assert!(matches!(listener.layer_count(), Err(EventError::MissingBinding)));
        assert!(matches!(listener.current_snapshot(0), Err(EventError::MissingBinding)));
        assert!(matches!(listener.source(), Err(EventError::MissingBinding)));
    }

    #[test]
    fn snapshot_query_checks_layer_range() {
        let mut listener = bound();
        listener.source_mut().unwrap().play(0, "A", "", 0.0, 1.0);
        assert!(listener.current_snapshot(0).is_ok());
        assert!(matches!(
            listener.current_snapshot(3),
            Err(EventError::LayerOutOfRange { layer: 3, count: 1 })
        ));
    }

    #[test]
    fn invalid_definitions_are_rejected() {
        let mut listener = bound();
        let err = listener
            .add_definition(EventDefinition::new(CallbackId(1)))
            .unwrap_err();
        assert!(matches!(err, EventError::InvalidDefinition(_)));

        let err = listener
            .add_definitions(vec![
                EventDefinition::new(CallbackId(1)).on_tag("Ok"),
                EventDefinition::new(CallbackId(2)).on_tag("Bad").at_seconds(-1.0),
            ])
            .unwrap_err();
        assert!(matches!(err, EventError::InvalidDefinition(_)));
        assert!(listener.is_empty());
    }

    #[test]
    fn removing_a_definition_stops_it_firing() {
        let mut listener = bound();
        let keep = listener
            .add_definition(EventDefinition::new(CallbackId(1)).on_tag("Idle").at_normalized(0.5))
            .unwrap();
        let drop = listener
            .add_definition(EventDefinition::new(CallbackId(2)).on_tag("Loop").at_normalized(0.5))
            .unwrap();

        listener.remove_definition(drop).unwrap();
        assert!(listener.definition(drop).is_none());
        assert!(listener.definition(keep).is_some());
        assert!(listener.index().lookup(hash_name("Loop")).is_empty());
        assert!(matches!(
            listener.remove_definition(drop),
            Err(EventError::UnknownDefinition(_))
        ));

        listener.source_mut().unwrap().play(0, "A", "Loop", 0.7, 1.0);
        assert!(listener.poll_collect().is_empty());
    }

    #[test]
    fn reset_keeps_definitions_and_replays() {
        let mut listener = bound();
        listener
            .add_definition(EventDefinition::new(CallbackId(1)).on_tag("Idle").once().at_normalized(0.2))
            .unwrap();

        listener.source_mut().unwrap().play(0, "A", "Idle", 0.5, 1.0);
        assert_eq!(callbacks(&listener.poll_collect()), vec![1]);
        assert!(listener.poll_collect().is_empty());

        listener.reset();
        assert_eq!(listener.len(), 1);
        assert_eq!(callbacks(&listener.poll_collect()), vec![1]);
    }

    #[test]
    fn layer_count_changes_resize_storage() {
        let mut listener = bound();
        listener
            .add_definition(EventDefinition::new(CallbackId(1)).on_tag("Upper").at_normalized(0.1))
            .unwrap();

        listener.source_mut().unwrap().play(0, "Idle", "", 0.5, 1.0);
        listener.poll_collect();
        assert_eq!(listener.tracker().layer_count(), 1);

        listener.source_mut().unwrap().play(2, "Wave", "Upper", 0.5, 1.0);
        let fired = listener.poll_collect();
        assert_eq!(listener.tracker().layer_count(), 3);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].layer, 2);

        listener.source_mut().unwrap().layers.truncate(1);
        let report = listener.poll(&mut |_: &FiredEvent| Ok::<(), Infallible>(())).unwrap();
        assert_eq!(report.layers, 1);
        assert_eq!(listener.tracker().layer_count(), 1);
    }

    #[test]
    fn sink_error_propagates_unchanged() {
        #[derive(Debug, PartialEq)]
        struct Boom(u32);

        let mut listener = bound();
        listener
            .add_definition(EventDefinition::new(CallbackId(9)).on_tag("Idle").at_normalized(0.1))
            .unwrap();
        listener.source_mut().unwrap().play(0, "A", "Idle", 0.5, 1.0);

        let result = listener.poll(&mut |e: &FiredEvent| -> Result<(), Boom> { Err(Boom(e.callback.0)) });
        assert_eq!(result, Err(Boom(9)));
        // Source is still bound after the failed poll.
        assert!(listener.is_bound());
    }

    #[test]
    fn poll_layers_without_a_source() {
        let mut listener: Listener<FakeAnimator> = Listener::default();
        listener
            .add_definition(EventDefinition::new(CallbackId(3)).on_state(1, "Reload").once().at_seconds(0.25))
            .unwrap();

        let snaps = [
            LayerPlaybackSnapshot::named("Idle", "", 0.4, 1.0),
            LayerPlaybackSnapshot::named("Reload", "", 0.5, 1.0),
        ];
        let mut seen = Vec::new();
        let report = listener
            .poll_layers(2, |layer| snaps[layer], &mut |e: &FiredEvent| {
                seen.push(*e);
                Ok::<(), Infallible>(())
            })
            .unwrap();
        assert_eq!(report, PollReport { layers: 2, fired: 1 });
        assert_eq!(seen[0].phase, FirePhase::Enter);
        assert_eq!(seen[0].layer, 1);
    }

    #[test]
    fn exit_event_fires_on_transition() {
        let mut listener = bound();
        listener
            .add_definition(EventDefinition::new(CallbackId(4)).on_state(0, "Charge").once().at_normalized(0.95))
            .unwrap();

        listener.source_mut().unwrap().play(0, "Charge", "", 0.4, 1.5);
        assert!(listener.poll_collect().is_empty());

        listener.source_mut().unwrap().play(0, "Release", "", 0.0, 0.5);
        let fired = listener.poll_collect();
        assert_eq!(callbacks(&fired), vec![4]);
        assert_eq!(fired[0].phase, FirePhase::Exit);
    }

    #[test]
    fn rebinding_discards_history() {
        let mut listener = bound();
        listener
            .add_definition(EventDefinition::new(CallbackId(1)).on_tag("Idle").once().at_normalized(0.1))
            .unwrap();
        listener.source_mut().unwrap().play(0, "A", "Idle", 0.5, 1.0);
        assert_eq!(listener.poll_collect().len(), 1);

        let mut other = FakeAnimator::default();
        other.play(0, "A", "Idle", 0.5, 1.0);
        assert!(listener.bind(other).is_some());
        assert_eq!(listener.poll_collect().len(), 1);
    }
}
