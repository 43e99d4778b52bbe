use std::convert::Infallible;

use animator_events::bridge::protocol::{decode_layers, encode_fired, FIRED_EVENT_WORDS};
use animator_events::{
    DefinitionId, EventManifest, EventResult, FiredEvent, LayerPlaybackSnapshot, Listener,
    ListenerConfig,
};

/// Listener wired up for a browser host.
///
/// The host writes every layer's snapshot as a block of words each frame,
/// calls `poll`, then reads fired events back from linear memory. The
/// exported free functions in `lib.rs` wrap a thread-local instance, because
/// wasm-bindgen cannot export a stateful listener generically.
pub struct ListenerRunner {
    listener: Listener<Vec<LayerPlaybackSnapshot>>,
    fired: Vec<FiredEvent>,
    /// Flat buffer of fired events for linear-memory reads.
    fired_words: Vec<u32>,
}

impl ListenerRunner {
    pub fn new(config: ListenerConfig) -> Self {
        let layers = Vec::with_capacity(config.initial_layers);
        Self {
            listener: Listener::with_source(layers, config),
            fired: Vec::with_capacity(16),
            fired_words: Vec::with_capacity(16 * FIRED_EVENT_WORDS),
        }
    }

    /// Build a runner from a manifest: its config and all its events.
    pub fn from_manifest_json(json: &str) -> EventResult<Self> {
        let manifest = EventManifest::from_json(json)?;
        let mut runner = Self::new(manifest.config.clone());
        runner.listener.load_manifest(&manifest)?;
        Ok(runner)
    }

    /// Add the events of a manifest. Its config section is ignored.
    pub fn load_manifest(&mut self, json: &str) -> EventResult<Vec<DefinitionId>> {
        let manifest = EventManifest::from_json(json)?;
        self.listener.load_manifest(&manifest)
    }

    pub fn remove_definition(&mut self, id: u32) -> EventResult<()> {
        self.listener.remove_definition(DefinitionId(id))?;
        Ok(())
    }

    /// Replace this frame's layer snapshots with host-written words.
    /// Returns the number of layers now reported.
    pub fn write_layers(&mut self, words: &[u32]) -> EventResult<usize> {
        let decoded = decode_layers(words)?;
        let layers = self.listener.source_mut()?;
        layers.clear();
        layers.extend_from_slice(decoded);
        Ok(layers.len())
    }

    /// Run one poll over the last written layers. Returns the number of fired events.
    pub fn poll(&mut self) -> u32 {
        self.fired.clear();
        let fired = &mut self.fired;
        let result = self.listener.poll(&mut |event: &FiredEvent| -> Result<(), Infallible> {
            fired.push(*event);
            Ok(())
        });
        if let Err(never) = result {
            match never {}
        }

        self.fired_words.clear();
        encode_fired(&self.fired, &mut self.fired_words);
        self.fired.len() as u32
    }

    pub fn reset(&mut self) {
        self.listener.reset();
        self.fired.clear();
        self.fired_words.clear();
    }

    // ---- Pointer accessors for linear-memory reads ----

    pub fn fired_ptr(&self) -> *const u32 {
        self.fired_words.as_ptr()
    }

    /// Number of fired events (not words) from the last poll.
    pub fn fired_count(&self) -> u32 {
        self.fired.len() as u32
    }

    pub fn fired_words(&self) -> &[u32] {
        &self.fired_words
    }

    pub fn fired(&self) -> &[FiredEvent] {
        &self.fired
    }

    pub fn layer_count(&self) -> u32 {
        self.listener.layer_count().unwrap_or(0) as u32
    }

    pub fn definition_count(&self) -> u32 {
        self.listener.len() as u32
    }
}

impl Default for ListenerRunner {
    fn default() -> Self {
        Self::new(ListenerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use animator_events::bridge::protocol::encode_layers;
    use animator_events::{EventError, FirePhase};

    const MANIFEST: &str = r#"{
        "events": [
            {
                "states": [{ "kind": "tag", "tag": "Step" }],
                "use_normalized_time": true,
                "time": 0.5,
                "callback": 11
            },
            {
                "states": [{ "kind": "state", "layer": 0, "name": "Jump" }],
                "mode": "Once",
                "time": 0.9,
                "callback": 12
            }
        ]
    }"#;

    fn frame(runner: &mut ListenerRunner, layers: &[LayerPlaybackSnapshot]) -> Vec<u32> {
        runner.write_layers(encode_layers(layers)).unwrap();
        runner.poll();
        runner.fired_words().to_vec()
    }

    #[test]
    fn poll_packs_fired_events() {
        let mut runner = ListenerRunner::from_manifest_json(MANIFEST).unwrap();
        assert_eq!(runner.definition_count(), 2);

        let walk = |t| LayerPlaybackSnapshot::named("Walk", "Step", t, 0.6);
        assert!(frame(&mut runner, &[walk(0.2)]).is_empty());
        assert_eq!(frame(&mut runner, &[walk(0.7)]), vec![11, 0, FirePhase::Enter as u32]);
        assert_eq!(runner.fired_count(), 1);
        assert_eq!(
            runner.fired_words().len(),
            runner.fired_count() as usize * FIRED_EVENT_WORDS
        );
        assert_eq!(runner.layer_count(), 1);
    }

    #[test]
    fn transition_reports_exit_phase() {
        let mut runner = ListenerRunner::from_manifest_json(MANIFEST).unwrap();
        frame(&mut runner, &[LayerPlaybackSnapshot::named("Jump", "", 0.3, 1.0)]);
        let words = frame(&mut runner, &[LayerPlaybackSnapshot::named("Land", "", 0.0, 0.4)]);
        assert_eq!(words, vec![12, 0, FirePhase::Exit as u32]);
    }

    #[test]
    fn partial_words_are_rejected() {
        let mut runner = ListenerRunner::default();
        assert!(matches!(runner.write_layers(&[1, 2, 3]), Err(EventError::Protocol(_))));
    }

    #[test]
    fn reset_clears_last_frame_output() {
        let mut runner = ListenerRunner::from_manifest_json(MANIFEST).unwrap();
        frame(&mut runner, &[LayerPlaybackSnapshot::named("Walk", "Step", 0.7, 0.6)]);
        assert_eq!(runner.fired_count(), 1);
        runner.reset();
        assert_eq!(runner.fired_count(), 0);
        assert!(runner.fired_words().is_empty());
    }

    #[test]
    fn load_and_remove_definitions() {
        let mut runner = ListenerRunner::default();
        let ids = runner.load_manifest(MANIFEST).unwrap();
        assert_eq!(ids.len(), 2);
        runner.remove_definition(ids[0].0).unwrap();
        assert_eq!(runner.definition_count(), 1);
        assert!(matches!(
            runner.remove_definition(ids[0].0),
            Err(EventError::UnknownDefinition(_))
        ));
    }
}
