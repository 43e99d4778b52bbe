//! Event index: identifier hash to the definitions that react to it.

use std::collections::HashMap;
use std::rc::Rc;

use crate::api::types::{DefinitionId, StateHash};
use crate::components::definition::EventDefinition;

/// One definition filed under one identifier bucket.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: DefinitionId,
    pub definition: Rc<EventDefinition>,
    /// Layer the matcher is bound to. `None` for tag matchers.
    pub layer: Option<usize>,
}

impl IndexEntry {
    /// Whether this entry applies to a state playing on `layer`.
    pub fn applies_to(&self, layer: usize) -> bool {
        self.layer.map_or(true, |l| l == layer)
    }
}

/// Mapping from state/tag hash to definitions.
///
/// Always rebuilt from the full definition set; a definition with several
/// matchers is filed once per matcher.
#[derive(Debug, Default)]
pub struct EventIndex {
    buckets: HashMap<StateHash, Vec<IndexEntry>>,
    entries: usize,
}

impl EventIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the current mapping and file every matcher of every definition.
    pub fn rebuild<'a, I>(&mut self, definitions: I)
    where
        I: IntoIterator<Item = (DefinitionId, &'a Rc<EventDefinition>)>,
    {
        self.buckets.clear();
        self.entries = 0;

        let mut definition_count = 0;
        for (id, definition) in definitions {
            definition_count += 1;
            for matcher in &definition.matchers {
                self.buckets
                    .entry(matcher.hash())
                    .or_default()
                    .push(IndexEntry {
                        id,
                        definition: Rc::clone(definition),
                        layer: matcher.layer(),
                    });
                self.entries += 1;
            }
        }

        log::debug!(
            "event index rebuilt: {} definitions, {} entries in {} buckets",
            definition_count,
            self.entries,
            self.buckets.len()
        );
    }

    /// All entries filed under `hash`. Empty when nothing matches.
    pub fn lookup(&self, hash: StateHash) -> &[IndexEntry] {
        self.buckets.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entries under `hash` that apply to a state on `layer`.
    pub fn lookup_for_layer(
        &self,
        hash: StateHash,
        layer: usize,
    ) -> impl Iterator<Item = &IndexEntry> + '_ {
        self.lookup(hash).iter().filter(move |e| e.applies_to(layer))
    }

    /// Number of distinct identifier buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total entries across all buckets.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}
