//! Event definitions: what to match, when to fire, and which callback to raise.

use serde::{Deserialize, Serialize};

use crate::api::error::DefinitionError;
use crate::api::types::{CallbackId, StateHash};
use crate::core::hash::hash_name;

/// How often a definition may fire while its state stays current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FireMode {
    /// Fire once in every loop of the state.
    #[default]
    Always,
    /// Fire a single time while the state stays current. Leaving and
    /// re-entering the state, or resetting the listener, arms it again.
    Once,
}

/// Selects the states a definition applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateMatcher {
    /// A named state on one specific layer.
    State { layer: usize, name: String },
    /// Any state carrying this tag, on any layer.
    Tag { tag: String },
}

impl StateMatcher {
    pub fn state(layer: usize, name: impl Into<String>) -> Self {
        StateMatcher::State {
            layer,
            name: name.into(),
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        StateMatcher::Tag { tag: tag.into() }
    }

    /// Identifier bucket this matcher is indexed under.
    pub fn hash(&self) -> StateHash {
        match self {
            StateMatcher::State { name, .. } => hash_name(name),
            StateMatcher::Tag { tag } => hash_name(tag),
        }
    }

    /// Layer restriction, if any. Tag matchers apply on every layer.
    pub fn layer(&self) -> Option<usize> {
        match self {
            StateMatcher::State { layer, .. } => Some(*layer),
            StateMatcher::Tag { .. } => None,
        }
    }
}

/// A single trigger point on one or more animation states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    /// States and tags this definition applies to.
    #[serde(alias = "states")]
    pub matchers: Vec<StateMatcher>,
    #[serde(default)]
    pub mode: FireMode,
    /// Interpret `time_offset` as a fraction of one loop instead of seconds.
    #[serde(default)]
    pub use_normalized_time: bool,
    /// Trigger point inside each loop.
    #[serde(default, alias = "time")]
    pub time_offset: f32,
    pub callback: CallbackId,
}

impl EventDefinition {
    /// Create a definition with no matchers, firing every loop at offset zero.
    pub fn new(callback: CallbackId) -> Self {
        Self {
            matchers: Vec::new(),
            mode: FireMode::Always,
            use_normalized_time: false,
            time_offset: 0.0,
            callback,
        }
    }

    // -- Builder methods --

    pub fn on_state(mut self, layer: usize, name: impl Into<String>) -> Self {
        self.matchers.push(StateMatcher::state(layer, name));
        self
    }

    pub fn on_tag(mut self, tag: impl Into<String>) -> Self {
        self.matchers.push(StateMatcher::tag(tag));
        self
    }

    pub fn with_mode(mut self, mode: FireMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn once(self) -> Self {
        self.with_mode(FireMode::Once)
    }

    /// Trigger `seconds` into each loop.
    pub fn at_seconds(mut self, seconds: f32) -> Self {
        self.use_normalized_time = false;
        self.time_offset = seconds;
        self
    }

    /// Trigger at `fraction` of each loop.
    pub fn at_normalized(mut self, fraction: f32) -> Self {
        self.use_normalized_time = true;
        self.time_offset = fraction;
        self
    }

    /// Check registration invariants.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.matchers.is_empty() {
            return Err(DefinitionError::NoMatchers);
        }
        if !self.time_offset.is_finite() {
            return Err(DefinitionError::NonFiniteTimeOffset(self.time_offset));
        }
        if self.time_offset < 0.0 {
            return Err(DefinitionError::NegativeTimeOffset(self.time_offset));
        }
        for matcher in &self.matchers {
            match matcher {
                StateMatcher::State { layer, name } if name.is_empty() => {
                    return Err(DefinitionError::EmptyStateName { layer: *layer });
                }
                StateMatcher::Tag { tag } if tag.is_empty() => {
                    return Err(DefinitionError::EmptyTag);
                }
                _ => {}
            }
        }
        Ok(())
    }
}
