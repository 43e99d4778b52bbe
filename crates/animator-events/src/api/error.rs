//! Error types for definition registration and source access.

use thiserror::Error;

use crate::api::types::DefinitionId;

/// Why a definition was rejected at registration time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("definition has no state or tag matchers")]
    NoMatchers,

    #[error("time offset {0} is negative")]
    NegativeTimeOffset(f32),

    #[error("time offset {0} is not a finite number")]
    NonFiniteTimeOffset(f32),

    #[error("state matcher on layer {layer} has an empty state name")]
    EmptyStateName { layer: usize },

    #[error("tag matcher has an empty tag")]
    EmptyTag,
}

/// Errors surfaced by the listener and manifest loading.
#[derive(Error, Debug)]
pub enum EventError {
    /// No playback source is bound to the listener.
    #[error("no animation playback source is bound")]
    MissingBinding,

    #[error("invalid event definition: {0}")]
    InvalidDefinition(#[from] DefinitionError),

    #[error("unknown event definition {0:?}")]
    UnknownDefinition(DefinitionId),

    #[error("layer {layer} out of range, source reports {count} layers")]
    LayerOutOfRange { layer: usize, count: usize },

    #[error("failed to parse event manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("malformed wire data: {0}")]
    Protocol(String),
}

pub type EventResult<T> = Result<T, EventError>;
