/// Linear-memory wire format shared with a browser host.
/// Host-side readers and writers must use the same layout.
///
/// All values are 32-bit little-endian words:
/// ```text
/// [Layer snapshots: layer_count × 4 words]  state_hash:i32, tag_hash:i32, normalized_time:f32, length:f32
/// [Fired events:    fired_count × 3 words]  callback:u32, layer:u32, phase:u32 (0 = enter, 1 = exit)
/// ```

use crate::api::error::{EventError, EventResult};
use crate::api::types::{FirePhase, FiredEvent};
use crate::components::layer::LayerPlaybackSnapshot;

/// Protocol version reported to the host.
pub const PROTOCOL_VERSION: u32 = 1;

/// Words per layer snapshot (fixed by the wire format).
pub const LAYER_SNAPSHOT_WORDS: usize = 4;

/// Words per fired event (fixed by the wire format).
pub const FIRED_EVENT_WORDS: usize = 3;

/// View a block of host-written words as layer snapshots, without copying.
pub fn decode_layers(words: &[u32]) -> EventResult<&[LayerPlaybackSnapshot]> {
    if words.len() % LAYER_SNAPSHOT_WORDS != 0 {
        return Err(EventError::Protocol(format!(
            "{} words is not a whole number of {}-word layer snapshots",
            words.len(),
            LAYER_SNAPSHOT_WORDS
        )));
    }
    bytemuck::try_cast_slice(words).map_err(|e| EventError::Protocol(e.to_string()))
}

/// Flatten snapshots back into words, e.g. for hosts that mirror state.
pub fn encode_layers(layers: &[LayerPlaybackSnapshot]) -> &[u32] {
    bytemuck::cast_slice(layers)
}

/// Append fired events to `out` in wire order.
pub fn encode_fired(events: &[FiredEvent], out: &mut Vec<u32>) {
    out.reserve(events.len() * FIRED_EVENT_WORDS);
    for event in events {
        out.push(event.callback.0);
        out.push(event.layer as u32);
        out.push(event.phase as u32);
    }
}
