//! `wasm-bindgen` exports for driving a [`ListenerRunner`] from JavaScript.
//!
//! # Usage
//!
//! ```text
//! listener_init('{"events": [...]}');
//! // every frame:
//! listener_write_layers(words);   // layer_count × 4 words, see animator_events::bridge::protocol
//! const n = listener_poll();
//! const fired = new Uint32Array(memory.buffer, get_fired_ptr(), n * 3);
//! ```
//!
//! Calls made before `listener_init` are ignored and return empty results.

pub mod runner;

pub use runner::ListenerRunner;

use std::cell::RefCell;

use animator_events::{hash_name, EventError, PROTOCOL_VERSION};
use wasm_bindgen::prelude::*;

thread_local! {
    static RUNNER: RefCell<Option<ListenerRunner>> = const { RefCell::new(None) };
}

fn with_runner<R>(f: impl FnOnce(&mut ListenerRunner) -> R) -> Option<R> {
    RUNNER.with(|cell| {
        let mut borrow = cell.borrow_mut();
        match borrow.as_mut() {
            Some(runner) => Some(f(runner)),
            None => {
                log::warn!("listener not initialized; call listener_init() first");
                None
            }
        }
    })
}

fn to_js(err: EventError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Create the listener from a manifest. An empty string starts with no events.
#[wasm_bindgen]
pub fn listener_init(manifest_json: &str) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let runner = if manifest_json.trim().is_empty() {
        ListenerRunner::default()
    } else {
        ListenerRunner::from_manifest_json(manifest_json).map_err(to_js)?
    };
    let count = runner.definition_count();

    RUNNER.with(|cell| {
        *cell.borrow_mut() = Some(runner);
    });
    log::info!("animator-events: initialized with {} definitions", count);
    Ok(())
}

/// Add the events of a manifest. Returns the new definition ids.
#[wasm_bindgen]
pub fn listener_load_manifest(manifest_json: &str) -> Result<js_sys::Uint32Array, JsValue> {
    let ids = with_runner(|r| r.load_manifest(manifest_json))
        .transpose()
        .map_err(to_js)?
        .unwrap_or_default();
    let raw: Vec<u32> = ids.iter().map(|id| id.0).collect();
    Ok(js_sys::Uint32Array::from(&raw[..]))
}

#[wasm_bindgen]
pub fn listener_remove_definition(id: u32) -> Result<(), JsValue> {
    with_runner(|r| r.remove_definition(id))
        .transpose()
        .map_err(to_js)?;
    Ok(())
}

/// Replace this frame's layer snapshots. Returns the layer count.
#[wasm_bindgen]
pub fn listener_write_layers(words: &[u32]) -> Result<u32, JsValue> {
    let layers = with_runner(|r| r.write_layers(words))
        .transpose()
        .map_err(to_js)?
        .unwrap_or(0);
    Ok(layers as u32)
}

/// Poll once. Returns the number of fired events.
#[wasm_bindgen]
pub fn listener_poll() -> u32 {
    with_runner(|r| r.poll()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn listener_reset() {
    with_runner(|r| r.reset());
}

// ---- Data accessors ----

/// Start of the fired-event words, `FIRED_EVENT_WORDS` per event.
#[wasm_bindgen]
pub fn get_fired_ptr() -> *const u32 {
    with_runner(|r| r.fired_ptr()).unwrap_or(std::ptr::null())
}

/// Number of fired events from the last poll. The buffer at `get_fired_ptr`
/// holds `3 ×` this many words.
#[wasm_bindgen]
pub fn get_fired_count() -> u32 {
    with_runner(|r| r.fired_count()).unwrap_or(0)
}

/// Copy of the fired-event words from the last poll.
#[wasm_bindgen]
pub fn get_fired_events() -> js_sys::Uint32Array {
    with_runner(|r| js_sys::Uint32Array::from(r.fired_words()))
        .unwrap_or_else(|| js_sys::Uint32Array::new_with_length(0))
}

#[wasm_bindgen]
pub fn get_layer_count() -> u32 {
    with_runner(|r| r.layer_count()).unwrap_or(0)
}

/// Hash a state name or tag exactly as definition matchers are hashed.
#[wasm_bindgen]
pub fn hash_state_name(name: &str) -> i32 {
    hash_name(name).0
}

#[wasm_bindgen]
pub fn get_protocol_version() -> u32 {
    PROTOCOL_VERSION
}
