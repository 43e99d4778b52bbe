//! Stable string hashing for state names and tags.
//! 32-bit FNV-1a over UTF-8 bytes. Deterministic across platforms and runs.

use crate::api::types::StateHash;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Hash a state name or tag into the identifier space used by snapshots.
///
/// Hosts must hash their runtime state names with this same function so that
/// definition matchers and reported snapshots land in the same buckets.
pub fn hash_name(name: &str) -> StateHash {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in name.as_bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    StateHash(hash as i32)
}
