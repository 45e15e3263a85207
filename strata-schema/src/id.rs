//! Document id allocation
//!
//! When a document arrives without `_id`, the allocator chooses one that
//! routes to the least-loaded active shard: it probes document counts,
//! then generates candidates until one hashes into that shard (bounded
//! retries, last candidate wins). Shard probe failures are tolerated by
//! skipping the shard.

use crate::error::{Error, Result};
use crate::shard::{Shard, ShardSet};
use crate::specification::Specification;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use strata_core::{serialise, uuids, FieldType};
use tracing::trace;
use uuid::Uuid;

const MAX_CANDIDATES: usize = 10;

/// Shard a serialised id term routes to.
pub fn shard_for(term: &[u8], n_shards: usize) -> usize {
    (serialise::fnv1a64(term) % n_shards as u64) as usize
}

/// Index of the least-loaded active shard, if any is probeable.
fn least_loaded<S: Shard>(shards: &ShardSet<S>) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (n, shard) in shards.iter().enumerate() {
        if !shard.is_active() {
            continue;
        }
        // A failed probe just skips the candidate shard.
        let Ok(count) = shard.doccount() else {
            continue;
        };
        if best.is_none_or(|(_, best_count)| count < best_count) {
            best = Some((n, count));
        }
    }
    best.map(|(n, _)| n)
}

/// Choose an id value for a document that did not supply one.
///
/// Returns the document-facing id value and its serialised bytes.
pub fn allocate<S: Shard>(spc_id: &Specification, shards: &ShardSet<S>) -> Result<(Value, Vec<u8>)> {
    match spc_id.sep_types.concrete_type() {
        // The storage layer assigns numeric ids through its own counter;
        // zero requests that.
        FieldType::Integer => Ok((json!(0), serialise::integer(0))),
        FieldType::Positive | FieldType::Floating => Ok((json!(0), serialise::positive(0))),
        FieldType::Uuid | FieldType::Empty => {
            allocate_routed(shards, || {
                let uuid = Uuid::new_v4();
                (
                    json!(uuids::canonical(&uuid)),
                    uuid.as_bytes().to_vec(),
                )
            })
        }
        FieldType::Keyword | FieldType::Text | FieldType::String => {
            let bool_term = spc_id.flags.bool_term;
            allocate_routed(shards, move || {
                let encoded = URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes());
                let serialised = serialise::keyword(&encoded, bool_term);
                (json!(encoded), serialised)
            })
        }
        other => Err(Error::client(format!(
            "Cannot generate an id of type {other}"
        ))),
    }
}

fn allocate_routed<S, F>(shards: &ShardSet<S>, generate: F) -> Result<(Value, Vec<u8>)>
where
    S: Shard,
    F: Fn() -> (Value, Vec<u8>),
{
    if shards.is_empty() {
        return Ok(generate());
    }
    let target = least_loaded(shards);
    let mut last = generate();
    if let Some(target) = target {
        for attempt in 1..MAX_CANDIDATES {
            let candidate_shard = shard_for(&last.1, shards.len());
            if candidate_shard == target {
                trace!(attempt, shard = candidate_shard, "id routed to target shard");
                return Ok(last);
            }
            last = generate();
        }
        trace!(shard = shard_for(&last.1, shards.len()), "id routing gave up, keeping last candidate");
    }
    Ok(last)
}
