//! Proptest generators for property-based testing.

use proptest::prelude::*;

use iblt_calibrate_core::{EncodingParams, TrialOutcome, TxId};

/// Generate a random TxId.
pub fn tx_id() -> impl Strategy<Value = TxId> {
    any::<[u8; 32]>().prop_map(TxId::from_bytes)
}

/// Generate `len` distinct TxIds, sorted.
pub fn distinct_tx_ids(len: usize) -> impl Strategy<Value = Vec<TxId>> {
    prop::collection::btree_set(tx_id(), len).prop_map(|set| set.into_iter().collect())
}

/// Generate a trial outcome.
pub fn trial_outcome() -> impl Strategy<Value = TrialOutcome> {
    (any::<bool>(), 0u64..1_000_000).prop_map(|(success, encoded_size)| TrialOutcome {
        success,
        encoded_size,
    })
}

/// Generate up to `max_len` outcomes.
pub fn outcomes(max_len: usize) -> impl Strategy<Value = Vec<TrialOutcome>> {
    prop::collection::vec(trial_outcome(), 0..=max_len)
}

/// Generate a `(low, high)` bracket with `low < high`.
pub fn bracket() -> impl Strategy<Value = (u64, u64)> {
    (0u64..1_000_000, 1u64..1_000_000).prop_map(|(low, width)| (low, low + width))
}

/// Generate plausible encoding parameters.
pub fn encoding_params() -> impl Strategy<Value = EncodingParams> {
    (1u32..=6, 1u32..=32, 0u32..=256, 0u32..=8).prop_map(
        |(hash_function_count, key_size, value_size, key_hash_size)| EncodingParams {
            hash_function_count,
            key_size,
            value_size,
            key_hash_size,
        },
    )
}

/// Generate a list of `(extra, absent)` index pairs into a pool of `pool` ids.
pub fn index_pairs(pool: usize, max_trials: usize) -> impl Strategy<Value = Vec<(Vec<usize>, Vec<usize>)>> {
    let list = prop::collection::vec(0..pool, 0..=4);
    prop::collection::vec((list.clone(), list), 1..=max_trials)
}
