//! Display sequence assignment.
//!
//! Sequences are an ordering aid only. Two strategies are available:
//! [`SequenceStrategy::MaxPlusOne`] reads the collection maximum and adds one
//! (racy under concurrent creates, duplicates possible), while
//! [`SequenceStrategy::Counter`] atomically advances a named counter that
//! never falls below the collection maximum.

use eduboard_core::error::CoreError;
use eduboard_core::types::ObjectId;

use crate::store::{Collection, DocumentStore, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SequenceStrategy {
    #[default]
    Counter,
    MaxPlusOne,
}

impl SequenceStrategy {
    /// Parse the `SEQUENCE_STRATEGY` setting (`counter` or `max`).
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "counter" => Ok(Self::Counter),
            "max" | "max_plus_one" => Ok(Self::MaxPlusOne),
            other => Err(CoreError::Validation(format!(
                "Unknown sequence strategy '{other}'. Expected counter or max"
            ))),
        }
    }
}

/// Next display sequence for `collection`. Starts at 1.
pub async fn next_sequence(
    store: &dyn DocumentStore,
    collection: Collection,
    strategy: SequenceStrategy,
) -> Result<i64, StoreError> {
    let max = store.max_sequence(collection).await?.unwrap_or(0);
    match strategy {
        SequenceStrategy::MaxPlusOne => Ok(max + 1),
        SequenceStrategy::Counter => store.next_counter(collection.table(), max).await,
    }
}

/// `count` fresh display sequences, each above every value already held in
/// `collection`.
///
/// Under [`SequenceStrategy::MaxPlusOne`] the values are handed out upwards
/// from a single read of the maximum, so one batch never repeats a value.
pub async fn fresh_sequences(
    store: &dyn DocumentStore,
    collection: Collection,
    strategy: SequenceStrategy,
    count: usize,
) -> Result<Vec<i64>, StoreError> {
    match strategy {
        SequenceStrategy::MaxPlusOne => {
            let max = store.max_sequence(collection).await?.unwrap_or(0);
            Ok((1..=count as i64).map(|n| max + n).collect())
        }
        SequenceStrategy::Counter => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(next_sequence(store, collection, strategy).await?);
            }
            Ok(values)
        }
    }
}

/// Split the sequences held by the records being reordered into the
/// distinct values that can be reused and the number of records that need a
/// fresh value (unsequenced records and every repeat of a held value).
pub fn reusable_slots(held: &[Option<i64>]) -> (Vec<i64>, usize) {
    let mut slots: Vec<i64> = held.iter().flatten().copied().collect();
    slots.sort_unstable();
    slots.dedup();
    let missing = held.len() - slots.len();
    (slots, missing)
}

/// Pair each id in `ordered` with a sequence slot so that sorting by
/// sequence reproduces `ordered`.
///
/// `slots` must be distinct. They are sorted and handed out in order.
pub fn plan_reorder(ordered: &[ObjectId], mut slots: Vec<i64>) -> Vec<(ObjectId, i64)> {
    slots.sort_unstable();
    ordered.iter().cloned().zip(slots).collect()
}
