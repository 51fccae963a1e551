//! Named monotonic counters backing sequence assignment.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A `counters` row.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CounterValue {
    pub name: String,
    pub value: i64,
}
