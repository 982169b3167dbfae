//! Stable operation ordering for deterministic processing.

use crate::domain::OperationRecord;

/// Stable ordering key for operations.
///
/// Ordering: timestamp -> sequence_index (input position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OperationOrderingKey {
    /// Time in milliseconds (primary sort).
    pub time_ms: i64,
    /// Input position (tie-break).
    pub sequence_index: usize,
}

impl OperationOrderingKey {
    pub fn from_operation(op: &OperationRecord) -> Self {
        OperationOrderingKey {
            time_ms: op.timestamp.as_i64(),
            sequence_index: op.sequence_index,
        }
    }
}

/// Returns true if the operations are already in processing order.
pub fn is_sorted_deterministic(ops: &[OperationRecord]) -> bool {
    ops.windows(2).all(|pair| {
        OperationOrderingKey::from_operation(&pair[0]) <= OperationOrderingKey::from_operation(&pair[1])
    })
}

/// Sort operations deterministically; returns how many rows changed position.
pub fn sort_operations_deterministic(ops: &mut [OperationRecord]) -> usize {
    if is_sorted_deterministic(ops) {
        return 0;
    }
    let before: Vec<usize> = ops.iter().map(|op| op.sequence_index).collect();
    ops.sort_by_key(OperationOrderingKey::from_operation);
    before
        .iter()
        .zip(ops.iter())
        .filter(|(seq, op)| **seq != op.sequence_index)
        .count()
}
