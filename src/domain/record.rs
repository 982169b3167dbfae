//! Enriched per-row output of the ledger and statistics passes.

use crate::domain::{Decimal, OperationLabel, OperationRecord, TimeMs};
use serde::Serialize;

/// Borrow/receipt streak a row belongs to (display grouping only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Streak {
    Borrow(u32),
    Receipt(u32),
    Neutral,
}

/// Running flow of the debt cycle a row belongs to, up to and including it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleFlow {
    pub borrowed: Decimal,
    pub repaid: Decimal,
    pub profit: Decimal,
    pub loan_rows: u32,
    pub amortization_rows: u32,
    pub profit_rows: u32,
}

/// Causal statistics for one row. Closed-cycle figures only include cycles
/// that closed strictly before the row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowStatistics {
    /// Most negative debt of the current cycle so far (zero on flat rows).
    pub cycle_max_debt: Decimal,
    pub mean_closed_debt_max: Decimal,
    pub p25_closed_debt_max: Decimal,
    /// `|running debt| / |p25|`, zero when the percentile is zero.
    pub debt_position: Decimal,
    /// Running total of the open profit cycle (zero outside one).
    pub profit_cycle_running: Decimal,
    pub mean_closed_profit: Decimal,
    pub p25_closed_profit: Decimal,
    /// Running profit over the best running profit seen so far.
    pub best_profit_position: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub operation: OperationRecord,
    pub label: OperationLabel,
    pub cumulative_net: Decimal,
    /// Outstanding debt after this row, always <= 0.
    pub running_debt: Decimal,
    /// Magnitude borrowed on this row.
    pub amount_borrowed: Decimal,
    pub amount_received: Decimal,
    pub amount_repaid: Decimal,
    pub profit_realized: Decimal,
    pub cycle_id: Option<u64>,
    pub loan_seq: Option<u32>,
    pub amortized_loans: Vec<u32>,
    pub profit_tag: Option<u64>,
    pub streak: Streak,
    pub borrow_streak_total: Decimal,
    pub receipt_streak_total: Decimal,
    pub cycle_flow: CycleFlow,
    pub stats: RowStatistics,
}

impl EnrichedRecord {
    pub fn timestamp(&self) -> TimeMs {
        self.operation.timestamp
    }

    pub fn net_result(&self) -> Decimal {
        self.operation.net_result
    }

    /// True for the row that brings an open debt cycle back to zero.
    pub fn closes_cycle(&self) -> bool {
        self.cycle_id.is_some() && self.running_debt.is_zero()
    }

    /// True if the row belongs to a profit cycle.
    pub fn is_profit_row(&self) -> bool {
        self.running_debt.is_zero() && self.profit_realized.is_positive()
    }
}
