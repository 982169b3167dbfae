//! Debt and profit cycle spans.

use crate::domain::{Decimal, TimeMs};
use serde::Serialize;

/// A span from the first borrow on zero debt to the repayment that clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtCycle {
    pub cycle_id: u64,
    pub start_index: usize,
    pub end_index: Option<usize>, // None while open
    /// First row where the cycle reached its most negative debt.
    pub bottom_index: usize,
    pub max_debt: Decimal,
    pub start_time: TimeMs,
    pub end_time: Option<TimeMs>,
}

impl DebtCycle {
    pub fn is_closed(&self) -> bool {
        self.end_index.is_some()
    }

    /// Last row index covered, given the stream length for open cycles.
    pub fn last_index(&self, stream_len: usize) -> usize {
        self.end_index
            .unwrap_or_else(|| stream_len.saturating_sub(1))
    }
}

/// A maximal run of rows with zero debt and positive realized profit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitCycle {
    pub profit_cycle_id: u64,
    /// Debt cycle the profit is attributed to (the `L` tag of its first row).
    pub debt_cycle_tag: Option<u64>,
    pub start_index: usize,
    pub end_index: usize,
    pub start_time: TimeMs,
    pub end_time: TimeMs,
    pub total_profit: Decimal,
}
