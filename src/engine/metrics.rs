//! Summary metrics over enriched record streams.

use crate::domain::{Decimal, EnrichedRecord};
use serde::Serialize;

use super::order_stats::{mean, percentile, q25, q75};

/// Headline figures for one stream, used to compare a backtest against the
/// unfiltered run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestMetrics {
    pub final_net_result: Decimal,
    /// Most negative running debt.
    pub max_drawdown: Decimal,
    pub peak_cumulative_net: Decimal,
    pub row_count: usize,
    pub positive_rows: usize,
    pub negative_rows: usize,
    pub amortization_rows: usize,
    pub total_profit: Decimal,
    pub total_borrowed: Decimal,
    pub total_amortized: Decimal,
}

impl BacktestMetrics {
    /// All zeros for an empty stream.
    pub fn from_records(records: &[EnrichedRecord]) -> Self {
        let Some(last) = records.last() else {
            return Self::default();
        };
        let mut metrics = Self {
            final_net_result: last.cumulative_net,
            max_drawdown: Decimal::zero(),
            peak_cumulative_net: records[0].cumulative_net,
            row_count: records.len(),
            ..Self::default()
        };
        for r in records {
            metrics.max_drawdown = metrics.max_drawdown.min(r.running_debt);
            metrics.peak_cumulative_net = metrics.peak_cumulative_net.max(r.cumulative_net);
            metrics.positive_rows += usize::from(r.profit_realized.is_positive());
            metrics.negative_rows += usize::from(r.amount_borrowed.is_positive());
            metrics.amortization_rows += usize::from(r.amount_repaid.is_positive());
            metrics.total_profit += r.profit_realized;
            metrics.total_borrowed += r.amount_borrowed;
            metrics.total_amortized += r.amount_repaid;
        }
        metrics
    }
}

/// How raw results split into wins, losses and flat rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeBreakdown {
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub positive_pct: Decimal,
    pub negative_pct: Decimal,
    pub neutral_pct: Decimal,
    pub positive_sum: Decimal,
    pub negative_sum: Decimal,
    pub positive_mean: Decimal,
    pub negative_mean: Decimal,
    pub positive_p75: Decimal,
    pub negative_p25: Decimal,
}

impl OutcomeBreakdown {
    pub fn from_records(records: &[EnrichedRecord]) -> Self {
        let mut positives: Vec<Decimal> = Vec::new();
        let mut negatives: Vec<Decimal> = Vec::new();
        let mut neutral = 0usize;
        for r in records {
            let v = r.net_result();
            if v.is_positive() {
                positives.push(v);
            } else if v.is_negative() {
                negatives.push(v);
            } else {
                neutral += 1;
            }
        }
        positives.sort();
        negatives.sort();

        let total = Decimal::from_count(records.len());
        let pct = |n: usize| (Decimal::from_count(n) * Decimal::hundred()).ratio_or_zero(total);

        Self {
            positive_count: positives.len(),
            negative_count: negatives.len(),
            neutral_count: neutral,
            positive_pct: pct(positives.len()),
            negative_pct: pct(negatives.len()),
            neutral_pct: pct(neutral),
            positive_sum: positives.iter().copied().sum(),
            negative_sum: negatives.iter().copied().sum(),
            positive_mean: mean(&positives),
            negative_mean: mean(&negatives),
            positive_p75: percentile(&positives, q75()),
            negative_p25: percentile(&negatives, q25()),
        }
    }
}

/// End-of-stream cash-flow picture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    pub final_cash: Decimal,
    pub final_debt: Decimal,
    pub total_borrowed: Decimal,
    pub total_repaid: Decimal,
    pub total_profit: Decimal,
    pub loan_rows: usize,
    pub amortization_rows: usize,
    pub profit_rows: usize,
    pub loan_pct: Decimal,
    pub amortization_pct: Decimal,
    pub profit_pct: Decimal,
    pub worst_debt: Decimal,
    pub last_mean_closed_debt_max: Decimal,
    pub last_p25_closed_debt_max: Decimal,
    pub last_debt_position: Decimal,
}

impl FlowSummary {
    pub fn from_records(records: &[EnrichedRecord]) -> Self {
        let Some(last) = records.last() else {
            return Self::default();
        };
        let mut summary = Self {
            final_cash: last.cumulative_net,
            final_debt: last.running_debt,
            last_mean_closed_debt_max: last.stats.mean_closed_debt_max,
            last_p25_closed_debt_max: last.stats.p25_closed_debt_max,
            last_debt_position: last.stats.debt_position,
            ..Self::default()
        };
        for r in records {
            let flags = r.label.flags();
            summary.total_borrowed += r.amount_borrowed;
            summary.total_repaid += r.amount_repaid;
            summary.total_profit += r.profit_realized;
            summary.loan_rows += usize::from(flags.loan);
            summary.amortization_rows += usize::from(flags.amortization);
            summary.profit_rows += usize::from(flags.profit);
            summary.worst_debt = summary.worst_debt.min(r.running_debt);
        }
        let total = Decimal::from_count(records.len());
        let pct = |n: usize| (Decimal::from_count(n) * Decimal::hundred()).ratio_or_zero(total);
        summary.loan_pct = pct(summary.loan_rows);
        summary.amortization_pct = pct(summary.amortization_rows);
        summary.profit_pct = pct(summary.profit_rows);
        summary
    }
}
