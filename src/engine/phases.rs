//! Decline/recovery phases of closed debt cycles.

use crate::domain::{DebtCycle, Decimal, Diagnostic, EnrichedRecord, TimeMs};
use serde::Serialize;

use super::order_stats::{mean, percentile, q75};

const MINUTE_MS: i64 = 60_000;

/// Coarse human duration: days, hours, minutes. Leading zero units are
/// dropped; minutes are always shown.
pub fn format_duration(ms: i64) -> String {
    let total_min = ms.max(0) / MINUTE_MS;
    let days = total_min / 1440;
    let hours = (total_min % 1440) / 60;
    let minutes = total_min % 60;

    if days > 0 {
        format!("{}d {}h {}min", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}min", hours, minutes)
    } else {
        format!("{}min", minutes)
    }
}

/// Row counts within a phase's time range, by label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseCounts {
    pub total: usize,
    pub loans: usize,
    pub amortizations: usize,
    pub profits: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSpan {
    pub start_index: usize,
    pub end_index: usize,
    pub start_time: TimeMs,
    pub end_time: TimeMs,
    pub duration_ms: i64,
    pub duration: String,
    pub counts: PhaseCounts,
}

/// One closed debt cycle with its phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtCycleSummary {
    pub cycle_id: u64,
    pub start_index: usize,
    pub end_index: usize,
    pub bottom_index: usize,
    pub start_time: TimeMs,
    pub end_time: TimeMs,
    pub max_debt: Decimal,
    pub duration_ms: i64,
    pub duration: String,
    /// Mean of cycle maxima closed before this cycle opened.
    pub prior_mean_debt_max: Decimal,
    pub prior_p25_debt_max: Decimal,
    pub decline: PhaseSpan,
    pub recovery: PhaseSpan,
    pub kpis: CycleKpis,
}

/// Debt indicators for one closed cycle.
///
/// Rows that push debt below the previous row's level (zero before the
/// cycle opens) count as decline; every other row counts as recovery.
/// Ratios with a zero denominator are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleKpis {
    pub decline_rows: usize,
    pub recovery_rows: usize,
    /// |max debt| per decline row (IED).
    pub decline_efficiency: Option<Decimal>,
    /// Amortized during decline over |max debt| (IMD).
    pub decline_mitigation: Option<Decimal>,
    /// Amortized per recovery row (IEA).
    pub amortization_efficiency: Option<Decimal>,
    /// Share of recovery rows that realized profit (IPR).
    pub recovery_purity: Option<Decimal>,
    /// Capital tied up by the cycle, |max debt| (CRO).
    pub operation_cost: Decimal,
    /// Recovery profit over operation cost (ICL).
    pub profit_conversion: Option<Decimal>,
}

impl CycleKpis {
    pub fn from_rows(rows: &[EnrichedRecord], max_debt: Decimal) -> Self {
        let mut kpis = Self::default();
        let mut decline_amortized = Decimal::zero();
        let mut recovery_amortized = Decimal::zero();
        let mut recovery_profit = Decimal::zero();
        let mut profitable_rows = 0usize;
        let mut previous_debt = Decimal::zero();

        for row in rows {
            if row.running_debt < previous_debt {
                kpis.decline_rows += 1;
                decline_amortized += row.amount_repaid;
            } else {
                kpis.recovery_rows += 1;
                recovery_amortized += row.amount_repaid;
                recovery_profit += row.profit_realized;
                profitable_rows += usize::from(row.profit_realized.is_positive());
            }
            previous_debt = row.running_debt;
        }

        let depth = max_debt.abs();
        let decline_rows = Decimal::from_count(kpis.decline_rows);
        let recovery_rows = Decimal::from_count(kpis.recovery_rows);

        kpis.decline_efficiency = kpi_ratio(depth, decline_rows);
        kpis.decline_mitigation = kpi_ratio(decline_amortized, depth);
        kpis.amortization_efficiency = kpi_ratio(recovery_amortized, recovery_rows);
        kpis.recovery_purity = kpi_ratio(Decimal::from_count(profitable_rows), recovery_rows);
        kpis.operation_cost = depth.round_dp(2);
        kpis.profit_conversion = kpi_ratio(recovery_profit, depth);
        kpis
    }
}

fn kpi_ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator).map(|v| v.round_dp(4))
}

/// Duration spread across closed cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationStats {
    pub max_ms: i64,
    pub mean_ms: i64,
    pub p75_ms: i64,
    pub max: String,
    pub mean: String,
    pub p75: String,
}

impl DurationStats {
    pub fn from_summaries(summaries: &[DebtCycleSummary]) -> Self {
        let mut durations: Vec<Decimal> = summaries
            .iter()
            .map(|s| Decimal::from(s.duration_ms))
            .collect();
        durations.sort();

        let whole_ms = |v: Decimal| v.floor().to_i64().unwrap_or(0);
        let max_ms = durations.last().copied().map(whole_ms).unwrap_or(0);
        let mean_ms = whole_ms(mean(&durations));
        let p75_ms = whole_ms(percentile(&durations, q75()));

        Self {
            max_ms,
            mean_ms,
            p75_ms,
            max: format_duration(max_ms),
            mean: format_duration(mean_ms),
            p75: format_duration(p75_ms),
        }
    }
}

/// Splits closed debt cycles at their bottom row.
pub struct PhaseSegmenter<'a> {
    records: &'a [EnrichedRecord],
}

impl<'a> PhaseSegmenter<'a> {
    /// `records` must be in timestamp order.
    pub fn new(records: &'a [EnrichedRecord]) -> Self {
        Self { records }
    }

    /// Summaries for closed cycles. Open cycles are skipped; a cycle whose
    /// end row still carries debt is skipped and reported.
    pub fn segment(&self, cycles: &[DebtCycle]) -> (Vec<DebtCycleSummary>, Vec<Diagnostic>) {
        let mut summaries = Vec::new();
        let mut diagnostics = Vec::new();

        for cycle in cycles {
            let Some(end) = cycle.end_index else {
                continue;
            };
            let Some(end_row) = self.records.get(end) else {
                continue;
            };
            if !end_row.running_debt.is_zero() {
                tracing::warn!(
                    cycle_id = cycle.cycle_id,
                    end_index = end,
                    "cycle end row carries residual debt, treating as open"
                );
                diagnostics.push(Diagnostic::StructuralInconsistency {
                    cycle_id: cycle.cycle_id,
                    end_index: end,
                    residual_debt: end_row.running_debt,
                });
                continue;
            }
            if let Some(summary) = self.summarize(cycle, end) {
                summaries.push(summary);
            }
        }

        (summaries, diagnostics)
    }

    fn summarize(&self, cycle: &DebtCycle, end: usize) -> Option<DebtCycleSummary> {
        let rows = self.records.get(cycle.start_index..=end)?;
        let first = rows.first()?;

        let (bottom_offset, bottom_row) = rows.iter().enumerate().fold(
            (0usize, first),
            |(best_i, best), (i, row)| {
                if row.running_debt < best.running_debt {
                    (i, row)
                } else {
                    (best_i, best)
                }
            },
        );
        let bottom = cycle.start_index + bottom_offset;
        let end_row = rows.last()?;

        let duration_ms = end_row.timestamp().millis_since(first.timestamp());
        Some(DebtCycleSummary {
            cycle_id: cycle.cycle_id,
            start_index: cycle.start_index,
            end_index: end,
            bottom_index: bottom,
            start_time: first.timestamp(),
            end_time: end_row.timestamp(),
            max_debt: bottom_row.running_debt,
            duration_ms,
            duration: format_duration(duration_ms),
            prior_mean_debt_max: first.stats.mean_closed_debt_max,
            prior_p25_debt_max: first.stats.p25_closed_debt_max,
            decline: self.phase(cycle.start_index, bottom),
            recovery: self.phase(bottom, end),
            kpis: CycleKpis::from_rows(rows, bottom_row.running_debt),
        })
    }

    fn phase(&self, start: usize, end: usize) -> PhaseSpan {
        let start_time = self.records[start].timestamp();
        let end_time = self.records[end].timestamp();
        let duration_ms = end_time.millis_since(start_time);
        PhaseSpan {
            start_index: start,
            end_index: end,
            start_time,
            end_time,
            duration_ms,
            duration: format_duration(duration_ms),
            counts: self.count_between(start_time, end_time),
        }
    }

    /// Counts rows whose timestamp lies in `[from, to]`, classified by label.
    pub fn count_between(&self, from: TimeMs, to: TimeMs) -> PhaseCounts {
        let lo = self.records.partition_point(|r| r.timestamp() < from);
        let hi = self.records.partition_point(|r| r.timestamp() <= to);

        let mut counts = PhaseCounts::default();
        for row in self.records.get(lo..hi).unwrap_or_default() {
            let flags = row.label.flags();
            if flags.is_operation() {
                counts.total += 1;
            }
            counts.loans += usize::from(flags.loan);
            counts.amortizations += usize::from(flags.amortization);
            counts.profits += usize::from(flags.profit);
        }
        counts
    }
}
