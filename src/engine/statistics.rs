//! Causal per-row statistics over debt cycles and profit cycles.

use crate::domain::{Decimal, EnrichedRecord, ProfitCycle, RowStatistics, TimeMs};
use serde::Serialize;

use super::order_stats::SortedSamples;

#[derive(Debug, Clone)]
struct OpenProfitCycle {
    start_index: usize,
    start_time: TimeMs,
    end_index: usize,
    end_time: TimeMs,
    debt_cycle_tag: Option<u64>,
    running: Decimal,
}

/// Aggregates over one side's closed cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedSideSummary {
    pub count: usize,
    pub max: Decimal,
    pub min: Decimal,
    pub mean: Decimal,
    pub p25: Decimal,
    pub p75: Decimal,
    pub last: Decimal,
}

impl ClosedSideSummary {
    fn from_samples(samples: &SortedSamples, last: Option<Decimal>) -> Self {
        let snap = samples.snapshot();
        Self {
            count: snap.count,
            max: samples.max().unwrap_or_default(),
            min: samples.min().unwrap_or_default(),
            mean: snap.mean,
            p25: snap.p25,
            p75: snap.p75,
            last: last.unwrap_or_default(),
        }
    }
}

/// Closed-cycle aggregates at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedCycleSummary {
    /// Maximum debt (most negative value) of each closed debt cycle.
    pub debt: ClosedSideSummary,
    /// Total profit of each closed profit cycle.
    pub profit: ClosedSideSummary,
}

/// Walks enriched rows in order and fills in their `stats`.
///
/// A debt cycle's maximum joins the closed set after its closing row is
/// annotated. A profit cycle joins the closed set when the first row that
/// breaks it arrives, before that row is annotated.
pub struct CycleStatistics {
    debt_samples: SortedSamples,
    profit_samples: SortedSamples,
    last_closed_debt: Option<Decimal>,
    last_closed_profit: Option<Decimal>,

    current_cycle: Option<u64>,
    current_min: Decimal,

    open_profit: Option<OpenProfitCycle>,
    best_running_profit: Decimal,
    next_profit_cycle_id: u64,
    profit_cycles: Vec<ProfitCycle>,
}

impl CycleStatistics {
    pub fn new() -> Self {
        Self {
            debt_samples: SortedSamples::new(),
            profit_samples: SortedSamples::new(),
            last_closed_debt: None,
            last_closed_profit: None,
            current_cycle: None,
            current_min: Decimal::zero(),
            open_profit: None,
            best_running_profit: Decimal::zero(),
            next_profit_cycle_id: 1,
            profit_cycles: Vec::new(),
        }
    }

    /// Annotate one row. `index` is the row's position in the stream.
    pub fn observe(&mut self, index: usize, record: &mut EnrichedRecord) {
        let qualifies = record.is_profit_row();
        if !qualifies {
            self.close_profit_cycle();
        }

        self.track_debt(record);
        let debt = self.debt_samples.snapshot();
        let debt_position = if debt.p25.is_zero() {
            Decimal::zero()
        } else {
            record.running_debt.abs().ratio_or_zero(debt.p25.abs())
        };

        let running_profit = if qualifies {
            self.extend_profit_cycle(index, record)
        } else {
            Decimal::zero()
        };
        self.best_running_profit = self.best_running_profit.max(running_profit);
        let profit = self.profit_samples.snapshot();

        record.stats = RowStatistics {
            cycle_max_debt: self.current_min,
            mean_closed_debt_max: debt.mean,
            p25_closed_debt_max: debt.p25,
            debt_position,
            profit_cycle_running: running_profit,
            mean_closed_profit: profit.mean,
            p25_closed_profit: profit.p25,
            best_profit_position: running_profit.ratio_or_zero(self.best_running_profit),
        };

        if record.closes_cycle() {
            self.debt_samples.insert(self.current_min);
            self.last_closed_debt = Some(self.current_min);
        }
    }

    fn track_debt(&mut self, record: &EnrichedRecord) {
        match record.cycle_id {
            Some(id) if self.current_cycle == Some(id) => {
                self.current_min = self.current_min.min(record.running_debt);
            }
            Some(id) => {
                self.current_cycle = Some(id);
                self.current_min = record.running_debt;
            }
            None => {
                self.current_cycle = None;
                self.current_min = Decimal::zero();
            }
        }
    }

    fn extend_profit_cycle(&mut self, index: usize, record: &EnrichedRecord) -> Decimal {
        let open = self.open_profit.get_or_insert_with(|| OpenProfitCycle {
            start_index: index,
            start_time: record.timestamp(),
            end_index: index,
            end_time: record.timestamp(),
            debt_cycle_tag: record.profit_tag,
            running: Decimal::zero(),
        });
        open.end_index = index;
        open.end_time = record.timestamp();
        open.running += record.profit_realized;
        open.running
    }

    fn close_profit_cycle(&mut self) {
        let Some(open) = self.open_profit.take() else {
            return;
        };
        self.profit_samples.insert(open.running);
        self.last_closed_profit = Some(open.running);
        self.profit_cycles.push(ProfitCycle {
            profit_cycle_id: self.next_profit_cycle_id,
            debt_cycle_tag: open.debt_cycle_tag,
            start_index: open.start_index,
            end_index: open.end_index,
            start_time: open.start_time,
            end_time: open.end_time,
            total_profit: open.running,
        });
        self.next_profit_cycle_id += 1;
    }

    /// Aggregates over everything closed so far.
    pub fn closed_summary(&self) -> ClosedCycleSummary {
        ClosedCycleSummary {
            debt: ClosedSideSummary::from_samples(&self.debt_samples, self.last_closed_debt),
            profit: ClosedSideSummary::from_samples(&self.profit_samples, self.last_closed_profit),
        }
    }

    /// Annotate every row in order.
    pub fn annotate(&mut self, records: &mut [EnrichedRecord]) {
        for (index, record) in records.iter_mut().enumerate() {
            self.observe(index, record);
        }
    }

    /// Closed profit cycles and the final summary. A profit run still going
    /// at the end of the stream is not closed.
    pub fn into_outputs(self) -> (Vec<ProfitCycle>, ClosedCycleSummary) {
        let summary = self.closed_summary();
        (self.profit_cycles, summary)
    }
}

impl Default for CycleStatistics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OperationRecord;
    use crate::engine::ledger::DebtLedger;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn annotate(values: &[&str]) -> (Vec<EnrichedRecord>, Vec<ProfitCycle>, ClosedCycleSummary) {
        let mut ledger = DebtLedger::new();
        for (i, v) in values.iter().enumerate() {
            ledger.process_operation(&OperationRecord::new(i, TimeMs::new(i as i64), d(v)));
        }
        let (mut records, _) = ledger.into_outputs();
        let mut stats = CycleStatistics::new();
        stats.annotate(&mut records);
        let (profit_cycles, summary) = stats.into_outputs();
        (records, profit_cycles, summary)
    }

    #[test]
    fn test_closing_row_does_not_see_its_own_cycle() {
        let (records, _, summary) = annotate(&["-200", "200", "-50"]);
        assert_eq!(records[1].stats.mean_closed_debt_max, Decimal::zero());
        assert_eq!(records[1].stats.cycle_max_debt, d("-200"));
        assert_eq!(records[2].stats.mean_closed_debt_max, d("-200"));
        assert_eq!(records[2].stats.p25_closed_debt_max, d("-200"));
        assert_eq!(records[2].stats.debt_position, d("0.25"));
        assert_eq!(summary.debt.count, 1);
    }

    #[test]
    fn test_cycle_running_minimum() {
        let (records, _, _) = annotate(&["-10", "-30", "25", "-5"]);
        let mins: Vec<Decimal> = records.iter().map(|r| r.stats.cycle_max_debt).collect();
        assert_eq!(mins, vec![d("-10"), d("-40"), d("-40"), d("-40")]);
    }

    #[test]
    fn test_profit_cycle_detection_and_totals() {
        // flat profit run of two rows, broken by a loss
        let (records, profit_cycles, summary) = annotate(&["5", "7", "-1", "4"]);
        assert_eq!(records[1].stats.profit_cycle_running, d("12"));
        assert_eq!(records[2].stats.mean_closed_profit, d("12"));
        assert_eq!(profit_cycles.len(), 1);
        assert_eq!(profit_cycles[0].total_profit, d("12"));
        assert_eq!(profit_cycles[0].debt_cycle_tag, Some(0));
        assert_eq!((profit_cycles[0].start_index, profit_cycles[0].end_index), (0, 1));
        // "4" repays 1 and realizes 3; that run is still open at stream end
        assert_eq!(records[3].stats.profit_cycle_running, d("3"));
        assert_eq!(summary.profit.count, 1);
        assert_eq!(summary.profit.last, d("12"));
    }

    #[test]
    fn test_best_profit_position() {
        let (records, _, _) = annotate(&["10", "-1", "6"]);
        assert_eq!(records[0].stats.best_profit_position, d("1"));
        assert_eq!(records[1].stats.best_profit_position, Decimal::zero());
        assert_eq!(records[2].stats.best_profit_position, d("0.5"));
    }
}
