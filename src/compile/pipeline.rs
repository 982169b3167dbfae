//! Single full analysis pass over an operation stream.

use crate::domain::{
    net_result_in_range, normalize_operations, sort_operations_deterministic, Decimal, Diagnostic,
    InputField, OperationRecord, RawOperation,
};
use crate::engine::{
    BaselineThresholds, CycleStatistics, DebtLedger, DurationStats, PhaseSegmenter,
};

use super::{AnalysisReport, CompiledRun};

/// Compiler for operation streams.
pub struct Compiler;

impl Compiler {
    /// Run the ledger, statistics and phase passes over `operations`.
    ///
    /// The input is copied and stably sorted by timestamp first; rows that
    /// moved are reported as a single `OutOfOrderInput` diagnostic. Every
    /// positional index in the output refers to the sorted order. Net results
    /// beyond `MAX_NET_MAGNITUDE` are zeroed and reported.
    pub fn compile(operations: &[OperationRecord]) -> CompiledRun {
        let mut ops = operations.to_vec();
        let mut diagnostics = Vec::new();

        for op in ops.iter_mut() {
            if !net_result_in_range(&op.net_result) {
                diagnostics.push(Diagnostic::InvalidInputField {
                    sequence_index: op.sequence_index,
                    field: InputField::NetResult,
                    raw: op.net_result.to_canonical_string(),
                });
                op.net_result = Decimal::zero();
            }
        }

        let displaced = sort_operations_deterministic(&mut ops);
        if displaced > 0 {
            tracing::warn!(displaced, "operations arrived out of order, re-sorted");
            diagnostics.push(Diagnostic::OutOfOrderInput {
                displaced_rows: displaced,
            });
        }

        let mut ledger = DebtLedger::new();
        for op in &ops {
            ledger.process_operation(op);
        }
        let (mut records, debt_cycles) = ledger.into_outputs();

        let mut stats = CycleStatistics::new();
        stats.annotate(&mut records);
        let (profit_cycles, closed_summary) = stats.into_outputs();

        let (cycle_summaries, phase_diagnostics) =
            PhaseSegmenter::new(&records).segment(&debt_cycles);
        diagnostics.extend(phase_diagnostics);

        let duration_stats = DurationStats::from_summaries(&cycle_summaries);
        let baseline = BaselineThresholds::derive(&records, &closed_summary);

        tracing::info!(
            rows = records.len(),
            debt_cycles = debt_cycles.len(),
            closed_debt_cycles = cycle_summaries.len(),
            profit_cycles = profit_cycles.len(),
            diagnostics = diagnostics.len(),
            "compiled operation stream"
        );

        CompiledRun {
            records,
            debt_cycles,
            cycle_summaries,
            profit_cycles,
            closed_summary,
            duration_stats,
            baseline,
            diagnostics,
        }
    }

    /// Normalize raw rows, compile them, and build the full report.
    /// Normalization diagnostics come first in the report.
    pub fn analyze(raw: Vec<RawOperation>) -> AnalysisReport {
        let (ops, mut diagnostics) = normalize_operations(raw);
        let mut run = Self::compile(&ops);
        diagnostics.append(&mut run.diagnostics);
        run.diagnostics = diagnostics;
        run.into_report()
    }
}

/// Stable identifier for an operation stream.
///
/// Hashes each row's timestamp and canonical net result in order, so the
/// same dataset uploaded twice maps to the same key regardless of how its
/// numbers were formatted.
pub fn dataset_key(operations: &[OperationRecord]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    for op in operations {
        hasher.update(op.timestamp.as_i64().to_le_bytes());
        hasher.update(b"|");
        hasher.update(op.net_result.to_canonical_string());
        hasher.update(b"\n");
    }
    let hash = hasher.finalize();
    format!("hash:{}", hex::encode(&hash[..16]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TimeInput, TimeMs};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn ops(values: &[(i64, &str)]) -> Vec<OperationRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, (t, v))| OperationRecord::new(i, TimeMs::new(*t), d(v)))
            .collect()
    }

    #[test]
    fn test_compile_empty_stream() {
        let run = Compiler::compile(&[]);
        assert!(run.records.is_empty());
        assert!(run.debt_cycles.is_empty());
        assert!(run.diagnostics.is_empty());
        assert_eq!(run.baseline, BaselineThresholds::default());
    }

    #[test]
    fn test_compile_sorts_and_reports_displacement() {
        let run = Compiler::compile(&ops(&[(3_000, "-10"), (1_000, "-5"), (2_000, "15")]));

        let seq: Vec<usize> = run.operations().map(|op| op.sequence_index).collect();
        assert_eq!(seq, vec![1, 2, 0]);
        assert!(matches!(
            run.diagnostics[0],
            Diagnostic::OutOfOrderInput { displaced_rows: 3 }
        ));
    }

    #[test]
    fn test_compile_closed_cycle_feeds_baseline() {
        let run = Compiler::compile(&ops(&[
            (0, "-100"),
            (60_000, "-50"),
            (120_000, "150"),
            (180_000, "20"),
        ]));

        assert_eq!(run.cycle_summaries.len(), 1);
        assert_eq!(run.cycle_summaries[0].max_debt, d("-150"));
        assert_eq!(run.baseline.mean_closed_debt_max, d("-150"));
        assert_eq!(run.baseline.worst_historical_debt_max, d("-150"));
        assert_eq!(run.duration_stats.max, "2min");
    }

    #[test]
    fn test_compile_zeroes_out_of_range_results() {
        let run = Compiler::compile(&ops(&[
            (0, "50000000000000000000000000000"),
            (1, "50000000000000000000000000000"),
            (2, "-10"),
        ]));

        assert_eq!(run.records.len(), 3);
        assert_eq!(run.records[1].cumulative_net, Decimal::zero());
        assert_eq!(run.records[2].running_debt, d("-10"));
        assert_eq!(run.diagnostics.len(), 2);
        assert!(matches!(
            run.diagnostics[1],
            Diagnostic::InvalidInputField {
                sequence_index: 1,
                field: InputField::NetResult,
                ..
            }
        ));
    }

    #[test]
    fn test_analyze_keeps_normalization_diagnostics_first() {
        let raw = vec![
            RawOperation::new(Some(TimeInput::Millis(1_000)), None),
            RawOperation::new(Some(TimeInput::Millis(500)), Some(d("-1").into())),
        ];
        let report = Compiler::analyze(raw);

        assert_eq!(report.run.diagnostics.len(), 2);
        assert!(matches!(
            report.run.diagnostics[0],
            Diagnostic::MissingInputField { sequence_index: 0, .. }
        ));
        assert!(matches!(
            report.run.diagnostics[1],
            Diagnostic::OutOfOrderInput { .. }
        ));
    }

    #[test]
    fn test_dataset_key_ignores_number_formatting() {
        let a = ops(&[(0, "-10.50"), (1, "3")]);
        let b = ops(&[(0, "-10.5"), (1, "3.000")]);
        let c = ops(&[(0, "-10.5"), (1, "4")]);

        assert_eq!(dataset_key(&a), dataset_key(&b));
        assert_ne!(dataset_key(&a), dataset_key(&c));
        assert!(dataset_key(&a).starts_with("hash:"));
        assert_eq!(dataset_key(&a).len(), "hash:".len() + 32);
    }
}
