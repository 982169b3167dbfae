use debtflow::compile::Compiler;
use debtflow::datasource::{load_and_normalize, CsvSource};
use debtflow::domain::{Decimal, Diagnostic, OperationRecord, TimeMs};
use debtflow::engine::{BacktestMetrics, FlowSummary, OutcomeBreakdown};
use std::io::Write;
use std::str::FromStr;
use tempfile::TempDir;

const MINUTE: i64 = 60_000;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn timed(values: &[(i64, &str)]) -> Vec<OperationRecord> {
    values
        .iter()
        .enumerate()
        .map(|(i, (minute, v))| OperationRecord::new(i, TimeMs::new(minute * MINUTE), d(v)))
        .collect()
}

fn scenario_one() -> Vec<OperationRecord> {
    timed(&[(0, "-100"), (1, "-50"), (2, "120"), (5, "70")])
}

#[test]
fn phases_split_at_bottom_row() {
    let run = Compiler::compile(&scenario_one());
    assert_eq!(run.cycle_summaries.len(), 1);
    let summary = &run.cycle_summaries[0];

    assert_eq!(summary.bottom_index, 1);
    assert_eq!(summary.max_debt, d("-150"));
    assert_eq!(summary.duration, "5min");

    assert_eq!((summary.decline.start_index, summary.decline.end_index), (0, 1));
    assert_eq!(summary.decline.duration, "1min");
    assert_eq!(summary.decline.counts.total, 2);
    assert_eq!(summary.decline.counts.loans, 2);
    assert_eq!(summary.decline.counts.amortizations, 0);

    assert_eq!((summary.recovery.start_index, summary.recovery.end_index), (1, 3));
    assert_eq!(summary.recovery.duration, "4min");
    assert_eq!(summary.recovery.counts.total, 3);
    assert_eq!(summary.recovery.counts.loans, 1);
    assert_eq!(summary.recovery.counts.amortizations, 2);
    assert_eq!(summary.recovery.counts.profits, 1);
}

#[test]
fn cycle_kpis_split_rows_by_debt_direction() {
    let run = Compiler::compile(&scenario_one());
    let kpis = &run.cycle_summaries[0].kpis;

    assert_eq!((kpis.decline_rows, kpis.recovery_rows), (2, 2));
    assert_eq!(kpis.decline_efficiency, Some(d("75")));
    assert_eq!(kpis.decline_mitigation, Some(Decimal::zero()));
    assert_eq!(kpis.amortization_efficiency, Some(d("75")));
    assert_eq!(kpis.recovery_purity, Some(d("0.5")));
    assert_eq!(kpis.operation_cost, d("150"));
    assert_eq!(kpis.profit_conversion, Some(d("0.2667")));
}

#[test]
fn cycle_kpis_count_mid_recovery_loans_as_decline() {
    let run = Compiler::compile(&timed(&[(0, "-10"), (1, "4"), (2, "-2"), (3, "8"), (4, "5")]));
    assert_eq!(run.cycle_summaries.len(), 1);
    let kpis = &run.cycle_summaries[0].kpis;

    assert_eq!((kpis.decline_rows, kpis.recovery_rows), (2, 2));
    assert_eq!(kpis.decline_efficiency, Some(d("5")));
    assert_eq!(kpis.amortization_efficiency, Some(d("6")));
    assert_eq!(kpis.recovery_purity, Some(Decimal::zero()));
    assert_eq!(kpis.profit_conversion, Some(Decimal::zero()));
}

#[test]
fn phase_counts_include_rows_sharing_boundary_timestamps() {
    let run = Compiler::compile(&timed(&[(0, "-10"), (3, "-20"), (3, "5"), (9, "25")]));
    let summary = &run.cycle_summaries[0];

    assert_eq!(summary.bottom_index, 1);
    // Row 2 shares the bottom timestamp, so it is counted in both phases.
    assert_eq!(summary.decline.counts.total, 3);
    assert_eq!(summary.recovery.counts.total, 3);
    assert_eq!(summary.duration, "9min");
}

#[test]
fn duration_stats_over_closed_cycles() {
    let run = Compiler::compile(&timed(&[
        (0, "-1"),
        (2, "1"),
        (10, "-1"),
        (10 + 24 * 60 + 65, "1"),
    ]));
    assert_eq!(run.cycle_summaries.len(), 2);
    assert_eq!(run.cycle_summaries[1].duration, "1d 1h 5min");
    assert_eq!(run.duration_stats.max, "1d 1h 5min");
    assert_eq!(run.duration_stats.max_ms, (24 * 60 + 65) * MINUTE);
}

#[test]
fn compile_is_deterministic() {
    let a = serde_json::to_string(&Compiler::compile(&scenario_one())).unwrap();
    let b = serde_json::to_string(&Compiler::compile(&scenario_one())).unwrap();
    assert_eq!(a, b);
}

#[test]
fn shuffled_input_compiles_like_sorted_input() {
    let sorted = scenario_one();
    let mut shuffled = sorted.clone();
    shuffled.swap(0, 3);
    shuffled.swap(1, 2);

    let expected = Compiler::compile(&sorted);
    let actual = Compiler::compile(&shuffled);

    assert_eq!(actual.records, expected.records);
    assert_eq!(actual.cycle_summaries, expected.cycle_summaries);
    assert_eq!(
        actual.diagnostics,
        vec![Diagnostic::OutOfOrderInput { displaced_rows: 4 }]
    );
}

#[test]
fn metrics_for_scenario_stream() {
    let run = Compiler::compile(&scenario_one());

    let metrics = BacktestMetrics::from_records(&run.records);
    assert_eq!(metrics.final_net_result, d("40"));
    assert_eq!(metrics.max_drawdown, d("-150"));
    assert_eq!(metrics.peak_cumulative_net, d("40"));
    assert_eq!(metrics.row_count, 4);
    assert_eq!(metrics.positive_rows, 1);
    assert_eq!(metrics.negative_rows, 2);
    assert_eq!(metrics.amortization_rows, 2);
    assert_eq!(metrics.total_profit, d("40"));
    assert_eq!(metrics.total_borrowed, d("150"));
    assert_eq!(metrics.total_amortized, d("150"));

    let outcome = OutcomeBreakdown::from_records(&run.records);
    assert_eq!(outcome.positive_count, 2);
    assert_eq!(outcome.negative_pct, d("50"));
    assert_eq!(outcome.positive_p75, d("107.5"));
    assert_eq!(outcome.negative_p25, d("-87.5"));

    let flow = FlowSummary::from_records(&run.records);
    assert_eq!(flow.final_cash, d("40"));
    assert_eq!(flow.final_debt, Decimal::zero());
    assert_eq!(flow.total_repaid, d("150"));
    assert_eq!(flow.profit_rows, 1);
    assert_eq!(flow.loan_pct, d("50"));
    assert_eq!(flow.worst_debt, d("-150"));
}

#[test]
fn report_key_is_stable_for_equivalent_uploads() {
    let a = Compiler::compile(&scenario_one()).into_report();
    let b = Compiler::compile(&timed(&[(0, "-100.0"), (1, "-50"), (2, "120.00"), (5, "70")]))
        .into_report();
    assert_eq!(a.dataset_key, b.dataset_key);
}

#[test]
fn csv_file_with_gaps_flows_through_pipeline() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ops.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "timestamp,net_result").unwrap();
    writeln!(file, "2024-01-02 09:00:00,-100").unwrap();
    writeln!(file, "2024-01-02 09:05:00,").unwrap();
    writeln!(file, ",60").unwrap();
    writeln!(file, "2024-01-02 09:30:00,oops").unwrap();
    writeln!(file, "2024-01-02 10:00:00,45").unwrap();
    drop(file);

    let source = CsvSource::from_path(&path).unwrap();
    let (ops, diags) = load_and_normalize(&source).unwrap();
    assert_eq!(ops.len(), 5);
    assert_eq!(diags.len(), 3);
    assert_eq!(ops[2].timestamp, ops[1].timestamp);
    assert_eq!(ops[3].net_result, Decimal::zero());

    let run = Compiler::compile(&ops);
    assert_eq!(run.debt_cycles.len(), 1);
    assert_eq!(run.debt_cycles[0].end_index, Some(4));
    assert_eq!(run.records[4].profit_realized, d("5"));
    assert_eq!(run.cycle_summaries[0].duration, "1h 0min");
}
