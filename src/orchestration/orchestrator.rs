use crate::compile::{CompiledRun, Compiler};
use crate::domain::{Diagnostic, OperationRecord};
use crate::engine::{
    simulate, AutomationPolicy, AutomationState, BacktestMetrics, BaselineThresholds,
    StateMachineRun,
};
use serde::Serialize;

use super::comparison::CycleComparison;

/// Result of replaying a policy over a compiled run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestReport {
    /// Frozen thresholds the policy was evaluated against.
    pub baseline: BaselineThresholds,
    pub automation: StateMachineRun,
    pub activated_rows: usize,
    pub original: BacktestMetrics,
    pub backtest: BacktestMetrics,
    /// The Activated subset compiled as a stream of its own.
    pub recompiled: CompiledRun,
    pub comparisons: Vec<CycleComparison>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BacktestReport {
    pub fn final_state(&self) -> AutomationState {
        self.automation.current_state
    }
}

pub struct BacktestRunner;

impl BacktestRunner {
    /// Simulate `policy` over `original`, keep the rows where the automation
    /// ended up Activated, and recompile them.
    ///
    /// The baseline is taken from `original` once and never recomputed.
    pub fn run(original: &CompiledRun, policy: &AutomationPolicy) -> BacktestReport {
        let baseline = original.baseline.clone();
        let (automation, mut diagnostics) = simulate(&original.records, *policy, &baseline);

        let activated: Vec<OperationRecord> = original
            .records
            .iter()
            .zip(&automation.history)
            .filter(|(_, step)| step.state == AutomationState::Activated)
            .map(|(record, _)| record.operation.clone())
            .collect();

        let recompiled = Compiler::compile(&activated);
        diagnostics.extend(recompiled.diagnostics.iter().cloned());

        let comparisons = CycleComparison::from_history(&original.debt_cycles, &automation.history);

        tracing::info!(
            rows = original.records.len(),
            activated_rows = activated.len(),
            final_state = %automation.current_state,
            "backtest finished"
        );

        BacktestReport {
            baseline,
            activated_rows: activated.len(),
            original: BacktestMetrics::from_records(&original.records),
            backtest: BacktestMetrics::from_records(&recompiled.records),
            automation,
            recompiled,
            comparisons,
            diagnostics,
        }
    }

    /// Compile `operations` and backtest `policy` against that run.
    pub fn run_operations(operations: &[OperationRecord], policy: &AutomationPolicy) -> BacktestReport {
        let compiled = Compiler::compile(operations);
        let mut report = Self::run(&compiled, policy);
        let mut diagnostics = compiled.diagnostics;
        diagnostics.append(&mut report.diagnostics);
        report.diagnostics = diagnostics;
        report
    }
}
