//! Compile pipeline for turning an operation stream into enriched output.
//!
//! This module provides:
//! - Deterministic ordering of the input
//! - FIFO ledger pass and causal statistics pass
//! - Phase segmentation of closed debt cycles
//! - Frozen baseline thresholds for the automation simulator

use crate::domain::{DebtCycle, Diagnostic, EnrichedRecord, OperationRecord, ProfitCycle};
use crate::engine::{
    BaselineThresholds, ClosedCycleSummary, DebtCycleSummary, DurationStats, FlowSummary,
    OutcomeBreakdown,
};
use serde::Serialize;

pub mod pipeline;

pub use pipeline::{dataset_key, Compiler};

/// Everything one full pass over a stream produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledRun {
    pub records: Vec<EnrichedRecord>,
    /// All debt cycles, including one still open at stream end.
    pub debt_cycles: Vec<DebtCycle>,
    /// Closed debt cycles with their phases.
    pub cycle_summaries: Vec<DebtCycleSummary>,
    /// Closed profit cycles.
    pub profit_cycles: Vec<ProfitCycle>,
    pub closed_summary: ClosedCycleSummary,
    pub duration_stats: DurationStats,
    pub baseline: BaselineThresholds,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledRun {
    /// The operations this run was compiled from, in processing order.
    pub fn operations(&self) -> impl Iterator<Item = &OperationRecord> {
        self.records.iter().map(|r| &r.operation)
    }

    /// Key of the stream in processing order.
    pub fn dataset_key(&self) -> String {
        let ops: Vec<OperationRecord> = self.operations().cloned().collect();
        dataset_key(&ops)
    }

    pub fn into_report(self) -> AnalysisReport {
        AnalysisReport {
            dataset_key: self.dataset_key(),
            outcome: OutcomeBreakdown::from_records(&self.records),
            flow: FlowSummary::from_records(&self.records),
            run: self,
        }
    }
}

/// Response body for an analysis request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub dataset_key: String,
    #[serde(flatten)]
    pub run: CompiledRun,
    pub outcome: OutcomeBreakdown,
    pub flow: FlowSummary,
}
