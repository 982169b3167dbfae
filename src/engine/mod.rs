//! Pure computation engine(s) for deterministic ledger logic.

pub mod automation;
pub mod baseline;
pub mod ledger;
pub mod loan_queue;
pub mod metrics;
pub mod order_stats;
pub mod phases;
pub mod policy;
pub mod statistics;

pub use automation::{
    simulate, AutomationSimulator, AutomationState, AutomationStep, PauseTrigger,
    StateMachineRun, Transition,
};
pub use baseline::BaselineThresholds;
pub use ledger::{DebtLedger, EngineState};
pub use loan_queue::{LoanEntry, LoanQueue, Repayment};
pub use metrics::{BacktestMetrics, FlowSummary, OutcomeBreakdown};
pub use order_stats::{SampleSnapshot, SortedSamples};
pub use phases::{
    format_duration, CycleKpis, DebtCycleSummary, DurationStats, PhaseCounts, PhaseSegmenter,
    PhaseSpan,
};
pub use policy::{
    AutomationPolicy, BaselineField, Comparator, PauseBase, PauseRule, PolicyError,
    ThresholdRule, TieBreak,
};
pub use statistics::{ClosedCycleSummary, ClosedSideSummary, CycleStatistics};
