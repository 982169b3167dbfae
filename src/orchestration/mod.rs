//! Backtest orchestration: simulate, filter, recompile, compare.

pub mod comparison;
pub mod orchestrator;

pub use comparison::CycleComparison;
pub use orchestrator::{BacktestReport, BacktestRunner};
