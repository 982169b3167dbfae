pub mod api;
pub mod compile;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use compile::{AnalysisReport, CompiledRun, Compiler};
pub use config::Config;
pub use datasource::{CsvSource, MockSource, OperationSource, SourceError};
pub use domain::{Decimal, Diagnostic, EnrichedRecord, OperationLabel, OperationRecord, TimeMs};
pub use engine::{AutomationPolicy, AutomationState, BaselineThresholds};
pub use error::AppError;
pub use orchestration::{BacktestReport, BacktestRunner};
