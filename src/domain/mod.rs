//! Domain types and determinism layer for the debt-cycle engine.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - TimeMs with the accepted timestamp formats
//! - Operation rows, normalization and recoverable diagnostics
//! - Operation labels, enriched records and cycle spans
//! - Stable operation ordering for deterministic processing

pub mod cycle;
pub mod decimal;
pub mod diagnostic;
pub mod label;
pub mod operation;
pub mod ordering;
pub mod primitives;
pub mod record;

pub use cycle::{DebtCycle, ProfitCycle};
pub use decimal::Decimal;
pub use diagnostic::{Diagnostic, InputField, RuleKind};
pub use label::{format_amortization, LabelFlags, LabelParseError, OperationLabel};
pub use operation::{
    net_result_in_range, normalize_operations, parse_localized_decimal, NumberInput,
    OperationRecord, RawOperation, TimeInput, MAX_NET_MAGNITUDE,
};
pub use ordering::{sort_operations_deterministic, OperationOrderingKey};
pub use primitives::TimeMs;
pub use record::{CycleFlow, EnrichedRecord, RowStatistics, Streak};
