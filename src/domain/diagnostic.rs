//! Recoverable anomalies reported alongside engine output.

use crate::domain::{Decimal, TimeMs};
use serde::Serialize;
use std::fmt;

/// Input field of an operation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InputField {
    Timestamp,
    NetResult,
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputField::Timestamp => write!(f, "timestamp"),
            InputField::NetResult => write!(f, "netResult"),
        }
    }
}

/// Rule of the automation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    Activation,
    Pause,
    Deactivation,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Activation => write!(f, "activation"),
            RuleKind::Pause => write!(f, "pause"),
            RuleKind::Deactivation => write!(f, "deactivation"),
        }
    }
}

/// A recovered anomaly. Nothing here aborts a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// Field absent; zero (or the previous timestamp) was substituted.
    #[serde(rename_all = "camelCase")]
    MissingInputField {
        sequence_index: usize,
        field: InputField,
    },
    /// Field present but unreadable; treated as missing.
    #[serde(rename_all = "camelCase")]
    InvalidInputField {
        sequence_index: usize,
        field: InputField,
        raw: String,
    },
    /// Rows arrived out of timestamp order and were stably re-sorted.
    #[serde(rename_all = "camelCase")]
    OutOfOrderInput { displaced_rows: usize },
    /// A cycle's end row still carries debt; it is reported as open.
    #[serde(rename_all = "camelCase")]
    StructuralInconsistency {
        cycle_id: u64,
        end_index: usize,
        residual_debt: Decimal,
    },
    /// A transition rule could not be evaluated; the state was maintained.
    #[serde(rename_all = "camelCase")]
    PolicyEvaluationFailure {
        sequence_index: usize,
        at: TimeMs,
        rule: RuleKind,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingInputField {
                sequence_index,
                field,
            } => write!(f, "row {}: missing {}", sequence_index, field),
            Diagnostic::InvalidInputField {
                sequence_index,
                field,
                raw,
            } => write!(f, "row {}: unreadable {} {:?}", sequence_index, field, raw),
            Diagnostic::OutOfOrderInput { displaced_rows } => {
                write!(f, "{} rows re-sorted by timestamp", displaced_rows)
            }
            Diagnostic::StructuralInconsistency {
                cycle_id,
                end_index,
                residual_debt,
            } => write!(
                f,
                "cycle D{} ends at row {} with residual debt {}",
                cycle_id, end_index, residual_debt
            ),
            Diagnostic::PolicyEvaluationFailure {
                sequence_index,
                rule,
                ..
            } => write!(f, "row {}: {} rule could not be evaluated", sequence_index, rule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_serializes_with_kind_tag() {
        let diag = Diagnostic::MissingInputField {
            sequence_index: 3,
            field: InputField::NetResult,
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["kind"], "missingInputField");
        assert_eq!(json["sequenceIndex"], 3);
        assert_eq!(json["field"], "netResult");
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::PolicyEvaluationFailure {
            sequence_index: 7,
            at: TimeMs::new(0),
            rule: RuleKind::Deactivation,
        };
        assert_eq!(diag.to_string(), "row 7: deactivation rule could not be evaluated");
    }
}
