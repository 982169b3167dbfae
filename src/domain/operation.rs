//! Operation rows before and after normalization.

use crate::domain::{Decimal, Diagnostic, InputField, TimeMs};
use serde::{Deserialize, Serialize};

/// One normalized operation: a timestamped signed net result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    /// Position in the input stream; breaks timestamp ties.
    pub sequence_index: usize,
    pub timestamp: TimeMs,
    pub net_result: Decimal,
}

impl OperationRecord {
    pub fn new(sequence_index: usize, timestamp: TimeMs, net_result: Decimal) -> Self {
        Self {
            sequence_index,
            timestamp,
            net_result,
        }
    }
}

/// Timestamp as supplied upstream: epoch milliseconds or text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TimeInput {
    Millis(i64),
    Text(String),
}

impl TimeInput {
    pub fn resolve(&self) -> Option<TimeMs> {
        match self {
            TimeInput::Millis(ms) => Some(TimeMs::new(*ms)),
            TimeInput::Text(s) => TimeMs::parse(s),
        }
    }

    fn raw(&self) -> String {
        match self {
            TimeInput::Millis(ms) => ms.to_string(),
            TimeInput::Text(s) => s.clone(),
        }
    }
}

/// Net result as supplied upstream: a number or text.
///
/// Text accepts a decimal comma (`-1.234,56`) and a trailing `%`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(Decimal),
    Text(String),
}

impl NumberInput {
    pub fn resolve(&self) -> Option<Decimal> {
        match self {
            NumberInput::Number(d) => Some(*d),
            NumberInput::Text(s) => parse_localized_decimal(s),
        }
    }

    fn raw(&self) -> String {
        match self {
            NumberInput::Number(d) => d.to_canonical_string(),
            NumberInput::Text(s) => s.clone(),
        }
    }
}

impl From<Decimal> for NumberInput {
    fn from(value: Decimal) -> Self {
        NumberInput::Number(value)
    }
}

/// Parse `1234.5`, `1.234,5` or `12,5%`. When a comma is present, dots are
/// thousands separators.
pub fn parse_localized_decimal(s: &str) -> Option<Decimal> {
    let trimmed = s.trim().trim_end_matches('%').trim();
    if trimmed.is_empty() {
        return None;
    }
    let canonical = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };
    Decimal::from_str_canonical(&canonical).ok()
}

/// Largest accepted net result magnitude. Running sums over a stream of
/// such rows stay far inside `Decimal`'s range.
pub const MAX_NET_MAGNITUDE: i64 = 1_000_000_000_000_000_000;

pub fn net_result_in_range(value: &Decimal) -> bool {
    value.abs() <= Decimal::from(MAX_NET_MAGNITUDE)
}

/// An operation row as received, with every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOperation {
    #[serde(default)]
    pub timestamp: Option<TimeInput>,
    #[serde(default)]
    pub net_result: Option<NumberInput>,
}

impl RawOperation {
    pub fn new(timestamp: Option<TimeInput>, net_result: Option<NumberInput>) -> Self {
        Self {
            timestamp,
            net_result,
        }
    }
}

/// Fill gaps in raw rows so the ledger pass never has to stop.
///
/// A missing, unreadable or out-of-range net result becomes zero (a neutral
/// row). A missing or unreadable
/// timestamp repeats the previous row's timestamp (epoch zero for the first
/// row). Every substitution is reported. Input order is kept; sorting happens
/// at compile time.
pub fn normalize_operations(raw: Vec<RawOperation>) -> (Vec<OperationRecord>, Vec<Diagnostic>) {
    let mut records = Vec::with_capacity(raw.len());
    let mut diagnostics = Vec::new();
    let mut last_time = TimeMs::default();

    for (sequence_index, row) in raw.into_iter().enumerate() {
        let timestamp = match &row.timestamp {
            Some(input) => match input.resolve() {
                Some(t) => t,
                None => {
                    diagnostics.push(Diagnostic::InvalidInputField {
                        sequence_index,
                        field: InputField::Timestamp,
                        raw: input.raw(),
                    });
                    last_time
                }
            },
            None => {
                diagnostics.push(Diagnostic::MissingInputField {
                    sequence_index,
                    field: InputField::Timestamp,
                });
                last_time
            }
        };

        let net_result = match &row.net_result {
            Some(input) => input.resolve().filter(net_result_in_range).unwrap_or_else(|| {
                diagnostics.push(Diagnostic::InvalidInputField {
                    sequence_index,
                    field: InputField::NetResult,
                    raw: input.raw(),
                });
                Decimal::zero()
            }),
            None => {
                diagnostics.push(Diagnostic::MissingInputField {
                    sequence_index,
                    field: InputField::NetResult,
                });
                Decimal::zero()
            }
        };

        last_time = timestamp;
        records.push(OperationRecord::new(sequence_index, timestamp, net_result));
    }

    if !diagnostics.is_empty() {
        tracing::warn!(
            substitutions = diagnostics.len(),
            "normalized operations with substituted fields"
        );
    }

    (records, diagnostics)
}
