//! In-memory operation source for tests.

use super::{OperationSource, SourceError};
use crate::domain::{Decimal, NumberInput, RawOperation, TimeInput, TimeMs};

/// Mock source that returns predefined rows.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    rows: Vec<RawOperation>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a complete row.
    pub fn with_operation(mut self, time: TimeMs, net_result: Decimal) -> Self {
        self.rows.push(RawOperation::new(
            Some(TimeInput::Millis(time.as_i64())),
            Some(NumberInput::Number(net_result)),
        ));
        self
    }

    /// Add rows spaced one minute apart, starting after the last row.
    pub fn with_results(mut self, results: &[Decimal]) -> Self {
        for result in results {
            let t = TimeMs::new(self.rows.len() as i64 * 60_000);
            self = self.with_operation(t, *result);
        }
        self
    }

    /// Add a row exactly as given, gaps included.
    pub fn with_raw(mut self, row: RawOperation) -> Self {
        self.rows.push(row);
        self
    }
}

impl OperationSource for MockSource {
    fn load(&self) -> Result<Vec<RawOperation>, SourceError> {
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::load_and_normalize;
    use crate::domain::Diagnostic;

    #[test]
    fn test_mock_rows_are_normalized() {
        let source = MockSource::new()
            .with_results(&[Decimal::from(-5), Decimal::from(5)])
            .with_raw(RawOperation::default());

        let (ops, diags) = load_and_normalize(&source).unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[1].timestamp, TimeMs::new(60_000));
        assert_eq!(ops[2].timestamp, TimeMs::new(60_000));
        assert_eq!(diags.len(), 2);
        assert!(diags
            .iter()
            .all(|d| matches!(d, Diagnostic::MissingInputField { sequence_index: 2, .. })));
    }
}
