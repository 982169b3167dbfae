//! Sources of raw operation rows.

use crate::domain::{normalize_operations, Diagnostic, OperationRecord, RawOperation};
use std::fmt;
use thiserror::Error;

pub mod csv_source;
pub mod mock;

pub use csv_source::CsvSource;
pub use mock::MockSource;

/// Anything that can produce raw operation rows in input order.
///
/// Rows come back unnormalized; missing or unreadable fields are left for
/// `normalize_operations` to substitute and report.
pub trait OperationSource: Send + Sync + fmt::Debug {
    fn load(&self) -> Result<Vec<RawOperation>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("lz4 decode error: {0}")]
    Lz4(String),
    #[error("csv parse error: {0}")]
    Csv(String),
    #[error("input exceeds {limit} decoded bytes")]
    TooLarge { limit: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load from `source` and normalize in one step.
pub fn load_and_normalize(
    source: &dyn OperationSource,
) -> Result<(Vec<OperationRecord>, Vec<Diagnostic>), SourceError> {
    let raw = source.load()?;
    tracing::debug!(rows = raw.len(), "loaded raw operations");
    Ok(normalize_operations(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_display() {
        let err = SourceError::Csv("bad row".to_string());
        assert_eq!(err.to_string(), "csv parse error: bad row");

        let err = SourceError::Lz4("truncated".to_string());
        assert_eq!(err.to_string(), "lz4 decode error: truncated");

        let err = SourceError::TooLarge { limit: 10 };
        assert_eq!(err.to_string(), "input exceeds 10 decoded bytes");
    }
}
