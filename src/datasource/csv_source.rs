//! CSV operation exports, optionally wrapped in an LZ4 frame.

use super::{OperationSource, SourceError};
use crate::domain::{NumberInput, RawOperation, TimeInput};
use std::io::Read;
use std::path::Path;

const LZ4_FRAME_MAGIC: [u8; 4] = [0x04, 0x22, 0x4D, 0x18];

#[derive(Debug, Clone)]
pub struct CsvSource {
    bytes: Vec<u8>,
    delimiter: u8,
    max_decoded_bytes: Option<usize>,
}

impl CsvSource {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            delimiter: b',',
            max_decoded_bytes: None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Refuse bodies whose CSV text, after any decompression, is larger than
    /// `limit` bytes.
    pub fn with_decoded_limit(mut self, limit: usize) -> Self {
        self.max_decoded_bytes = Some(limit);
        self
    }

    pub fn is_lz4_frame(bytes: &[u8]) -> bool {
        bytes.starts_with(&LZ4_FRAME_MAGIC)
    }

    /// Decode a whole LZ4 frame. With a `limit`, decoding stops one byte
    /// past it and the frame is rejected.
    pub fn decompress_lz4_frame(
        lz4_bytes: &[u8],
        limit: Option<usize>,
    ) -> Result<Vec<u8>, SourceError> {
        let cap = limit
            .and_then(|l| u64::try_from(l).ok())
            .map_or(u64::MAX, |l| l.saturating_add(1));
        let mut out = Vec::new();
        lz4_flex::frame::FrameDecoder::new(lz4_bytes)
            .take(cap)
            .read_to_end(&mut out)
            .map_err(|e| SourceError::Lz4(e.to_string()))?;
        if let Some(limit) = limit {
            if out.len() > limit {
                return Err(SourceError::TooLarge { limit });
            }
        }
        Ok(out)
    }

    /// Parse a CSV body with a `timestamp` column and a net result column
    /// (`net_result`, `netResult` or `result`). Empty cells stay `None`;
    /// unreadable cells are kept as text for the normalizer to report.
    pub fn parse_csv(csv_bytes: &[u8], delimiter: u8) -> Result<Vec<RawOperation>, SourceError> {
        #[derive(Debug, serde::Deserialize)]
        struct Row {
            #[serde(default)]
            timestamp: Option<String>,
            #[serde(default, alias = "netResult", alias = "result")]
            net_result: Option<String>,
        }

        fn non_empty(cell: Option<String>) -> Option<String> {
            cell.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(csv_bytes);

        let headers = reader
            .headers()
            .map_err(|e| SourceError::Csv(e.to_string()))?
            .clone();
        if !headers.iter().any(|h| h == "timestamp") {
            return Err(SourceError::Csv("missing `timestamp` column".to_string()));
        }

        let mut rows = Vec::new();
        for record in reader.deserialize::<Row>() {
            let row = record.map_err(|e| SourceError::Csv(e.to_string()))?;
            let timestamp = non_empty(row.timestamp).map(|s| match s.parse::<i64>() {
                Ok(ms) => TimeInput::Millis(ms),
                Err(_) => TimeInput::Text(s),
            });
            let net_result = non_empty(row.net_result).map(NumberInput::Text);
            rows.push(RawOperation::new(timestamp, net_result));
        }

        Ok(rows)
    }
}

impl OperationSource for CsvSource {
    fn load(&self) -> Result<Vec<RawOperation>, SourceError> {
        if Self::is_lz4_frame(&self.bytes) {
            let csv = Self::decompress_lz4_frame(&self.bytes, self.max_decoded_bytes)?;
            Self::parse_csv(&csv, self.delimiter)
        } else {
            if let Some(limit) = self.max_decoded_bytes {
                if self.bytes.len() > limit {
                    return Err(SourceError::TooLarge { limit });
                }
            }
            Self::parse_csv(&self.bytes, self.delimiter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, TimeMs};
    use std::io::Write;

    fn compress_lz4_frame(input: &[u8]) -> Vec<u8> {
        let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
        encoder.write_all(input).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn lz4_frame_is_detected_and_decoded() {
        let csv = b"timestamp,net_result\n1700000000000,-12.5\n";
        let lz4 = compress_lz4_frame(csv);
        assert!(CsvSource::is_lz4_frame(&lz4));
        assert!(!CsvSource::is_lz4_frame(csv));

        let rows = CsvSource::from_bytes(lz4).load().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, Some(TimeInput::Millis(1_700_000_000_000)));
    }

    #[test]
    fn csv_parsing_semicolon_export() {
        let csv = b"timestamp;net_result\n\
            2024-03-01 10:00;-1.234,50\n\
            ;7\n\
            2024-03-01 10:05;\n";
        let rows = CsvSource::parse_csv(csv, b';').unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0].timestamp.as_ref().and_then(TimeInput::resolve),
            TimeMs::parse("2024-03-01 10:00")
        );
        assert_eq!(
            rows[0].net_result.as_ref().and_then(NumberInput::resolve),
            Some(Decimal::from_str_canonical("-1234.5").unwrap())
        );
        assert_eq!(rows[1].timestamp, None);
        assert_eq!(rows[2].net_result, None);
    }

    #[test]
    fn csv_alias_column_accepted() {
        let csv = b"timestamp,netResult\n1000,3\n";
        let rows = CsvSource::parse_csv(csv, b',').unwrap();
        assert_eq!(
            rows[0].net_result.as_ref().and_then(NumberInput::resolve),
            Some(Decimal::from(3))
        );
    }

    #[test]
    fn csv_without_timestamp_column_errors() {
        let csv = b"when,net_result\n1000,3\n";
        let err = CsvSource::parse_csv(csv, b',').unwrap_err();
        assert!(matches!(err, SourceError::Csv(_)));
    }

    #[test]
    fn oversized_lz4_frame_stops_at_limit() {
        let mut csv = b"timestamp,net_result\n".to_vec();
        csv.extend_from_slice(&b"0,-1\n".repeat(5_000));
        let lz4 = compress_lz4_frame(&csv);
        assert!(lz4.len() < 1_024);

        let err = CsvSource::from_bytes(lz4.clone())
            .with_decoded_limit(1_024)
            .load()
            .unwrap_err();
        assert!(matches!(err, SourceError::TooLarge { limit: 1_024 }));

        let rows = CsvSource::from_bytes(lz4)
            .with_decoded_limit(csv.len())
            .load()
            .unwrap();
        assert_eq!(rows.len(), 5_000);
    }

    #[test]
    fn oversized_plain_body_rejected() {
        let csv = b"timestamp,net_result\n0,-1\n1,-1\n";
        let err = CsvSource::from_bytes(csv.to_vec())
            .with_decoded_limit(10)
            .load()
            .unwrap_err();
        assert!(matches!(err, SourceError::TooLarge { limit: 10 }));
    }

    #[test]
    fn corrupt_lz4_frame_errors() {
        let mut bytes = LZ4_FRAME_MAGIC.to_vec();
        bytes.extend_from_slice(b"garbage");
        let err = CsvSource::from_bytes(bytes).load().unwrap_err();
        assert!(matches!(err, SourceError::Lz4(_)));
    }
}
