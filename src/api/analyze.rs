use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::compile::{AnalysisReport, Compiler};
use crate::datasource::{CsvSource, OperationSource};
use crate::domain::RawOperation;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub operations: Vec<RawOperation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvQuery {
    pub delimiter: Option<String>,
}

pub async fn analyze_json(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisReport>, AppError> {
    state.check_row_limit(request.operations.len())?;
    let report = tokio::task::spawn_blocking(move || Compiler::analyze(request.operations)).await?;
    Ok(Json(report))
}

pub async fn analyze_csv(
    Query(params): Query<CsvQuery>,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalysisReport>, AppError> {
    let delimiter = match params.delimiter.as_deref() {
        None => state.config.csv_delimiter,
        Some(d) if d.len() == 1 && d.is_ascii() => d.as_bytes()[0],
        Some(_) => {
            return Err(AppError::BadRequest(
                "delimiter must be a single ASCII character".to_string(),
            ))
        }
    };

    let source = CsvSource::from_bytes(body.to_vec())
        .with_delimiter(delimiter)
        .with_decoded_limit(state.config.max_csv_bytes());
    let rows = tokio::task::spawn_blocking(move || source.load()).await??;
    state.check_row_limit(rows.len())?;

    let report = tokio::task::spawn_blocking(move || Compiler::analyze(rows)).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state(max_operations: usize) -> AppState {
        AppState::new(Config {
            max_operations,
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn test_analyze_json_rejects_oversized_stream() {
        let request = AnalyzeRequest {
            operations: vec![RawOperation::default(); 3],
        };
        let result = analyze_json(State(state(2)), Json(request)).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_analyze_csv_reads_body() {
        let body = Bytes::from_static(b"timestamp,net_result\n0,-10\n60000,15\n");
        let Json(report) = analyze_csv(Query(CsvQuery::default()), State(state(10)), body)
            .await
            .unwrap();
        assert_eq!(report.run.records.len(), 2);
        assert_eq!(report.run.cycle_summaries.len(), 1);
        assert!(report.run.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_csv_rejects_bad_delimiter() {
        let body = Bytes::from_static(b"timestamp,net_result\n0,-10\n");
        let query = CsvQuery {
            delimiter: Some("::".to_string()),
        };
        let result = analyze_csv(Query(query), State(state(10)), body).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
