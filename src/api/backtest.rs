use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::compile::Compiler;
use crate::domain::{normalize_operations, RawOperation};
use crate::engine::AutomationPolicy;
use crate::error::AppError;
use crate::orchestration::{BacktestReport, BacktestRunner};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestRequest {
    pub operations: Vec<RawOperation>,
    /// Parsed and validated before any row is evaluated.
    pub policy: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResponse {
    pub dataset_key: String,
    #[serde(flatten)]
    pub report: BacktestReport,
}

pub async fn run_backtest(
    State(state): State<AppState>,
    Json(request): Json<BacktestRequest>,
) -> Result<Json<BacktestResponse>, AppError> {
    let policy = AutomationPolicy::from_value(request.policy)?;
    state.check_row_limit(request.operations.len())?;

    let response = tokio::task::spawn_blocking(move || {
        let (ops, mut diagnostics) = normalize_operations(request.operations);
        let compiled = Compiler::compile(&ops);
        let mut report = BacktestRunner::run(&compiled, &policy);
        diagnostics.extend(compiled.diagnostics.iter().cloned());
        diagnostics.append(&mut report.diagnostics);
        report.diagnostics = diagnostics;
        BacktestResponse {
            dataset_key: compiled.dataset_key(),
            report,
        }
    })
    .await?;

    Ok(Json(response))
}
