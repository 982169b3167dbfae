pub mod analyze;
pub mod backtest;
pub mod health;

use crate::config::Config;
use crate::error::AppError;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Reject streams larger than the configured limit before any work starts.
    pub(crate) fn check_row_limit(&self, rows: usize) -> Result<(), AppError> {
        if rows > self.config.max_operations {
            return Err(AppError::BadRequest(format!(
                "too many operations: {} (limit {})",
                rows, self.config.max_operations
            )));
        }
        Ok(())
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/analyze", post(analyze::analyze_json))
        .route("/v1/analyze/csv", post(analyze::analyze_csv))
        .route("/v1/backtest", post(backtest::run_backtest))
        .layer(cors)
        .with_state(state)
}
