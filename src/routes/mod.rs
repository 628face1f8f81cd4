pub mod health;
pub mod reports;

use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/reports/segment", post(reports::segment_report))
        .route("/api/reports/render", post(reports::render_report))
        .route("/api/reports/generate", post(reports::generate))
        .with_state(state)
}
