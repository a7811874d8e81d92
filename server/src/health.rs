use axum::{extract::State, Json};
use shared::api::HealthResponse;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct HealthState {
    started: Instant,
}

impl HealthState {
    /// `started` is when the process began, captured before startup checks.
    pub fn new(started: Instant) -> Self {
        Self { started }
    }
}

pub async fn health_check(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.started.elapsed().as_secs_f64()))
}
