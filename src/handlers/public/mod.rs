mod gateway;
mod verify;

pub use gateway::*;
pub use verify::*;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::db::AppState;
use crate::extractors::Json;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/redeem/{id}", get(redeem_redirect_token))
        .route("/go/{id}", get(redeem_redirect_token))
        .route("/verify-license", post(verify_license))
}
