use axum::{
    extract::{Extension, State},
    http::HeaderMap,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;
use crate::licensing;
use crate::models::{AuditAction, Principal};
use crate::util::AuditLogBuilder;

#[derive(Debug, Deserialize)]
pub struct ActivateLicenseRequest {
    #[serde(default)]
    pub license_key: String,
    /// Device to bind the license to on first activation
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivateLicenseResponse {
    pub success: bool,
    pub license_key: String,
    pub expires_at: i64,
    pub remaining_days: i64,
}

/// POST /activate-license
pub async fn activate_license(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    Json(input): Json<ActivateLicenseRequest>,
) -> Result<Json<ActivateLicenseResponse>> {
    let mut conn = state.db.get()?;
    let now = Utc::now().timestamp();

    let activation = licensing::activate(
        &mut conn,
        &input.license_key,
        &principal,
        input.device_id.as_deref(),
        now,
    )?;

    if activation.newly_activated {
        if let Some(audit) = state.audit_conn() {
            AuditLogBuilder::new(&audit, state.audit_log_enabled, &headers)
                .principal(&principal)
                .action(AuditAction::ActivateLicense)
                .resource("license", &activation.license_key)
                .details(&serde_json::json!({
                    "expires_at": activation.expires_at,
                    "device_id": activation.device_id,
                }))
                .save_or_warn();
        }
    }

    Ok(Json(ActivateLicenseResponse {
        success: true,
        license_key: activation.license_key,
        expires_at: activation.expires_at,
        remaining_days: activation.remaining_days,
    }))
}
