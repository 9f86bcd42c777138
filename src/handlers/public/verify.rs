use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;
use crate::licensing::{self, remaining_days};

#[derive(Debug, Deserialize)]
pub struct VerifyLicenseRequest {
    #[serde(default)]
    pub license_key: String,
    #[serde(default)]
    pub device_id: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyLicenseResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_days: Option<i64>,
}

/// POST /verify-license
///
/// Lets an installed client confirm its license is still good on this
/// device. Invalid results carry no reason.
pub async fn verify_license(
    State(state): State<AppState>,
    Json(input): Json<VerifyLicenseRequest>,
) -> Result<Json<VerifyLicenseResponse>> {
    let now = Utc::now().timestamp();
    let usable = licensing::retry_read_once(|| {
        let conn = state.db.get()?;
        licensing::verify_device(&conn, &input.license_key, &input.device_id, now)
    })?;

    let expires_at = usable.and_then(|license| license.expires_at);
    Ok(Json(VerifyLicenseResponse {
        valid: expires_at.is_some(),
        expires_at,
        remaining_days: expires_at.map(|exp| remaining_days(exp, now)),
    }))
}
