use axum::extract::{Extension, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;
use crate::licensing::{self, LicenseView};
use crate::models::{LicenseStatus, Principal};

#[derive(Debug, Default, Deserialize)]
pub struct CheckLicenseRequest {
    /// Omit to check the caller's own license
    #[serde(default)]
    pub license_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckLicenseResponse {
    /// True only while the license is active for the caller
    pub success: bool,
    #[serde(flatten)]
    pub license: LicenseView,
}

impl From<LicenseView> for CheckLicenseResponse {
    fn from(license: LicenseView) -> Self {
        Self {
            success: license.status == LicenseStatus::Active,
            license,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListLicensesResponse {
    pub licenses: Vec<CheckLicenseResponse>,
}

/// POST /check-license
pub async fn check_license(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<CheckLicenseRequest>,
) -> Result<Json<CheckLicenseResponse>> {
    let now = Utc::now().timestamp();
    let view = licensing::retry_read_once(|| {
        let conn = state.db.get()?;
        licensing::check(&conn, input.license_key.as_deref(), &principal, now)
    })?;
    Ok(Json(view.into()))
}

/// POST /list-licenses
pub async fn list_licenses(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ListLicensesResponse>> {
    let now = Utc::now().timestamp();
    let views = licensing::retry_read_once(|| {
        let conn = state.db.get()?;
        licensing::list(&conn, &principal, now)
    })?;
    Ok(Json(ListLicensesResponse {
        licenses: views.into_iter().map(CheckLicenseResponse::from).collect(),
    }))
}
