use axum::{extract::State, http::HeaderMap};
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::licensing;
use crate::models::{ActorType, AuditAction};
use crate::util::AuditLogBuilder;

#[derive(Debug, Deserialize)]
pub struct DevCreateLicense {
    /// License class, e.g. "trial"
    pub class: String,
    /// Explicit key (optional, generated otherwise)
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DevLicenseCreated {
    pub license_key: String,
    pub class: String,
    pub term_days: i64,
}

/// POST /dev/create-license
pub async fn create_dev_license(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<DevCreateLicense>,
) -> Result<Json<DevLicenseCreated>> {
    let class = state.license_class(&input.class).ok_or_else(|| {
        AppError::BadRequest(format!("Unknown license class '{}'", input.class.trim()))
    })?;

    let conn = state.db.get()?;
    let license = licensing::create_license(
        &conn,
        class,
        input.key.as_deref(),
        &state.license_key_prefix,
    )?;

    if let Some(audit) = state.audit_conn() {
        AuditLogBuilder::new(&audit, state.audit_log_enabled, &headers)
            .actor(ActorType::System, Some("dev"))
            .action(AuditAction::CreateLicense)
            .resource("license", &license.key)
            .details(&serde_json::json!({ "class": license.class }))
            .save_or_warn();
    }

    Ok(Json(DevLicenseCreated {
        license_key: license.key,
        class: license.class,
        term_days: license.term_days,
    }))
}
