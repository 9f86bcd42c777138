use axum::{
    extract::{Extension, State},
    http::HeaderMap,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;
use crate::models::{AuditAction, Principal};
use crate::redirect;
use crate::util::AuditLogBuilder;

#[derive(Debug, Deserialize)]
pub struct CreateRedirectTokenRequest {
    #[serde(default)]
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRedirectTokenResponse {
    /// Opaque single-use id. Possession is enough to redeem it once.
    pub id: String,
    pub expires_at: i64,
    /// Gateway URL that redeems this token
    pub url: String,
}

/// POST /create-redirect-token
pub async fn create_redirect_token(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    Json(input): Json<CreateRedirectTokenRequest>,
) -> Result<Json<CreateRedirectTokenResponse>> {
    let conn = state.db.get()?;
    let now = Utc::now().timestamp();

    let issued = redirect::issue(
        &conn,
        &input.target,
        &principal,
        state.redirect_token_ttl_secs,
        &state.allowed_redirect_hosts,
        now,
    )?;

    if let Some(audit) = state.audit_conn() {
        AuditLogBuilder::new(&audit, state.audit_log_enabled, &headers)
            .principal(&principal)
            .action(AuditAction::IssueRedirectToken)
            .resource("redirect_token", &issued.token.id_hash)
            .details(&serde_json::json!({
                "target": issued.token.target,
                "expires_at": issued.token.expires_at,
            }))
            .save_or_warn();
    }

    Ok(Json(CreateRedirectTokenResponse {
        url: format!("{}/redeem/{}", state.base_url, issued.id),
        expires_at: issued.token.expires_at,
        id: issued.id,
    }))
}
