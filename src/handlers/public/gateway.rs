//! The access gateway: turns a redirect token id into a redirect.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::{TypedHeader, headers::CacheControl};
use chrono::Utc;

use crate::db::AppState;
use crate::error::AppError;
use crate::models::{ActorType, AuditAction, RedirectToken};
use crate::redirect::{self, RedeemOutcome};
use crate::util::AuditLogBuilder;

/// GET /redeem/{id} (also /go/{id})
///
/// No authentication: holding the id is the credential, once. Every response
/// is marked `no-store` so going back in the browser can't replay a redirect.
pub async fn redeem_redirect_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let no_store = TypedHeader(CacheControl::new().with_no_store());
    let now = Utc::now().timestamp();

    let outcome = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| redirect::redeem(&conn, &id, now));

    match outcome {
        Ok(RedeemOutcome::Redirect(token)) => {
            audit_redemption(&state, &headers, AuditAction::RedeemRedirectToken, &token);
            (
                StatusCode::FOUND,
                no_store,
                [(header::LOCATION, token.target)],
            )
                .into_response()
        }
        Ok(RedeemOutcome::Expired(token)) => {
            audit_redemption(&state, &headers, AuditAction::ExpireRedirectToken, &token);
            (StatusCode::GONE, no_store, "This link has expired").into_response()
        }
        Ok(RedeemOutcome::NotFound) => {
            (StatusCode::NOT_FOUND, no_store, "Link not found").into_response()
        }
        Err(e) => {
            tracing::error!("Redirect token redemption failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                no_store,
                "Internal server error",
            )
                .into_response()
        }
    }
}

fn audit_redemption(
    state: &AppState,
    headers: &HeaderMap,
    action: AuditAction,
    token: &RedirectToken,
) {
    if let Some(audit) = state.audit_conn() {
        AuditLogBuilder::new(&audit, state.audit_log_enabled, headers)
            .actor(ActorType::Public, None)
            .action(action)
            .resource("redirect_token", &token.id_hash)
            .details(&serde_json::json!({
                "created_by": token.created_by_principal_id,
                "expires_at": token.expires_at,
            }))
            .save_or_warn();
    }
}
