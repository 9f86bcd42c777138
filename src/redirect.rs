//! Single-use redirect tokens.
//!
//! A token is an opaque id standing in for a protected target URL. Only its
//! digest is stored, and redeeming it deletes it in the same statement that
//! reads it, so a token can never be redeemed twice.

use axum::http::Uri;
use rusqlite::Connection;

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{IssuedRedirectToken, Principal, RedirectToken};

const MAX_TARGET_LEN: usize = 2048;

/// What redeeming a token id decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// Valid token, now consumed. Send the caller here.
    Redirect(RedirectToken),
    /// Unknown or already used.
    NotFound,
    /// Past its deadline. The token has been deleted.
    Expired(RedirectToken),
}

/// Check a redirect target and return it normalised.
///
/// Targets must be absolute http(s) URLs with a host. When `allowed_hosts` is
/// non-empty the host must be one of them.
pub fn validate_target(target: &str, allowed_hosts: &[String]) -> Result<String> {
    let target = target.trim();
    if target.is_empty() {
        return Err(AppError::BadRequest("target is required".into()));
    }
    if target.len() > MAX_TARGET_LEN {
        return Err(AppError::BadRequest(format!(
            "target must be at most {} characters",
            MAX_TARGET_LEN
        )));
    }

    let uri: Uri = target
        .parse()
        .map_err(|_| AppError::BadRequest("target must be an absolute URL".into()))?;

    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        _ => {
            return Err(AppError::BadRequest(
                "target must use http or https".into(),
            ));
        }
    }

    let host = uri
        .host()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::BadRequest("target must include a host".into()))?
        .to_ascii_lowercase();

    if !allowed_hosts.is_empty() && !allowed_hosts.iter().any(|h| *h == host) {
        return Err(AppError::BadRequest(format!(
            "Redirects to '{}' are not allowed",
            host
        )));
    }

    Ok(target.to_string())
}

/// Issue a token that redirects to `target` for the next `ttl_secs` seconds.
pub fn issue(
    conn: &Connection,
    target: &str,
    principal: &Principal,
    ttl_secs: i64,
    allowed_hosts: &[String],
    now: i64,
) -> Result<IssuedRedirectToken> {
    let target = validate_target(target, allowed_hosts)?;
    let expires_at = now
        .checked_add(ttl_secs)
        .ok_or_else(|| AppError::Internal(format!("Invalid redirect token TTL {}", ttl_secs)))?;
    let issued = queries::create_redirect_token(conn, &target, &principal.id, now, expires_at)?;

    tracing::debug!(
        "Issued redirect token {} for {} (expires {})",
        &issued.token.id_hash[..12],
        principal.id,
        issued.token.expires_at
    );
    Ok(issued)
}

/// Consume a token id.
///
/// The token is deleted whether it is still valid or not, so an expired
/// token reports `Expired` once and `NotFound` afterwards.
pub fn redeem(conn: &Connection, id: &str, now: i64) -> Result<RedeemOutcome> {
    let id = id.trim();
    if id.is_empty() {
        return Ok(RedeemOutcome::NotFound);
    }

    Ok(match queries::take_redirect_token(conn, id)? {
        None => RedeemOutcome::NotFound,
        Some(token) if now >= token.expires_at => RedeemOutcome::Expired(token),
        Some(token) => RedeemOutcome::Redirect(token),
    })
}
