use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::{Rng, RngCore, rngs::OsRng};
use rusqlite::{Connection, ErrorCode, params};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{
    AUDIT_LOG_COLS, LICENSE_COLS, REDIRECT_TOKEN_COLS, query_all, query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Hash a bearer secret for storage/lookup. Uses SHA-256 with an application
/// salt, returns lowercase hex.
pub fn hash_secret(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"licensegate-v1:");
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

// ============ Licenses ============

/// Generate a license key in the familiar PREFIX-XXXX-XXXX-XXXX-XXXX format.
/// The alphabet leaves out characters that are easy to misread (0/O, 1/I).
pub fn generate_license_key(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let chars: Vec<char> = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789".chars().collect();

    let mut part = || -> String {
        (0..4)
            .map(|_| chars[rng.gen_range(0..chars.len())])
            .collect()
    };

    format!("{}-{}-{}-{}-{}", prefix, part(), part(), part(), part())
}

/// Create an unused license. Fails with `Conflict` if the key already exists.
pub fn create_license(conn: &Connection, input: &CreateLicense) -> Result<License> {
    let created_at = now();

    conn.execute(
        "INSERT INTO licenses (key, class, term_days, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![&input.key, &input.class, input.term_days, created_at],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            AppError::Conflict(format!("License key '{}' already exists", input.key))
        } else {
            e.into()
        }
    })?;

    Ok(License {
        key: input.key.clone(),
        class: input.class.clone(),
        term_days: input.term_days,
        owner_principal_id: None,
        owner_email: None,
        device_id: None,
        activated_at: None,
        expires_at: None,
        created_at,
    })
}

pub fn get_license_by_key(conn: &Connection, key: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE key = ?1", LICENSE_COLS),
        &[&key],
    )
}

/// All licenses owned by a principal, oldest first.
pub fn list_licenses_for_owner(conn: &Connection, owner_principal_id: &str) -> Result<Vec<License>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM licenses WHERE owner_principal_id = ?1 ORDER BY created_at, rowid",
            LICENSE_COLS
        ),
        &[&owner_principal_id],
    )
}

/// Atomically bind an unused license to its first owner.
///
/// Compare-and-set on `owner_principal_id IS NULL`: returns `Ok(true)` if this
/// call claimed the license, `Ok(false)` if it was already owned (or missing).
pub fn try_claim_license(
    conn: &Connection,
    key: &str,
    owner: &Principal,
    device_id: Option<&str>,
    activated_at: i64,
    expires_at: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses
         SET owner_principal_id = ?1, owner_email = ?2, device_id = ?3, activated_at = ?4, expires_at = ?5
         WHERE key = ?6 AND owner_principal_id IS NULL",
        params![&owner.id, &owner.email, device_id, activated_at, expires_at, key],
    )?;
    Ok(affected > 0)
}

// ============ Redirect Tokens ============

/// Generate an unguessable token id: 256 bits from the OS CSPRNG, base64url.
pub fn generate_token_id() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn create_redirect_token(
    conn: &Connection,
    target: &str,
    created_by_principal_id: &str,
    created_at: i64,
    expires_at: i64,
) -> Result<IssuedRedirectToken> {
    let id = generate_token_id();
    let id_hash = hash_secret(&id);

    conn.execute(
        "INSERT INTO redirect_tokens (id_hash, target, expires_at, created_by_principal_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id_hash, target, expires_at, created_by_principal_id, created_at],
    )?;

    Ok(IssuedRedirectToken {
        id,
        token: RedirectToken {
            id_hash,
            target: target.to_string(),
            expires_at,
            created_by_principal_id: created_by_principal_id.to_string(),
            created_at,
        },
    })
}

/// Delete a redirect token and return what was stored, in one statement.
///
/// Only one caller can ever receive a given row: concurrent callers with the
/// same id get `None`.
pub fn take_redirect_token(conn: &Connection, id: &str) -> Result<Option<RedirectToken>> {
    let id_hash = hash_secret(id);
    let taken: Vec<RedirectToken> = query_all(
        conn,
        &format!(
            "DELETE FROM redirect_tokens WHERE id_hash = ?1 RETURNING {}",
            REDIRECT_TOKEN_COLS
        ),
        &[&id_hash],
    )?;
    Ok(taken.into_iter().next())
}

// ============ Audit Logs ============

#[allow(clippy::too_many_arguments)]
pub fn create_audit_log(
    conn: &Connection,
    enabled: bool,
    actor_type: ActorType,
    actor_id: Option<&str>,
    actor_email: Option<&str>,
    action: &str,
    resource_type: &str,
    resource_id: &str,
    details: Option<&serde_json::Value>,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<AuditLog> {
    let log = AuditLog {
        id: gen_id(),
        timestamp: now(),
        actor_type,
        actor_id: actor_id.map(String::from),
        actor_email: actor_email.map(String::from),
        action: action.to_string(),
        resource_type: resource_type.to_string(),
        resource_id: resource_id.to_string(),
        details: details.cloned(),
        ip_address: ip_address.map(String::from),
        user_agent: user_agent.map(String::from),
    };

    // Skip database insert if audit logging is disabled
    if !enabled {
        return Ok(log);
    }

    conn.execute(
        "INSERT INTO audit_logs (id, timestamp, actor_type, actor_id, actor_email, action, resource_type, resource_id, details, ip_address, user_agent)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            &log.id,
            log.timestamp,
            actor_type.as_ref(),
            &log.actor_id,
            &log.actor_email,
            &log.action,
            &log.resource_type,
            &log.resource_id,
            details.map(|d| d.to_string()),
            &log.ip_address,
            &log.user_agent,
        ],
    )?;

    Ok(log)
}

/// Audit entries for one resource, newest first.
pub fn list_audit_logs_for_resource(
    conn: &Connection,
    resource_type: &str,
    resource_id: &str,
) -> Result<Vec<AuditLog>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM audit_logs WHERE resource_type = ?1 AND resource_id = ?2 ORDER BY timestamp DESC, rowid DESC",
            AUDIT_LOG_COLS
        ),
        &[&resource_type, &resource_id],
    )
}

/// Purge audit logs older than the retention window.
/// Returns the number of deleted records.
pub fn purge_old_audit_logs(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = now() - (retention_days * 86400);
    let deleted = conn.execute("DELETE FROM audit_logs WHERE timestamp < ?1", params![cutoff])?;
    Ok(deleted)
}
