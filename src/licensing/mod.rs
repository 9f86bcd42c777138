//! License lifecycle: provisioning, activation, inspection and device checks.
//!
//! Operations take the principal and the current time explicitly. Mutating
//! operations run as one read-modify-write under SQLite's write lock.

mod state;

pub use state::*;

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::config::LicenseClass;
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{CreateLicense, License, LicenseStatus, Principal};

/// Outcome of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub license_key: String,
    pub expires_at: i64,
    pub remaining_days: i64,
    /// Device the license is bound to, as stored
    pub device_id: Option<String>,
    /// False when the caller already owned the license
    pub newly_activated: bool,
}

/// A license as a given principal is allowed to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseView {
    pub license_key: String,
    pub status: LicenseStatus,
    /// Only shown to the owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Only present while active
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_days: Option<i64>,
    /// Owner's email, whenever the license is owned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl LicenseView {
    pub fn for_principal(license: &License, principal_id: &str, now: i64) -> Self {
        let status = license.status_for(principal_id, now);
        let expires_at = match status {
            LicenseStatus::Active | LicenseStatus::Expired => license.expires_at,
            LicenseStatus::Unused | LicenseStatus::ForeignOwned => None,
        };
        let remaining_days = match (status, license.expires_at) {
            (LicenseStatus::Active, Some(exp)) => Some(remaining_days(exp, now)),
            _ => None,
        };
        Self {
            license_key: license.key.clone(),
            status,
            expires_at,
            remaining_days,
            email: license.owner_email.clone().filter(|_| license.is_owned()),
        }
    }
}

fn normalize_key(key: &str) -> Result<&str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::BadRequest("license_key is required".into()));
    }
    Ok(key)
}

/// Mint a new unused license under `class`. A missing key is generated.
pub fn create_license(
    conn: &Connection,
    class: &LicenseClass,
    key: Option<&str>,
    key_prefix: &str,
) -> Result<License> {
    let key = match key {
        Some(k) => normalize_key(k)?.to_string(),
        None => queries::generate_license_key(key_prefix),
    };

    let license = queries::create_license(
        conn,
        &CreateLicense {
            key,
            class: class.name.clone(),
            term_days: class.term_days,
        },
    )?;

    tracing::info!(
        "Created {} license {} ({} days)",
        license.class,
        license.key,
        license.term_days
    );
    Ok(license)
}

/// Activate `key` for `principal`.
///
/// The first principal to activate an unused license becomes its owner and
/// the license runs for its term from `now`. Repeat activations by the owner
/// are idempotent while the license is active.
pub fn activate(
    conn: &mut Connection,
    key: &str,
    principal: &Principal,
    device_id: Option<&str>,
    now: i64,
) -> Result<Activation> {
    let key = normalize_key(key)?;
    let device_id = device_id.map(str::trim).filter(|d| !d.is_empty());

    // IMMEDIATE takes the write lock up front so concurrent activations of the
    // same key serialize and each one decides on the committed state.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let license = queries::get_license_by_key(&tx, key)?
        .ok_or_else(|| AppError::NotFound("License key not found".into()))?;

    let activation = match decide_activation(&license, principal, now)? {
        ActivationDecision::Claim { expires_at } => {
            if !queries::try_claim_license(&tx, key, principal, device_id, now, expires_at)? {
                tracing::warn!("License {} changed under the write lock", key);
                return Err(AppError::Conflict(
                    "License was activated concurrently, try again".into(),
                ));
            }
            Activation {
                license_key: license.key,
                expires_at,
                remaining_days: remaining_days(expires_at, now),
                device_id: device_id.map(String::from),
                newly_activated: true,
            }
        }
        ActivationDecision::AlreadyActive { expires_at } => Activation {
            license_key: license.key,
            expires_at,
            remaining_days: remaining_days(expires_at, now),
            device_id: license.device_id,
            newly_activated: false,
        },
    };

    tx.commit()?;

    if activation.newly_activated {
        tracing::info!(
            "License {} activated by {} until {}",
            activation.license_key,
            principal.id,
            activation.expires_at
        );
    }
    Ok(activation)
}

/// Inspect a license without changing it.
///
/// With a key, anyone may look (non-owners see only the owner's email).
/// Without one, the caller's own license is used: the first by creation
/// order when they own several.
pub fn check(
    conn: &Connection,
    key: Option<&str>,
    principal: &Principal,
    now: i64,
) -> Result<LicenseView> {
    let key = key.map(str::trim).filter(|k| !k.is_empty());

    let license = match key {
        Some(key) => queries::get_license_by_key(conn, key)?
            .ok_or_else(|| AppError::NotFound("License key not found".into()))?,
        None => {
            let owned = queries::list_licenses_for_owner(conn, &principal.id)?;
            if owned.len() > 1 {
                tracing::debug!(
                    "Principal {} owns {} licenses, checking the oldest",
                    principal.id,
                    owned.len()
                );
            }
            owned
                .into_iter()
                .next()
                .ok_or_else(|| AppError::NotFound("No license is activated for this account".into()))?
        }
    };

    Ok(LicenseView::for_principal(&license, &principal.id, now))
}

/// Every license the principal owns, oldest first.
pub fn list(conn: &Connection, principal: &Principal, now: i64) -> Result<Vec<LicenseView>> {
    Ok(queries::list_licenses_for_owner(conn, &principal.id)?
        .iter()
        .map(|license| LicenseView::for_principal(license, &principal.id, now))
        .collect())
}

/// Check that `key` is active and usable on `device_id`.
///
/// A license with no bound device is usable anywhere; a bound one only on
/// its device. Returns the license when usable.
pub fn verify_device(
    conn: &Connection,
    key: &str,
    device_id: &str,
    now: i64,
) -> Result<Option<License>> {
    let key = normalize_key(key)?;
    let device_id = device_id.trim();
    if device_id.is_empty() {
        return Err(AppError::BadRequest("device_id is required".into()));
    }

    let Some(license) = queries::get_license_by_key(conn, key)? else {
        return Ok(None);
    };

    let device_ok = license
        .device_id
        .as_deref()
        .is_none_or(|bound| bound == device_id);

    Ok((license.is_active_at(now) && device_ok).then_some(license))
}

/// Run a read-only operation, retrying once if the store itself failed.
///
/// Domain errors (not found, invalid input) are returned immediately.
pub fn retry_read_once<T>(mut op: impl FnMut() -> Result<T>) -> Result<T> {
    match op() {
        Err(e) if e.is_store_failure() => {
            tracing::warn!("Read failed, retrying once: {}", e);
            op()
        }
        result => result,
    }
}
