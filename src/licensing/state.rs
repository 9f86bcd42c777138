//! License status derivation and activation decisions.
//!
//! Everything here is pure: a license record, a principal and a clock reading
//! in, a decision out. The store applies the decision.

use crate::error::{AppError, Result};
use crate::models::{License, LicenseStatus, Principal};

pub const SECONDS_PER_DAY: i64 = 86400;

/// Whole days left until `expires_at`, rounded up. Zero once expired.
pub fn remaining_days(expires_at: i64, now: i64) -> i64 {
    let left = expires_at - now;
    if left <= 0 {
        0
    } else {
        (left + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }
}

/// Expiry granted by activating a license with the given term at `now`.
/// `None` if the term does not fit in a timestamp.
pub fn activation_expiry(term_days: i64, now: i64) -> Option<i64> {
    term_days
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|term| now.checked_add(term))
}

impl License {
    pub fn is_owned(&self) -> bool {
        self.owner_principal_id.is_some()
    }

    pub fn is_owned_by(&self, principal_id: &str) -> bool {
        self.owner_principal_id.as_deref() == Some(principal_id)
    }

    /// Owned and not yet past its expiry.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.is_owned() && self.expires_at.is_some_and(|exp| now < exp)
    }

    /// Status of this license as seen by `principal_id` at `now`.
    pub fn status_for(&self, principal_id: &str, now: i64) -> LicenseStatus {
        if !self.is_owned() {
            LicenseStatus::Unused
        } else if !self.is_owned_by(principal_id) {
            LicenseStatus::ForeignOwned
        } else if self.is_active_at(now) {
            LicenseStatus::Active
        } else {
            LicenseStatus::Expired
        }
    }
}

/// What an activation request should do to a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationDecision {
    /// Unused: bind it to the caller with this expiry.
    Claim { expires_at: i64 },
    /// Already the caller's and still active: nothing to write.
    AlreadyActive { expires_at: i64 },
}

/// Decide an activation. Expired and foreign-owned licenses are errors.
pub fn decide_activation(
    license: &License,
    principal: &Principal,
    now: i64,
) -> Result<ActivationDecision> {
    match license.status_for(&principal.id, now) {
        LicenseStatus::Unused => {
            let expires_at = activation_expiry(license.term_days, now).ok_or_else(|| {
                AppError::Internal(format!(
                    "License {} has an unrepresentable term of {} days",
                    license.key, license.term_days
                ))
            })?;
            Ok(ActivationDecision::Claim { expires_at })
        }
        LicenseStatus::Active => Ok(ActivationDecision::AlreadyActive {
            // Active implies expires_at is set
            expires_at: license.expires_at.unwrap_or(now),
        }),
        LicenseStatus::Expired => Err(AppError::Expired("License has expired".into())),
        LicenseStatus::ForeignOwned => Err(AppError::ForeignOwned {
            owner_email: license.owner_email.clone().unwrap_or_default(),
        }),
    }
}
