//! Identity provider token verification.
//!
//! The identity provider signs session tokens with a shared HS256 secret. The
//! subject is the principal id and a custom `email` claim carries the address.

use std::collections::HashSet;

use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Principal;

/// Custom claims read from an identity provider token.
/// Standard claims (sub, iss, aud, exp) are handled by jwt-simple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(default)]
    pub email: Option<String>,
}

/// Resolves bearer credentials into principals.
pub struct PrincipalVerifier {
    key: HS256Key,
    issuer: Option<String>,
    audience: Option<String>,
}

/// Shortest HS256 secret jwt-simple will sign or verify with (96 bits).
pub const MIN_SECRET_LEN: usize = 12;

impl PrincipalVerifier {
    /// Fails on secrets too short to verify anything, so a bad secret is
    /// caught at startup instead of turning every request into a 401.
    pub fn new(secret: &[u8], issuer: Option<String>, audience: Option<String>) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AppError::Internal(format!(
                "Identity token secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self {
            key: HS256Key::from_bytes(secret),
            issuer,
            audience,
        })
    }

    fn options(&self) -> VerificationOptions {
        VerificationOptions {
            allowed_issuers: self.issuer.as_ref().map(|iss| HashSet::from([iss.clone()])),
            allowed_audiences: self.audience.as_ref().map(|aud| HashSet::from([aud.clone()])),
            ..Default::default()
        }
    }

    /// Verify a bearer token and extract the principal it names.
    pub fn verify(&self, token: &str) -> Result<Principal> {
        let claims = self
            .key
            .verify_token::<IdentityClaims>(token, Some(self.options()))
            .map_err(|e| {
                tracing::debug!("Rejected identity token: {}", e);
                AppError::Unauthorized
            })?;

        let id = claims
            .subject
            .filter(|s| !s.trim().is_empty())
            .ok_or(AppError::Unauthorized)?;
        let email = claims
            .custom
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                tracing::debug!("Identity token for {} has no email claim", id);
                AppError::Unauthorized
            })?;

        Ok(Principal::new(id, email.trim()))
    }

    /// Sign a token for a principal with this verifier's secret, issuer and
    /// audience. Used to mint local tokens in development.
    pub fn sign(&self, principal: &Principal, valid_for_secs: u64) -> Result<String> {
        let custom = IdentityClaims {
            email: Some(principal.email.clone()),
        };
        let mut claims = Claims::with_custom_claims(custom, Duration::from_secs(valid_for_secs))
            .with_subject(&principal.id);
        if let Some(issuer) = &self.issuer {
            claims = claims.with_issuer(issuer);
        }
        if let Some(audience) = &self.audience {
            claims = claims.with_audience(audience);
        }

        self.key
            .authenticate(claims)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}
