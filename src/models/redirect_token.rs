use serde::{Deserialize, Serialize};

/// A stored redirect token. The bearer id is never persisted, only its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectToken {
    #[serde(skip_serializing)]
    pub id_hash: String,
    pub target: String,
    pub expires_at: i64,
    pub created_by_principal_id: String,
    pub created_at: i64,
}

/// A freshly issued token. `id` is the only copy of the bearer value.
#[derive(Debug, Clone)]
pub struct IssuedRedirectToken {
    pub id: String,
    pub token: RedirectToken,
}
