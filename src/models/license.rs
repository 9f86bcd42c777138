use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// A license key and its assignment state.
///
/// `owner_principal_id` and `expires_at` are either both null (never
/// activated) or both set; the schema enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub key: String,
    /// License class the key was minted under
    pub class: String,
    /// Term granted on activation, captured from the class at creation
    pub term_days: i64,
    pub owner_principal_id: Option<String>,
    /// Owner's email as reported by the identity provider at activation time
    pub owner_email: Option<String>,
    pub device_id: Option<String>,
    pub activated_at: Option<i64>,
    pub expires_at: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateLicense {
    pub key: String,
    pub class: String,
    pub term_days: i64,
}

/// Status of a license as seen by a particular principal. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LicenseStatus {
    Unused,
    Active,
    Expired,
    ForeignOwned,
}
