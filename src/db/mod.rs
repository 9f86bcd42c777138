mod from_row;
mod schema;
pub mod queries;

pub use schema::{init_audit_db, init_db};

use std::sync::Arc;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::jwt::PrincipalVerifier;
use crate::config::LicenseClass;

pub type DbPool = Pool<SqliteConnectionManager>;

/// How long a writer waits on SQLite's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Application state holding database pools and configuration
#[derive(Clone)]
pub struct AppState {
    /// Main database pool (licenses, redirect tokens)
    pub db: DbPool,
    /// Audit log database pool (separate file to isolate growth)
    pub audit: DbPool,
    /// Public base URL, used to build gateway links
    pub base_url: String,
    pub audit_log_enabled: bool,
    /// Resolves bearer credentials into principals
    pub auth: Arc<PrincipalVerifier>,
    pub redirect_token_ttl_secs: i64,
    /// Hosts a redirect token may target (empty = any)
    pub allowed_redirect_hosts: Arc<Vec<String>>,
    pub license_classes: Arc<Vec<LicenseClass>>,
    pub license_key_prefix: String,
}

impl AppState {
    pub fn license_class(&self, name: &str) -> Option<&LicenseClass> {
        let name = name.trim().to_lowercase();
        self.license_classes.iter().find(|c| c.name == name)
    }

    /// A connection to the audit database, or `None` (with a warning) when
    /// it is unavailable. Auditing never fails the request it describes.
    pub fn audit_conn(&self) -> Option<PooledConnection<SqliteConnectionManager>> {
        self.audit
            .get()
            .inspect_err(|e| tracing::warn!("Audit database unavailable: {}", e))
            .ok()
    }
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")
    });
    Pool::builder().max_size(10).build(manager)
}
