use std::env;

/// A named license term. Keys are minted under a class and take its term
/// at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseClass {
    pub name: String,
    pub term_days: i64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub audit_database_path: String,
    pub base_url: String,
    pub dev_mode: bool,
    /// HS256 secret shared with the identity provider
    pub auth_jwt_secret: Option<String>,
    pub auth_jwt_issuer: Option<String>,
    pub auth_jwt_audience: Option<String>,
    /// Lifetime of a redirect token in seconds
    pub redirect_token_ttl_secs: i64,
    /// Hosts a redirect token may point at (empty = any host)
    pub allowed_redirect_hosts: Vec<String>,
    pub license_classes: Vec<LicenseClass>,
    pub license_key_prefix: String,
    /// Browser origins allowed to call the API (empty = no CORS layer)
    pub cors_allowed_origins: Vec<String>,
    /// Enable/disable audit logging entirely
    pub audit_log_enabled: bool,
    /// Days to retain audit logs before purging (0 = never purge)
    pub audit_log_retention_days: i64,
}

const DEFAULT_LICENSE_CLASSES: &str = "trial=7,standard=30";
const DEFAULT_REDIRECT_TOKEN_TTL_SECS: i64 = 300;
/// Redirect tokens are short-lived; an hour is the longest allowed.
pub const MAX_REDIRECT_TOKEN_TTL_SECS: i64 = 3600;
/// A century. Longer terms are treated as malformed.
pub const MAX_TERM_DAYS: i64 = 36_500;

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let dev_mode = var("LICENSEGATE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = var("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url = var("BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://{}:{}", host, port));

        let redirect_token_ttl_secs = match var("REDIRECT_TOKEN_TTL_SECS")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|ttl| *ttl > 0)
        {
            Some(ttl) if ttl > MAX_REDIRECT_TOKEN_TTL_SECS => {
                tracing::warn!(
                    "REDIRECT_TOKEN_TTL_SECS={} exceeds {}, using default",
                    ttl,
                    MAX_REDIRECT_TOKEN_TTL_SECS
                );
                DEFAULT_REDIRECT_TOKEN_TTL_SECS
            }
            Some(ttl) => ttl,
            None => DEFAULT_REDIRECT_TOKEN_TTL_SECS,
        };

        let license_classes = var("LICENSE_CLASSES")
            .map(|v| parse_license_classes(&v))
            .filter(|classes| !classes.is_empty())
            .unwrap_or_else(|| parse_license_classes(DEFAULT_LICENSE_CLASSES));

        let audit_log_enabled = var("AUDIT_LOG_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let audit_log_retention_days: i64 = var("AUDIT_LOG_RETENTION_DAYS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(90);

        Self {
            host,
            port,
            database_path: var("DATABASE_PATH").unwrap_or_else(|| "licensegate.db".to_string()),
            audit_database_path: var("AUDIT_DATABASE_PATH")
                .unwrap_or_else(|| "licensegate_audit.db".to_string()),
            base_url,
            dev_mode,
            auth_jwt_secret: var("AUTH_JWT_SECRET").filter(|s| !s.is_empty()),
            auth_jwt_issuer: var("AUTH_JWT_ISSUER").filter(|s| !s.is_empty()),
            auth_jwt_audience: var("AUTH_JWT_AUDIENCE").filter(|s| !s.is_empty()),
            redirect_token_ttl_secs,
            allowed_redirect_hosts: var("ALLOWED_REDIRECT_HOSTS")
                .map(|v| split_list(&v).map(|h| h.to_lowercase()).collect())
                .unwrap_or_default(),
            license_classes,
            license_key_prefix: var("LICENSE_KEY_PREFIX")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| "LG".to_string()),
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS")
                .map(|v| split_list(&v).map(String::from).collect())
                .unwrap_or_default(),
            audit_log_enabled,
            audit_log_retention_days,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Parse `name=days` pairs separated by commas. Malformed entries, including
/// terms outside `1..=MAX_TERM_DAYS`, are skipped with a warning.
pub fn parse_license_classes(value: &str) -> Vec<LicenseClass> {
    let mut classes: Vec<LicenseClass> = Vec::new();
    for entry in split_list(value) {
        let parsed = entry.split_once('=').and_then(|(name, days)| {
            let name = name.trim();
            let days = days.trim().parse::<i64>().ok()?;
            (!name.is_empty() && (1..=MAX_TERM_DAYS).contains(&days)).then(|| LicenseClass {
                name: name.to_lowercase(),
                term_days: days,
            })
        });
        match parsed {
            Some(class) if classes.iter().any(|c| c.name == class.name) => {
                tracing::warn!("Duplicate license class '{}' ignored", class.name);
            }
            Some(class) => classes.push(class),
            None => tracing::warn!("Ignoring malformed license class entry '{}'", entry),
        }
    }
    classes
}
