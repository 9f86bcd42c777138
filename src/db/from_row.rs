//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to rusqlite errors.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const LICENSE_COLS: &str = "key, class, term_days, owner_principal_id, owner_email, device_id, activated_at, expires_at, created_at";

pub const REDIRECT_TOKEN_COLS: &str =
    "id_hash, target, expires_at, created_by_principal_id, created_at";

pub const AUDIT_LOG_COLS: &str = "id, timestamp, actor_type, actor_id, actor_email, action, resource_type, resource_id, details, ip_address, user_agent";

// ============ FromRow Implementations ============

impl FromRow for License {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(License {
            key: row.get(0)?,
            class: row.get(1)?,
            term_days: row.get(2)?,
            owner_principal_id: row.get(3)?,
            owner_email: row.get(4)?,
            device_id: row.get(5)?,
            activated_at: row.get(6)?,
            expires_at: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl FromRow for RedirectToken {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(RedirectToken {
            id_hash: row.get(0)?,
            target: row.get(1)?,
            expires_at: row.get(2)?,
            created_by_principal_id: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl FromRow for AuditLog {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let details: Option<String> = row.get(8)?;
        Ok(AuditLog {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            actor_type: parse_enum(row, 2, "actor_type")?,
            actor_id: row.get(3)?,
            actor_email: row.get(4)?,
            action: row.get(5)?,
            resource_type: row.get(6)?,
            resource_id: row.get(7)?,
            details: details.and_then(|d| serde_json::from_str(&d).ok()),
            ip_address: row.get(9)?,
            user_agent: row.get(10)?,
        })
    }
}
