use rusqlite::Connection;

/// Initialize the main database schema (licenses and redirect tokens)
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Licenses: owner and expiry are set together, exactly once
        CREATE TABLE IF NOT EXISTS licenses (
            key TEXT PRIMARY KEY,
            class TEXT NOT NULL,
            term_days INTEGER NOT NULL CHECK (term_days > 0),
            owner_principal_id TEXT,
            owner_email TEXT,
            device_id TEXT,
            activated_at INTEGER,
            expires_at INTEGER,
            created_at INTEGER NOT NULL,
            CHECK ((owner_principal_id IS NULL) = (expires_at IS NULL))
        );
        CREATE INDEX IF NOT EXISTS idx_licenses_owner ON licenses(owner_principal_id, created_at);

        -- Redirect tokens: single use, keyed by the SHA-256 of the bearer id
        CREATE TABLE IF NOT EXISTS redirect_tokens (
            id_hash TEXT PRIMARY KEY,
            target TEXT NOT NULL,
            expires_at INTEGER NOT NULL,
            created_by_principal_id TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Initialize the audit log database schema
pub fn init_audit_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            id TEXT PRIMARY KEY,
            timestamp INTEGER NOT NULL,
            actor_type TEXT NOT NULL CHECK (actor_type IN ('principal', 'public', 'system')),
            actor_id TEXT,
            actor_email TEXT,
            action TEXT NOT NULL,
            resource_type TEXT NOT NULL,
            resource_id TEXT NOT NULL,
            details TEXT,
            ip_address TEXT,
            user_agent TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_audit_logs_timestamp ON audit_logs(timestamp);
        CREATE INDEX IF NOT EXISTS idx_audit_logs_actor ON audit_logs(actor_id);
        CREATE INDEX IF NOT EXISTS idx_audit_logs_resource ON audit_logs(resource_type, resource_id);
        "#,
    )?;
    Ok(())
}
