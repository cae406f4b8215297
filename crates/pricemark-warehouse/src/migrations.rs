use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_price_observations",
        sql: r#"
CREATE TABLE IF NOT EXISTS price_observations (
    portfolio TEXT NOT NULL,
    owner TEXT NOT NULL,
    instrument TEXT NOT NULL,
    ts TIMESTAMP NOT NULL,
    price DECIMAL(38, 10) NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_price_observations_portfolio_ts
    ON price_observations(portfolio, ts);
"#,
    },
    Migration {
        version: "0002_import_log",
        sql: r#"
CREATE TABLE IF NOT EXISTS import_log (
    source TEXT NOT NULL,
    row_count BIGINT NOT NULL,
    imported_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
];

/// Applies every migration not yet recorded in `schema_migrations`.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
            tracing::debug!(version = migration.version, "migration applied");
        }
    }

    Ok(())
}
