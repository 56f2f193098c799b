//! Database schema migrations for feelsy.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(tx: &Connection, version: i32) -> SqliteResult<()> {
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: users, friendship edges, check-ins, streaks, vibes.
///
/// At most one non-deleted check-in per (user, date) is enforced by a
/// partial unique index, not by the application.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id         TEXT PRIMARY KEY,
            email      TEXT NOT NULL,
            name       TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS friend_edges (
            user_id    TEXT NOT NULL,
            friend_id  TEXT NOT NULL,
            status     TEXT NOT NULL DEFAULT 'pending'
                       CHECK (status IN ('pending', 'accepted', 'blocked')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, friend_id)
        );
        CREATE INDEX IF NOT EXISTS idx_friend_edges_friend ON friend_edges(friend_id, status);

        CREATE TABLE IF NOT EXISTS feel_checks (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL,
            mood_score   INTEGER NOT NULL CHECK (mood_score BETWEEN 1 AND 100),
            energy_score INTEGER NOT NULL CHECK (energy_score BETWEEN 1 AND 100),
            feel_score   INTEGER NOT NULL CHECK (feel_score BETWEEN 1 AND 100),
            mood_emoji   TEXT,
            note         TEXT,
            color_hex    TEXT NOT NULL,
            check_date   TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            deleted_at   TEXT
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_feel_checks_user_date
            ON feel_checks(user_id, check_date) WHERE deleted_at IS NULL;
        CREATE INDEX IF NOT EXISTS idx_feel_checks_date ON feel_checks(check_date);

        CREATE TABLE IF NOT EXISTS feel_streaks (
            user_id         TEXT PRIMARY KEY,
            current_streak  INTEGER NOT NULL DEFAULT 0,
            longest_streak  INTEGER NOT NULL DEFAULT 0,
            total_check_ins INTEGER NOT NULL DEFAULT 0,
            last_check_date TEXT,
            average_score   REAL NOT NULL DEFAULT 0,
            unlocked_badges TEXT NOT NULL DEFAULT '[]',
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS good_vibes (
            id          TEXT PRIMARY KEY,
            sender_id   TEXT NOT NULL,
            receiver_id TEXT NOT NULL,
            message     TEXT,
            vibe_type   TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            deleted_at  TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_good_vibes_receiver ON good_vibes(receiver_id, created_at);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    debug!("applied schema migration v1");
    Ok(())
}

/// Migration v2: durable streak job queue.
///
/// One row per accepted check-in, inserted in the same transaction as the
/// check-in itself.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS streak_jobs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT NOT NULL,
            check_in_id TEXT NOT NULL UNIQUE,
            check_date  TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'done', 'dead')),
            attempts    INTEGER NOT NULL DEFAULT 0,
            last_error  TEXT,
            enqueued_at TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_streak_jobs_pending
            ON streak_jobs(status, user_id, check_date);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    debug!("applied schema migration v2");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn upgrades_from_v1() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 1);

        migrate(&conn).unwrap();
        let jobs_table: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'streak_jobs'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(jobs_table, 1);
    }

    #[test]
    fn unique_index_ignores_deleted_rows() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let insert = "INSERT INTO feel_checks
            (id, user_id, mood_score, energy_score, feel_score, color_hex, check_date, created_at, deleted_at)
            VALUES (?1, 'u1', 50, 50, 50, '#f97316', '2025-01-01', '2025-01-01T00:00:00Z', ?2)";
        conn.execute(insert, rusqlite::params!["a", "2025-01-01T01:00:00Z"]).unwrap();
        conn.execute(insert, rusqlite::params!["b", Option::<String>::None]).unwrap();
        assert!(conn
            .execute(insert, rusqlite::params!["c", Option::<String>::None])
            .is_err());
    }
}
