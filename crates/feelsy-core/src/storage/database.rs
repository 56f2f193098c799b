//! SQLite-backed storage for check-ins, streaks, vibes, and the identity and
//! friendship records this core reads.
//!
//! One connection guarded by a mutex. Multi-statement writes run inside a
//! transaction while the guard is held.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use super::migrations;
use crate::error::{CoreError, DatabaseError, Result};
use crate::models::{CheckIn, FriendEdge, FriendFeel, GoodVibe, PublicUser, ReceivedVibe};
use crate::streak::{ScoreHistory, StreakState};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// === Helper Functions ===

/// Fixed-width RFC 3339 so text ordering matches time ordering.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn get_uuid(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

const CHECK_IN_COLUMNS: &str = "id, user_id, mood_score, energy_score, feel_score, mood_emoji, note, color_hex, check_date, created_at";

fn row_to_check_in(row: &Row) -> rusqlite::Result<CheckIn> {
    Ok(CheckIn {
        id: get_uuid(row, 0)?,
        user_id: get_uuid(row, 1)?,
        mood_score: row.get(2)?,
        energy_score: row.get(3)?,
        feel_score: row.get(4)?,
        mood_emoji: row.get(5)?,
        note: row.get(6)?,
        color_hex: row.get(7)?,
        check_date: get_date(row, 8)?,
        created_at: get_timestamp(row, 9)?,
    })
}

pub(crate) fn row_to_streak(row: &Row) -> rusqlite::Result<StreakState> {
    let badges_json: String = row.get(6)?;
    let unlocked_badges: BTreeSet<String> =
        serde_json::from_str(&badges_json).map_err(|e| conversion_error(6, e))?;
    let last_check_date: Option<String> = row.get(4)?;
    let last_check_date = match last_check_date {
        Some(s) => Some(NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(4, e))?),
        None => None,
    };
    Ok(StreakState {
        user_id: get_uuid(row, 0)?,
        current_streak: row.get(1)?,
        longest_streak: row.get(2)?,
        total_check_ins: row.get(3)?,
        last_check_date,
        average_score: row.get(5)?,
        unlocked_badges,
    })
}

pub(crate) const STREAK_COLUMNS: &str = "user_id, current_streak, longest_streak, total_check_ins, last_check_date, average_score, unlocked_badges";

fn row_to_vibe(row: &Row) -> rusqlite::Result<GoodVibe> {
    let vibe_type: String = row.get(4)?;
    Ok(GoodVibe {
        id: get_uuid(row, 0)?,
        sender_id: get_uuid(row, 1)?,
        receiver_id: get_uuid(row, 2)?,
        message: row.get(3)?,
        vibe_type: vibe_type.parse().map_err(|e| conversion_error(4, e))?,
        created_at: get_timestamp(row, 5)?,
    })
}

/// SQLite database for check-in storage.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path` and apply migrations.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    /// Run raw statements against the connection (operator tooling, tests).
    pub fn with_conn<R>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<R>) -> Result<R> {
        let conn = self.conn()?;
        Ok(f(&conn)?)
    }

    // === Users and friendship edges ===

    /// Insert or update a user's public identity.
    pub fn upsert_user(&self, user: &PublicUser) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (id, email, name, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET email = excluded.email, name = excluded.name",
            params![
                user.id.to_string(),
                user.email,
                user.name,
                format_timestamp(Utc::now())
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<PublicUser>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, email, name FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok(PublicUser {
                        id: get_uuid(row, 0)?,
                        email: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Insert or update the directed edge owner -> friend.
    pub fn upsert_friend_edge(&self, edge: &FriendEdge) -> Result<()> {
        let conn = self.conn()?;
        let now = format_timestamp(Utc::now());
        conn.execute(
            "INSERT INTO friend_edges (user_id, friend_id, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(user_id, friend_id) DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at",
            params![
                edge.user_id.to_string(),
                edge.friend_id.to_string(),
                edge.status.as_str(),
                now
            ],
        )?;
        Ok(())
    }

    /// Accepted edges with `user_id` at either endpoint.
    pub fn accepted_edges_touching(&self, user_id: Uuid) -> Result<Vec<FriendEdge>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, friend_id, status FROM friend_edges
             WHERE (user_id = ?1 OR friend_id = ?1) AND status = 'accepted'",
        )?;
        let edges = stmt
            .query_map(params![user_id.to_string()], |row| {
                let status: String = row.get(2)?;
                Ok(FriendEdge {
                    user_id: get_uuid(row, 0)?,
                    friend_id: get_uuid(row, 1)?,
                    status: status.parse().map_err(|e| conversion_error(2, e))?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    // === Check-ins ===

    /// Insert a check-in and its streak job in one transaction.
    ///
    /// # Errors
    /// Returns [`CoreError::DuplicateCheckIn`] if a non-deleted check-in
    /// already exists for the same user and date, and
    /// [`CoreError::BackdatedCheckIn`] if one exists for a later date.
    pub fn insert_check_in(&self, check: &CheckIn) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let latest: Option<String> = tx.query_row(
            "SELECT MAX(check_date) FROM feel_checks WHERE user_id = ?1 AND deleted_at IS NULL",
            params![check.user_id.to_string()],
            |row| row.get(0),
        )?;
        if let Some(latest) = latest {
            let latest = NaiveDate::parse_from_str(&latest, "%Y-%m-%d")
                .map_err(|e| conversion_error(0, e))?;
            if check.check_date < latest {
                return Err(CoreError::BackdatedCheckIn {
                    user_id: check.user_id,
                    date: check.check_date,
                    latest,
                });
            }
        }

        let inserted = tx.execute(
            "INSERT INTO feel_checks (id, user_id, mood_score, energy_score, feel_score, mood_emoji, note, color_hex, check_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                check.id.to_string(),
                check.user_id.to_string(),
                check.mood_score,
                check.energy_score,
                check.feel_score,
                check.mood_emoji,
                check.note,
                check.color_hex,
                format_date(check.check_date),
                format_timestamp(check.created_at),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(CoreError::DuplicateCheckIn {
                    user_id: check.user_id,
                    date: check.check_date,
                });
            }
            Err(e) => return Err(e.into()),
        }

        let now = format_timestamp(check.created_at);
        tx.execute(
            "INSERT INTO streak_jobs (user_id, check_in_id, check_date, status, attempts, enqueued_at, updated_at)
             VALUES (?1, ?2, ?3, 'pending', 0, ?4, ?4)",
            params![
                check.user_id.to_string(),
                check.id.to_string(),
                format_date(check.check_date),
                now
            ],
        )?;
        let job_id = tx.last_insert_rowid();

        tx.commit()?;
        debug!(user_id = %check.user_id, date = %check.check_date, job_id, "check-in stored");
        Ok(job_id)
    }

    pub fn check_in_on(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<CheckIn>> {
        let conn = self.conn()?;
        let check = conn
            .query_row(
                &format!(
                    "SELECT {CHECK_IN_COLUMNS} FROM feel_checks
                     WHERE user_id = ?1 AND check_date = ?2 AND deleted_at IS NULL"
                ),
                params![user_id.to_string(), format_date(date)],
                row_to_check_in,
            )
            .optional()?;
        Ok(check)
    }

    /// Newest-date-first page of a user's check-ins, plus the user's total.
    pub fn check_in_history(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<CheckIn>, u64)> {
        let conn = self.conn()?;
        let total: u64 = conn.query_row(
            "SELECT COUNT(*) FROM feel_checks WHERE user_id = ?1 AND deleted_at IS NULL",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {CHECK_IN_COLUMNS} FROM feel_checks
             WHERE user_id = ?1 AND deleted_at IS NULL
             ORDER BY check_date DESC, created_at DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let page = stmt
            .query_map(params![user_id.to_string(), limit, offset], row_to_check_in)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((page, total))
    }

    /// Check-ins on `date` for the given users, joined with their public identity.
    ///
    /// Users without a check-in that day, or without an identity record, are omitted.
    pub fn friend_feels_on(&self, user_ids: &[Uuid], date: NaiveDate) -> Result<Vec<FriendFeel>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let placeholders = (0..user_ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT c.user_id, u.email, u.name, c.feel_score, c.mood_emoji, c.color_hex, c.check_date
             FROM feel_checks c
             JOIN users u ON u.id = c.user_id
             WHERE c.check_date = ?1 AND c.deleted_at IS NULL AND c.user_id IN ({placeholders})
             ORDER BY c.created_at DESC"
        );

        let mut bind: Vec<String> = Vec::with_capacity(user_ids.len() + 1);
        bind.push(format_date(date));
        bind.extend(user_ids.iter().map(Uuid::to_string));

        let mut stmt = conn.prepare(&sql)?;
        let feels = stmt
            .query_map(params_from_iter(bind.iter()), |row| {
                Ok(FriendFeel {
                    user_id: get_uuid(row, 0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    feel_score: row.get(3)?,
                    mood_emoji: row.get(4)?,
                    color_hex: row.get(5)?,
                    check_date: get_date(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(feels)
    }

    // === Streaks ===

    pub fn get_streak(&self, user_id: Uuid) -> Result<Option<StreakState>> {
        let conn = self.conn()?;
        Ok(get_streak_on(&conn, user_id)?)
    }

    // === Good vibes ===

    pub fn insert_vibe(&self, vibe: &GoodVibe) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO good_vibes (id, sender_id, receiver_id, message, vibe_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                vibe.id.to_string(),
                vibe.sender_id.to_string(),
                vibe.receiver_id.to_string(),
                vibe.message,
                vibe.vibe_type.as_str(),
                format_timestamp(vibe.created_at),
            ],
        )?;
        Ok(())
    }

    /// Vibes addressed to `user_id`, newest first, with the sender's identity.
    pub fn received_vibes(&self, user_id: Uuid, limit: u32) -> Result<Vec<ReceivedVibe>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT v.id, v.sender_id, v.receiver_id, v.message, v.vibe_type, v.created_at,
                    u.email, u.name
             FROM good_vibes v
             LEFT JOIN users u ON u.id = v.sender_id
             WHERE v.receiver_id = ?1 AND v.deleted_at IS NULL
             ORDER BY v.created_at DESC, v.rowid DESC
             LIMIT ?2",
        )?;
        let vibes = stmt
            .query_map(params![user_id.to_string(), limit], |row| {
                let vibe = row_to_vibe(row)?;
                let email: Option<String> = row.get(6)?;
                let sender = email.map(|email| -> rusqlite::Result<PublicUser> {
                    Ok(PublicUser {
                        id: vibe.sender_id,
                        email,
                        name: row.get(7)?,
                    })
                });
                Ok(ReceivedVibe {
                    sender: sender.transpose()?,
                    vibe,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vibes)
    }
}

pub(crate) fn score_history_on(conn: &Connection, user_id: Uuid) -> rusqlite::Result<ScoreHistory> {
    conn.query_row(
        "SELECT COALESCE(SUM(feel_score), 0), COUNT(*) FROM feel_checks
         WHERE user_id = ?1 AND deleted_at IS NULL",
        params![user_id.to_string()],
        |row| {
            Ok(ScoreHistory {
                sum: row.get(0)?,
                count: row.get(1)?,
            })
        },
    )
}

pub(crate) fn get_streak_on(conn: &Connection, user_id: Uuid) -> rusqlite::Result<Option<StreakState>> {
    conn.query_row(
        &format!("SELECT {STREAK_COLUMNS} FROM feel_streaks WHERE user_id = ?1"),
        params![user_id.to_string()],
        row_to_streak,
    )
    .optional()
}

pub(crate) fn save_streak_on(conn: &Connection, state: &StreakState) -> Result<()> {
    let badges = serde_json::to_string(&state.unlocked_badges)?;
    let now = format_timestamp(Utc::now());
    conn.execute(
        "INSERT INTO feel_streaks (user_id, current_streak, longest_streak, total_check_ins, last_check_date, average_score, unlocked_badges, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
         ON CONFLICT(user_id) DO UPDATE SET
            current_streak = excluded.current_streak,
            longest_streak = excluded.longest_streak,
            total_check_ins = excluded.total_check_ins,
            last_check_date = excluded.last_check_date,
            average_score = excluded.average_score,
            unlocked_badges = excluded.unlocked_badges,
            updated_at = excluded.updated_at",
        params![
            state.user_id.to_string(),
            state.current_streak,
            state.longest_streak,
            state.total_check_ins,
            state.last_check_date.map(format_date),
            state.average_score,
            badges,
            now,
        ],
    )?;
    Ok(())
}
