//! Durable streak job queue.
//!
//! Jobs are written with their check-in (see [`Database::insert_check_in`])
//! and move `pending -> done` or `pending -> dead`. Applying a job and
//! marking it done commit together, so a redelivered job is a no-op.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use super::database::{
    conversion_error, format_timestamp, get_date, get_streak_on, get_timestamp, get_uuid, save_streak_on,
    score_history_on, Database,
};
use crate::error::Result;
use crate::models::{JobStatus, QueueStatus, StreakJob};
use crate::streak::{advance, StreakTransition};

const JOB_COLUMNS: &str =
    "id, user_id, check_in_id, check_date, status, attempts, last_error, enqueued_at, updated_at";

fn row_to_job(row: &Row) -> rusqlite::Result<StreakJob> {
    let status: String = row.get(4)?;
    let status = status.parse::<JobStatus>().map_err(|e| conversion_error(4, e))?;
    Ok(StreakJob {
        id: row.get(0)?,
        user_id: get_uuid(row, 1)?,
        check_in_id: get_uuid(row, 2)?,
        check_date: get_date(row, 3)?,
        status,
        attempts: row.get(5)?,
        last_error: row.get(6)?,
        enqueued_at: get_timestamp(row, 7)?,
        updated_at: get_timestamp(row, 8)?,
    })
}

fn job_on(conn: &Connection, job_id: i64) -> rusqlite::Result<Option<StreakJob>> {
    conn.query_row(
        &format!("SELECT {JOB_COLUMNS} FROM streak_jobs WHERE id = ?1"),
        params![job_id],
        row_to_job,
    )
    .optional()
}

impl Database {
    pub fn streak_job(&self, job_id: i64) -> Result<Option<StreakJob>> {
        let conn = self.conn()?;
        Ok(job_on(&conn, job_id)?)
    }

    /// Users with pending jobs, longest-waiting first.
    pub fn pending_job_users(&self, limit: usize) -> Result<Vec<Uuid>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id FROM streak_jobs WHERE status = 'pending'
             GROUP BY user_id ORDER BY MIN(id) LIMIT ?1",
        )?;
        let users = stmt
            .query_map(params![limit as i64], |row| get_uuid(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// One user's pending jobs in check-date order.
    pub fn pending_streak_jobs_for(&self, user_id: Uuid, limit: usize) -> Result<Vec<StreakJob>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM streak_jobs
             WHERE user_id = ?1 AND status = 'pending'
             ORDER BY check_date, id LIMIT ?2"
        ))?;
        let jobs = stmt
            .query_map(params![user_id.to_string(), limit as i64], row_to_job)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    /// Apply a pending job to its user's streak and mark it done.
    ///
    /// Returns `None` when the job is missing or no longer pending. The
    /// caller must hold the user's lock from [`crate::streak::UserLocks`].
    pub fn apply_streak_job(
        &self,
        job_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<StreakTransition>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(job) = job_on(&tx, job_id)? else {
            return Ok(None);
        };
        if job.status != JobStatus::Pending {
            debug!(job_id, status = job.status.as_str(), "streak job already settled");
            return Ok(None);
        }

        let previous = get_streak_on(&tx, job.user_id)?;
        let history = score_history_on(&tx, job.user_id)?;
        let transition = advance(job.user_id, previous.as_ref(), job.check_date, history);

        if !transition.outcome.is_noop() {
            save_streak_on(&tx, &transition.state)?;
        }
        tx.execute(
            "UPDATE streak_jobs SET status = 'done', attempts = attempts + 1, last_error = NULL, updated_at = ?1
             WHERE id = ?2",
            params![format_timestamp(now), job_id],
        )?;

        tx.commit()?;
        Ok(Some(transition))
    }

    /// Record a failed attempt. The job goes dead once `max_attempts` is reached.
    pub fn record_streak_job_failure(
        &self,
        job_id: i64,
        error: &str,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<JobStatus> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let attempts: u32 = tx.query_row(
            "SELECT attempts FROM streak_jobs WHERE id = ?1",
            params![job_id],
            |row| row.get(0),
        )?;
        let attempts = attempts + 1;
        let status = if attempts >= max_attempts {
            JobStatus::Dead
        } else {
            JobStatus::Pending
        };

        tx.execute(
            "UPDATE streak_jobs SET status = ?1, attempts = ?2, last_error = ?3, updated_at = ?4
             WHERE id = ?5 AND status = 'pending'",
            params![
                status.as_str(),
                attempts,
                error,
                format_timestamp(now),
                job_id
            ],
        )?;
        tx.commit()?;
        Ok(status)
    }

    pub fn streak_queue_status(&self) -> Result<QueueStatus> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM streak_jobs GROUP BY status")?;
        let mut rows = stmt.query([])?;

        let mut status = QueueStatus::default();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let count: u64 = row.get(1)?;
            match name.parse::<JobStatus>().map_err(|e| conversion_error(0, e))? {
                JobStatus::Pending => status.pending = count,
                JobStatus::Done => status.done = count,
                JobStatus::Dead => status.dead = count,
            }
        }
        Ok(status)
    }

    /// Dead jobs, most recently failed first.
    pub fn dead_streak_jobs(&self, limit: usize) -> Result<Vec<StreakJob>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM streak_jobs WHERE status = 'dead'
             ORDER BY updated_at DESC LIMIT ?1"
        ))?;
        let jobs = stmt
            .query_map(params![limit as i64], row_to_job)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    /// Delete done jobs last touched before `cutoff`. Returns the count removed.
    pub fn purge_done_streak_jobs(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM streak_jobs WHERE status = 'done' AND updated_at < ?1",
            params![format_timestamp(cutoff)],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::CheckIn;
    use crate::streak::StreakOutcome;

    fn store(db: &Database, user_id: Uuid, date: &str) -> i64 {
        let check = CheckIn {
            id: Uuid::new_v4(),
            user_id,
            mood_score: 80,
            energy_score: 60,
            feel_score: 70,
            mood_emoji: None,
            note: None,
            color_hex: "#84cc16".into(),
            check_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            created_at: Utc::now(),
        };
        db.insert_check_in(&check).unwrap()
    }

    #[test]
    fn check_in_enqueues_pending_job() {
        let db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();
        let job_id = store(&db, user, "2025-06-01");

        let job = db.streak_job(job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
        assert_eq!(db.pending_job_users(10).unwrap(), vec![user]);
        assert_eq!(db.streak_queue_status().unwrap().pending, 1);
    }

    #[test]
    fn apply_is_once_only() {
        let db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();
        let job_id = store(&db, user, "2025-06-01");

        let t = db.apply_streak_job(job_id, Utc::now()).unwrap().unwrap();
        assert_eq!(t.outcome, StreakOutcome::Started);
        assert!(db.apply_streak_job(job_id, Utc::now()).unwrap().is_none());

        let state = db.get_streak(user).unwrap().unwrap();
        assert_eq!(state.total_check_ins, 1);
        assert_eq!(db.streak_job(job_id).unwrap().unwrap().status, JobStatus::Done);
    }

    #[test]
    fn pending_jobs_ordered_by_date() {
        let db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();
        store(&db, user, "2025-06-01");
        store(&db, Uuid::new_v4(), "2025-06-02");
        store(&db, user, "2025-06-03");

        let dates: Vec<String> = db
            .pending_streak_jobs_for(user, 10)
            .unwrap()
            .iter()
            .map(|j| j.check_date.to_string())
            .collect();
        assert_eq!(dates, vec!["2025-06-01", "2025-06-03"]);
        assert_eq!(db.pending_job_users(10).unwrap().len(), 2);
    }

    #[test]
    fn failures_retry_then_go_dead() {
        let db = Database::open_memory().unwrap();
        let job_id = store(&db, Uuid::new_v4(), "2025-06-01");

        assert_eq!(db.record_streak_job_failure(job_id, "boom", 3, Utc::now()).unwrap(), JobStatus::Pending);
        assert_eq!(db.record_streak_job_failure(job_id, "boom", 3, Utc::now()).unwrap(), JobStatus::Pending);
        assert_eq!(db.record_streak_job_failure(job_id, "boom", 3, Utc::now()).unwrap(), JobStatus::Dead);

        let job = db.streak_job(job_id).unwrap().unwrap();
        assert_eq!(job.attempts, 3);
        assert_eq!(job.last_error.as_deref(), Some("boom"));
        assert_eq!(db.dead_streak_jobs(5).unwrap().len(), 1);
        assert!(db.pending_job_users(10).unwrap().is_empty());
        assert!(db.apply_streak_job(job_id, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn unknown_status_is_a_read_error() {
        let db = Database::open_memory().unwrap();
        let job_id = store(&db, Uuid::new_v4(), "2025-06-01");
        db.with_conn(|c| {
            c.execute_batch(
                "PRAGMA ignore_check_constraints = ON;
                 UPDATE streak_jobs SET status = 'paused';",
            )
        })
        .unwrap();

        assert!(db.streak_job(job_id).is_err());
        assert!(db.streak_queue_status().is_err());
    }

    #[test]
    fn purge_only_touches_done_jobs() {
        let db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();
        let done = store(&db, user, "2025-06-01");
        store(&db, user, "2025-06-02");
        db.apply_streak_job(done, Utc::now()).unwrap();

        assert_eq!(db.purge_done_streak_jobs(Utc::now() - chrono::Duration::hours(1)).unwrap(), 0);
        assert_eq!(db.purge_done_streak_jobs(Utc::now() + chrono::Duration::hours(1)).unwrap(), 1);

        let status = db.streak_queue_status().unwrap();
        assert_eq!(status, QueueStatus { pending: 1, done: 0, dead: 0 });
    }
}
