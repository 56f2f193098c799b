//! Check-in, stats and social workflows over [`Database`].
//!
//! `FeelService` is synchronous. The server runs it on blocking threads and
//! drives [`FeelService::process_user_jobs`] from its streak worker; the CLI
//! calls it directly.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, DayBoundary, SystemClock};
use crate::error::{CoreError, Result, ValidationError};
use crate::models::{
    normalize_text, CheckIn, FeelStats, FriendEdge, FriendFeel, GoodVibe, HistoryPage, JobStatus,
    NewCheckIn, PublicUser, QueueStatus, ReceivedVibe, VibeType, VIBE_MESSAGE_MAX_CHARS,
};
use crate::score::FeelScore;
use crate::social::friend_set;
use crate::storage::{Config, Database};
use crate::streak::{StreakOutcome, UserLocks};

pub const HISTORY_DEFAULT_LIMIT: u32 = 20;
pub const HISTORY_MAX_LIMIT: u32 = 100;
pub const VIBES_DEFAULT_LIMIT: u32 = 20;
pub const VIBES_MAX_LIMIT: u32 = 50;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_RETRY_BACKOFF_MS: i64 = 1_000;
// Doubling stops after this many failed attempts.
const MAX_BACKOFF_DOUBLINGS: u32 = 16;

fn clamp_limit(limit: Option<u32>, default: u32, max: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, max)
}

/// Outcome counts of one pass over the streak job queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub applied: usize,
    /// Jobs found already settled.
    pub skipped: usize,
    /// Failed attempts that stay pending for a retry.
    pub failed: usize,
    pub dead: usize,
    /// Users whose next job is still waiting out its retry delay.
    pub deferred: usize,
}

impl ProcessReport {
    pub fn merge(&mut self, other: ProcessReport) {
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.dead += other.dead;
        self.deferred += other.deferred;
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub struct FeelService {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    day: DayBoundary,
    locks: UserLocks,
    max_attempts: u32,
    retry_backoff: chrono::Duration,
}

impl FeelService {
    pub fn new(db: Arc<Database>, day: DayBoundary) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
            day,
            locks: UserLocks::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: chrono::Duration::milliseconds(DEFAULT_RETRY_BACKOFF_MS),
        }
    }

    /// Build from configuration: reference timezone and retry policy.
    pub fn from_config(db: Arc<Database>, config: &Config) -> Result<Self> {
        let backoff_ms = config.streak_worker.retry_backoff_ms;
        let retry_backoff = i64::try_from(backoff_ms)
            .ok()
            .and_then(chrono::Duration::try_milliseconds)
            .ok_or_else(|| {
                ValidationError::invalid("streak_worker.retry_backoff_ms", format!("{backoff_ms} is out of range"))
            })?;
        Ok(Self::new(db, config.day_boundary()?)
            .with_max_attempts(config.streak_worker.max_attempts)
            .with_retry_backoff(retry_backoff))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay before the first retry of a failed job. Each further failure
    /// doubles it.
    pub fn with_retry_backoff(mut self, backoff: chrono::Duration) -> Self {
        self.retry_backoff = backoff.max(chrono::Duration::zero());
        self
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Current calendar date in the reference timezone.
    pub fn today(&self) -> NaiveDate {
        self.day.date_of(self.clock.now())
    }

    // === Check-ins ===

    /// Validate and store today's check-in, enqueueing its streak job.
    ///
    /// # Errors
    /// [`CoreError::Validation`] for bad input (nothing is written),
    /// [`CoreError::DuplicateCheckIn`] if the user already checked in today
    /// and [`CoreError::BackdatedCheckIn`] if today is before their latest
    /// check-in date.
    pub fn create_check_in(&self, user_id: Uuid, input: NewCheckIn) -> Result<CheckIn> {
        let score = FeelScore::compute(input.mood_score, input.energy_score)?;
        let input = input.normalized()?;

        let now = self.clock.now();
        let check = CheckIn {
            id: Uuid::new_v4(),
            user_id,
            mood_score: input.mood_score,
            energy_score: input.energy_score,
            feel_score: score.value,
            mood_emoji: input.mood_emoji,
            note: input.note,
            color_hex: score.color_hex().to_string(),
            check_date: self.day.date_of(now),
            created_at: now,
        };

        let job_id = self.db.insert_check_in(&check)?;
        info!(
            user_id = %user_id,
            date = %check.check_date,
            feel_score = check.feel_score,
            job_id,
            "check-in created"
        );
        Ok(check)
    }

    pub fn today_check_in(&self, user_id: Uuid) -> Result<CheckIn> {
        self.db
            .check_in_on(user_id, self.today())?
            .ok_or_else(|| CoreError::NotFound("check-in for today".into()))
    }

    pub fn feel_history(
        &self,
        user_id: Uuid,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<HistoryPage> {
        let limit = clamp_limit(limit, HISTORY_DEFAULT_LIMIT, HISTORY_MAX_LIMIT);
        let offset = offset.unwrap_or(0);
        let (data, total) = self.db.check_in_history(user_id, limit, offset)?;
        Ok(HistoryPage {
            data,
            total,
            limit,
            offset,
        })
    }

    /// Streak snapshot; zeros and no badges before the first applied job.
    pub fn feel_stats(&self, user_id: Uuid) -> Result<FeelStats> {
        Ok(self
            .db
            .get_streak(user_id)?
            .map(FeelStats::from)
            .unwrap_or_default())
    }

    // === Social ===

    pub fn send_good_vibe(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        message: Option<String>,
        vibe_type: &str,
    ) -> Result<GoodVibe> {
        if sender_id == receiver_id {
            return Err(CoreError::SelfVibe);
        }
        let vibe_type: VibeType = vibe_type.parse()?;
        let message = normalize_text("message", message, VIBE_MESSAGE_MAX_CHARS)?;

        if self.db.get_user(receiver_id)?.is_none() {
            return Err(ValidationError::invalid("receiver_id", "invalid receiver").into());
        }

        let vibe = GoodVibe {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            message,
            vibe_type,
            created_at: self.clock.now(),
        };
        self.db.insert_vibe(&vibe)?;
        debug!(sender = %sender_id, receiver = %receiver_id, vibe_type = %vibe_type, "vibe sent");
        Ok(vibe)
    }

    pub fn received_vibes(&self, user_id: Uuid, limit: Option<u32>) -> Result<Vec<ReceivedVibe>> {
        let limit = clamp_limit(limit, VIBES_DEFAULT_LIMIT, VIBES_MAX_LIMIT);
        self.db.received_vibes(user_id, limit)
    }

    /// Today's check-ins of every accepted friend, newest first.
    pub fn friend_feels(&self, user_id: Uuid) -> Result<Vec<FriendFeel>> {
        let edges = self.db.accepted_edges_touching(user_id)?;
        let friends = friend_set(user_id, &edges);
        if friends.is_empty() {
            return Ok(Vec::new());
        }
        self.db.friend_feels_on(&friends, self.today())
    }

    // === Identity records ===

    pub fn upsert_user(&self, user: &PublicUser) -> Result<()> {
        if user.email.trim().is_empty() {
            return Err(ValidationError::invalid("email", "must not be empty").into());
        }
        self.db.upsert_user(user)
    }

    pub fn set_friend_edge(&self, edge: &FriendEdge) -> Result<()> {
        if edge.user_id == edge.friend_id {
            return Err(ValidationError::invalid("friend_id", "cannot befriend yourself").into());
        }
        self.db.upsert_friend_edge(edge)
    }

    // === Streak jobs ===

    /// Apply up to `limit` of one user's pending jobs in date order.
    ///
    /// Stops at the first job that fails and stays pending, so later dates
    /// never overtake it. A job that goes dead does not block the rest.
    pub fn process_user_jobs(&self, user_id: Uuid, limit: usize) -> Result<ProcessReport> {
        self.locks.with_user(user_id, || {
            let mut report = ProcessReport::default();

            for job in self.db.pending_streak_jobs_for(user_id, limit)? {
                if let Some(retry_at) = self.retry_at(job.attempts, job.updated_at) {
                    if self.clock.now() < retry_at {
                        // Later jobs wait behind this one to keep date order.
                        debug!(user_id = %user_id, job_id = job.id, retry_at = %retry_at, "streak job backing off");
                        report.deferred += 1;
                        break;
                    }
                }
                match self.db.apply_streak_job(job.id, self.clock.now()) {
                    Ok(Some(transition)) => {
                        report.applied += 1;
                        if transition.outcome == StreakOutcome::Backdated {
                            info!(
                                user_id = %user_id,
                                date = %job.check_date,
                                "backdated check-in left streak unchanged"
                            );
                        }
                        for badge in &transition.unlocked {
                            info!(user_id = %user_id, badge = badge.id(), "badge unlocked");
                        }
                        debug!(
                            user_id = %user_id,
                            job_id = job.id,
                            outcome = ?transition.outcome,
                            current_streak = transition.state.current_streak,
                            "streak job applied"
                        );
                    }
                    Ok(None) => report.skipped += 1,
                    Err(e) => {
                        let status = self.db.record_streak_job_failure(
                            job.id,
                            &e.to_string(),
                            self.max_attempts,
                            self.clock.now(),
                        )?;
                        if status == JobStatus::Dead {
                            error!(
                                user_id = %user_id,
                                job_id = job.id,
                                check_in_id = %job.check_in_id,
                                error = %e,
                                "streak job dead after {} attempts",
                                self.max_attempts
                            );
                            report.dead += 1;
                        } else {
                            warn!(
                                user_id = %user_id,
                                job_id = job.id,
                                attempt = job.attempts + 1,
                                error = %e,
                                "streak job failed, will retry"
                            );
                            report.failed += 1;
                            break;
                        }
                    }
                }
            }

            Ok(report)
        })
    }

    /// Earliest time a job that has failed `attempts` times may run again.
    fn retry_at(&self, attempts: u32, last_failure: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if attempts == 0 {
            return None;
        }
        let doublings = (attempts - 1).min(MAX_BACKOFF_DOUBLINGS);
        let delay = self
            .retry_backoff
            .checked_mul(1 << doublings)
            .unwrap_or(chrono::Duration::MAX);
        Some(
            last_failure
                .checked_add_signed(delay)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }

    /// One pass over the queue, user by user.
    pub fn process_streak_jobs(&self, batch_size: usize) -> Result<ProcessReport> {
        let mut report = ProcessReport::default();
        for user_id in self.db.pending_job_users(batch_size)? {
            report.merge(self.process_user_jobs(user_id, batch_size)?);
        }
        Ok(report)
    }

    pub fn queue_status(&self) -> Result<QueueStatus> {
        self.db.streak_queue_status()
    }

    /// Delete applied jobs older than `retain`.
    pub fn purge_done_jobs(&self, retain: chrono::Duration) -> Result<usize> {
        let cutoff = self.clock.now().checked_sub_signed(retain).ok_or_else(|| {
            ValidationError::invalid("retain", format!("{retain} reaches before the supported date range"))
        })?;
        let removed = self.db.purge_done_streak_jobs(cutoff)?;
        if removed > 0 {
            debug!(removed, cutoff = %cutoff, "purged applied streak jobs");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::clock::FixedClock;
    use crate::models::FriendStatus;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn service_at(now: &str) -> (FeelService, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(at(now)));
        let db = Arc::new(Database::open_memory().unwrap());
        let service = FeelService::new(db, DayBoundary::utc()).with_clock(clock.clone());
        (service, clock)
    }

    fn input(mood: i32, energy: i32) -> NewCheckIn {
        NewCheckIn {
            mood_score: mood,
            energy_score: energy,
            mood_emoji: None,
            note: None,
        }
    }

    fn user(service: &FeelService, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        service
            .upsert_user(&PublicUser {
                id,
                email: email.into(),
                name: None,
            })
            .unwrap();
        id
    }

    #[test]
    fn create_derives_score_and_date() {
        let (service, _) = service_at("2025-03-10T08:00:00Z");
        let me = Uuid::new_v4();
        let check = service.create_check_in(me, input(80, 61)).unwrap();

        assert_eq!(check.feel_score, 70);
        assert_eq!(check.color_hex, "#eab308");
        assert_eq!(check.check_date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(service.today_check_in(me).unwrap().id, check.id);
    }

    #[test]
    fn invalid_input_writes_nothing() {
        let (service, _) = service_at("2025-03-10T08:00:00Z");
        let me = Uuid::new_v4();
        assert!(matches!(
            service.create_check_in(me, input(0, 50)),
            Err(CoreError::Validation(_))
        ));
        let long = NewCheckIn {
            note: Some("x".repeat(281)),
            ..input(50, 50)
        };
        assert!(service.create_check_in(me, long).is_err());
        assert_eq!(service.feel_history(me, None, None).unwrap().total, 0);
        assert_eq!(service.queue_status().unwrap(), QueueStatus::default());
    }

    #[test]
    fn second_check_in_same_day_is_duplicate() {
        let (service, clock) = service_at("2025-03-10T08:00:00Z");
        let me = Uuid::new_v4();
        service.create_check_in(me, input(50, 50)).unwrap();

        clock.advance(Duration::hours(10));
        let err = service.create_check_in(me, input(90, 90)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateCheckIn { .. }));
        assert_eq!(service.feel_history(me, None, None).unwrap().total, 1);

        clock.advance(Duration::hours(6));
        service.create_check_in(me, input(90, 90)).unwrap();
        assert_eq!(service.feel_history(me, None, None).unwrap().total, 2);
    }

    #[test]
    fn today_missing_is_not_found() {
        let (service, _) = service_at("2025-03-10T08:00:00Z");
        assert!(matches!(
            service.today_check_in(Uuid::new_v4()),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn streak_extends_resets_and_keeps_longest() {
        let (service, clock) = service_at("2025-03-10T08:00:00Z");
        let me = Uuid::new_v4();

        for _ in 0..3 {
            service.create_check_in(me, input(60, 60)).unwrap();
            service.process_streak_jobs(10).unwrap();
            clock.advance(Duration::days(1));
        }
        let stats = service.feel_stats(me).unwrap();
        assert_eq!((stats.current_streak, stats.longest_streak, stats.total_check_ins), (3, 3, 3));
        assert_eq!(stats.unlocked_badges, vec!["streak_3".to_string()]);

        clock.advance(Duration::days(2));
        service.create_check_in(me, input(60, 60)).unwrap();
        service.process_streak_jobs(10).unwrap();

        let stats = service.feel_stats(me).unwrap();
        assert_eq!((stats.current_streak, stats.longest_streak, stats.total_check_ins), (1, 3, 4));
        // Badges are never revoked.
        assert_eq!(stats.unlocked_badges, vec!["streak_3".to_string()]);
    }

    #[test]
    fn average_is_exact_mean_of_history() {
        let (service, clock) = service_at("2025-03-10T08:00:00Z");
        let me = Uuid::new_v4();
        for (mood, energy) in [(100, 100), (1, 2), (50, 51)] {
            service.create_check_in(me, input(mood, energy)).unwrap();
            clock.advance(Duration::days(1));
        }
        service.process_streak_jobs(10).unwrap();
        assert_eq!(service.feel_stats(me).unwrap().average_score, 151.0 / 3.0);
    }

    #[test]
    fn stats_are_zero_before_any_job() {
        let (service, _) = service_at("2025-03-10T08:00:00Z");
        let me = Uuid::new_v4();
        service.create_check_in(me, input(50, 50)).unwrap();
        assert_eq!(service.feel_stats(me).unwrap(), FeelStats::default());
    }

    #[test]
    fn reprocessing_changes_nothing() {
        let (service, _) = service_at("2025-03-10T08:00:00Z");
        let me = Uuid::new_v4();
        service.create_check_in(me, input(70, 70)).unwrap();

        let first = service.process_streak_jobs(10).unwrap();
        assert_eq!(first.applied, 1);
        let before = service.feel_stats(me).unwrap();

        assert!(service.process_streak_jobs(10).unwrap().is_empty());
        assert_eq!(service.feel_stats(me).unwrap(), before);
    }

    #[test]
    fn failing_job_retries_then_dies_without_blocking_later_jobs() {
        let (service, clock) = service_at("2025-03-10T08:00:00Z");
        let service = service.with_max_attempts(2);
        let me = Uuid::new_v4();

        service.create_check_in(me, input(50, 50)).unwrap();
        service.process_streak_jobs(10).unwrap();

        // Unreadable streak row makes every apply for this user fail.
        service
            .database()
            .with_conn(|c| c.execute("UPDATE feel_streaks SET unlocked_badges = 'oops'", []))
            .unwrap();

        clock.advance(Duration::days(1));
        service.create_check_in(me, input(50, 50)).unwrap();
        clock.advance(Duration::days(1));
        service.create_check_in(me, input(50, 50)).unwrap();

        let pass = service.process_streak_jobs(10).unwrap();
        assert_eq!((pass.applied, pass.failed, pass.dead), (0, 1, 0));
        assert_eq!(service.queue_status().unwrap().pending, 2);

        // Still inside the retry delay: nothing is attempted.
        let pass = service.process_streak_jobs(10).unwrap();
        assert_eq!((pass.applied, pass.failed, pass.dead, pass.deferred), (0, 0, 0, 1));

        clock.advance(Duration::seconds(2));
        let pass = service.process_streak_jobs(10).unwrap();
        assert_eq!(pass.dead, 1);
        assert_eq!(pass.failed, 1);

        let status = service.queue_status().unwrap();
        assert_eq!((status.pending, status.done, status.dead), (1, 1, 1));
    }

    #[test]
    fn rapid_passes_do_not_burn_retry_budget() {
        let (service, clock) = service_at("2025-03-10T08:00:00Z");
        let service = service
            .with_max_attempts(3)
            .with_retry_backoff(Duration::seconds(10));
        let me = Uuid::new_v4();

        service.create_check_in(me, input(50, 50)).unwrap();
        service.process_streak_jobs(10).unwrap();
        service
            .database()
            .with_conn(|c| c.execute("UPDATE feel_streaks SET unlocked_badges = 'oops'", []))
            .unwrap();
        clock.advance(Duration::days(1));
        service.create_check_in(me, input(50, 50)).unwrap();

        assert_eq!(service.process_streak_jobs(10).unwrap().failed, 1);
        for _ in 0..20 {
            assert_eq!(service.process_streak_jobs(10).unwrap().deferred, 1);
        }
        let job = service.database().pending_streak_jobs_for(me, 10).unwrap().remove(0);
        assert_eq!(job.attempts, 1);

        // Second failure doubles the delay.
        clock.advance(Duration::seconds(10));
        assert_eq!(service.process_streak_jobs(10).unwrap().failed, 1);
        clock.advance(Duration::seconds(15));
        assert_eq!(service.process_streak_jobs(10).unwrap().deferred, 1);

        // Repaired before the budget runs out: the job applies.
        service
            .database()
            .with_conn(|c| c.execute("UPDATE feel_streaks SET unlocked_badges = '[]'", []))
            .unwrap();
        clock.advance(Duration::seconds(5));
        let pass = service.process_streak_jobs(10).unwrap();
        assert_eq!((pass.applied, pass.dead), (1, 0));
        assert_eq!(service.feel_stats(me).unwrap().current_streak, 2);
    }

    #[test]
    fn backdated_check_in_is_rejected() {
        let (service, clock) = service_at("2025-03-12T08:00:00Z");
        let me = Uuid::new_v4();
        service.create_check_in(me, input(60, 60)).unwrap();
        service.process_streak_jobs(10).unwrap();
        let before = service.feel_stats(me).unwrap();

        clock.set(at("2025-03-11T08:00:00Z"));
        let err = service.create_check_in(me, input(90, 90)).unwrap_err();
        assert!(matches!(err, CoreError::BackdatedCheckIn { .. }));
        assert!(!err.is_store_error());

        assert!(service.process_streak_jobs(10).unwrap().is_empty());
        assert_eq!(service.feel_stats(me).unwrap(), before);
        assert_eq!(service.feel_history(me, None, None).unwrap().total, 1);
    }

    #[test]
    fn timezone_decides_the_calendar_date() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 10, 23, 30, 0).unwrap()));
        let db = Arc::new(Database::open_memory().unwrap());
        let tokyo = FeelService::new(db.clone(), DayBoundary::from_offset_minutes(540).unwrap())
            .with_clock(clock.clone());
        let utc = FeelService::new(db, DayBoundary::utc()).with_clock(clock);

        assert_eq!(tokyo.today(), NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
        assert_eq!(utc.today(), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }

    #[test]
    fn pending_jobs_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feelsy.db");
        let me = Uuid::new_v4();
        let clock = Arc::new(FixedClock::new(at("2025-03-10T08:00:00Z")));

        {
            let db = Arc::new(Database::open(&path).unwrap());
            let service = FeelService::new(db, DayBoundary::utc()).with_clock(clock.clone());
            service.create_check_in(me, input(40, 40)).unwrap();
        }

        let db = Arc::new(Database::open(&path).unwrap());
        let service = FeelService::new(db, DayBoundary::utc()).with_clock(clock);
        assert_eq!(service.queue_status().unwrap().pending, 1);
        assert_eq!(service.process_streak_jobs(10).unwrap().applied, 1);
        assert_eq!(service.feel_stats(me).unwrap().total_check_ins, 1);
    }

    #[test]
    fn vibes_rules() {
        let (service, _) = service_at("2025-03-10T08:00:00Z");
        let me = user(&service, "me@example.com");
        let friend = user(&service, "friend@example.com");

        assert!(matches!(
            service.send_good_vibe(me, me, None, "hug"),
            Err(CoreError::SelfVibe)
        ));
        assert!(matches!(
            service.send_good_vibe(me, friend, None, "wave"),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            service.send_good_vibe(me, Uuid::new_v4(), None, "hug"),
            Err(CoreError::Validation(_))
        ));
        assert!(service
            .send_good_vibe(me, friend, Some("y".repeat(101)), "hug")
            .is_err());

        let vibe = service
            .send_good_vibe(me, friend, Some("  you got this ".into()), "high-five")
            .unwrap();
        assert_eq!(vibe.message.as_deref(), Some("you got this"));

        let received = service.received_vibes(friend, None).unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].sender.as_ref().unwrap().email, "me@example.com");
    }

    #[test]
    fn limits_are_clamped() {
        let (service, _) = service_at("2025-03-10T08:00:00Z");
        let me = Uuid::new_v4();
        assert_eq!(service.feel_history(me, Some(500), None).unwrap().limit, 100);
        assert_eq!(service.feel_history(me, Some(0), Some(3)).unwrap().limit, 1);
        let page = service.feel_history(me, None, None).unwrap();
        assert_eq!((page.limit, page.offset), (20, 0));
    }

    #[test]
    fn friend_feed_shows_todays_friends_only() {
        let (service, clock) = service_at("2025-03-10T08:00:00Z");
        let me = user(&service, "me@example.com");
        let a = user(&service, "a@example.com");
        let b = user(&service, "b@example.com");
        let stranger = user(&service, "s@example.com");

        service
            .set_friend_edge(&FriendEdge { user_id: me, friend_id: a, status: FriendStatus::Accepted })
            .unwrap();
        service
            .set_friend_edge(&FriendEdge { user_id: b, friend_id: me, status: FriendStatus::Accepted })
            .unwrap();

        assert!(service.friend_feels(me).unwrap().is_empty());

        service.create_check_in(b, input(40, 40)).unwrap();
        service.create_check_in(stranger, input(90, 90)).unwrap();
        clock.advance(Duration::minutes(5));
        service.create_check_in(a, input(80, 80)).unwrap();

        let feed = service.friend_feels(me).unwrap();
        let emails: Vec<&str> = feed.iter().map(|f| f.email.as_str()).collect();
        assert_eq!(emails, vec!["a@example.com", "b@example.com"]);

        // Yesterday's check-ins drop out.
        clock.advance(Duration::days(1));
        assert!(service.friend_feels(me).unwrap().is_empty());
    }

    #[test]
    fn user_without_friends_gets_empty_feed() {
        let (service, _) = service_at("2025-03-10T08:00:00Z");
        assert!(service.friend_feels(Uuid::new_v4()).unwrap().is_empty());
    }
}
