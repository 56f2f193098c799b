//! Integration tests for the check-in -> streak job -> stats workflow.
//!
//! These tests drive `FeelService` through many days with a pinned clock and
//! check the streak counters, badges and queue state that come out.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{Duration, TimeZone, Utc};
use feelsy_core::{
    Config, CoreError, Database, DayBoundary, FeelService, FixedClock, NewCheckIn, QueueStatus,
};
use uuid::Uuid;

fn check(mood: i32, energy: i32) -> NewCheckIn {
    NewCheckIn {
        mood_score: mood,
        energy_score: energy,
        mood_emoji: Some("🙂".to_string()),
        note: None,
    }
}

fn fixture() -> (Arc<FeelService>, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
    ));
    let db = Arc::new(Database::open_memory().unwrap());
    let service = FeelService::new(db, DayBoundary::utc()).with_clock(clock.clone());
    (Arc::new(service), clock)
}

#[test]
fn test_thirty_day_run_unlocks_streak_badges() {
    let (service, clock) = fixture();
    let me = Uuid::new_v4();

    for _ in 0..30 {
        service.create_check_in(me, check(70, 70)).unwrap();
        clock.advance(Duration::days(1));
    }
    let report = service.process_streak_jobs(100).unwrap();
    assert_eq!(report.applied, 30);

    let stats = service.feel_stats(me).unwrap();
    assert_eq!(stats.current_streak, 30);
    assert_eq!(stats.longest_streak, 30);
    assert_eq!(stats.total_check_ins, 30);
    assert_eq!(stats.average_score, 70.0);
    assert_eq!(
        stats.unlocked_badges,
        vec!["streak_14", "streak_3", "streak_30", "streak_7", "total_10"]
    );
}

#[test]
fn test_jobs_processed_in_small_batches_keep_date_order() {
    let (service, clock) = fixture();
    let me = Uuid::new_v4();

    for _ in 0..7 {
        service.create_check_in(me, check(50, 50)).unwrap();
        clock.advance(Duration::days(1));
    }

    // Several partial passes must give the same result as one full pass.
    while !service.process_streak_jobs(2).unwrap().is_empty() {}

    let stats = service.feel_stats(me).unwrap();
    assert_eq!((stats.current_streak, stats.total_check_ins), (7, 7));
    assert!(stats.unlocked_badges.contains(&"streak_7".to_string()));
}

#[test]
fn test_concurrent_workers_apply_each_job_once() {
    let (service, clock) = fixture();
    let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

    for _ in 0..5 {
        for user in &users {
            service.create_check_in(*user, check(60, 80)).unwrap();
        }
        clock.advance(Duration::days(1));
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            let users = users.clone();
            thread::spawn(move || {
                for user in users {
                    service.process_user_jobs(user, 100).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    for user in &users {
        let stats = service.feel_stats(*user).unwrap();
        assert_eq!((stats.current_streak, stats.total_check_ins), (5, 5));
    }
    assert_eq!(
        service.queue_status().unwrap(),
        QueueStatus {
            pending: 0,
            done: 20,
            dead: 0
        }
    );
}

#[test]
fn test_service_from_config_uses_reference_timezone() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "[clock]\ntimezone_offset_minutes = -300\n\n[storage]\ndatabase_path = {:?}\n",
            dir.path().join("feelsy.db")
        ),
    )
    .unwrap();

    let config = Config::load_from(&config_path).unwrap();
    let db = Arc::new(Database::open(&config.database_path().unwrap()).unwrap());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 0, 0).unwrap(),
    ));
    let service = FeelService::from_config(db, &config).unwrap().with_clock(clock);

    // 03:00 UTC is still the previous evening at UTC-5.
    let created = service.create_check_in(Uuid::new_v4(), check(40, 40)).unwrap();
    assert_eq!(created.check_date.to_string(), "2025-01-01");
}

#[test]
fn test_purge_keeps_recent_and_pending_jobs() {
    let (service, clock) = fixture();
    let me = Uuid::new_v4();

    service.create_check_in(me, check(50, 50)).unwrap();
    service.process_streak_jobs(10).unwrap();
    clock.advance(Duration::days(1));
    service.create_check_in(me, check(50, 50)).unwrap();

    assert_eq!(service.purge_done_jobs(Duration::hours(48)).unwrap(), 0);
    clock.advance(Duration::days(3));
    assert_eq!(service.purge_done_jobs(Duration::hours(48)).unwrap(), 1);
    assert_eq!(service.queue_status().unwrap().pending, 1);
}

#[test]
fn test_concurrent_double_submit_creates_one_check_in() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feelsy.db");
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
    ));
    // Two connections to the same file, as two server processes would have.
    let services: Vec<Arc<FeelService>> = (0..2)
        .map(|_| {
            let db = Arc::new(Database::open(&path).unwrap());
            Arc::new(FeelService::new(db, DayBoundary::utc()).with_clock(clock.clone()))
        })
        .collect();
    let me = Uuid::new_v4();

    const SUBMITS: usize = 16;
    let barrier = Arc::new(Barrier::new(SUBMITS));
    let handles: Vec<_> = (0..SUBMITS)
        .map(|i| {
            let service = Arc::clone(&services[i % services.len()]);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                service.create_check_in(me, check(60, 80))
            })
        })
        .collect();

    let mut created = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => created += 1,
            Err(CoreError::DuplicateCheckIn { .. }) => duplicates += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(duplicates, SUBMITS - 1);

    let service = &services[0];
    assert_eq!(service.queue_status().unwrap().pending, 1);
    assert_eq!(service.feel_history(me, None, None).unwrap().total, 1);

    service.process_streak_jobs(10).unwrap();
    assert_eq!(service.feel_stats(me).unwrap().total_check_ins, 1);
}
