//! Streak state machine.
//!
//! One transition runs per accepted check-in. The transition is pure: the
//! caller loads the previous state and the user's score history, and persists
//! whatever comes back.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::badges::{apply_badge_rules, Badge};

/// Per-user streak counters and unlocked badges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakState {
    pub user_id: Uuid,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_check_ins: u32,
    pub last_check_date: Option<NaiveDate>,
    pub average_score: f64,
    pub unlocked_badges: BTreeSet<String>,
}

/// Integer aggregate of every stored feel score for one user.
///
/// Kept as sum and count so the mean is divided exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreHistory {
    pub sum: i64,
    pub count: i64,
}

impl ScoreHistory {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }
}

/// How a transition moved the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakOutcome {
    /// First check-in ever; state created.
    Started,
    /// Check-in on the day after the last one.
    Extended,
    /// Gap of more than one day; streak back to 1.
    Reset,
    /// Same calendar date as the last check-in; counters unchanged.
    SameDay,
    /// Date before the last check-in; state left untouched.
    Backdated,
}

impl StreakOutcome {
    /// Whether the transition changed anything worth persisting.
    pub fn is_noop(&self) -> bool {
        matches!(self, StreakOutcome::Backdated)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreakTransition {
    pub state: StreakState,
    pub outcome: StreakOutcome,
    pub unlocked: Vec<Badge>,
}

/// Apply one check-in dated `check_date` to `previous`.
///
/// `history` must already include the check-in being applied.
pub fn advance(
    user_id: Uuid,
    previous: Option<&StreakState>,
    check_date: NaiveDate,
    history: ScoreHistory,
) -> StreakTransition {
    let Some(prev) = previous else {
        let mut state = StreakState {
            user_id,
            current_streak: 1,
            longest_streak: 1,
            total_check_ins: 1,
            last_check_date: Some(check_date),
            average_score: history.mean(),
            unlocked_badges: BTreeSet::new(),
        };
        let unlocked = apply_badge_rules(&mut state.unlocked_badges, 1, 1);
        return StreakTransition {
            state,
            outcome: StreakOutcome::Started,
            unlocked,
        };
    };

    let mut state = prev.clone();

    let outcome = match prev.last_check_date {
        None => {
            state.current_streak = 1;
            StreakOutcome::Started
        }
        Some(last) => match (check_date - last).num_days() {
            d if d < 0 => {
                return StreakTransition {
                    state,
                    outcome: StreakOutcome::Backdated,
                    unlocked: Vec::new(),
                };
            }
            0 => StreakOutcome::SameDay,
            1 => {
                state.current_streak += 1;
                StreakOutcome::Extended
            }
            _ => {
                state.current_streak = 1;
                StreakOutcome::Reset
            }
        },
    };

    if outcome != StreakOutcome::SameDay {
        state.total_check_ins += 1;
    }
    state.longest_streak = state.longest_streak.max(state.current_streak);
    state.last_check_date = Some(check_date);
    state.average_score = history.mean();

    let unlocked = apply_badge_rules(
        &mut state.unlocked_badges,
        state.current_streak,
        state.total_check_ins,
    );

    StreakTransition {
        state,
        outcome,
        unlocked,
    }
}
