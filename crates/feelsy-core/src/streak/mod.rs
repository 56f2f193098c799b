//! Streak engine, badge rules, and per-user serialization.

pub mod badges;
pub mod engine;
pub mod locks;

pub use badges::{apply_badge_rules, Badge, BadgeMetric};
pub use engine::{advance, ScoreHistory, StreakOutcome, StreakState, StreakTransition};
pub use locks::UserLocks;
