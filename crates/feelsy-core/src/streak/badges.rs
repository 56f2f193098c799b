//! Badge thresholds over streak length and lifetime check-in count.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Milestone badges. Once unlocked a badge is never revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Badge {
    #[serde(rename = "streak_3")]
    Streak3,
    #[serde(rename = "streak_7")]
    Streak7,
    #[serde(rename = "streak_14")]
    Streak14,
    #[serde(rename = "streak_30")]
    Streak30,
    #[serde(rename = "total_10")]
    Total10,
    #[serde(rename = "total_50")]
    Total50,
    #[serde(rename = "total_100")]
    Total100,
}

/// What a badge threshold is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeMetric {
    CurrentStreak,
    TotalCheckIns,
}

impl Badge {
    pub const ALL: [Badge; 7] = [
        Badge::Streak3,
        Badge::Streak7,
        Badge::Streak14,
        Badge::Streak30,
        Badge::Total10,
        Badge::Total50,
        Badge::Total100,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Badge::Streak3 => "streak_3",
            Badge::Streak7 => "streak_7",
            Badge::Streak14 => "streak_14",
            Badge::Streak30 => "streak_30",
            Badge::Total10 => "total_10",
            Badge::Total50 => "total_50",
            Badge::Total100 => "total_100",
        }
    }

    pub fn metric(&self) -> BadgeMetric {
        match self {
            Badge::Streak3 | Badge::Streak7 | Badge::Streak14 | Badge::Streak30 => {
                BadgeMetric::CurrentStreak
            }
            Badge::Total10 | Badge::Total50 | Badge::Total100 => BadgeMetric::TotalCheckIns,
        }
    }

    pub fn threshold(&self) -> u32 {
        match self {
            Badge::Streak3 => 3,
            Badge::Streak7 => 7,
            Badge::Streak14 => 14,
            Badge::Streak30 => 30,
            Badge::Total10 => 10,
            Badge::Total50 => 50,
            Badge::Total100 => 100,
        }
    }

    fn is_satisfied(&self, current_streak: u32, total_check_ins: u32) -> bool {
        let value = match self.metric() {
            BadgeMetric::CurrentStreak => current_streak,
            BadgeMetric::TotalCheckIns => total_check_ins,
        };
        value >= self.threshold()
    }
}

/// Union `existing` with every badge whose threshold is met.
///
/// Returns the badges newly added by this call, in rule order. Ids already in
/// `existing` (including ones this rule set no longer knows) are kept.
pub fn apply_badge_rules(
    existing: &mut BTreeSet<String>,
    current_streak: u32,
    total_check_ins: u32,
) -> Vec<Badge> {
    let mut unlocked = Vec::new();
    for badge in Badge::ALL {
        if badge.is_satisfied(current_streak, total_check_ins) && existing.insert(badge.id().to_string()) {
            unlocked.push(badge);
        }
    }
    unlocked
}
