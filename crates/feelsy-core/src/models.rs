//! Persisted records and query results.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::streak::StreakState;

pub const NOTE_MAX_CHARS: usize = 280;
pub const EMOJI_MAX_CHARS: usize = 10;
pub const VIBE_MESSAGE_MAX_CHARS: usize = 100;

/// One user's check-in for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mood_score: i32,
    pub energy_score: i32,
    pub feel_score: i32,
    pub mood_emoji: Option<String>,
    pub note: Option<String>,
    pub color_hex: String,
    pub check_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Caller input for a new check-in, before derivation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewCheckIn {
    pub mood_score: i32,
    pub energy_score: i32,
    #[serde(default)]
    pub mood_emoji: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewCheckIn {
    /// Trim optional text and check lengths. Blank text becomes `None`.
    pub(crate) fn normalized(self) -> Result<Self, ValidationError> {
        let mood_emoji = normalize_text("mood_emoji", self.mood_emoji, EMOJI_MAX_CHARS)?;
        let note = normalize_text("note", self.note, NOTE_MAX_CHARS)?;
        Ok(Self {
            mood_emoji,
            note,
            ..self
        })
    }
}

pub(crate) fn normalize_text(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let len = trimmed.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, max, len });
    }
    Ok(Some(trimmed.to_string()))
}

/// Kinds of good vibes. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VibeType {
    #[serde(rename = "hug")]
    Hug,
    #[serde(rename = "high-five")]
    HighFive,
    #[serde(rename = "sunshine")]
    Sunshine,
    #[serde(rename = "heart")]
    Heart,
    #[serde(rename = "star")]
    Star,
}

impl VibeType {
    pub const ALL: [VibeType; 5] = [
        VibeType::Hug,
        VibeType::HighFive,
        VibeType::Sunshine,
        VibeType::Heart,
        VibeType::Star,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VibeType::Hug => "hug",
            VibeType::HighFive => "high-five",
            VibeType::Sunshine => "sunshine",
            VibeType::Heart => "heart",
            VibeType::Star => "star",
        }
    }
}

impl fmt::Display for VibeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VibeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VibeType::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| {
                ValidationError::invalid(
                    "vibe_type",
                    format!("'{s}' is not one of hug, high-five, sunshine, heart, star"),
                )
            })
    }
}

/// A good vibe as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodVibe {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message: Option<String>,
    pub vibe_type: VibeType,
    pub created_at: DateTime<Utc>,
}

/// A received vibe joined with the sender's public identity.
///
/// `sender` is `None` when no identity record exists for the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedVibe {
    #[serde(flatten)]
    pub vibe: GoodVibe,
    pub sender: Option<PublicUser>,
}

/// The only user fields this core exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendStatus {
    Pending,
    Accepted,
    Blocked,
}

impl FriendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendStatus::Pending => "pending",
            FriendStatus::Accepted => "accepted",
            FriendStatus::Blocked => "blocked",
        }
    }
}

impl FromStr for FriendStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FriendStatus::Pending),
            "accepted" => Ok(FriendStatus::Accepted),
            "blocked" => Ok(FriendStatus::Blocked),
            other => Err(ValidationError::invalid(
                "status",
                format!("'{other}' is not one of pending, accepted, blocked"),
            )),
        }
    }
}

/// Directed friendship edge, owner -> friend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendEdge {
    pub user_id: Uuid,
    pub friend_id: Uuid,
    pub status: FriendStatus,
}

/// One row of the friend feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendFeel {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub feel_score: i32,
    pub mood_emoji: Option<String>,
    pub color_hex: String,
    pub check_date: NaiveDate,
}

/// Streak snapshot served by the stats endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FeelStats {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_check_ins: u32,
    pub average_score: f64,
    pub unlocked_badges: Vec<String>,
}

impl From<StreakState> for FeelStats {
    fn from(state: StreakState) -> Self {
        Self {
            current_streak: state.current_streak,
            longest_streak: state.longest_streak,
            total_check_ins: state.total_check_ins,
            average_score: state.average_score,
            unlocked_badges: state.unlocked_badges.into_iter().collect(),
        }
    }
}

/// One page of check-in history plus the user's full count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub data: Vec<CheckIn>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Done,
    Dead,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Done => "done",
            JobStatus::Dead => "dead",
        }
    }
}

impl FromStr for JobStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "done" => Ok(JobStatus::Done),
            "dead" => Ok(JobStatus::Dead),
            other => Err(ValidationError::invalid(
                "status",
                format!("'{other}' is not one of pending, done, dead"),
            )),
        }
    }
}

/// Durable request to apply one check-in to its user's streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakJob {
    pub id: i64,
    pub user_id: Uuid,
    pub check_in_id: Uuid,
    pub check_date: NaiveDate,
    pub status: JobStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending: u64,
    pub done: u64,
    pub dead: u64,
}
