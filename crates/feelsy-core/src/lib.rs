//! # Feelsy Core Library
//!
//! Core logic for Feelsy daily mood check-ins. The HTTP server and the CLI
//! are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Score**: pure mood/energy -> feel score and color bucket
//! - **Storage**: SQLite persistence with versioned migrations and TOML
//!   configuration
//! - **Streak**: pure streak state machine, badge thresholds, and a keyed
//!   per-user lock table
//! - **Service**: the check-in, stats, and social workflows, plus the durable
//!   streak job queue processing
//!
//! ## Key Components
//!
//! - [`FeelService`]: workflow facade used by the server and CLI
//! - [`Database`]: check-in, streak, vibe and job persistence
//! - [`Config`]: application configuration management
//! - [`DayBoundary`]: maps instants to calendar dates in the reference timezone

pub mod clock;
pub mod error;
pub mod models;
pub mod score;
pub mod service;
pub mod social;
pub mod storage;
pub mod streak;

pub use clock::{Clock, DayBoundary, FixedClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use models::{
    CheckIn, FeelStats, FriendEdge, FriendFeel, FriendStatus, GoodVibe, HistoryPage, JobStatus,
    NewCheckIn, PublicUser, QueueStatus, ReceivedVibe, StreakJob, VibeType,
};
pub use score::{FeelColor, FeelScore};
pub use service::{FeelService, ProcessReport};
pub use storage::{Config, Database};
pub use streak::{Badge, StreakOutcome, StreakState};
