//! Feel score calculation.
//!
//! Mood and energy are each scored 1-100. The feel score is their floored
//! mean, and the display color is a discrete bucket of that score.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 100;

/// Display bucket for a feel score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeelColor {
    Amazing,
    Great,
    Good,
    Okay,
    NotGreat,
    Low,
}

impl FeelColor {
    /// Bucket a feel score. Lower bounds are inclusive, checked highest first.
    pub fn for_score(feel_score: i32) -> Self {
        match feel_score {
            s if s >= 90 => FeelColor::Amazing,
            s if s >= 75 => FeelColor::Great,
            s if s >= 60 => FeelColor::Good,
            s if s >= 45 => FeelColor::Okay,
            s if s >= 30 => FeelColor::NotGreat,
            _ => FeelColor::Low,
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            FeelColor::Amazing => "#22c55e",
            FeelColor::Great => "#84cc16",
            FeelColor::Good => "#eab308",
            FeelColor::Okay => "#f97316",
            FeelColor::NotGreat => "#ef4444",
            FeelColor::Low => "#8b5cf6",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeelColor::Amazing => "Amazing",
            FeelColor::Great => "Great",
            FeelColor::Good => "Good",
            FeelColor::Okay => "Okay",
            FeelColor::NotGreat => "Not great",
            FeelColor::Low => "Low",
        }
    }
}

/// Derived score and color for one check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeelScore {
    pub value: i32,
    pub color: FeelColor,
}

impl FeelScore {
    /// Compute the feel score from validated mood and energy.
    ///
    /// # Errors
    /// Returns [`ValidationError::OutOfRange`] if either input is outside 1..=100.
    pub fn compute(mood_score: i32, energy_score: i32) -> Result<Self, ValidationError> {
        check_range("mood_score", mood_score)?;
        check_range("energy_score", energy_score)?;

        // Both operands are positive, so integer division floors.
        let value = (mood_score + energy_score) / 2;
        Ok(Self {
            value,
            color: FeelColor::for_score(value),
        })
    }

    pub fn color_hex(&self) -> &'static str {
        self.color.hex()
    }
}

fn check_range(field: &'static str, value: i32) -> Result<(), ValidationError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min: MIN_SCORE as i64,
            max: MAX_SCORE as i64,
            value: value as i64,
        })
    }
}
