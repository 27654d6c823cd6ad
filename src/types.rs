//! Domain-specific newtypes for type safety.
//!
//! Strongly-typed wrappers for the identifiers and values that flow between
//! the chart, the store and the CLI. Uses `derive_more` to keep them thin.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lowest mood on the chart's value axis.
pub const MOOD_MIN: i64 = -50;

/// Highest mood on the chart's value axis.
pub const MOOD_MAX: i64 = 50;

// ============================================================================
// SubjectId
// ============================================================================

/// Identifies whose mood log a chart shows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into, Serialize,
    Deserialize,
)]
pub struct SubjectId(pub i64);

impl SubjectId {
    /// The owner of a fresh database.
    pub const OWNER: Self = Self(1);

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::OWNER
    }
}

// ============================================================================
// MoodScore
// ============================================================================

/// A mood value on the [-50, 50] scale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Display, Into, Serialize,
)]
pub struct MoodScore(i64);

impl MoodScore {
    /// Validate and wrap a mood value.
    pub fn new(value: i64) -> Result<Self> {
        if value < MOOD_MIN || value > MOOD_MAX {
            return Err(Error::InvalidMood(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Value as plotted on the chart.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl TryFrom<i64> for MoodScore {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod subject_id {
        use super::*;

        #[test]
        fn default_is_owner() {
            assert_eq!(SubjectId::default(), SubjectId::OWNER);
            assert_eq!(SubjectId::OWNER.get(), 1);
        }

        #[test]
        fn display_and_conversions() {
            let id = SubjectId::from(7);
            assert_eq!(format!("{id}"), "7");
            let raw: i64 = id.into();
            assert_eq!(raw, 7);
        }
    }

    mod mood_score {
        use super::*;

        #[test]
        fn accepts_axis_bounds() {
            assert_eq!(MoodScore::new(MOOD_MIN).unwrap().get(), -50);
            assert_eq!(MoodScore::new(MOOD_MAX).unwrap().get(), 50);
            assert_eq!(MoodScore::new(0).unwrap(), MoodScore::default());
        }

        #[test]
        fn rejects_out_of_scale() {
            assert!(matches!(MoodScore::new(51), Err(Error::InvalidMood(51))));
            assert!(matches!(MoodScore::try_from(-51), Err(Error::InvalidMood(-51))));
        }

        #[test]
        fn as_f64() {
            assert!((MoodScore::new(-12).unwrap().as_f64() + 12.0).abs() < f64::EPSILON);
        }
    }
}
