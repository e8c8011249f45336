use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GoalError {
    #[error("Goal must be between {min}ml and {max}ml, got {0}ml", min = Goal::MIN, max = Goal::MAX)]
    OutOfRange(u32),
}

/// Daily hydration target in millilitres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Goal(u32);

impl Goal {
    pub const MIN: u32 = 0;
    pub const MAX: u32 = 4000;
    pub const STEP: u32 = 100;
    /// Target used for new users and after sign-out.
    pub const DEFAULT: Goal = Goal(2000);

    pub fn new(ml: u32) -> Result<Self, GoalError> {
        if ml > Self::MAX {
            return Err(GoalError::OutOfRange(ml));
        }
        Ok(Self(ml))
    }

    /// Rounds to the nearest step and clamps into range, the way the goal
    /// slider quantizes input.
    pub fn snapped(ml: u32) -> Self {
        let rounded = ml.saturating_add(Self::STEP / 2) / Self::STEP * Self::STEP;
        Self(rounded.min(Self::MAX))
    }

    pub fn ml(self) -> u32 {
        self.0
    }

    /// True once `consumed` meets a non-zero goal.
    pub fn is_reached_by(self, consumed: u32) -> bool {
        self.0 > 0 && consumed >= self.0
    }

    /// Fraction of the goal consumed, capped at 1.0. A zero goal reports 0.0.
    pub fn fraction(self, consumed: u32) -> f64 {
        if self.0 == 0 {
            return 0.0;
        }
        (f64::from(consumed) / f64::from(self.0)).min(1.0)
    }
}

impl Default for Goal {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for Goal {
    type Error = GoalError;

    fn try_from(ml: u32) -> Result<Self, Self::Error> {
        Self::new(ml)
    }
}

impl From<Goal> for u32 {
    fn from(goal: Goal) -> Self {
        goal.0
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ml", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_bounds() {
        assert_eq!(Goal::new(0).unwrap().ml(), 0);
        assert_eq!(Goal::new(4000).unwrap().ml(), 4000);
        assert_eq!(Goal::new(4001), Err(GoalError::OutOfRange(4001)));
    }

    #[test]
    fn test_goal_accepts_off_step_values() {
        assert_eq!(Goal::new(1550).unwrap().ml(), 1550);
    }

    #[test]
    fn test_snapped_rounds_and_clamps() {
        assert_eq!(Goal::snapped(1549).ml(), 1500);
        assert_eq!(Goal::snapped(1550).ml(), 1600);
        assert_eq!(Goal::snapped(40).ml(), 0);
        assert_eq!(Goal::snapped(9000).ml(), 4000);
        assert_eq!(Goal::snapped(u32::MAX).ml(), 4000);
    }

    #[test]
    fn test_is_reached_by() {
        let goal = Goal::new(2000).unwrap();
        assert!(!goal.is_reached_by(1999));
        assert!(goal.is_reached_by(2000));
        assert!(goal.is_reached_by(2600));
        assert!(!Goal::new(0).unwrap().is_reached_by(500));
    }

    #[test]
    fn test_fraction() {
        let goal = Goal::new(2000).unwrap();
        assert_eq!(goal.fraction(500), 0.25);
        assert_eq!(goal.fraction(5000), 1.0);
        assert_eq!(Goal::new(0).unwrap().fraction(100), 0.0);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Goal>("4100").is_err());
        assert_eq!(serde_json::from_str::<Goal>("2500").unwrap().ml(), 2500);
    }

    #[test]
    fn test_error_message() {
        let err = Goal::new(5000).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Goal must be between 0ml and 4000ml, got 5000ml"
        );
    }
}
