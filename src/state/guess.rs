use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{evaluate, Outcome};
use crate::events::Direction;

/// Lifecycle of a guess. Ordered: a guess only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuessStatus {
    New,
    Pending,
    Resolved,
}

impl GuessStatus {
    /// New or pending.
    pub fn is_active(&self) -> bool {
        !matches!(self, GuessStatus::Resolved)
    }
}

/// One player prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guess {
    pub id: String,
    pub direction: Direction,
    pub status: GuessStatus,
    pub initial_price: f64,
    /// Creation time in unix milliseconds
    pub initial_timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_timestamp: Option<i64>,
    #[serde(default)]
    pub player_id: String,
    /// Recomputed by the countdown on every tick, never persisted
    #[serde(skip)]
    pub seconds_left: u64,
}

impl Guess {
    pub fn outcome(&self) -> Outcome {
        evaluate(self)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// When the wait ends, in unix milliseconds.
    pub fn deadline_ms(&self, wait: Duration) -> i64 {
        self.initial_timestamp + wait.as_millis() as i64
    }

    /// Whole seconds until the deadline, rounded up, never negative.
    pub fn seconds_left_at(&self, now_ms: i64, wait: Duration) -> u64 {
        let remaining_ms = (self.deadline_ms(wait) - now_ms).max(0);
        ((remaining_ms + 999) / 1000) as u64
    }
}

/// Partial update for `GuessStore::update`. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuessUpdate {
    pub status: Option<GuessStatus>,
    pub resolution_price: Option<f64>,
    pub resolution_timestamp: Option<i64>,
    pub seconds_left: Option<u64>,
}

impl GuessUpdate {
    pub fn status(status: GuessStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn seconds_left(seconds_left: u64) -> Self {
        Self {
            seconds_left: Some(seconds_left),
            ..Default::default()
        }
    }

    pub fn resolve(price: f64, timestamp: i64) -> Self {
        Self {
            status: Some(GuessStatus::Resolved),
            resolution_price: Some(price),
            resolution_timestamp: Some(timestamp),
            seconds_left: Some(0),
        }
    }

    /// True when nothing but transient fields change.
    pub fn is_transient(&self) -> bool {
        self.status.is_none()
            && self.resolution_price.is_none()
            && self.resolution_timestamp.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guess(initial_timestamp: i64) -> Guess {
        Guess {
            id: "g".to_string(),
            direction: Direction::Up,
            status: GuessStatus::New,
            initial_price: 50000.0,
            initial_timestamp,
            resolution_price: None,
            resolution_timestamp: None,
            player_id: String::new(),
            seconds_left: 0,
        }
    }

    #[test]
    fn test_status_order() {
        assert!(GuessStatus::New < GuessStatus::Pending);
        assert!(GuessStatus::Pending < GuessStatus::Resolved);
        assert!(GuessStatus::Pending.is_active());
        assert!(!GuessStatus::Resolved.is_active());
    }

    #[test]
    fn test_seconds_left() {
        let g = guess(1_000_000);
        let wait = Duration::from_secs(60);

        assert_eq!(g.seconds_left_at(1_000_000, wait), 60);
        assert_eq!(g.seconds_left_at(1_005_000, wait), 55);
        // partial seconds round up
        assert_eq!(g.seconds_left_at(1_005_500, wait), 55);
        assert_eq!(g.seconds_left_at(1_060_000, wait), 0);
        assert_eq!(g.seconds_left_at(2_000_000, wait), 0);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(guess(42)).unwrap();
        assert_eq!(json["status"], "new");
        assert_eq!(json["direction"], "up");
        assert_eq!(json["initialTimestamp"], 42);
        assert!(json.get("resolutionPrice").is_none());
        assert!(json.get("secondsLeft").is_none());
    }
}
