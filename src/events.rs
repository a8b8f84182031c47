use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::Outcome;

// Everything the game loop reacts to. The countdown task and the input
// reader both push into the same channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Player asked for a guess in this direction
    Guess(Direction),

    // A guess was stored and the countdown claimed it
    GuessMade {
        guess_id: String,
        direction: Direction,
        initial_price: f64,
        timestamp: i64,
    },

    // Countdown tick (every second while waiting)
    Countdown { guess_id: String, seconds_left: u64 },

    // Wait elapsed, polling for a price that differs from the initial one
    AwaitingPriceChange { guess_id: String },

    // Guess reached its terminal state
    GuessResolved { guess_id: String, outcome: Outcome },

    // Ctrl+C, EOF on stdin or "quit"
    Shutdown,
}

/// Which way the player thinks the price will move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "u" => Ok(Direction::Up),
            "down" | "d" => Ok(Direction::Down),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}
