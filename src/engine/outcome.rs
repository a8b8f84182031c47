use std::fmt;

use serde::{Deserialize, Serialize};

use crate::events::Direction;
use crate::state::{Guess, GuessStatus};

/// Result of a guess, always derived from the guess itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Correct,
    Incorrect,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pending => write!(f, "pending"),
            Outcome::Correct => write!(f, "correct"),
            Outcome::Incorrect => write!(f, "incorrect"),
        }
    }
}

/// Score a guess. Pending until resolved with both prices set;
/// an unchanged price loses in either direction.
pub fn evaluate(guess: &Guess) -> Outcome {
    if guess.status != GuessStatus::Resolved || !(guess.initial_price > 0.0) {
        return Outcome::Pending;
    }
    let Some(resolution) = guess.resolution_price.filter(|p| *p > 0.0) else {
        return Outcome::Pending;
    };

    let won = match guess.direction {
        Direction::Up => resolution > guess.initial_price,
        Direction::Down => resolution < guess.initial_price,
    };
    if won {
        Outcome::Correct
    } else {
        Outcome::Incorrect
    }
}
