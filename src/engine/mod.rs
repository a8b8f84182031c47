mod countdown;
mod outcome;

pub use countdown::{Countdown, CountdownConfig, SharedCache, SharedStore};
pub use outcome::{evaluate, Outcome};
