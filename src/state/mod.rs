mod guess;
mod storage;
mod store;

pub use guess::{Guess, GuessStatus, GuessUpdate};
pub use storage::{open_or_memory, FileBackend, MemoryBackend, StorageBackend};
pub use store::{GuessStore, GUESSES_KEY};
