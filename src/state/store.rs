use tracing::{debug, info, warn};

use super::guess::{Guess, GuessStatus, GuessUpdate};
use super::storage::{MemoryBackend, StorageBackend};
use crate::engine::Outcome;
use crate::error::StoreError;
use crate::events::Direction;
use crate::price::now_ms;

/// Key the guess collection is persisted under.
pub const GUESSES_KEY: &str = "bitcoin-horizon-guesses";

/// Owns every guess. At most one of them is active (new or pending).
pub struct GuessStore {
    backend: Box<dyn StorageBackend>,
    /// Insertion order
    guesses: Vec<Guess>,
    next_seq: u64,
}

impl GuessStore {
    /// Load the collection persisted in `backend`, if any.
    pub async fn open(backend: Box<dyn StorageBackend>) -> Result<Self, StoreError> {
        let guesses: Vec<Guess> = match backend.load(GUESSES_KEY).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };
        info!(count = guesses.len(), "Loaded guesses");

        Ok(Self {
            backend,
            next_seq: guesses.len() as u64,
            guesses,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
            guesses: Vec::new(),
            next_seq: 0,
        }
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Record a new guess stamped with the current time.
    pub async fn create(
        &mut self,
        direction: Direction,
        player_id: &str,
        initial_price: f64,
    ) -> Result<Guess, StoreError> {
        self.create_at(direction, player_id, initial_price, now_ms())
            .await
    }

    /// Record a new guess made at `timestamp`. Rejected while any guess is active.
    pub async fn create_at(
        &mut self,
        direction: Direction,
        player_id: &str,
        initial_price: f64,
        timestamp: i64,
    ) -> Result<Guess, StoreError> {
        if self.guesses.iter().any(|g| g.is_active()) {
            return Err(StoreError::ActiveGuess);
        }
        if !(initial_price > 0.0) {
            return Err(StoreError::InvalidPrice(initial_price));
        }

        let guess = Guess {
            id: self.next_id(timestamp),
            direction,
            status: GuessStatus::New,
            initial_price,
            initial_timestamp: timestamp,
            resolution_price: None,
            resolution_timestamp: None,
            player_id: player_id.to_string(),
            seconds_left: 0,
        };
        info!(guess_id = %guess.id, %direction, initial_price, "Guess created");

        self.guesses.push(guess.clone());
        self.persist().await;
        Ok(guess)
    }

    /// Merge the supplied fields into guess `id`. Resolution is all or
    /// nothing: `Resolved` status, price and timestamp arrive together.
    pub async fn update(&mut self, id: &str, update: GuessUpdate) -> Result<Guess, StoreError> {
        let guess = self
            .guesses
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(status) = update.status {
            if status < guess.status {
                return Err(StoreError::StatusRegression {
                    from: guess.status,
                    to: status,
                });
            }
        }
        let sets_resolution =
            update.resolution_price.is_some() || update.resolution_timestamp.is_some();
        if sets_resolution
            && (guess.resolution_price.is_some() || guess.resolution_timestamp.is_some())
        {
            return Err(StoreError::AlreadyResolved(id.to_string()));
        }
        if guess.status == GuessStatus::Resolved && update.status == Some(GuessStatus::Resolved) {
            return Err(StoreError::AlreadyResolved(id.to_string()));
        }
        let resolves = update.status == Some(GuessStatus::Resolved);
        if (resolves || sets_resolution)
            && !(resolves
                && update.resolution_price.is_some()
                && update.resolution_timestamp.is_some())
        {
            return Err(StoreError::IncompleteResolution(id.to_string()));
        }

        if let Some(status) = update.status {
            guess.status = status;
        }
        if let Some(price) = update.resolution_price {
            guess.resolution_price = Some(price);
        }
        if let Some(ts) = update.resolution_timestamp {
            guess.resolution_timestamp = Some(ts);
        }
        if let Some(secs) = update.seconds_left {
            guess.seconds_left = secs;
        }

        let updated = guess.clone();
        if !update.is_transient() {
            debug!(guess_id = %id, status = ?updated.status, "Guess updated");
            self.persist().await;
        }
        Ok(updated)
    }

    /// Drop every guess.
    pub async fn clear(&mut self) {
        info!(count = self.guesses.len(), "Clearing guesses");
        self.guesses.clear();
        self.persist().await;
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn get(&self, id: &str) -> Option<&Guess> {
        self.guesses.iter().find(|g| g.id == id)
    }

    pub fn list_all(&self) -> &[Guess] {
        &self.guesses
    }

    pub fn by_player(&self, player_id: &str) -> Vec<&Guess> {
        self.guesses
            .iter()
            .filter(|g| g.player_id == player_id)
            .collect()
    }

    /// Most recent guess by creation time; later insertion wins ties.
    pub fn last_guess(&self) -> Option<&Guess> {
        self.guesses.iter().max_by_key(|g| g.initial_timestamp)
    }

    pub fn has_active_guess(&self) -> bool {
        self.last_guess().is_some_and(|g| g.is_active())
    }

    /// Number of correct guesses, optionally for one player only.
    pub fn score(&self, player_id: Option<&str>) -> usize {
        self.guesses
            .iter()
            .filter(|g| player_id.map_or(true, |p| g.player_id == p))
            .filter(|g| g.outcome() == Outcome::Correct)
            .count()
    }

    pub fn len(&self) -> usize {
        self.guesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guesses.is_empty()
    }

    fn next_id(&mut self, timestamp: i64) -> String {
        loop {
            self.next_seq += 1;
            let id = format!("{}-{}", timestamp, self.next_seq);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Write-through. Failures are logged; memory stays authoritative.
    async fn persist(&mut self) {
        let value = match serde_json::to_value(&self.guesses) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Failed to serialize guesses");
                return;
            }
        };
        if let Err(e) = self.backend.save(GUESSES_KEY, value).await {
            warn!(error = %e, "Failed to persist guesses");
        }
    }
}
