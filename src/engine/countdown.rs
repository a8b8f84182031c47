//! Drives the active guess from `new` to `resolved`.
//!
//! One spawned task per run. Every tick re-reads the guess from the store,
//! so a guess that was cleared or resolved elsewhere stops the task on the
//! next tick. `Countdown` owns at most one run and aborts it on `stop` and
//! on drop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::events::Event;
use crate::price::{now_ms, PriceCache};
use crate::state::{GuessStatus, GuessStore, GuessUpdate};

pub type SharedStore = Arc<Mutex<GuessStore>>;
pub type SharedCache = Arc<Mutex<PriceCache>>;

/// Timing of a countdown run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownConfig {
    /// From guess creation to the first price poll
    pub wait: Duration,
    pub tick: Duration,
    /// Minimum gap between price polls after the wait
    pub poll_interval: Duration,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(60),
            tick: Duration::from_secs(1),
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl From<&GameConfig> for CountdownConfig {
    fn from(cfg: &GameConfig) -> Self {
        Self {
            wait: cfg.wait(),
            tick: cfg.tick(),
            poll_interval: cfg.poll_interval(),
        }
    }
}

/// The guess currently claimed by this countdown.
#[derive(Debug)]
struct ActiveRun {
    guess_id: String,
    handle: JoinHandle<()>,
}

pub struct Countdown {
    store: SharedStore,
    cache: SharedCache,
    events: mpsc::Sender<Event>,
    config: CountdownConfig,
    active: Option<ActiveRun>,
}

impl Countdown {
    pub fn new(
        store: SharedStore,
        cache: SharedCache,
        events: mpsc::Sender<Event>,
        config: CountdownConfig,
    ) -> Self {
        Self {
            store,
            cache,
            events,
            config,
            active: None,
        }
    }

    /// Claim and drive the store's last guess if it is still active.
    /// Returns the claimed guess id, or `None` when there was nothing to do.
    pub async fn start(&mut self) -> Option<String> {
        self.claim(None).await
    }

    /// Like `start`, but only if `guess_id` is still the store's last guess.
    pub async fn start_for(&mut self, guess_id: &str) -> Option<String> {
        self.claim(Some(guess_id)).await
    }

    /// Cancel the running task, if any. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(run) = self.active.take() {
            if !run.handle.is_finished() {
                debug!(guess_id = %run.guess_id, "Stopping countdown");
            }
            run.handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|run| !run.handle.is_finished())
    }

    /// Guess id of the live run.
    pub fn active_guess_id(&self) -> Option<&str> {
        self.active
            .as_ref()
            .filter(|run| !run.handle.is_finished())
            .map(|run| run.guess_id.as_str())
    }

    async fn claim(&mut self, expected: Option<&str>) -> Option<String> {
        let guess = {
            let mut store = self.store.lock().await;
            let last = store.last_guess()?.clone();

            if let Some(expected) = expected {
                if last.id != expected {
                    debug!(expected, last = %last.id, "Tracked guess superseded, not starting");
                    return None;
                }
            }
            if !last.is_active() {
                return None;
            }
            if self.active_guess_id() == Some(last.id.as_str()) {
                debug!(guess_id = %last.id, "Countdown already running");
                return None;
            }

            if last.status == GuessStatus::New {
                if let Err(e) = store
                    .update(&last.id, GuessUpdate::status(GuessStatus::Pending))
                    .await
                {
                    warn!(guess_id = %last.id, error = %e, "Failed to claim guess");
                    return None;
                }
            }
            last
        };

        // A run for an older guess has nothing left to do.
        self.stop();

        info!(guess_id = %guess.id, "Countdown started");
        let handle = tokio::spawn(drive(
            guess.id.clone(),
            self.store.clone(),
            self.cache.clone(),
            self.events.clone(),
            self.config,
        ));
        self.active = Some(ActiveRun {
            guess_id: guess.id.clone(),
            handle,
        });
        Some(guess.id)
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Tick until the guess resolves or disappears.
async fn drive(
    guess_id: String,
    store: SharedStore,
    cache: SharedCache,
    events: mpsc::Sender<Event>,
    config: CountdownConfig,
) {
    let mut ticker = tokio::time::interval(config.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_poll: Option<Instant> = None;

    loop {
        ticker.tick().await;

        let (initial_price, seconds_left) = {
            let mut store = store.lock().await;
            let Some(guess) = store.get(&guess_id) else {
                info!(guess_id = %guess_id, "Guess removed, countdown stopped");
                return;
            };
            if guess.status != GuessStatus::Pending {
                debug!(guess_id = %guess_id, status = ?guess.status, "Guess no longer pending");
                return;
            }
            let initial_price = guess.initial_price;
            let seconds_left = guess.seconds_left_at(now_ms(), config.wait);
            let _ = store
                .update(&guess_id, GuessUpdate::seconds_left(seconds_left))
                .await;
            (initial_price, seconds_left)
        };

        if seconds_left > 0 {
            let _ = events
                .send(Event::Countdown {
                    guess_id: guess_id.clone(),
                    seconds_left,
                })
                .await;
            continue;
        }

        match last_poll {
            Some(at) if at.elapsed() < config.poll_interval => continue,
            Some(_) => {}
            None => {
                let _ = events
                    .send(Event::AwaitingPriceChange {
                        guess_id: guess_id.clone(),
                    })
                    .await;
            }
        }
        last_poll = Some(Instant::now());

        let (sample, valid) = {
            let mut cache = cache.lock().await;
            let sample = cache.refresh_price().await;
            let valid = cache.is_valid(&sample);
            (sample, valid)
        };
        if !valid {
            debug!(guess_id = %guess_id, error = %sample.error, "No usable price yet");
            continue;
        }
        if sample.price == initial_price {
            debug!(guess_id = %guess_id, price = sample.price, "Price unchanged");
            continue;
        }

        // The fetch awaited; the guess may have moved on meanwhile.
        let resolved = {
            let mut store = store.lock().await;
            match store.get(&guess_id) {
                Some(guess) if guess.status == GuessStatus::Pending => {}
                _ => {
                    info!(guess_id = %guess_id, "Guess changed during fetch, countdown stopped");
                    return;
                }
            }
            match store
                .update(&guess_id, GuessUpdate::resolve(sample.price, now_ms()))
                .await
            {
                Ok(guess) => guess,
                Err(e) => {
                    warn!(guess_id = %guess_id, error = %e, "Failed to resolve guess");
                    return;
                }
            }
        };

        let outcome = resolved.outcome();
        info!(
            guess_id = %guess_id,
            initial_price,
            resolution_price = sample.price,
            %outcome,
            "Guess resolved"
        );
        let _ = events
            .send(Event::GuessResolved { guess_id, outcome })
            .await;
        return;
    }
}
