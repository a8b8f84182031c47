use std::sync::Arc;

use btc_horizon::api::HttpPriceSource;
use btc_horizon::config::Config;
use btc_horizon::engine::{Countdown, CountdownConfig, Outcome, SharedCache, SharedStore};
use btc_horizon::events::{Direction, Event};
use btc_horizon::feeds::terminal;
use btc_horizon::price::{PriceCache, PriceSample};
use btc_horizon::state::{open_or_memory, GuessStore};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_ENV: &str = "HORIZON_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".to_string());
    let cfg = Config::load_or_default(&path)?;
    init_tracing(&cfg.general.log_level);
    info!(?cfg, "Loaded config");

    let source = HttpPriceSource::new(
        cfg.price.primary_url.clone(),
        cfg.price.fallback().map(str::to_string),
    );
    let cache: SharedCache = Arc::new(Mutex::new(
        PriceCache::new(Arc::new(source), cfg.price.cache_duration())
            .with_stale_window(cfg.price.stale_window()),
    ));

    let backend = open_or_memory(&cfg.game.data_dir).await;
    let store = GuessStore::open(backend).await.unwrap_or_else(|e| {
        warn!(error = %e, "Stored guesses unreadable, starting fresh");
        GuessStore::in_memory()
    });
    let store: SharedStore = Arc::new(Mutex::new(store));

    // Create the event channel
    let (tx, mut rx) = mpsc::channel::<Event>(100);
    let mut countdown = Countdown::new(
        store.clone(),
        cache.clone(),
        tx.clone(),
        CountdownConfig::from(&cfg.game),
    );

    // Pick up a guess left running by a previous session
    if let Some(id) = countdown.start().await {
        println!("Resuming guess {id}");
    }

    terminal::spawn(tx.clone());
    terminal::spawn_ctrl_c(tx.clone());

    let sample = cache.lock().await.get_price().await;
    print_price(&sample);
    println!("\nWill BTC go up or down? Type 'up', 'down' or 'quit'.\n");

    let player = cfg.general.player_id.as_str();
    while let Some(event) = rx.recv().await {
        match event {
            Event::Guess(direction) => {
                if let Some(made) =
                    make_guess(direction, player, &store, &cache, &mut countdown).await
                {
                    render(&made, &store, player).await;
                }
            }
            Event::Shutdown => {
                println!("Shutting down...");
                break;
            }
            other => render(&other, &store, player).await,
        }
    }

    countdown.stop();
    Ok(())
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("btc_horizon={default_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Store a guess at the current price and hand it to the countdown.
async fn make_guess(
    direction: Direction,
    player: &str,
    store: &SharedStore,
    cache: &SharedCache,
    countdown: &mut Countdown,
) -> Option<Event> {
    if store.lock().await.has_active_guess() {
        println!("Wait for the current guess to resolve first.");
        return None;
    }

    let (sample, valid) = {
        let mut cache = cache.lock().await;
        let sample = cache.get_price().await;
        let valid = cache.is_valid(&sample);
        (sample, valid)
    };
    if !valid {
        print_price(&sample);
        println!("No usable price right now, try again shortly.");
        return None;
    }

    let created = store.lock().await.create(direction, player, sample.price).await;
    let guess = match created {
        Ok(guess) => guess,
        Err(e) => {
            println!("Guess rejected: {e}");
            return None;
        }
    };
    countdown.start_for(&guess.id).await;

    Some(Event::GuessMade {
        guess_id: guess.id,
        direction,
        initial_price: guess.initial_price,
        timestamp: guess.initial_timestamp,
    })
}

async fn render(event: &Event, store: &SharedStore, player: &str) {
    match event {
        Event::GuessMade {
            direction,
            initial_price,
            ..
        } => {
            println!("Guessed {direction} at ${initial_price:.2}");
        }
        Event::Countdown { seconds_left, .. } => {
            println!("Comparing in: {seconds_left}s");
        }
        Event::AwaitingPriceChange { .. } => {
            println!("Looking for price change...");
        }
        Event::GuessResolved { guess_id, outcome } => {
            let store = store.lock().await;
            let prices = store
                .get(guess_id)
                .map(|g| (g.initial_price, g.resolution_price.unwrap_or_default()));
            let verdict = match outcome {
                Outcome::Correct => "Correct",
                Outcome::Incorrect => "Incorrect",
                Outcome::Pending => "...",
            };
            match prices {
                Some((from, to)) => println!("Guess resolved: {verdict} (${from:.2} -> ${to:.2})"),
                None => println!("Guess resolved: {verdict}"),
            }
            println!("Score: {}", store.score(Some(player)));
        }
        Event::Guess(_) | Event::Shutdown => {}
    }
}

fn print_price(sample: &PriceSample) {
    if sample.has_error() {
        println!("BTC/USD: {}", sample.error);
    } else {
        println!("BTC/USD: ${:.2}", sample.price);
    }
}
