use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::events::{Direction, Event};

/// What a line typed by the player means.
fn parse_line(line: &str) -> Option<Event> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if matches!(line.to_ascii_lowercase().as_str(), "q" | "quit" | "exit") {
        return Some(Event::Shutdown);
    }
    line.parse::<Direction>().ok().map(Event::Guess)
}

/// Spawns a task that reads commands from stdin and sends Guess / Shutdown events
pub fn spawn(tx: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_line(&line) {
                    Some(event) => {
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    None => println!("Type 'up', 'down' or 'quit'"),
                },
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
        let _ = tx.send(Event::Shutdown).await;
    });
}

/// Spawns a task that turns Ctrl+C into a Shutdown event
pub fn spawn_ctrl_c(tx: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(Event::Shutdown).await;
        }
    });
}
