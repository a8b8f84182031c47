//! Guess whether BTC/USD goes up or down over the next minute.
//!
//! The price cache (`price`) sits in front of the HTTP oracle (`api`), the
//! guess store (`state`) owns every guess, and the countdown (`engine`)
//! moves the active guess from `new` to `resolved`.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod feeds;
pub mod price;
pub mod state;
