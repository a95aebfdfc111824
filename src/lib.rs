//! blockfall-tui: terminal client for a server-hosted falling-block puzzle game.
//!
//! The server owns every game rule; this crate renders its snapshots,
//! forwards input, and runs the animation-synchronized polling loop that
//! drives gravity ([`fall_loop`]).

pub mod app;
pub mod client;
pub mod fall_loop;
pub mod input;
pub mod prefs;
pub mod protocol;
pub mod term;
pub mod theme;
pub mod types;
