//! AlphaZero Core - Game abstractions and common types
//!
//! This crate provides the [`GameState`] trait that any concrete game
//! implements to be driven by the search engine, plus the types shared
//! across the workspace.
//!
//! # Types
//!
//! - [`GameState`] - Contract consumed by the search controller
//! - [`PlayHistory`] - Training record (encoding, policy target, outcome)
//! - [`AlphaZeroError`] - Shared error taxonomy

mod error;
mod game;
mod history;

pub use error::{AlphaZeroError, Result};
pub use game::GameState;
pub use history::PlayHistory;
