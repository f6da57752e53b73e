//! Reference game implementations.
//!
//! These implement the `alphazero_core::GameState` contract and exist to
//! exercise the search engine in tests and self-play; the engine itself
//! never depends on them.

pub mod connect4;

pub use connect4::Connect4;
