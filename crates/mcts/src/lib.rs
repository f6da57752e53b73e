//! Monte Carlo Tree Search for AlphaZero-style play.
//!
//! This crate provides a generic search controller usable with any game
//! implementing the `alphazero_core::GameState` trait.
//!
//! # Features
//!
//! - **Generic**: works with any `GameState` implementation
//! - **PUCT-style selection**: prior-weighted exploration, linear in the
//!   parent visit count
//! - **External evaluation**: the simulation is split into `find_leaf` /
//!   `process_result`, so the caller owns the evaluator (neural model,
//!   rollouts, or a fixed test double)
//! - **Dirichlet root noise** and **temperature sampling** for self-play
//! - **Arena tree**: nodes indexed by handle, reusable across moves via
//!   `advance_root`
//!
//! # Example
//!
//! ```
//! use alphazero_mcts::{games::Connect4, Mcts, SearchConfig, UniformEvaluator};
//! use alphazero_core::GameState;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let gs = Connect4::new();
//! let config = SearchConfig::for_evaluation(gs.num_players(), gs.num_moves());
//! let mut mcts = Mcts::new(config, ChaCha8Rng::seed_from_u64(42));
//!
//! mcts.search(&gs, &UniformEvaluator, 100).unwrap();
//! assert_eq!(mcts.depth(), 100);
//!
//! let best = mcts.pick_move(0.0).unwrap();
//! assert!(best < gs.num_moves());
//! ```

pub mod config;
pub mod evaluator;
pub mod games;
mod node;
pub mod search;
mod tree;

pub use config::SearchConfig;
pub use evaluator::{terminal_value, Evaluation, Evaluator, RolloutEvaluator, UniformEvaluator};
pub use search::Mcts;
