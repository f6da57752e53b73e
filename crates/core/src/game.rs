use crate::{PlayHistory, Result};
use ndarray::Array3;
use std::fmt::Display;
use std::hash::Hash;

/// A game abstraction for AlphaZero-style search.
///
/// This trait defines the interface any deterministic, perfect-information,
/// turn-based game must implement to be searchable. The engine is otherwise
/// unaware of rules: legality, scoring, and encoding all live behind this
/// contract.
///
/// `Clone` is the deep, independent copy the controller takes once per
/// simulation; `PartialEq`/`Eq`/`Hash` are structural identity over the
/// position, enabling transposition caching by callers.
pub trait GameState: Clone + PartialEq + Eq + Hash + Display + Send {
    /// Returns the current player. Players are zero-indexed.
    fn current_player(&self) -> usize;

    /// Returns the current turn number.
    fn current_turn(&self) -> u32;

    /// Returns the number of players.
    fn num_players(&self) -> usize;

    /// Returns the size of the action space. Constant across all positions
    /// of a game type.
    fn num_moves(&self) -> usize;

    /// Returns a mask over the action space; `true` where the move is
    /// playable from this position.
    fn valid_moves(&self) -> Vec<bool>;

    /// Plays a move, mutating the position in place.
    ///
    /// The engine only ever calls this with an index whose `valid_moves`
    /// bit is set; an illegal index is a caller contract violation and
    /// returns [`AlphaZeroError::InvalidMove`](crate::AlphaZeroError).
    fn play_move(&mut self, action: usize) -> Result<()>;

    /// Returns `None` while the game is ongoing.
    ///
    /// For a terminal position, returns a one-hot style vector of length
    /// `num_players() + 1`: the first `num_players()` slots are 1 for the
    /// winner, and the final slot is 1 for a draw.
    fn scores(&self) -> Option<Vec<f32>>;

    /// Returns the canonicalized form of the position as a
    /// `(planes, rows, cols)` tensor from the current player's perspective,
    /// ready for feeding to an evaluator.
    fn canonicalized(&self) -> Array3<f32>;

    /// Drops auxiliary data not needed once the position is only used as a
    /// cache key. Default is a no-op.
    fn minimize_storage(&mut self) {}

    /// Number of symmetries the game has, including the identity.
    fn num_symmetries(&self) -> usize {
        1
    }

    /// Returns the orbit of training records equivalent to `base` under the
    /// game's symmetry group, the base record included. Tensor and policy
    /// values are permuted consistently under the same transform.
    ///
    /// Pure data augmentation; never touches the search tree.
    fn symmetries(&self, base: &PlayHistory) -> Vec<PlayHistory>;
}
