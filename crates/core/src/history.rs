//! Training records emitted after a search completes for a position.

use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// One training example: a canonical position encoding, the visit-count
/// policy target over the full action space, and a scalar outcome label
/// from the perspective of the player to move at the position.
///
/// Produced by the self-play driver once a game finishes, multiplied
/// through [`GameState::symmetries`](crate::GameState::symmetries) before
/// persistence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayHistory {
    /// Canonical `(planes, rows, cols)` encoding of the position.
    pub canonical: Array3<f32>,

    /// Target policy; length equals the action space size.
    pub pi: Vec<f32>,

    /// Outcome label in [-1, 1] for the player to move: +1 win, -1 loss,
    /// 0 draw.
    pub v: f32,
}

impl PlayHistory {
    pub fn new(canonical: Array3<f32>, pi: Vec<f32>, v: f32) -> Self {
        Self { canonical, pi, v }
    }
}
