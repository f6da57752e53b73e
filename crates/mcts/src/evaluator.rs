//! Evaluation boundary for the search controller.
//!
//! The controller itself never evaluates positions: `find_leaf` hands a
//! cloned leaf state to the caller, who obtains a `(value, policy)` pair
//! from whatever estimator it owns and feeds it back via
//! `process_result`. The `Evaluator` trait is the strategy boundary for
//! callers that want the convenience loop, and for test doubles.

use alphazero_core::GameState;
use rand::Rng;
use std::cell::RefCell;

/// Evaluation result: prior policy over the full action space plus a
/// scalar value estimate in [-1, 1] from the current player's perspective.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub value: f32,
    pub policy: Vec<f32>,
}

/// Strategy boundary for position estimators (learned model, rollouts,
/// or a fixed test double).
pub trait Evaluator<G: GameState> {
    fn evaluate(&self, state: &G) -> Evaluation;
}

/// Deterministic test double: uniform policy over the whole action space
/// and zero value.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformEvaluator;

impl<G: GameState> Evaluator<G> for UniformEvaluator {
    fn evaluate(&self, state: &G) -> Evaluation {
        let n = state.num_moves();
        Evaluation {
            value: 0.0,
            policy: vec![1.0 / n as f32; n],
        }
    }
}

/// Evaluator using a uniform prior and a seeded random playout for the
/// value estimate.
pub struct RolloutEvaluator<R: Rng> {
    rng: RefCell<R>,
    max_rollout_depth: usize,
}

impl<R: Rng> RolloutEvaluator<R> {
    pub fn new(rng: R, max_rollout_depth: usize) -> Self {
        Self {
            rng: RefCell::new(rng),
            max_rollout_depth,
        }
    }

    /// Random playout from `initial`, returning the outcome for the
    /// player to move at `initial`. Unfinished playouts count as draws.
    fn rollout<G: GameState>(&self, initial: &G) -> f32 {
        let me = initial.current_player();
        let mut state = initial.clone();
        let mut depth = 0;

        while state.scores().is_none() && depth < self.max_rollout_depth {
            let valid = state.valid_moves();
            let legal: Vec<usize> = valid
                .iter()
                .enumerate()
                .filter(|(_, &ok)| ok)
                .map(|(i, _)| i)
                .collect();
            if legal.is_empty() {
                break;
            }
            let pick = legal[self.rng.borrow_mut().gen_range(0..legal.len())];
            state
                .play_move(pick)
                .expect("BUG: rollout picked an invalid move");
            depth += 1;
        }

        match state.scores() {
            Some(scores) => terminal_value(&scores, me, state.num_players()),
            None => 0.0,
        }
    }
}

impl<G: GameState, R: Rng> Evaluator<G> for RolloutEvaluator<R> {
    fn evaluate(&self, state: &G) -> Evaluation {
        let valid = state.valid_moves();
        let legal = valid.iter().filter(|&&ok| ok).count();

        let mut policy = vec![0.0; state.num_moves()];
        if legal > 0 {
            let prior = 1.0 / legal as f32;
            for (slot, &ok) in policy.iter_mut().zip(valid.iter()) {
                if ok {
                    *slot = prior;
                }
            }
        }

        Evaluation {
            value: self.rollout(state),
            policy,
        }
    }
}

/// Collapse a one-hot score vector over (players.., draw) into a scalar
/// in [-1, 1] for `player`: +1 win, -1 loss, 0 draw.
pub fn terminal_value(scores: &[f32], player: usize, num_players: usize) -> f32 {
    let mut v = 0.0;
    for (p, &s) in scores.iter().take(num_players).enumerate() {
        if p == player {
            v += s;
        } else {
            v -= s;
        }
    }
    v
}
