//! Search controller: selection, expansion, backpropagation, move pick.
//!
//! The controller drives repeated simulations over an arena tree but does
//! not evaluate positions itself. Each simulation is split across two
//! calls: `find_leaf` descends to a frontier and returns the cloned,
//! advanced game state; the caller obtains a `(value, policy)` pair from
//! its evaluator (or skips it for terminal frontiers) and feeds it back
//! through `process_result`, which expands and backpropagates. After the
//! simulation budget, `pick_move` selects from the root's visit counts.

use crate::config::SearchConfig;
use crate::evaluator::{terminal_value, Evaluator};
use crate::node::NodeId;
use crate::tree::Tree;
use alphazero_core::{AlphaZeroError, GameState, Result};
use rand::Rng;
use rand_distr::{Dirichlet, Distribution};
use std::marker::PhantomData;
use tracing::trace;

/// Bookkeeping for the one simulation allowed in flight.
struct Pending {
    frontier: NodeId,
    /// Legal-move mask captured at the frontier; `None` when the frontier
    /// is terminal and no expansion will happen.
    valid: Option<Vec<bool>>,
}

/// Monte Carlo Tree Search controller.
///
/// Generic over the game being searched and the RNG used for root noise
/// and temperature sampling. Single-threaded: one simulation completes
/// fully before the next begins, and only one `find_leaf` may be pending
/// at a time.
pub struct Mcts<G: GameState, R: Rng> {
    config: SearchConfig,
    tree: Tree,
    /// Nodes traversed by the pending simulation, root first.
    path: Vec<NodeId>,
    pending: Option<Pending>,
    /// Completed simulations since construction or root advancement.
    depth: u32,
    rng: R,
    _game: PhantomData<G>,
}

impl<G: GameState, R: Rng> Mcts<G, R> {
    pub fn new(config: SearchConfig, rng: R) -> Self {
        Self {
            config,
            tree: Tree::new(),
            path: Vec::new(),
            pending: None,
            depth: 0,
            rng,
            _game: PhantomData,
        }
    }

    /// Completed-simulation counter; the caller's loop-termination
    /// condition. Not tree depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Descend from the root to a frontier node, replaying the selected
    /// moves on a clone of `gs`, and return the advanced clone. The
    /// authoritative state is never mutated.
    ///
    /// The caller checks `scores()` on the returned state: if it is
    /// `Some`, the evaluator call can be skipped and `process_result`'s
    /// arguments are ignored.
    ///
    /// # Errors
    /// `SimulationPending` if a previous `find_leaf` has not been answered
    /// by `process_result`; `InvalidMove` only if the game contract is
    /// broken.
    pub fn find_leaf(&mut self, gs: &G) -> Result<G> {
        if self.pending.is_some() {
            return Err(AlphaZeroError::SimulationPending);
        }

        let mut leaf = gs.clone();
        let mut current = NodeId::ROOT;
        self.path.clear();
        self.path.push(current);

        while self.tree.get(current).expanded && !self.tree.get(current).terminal {
            current = self.tree.best_child(current, self.config.cpuct);
            let action = self
                .tree
                .get(current)
                .action
                .expect("BUG: non-root node without action");
            leaf.play_move(action)?;
            self.path.push(current);
        }

        let node = self.tree.get_mut(current);
        let valid = if node.terminal {
            None
        } else if let Some(scores) = leaf.scores() {
            // First touch of a terminal position: cache its value so
            // later visits skip the probe too.
            node.terminal = true;
            node.terminal_value = Some(terminal_value(
                &scores,
                leaf.current_player(),
                leaf.num_players(),
            ));
            None
        } else {
            Some(leaf.valid_moves())
        };

        trace!(
            frontier = current.0,
            plies = self.path.len() - 1,
            terminal = valid.is_none(),
            "selected leaf"
        );
        self.pending = Some(Pending {
            frontier: current,
            valid,
        });
        Ok(leaf)
    }

    /// Complete the pending simulation: expand the frontier with priors
    /// from `pi` and backpropagate `value` up the traversed path.
    ///
    /// `value` is the evaluator's estimate for the player to move at the
    /// frontier. For a terminal frontier both arguments are ignored; the
    /// value comes from the cached terminal score and the node stays
    /// childless forever.
    ///
    /// # Errors
    /// `NoSimulationPending` without a prior `find_leaf`; `PolicyLength`
    /// if `pi` does not span the action space.
    pub fn process_result(&mut self, value: f32, pi: &[f32]) -> Result<()> {
        let pending = self
            .pending
            .take()
            .ok_or(AlphaZeroError::NoSimulationPending)?;

        let leaf_value = match pending.valid {
            None => self
                .tree
                .get(pending.frontier)
                .terminal_value
                .expect("BUG: terminal node without cached value"),
            Some(valid) => {
                if pi.len() != self.config.num_moves {
                    return Err(AlphaZeroError::PolicyLength {
                        expected: self.config.num_moves,
                        got: pi.len(),
                    });
                }
                self.tree.expand(pending.frontier, &valid);
                self.tree.set_priors(pending.frontier, pi);
                if pending.frontier == NodeId::ROOT && self.config.exploration_fraction > 0.0 {
                    self.apply_root_noise();
                }
                value
            }
        };

        self.backpropagate(leaf_value);
        self.depth += 1;
        Ok(())
    }

    /// Walk the path frontier-to-root, incrementing every visit count and
    /// accumulating the value with a sign flip at each ply boundary.
    ///
    /// `leaf_value` arrives relative to the player to move at the
    /// frontier; each node stores value relative to the player who chose
    /// the move into it, hence the initial negation.
    fn backpropagate(&mut self, leaf_value: f32) {
        let mut value = -leaf_value;
        for &id in self.path.iter().rev() {
            let node = self.tree.get_mut(id);
            node.n += 1;
            node.w += value;
            value = -value;
        }
    }

    /// Mix Dirichlet noise into the root priors. Called once per root:
    /// on its expansion, or on advancement to an already-expanded node.
    fn apply_root_noise(&mut self) {
        let children = self.tree.root().children.clone();
        if children.len() < 2 {
            return;
        }

        let alpha = vec![self.config.dirichlet_alpha; children.len()];
        let dirichlet = Dirichlet::new(&alpha).expect("BUG: invalid Dirichlet alpha");
        let noise: Vec<f32> = dirichlet.sample(&mut self.rng);

        let eps = self.config.exploration_fraction;
        for (child_id, noise) in children.into_iter().zip(noise) {
            let child = self.tree.get_mut(child_id);
            child.policy = (1.0 - eps) * child.policy + eps * noise;
        }
    }

    /// Select an action from the root's child visit counts.
    ///
    /// At `temperature == 0` this is deterministic: the most-visited
    /// child, ties broken by the lowest action index, and the RNG is
    /// never consulted. At `temperature > 0`, visit counts are raised to
    /// `1/temperature`, normalized, and sampled.
    ///
    /// # Errors
    /// `RootNotExpanded` if the search never ran.
    pub fn pick_move(&mut self, temperature: f32) -> Result<usize> {
        let counts = self.root_counts()?;

        if temperature <= 0.0 {
            let mut best = counts[0];
            for &(action, n) in &counts[1..] {
                if n > best.1 {
                    best = (action, n);
                }
            }
            return Ok(best.0);
        }

        let inv_temp = 1.0 / temperature as f64;
        let weights: Vec<f64> = counts
            .iter()
            .map(|&(_, n)| (n as f64).powf(inv_temp))
            .collect();
        let total: f64 = weights.iter().sum();
        if total == 0.0 {
            return Ok(counts[0].0);
        }

        let threshold = self.rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        for (&(action, _), weight) in counts.iter().zip(&weights) {
            cumulative += weight;
            if cumulative >= threshold {
                return Ok(action);
            }
        }
        Ok(counts[counts.len() - 1].0)
    }

    /// Normalized visit-count distribution over the full action space,
    /// sharpened by `1/temperature`; the training policy target. At
    /// `temperature == 0` it is one-hot on the `pick_move(0.0)` action.
    pub fn policy_target(&mut self, temperature: f32) -> Result<Vec<f32>> {
        let mut target = vec![0.0; self.config.num_moves];

        if temperature <= 0.0 {
            let best = self.pick_move(0.0)?;
            target[best] = 1.0;
            return Ok(target);
        }

        let counts = self.root_counts()?;
        let inv_temp = 1.0 / temperature as f64;
        let weights: Vec<f64> = counts
            .iter()
            .map(|&(_, n)| (n as f64).powf(inv_temp))
            .collect();
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            for (&(action, _), weight) in counts.iter().zip(&weights) {
                target[action] = (weight / total) as f32;
            }
        }
        Ok(target)
    }

    /// Visit-weighted mean child value; the search's estimate for the
    /// root position from the root player's perspective. Child values are
    /// already stored from the chooser's (root player's) perspective.
    pub fn root_value(&self) -> f32 {
        let root = self.tree.root();
        let total: u32 = root.children.iter().map(|&id| self.tree.get(id).n).sum();
        if total == 0 {
            return 0.0;
        }
        let sum: f32 = root.children.iter().map(|&id| self.tree.get(id).w).sum();
        sum / total as f32
    }

    /// Advance the root to the child reached by `action` after the move
    /// is committed on the authoritative state, reusing the surviving
    /// subtree. If the child was never created the tree resets instead;
    /// reuse is an optimization, not a requirement. The simulation
    /// counter restarts either way.
    ///
    /// When the surviving subtree's root is already expanded, root noise
    /// is re-mixed into its priors here: expansion will not happen again,
    /// and each per-move search gets noised exactly once.
    ///
    /// # Errors
    /// `SimulationPending` while a simulation is in flight.
    pub fn advance_root(&mut self, action: usize) -> Result<()> {
        if self.pending.is_some() {
            return Err(AlphaZeroError::SimulationPending);
        }

        let surviving = self
            .tree
            .root()
            .children
            .iter()
            .copied()
            .find(|&id| self.tree.get(id).action == Some(action));

        match surviving {
            Some(id) => self.tree.reroot(id),
            None => self.tree.clear(),
        }
        if self.tree.root().expanded && self.config.exploration_fraction > 0.0 {
            self.apply_root_noise();
        }
        self.depth = 0;
        self.path.clear();
        Ok(())
    }

    /// Run the full simulation loop against `evaluator` until `budget`
    /// simulations have completed, skipping the evaluator for terminal
    /// frontiers.
    pub fn search<E: Evaluator<G>>(&mut self, gs: &G, evaluator: &E, budget: u32) -> Result<()> {
        while self.depth < budget {
            let leaf = self.find_leaf(gs)?;
            if leaf.scores().is_some() {
                self.process_result(0.0, &[])?;
            } else {
                let eval = evaluator.evaluate(&leaf);
                self.process_result(eval.value, &eval.policy)?;
            }
        }
        trace!(simulations = self.depth, nodes = self.tree.len(), "search complete");
        Ok(())
    }

    /// Per-action visit counts at the root, ascending action order.
    fn root_counts(&self) -> Result<Vec<(usize, u32)>> {
        let root = self.tree.root();
        if root.children.is_empty() {
            return Err(AlphaZeroError::RootNotExpanded);
        }
        Ok(root
            .children
            .iter()
            .map(|&id| {
                let child = self.tree.get(id);
                let action = child.action.expect("BUG: non-root node without action");
                (action, child.n)
            })
            .collect())
    }

    #[cfg(test)]
    pub(crate) fn tree(&self) -> &Tree {
        &self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::UniformEvaluator;
    use alphazero_core::PlayHistory;
    use ndarray::Array3;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::fmt;

    // Test game: race to five. Players alternate adding 1 or 2; whoever
    // lands exactly on five wins. First player wins with optimal play by
    // moving to two.
    #[derive(Clone, PartialEq, Eq, Hash)]
    struct RaceToFive {
        count: u8,
        player: usize,
        turn: u32,
    }

    impl RaceToFive {
        fn new() -> Self {
            Self {
                count: 0,
                player: 0,
                turn: 0,
            }
        }

        fn at(count: u8, player: usize) -> Self {
            Self {
                count,
                player,
                turn: 0,
            }
        }
    }

    impl fmt::Display for RaceToFive {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "count {} player {}", self.count, self.player)
        }
    }

    impl GameState for RaceToFive {
        fn current_player(&self) -> usize {
            self.player
        }

        fn current_turn(&self) -> u32 {
            self.turn
        }

        fn num_players(&self) -> usize {
            2
        }

        fn num_moves(&self) -> usize {
            2
        }

        fn valid_moves(&self) -> Vec<bool> {
            vec![self.count + 1 <= 5, self.count + 2 <= 5]
        }

        fn play_move(&mut self, action: usize) -> alphazero_core::Result<()> {
            let step = action as u8 + 1;
            if action >= 2 || self.count + step > 5 {
                return Err(AlphaZeroError::InvalidMove(action));
            }
            self.count += step;
            self.player = 1 - self.player;
            self.turn += 1;
            Ok(())
        }

        fn scores(&self) -> Option<Vec<f32>> {
            if self.count >= 5 {
                // The player who just moved landed on five and wins.
                let mut scores = vec![0.0; 3];
                scores[1 - self.player] = 1.0;
                Some(scores)
            } else {
                None
            }
        }

        fn canonicalized(&self) -> Array3<f32> {
            Array3::from_elem((1, 1, 1), self.count as f32)
        }

        fn symmetries(&self, base: &PlayHistory) -> Vec<PlayHistory> {
            vec![base.clone()]
        }
    }

    fn make_mcts(config: SearchConfig, seed: u64) -> Mcts<RaceToFive, ChaCha8Rng> {
        Mcts::new(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn eval_config() -> SearchConfig {
        SearchConfig::for_evaluation(2, 2)
    }

    #[test]
    fn test_finds_winning_move_from_start() {
        let mut mcts = make_mcts(eval_config(), 42);
        let gs = RaceToFive::new();
        mcts.search(&gs, &UniformEvaluator, 300).unwrap();

        // Moving to two leaves the opponent lost; +2 is action 1.
        assert_eq!(mcts.pick_move(0.0).unwrap(), 1);
    }

    #[test]
    fn test_visit_conservation() {
        let mut mcts = make_mcts(eval_config(), 7);
        let gs = RaceToFive::new();
        mcts.search(&gs, &UniformEvaluator, 157).unwrap();

        let tree = mcts.tree();
        assert_eq!(tree.root().n, 157);
        for id in (0..tree.len()).map(NodeId) {
            let node = tree.get(id);
            if node.expanded {
                let child_sum: u32 = node.children.iter().map(|&c| tree.get(c).n).sum();
                assert_eq!(node.n, 1 + child_sum, "node {} violates conservation", id.0);
            }
        }
    }

    #[test]
    fn test_forced_win_backpropagates_plus_one() {
        // From count three the mover wins immediately with +2.
        let mut mcts = make_mcts(eval_config(), 3);
        let gs = RaceToFive::at(3, 0);
        mcts.search(&gs, &UniformEvaluator, 60).unwrap();

        let tree = mcts.tree();
        let winning = tree
            .root()
            .children
            .iter()
            .copied()
            .find(|&id| tree.get(id).action == Some(1))
            .unwrap();
        let node = tree.get(winning);
        // Terminal win for the chooser: every visit adds exactly +1.
        assert!(node.terminal);
        assert!(node.n > 0);
        assert!((node.q() - 1.0).abs() < 1e-6);
        assert!(mcts.root_value() > 0.9);
        assert_eq!(mcts.pick_move(0.0).unwrap(), 1);
    }

    #[test]
    fn test_terminal_root_short_circuits() {
        let mut mcts = make_mcts(eval_config(), 0);
        let gs = RaceToFive::at(5, 1);
        assert!(gs.scores().is_some());

        let leaf = mcts.find_leaf(&gs).unwrap();
        assert!(leaf.scores().is_some());
        // Arguments are ignored for a terminal frontier.
        mcts.process_result(0.7, &[]).unwrap();

        assert_eq!(mcts.depth(), 1);
        assert_eq!(mcts.tree().len(), 1);
        assert!(mcts.tree().root().terminal);
    }

    #[test]
    fn test_second_find_leaf_is_rejected() {
        let mut mcts = make_mcts(eval_config(), 0);
        let gs = RaceToFive::new();
        mcts.find_leaf(&gs).unwrap();
        assert!(matches!(
            mcts.find_leaf(&gs),
            Err(AlphaZeroError::SimulationPending)
        ));
    }

    #[test]
    fn test_process_result_without_pending_is_rejected() {
        let mut mcts = make_mcts(eval_config(), 0);
        assert!(matches!(
            mcts.process_result(0.0, &[0.5, 0.5]),
            Err(AlphaZeroError::NoSimulationPending)
        ));
    }

    #[test]
    fn test_pick_move_before_search_is_rejected() {
        let mut mcts = make_mcts(eval_config(), 0);
        assert!(matches!(
            mcts.pick_move(0.0),
            Err(AlphaZeroError::RootNotExpanded)
        ));
    }

    #[test]
    fn test_policy_length_mismatch_is_rejected() {
        let mut mcts = make_mcts(eval_config(), 0);
        let gs = RaceToFive::new();
        mcts.find_leaf(&gs).unwrap();
        assert!(matches!(
            mcts.process_result(0.0, &[1.0]),
            Err(AlphaZeroError::PolicyLength {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_policy_target_sums_to_one() {
        let mut mcts = make_mcts(eval_config(), 9);
        let gs = RaceToFive::new();
        mcts.search(&gs, &UniformEvaluator, 120).unwrap();

        let target = mcts.policy_target(1.0).unwrap();
        assert_eq!(target.len(), 2);
        let sum: f32 = target.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);

        let greedy = mcts.policy_target(0.0).unwrap();
        assert_eq!(greedy.iter().filter(|&&p| p == 1.0).count(), 1);
    }

    #[test]
    fn test_advance_root_reuses_subtree() {
        let mut mcts = make_mcts(eval_config(), 5);
        let gs = RaceToFive::new();
        mcts.search(&gs, &UniformEvaluator, 200).unwrap();

        let tree = mcts.tree();
        let child = tree
            .root()
            .children
            .iter()
            .copied()
            .find(|&id| tree.get(id).action == Some(1))
            .unwrap();
        let child_n = tree.get(child).n;

        mcts.advance_root(1).unwrap();
        assert_eq!(mcts.depth(), 0);
        assert_eq!(mcts.tree().root().n, child_n);

        // The advanced controller keeps searching from the new position.
        let mut gs = gs;
        gs.play_move(1).unwrap();
        mcts.search(&gs, &UniformEvaluator, child_n + 50).unwrap();
    }

    #[test]
    fn test_root_noise_perturbs_priors() {
        // With the whole prior replaced, root priors are pure Dirichlet
        // noise rather than the evaluator's uniform 1/2.
        let mut config = SearchConfig::new(2, 2);
        config.exploration_fraction = 1.0;
        let mut mcts = make_mcts(config, 21);
        let gs = RaceToFive::new();
        mcts.search(&gs, &UniformEvaluator, 50).unwrap();

        let tree = mcts.tree();
        let priors: Vec<f32> = tree
            .root()
            .children
            .iter()
            .map(|&id| tree.get(id).policy)
            .collect();
        let sum: f32 = priors.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(priors.iter().any(|&p| (p - 0.5).abs() > 1e-3));
    }

    #[test]
    fn test_advance_root_reapplies_noise() {
        // A reused subtree root was expanded as an interior node with the
        // evaluator's plain priors; advancement must noise it afresh so
        // later per-move searches keep exploring.
        let mut config = SearchConfig::new(2, 2);
        config.exploration_fraction = 1.0;
        let mut mcts = make_mcts(config, 13);
        let mut gs = RaceToFive::new();
        mcts.search(&gs, &UniformEvaluator, 200).unwrap();

        gs.play_move(0).unwrap();
        mcts.advance_root(0).unwrap();
        assert!(mcts.tree().root().expanded);

        let tree = mcts.tree();
        let priors: Vec<f32> = tree
            .root()
            .children
            .iter()
            .map(|&id| tree.get(id).policy)
            .collect();
        let sum: f32 = priors.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(priors.iter().any(|&p| (p - 0.5).abs() > 1e-3));
    }

    proptest::proptest! {
        // Every simulation increments exactly one node per level on its
        // path, so the invariant holds at any budget.
        #[test]
        fn prop_visit_conservation_any_budget(budget in 1u32..250, seed in proptest::prelude::any::<u64>()) {
            let mut mcts = make_mcts(eval_config(), seed);
            let gs = RaceToFive::new();
            mcts.search(&gs, &UniformEvaluator, budget).unwrap();

            let tree = mcts.tree();
            proptest::prop_assert_eq!(tree.root().n, budget);
            for id in (0..tree.len()).map(NodeId) {
                let node = tree.get(id);
                if node.expanded {
                    let child_sum: u32 = node.children.iter().map(|&c| tree.get(c).n).sum();
                    proptest::prop_assert_eq!(node.n, 1 + child_sum);
                }
            }
        }
    }

    #[test]
    fn test_deterministic_at_zero_temperature() {
        let run = |seed: u64| {
            let mut mcts = make_mcts(eval_config(), seed);
            let gs = RaceToFive::new();
            mcts.search(&gs, &UniformEvaluator, 150).unwrap();
            (mcts.pick_move(0.0).unwrap(), mcts.policy_target(1.0).unwrap())
        };

        // Different RNG seeds cannot matter: no noise, temperature zero.
        assert_eq!(run(1), run(99));
    }
}
