//! MCTS node statistics for arena storage.
//!
//! Uses arena allocation with indices for cache locality and simpler
//! memory management; the back-reference to a parent is the traversal
//! path kept by the controller, not a pointer.

/// Index into the node arena.
///
/// A lightweight handle referencing a node in the tree. Using indices
/// instead of references lets backpropagation walk a path of handles
/// without lifetime conflicts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root node is always at index 0.
    pub const ROOT: NodeId = NodeId(0);
}

/// A node in the search tree: statistics for one position reached by a
/// specific move from its parent.
#[derive(Clone, Debug)]
pub struct Node {
    /// Action index that led to this node (`None` for the root).
    pub action: Option<usize>,

    /// Prior probability assigned by the evaluator for this action.
    /// Zero until `set_priors` runs on the parent.
    pub policy: f32,

    /// Visit count: simulations that passed through or terminated here.
    pub n: u32,

    /// Accumulated value sum, from the perspective of the player choosing
    /// the move into this node (the parent's player to move). That is the
    /// perspective `best_child` needs, so selection maximizes `q` directly.
    pub w: f32,

    /// Children in ascending action order. Created once, in one batch,
    /// from the full legal-move set.
    pub children: Vec<NodeId>,

    /// Whether children have been generated.
    pub expanded: bool,

    /// Whether this node is a terminal position. Terminal nodes are never
    /// expanded; repeated selection paths that reach one simply increment
    /// `n` without further descent.
    pub terminal: bool,

    /// Terminal value for the player to move at this node, if terminal.
    pub terminal_value: Option<f32>,
}

impl Node {
    /// Create a new unexpanded node.
    pub fn new(action: Option<usize>) -> Self {
        Self {
            action,
            policy: 0.0,
            n: 0,
            w: 0.0,
            children: Vec::new(),
            expanded: false,
            terminal: false,
            terminal_value: None,
        }
    }

    /// Create the root node (sentinel "no move").
    pub fn root() -> Self {
        Self::new(None)
    }

    /// Mean value (Q) for this node; 0 if never visited.
    pub fn q(&self) -> f32 {
        if self.n == 0 {
            0.0
        } else {
            self.w / self.n as f32
        }
    }

    /// PUCT-style selection score.
    ///
    /// `score = q + cpuct * policy * parent_n / (1 + n)`
    ///
    /// Linear in the parent visit count, not square-root.
    pub fn score(&self, parent_n: u32, cpuct: f32) -> f32 {
        self.q() + cpuct * self.policy * parent_n as f32 / (1.0 + self.n as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_q_unvisited_is_zero() {
        let node = Node::new(Some(3));
        assert_eq!(node.q(), 0.0);
    }

    #[test]
    fn test_q_is_running_mean() {
        let mut node = Node::new(Some(0));
        node.n = 2;
        node.w = 1.5;
        assert!((node.q() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_score_scales_linearly_with_parent_visits() {
        let mut node = Node::new(Some(5));
        node.policy = 0.6;

        // q = 0 at n = 0, so score = cpuct * policy * parent_n.
        assert!((node.score(1, 2.0) - 1.2).abs() < 1e-6);
        assert!((node.score(2, 2.0) - 2.4).abs() < 1e-6);
    }

    #[test]
    fn test_score_combines_q_and_exploration() {
        let mut node = Node::new(Some(0));
        node.policy = 0.5;
        node.n = 1;
        node.w = 0.4;

        // q = 0.4, U = 2 * 0.5 * 4 / 2 = 2.0
        assert!((node.score(4, 2.0) - 2.4).abs() < 1e-6);
    }

    #[test]
    fn test_root_node() {
        let root = Node::root();
        assert_eq!(root.action, None);
        assert!(!root.expanded);
        assert!(!root.terminal);
    }
}
