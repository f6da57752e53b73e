//! Arena-allocated search tree.
//!
//! Nodes live in a contiguous vector and are referenced by index. The
//! tree is owned exclusively by its controller and torn down with it or
//! on root advancement.

use crate::node::{Node, NodeId};

#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Create a new tree with an empty root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::root()],
        }
    }

    /// Get a reference to a node by ID.
    ///
    /// # Panics
    /// Panics if the NodeId is invalid.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Get a mutable reference to a node by ID.
    ///
    /// # Panics
    /// Panics if the NodeId is invalid.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Add a node, returning its ID.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Clear the tree for reuse, keeping only a fresh root.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::root());
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (should never be true as root always
    /// exists).
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &Node {
        self.get(NodeId::ROOT)
    }

    /// Expand a node: create exactly one child per set bit in the
    /// legal-move mask, in ascending action order, all with zero
    /// statistics. Priors are assigned separately by [`Tree::set_priors`].
    ///
    /// # Panics
    /// Panics if the node is already expanded; expansion happens exactly
    /// once per frontier node.
    pub fn expand(&mut self, id: NodeId, valid: &[bool]) {
        assert!(
            !self.get(id).expanded,
            "BUG: expand called on already-expanded node"
        );

        let mut children = Vec::new();
        for (action, &ok) in valid.iter().enumerate() {
            if ok {
                children.push(self.add(Node::new(Some(action))));
            }
        }

        let node = self.get_mut(id);
        node.children = children;
        node.expanded = true;
    }

    /// Set each child's prior from the evaluator's policy vector, indexed
    /// by the child's action. The vector is not renormalized over legal
    /// moves; the engine does not enforce that priors sum to 1.
    pub fn set_priors(&mut self, id: NodeId, pi: &[f32]) {
        let children = self.get(id).children.clone();
        for child_id in children {
            let child = self.get_mut(child_id);
            let action = child.action.expect("BUG: non-root child without action");
            child.policy = pi[action];
        }
    }

    /// Return the child of `id` maximizing the selection score, ties
    /// broken by the lowest action index (children are stored in
    /// ascending action order and comparison is strict).
    ///
    /// # Panics
    /// Panics if the node has no children; the caller checks for
    /// terminal/unexpanded state first.
    pub fn best_child(&self, id: NodeId, cpuct: f32) -> NodeId {
        let parent = self.get(id);
        let parent_n = parent.n;

        let mut best = None;
        let mut best_score = f32::NEG_INFINITY;
        for &child_id in &parent.children {
            let score = self.get(child_id).score(parent_n, cpuct);
            if score > best_score {
                best_score = score;
                best = Some(child_id);
            }
        }

        best.expect("BUG: best_child called on node without children")
    }

    /// Rebuild the tree with the subtree rooted at `new_root` as the new
    /// root, dropping everything else. Node statistics survive; the new
    /// root's action reverts to the sentinel.
    pub fn reroot(&mut self, new_root: NodeId) {
        let mut keep = Vec::new();
        let mut remap = vec![usize::MAX; self.nodes.len()];

        // Preorder copy; child id vectors are remapped afterwards.
        let mut queue = vec![new_root];
        while let Some(id) = queue.pop() {
            remap[id.0] = keep.len();
            keep.push(self.nodes[id.0].clone());
            queue.extend(self.nodes[id.0].children.iter().rev().copied());
        }

        for node in &mut keep {
            for child in &mut node.children {
                *child = NodeId(remap[child.0]);
            }
        }
        keep[0].action = None;

        self.nodes = keep;
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_creation() {
        let tree = Tree::new();
        assert_eq!(tree.len(), 1);
        assert!(!tree.is_empty());
        assert_eq!(tree.root().action, None);
    }

    #[test]
    fn test_expand_creates_one_child_per_legal_move() {
        let mut tree = Tree::new();
        tree.expand(NodeId::ROOT, &[true, false, true, true, false]);

        let actions: Vec<usize> = tree
            .root()
            .children
            .iter()
            .map(|&id| tree.get(id).action.unwrap())
            .collect();
        assert_eq!(actions, vec![0, 2, 3]);
        assert!(tree.root().expanded);
        for &id in &tree.root().children {
            let child = tree.get(id);
            assert_eq!(child.n, 0);
            assert_eq!(child.policy, 0.0);
            assert!(child.children.is_empty());
        }
    }

    #[test]
    #[should_panic(expected = "already-expanded")]
    fn test_double_expand_panics() {
        let mut tree = Tree::new();
        tree.expand(NodeId::ROOT, &[true, true]);
        tree.expand(NodeId::ROOT, &[true, true]);
    }

    #[test]
    fn test_set_priors_indexes_by_action() {
        let mut tree = Tree::new();
        tree.expand(NodeId::ROOT, &[false, true, false, true]);
        tree.set_priors(NodeId::ROOT, &[0.9, 0.1, 0.9, 0.7]);

        let priors: Vec<f32> = tree
            .root()
            .children
            .iter()
            .map(|&id| tree.get(id).policy)
            .collect();
        assert_eq!(priors, vec![0.1, 0.7]);
    }

    #[test]
    fn test_best_child_prefers_highest_prior_at_zero_visits() {
        let mut tree = Tree::new();
        tree.expand(NodeId::ROOT, &[true; 7]);
        tree.set_priors(NodeId::ROOT, &[0.1, 1.2, 0.3, 0.4, 0.5, 0.6, 0.7]);
        tree.get_mut(NodeId::ROOT).n = 1;

        let best = tree.best_child(NodeId::ROOT, 2.0);
        assert_eq!(tree.get(best).action, Some(1));
    }

    #[test]
    fn test_best_child_ties_break_to_lowest_action() {
        let mut tree = Tree::new();
        tree.expand(NodeId::ROOT, &[true, true, true]);
        tree.set_priors(NodeId::ROOT, &[0.5, 0.5, 0.5]);
        tree.get_mut(NodeId::ROOT).n = 1;

        let best = tree.best_child(NodeId::ROOT, 2.0);
        assert_eq!(tree.get(best).action, Some(0));
    }

    #[test]
    #[should_panic(expected = "without children")]
    fn test_best_child_on_leaf_panics() {
        let tree = Tree::new();
        tree.best_child(NodeId::ROOT, 2.0);
    }

    #[test]
    fn test_reroot_keeps_subtree_statistics() {
        let mut tree = Tree::new();
        tree.expand(NodeId::ROOT, &[true, true]);
        let kept = tree.root().children[1];
        tree.get_mut(kept).n = 7;
        tree.get_mut(kept).w = 3.5;
        tree.expand(kept, &[true, false, true]);

        tree.reroot(kept);

        assert_eq!(tree.root().action, None);
        assert_eq!(tree.root().n, 7);
        assert_eq!(tree.len(), 3);
        let actions: Vec<usize> = tree
            .root()
            .children
            .iter()
            .map(|&id| tree.get(id).action.unwrap())
            .collect();
        assert_eq!(actions, vec![0, 2]);
    }

    #[test]
    fn test_clear_resets_to_fresh_root() {
        let mut tree = Tree::new();
        tree.expand(NodeId::ROOT, &[true, true]);
        assert_eq!(tree.len(), 3);

        tree.clear();
        assert_eq!(tree.len(), 1);
        assert!(!tree.root().expanded);
    }
}
