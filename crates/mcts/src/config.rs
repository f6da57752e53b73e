//! Search configuration parameters.

/// Construction parameters for the search controller.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Number of players in the game.
    pub num_players: usize,

    /// Size of the action space (length of every policy vector).
    pub num_moves: usize,

    /// Exploration constant weighting the prior term of the selection
    /// score.
    pub cpuct: f32,

    /// Dirichlet noise alpha for root exploration. Higher values give
    /// more uniform noise, lower more concentrated.
    pub dirichlet_alpha: f32,

    /// Fraction of the root priors replaced with Dirichlet noise.
    /// 0 disables root noise entirely.
    pub exploration_fraction: f32,
}

impl SearchConfig {
    /// Self-play defaults: root noise enabled.
    pub fn new(num_players: usize, num_moves: usize) -> Self {
        Self {
            num_players,
            num_moves,
            cpuct: 2.0,
            dirichlet_alpha: 0.3,
            exploration_fraction: 0.25,
        }
    }

    /// Evaluation/match-play config: no root noise.
    pub fn for_evaluation(num_players: usize, num_moves: usize) -> Self {
        Self {
            exploration_fraction: 0.0,
            ..Self::new(num_players, num_moves)
        }
    }

    pub fn with_cpuct(mut self, cpuct: f32) -> Self {
        self.cpuct = cpuct;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let config = SearchConfig::new(2, 7);
        assert_eq!(config.num_players, 2);
        assert_eq!(config.num_moves, 7);
        assert!((config.cpuct - 2.0).abs() < 1e-6);
        assert!((config.exploration_fraction - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_for_evaluation_disables_noise() {
        let config = SearchConfig::for_evaluation(2, 7);
        assert_eq!(config.exploration_fraction, 0.0);
        assert!((config.dirichlet_alpha - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_with_cpuct() {
        let config = SearchConfig::new(2, 7).with_cpuct(1.25);
        assert!((config.cpuct - 1.25).abs() < 1e-6);
    }
}
