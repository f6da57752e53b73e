use thiserror::Error;

/// Errors surfaced by the search engine.
///
/// All of these are caller contract violations rather than recoverable
/// runtime conditions: the engine surfaces them immediately and never
/// falls back to a degraded move choice.
#[derive(Error, Debug)]
pub enum AlphaZeroError {
    #[error("Invalid move index: {0}")]
    InvalidMove(usize),

    #[error("A simulation is already pending; call process_result first")]
    SimulationPending,

    #[error("No simulation is pending; call find_leaf first")]
    NoSimulationPending,

    #[error("Root has no children; run at least one simulation before pick_move")]
    RootNotExpanded,

    #[error("Policy vector length {got} does not match action space size {expected}")]
    PolicyLength { expected: usize, got: usize },
}

/// Convenience Result type for engine operations
pub type Result<T> = std::result::Result<T, AlphaZeroError>;
