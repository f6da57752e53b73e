//! Self-play game generation and evaluator matches.
//!
//! Generates Connect-4 games with the search engine, expands every
//! training record through the game's symmetry group, and saves the
//! results in MessagePack format for a training pipeline. Also plays
//! head-to-head matches between evaluator strategies.

use alphazero_core::{GameState, PlayHistory};
use alphazero_mcts::{
    games::Connect4, terminal_value, Evaluator, Mcts, RolloutEvaluator, SearchConfig,
    UniformEvaluator,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// AlphaZero self-play and evaluation tool.
#[derive(Parser)]
#[command(name = "alphazero-selfplay")]
#[command(about = "Generate self-play games and run evaluator matches")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate self-play games for training.
    Generate {
        /// Number of games to generate.
        #[arg(short, long, default_value = "10")]
        games: usize,

        /// Output directory for game files.
        #[arg(short, long, default_value = "data/games")]
        output: PathBuf,

        /// Number of simulations per move.
        #[arg(short, long, default_value = "200")]
        simulations: u32,

        /// Random seed for reproducibility.
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Temperature for move selection early in the game.
        #[arg(short, long, default_value = "1.0")]
        temperature: f32,

        /// Turn number after which moves are picked greedily.
        #[arg(long, default_value = "10")]
        temperature_drop: u32,

        /// Maximum rollout depth for the value playout.
        #[arg(long, default_value = "42")]
        rollout_depth: usize,
    },

    /// Match the rollout evaluator against the uniform baseline.
    Evaluate {
        /// Number of games to play.
        #[arg(short, long, default_value = "50")]
        games: usize,

        /// Number of simulations per move.
        #[arg(short, long, default_value = "200")]
        simulations: u32,

        /// Maximum rollout depth for the value playout.
        #[arg(long, default_value = "42")]
        rollout_depth: usize,

        /// Random seed for reproducibility.
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

/// Play one self-play game, returning the symmetry-expanded training
/// records labelled with the final outcome.
fn generate_game<E: Evaluator<Connect4>>(
    evaluator: &E,
    simulations: u32,
    seed: u64,
    temperature: f32,
    temperature_drop: u32,
) -> Result<Vec<PlayHistory>> {
    let mut gs = Connect4::new();
    let config = SearchConfig::new(gs.num_players(), gs.num_moves());
    let mut mcts = Mcts::new(config, ChaCha8Rng::seed_from_u64(seed));

    // Snapshots of (encoding, policy target, player to move); outcome
    // labels are only known once the game ends.
    let mut snapshots = Vec::new();

    while gs.scores().is_none() {
        mcts.search(&gs, evaluator, simulations)?;
        snapshots.push((
            gs.canonicalized(),
            mcts.policy_target(1.0)?,
            gs.current_player(),
        ));

        let temp = if gs.current_turn() < temperature_drop {
            temperature
        } else {
            0.0
        };
        let action = mcts.pick_move(temp)?;
        gs.play_move(action)?;
        mcts.advance_root(action)?;
    }

    let scores = gs.scores().expect("game loop exited on a terminal state");
    let mut histories = Vec::new();
    for (canonical, pi, player) in snapshots {
        let v = terminal_value(&scores, player, gs.num_players());
        let base = PlayHistory::new(canonical, pi, v);
        histories.extend(gs.symmetries(&base));
    }
    Ok(histories)
}

fn cmd_generate(
    games: usize,
    output: PathBuf,
    simulations: u32,
    seed: u64,
    temperature: f32,
    temperature_drop: u32,
    rollout_depth: usize,
) -> Result<()> {
    fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create output directory: {:?}", output))?;

    info!(games, simulations, seed, "generating self-play games");
    let start = Instant::now();

    let records: Vec<Vec<PlayHistory>> = (0..games)
        .into_par_iter()
        .map(|i| {
            let game_seed = seed.wrapping_add(i as u64 * 1000);
            let evaluator = RolloutEvaluator::new(
                ChaCha8Rng::seed_from_u64(game_seed.wrapping_add(1)),
                rollout_depth,
            );
            generate_game(&evaluator, simulations, game_seed, temperature, temperature_drop)
        })
        .collect::<Result<_>>()?;

    for (i, histories) in records.iter().enumerate() {
        let filename = output.join(format!("game_{:06}.msgpack", i));
        let file = File::create(&filename)
            .with_context(|| format!("Failed to create file: {:?}", filename))?;
        let mut writer = BufWriter::new(file);
        rmp_serde::encode::write_named(&mut writer, histories)
            .with_context(|| format!("Failed to serialize game {}", i))?;
    }

    let examples: usize = records.iter().map(Vec::len).sum();
    info!(
        games,
        examples,
        elapsed_s = start.elapsed().as_secs_f64(),
        "self-play complete"
    );
    Ok(())
}

/// Play one match game; returns the final score vector and which player
/// index the rollout side held.
fn play_match_game(
    simulations: u32,
    rollout_depth: usize,
    rollout_is_first: bool,
    seed: u64,
) -> Result<(Vec<f32>, usize)> {
    let gs_config = || SearchConfig::for_evaluation(2, Connect4::new().num_moves());
    let rollout_eval =
        RolloutEvaluator::new(ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)), rollout_depth);

    let mut gs = Connect4::new();
    let mut rollout_mcts = Mcts::new(gs_config(), ChaCha8Rng::seed_from_u64(seed));
    let mut uniform_mcts = Mcts::new(gs_config(), ChaCha8Rng::seed_from_u64(seed ^ 0x5eed));

    let rollout_player = if rollout_is_first { 0 } else { 1 };
    while gs.scores().is_none() {
        let action = if gs.current_player() == rollout_player {
            rollout_mcts.search(&gs, &rollout_eval, simulations)?;
            rollout_mcts.pick_move(0.0)?
        } else {
            uniform_mcts.search(&gs, &UniformEvaluator, simulations)?;
            uniform_mcts.pick_move(0.0)?
        };
        gs.play_move(action)?;
        rollout_mcts.advance_root(action)?;
        uniform_mcts.advance_root(action)?;
    }

    Ok((gs.scores().expect("terminal"), rollout_player))
}

fn cmd_evaluate(games: usize, simulations: u32, rollout_depth: usize, seed: u64) -> Result<()> {
    info!(games, simulations, "running evaluator match");

    let outcomes: Vec<f32> = (0..games)
        .into_par_iter()
        .map(|i| {
            let game_seed = seed.wrapping_add(i as u64 * 1000);
            let (scores, rollout_player) =
                play_match_game(simulations, rollout_depth, i % 2 == 0, game_seed)?;
            Ok(terminal_value(&scores, rollout_player, 2))
        })
        .collect::<Result<_>>()?;

    let wins = outcomes.iter().filter(|&&v| v > 0.5).count();
    let losses = outcomes.iter().filter(|&&v| v < -0.5).count();
    let draws = games - wins - losses;

    info!(
        wins,
        losses,
        draws,
        win_rate = wins as f32 / games as f32,
        "match complete (rollout evaluator perspective)"
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            games,
            output,
            simulations,
            seed,
            temperature,
            temperature_drop,
            rollout_depth,
        } => cmd_generate(
            games,
            output,
            simulations,
            seed,
            temperature,
            temperature_drop,
            rollout_depth,
        ),

        Commands::Evaluate {
            games,
            simulations,
            rollout_depth,
            seed,
        } => cmd_evaluate(games, simulations, rollout_depth, seed),
    }
}
