use anyhow::{ensure, Context, Result};
use crossterm::style::{style, Stylize};
use rand::{rngs::StdRng, SeedableRng};
use rush_solver::{Board, Solver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use std::{env, thread};

const DEFAULT_WIDTH: usize = 6;
const DEFAULT_HEIGHT: usize = 6;
const DEFAULT_PIECES: usize = 12;
const DEFAULT_WALLS: usize = 0;
const MAX_SIDE: usize = 32;
const SCRAMBLE_MOVES: usize = 200;
const TIME_LIMIT: Duration = Duration::from_secs(30);

/// Positional arguments: `[width] [height] [pieces] [walls] [seed]`.
struct Config {
    width: usize,
    height: usize,
    pieces: usize,
    walls: usize,
    seed: Option<u64>,
}

impl Config {
    fn from_args() -> Result<Self> {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::parse(&args)
    }

    fn parse(args: &[String]) -> Result<Self> {
        let arg = |index: usize, name: &str, default: usize| -> Result<usize> {
            match args.get(index) {
                Some(value) => value
                    .parse()
                    .with_context(|| format!("invalid {}: {}", name, value)),
                None => Ok(default),
            }
        };

        let width = arg(0, "width", DEFAULT_WIDTH)?;
        let height = arg(1, "height", DEFAULT_HEIGHT)?;
        ensure!(
            (1..=MAX_SIDE).contains(&width) && (1..=MAX_SIDE).contains(&height),
            "board sides must be between 1 and {}, got {}x{}",
            MAX_SIDE,
            width,
            height
        );

        Ok(Self {
            width,
            height,
            pieces: arg(2, "pieces", DEFAULT_PIECES)?,
            walls: arg(3, "walls", DEFAULT_WALLS)?,
            seed: args
                .get(4)
                .map(|value| value.parse::<u64>())
                .transpose()
                .with_context(|| format!("invalid seed: {}", args[4]))?,
        })
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let config = Config::from_args()?;

    let seed = config.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut board = Board::random(
        &mut rng,
        config.width,
        config.height,
        config.pieces,
        config.walls,
    );
    board
        .validate()
        .context("cannot generate a board with these dimensions")?;
    board.scramble(&mut rng, SCRAMBLE_MOVES);

    println!(
        "Board {}x{} with {} pieces, {} walls (seed {})",
        board.width(),
        board.height(),
        board.pieces().len(),
        board.walls().len(),
        seed
    );

    let stop = Arc::new(AtomicBool::new(false));
    let timer = Arc::clone(&stop);
    thread::spawn(move || {
        thread::sleep(TIME_LIMIT);
        timer.store(true, Ordering::Relaxed);
    });

    let solution = Solver::new(&mut board).with_stop_flag(stop).solve();
    if solution.solvable() {
        println!("{}", style(&solution).green());
        for (i, mv) in solution.moves.iter().enumerate() {
            println!("{:3}. {}", i + 1, mv);
        }
    } else {
        println!("{}", style(&solution).red());
    }

    Ok(())
}
