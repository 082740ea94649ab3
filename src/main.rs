use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use std::cmp::Ordering;
use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use connect4_solver::{
    bitboard::BitBoard,
    opening_book::{OpeningBook, BOOK_DEPTH, DEFAULT_BOOK_PATH},
    solver::{best_column, Solver},
    transposition_table::{TranspositionTable, DEFAULT_LOG_SIZE, MAX_LOG_SIZE, MIN_LOG_SIZE},
    WIDTH,
};

mod console;

#[derive(Parser, Debug)]
#[command(author, version, about = "Exact solver for Connect 4 positions", long_about = None)]
struct Args {
    /// log2 of the transposition table size, rounded up to a prime.
    /// Smaller tables would let truncated keys collide
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_LOG_SIZE,
        value_parser = clap::value_parser!(u32)
            .range(MIN_LOG_SIZE as i64..=MAX_LOG_SIZE as i64)
    )]
    table_bits: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print `score nodes microseconds` for a position
    Solve {
        /// Moves played so far as 1-indexed columns, e.g. "4453"
        moves: Option<String>,
        /// Only find whether the position is won, drawn or lost
        #[arg(long)]
        weak: bool,
    },
    /// Print the best column and the score of every column
    Best {
        moves: Option<String>,
        #[arg(long, default_value = DEFAULT_BOOK_PATH)]
        book: PathBuf,
    },
    /// Solve every `moves score` line of a test file and check the scores
    Bench {
        file: PathBuf,
        #[arg(long)]
        weak: bool,
    },
    /// Play a game in the console
    Play {
        #[arg(long, value_enum, default_value_t = Controller::Human)]
        first: Controller,
        #[arg(long, value_enum, default_value_t = Controller::Ai)]
        second: Controller,
        #[arg(long, default_value = DEFAULT_BOOK_PATH)]
        book: PathBuf,
    },
    /// Generate an opening book
    BuildBook {
        /// Number of plies from the empty board to cover
        #[arg(long, default_value_t = BOOK_DEPTH)]
        depth: usize,
        #[arg(long, default_value = DEFAULT_BOOK_PATH)]
        output: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Controller {
    Human,
    Ai,
}

fn new_solver(table_bits: u32, book: Option<&Path>) -> Result<Solver> {
    let table = TranspositionTable::with_log_size(table_bits)?;
    let mut solver = Solver::with_transposition_table(table);
    if let Some(path) = book {
        if let Some(book) = OpeningBook::open(path)
            .with_context(|| format!("failed to load opening book {}", path.display()))?
        {
            solver = solver.with_opening_book(book);
        }
    }
    Ok(solver)
}

fn solve(table_bits: u32, moves: &str, weak: bool) -> Result<()> {
    let board = BitBoard::from_moves(moves)?;
    let mut solver = new_solver(table_bits, None)?;

    let start = Instant::now();
    let score = solver.solve(&board, weak);
    let elapsed = start.elapsed();

    println!("{} {} {}", score, solver.node_count(), elapsed.as_micros());
    Ok(())
}

fn best(table_bits: u32, moves: &str, book: &Path) -> Result<()> {
    let board = BitBoard::from_moves(moves)?;
    let mut solver = new_solver(table_bits, Some(book))?;

    if let Some(column) = solver.book_move(&board) {
        println!("Best move: {} (opening book)", column + 1);
        return Ok(());
    }

    let scores = solver.analyze(&board);
    let (column, score) = best_column(&scores).ok_or_else(|| anyhow!("the board is full"))?;
    let scores: Vec<String> = scores
        .iter()
        .map(|score| score.map_or_else(|| "-".to_string(), |s| s.to_string()))
        .collect();

    println!("Scores: {}", scores.join(" "));
    println!("Best move: {} (score {})", column + 1, score);
    Ok(())
}

fn bench(table_bits: u32, path: &Path, weak: bool) -> Result<()> {
    let file = BufReader::new(
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
    );
    let mut solver = new_solver(table_bits, None)?;

    let mut positions = 0;
    let mut total_nodes = 0;
    let mut total_time = Duration::default();

    for (line_num, line) in file.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut test_data = line.split_whitespace();
        let (moves, expected) = match (test_data.next(), test_data.next(), test_data.next()) {
            (Some(moves), Some(score), None) => (moves, score.parse::<i32>()?),
            _ => bail!("malformed line {}: '{}'", line_num + 1, line),
        };
        let expected = if weak { expected.signum() } else { expected };

        let board = BitBoard::from_moves(moves)
            .with_context(|| format!("invalid position on line {}", line_num + 1))?;
        let nodes_before = solver.node_count();
        let start = Instant::now();
        let score = solver.solve(&board, weak);
        total_time += start.elapsed();

        if score != expected {
            bail!(
                "line {}: position '{}' expected {}, got {}",
                line_num + 1,
                moves,
                expected,
                score
            );
        }
        total_nodes += solver.node_count() - nodes_before;
        positions += 1;
    }

    println!("{} {} {}", positions, total_nodes, total_time.as_micros());
    Ok(())
}

fn read_human_move(board: &BitBoard) -> Result<usize> {
    loop {
        print!("Move input (1-{}) > ", WIDTH);
        stdout().flush()?;
        let mut input_str = String::new();
        if stdin().read_line(&mut input_str)? == 0 {
            bail!("standard input closed");
        }

        match input_str.trim().parse::<usize>() {
            Ok(column @ 1..=WIDTH) if board.can_play(column - 1) => return Ok(column - 1),
            Ok(column @ 1..=WIDTH) => println!("Invalid move, column {} full", column),
            _ => println!(
                "Invalid move: '{}'. Columns must be between 1 and {}",
                input_str.trim(),
                WIDTH
            ),
        }
    }
}

fn ai_move(solver: &mut Solver, board: &BitBoard) -> Result<usize> {
    println!("AI is thinking...");
    stdout().flush()?;

    if let Some(column) = solver.book_move(board) {
        println!("Best move: {} (opening book)", column + 1);
        return Ok(column);
    }

    let (best_move, score) =
        best_column(&solver.analyze(board)).ok_or_else(|| anyhow!("no playable column"))?;

    let player = board.current_player();
    let win_distance = Solver::score_to_win_distance(board, score);
    let move_string = if win_distance == 1 { "move" } else { "moves" };
    match score.cmp(&0) {
        Ordering::Greater => println!(
            "Player {} can force a win in at most {} {}.",
            player.number(),
            win_distance,
            move_string
        ),
        Ordering::Less => println!(
            "Player {} can force a win in at most {} {}.",
            player.other().number(),
            win_distance,
            move_string
        ),
        Ordering::Equal => println!(
            "Player {} can at best force a draw, {} {} remaining",
            player.number(),
            win_distance,
            move_string
        ),
    }
    println!("Best move: {}", best_move + 1);
    Ok(best_move)
}

fn play(table_bits: u32, controllers: [Controller; 2], book: &Path) -> Result<()> {
    let mut solver = new_solver(table_bits, Some(book))?;
    if solver.opening_book().is_none() {
        println!("Opening book not found, expect early AI moves to take a long time");
    }

    println!("Welcome to Connect 4");
    let mut board = BitBoard::new();

    loop {
        console::draw_board(&board)?;
        if board.is_draw() {
            println!("Draw!");
            return Ok(());
        }

        let player = board.current_player();
        let column = match controllers[player.number() - 1] {
            Controller::Ai => ai_move(&mut solver, &board)?,
            Controller::Human => read_human_move(&board)?,
        };

        let winning = board.is_winning_move(column);
        board.play(column);
        if winning {
            console::draw_board(&board)?;
            println!("Player {} wins!", player.number());
            return Ok(());
        }
    }
}

fn build_book(table_bits: u32, depth: usize, output: &Path) -> Result<()> {
    info!("building an opening book {} plies deep", depth);
    let book = OpeningBook::generate(&BitBoard::new(), depth, table_bits, true)?;
    book.save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "Wrote {} opening book entries to {}",
        book.len(),
        output.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Solve { moves, weak } => {
            solve(args.table_bits, moves.as_deref().unwrap_or(""), weak)
        }
        Command::Best { moves, book } => {
            best(args.table_bits, moves.as_deref().unwrap_or(""), &book)
        }
        Command::Bench { file, weak } => bench(args.table_bits, &file, weak),
        Command::Play {
            first,
            second,
            book,
        } => play(args.table_bits, [first, second], &book),
        Command::BuildBook { depth, output } => build_book(args.table_bits, depth, &output),
    }
}
