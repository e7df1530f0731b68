use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use peeler::dictionary::Dictionary;
use peeler::incremental;
use peeler::letters::LetterCounts;
use peeler::solver::{self, Budget, Strategy};
use peeler::swap;

/// Peeler — arrange letter tiles into a connected crossword grid
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Letters in hand, e.g. "AACEJNORT"
    letters: String,

    /// Path to the dictionary word list (one uppercase word per line)
    #[arg(
        short,
        long,
        default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/data/sowpods.txt")
    )]
    word_list: String,

    /// Node budget for the search
    #[arg(short = 'n', long, default_value_t = solver::DEFAULT_NODE_BUDGET)]
    max_nodes: u64,

    /// Letters to peel in one at a time after the initial solve, e.g. "SE"
    #[arg(short, long)]
    peel: Option<String>,

    /// Skip the swap analysis report
    #[arg(long)]
    no_swap: bool,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

/// Entry point of the Peeler CLI.
///
/// Delegates to [`try_main`], catching any errors and printing them
/// in a user-friendly way before exiting with code 1.
fn main() -> ExitCode {
    if let Err(e) = try_main() {
        // Print the error message to stderr
        eprintln!("Error: {e}");
        // Exit explicitly with a nonzero code so scripts can detect failure
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Core application logic for the Peeler CLI.
///
/// Steps:
/// 1. Parse CLI arguments with Clap.
/// 2. Load the word list from disk and build the dictionary.
/// 3. Solve the hand and print the grid on stdout.
/// 4. Optionally peel further letters in, one at a time.
/// 5. Print the swap analysis and performance metrics on stderr.
fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let cli = Cli::parse();
    peeler::log::init_logger(cli.debug);

    // 1. Build the dictionary from the word list
    let t_load = Instant::now();
    let dict = Dictionary::load_from_path(&cli.word_list)?;
    let load_secs = t_load.elapsed().as_secs_f64();

    let mut hand = LetterCounts::parse(&cli.letters)?;

    // 2. Solve the starting hand
    let t_solve = Instant::now();
    let mut result = solver::solve(&hand, &dict, Budget::nodes(cli.max_nodes))?;
    let solve_secs = t_solve.elapsed().as_secs_f64();

    println!("{}", result.grid);
    if !result.unplaced.is_empty() {
        eprintln!("Unplaced: {}", result.unplaced);
    }
    eprintln!(
        "Loaded {} words in {load_secs:.3}s; solved in {solve_secs:.3}s ({} nodes, {} words placed).",
        dict.word_count(),
        result.stats.nodes,
        result.grid.placed_words().len()
    );

    // 3. Peel letters in one at a time, reusing the grid
    if let Some(peels) = &cli.peel {
        for ch in peels.chars() {
            let mut delta = LetterCounts::new();
            let upper = ch.to_ascii_uppercase();
            delta.add(upper);
            if delta.is_empty() {
                return Err(Box::new(peeler::errors::SolverError::InvalidLetter {
                    invalid_char: ch,
                }));
            }

            result = incremental::peel(&result.grid, &hand, &delta, &dict, Budget::nodes(cli.max_nodes))?;
            hand.add(upper);

            println!("\n--- peel {upper} ({}) ---", result.stats.strategy);
            println!("{}", result.grid);
            if result.stats.strategy == Strategy::Failed {
                eprintln!("Could not place {upper}; unplaced: {}", result.unplaced);
            }
        }
    }

    // 4. Swap analysis for whatever is left over
    if !cli.no_swap {
        let recommendations = swap::swap_scores(&hand, &result.grid, &dict);
        if !recommendations.is_empty() {
            eprintln!("\nSwap analysis (higher = trade it away):");
            for rec in recommendations {
                eprintln!("  {}: {:.2}", rec.letter, rec.score);
            }
        }
    }

    Ok(())
}
