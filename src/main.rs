//! Wordcall - speak-the-word vocabulary rounds
//!
//! CLI entry point with global panic handler.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use wordcall::config::{crash_log_path, history_path, Config};
use wordcall::core::Vocabulary;
use wordcall::error::exit_codes;
use wordcall::history::RoundHistory;
use wordcall::progression::{ProgressionStore, UnlockKind};
use wordcall::storage::{FileSnapshotStore, MemorySnapshotStore};
use wordcall::telemetry;

// =============================================================================
// CLI Definition
// =============================================================================

/// Wordcall - say the word on screen, earn XP, unlock cosmetics
#[derive(Parser)]
#[command(name = "wordcall")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a round. Each input line is what you said; `:skip`, `:giveup`
    /// and `:quit` control the round
    Play {
        /// Category to draw words from
        category: String,
        /// Number of words in the round
        #[arg(long, short)]
        words: Option<usize>,
        /// Comma-separated turns to use instead of reading stdin
        #[arg(long)]
        say: Option<String>,
        /// Keep progression in memory and skip round history
        #[arg(long)]
        ephemeral: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show level, XP and unlocks
    Progress {
        /// Add bonus XP first (50 if no amount is given)
        #[arg(long, value_name = "XP", num_args = 0..=1, default_missing_value = "50")]
        grant: Option<u32>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Unlock a character or accessory
    Unlock {
        /// What to unlock (character, accessory)
        kind: UnlockKind,
        /// Id of the character or accessory
        id: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List accessories and their level gates
    Wardrobe {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List word categories
    Categories {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show recently played rounds
    History {
        /// Maximum number of rounds
        #[arg(long, short)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("wordcall error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.wordcall/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("wordcall panic: {}", info);

        if let Some(crash_log) = crash_log_path() {
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.verbose);

    let config = Config::load_sanitized();

    match cli.command {
        Commands::Play {
            category,
            words,
            say,
            ephemeral,
            json,
            quiet,
        } => run_play(&config, category, words, say, ephemeral, json, quiet),
        Commands::Progress { grant, json, quiet } => run_progress(grant, json, quiet),
        Commands::Unlock {
            kind,
            id,
            json,
            quiet,
        } => run_unlock(kind, &id, json, quiet),
        Commands::Wardrobe { json, quiet } => run_wardrobe(json, quiet),
        Commands::Categories { json, quiet } => run_categories(&config, json, quiet),
        Commands::History { limit, json, quiet } => run_history(limit, json, quiet),
    }
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

fn open_progression() -> Result<Arc<ProgressionStore>, Box<dyn std::error::Error>> {
    Ok(Arc::new(ProgressionStore::open(FileSnapshotStore::new()?)))
}

fn open_history() -> Result<RoundHistory, Box<dyn std::error::Error>> {
    let path = history_path().ok_or("could not determine the wordcall home directory")?;
    Ok(RoundHistory::new(path))
}

/// Split `--say` into one turn per comma.
fn scripted_turns(say: &str) -> Vec<String> {
    say.split(',').map(|turn| turn.trim().to_string()).collect()
}

fn run_play(
    config: &Config,
    category: String,
    words: Option<usize>,
    say: Option<String>,
    ephemeral: bool,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use wordcall::cli::play::{PlayCommand, PlayOptions};

    let vocabulary = Vocabulary::from_config(&config.vocabulary);
    let progression = if ephemeral {
        Arc::new(ProgressionStore::open(MemorySnapshotStore::new()))
    } else {
        open_progression()?
    };

    let mut cmd = PlayCommand::new(progression, vocabulary, config.round.clone());
    if !ephemeral {
        cmd = cmd.with_history(open_history()?);
    }

    let options = PlayOptions {
        json,
        quiet,
        category,
        words,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let mut prompt = io::stderr();
    let output = match say {
        Some(say) => runtime.block_on(cmd.run(&options, scripted_turns(&say), &mut prompt)),
        None => {
            let stdin = io::stdin();
            let lines = stdin.lock().lines().map_while(Result::ok);
            runtime.block_on(cmd.run(&options, lines, &mut prompt))
        }
    };

    let formatted = cmd.format_output(&output, &options);
    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_progress(
    grant: Option<u32>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use wordcall::cli::progress::{ProgressCommand, ProgressOptions};

    let cmd = ProgressCommand::new(open_progression()?);
    let options = ProgressOptions { json, quiet, grant };

    let output = cmd.run(&options);
    let formatted = cmd.format_output(&output, &options);
    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_unlock(
    kind: UnlockKind,
    id: &str,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use wordcall::cli::unlock::{UnlockCommand, UnlockOptions};

    let cmd = UnlockCommand::new(open_progression()?);
    let options = UnlockOptions { json, quiet };

    let output = cmd.run(kind, id);
    let formatted = cmd.format_output(&output, &options);
    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_wardrobe(json: bool, quiet: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use wordcall::cli::wardrobe::{WardrobeCommand, WardrobeOptions};

    let cmd = WardrobeCommand::new(open_progression()?);
    let options = WardrobeOptions { json, quiet };

    let output = cmd.run();
    let formatted = cmd.format_output(&output, &options);
    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_categories(
    config: &Config,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use wordcall::cli::categories::{CategoriesCommand, CategoriesOptions};

    let cmd = CategoriesCommand::new(Vocabulary::from_config(&config.vocabulary));
    let options = CategoriesOptions { json, quiet };

    let output = cmd.run();
    let formatted = cmd.format_output(&output, &options);
    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_history(
    limit: Option<usize>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use wordcall::cli::history::{HistoryCommand, HistoryOptions};

    let cmd = HistoryCommand::new(open_history()?);
    let options = HistoryOptions { json, quiet, limit };

    let output = cmd.run(&options);
    let formatted = cmd.format_output(&output, &options);
    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

// =============================================================================
// Tests
// =============================================================================
