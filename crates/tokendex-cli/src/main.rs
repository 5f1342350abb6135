//! Interactive REPL over the live token index.
//!
//! Usage:
//!   tokendex [PATHS]...          # index PATHS, then enter the prompt
//!   tokendex -r [PATHS]...       # same, descending into subdirectories
//!
//! Prompt commands:
//!   add [-r] <path>    register a path (existing or not)
//!   search <token>     print files containing the token, one per line
//!   help [cmd]         aliases: h, ?
//!   quit               alias: q; EOF also quits

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tokendex::{Indexer, Recursive};

#[derive(Parser)]
#[command(name = "tokendex", about = "Live token-to-file inverted index REPL")]
struct Cli {
    /// Paths to index before entering the prompt
    paths: Vec<PathBuf>,

    /// Descend into subdirectories of the given paths
    #[arg(short, long)]
    recursive: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let builder = tracing_subscriber::fmt().with_writer(io::stderr);
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        builder.with_env_filter(filter).init();
    } else {
        builder.with_env_filter(EnvFilter::new("warn")).init();
    }

    let mut indexer = Indexer::new()?;
    let recursive = if cli.recursive {
        Recursive::Yes
    } else {
        Recursive::No
    };
    for path in &cli.paths {
        indexer.add_path(path, recursive)?;
    }

    println!("Type \"help\" or \"?\" for help, \"quit\" to quit");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        print!(">>> ");
        io::stdout().flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break; // EOF
        }
        let (command, rest) = split_command(&line);
        if command.is_empty() {
            continue;
        }

        match resolve_alias(command) {
            "help" => print_help(rest),
            "quit" => break,
            "add" => run_add(&indexer, rest),
            "search" => {
                for path in indexer.search(rest) {
                    println!("{}", path.display());
                }
            }
            unknown => eprintln!("Unknown syntax: '{unknown}'"),
        }
    }

    indexer.close()?;
    Ok(())
}

/// Splits an input line into the command word and the remaining arguments.
fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim_end_matches(['\n', '\r']);
    match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim_start_matches(' ')),
        None => (line, ""),
    }
}

fn resolve_alias(command: &str) -> &str {
    match command {
        "h" | "?" => "help",
        "q" => "quit",
        other => other,
    }
}

fn run_add(indexer: &Indexer, args: &str) {
    let (recursive, path) = match args.strip_prefix("-r ") {
        Some(stripped) => (Recursive::Yes, stripped.trim_start_matches(' ')),
        None => (Recursive::No, args),
    };
    if path.is_empty() {
        eprintln!("add: missing path");
        return;
    }

    let start = Instant::now();
    match indexer.add_path(path, recursive) {
        Ok(()) => eprintln!("Took ~{} to index", format_duration(start.elapsed())),
        Err(error) => eprintln!("add: {error}"),
    }
}

fn print_help(topic: &str) {
    match resolve_alias(topic) {
        "add" => {
            println!("add [-r] <path>");
            println!("  Registers a file or directory for indexing. The path may not");
            println!("  exist yet; it is picked up when created. -r descends into");
            println!("  subdirectories.");
        }
        "search" => {
            println!("search <token>");
            println!("  Prints every indexed file containing the token, one per line.");
        }
        "quit" => println!("quit\n  Exits. EOF does too."),
        "help" => println!("help [cmd]\n  Prints help for a command."),
        "" => {
            println!("Commands:");
            println!("  add [-r] <path>    register a path for indexing");
            println!("  search <token>     list files containing the token");
            println!("  help [cmd]         this text (aliases: h, ?)");
            println!("  quit               exit (alias: q)");
        }
        unknown => eprintln!("help: no such command '{unknown}'"),
    }
}

/// Renders a duration in the largest unit that keeps the value above one,
/// rounding half up at each step.
fn format_duration(duration: Duration) -> String {
    const NAMES: [&str; 6] = ["ns", "µs", "ms", "s", "min", "hrs"];
    const SIZES: [u128; 5] = [1000, 1000, 1000, 60, 60];

    let mut units = duration.as_nanos();
    let mut i = 0;
    while i < SIZES.len() && units >= SIZES[i] {
        units = (units + SIZES[i] / 2) / SIZES[i];
        i += 1;
    }
    format!("{units} {}", NAMES[i])
}
