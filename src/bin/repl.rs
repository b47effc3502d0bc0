//! Interactive prompt for layerkv
//!
//! Accepts every protocol command plus a few local helpers

use clap::Parser;
use layerkv::{logging, Dispatch, Dispatcher, SessionConfig, Store, TransactionalStore};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repl")]
#[command(about = "Interactive layerkv prompt", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    if cli.verbose {
        config.log_level = "debug".to_string();
    }
    logging::init_logging(&config.log_level)?;

    let mut dispatcher = Dispatcher::new(TransactionalStore::new());
    println!("layerkv interactive prompt. Type 'help' for available commands or 'quit' to exit.");

    loop {
        print!("{}", config.prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input {
            "quit" | "exit" => break,
            "help" => print_help(),
            "depth" => println!("{}", dispatcher.store().depth()),
            "dump" => {
                let snapshot = dispatcher.store().snapshot();
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            _ => match dispatcher.dispatch_line(input) {
                Dispatch::Executed { output, .. } => {
                    if let Some(output) = output {
                        println!("{}", output);
                    }
                }
                Dispatch::Ignored => {
                    println!(
                        "Unrecognized or incomplete command. Type 'help' for available commands."
                    );
                }
                Dispatch::End => break,
            },
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn print_help() {
    println!("Available commands:");
    println!("  SET <key> <value>    - Set a key-value pair");
    println!("  GET <key>            - Get value by key (NULL if missing)");
    println!("  UNSET <key>          - Delete a key");
    println!("  NUMEQUALTO <value>   - Count keys holding a value");
    println!("  BEGIN                - Open a (nested) transaction");
    println!("  ROLLBACK             - Discard the innermost transaction");
    println!("  COMMIT               - Commit every open transaction");
    println!("  END                  - Exit");
    println!("  depth                - Show the number of open transactions");
    println!("  dump                 - Show all visible keys as JSON");
    println!("  help                 - Show this help message");
    println!("  quit                 - Exit the prompt");
}
