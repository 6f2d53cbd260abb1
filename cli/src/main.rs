use std::{io, path::PathBuf, process::exit};

use clap::{error::ErrorKind, Parser};
use rox::{Rox, RoxError};

/// Scans a Lox script, or each line typed at the prompt, and prints its tokens.
#[derive(Parser)]
#[command(name = "rox", version)]
struct Cli {
    /// Script to scan. Starts an interactive prompt when omitted.
    script: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(_) => {
            println!("Usage: rox [script]");
            exit(64);
        }
    };

    let mut rox = Rox::stdio();
    match cli.script {
        Some(script) => {
            if let Err(err) = rox.run_file(&script) {
                match err {
                    RoxError::Scan { .. } => exit(65),
                    RoxError::Io(err) => {
                        eprintln!("{}: {}", script.display(), err);
                        exit(74);
                    }
                }
            }
        }
        None => {
            if let Err(err) = rox.run_prompt(io::stdin().lock()) {
                eprintln!("{}", err);
                exit(74);
            }
        }
    }
}
