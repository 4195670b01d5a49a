pub mod commands;
pub mod logging;
pub mod session;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::chat::ChatOptions;

#[derive(Debug, Parser)]
#[command(
    name = "tripdesk",
    about = "Tripdesk travel assistant",
    long_about = "Chat with the travel booking assistant in the terminal, or inspect its effective \
                  configuration.",
    after_help = "Examples:\n  tripdesk chat\n  tripdesk chat --offline --debug\n  tripdesk config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file to read instead of tripdesk.toml")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive booking conversation on stdin/stdout")]
    Chat {
        #[arg(long, help = "Print the turn report after every reply")]
        debug: bool,
        #[arg(long, help = "Use template replies only, without a language model")]
        offline: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { debug, offline } => {
            commands::chat::run(ChatOptions { config_path: cli.config, debug, offline })
        }
        Command::Config => commands::config::run(cli.config.as_deref()),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
