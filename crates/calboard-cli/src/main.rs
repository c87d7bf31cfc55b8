use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod heartbeat;
mod render;

#[derive(Parser)]
#[command(name = "calboard", version, about = "Calendar display supervisor")]
struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the periodic sync loop and heartbeat
    Run,
    /// Run a single sync cycle and print the result
    Once {
        /// Print the frame as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Exchange an assertion for an access token and show its lifetime
    Token,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run => commands::run::run(config).await,
        Commands::Once { json } => commands::once::run(config, json).await,
        Commands::Token => commands::token::run(config).await,
        Commands::Config { action } => commands::config::run(config, action),
        Commands::Completions { shell } => {
            commands::completions::run(shell, &mut Cli::command());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
