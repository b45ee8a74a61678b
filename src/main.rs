//! Patchbay CLI
//!
//! Command-line interface for managing banks, patches and the current
//! selection stored in a data directory.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

use patchbay::cli::{commands, Cli, Commands};
use patchbay::{Config, Direction};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Patchbay v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Some(cmd) => handle_command(&config, cmd)
            .with_context(|| format!("in data directory {}", config.data_dir.display())),
        None => {
            println!("Patchbay v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(config: &Config, cmd: Commands) -> patchbay::Result<()> {
    match cmd {
        Commands::List => commands::list(config),
        Commands::CreateBank { name, patch } => {
            commands::create_bank(config, &name, patch.as_deref())
        }
        Commands::RenameBank { bank, name } => commands::rename_bank(config, bank, &name),
        Commands::DeleteBank { bank } => commands::delete_bank(config, bank),
        Commands::CreatePatch { bank, name } => commands::create_patch(config, bank, &name),
        Commands::DeletePatch { bank, patch } => commands::delete_patch(config, bank, patch),
        Commands::Select { bank, patch } => commands::select(config, bank, patch),
        Commands::NextPatch => commands::step_patch(config, Direction::Next),
        Commands::PrevPatch => commands::step_patch(config, Direction::Previous),
        Commands::NextBank => commands::step_bank(config, Direction::Next),
        Commands::PrevBank => commands::step_bank(config, Direction::Previous),
        Commands::Prune => commands::prune(config),
    }
}
