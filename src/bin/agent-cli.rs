use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use intercept_agent::config::{self, ConfigError};
use intercept_agent::loader::PluginArchive;

#[derive(Parser)]
#[command(name = "agent-cli")]
#[command(about = "Inspection CLI for the interception agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an agent configuration file
    Check {
        config: PathBuf,
    },
    /// List the plugins declared by a plugin archive
    Plugins {
        archive: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => match config::load_config(&config) {
            Ok(cfg) => {
                println!("{}: ok", config.display());
                println!("  transformer: {}", cfg.transformer.version);
                println!("  aspects:     {}", cfg.plugins.aspects.len());
                for aspect in &cfg.plugins.aspects {
                    println!("    {} -> {}", aspect.module, aspect.enhancer);
                }
                ExitCode::SUCCESS
            }
            Err(ConfigError::Validation(errors)) => {
                eprintln!("{}: {} problem(s)", config.display(), errors.len());
                for error in errors {
                    eprintln!("  - {error}");
                }
                ExitCode::FAILURE
            }
            Err(e) => {
                eprintln!("{}: {e}", config.display());
                ExitCode::FAILURE
            }
        },
        Commands::Plugins { archive } => match PluginArchive::open(&archive) {
            Ok(parsed) => {
                if parsed.plugins.is_empty() {
                    println!("{}: no plugins", archive.display());
                }
                for plugin in &parsed.plugins {
                    let version = plugin.version.as_deref().unwrap_or("-");
                    println!("{} {}", plugin.name, version);
                    for (key, value) in &plugin.settings {
                        println!("    {key} = {value}");
                    }
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        },
    }
}
