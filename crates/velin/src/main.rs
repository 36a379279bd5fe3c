//! # velin
//!
//! Velin - Svelte components for Rust-driven build pipelines.
//!
//! ## Name Origin
//!
//! **Velin** is the fine parchment scribes prepared before writing on it.
//! This binary prepares Svelte components the same way: it resolves the
//! project's configuration, runs preprocessing and compilation through the
//! project's own toolchain, and writes JavaScript, CSS and source maps that
//! point back to the files you wrote.

mod commands;
mod report;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV_VAR: &str = "VELIN_LOG";

#[derive(Parser)]
#[command(name = "velin")]
#[command(about = "Svelte components for Rust-driven build pipelines", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile Svelte components into JavaScript and CSS
    Transform(commands::transform::TransformArgs),

    /// Print the resolved project configuration
    Config(commands::config::ConfigArgs),
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Commands::Transform(args) => commands::transform::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
