//! CLI subcommands.

pub mod config;
pub mod transform;

use clap::ValueEnum;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use velin_atelier::{BuildMode, ConfigResolver, PreprocessPreset};
use velin_passage::SveltePreprocessPreset;

/// Build mode as accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum Mode {
    /// Development build (compiler dev mode on)
    #[default]
    Development,
    /// Production build
    Production,
}

impl From<Mode> for BuildMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Development => BuildMode::Development,
            Mode::Production => BuildMode::Production,
        }
    }
}

/// Resolve `root` against the current directory.
pub(crate) fn project_root(root: &Path) -> PathBuf {
    if root.is_absolute() {
        return root.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(root))
        .unwrap_or_else(|_| root.to_path_buf())
}

/// Config resolver with `svelte-preprocess` as the default preset when the
/// project installs it.
pub(crate) fn config_resolver(root: &Path) -> ConfigResolver {
    let preset = SveltePreprocessPreset::detect(root)
        .map(|preset| Arc::new(preset) as Arc<dyn PreprocessPreset>);
    ConfigResolver::new(preset)
}

/// Create the tokio runtime for a command, exiting on failure.
pub(crate) fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    }
}
