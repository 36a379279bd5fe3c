//! Config command - Print the resolved project configuration

use clap::Args;
use std::path::PathBuf;
use velin::FsConfigProvider;
use velin_passage::{NodeBridge, ScriptConfigEvaluator};

use super::{config_resolver, project_root, runtime, Mode};

#[derive(Args)]
pub struct ConfigArgs {
    /// Project root (default: current directory)
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Build mode
    #[arg(short, long, value_enum, default_value = "development")]
    pub mode: Mode,
}

pub fn run(args: ConfigArgs) {
    let root = project_root(&args.root);

    // Static configs still resolve without Node.js
    let evaluator = match NodeBridge::locate(&root) {
        Ok(bridge) => Some(ScriptConfigEvaluator::new(bridge)),
        Err(e) => {
            tracing::debug!("{}", e);
            None
        }
    };
    let provider = FsConfigProvider::new(&root, evaluator);

    let resolved = runtime().block_on(config_resolver(&root).resolve(&provider, args.mode.into()));
    match resolved {
        Ok(config) => match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize configuration: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
