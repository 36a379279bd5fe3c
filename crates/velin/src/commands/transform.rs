//! Transform command - Compile Svelte components

use ariadne::ReportKind;
use clap::Args;
use ignore::Walk;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

use velin::{FsAsset, FsConfigProvider};
use velin_atelier::{
    CollectingLogger, Diagnostic, Logger, OutputKind, OutputUnit, Preprocessor, ResolvedConfig,
    TracingLogger, TransformContext, TransformError, TransformPipeline,
};
use velin_carton::path::relative_url;
use velin_passage::{NodeBridge, ScriptConfigEvaluator};

use super::{config_resolver, project_root, runtime, Mode};
use crate::report;

/// Extension of the files picked up from directories.
const COMPONENT_EXTENSION: &str = "svelte";

#[derive(Args)]
pub struct TransformArgs {
    /// Files or directories to transform (default: ./src)
    #[arg(default_value = "src")]
    pub patterns: Vec<PathBuf>,

    /// Project root (default: current directory)
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Build mode
    #[arg(short, long, value_enum, default_value = "development")]
    pub mode: Mode,

    /// Output directory (default: ./dist)
    #[arg(short, long, default_value = "dist")]
    pub out_dir: PathBuf,

    /// Print a JSON report on stdout instead of rendering diagnostics
    #[arg(long)]
    pub json: bool,
}

/// Outcome of one file, as printed with `--json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileReport {
    file: String,
    outputs: Vec<OutputReport>,
    warnings: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputReport {
    #[serde(rename = "type")]
    kind: OutputKind,
    unique_key: String,
    path: PathBuf,
}

pub fn run(args: TransformArgs) {
    let code = runtime().block_on(execute(args));
    if code != 0 {
        std::process::exit(code);
    }
}

async fn execute(args: TransformArgs) -> i32 {
    let start = Instant::now();
    let root = project_root(&args.root);

    let bridge = match NodeBridge::locate(&root) {
        Ok(bridge) => bridge,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let provider = FsConfigProvider::new(&root, Some(ScriptConfigEvaluator::new(bridge.clone())));
    let config = match config_resolver(&root)
        .resolve(&provider, args.mode.into())
        .await
    {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let files = collect_files(&root, &args.patterns);
    if files.is_empty() {
        eprintln!("No .{} files found matching the patterns", COMPONENT_EXTENSION);
        return 1;
    }

    let bridge = Arc::new(bridge);
    let pipeline = Arc::new(TransformPipeline::new(
        bridge.clone(),
        Some(bridge as Arc<dyn Preprocessor>),
    ));
    let ctx = Arc::new(TransformContext::new(&root));

    let mut tasks = JoinSet::new();
    for path in files {
        let pipeline = Arc::clone(&pipeline);
        let config: Arc<ResolvedConfig> = Arc::clone(&config);
        let ctx = Arc::clone(&ctx);
        let json = args.json;
        tasks.spawn(async move {
            let asset = FsAsset::new(&ctx.project_root, &path);
            let collector = CollectingLogger::new();
            let logger: &dyn Logger = if json { &collector } else { &TracingLogger };
            let result = pipeline.transform(&asset, &config, &ctx, logger).await;
            (path, result, collector.take())
        });
    }

    let mut reports = Vec::new();
    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (path, result, warnings) = match joined {
            Ok(done) => done,
            Err(e) => {
                eprintln!("Transform task failed: {}", e);
                failed += 1;
                continue;
            }
        };

        let relative = relative_url(&root, &path);
        let mut report = FileReport {
            file: relative.clone(),
            outputs: Vec::new(),
            warnings,
            error: None,
        };

        match result {
            Ok(units) => {
                for unit in &units {
                    match write_unit(&args.out_dir, &relative, unit) {
                        Ok(out_path) => report.outputs.push(OutputReport {
                            kind: unit.kind,
                            unique_key: unit.unique_key.clone(),
                            path: out_path,
                        }),
                        Err(e) => {
                            eprintln!("Failed to write output for {}: {}", relative, e);
                            failed += 1;
                        }
                    }
                }
            }
            Err(err) => {
                failed += 1;
                report.error = Some(error_json(&err));
                if !args.json {
                    print_error(&relative, &err);
                }
            }
        }
        reports.push(report);
    }

    if args.json {
        reports.sort_by(|a, b| a.file.cmp(&b.file));
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize report: {}", e),
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    let success = reports.iter().filter(|r| r.error.is_none()).count();
    if failed > 0 {
        eprintln!(
            "✗ {} file(s) failed, {} transformed in {:.4}s",
            failed, success, elapsed
        );
        1
    } else {
        let file_word = if success == 1 { "file" } else { "files" };
        eprintln!("✓ {} {} transformed in {:.4}s", success, file_word, elapsed);
        0
    }
}

fn print_error(relative: &str, err: &TransformError) {
    match err.diagnostic() {
        Some(throwable) => report::print(ReportKind::Error, throwable.diagnostic()),
        None => eprintln!("Error transforming {}: {}", relative, err),
    }
}

fn error_json(err: &TransformError) -> serde_json::Value {
    match err.diagnostic() {
        Some(throwable) => throwable.to_json_value(),
        None => serde_json::json!({ "diagnostic": { "message": err.to_string() } }),
    }
}

/// Collect component files. Directories are walked honoring `.gitignore`;
/// files are taken as given.
fn collect_files(root: &Path, patterns: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for pattern in patterns {
        let path = if pattern.is_absolute() {
            pattern.clone()
        } else {
            root.join(pattern)
        };

        if path.is_file() {
            files.push(path);
            continue;
        }

        for entry in Walk::new(&path).flatten() {
            let entry_path = entry.path();
            if entry_path.is_file()
                && entry_path
                    .extension()
                    .is_some_and(|ext| ext == COMPONENT_EXTENSION)
            {
                files.push(entry_path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    files
}

/// Output path of a unit: the source's project-relative path under
/// `out_dir`, with the unit's extension.
fn output_path(out_dir: &Path, relative: &str, kind: OutputKind) -> PathBuf {
    out_dir
        .join(relative.trim_start_matches('/'))
        .with_extension(kind.extension())
}

fn write_unit(out_dir: &Path, relative: &str, unit: &OutputUnit) -> std::io::Result<PathBuf> {
    let out_path = output_path(out_dir, relative, unit.kind);
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut content = unit.content.clone();
    if let Some(map) = &unit.map {
        let mut map_name = out_path.file_name().unwrap_or_default().to_os_string();
        map_name.push(".map");
        let map_path = out_path.with_file_name(&map_name);
        let json = map
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&map_path, json)?;

        let map_name = map_name.to_string_lossy();
        content.push_str(&match unit.kind {
            OutputKind::Code => format!("\n//# sourceMappingURL={}\n", map_name),
            OutputKind::Stylesheet => format!("\n/*# sourceMappingURL={} */\n", map_name),
        });
    }

    std::fs::write(&out_path, content)?;
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use velin_relief::{RawSourceMap, SourceMap};

    #[test]
    fn test_output_path_keeps_layout() {
        let out = output_path(Path::new("dist"), "src/lib/Button.svelte", OutputKind::Code);
        assert_eq!(out, PathBuf::from("dist/src/lib/Button.js"));

        let css = output_path(Path::new("dist"), "src/lib/Button.svelte", OutputKind::Stylesheet);
        assert_eq!(css, PathBuf::from("dist/src/lib/Button.css"));
    }

    #[test]
    fn test_collect_files_filters_components() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        std::fs::write(dir.path().join("src/App.svelte"), "").unwrap();
        std::fs::write(dir.path().join("src/nested/Card.svelte"), "").unwrap();
        std::fs::write(dir.path().join("src/main.js"), "").unwrap();

        let files = collect_files(dir.path(), &[PathBuf::from("src")]);
        assert_eq!(
            files,
            vec![
                dir.path().join("src/App.svelte"),
                dir.path().join("src/nested/Card.svelte"),
            ]
        );
    }

    #[test]
    fn test_write_unit_with_map() {
        let dir = tempfile::tempdir().unwrap();
        let map = SourceMap::from_raw(
            "/app",
            &RawSourceMap::new(vec!["src/App.svelte".into()], "AAAA"),
        )
        .unwrap();
        let unit = OutputUnit {
            kind: OutputKind::Code,
            content: "export default 1;".into(),
            unique_key: "abc-js".into(),
            map: Some(map),
        };

        let out = write_unit(dir.path(), "src/App.svelte", &unit).unwrap();
        assert_eq!(out, dir.path().join("src/App.js"));

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.ends_with("//# sourceMappingURL=App.js.map\n"));

        let map_json = std::fs::read_to_string(dir.path().join("src/App.js.map")).unwrap();
        let raw = RawSourceMap::from_json(&map_json).unwrap();
        assert_eq!(raw.sources, vec!["src/App.svelte".to_string()]);
    }
}
