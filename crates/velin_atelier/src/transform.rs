//! Transform pipeline: preprocess, compile, compose source maps.
//!
//! One [`TransformPipeline::transform`] call handles exactly one asset and
//! shares nothing with other calls, so callers may run any number of them
//! concurrently.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use velin_carton::path::{classify_file_origin, relative_url};
use velin_relief::{RawSourceMap, SourceMap, SourceMapError};

use crate::config::{CompilerOptions, ResolvedConfig};
use crate::diagnostic::{Diagnostic, ThrowableDiagnostic};
use crate::host::{Asset, AssetError, CompileOutput, Compiler, GeneratedModule, Logger, Preprocessor};
use crate::normalize::{DiagnosticNormalizer, LocationRemapper};

/// Warning code that only matters when CSS is extracted.
pub const UNUSED_SELECTOR_WARNING: &str = "css-unused-selector";

/// Kind of generated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Code,
    Stylesheet,
}

impl OutputKind {
    /// File extension of this kind of output.
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Code => "js",
            OutputKind::Stylesheet => "css",
        }
    }
}

/// One generated output handed back to the bundler.
#[derive(Debug, Clone)]
pub struct OutputUnit {
    pub kind: OutputKind,
    pub content: String,
    pub unique_key: String,
    pub map: Option<SourceMap>,
}

/// Per-build context shared by every transform.
#[derive(Debug, Clone)]
pub struct TransformContext {
    pub project_root: PathBuf,
}

impl TransformContext {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }
}

/// Failure of a single file's transform.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("{0}")]
    Preprocess(ThrowableDiagnostic),

    #[error("{0}")]
    Compile(ThrowableDiagnostic),

    /// Preprocess steps are configured but no preprocessor is available.
    #[error("preprocess steps are configured but no preprocessor is available")]
    MissingPreprocessor,

    #[error("invalid source map: {0}")]
    SourceMap(#[from] SourceMapError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}

impl TransformError {
    /// The structured diagnostic, for failures reported by a stage.
    pub fn diagnostic(&self) -> Option<&ThrowableDiagnostic> {
        match self {
            TransformError::Preprocess(d) | TransformError::Compile(d) => Some(d),
            _ => None,
        }
    }
}

/// Runs the preprocess and compile stages for one asset at a time.
#[derive(Clone)]
pub struct TransformPipeline {
    compiler: Arc<dyn Compiler>,
    preprocessor: Option<Arc<dyn Preprocessor>>,
}

impl TransformPipeline {
    pub fn new(compiler: Arc<dyn Compiler>, preprocessor: Option<Arc<dyn Preprocessor>>) -> Self {
        Self {
            compiler,
            preprocessor,
        }
    }

    /// Transform one asset into its code output and, when the compiler
    /// produced CSS, a stylesheet output.
    pub async fn transform(
        &self,
        asset: &dyn Asset,
        config: &ResolvedConfig,
        ctx: &TransformContext,
        logger: &dyn Logger,
    ) -> Result<Vec<OutputUnit>, TransformError> {
        let file_path = asset.file_path();
        let relative = relative_url(&ctx.project_root, file_path);
        let external = classify_file_origin(&relative).is_external();

        let original_code = asset.code().await?;
        let original_map = asset.map().await?;
        let remapper = LocationRemapper::new(file_path, asset.start_line(), original_map.as_ref());

        let mut options: CompilerOptions = config.compiler_options.clone();
        options.filename.get_or_insert_with(|| relative.clone());

        let mut code = original_code;
        let mut preprocess_map = None;

        if let Some(steps) = config.preprocess.as_deref().filter(|s| !s.is_empty()) {
            let preprocessor = self
                .preprocessor
                .as_ref()
                .ok_or(TransformError::MissingPreprocessor)?;

            tracing::debug!("preprocessing {} ({} steps)", relative, steps.len());
            let output = match preprocessor.preprocess(&code, steps, &options).await {
                Ok(output) => output,
                Err(raw) => {
                    let normalizer = DiagnosticNormalizer::new(remapper, file_path, &code);
                    return Err(TransformError::Preprocess(normalizer.convert_error(&raw)));
                }
            };

            if let Some(raw_map) = output.map {
                preprocess_map = Some(SourceMap::from_raw(&ctx.project_root, &raw_map)?);
                options.sourcemap = Some(raw_map);
            }
            for dependency in &output.dependencies {
                asset.invalidate_on_file_change(dependency);
            }
            code = output.code;
        }

        tracing::debug!("compiling {}", relative);
        let compiled: CompileOutput = match self.compiler.compile(&code, &options).await {
            Ok(output) => output,
            Err(raw) => {
                let normalizer = DiagnosticNormalizer::new(remapper, file_path, &code);
                return Err(TransformError::Compile(normalizer.convert_error(&raw)));
            }
        };

        let normalizer = DiagnosticNormalizer::new(remapper, file_path, &code);
        for warning in &compiled.warnings {
            if !options.extract_css && warning.has_code(UNUSED_SELECTOR_WARNING) {
                continue;
            }
            if external {
                continue;
            }
            logger.warn(normalizer.convert_diagnostic(warning));
        }

        let maps = MapChain {
            project_root: &ctx.project_root,
            preprocess: preprocess_map
                .as_ref()
                .filter(|_| !self.compiler.composes_input_map()),
            original: original_map.as_ref(),
        };

        let mut units = vec![OutputUnit {
            kind: OutputKind::Code,
            unique_key: format!("{}-js", asset.id()),
            map: maps.compose(compiled.js.map.as_ref())?,
            content: compiled.js.code,
        }];

        if let Some(GeneratedModule { code: css, map }) = compiled.css {
            if !css.is_empty() {
                units.push(OutputUnit {
                    kind: OutputKind::Stylesheet,
                    unique_key: format!("{}-css", asset.id()),
                    map: maps.compose(map.as_ref())?,
                    content: css,
                });
            }
        }

        tracing::debug!("transformed {} into {} outputs", relative, units.len());
        Ok(units)
    }
}

/// Upstream maps a compiler map is composed with, most downstream first.
struct MapChain<'a> {
    project_root: &'a Path,
    preprocess: Option<&'a SourceMap>,
    original: Option<&'a SourceMap>,
}

impl MapChain<'_> {
    fn compose(&self, compiled: Option<&RawSourceMap>) -> Result<Option<SourceMap>, SourceMapError> {
        let Some(raw) = compiled else {
            return Ok(self.original.cloned());
        };

        let mut map = SourceMap::from_raw(self.project_root, raw)?;
        if let Some(preprocess) = self.preprocess {
            map.extends(preprocess);
        }
        if let Some(original) = self.original {
            map.extends(original);
        }
        Ok(Some(map))
    }
}

/// Collects warnings in memory. Handy for hosts that report in batches.
#[derive(Debug, Default)]
pub struct CollectingLogger {
    warnings: std::sync::Mutex<Vec<Diagnostic>>,
}

impl CollectingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain collected warnings.
    pub fn take(&self) -> Vec<Diagnostic> {
        match self.warnings.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Logger for CollectingLogger {
    fn warn(&self, diagnostic: Diagnostic) {
        match self.warnings.lock() {
            Ok(mut guard) => guard.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}
