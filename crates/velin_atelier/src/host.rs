//! Collaborators supplied by the host bundler.
//!
//! The pipeline only ever reaches the outside world through these traits:
//! the asset being transformed, the compiler, the optional preprocessor and
//! the logger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use velin_relief::{RawSourceMap, SourceMap, SourceMapError};

use crate::config::{CompilerOptions, PreprocessStep};
use crate::diagnostic::{Diagnostic, RawDiagnostic};

/// Error raised while reading an asset.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// IO error.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The asset's existing source map could not be parsed.
    #[error("invalid source map for {path}: {source}")]
    SourceMap {
        path: PathBuf,
        #[source]
        source: SourceMapError,
    },
}

/// A file being transformed.
#[async_trait]
pub trait Asset: Send + Sync {
    /// Current source text.
    async fn code(&self) -> Result<String, AssetError>;

    /// Source map from an earlier transformation, if any.
    async fn map(&self) -> Result<Option<SourceMap>, AssetError>;

    /// Absolute path of the file.
    fn file_path(&self) -> &Path;

    /// Stable identifier, used to derive output unique keys.
    fn id(&self) -> &str;

    /// First line of this fragment within a larger original document.
    fn start_line(&self) -> Option<u32> {
        None
    }

    /// Rebuild this asset when `path` changes.
    fn invalidate_on_file_change(&self, path: &Path);
}

/// Generated text plus its source map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedModule {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<RawSourceMap>,
}

/// Result of compiling one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOutput {
    pub js: GeneratedModule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<GeneratedModule>,
    #[serde(default)]
    pub warnings: Vec<RawDiagnostic>,
}

/// Result of preprocessing one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessOutput {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<RawSourceMap>,
    /// Files read while preprocessing; changes to them invalidate the result.
    #[serde(default)]
    pub dependencies: Vec<PathBuf>,
}

/// The template compiler.
///
/// Returned maps go from the generated output to `code`, unless
/// [`Compiler::composes_input_map`] says otherwise.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(
        &self,
        code: &str,
        options: &CompilerOptions,
    ) -> Result<CompileOutput, RawDiagnostic>;

    /// Whether returned maps already run through `options.sourcemap` back to
    /// the text before preprocessing.
    fn composes_input_map(&self) -> bool {
        false
    }
}

/// The text-to-text stage run before compilation.
#[async_trait]
pub trait Preprocessor: Send + Sync {
    async fn preprocess(
        &self,
        code: &str,
        steps: &[PreprocessStep],
        options: &CompilerOptions,
    ) -> Result<PreprocessOutput, RawDiagnostic>;
}

/// Sink for non-fatal diagnostics. Must not block.
pub trait Logger: Send + Sync {
    fn warn(&self, diagnostic: Diagnostic);
}

/// [`Logger`] that forwards warnings to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn warn(&self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic.render_plain());
    }
}
