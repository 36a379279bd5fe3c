//! Project configuration resolution.
//!
//! Looks for `.svelterc`, `svelte.config.js` or a `svelte` key in
//! `package.json` (through a [`ConfigProvider`]) and merges the user's
//! compiler options over mode-derived defaults.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use velin_carton::hash::content_hash;
use velin_relief::RawSourceMap;

/// Config file names, in lookup order.
pub const CONFIG_CANDIDATES: &[&str] = &[".svelterc", "svelte.config.js"];

/// Key holding the configuration inside `package.json`.
pub const PACKAGE_KEY: &str = "svelte";

/// Extensions of config files that are evaluated as code.
const DYNAMIC_CONFIG_EXTENSIONS: &[&str] = &["js", "cjs", "mjs"];

/// Error type for configuration resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration value is not an object.
    #[error("{}: configuration must be an object", .file_path.display())]
    NotAnObject { file_path: PathBuf },

    /// Compiler options could not be merged.
    #[error("{}: invalid compiler options: {message}", .file_path.display())]
    InvalidCompilerOptions { file_path: PathBuf, message: String },

    /// IO error while reading a config file.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A static config file is not valid JSON.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A dynamic config file could not be evaluated.
    #[error("failed to evaluate {}: {message}", .path.display())]
    Evaluate { path: PathBuf, message: String },
}

/// Build mode of the bundler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    #[inline]
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Output module format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    #[default]
    Esm,
    Cjs,
}

/// Options passed to the compiler for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Project-relative file name used for attribution in compiler output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Development mode
    pub dev: bool,

    /// Whether CSS is extracted into its own output
    #[serde(rename = "css")]
    pub extract_css: bool,

    /// Module format
    pub format: ModuleFormat,

    /// Source map of the preprocessed code, when preprocessing produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<RawSourceMap>,

    /// Compiler-specific overrides passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompilerOptions {
    /// Defaults for a build mode.
    pub fn for_mode(mode: BuildMode) -> Self {
        Self {
            filename: None,
            dev: !mode.is_production(),
            extract_css: false,
            format: ModuleFormat::Esm,
            sourcemap: None,
            extra: Map::new(),
        }
    }

    /// Defaults for `mode`, overridden key by key by `user`.
    pub fn merged(mode: BuildMode, user: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut merged = match serde_json::to_value(Self::for_mode(mode))? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in user {
            merged.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(merged))
    }
}

/// One preprocessing step, opaque to this crate and interpreted by the
/// [`Preprocessor`](crate::host::Preprocessor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreprocessStep(pub Value);

/// Optional preprocessing preset, used when the project configures none.
pub trait PreprocessPreset: Send + Sync {
    fn name(&self) -> &str;

    fn default_step(&self) -> PreprocessStep;
}

/// Configuration found by a [`ConfigProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub contents: Value,
    pub file_path: PathBuf,
}

/// Source of project configuration.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Find the first of `candidates`, falling back to `package_key` in the
    /// package manifest.
    async fn get_config(
        &self,
        candidates: &[&str],
        package_key: Option<&str>,
    ) -> Result<Option<ConfigFile>, ConfigError>;

    /// Mark the resolved configuration as stale on every process start.
    fn invalidate_on_startup(&self);
}

/// Configuration snapshot handed to every file transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub compiler_options: CompilerOptions,
    pub preprocess: Option<Vec<PreprocessStep>>,
    pub file_path: Option<PathBuf>,
    /// False when the config must be re-evaluated on every run
    pub cacheable: bool,
    /// Hash of everything above; changes whenever the effective config does
    pub cache_key: String,
}

impl ResolvedConfig {
    fn new(
        compiler_options: CompilerOptions,
        preprocess: Option<Vec<PreprocessStep>>,
        file_path: Option<PathBuf>,
        cacheable: bool,
    ) -> Self {
        let fingerprint = serde_json::json!({
            "compilerOptions": compiler_options,
            "preprocess": preprocess,
            "filePath": file_path,
        });
        Self {
            cache_key: content_hash(&fingerprint.to_string()),
            compiler_options,
            preprocess,
            file_path,
            cacheable,
        }
    }
}

/// Check whether a config file is code rather than data.
pub fn is_dynamic_config(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| DYNAMIC_CONFIG_EXTENSIONS.contains(&ext))
}

/// Resolves project configuration once per build.
#[derive(Clone, Default)]
pub struct ConfigResolver {
    preset: Option<Arc<dyn PreprocessPreset>>,
}

impl ConfigResolver {
    pub fn new(preset: Option<Arc<dyn PreprocessPreset>>) -> Self {
        Self { preset }
    }

    pub async fn resolve(
        &self,
        provider: &dyn ConfigProvider,
        mode: BuildMode,
    ) -> Result<ResolvedConfig, ConfigError> {
        let found = provider
            .get_config(CONFIG_CANDIDATES, Some(PACKAGE_KEY))
            .await?;

        let (contents, file_path, cacheable) = match found {
            Some(ConfigFile {
                contents: Value::Object(contents),
                file_path,
            }) => {
                let dynamic = is_dynamic_config(&file_path);
                if dynamic {
                    provider.invalidate_on_startup();
                }
                (contents, Some(file_path), !dynamic)
            }
            Some(ConfigFile { file_path, .. }) => {
                return Err(ConfigError::NotAnObject { file_path });
            }
            None => (Map::new(), None, true),
        };

        let invalid = |message: String| ConfigError::InvalidCompilerOptions {
            file_path: file_path.clone().unwrap_or_default(),
            message,
        };

        let user_options = match non_null(&contents, "compilerOptions")
            .or_else(|| non_null(&contents, "compiler"))
        {
            None => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(invalid("compiler options must be an object".into())),
        };
        let compiler_options =
            CompilerOptions::merged(mode, &user_options).map_err(|e| invalid(e.to_string()))?;

        let preprocess = match contents.get("preprocess") {
            Some(Value::Null) => None,
            Some(Value::Array(steps)) => {
                Some(steps.iter().cloned().map(PreprocessStep).collect())
            }
            Some(step) => Some(vec![PreprocessStep(step.clone())]),
            None => self.preset.as_ref().map(|preset| {
                tracing::debug!(preset = preset.name(), "using default preprocess preset");
                vec![preset.default_step()]
            }),
        };

        tracing::debug!(
            config = ?file_path,
            cacheable,
            dev = compiler_options.dev,
            "resolved compiler configuration"
        );

        Ok(ResolvedConfig::new(
            compiler_options,
            preprocess,
            file_path,
            cacheable,
        ))
    }
}

fn non_null<'a>(contents: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    contents.get(key).filter(|v| !v.is_null())
}
