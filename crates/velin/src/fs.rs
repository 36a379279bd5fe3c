//! Filesystem-backed assets and configuration.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use velin_atelier::config::is_dynamic_config;
use velin_atelier::{Asset, AssetError, ConfigError, ConfigFile, ConfigProvider};
use velin_carton::hash::asset_id;
use velin_carton::path::relative_url;
use velin_passage::ScriptConfigEvaluator;
use velin_relief::{RawSourceMap, SourceMap};

/// Package manifest searched for the package key.
pub const PACKAGE_MANIFEST: &str = "package.json";

/// Looks for configuration files in the project root.
///
/// Static files are parsed as JSON. Dynamic files need a
/// [`ScriptConfigEvaluator`]; without one they fail to load.
#[derive(Debug)]
pub struct FsConfigProvider {
    root: PathBuf,
    evaluator: Option<ScriptConfigEvaluator>,
    invalidated_on_startup: AtomicBool,
}

impl FsConfigProvider {
    pub fn new(root: impl Into<PathBuf>, evaluator: Option<ScriptConfigEvaluator>) -> Self {
        Self {
            root: root.into(),
            evaluator,
            invalidated_on_startup: AtomicBool::new(false),
        }
    }

    /// Whether the resolved configuration asked to be re-evaluated on every run.
    pub fn invalidated_on_startup(&self) -> bool {
        self.invalidated_on_startup.load(Ordering::Relaxed)
    }

    async fn load(&self, path: &Path) -> Result<Value, ConfigError> {
        if is_dynamic_config(path) {
            let Some(evaluator) = &self.evaluator else {
                return Err(ConfigError::Evaluate {
                    path: path.to_path_buf(),
                    message: "Node.js is required to evaluate this file".into(),
                });
            };
            return evaluator.evaluate(path).await;
        }
        read_json(path).await
    }
}

async fn read_json(path: &Path) -> Result<Value, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[async_trait]
impl ConfigProvider for FsConfigProvider {
    async fn get_config(
        &self,
        candidates: &[&str],
        package_key: Option<&str>,
    ) -> Result<Option<ConfigFile>, ConfigError> {
        for name in candidates {
            let path = self.root.join(name);
            if path.is_file() {
                tracing::debug!("found config {}", path.display());
                let contents = self.load(&path).await?;
                return Ok(Some(ConfigFile {
                    contents,
                    file_path: path,
                }));
            }
        }

        let Some(key) = package_key else {
            return Ok(None);
        };
        let manifest = self.root.join(PACKAGE_MANIFEST);
        if !manifest.is_file() {
            return Ok(None);
        }
        let mut package = read_json(&manifest).await?;
        Ok(package
            .get_mut(key)
            .map(Value::take)
            .map(|contents| ConfigFile {
                contents,
                file_path: manifest,
            }))
    }

    fn invalidate_on_startup(&self) {
        self.invalidated_on_startup.store(true, Ordering::Relaxed);
    }
}

/// A source file on disk, with an optional adjacent `<file>.map`.
#[derive(Debug)]
pub struct FsAsset {
    path: PathBuf,
    project_root: PathBuf,
    id: String,
    dependencies: Mutex<Vec<PathBuf>>,
}

impl FsAsset {
    pub fn new(project_root: impl Into<PathBuf>, path: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let path = path.into();
        let id = asset_id(&relative_url(&project_root, &path));
        Self {
            path,
            project_root,
            id,
            dependencies: Mutex::new(Vec::new()),
        }
    }

    /// Files this asset must be rebuilt for.
    pub fn dependencies(&self) -> Vec<PathBuf> {
        match self.dependencies.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn map_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".map");
        PathBuf::from(name)
    }
}

#[async_trait]
impl Asset for FsAsset {
    async fn code(&self) -> Result<String, AssetError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| AssetError::Io {
                path: self.path.clone(),
                source,
            })
    }

    async fn map(&self) -> Result<Option<SourceMap>, AssetError> {
        let map_path = self.map_path();
        if !map_path.is_file() {
            return Ok(None);
        }

        let text = tokio::fs::read_to_string(&map_path)
            .await
            .map_err(|source| AssetError::Io {
                path: map_path.clone(),
                source,
            })?;
        let invalid = |source| AssetError::SourceMap {
            path: map_path.clone(),
            source,
        };

        let mut raw = RawSourceMap::from_json(&text).map_err(invalid)?;
        resolve_sources(&mut raw, map_path.parent().unwrap_or(&self.project_root));
        SourceMap::from_raw(&self.project_root, &raw)
            .map(Some)
            .map_err(invalid)
    }

    fn file_path(&self) -> &Path {
        &self.path
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn invalidate_on_file_change(&self, path: &Path) {
        tracing::debug!("{} depends on {}", self.path.display(), path.display());
        match self.dependencies.lock() {
            Ok(mut guard) => guard.push(path.to_path_buf()),
            Err(poisoned) => poisoned.into_inner().push(path.to_path_buf()),
        }
    }
}

/// Make relative sources absolute against the map's directory and
/// `sourceRoot`.
fn resolve_sources(raw: &mut RawSourceMap, map_dir: &Path) {
    let base = match raw.source_root.take().filter(|r| !r.is_empty()) {
        Some(root) => map_dir.join(root),
        None => map_dir.to_path_buf(),
    };
    for source in &mut raw.sources {
        if !Path::new(source.as_str()).is_absolute() {
            *source = base.join(source.as_str()).to_string_lossy().into_owned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[tokio::test]
    async fn test_svelterc_wins_over_package_key() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".svelterc", r#"{"compilerOptions":{"css":true}}"#);
        write(dir.path(), "package.json", r#"{"svelte":{"compiler":{"dev":false}}}"#);

        let provider = FsConfigProvider::new(dir.path(), None);
        let found = provider
            .get_config(&[".svelterc", "svelte.config.js"], Some("svelte"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.file_path, dir.path().join(".svelterc"));
        assert_eq!(found.contents, json!({"compilerOptions": {"css": true}}));
    }

    #[tokio::test]
    async fn test_package_key_fallback() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "package.json", r#"{"name":"app","svelte":{"preprocess":null}}"#);

        let provider = FsConfigProvider::new(dir.path(), None);
        let found = provider
            .get_config(&[".svelterc"], Some("svelte"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.file_path, dir.path().join("package.json"));
        assert_eq!(found.contents, json!({"preprocess": null}));

        let missing = provider.get_config(&[".svelterc"], Some("other")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FsConfigProvider::new(dir.path(), None);
        let found = provider.get_config(&[".svelterc"], Some("svelte")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".svelterc", "{ not json");

        let provider = FsConfigProvider::new(dir.path(), None);
        let err = provider.get_config(&[".svelterc"], None).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_dynamic_config_needs_evaluator() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "svelte.config.js", "module.exports = {};");

        let provider = FsConfigProvider::new(dir.path(), None);
        let err = provider
            .get_config(&[".svelterc", "svelte.config.js"], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Evaluate { .. }));
    }

    #[tokio::test]
    async fn test_non_object_config_is_rejected() {
        use velin_atelier::{BuildMode, ConfigResolver};

        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".svelterc", "[1, 2]");
        let provider = FsConfigProvider::new(dir.path(), None);

        let err = ConfigResolver::default()
            .resolve(&provider, BuildMode::Development)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotAnObject { .. }));
        assert!(!provider.invalidated_on_startup());

        provider.invalidate_on_startup();
        assert!(provider.invalidated_on_startup());
    }

    #[tokio::test]
    async fn test_asset_reads_code_and_adjacent_map() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        write(&dir.path().join("src"), "App.svelte", "<p>hi</p>");
        write(
            &dir.path().join("src"),
            "App.svelte.map",
            r#"{"version":3,"sources":["Page.md"],"names":[],"mappings":"AAAA"}"#,
        );

        let asset = FsAsset::new(dir.path(), dir.path().join("src/App.svelte"));
        assert_eq!(asset.code().await.unwrap(), "<p>hi</p>");

        let map = asset.map().await.unwrap().unwrap();
        assert_eq!(map.sources(), ["src/Page.md".to_string()].as_slice());
    }

    #[tokio::test]
    async fn test_asset_without_map() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "App.svelte", "");

        let asset = FsAsset::new(dir.path(), dir.path().join("App.svelte"));
        assert!(asset.map().await.unwrap().is_none());
        assert_eq!(asset.id().len(), 16);

        asset.invalidate_on_file_change(Path::new("/tmp/theme.scss"));
        assert_eq!(asset.dependencies(), vec![PathBuf::from("/tmp/theme.scss")]);
    }

    #[tokio::test]
    async fn test_missing_asset_is_io_error() {
        let asset = FsAsset::new("/nonexistent", "/nonexistent/App.svelte");
        assert!(matches!(asset.code().await, Err(AssetError::Io { .. })));
    }
}
