//! `svelte-preprocess` as the default preprocessing preset.

use serde_json::json;
use std::path::Path;
use velin_atelier::{PreprocessPreset, PreprocessStep};

/// Package name of the preset.
pub const SVELTE_PREPROCESS: &str = "svelte-preprocess";

/// Default preprocessing for projects that install `svelte-preprocess`
/// but configure no steps of their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct SveltePreprocessPreset;

impl SveltePreprocessPreset {
    /// Present only when the package is installed under `project_root`.
    pub fn detect(project_root: &Path) -> Option<Self> {
        let installed = project_root
            .join("node_modules")
            .join(SVELTE_PREPROCESS)
            .is_dir();
        installed.then_some(Self)
    }
}

impl PreprocessPreset for SveltePreprocessPreset {
    fn name(&self) -> &str {
        SVELTE_PREPROCESS
    }

    fn default_step(&self) -> PreprocessStep {
        PreprocessStep(json!({ "preset": SVELTE_PREPROCESS, "options": {} }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_requires_installed_package() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SveltePreprocessPreset::detect(dir.path()).is_none());

        std::fs::create_dir_all(dir.path().join("node_modules/svelte-preprocess")).unwrap();
        assert!(SveltePreprocessPreset::detect(dir.path()).is_some());
    }

    #[test]
    fn test_default_step() {
        let step = SveltePreprocessPreset.default_step();
        assert_eq!(step.0["preset"], "svelte-preprocess");
        assert_eq!(step.0["options"], json!({}));
    }
}
