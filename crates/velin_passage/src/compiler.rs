//! [`Compiler`] and [`Preprocessor`] backed by the project's own
//! `svelte/compiler`.

use async_trait::async_trait;
use velin_atelier::{
    CompileOutput, Compiler, CompilerOptions, PreprocessOutput, PreprocessStep, Preprocessor,
    RawDiagnostic,
};

use crate::bridge::{NodeBridge, Request};

#[async_trait]
impl Compiler for NodeBridge {
    async fn compile(
        &self,
        code: &str,
        options: &CompilerOptions,
    ) -> Result<CompileOutput, RawDiagnostic> {
        let options = compile_options(options);
        let request = Request::Compile {
            root: self.project_root(),
            code,
            options: &options,
        };
        self.call(&request).await.map_err(RawDiagnostic::from)?
    }
}

/// Options forwarded to `svelte.compile`. The preprocess map is withheld so
/// the compiler's maps stay relative to the code it was handed.
fn compile_options(options: &CompilerOptions) -> CompilerOptions {
    CompilerOptions {
        sourcemap: None,
        ..options.clone()
    }
}

#[async_trait]
impl Preprocessor for NodeBridge {
    async fn preprocess(
        &self,
        code: &str,
        steps: &[PreprocessStep],
        options: &CompilerOptions,
    ) -> Result<PreprocessOutput, RawDiagnostic> {
        let request = Request::Preprocess {
            root: self.project_root(),
            code,
            steps,
            options,
        };
        self.call(&request).await.map_err(RawDiagnostic::from)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use velin_atelier::{BuildMode, TransformPipeline};
    use velin_relief::RawSourceMap;

    #[tokio::test]
    async fn test_missing_node_surfaces_as_diagnostic() {
        let bridge = NodeBridge::new("/nonexistent/velin-node", "/tmp");
        let err = bridge
            .compile("<p></p>", &CompilerOptions::for_mode(BuildMode::Development))
            .await
            .unwrap_err();

        assert_eq!(err.name.as_deref(), Some("BridgeError"));
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[test]
    fn test_preprocess_map_is_not_forwarded() {
        let options = CompilerOptions {
            filename: Some("src/App.svelte".into()),
            sourcemap: Some(RawSourceMap::new(vec!["src/App.svelte".into()], "AAEA")),
            ..CompilerOptions::for_mode(BuildMode::Development)
        };

        let forwarded = compile_options(&options);
        assert!(forwarded.sourcemap.is_none());
        assert_eq!(forwarded.filename, options.filename);

        let request = Request::Compile {
            root: std::path::Path::new("/app"),
            code: "<p></p>",
            options: &forwarded,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["options"].get("sourcemap").is_none());

        let bridge = NodeBridge::new("node", "/app");
        assert!(!bridge.composes_input_map());
    }

    #[test]
    fn test_bridge_plugs_into_pipeline() {
        let bridge = Arc::new(NodeBridge::new("node", "/app"));
        let _pipeline = TransformPipeline::new(bridge.clone(), Some(bridge as Arc<dyn Preprocessor>));
    }
}
